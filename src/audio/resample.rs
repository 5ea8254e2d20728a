use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::chunk::SAMPLE_RATE;
use crate::error::{LuminoError, Result};

/// Fixed input block handed to rubato; 32 ms at the pipeline rate.
const CHUNK_FRAMES: usize = 512;

/// Converts mono audio from the device's native rate to the 16 kHz
/// pipeline rate.
///
/// Uses rubato's sinc interpolation, so downsampling is low-passed rather
/// than decimated. A device already at the pipeline rate passes through
/// untouched. Input shorter than one rubato block is held until enough
/// has accumulated; `push` returns whatever full output is ready.
pub struct RateConverter {
    inner: Option<SincFixedIn<f32>>,
    pending: Vec<f32>,
}

impl RateConverter {
    pub fn new(device_rate: u32) -> Result<Self> {
        let inner = if device_rate == SAMPLE_RATE {
            None
        } else {
            let params = SincInterpolationParameters {
                sinc_len: 64,
                f_cutoff: 0.95,
                interpolation: SincInterpolationType::Cubic,
                oversampling_factor: 128,
                window: WindowFunction::Blackman2,
            };
            let resampler = SincFixedIn::<f32>::new(
                SAMPLE_RATE as f64 / device_rate as f64,
                2.0,
                params,
                CHUNK_FRAMES,
                1,
            )
            .map_err(|e| {
                LuminoError::Device(format!("cannot resample from {device_rate} Hz: {e}"))
            })?;
            Some(resampler)
        };
        Ok(Self {
            inner,
            pending: Vec::with_capacity(CHUNK_FRAMES * 2),
        })
    }

    /// Feed mono samples in [-1, 1] at the device rate; returns converted
    /// pipeline-rate PCM for every complete block consumed so far.
    pub fn push(&mut self, samples: &[f32]) -> Result<Vec<i16>> {
        let Some(resampler) = self.inner.as_mut() else {
            return Ok(samples.iter().map(|&s| to_i16(s)).collect());
        };
        self.pending.extend_from_slice(samples);

        let mut out = Vec::new();
        while self.pending.len() >= CHUNK_FRAMES {
            let block: Vec<f32> = self.pending.drain(..CHUNK_FRAMES).collect();
            let channels = resampler
                .process(&[block], None)
                .map_err(|e| LuminoError::Device(format!("resampling failed: {e}")))?;
            if let Some(mono) = channels.first() {
                out.extend(mono.iter().map(|&s| to_i16(s)));
            }
        }
        Ok(out)
    }
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_rate_passes_through_unchanged() {
        let mut converter = RateConverter::new(SAMPLE_RATE).unwrap();
        let out = converter.push(&[0.0, 0.25, -0.25]).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], 0);
        assert!((out[1] as f32 / i16::MAX as f32 - 0.25).abs() < 1e-3);
    }

    #[test]
    fn a_second_of_44_1k_audio_yields_a_second_at_16k() {
        let mut converter = RateConverter::new(44_100).unwrap();
        let input: Vec<f32> = (0..44_100)
            .map(|i| ((i % 100) as f32 / 100.0) - 0.5)
            .collect();

        let mut out = Vec::new();
        for piece in input.chunks(1_000) {
            out.extend(converter.push(piece).unwrap());
        }

        // 86 full blocks consumed (44_032 frames); the remainder is still
        // pending. Nearest-integer output per block keeps the total within
        // a frame or two per block of the exact ratio.
        assert!(
            (15_800..=16_100).contains(&out.len()),
            "expected ~16k output samples for 1s of 44.1k input, got {}",
            out.len()
        );
    }

    #[test]
    fn downsampled_constant_tone_stays_constant() {
        let mut converter = RateConverter::new(48_000).unwrap();
        let out = converter.push(&vec![0.05_f32; 9_600]).unwrap();
        assert!(!out.is_empty());

        // Skip the filter edges, then every sample should sit near the
        // input level.
        let expected = (0.05 * i16::MAX as f32) as i16;
        for &sample in &out[100..out.len() - 100] {
            assert!(
                (sample - expected).abs() < 200,
                "sample {sample} strays from the {expected} tone"
            );
        }
    }
}
