use std::time::Duration;

/// Pipeline sample rate in Hz. All chunks carry mono PCM at this rate.
pub const SAMPLE_RATE: u32 = 16_000;

/// An immutable buffer of raw mono PCM samples (16 kHz, 16-bit signed).
///
/// Chunks are ordered by arrival on the capture thread and are never
/// reordered or merged except by explicit concatenation during a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    samples: Vec<i16>,
}

impl AudioChunk {
    pub fn new(samples: Vec<i16>) -> Self {
        Self { samples }
    }

    /// Build a chunk from little-endian 16-bit PCM bytes. A trailing odd
    /// byte is dropped.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Self { samples }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / SAMPLE_RATE as f64)
    }
}

/// Normalize 16-bit PCM into 32-bit float in [-1, 1], the format the
/// transcription engine consumes.
pub fn normalize(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_le_bytes_decodes_pairs() {
        let chunk = AudioChunk::from_le_bytes(&[0x01, 0x00, 0xFF, 0xFF, 0x42]);
        assert_eq!(chunk.samples(), &[1, -1]);
    }

    #[test]
    fn duration_matches_sample_rate() {
        let chunk = AudioChunk::new(vec![0; SAMPLE_RATE as usize]);
        assert_eq!(chunk.duration(), Duration::from_secs(1));
    }

    #[test]
    fn normalize_stays_in_unit_range() {
        let normalized = normalize(&[i16::MIN, 0, i16::MAX]);
        assert_eq!(normalized[0], -1.0);
        assert_eq!(normalized[1], 0.0);
        assert!(normalized[2] < 1.0 && normalized[2] > 0.999);
    }
}
