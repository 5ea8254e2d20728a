use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use parking_lot::Mutex;
use tracing::{info, warn};

use super::chunk::{AudioChunk, SAMPLE_RATE};
use super::device::{select_input_device, DeviceSelection};
use super::queue::ChunkQueue;
use super::resample::RateConverter;
use crate::error::{LuminoError, Result};

/// Options for opening a capture source.
#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    /// Input device index; `None` means the platform default.
    pub device_index: Option<usize>,
    /// Duration of each chunk delivered to the queue.
    pub chunk_duration: Duration,
    /// Blocking ambient-noise measurement window before streaming starts.
    pub calibration_duration: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            device_index: None,
            chunk_duration: Duration::from_secs(2),
            calibration_duration: Duration::from_secs(1),
        }
    }
}

/// A source of audio chunks feeding a [`ChunkQueue`] from its own thread.
///
/// The real implementation is [`MicCapture`]; tests inject scripted
/// sources.
#[async_trait::async_trait]
pub trait CaptureSource: Send + Sync {
    /// Open the device, calibrate, and begin streaming chunks into `queue`.
    /// Does not return until calibration has succeeded or failed, so a
    /// startup failure never leaves a live capture thread behind.
    async fn start(&self, opts: CaptureOptions, queue: Arc<ChunkQueue>) -> Result<CaptureHandle>;
}

/// Handle to a running capture thread. Dropping it stops the thread.
pub struct CaptureHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    selection: DeviceSelection,
    ambient_rms: f32,
}

impl CaptureHandle {
    pub fn new(
        running: Arc<AtomicBool>,
        thread: Option<JoinHandle<()>>,
        selection: DeviceSelection,
        ambient_rms: f32,
    ) -> Self {
        Self {
            running,
            thread,
            selection,
            ambient_rms,
        }
    }

    /// Stop streaming and join the capture thread. Idempotent: calling it
    /// again (or when streaming never started) is a no-op.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn selection(&self) -> &DeviceSelection {
        &self.selection
    }

    /// Ambient noise level (RMS of the calibration window, normalized).
    pub fn ambient_rms(&self) -> f32 {
        self.ambient_rms
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Microphone capture via cpal.
///
/// The cpal stream is not `Send`, so a dedicated `audio-capture` thread
/// owns it: the stream callback folds incoming frames to mono at the
/// device's native rate into a staging buffer, and the thread resamples
/// that buffer to 16 kHz and slices it into fixed-duration chunks pushed
/// to the queue. Resampling stays off the callback; only the mono fold
/// runs under the audio driver's deadline.
pub struct MicCapture;

#[async_trait::async_trait]
impl CaptureSource for MicCapture {
    async fn start(&self, opts: CaptureOptions, queue: Arc<ChunkQueue>) -> Result<CaptureHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let (startup_tx, startup_rx) = std::sync::mpsc::channel();

        let thread = {
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("audio-capture".to_string())
                .spawn(move || run_capture_thread(opts, queue, running, startup_tx))
                .map_err(|e| LuminoError::Internal(format!("failed to spawn capture thread: {e}")))?
        };

        // Calibration is blocking by contract; wait for the thread's verdict
        // off the async runtime.
        let wait = opts.calibration_duration + Duration::from_secs(5);
        let startup = tokio::task::spawn_blocking(move || startup_rx.recv_timeout(wait))
            .await
            .map_err(|e| LuminoError::Internal(format!("capture startup task failed: {e}")))?;

        match startup {
            Ok(Ok((selection, ambient_rms))) => Ok(CaptureHandle::new(
                running,
                Some(thread),
                selection,
                ambient_rms,
            )),
            Ok(Err(e)) => {
                running.store(false, Ordering::SeqCst);
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                running.store(false, Ordering::SeqCst);
                Err(LuminoError::Device(
                    "timed out waiting for capture startup".to_string(),
                ))
            }
        }
    }
}

/// Mono samples at the device's native rate, accumulated by the stream
/// callback as normalized floats.
#[derive(Default)]
struct Staging {
    samples: Vec<f32>,
}

impl Staging {
    fn push_i16(&mut self, data: &[i16], channels: usize) {
        for frame in data.chunks_exact(channels) {
            let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
            self.samples.push(sum / channels as f32);
        }
    }

    fn push_u16(&mut self, data: &[u16], channels: usize) {
        for frame in data.chunks_exact(channels) {
            let sum: f32 = frame.iter().map(|&s| (s as f32 - 32768.0) / 32768.0).sum();
            self.samples.push(sum / channels as f32);
        }
    }

    fn push_f32(&mut self, data: &[f32], channels: usize) {
        for frame in data.chunks_exact(channels) {
            let sum: f32 = frame.iter().sum();
            self.samples.push((sum / channels as f32).clamp(-1.0, 1.0));
        }
    }
}

fn stream_error(err: cpal::StreamError) {
    warn!("audio stream error: {err}");
}

type StartupResult = Result<(DeviceSelection, f32)>;

fn run_capture_thread(
    opts: CaptureOptions,
    queue: Arc<ChunkQueue>,
    running: Arc<AtomicBool>,
    startup_tx: std::sync::mpsc::Sender<StartupResult>,
) {
    let (device, selection) = match select_input_device(opts.device_index) {
        Ok(resolved) => resolved,
        Err(e) => {
            let _ = startup_tx.send(Err(e));
            return;
        }
    };
    if selection.fell_back {
        warn!(
            requested = ?selection.requested,
            device = %selection.resolved_name,
            "using fallback input device"
        );
    }

    let supported = match device.default_input_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            let _ = startup_tx.send(Err(LuminoError::Device(format!(
                "no usable input config for {}: {e}",
                selection.resolved_name
            ))));
            return;
        }
    };
    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    let channels = config.channels as usize;
    // The stream runs at the device's native rate; conversion to the
    // pipeline rate happens on this thread, between drains of the staging
    // buffer.
    let mut converter = match RateConverter::new(config.sample_rate.0) {
        Ok(converter) => converter,
        Err(e) => {
            let _ = startup_tx.send(Err(e));
            return;
        }
    };

    let staging = Arc::new(Mutex::new(Staging::default()));

    let build = match sample_format {
        SampleFormat::F32 => {
            let staging = Arc::clone(&staging);
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    staging.lock().push_f32(data, channels);
                },
                stream_error,
                None,
            )
        }
        SampleFormat::I16 => {
            let staging = Arc::clone(&staging);
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    staging.lock().push_i16(data, channels);
                },
                stream_error,
                None,
            )
        }
        SampleFormat::U16 => {
            let staging = Arc::clone(&staging);
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    staging.lock().push_u16(data, channels);
                },
                stream_error,
                None,
            )
        }
        other => {
            let _ = startup_tx.send(Err(LuminoError::Device(format!(
                "unsupported sample format {other:?}"
            ))));
            return;
        }
    };

    let stream = match build {
        Ok(stream) => stream,
        Err(e) => {
            let _ = startup_tx.send(Err(LuminoError::Device(format!(
                "failed to build input stream: {e}"
            ))));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = startup_tx.send(Err(LuminoError::Device(format!(
            "failed to start input stream: {e}"
        ))));
        return;
    }

    // Ambient-noise calibration: measure before delivering any chunks.
    thread::sleep(opts.calibration_duration);
    let calibration = std::mem::take(&mut staging.lock().samples);
    if calibration.is_empty() {
        let _ = startup_tx.send(Err(LuminoError::Device(format!(
            "no audio from {} during calibration",
            selection.resolved_name
        ))));
        return;
    }
    let ambient_rms = rms(&calibration);
    info!(
        device = %selection.resolved_name,
        ambient_rms,
        "ambient noise calibration complete"
    );
    if startup_tx.send(Ok((selection, ambient_rms))).is_err() {
        return;
    }

    let chunk_samples =
        ((SAMPLE_RATE as u128 * opts.chunk_duration.as_millis()) / 1000).max(1) as usize;
    let mut converted: Vec<i16> = Vec::with_capacity(chunk_samples * 2);

    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(25));
        let staged = std::mem::take(&mut staging.lock().samples);
        match converter.push(&staged) {
            Ok(resampled) => converted.extend_from_slice(&resampled),
            Err(e) => {
                warn!("sample-rate conversion failed, stopping capture: {e}");
                break;
            }
        }
        while converted.len() >= chunk_samples {
            let rest = converted.split_off(chunk_samples);
            let full = std::mem::replace(&mut converted, rest);
            queue.push(AudioChunk::new(full));
        }
    }

    // Anything still staged is intentionally dropped: nothing may be
    // delivered after a logical stop.
    drop(stream);
    info!("audio capture thread shut down");
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| s as f64 * s as f64).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_folds_stereo_to_mono() {
        let mut staging = Staging::default();
        staging.push_i16(&[100, 200, -100, 100], 2);
        assert!((staging.samples[0] - 150.0 / 32768.0).abs() < 1e-6);
        assert_eq!(staging.samples[1], 0.0);
    }

    #[test]
    fn staging_keeps_every_frame_at_the_device_rate() {
        let mut staging = Staging::default();
        staging.push_f32(&[0.1, 0.2, 0.3], 1);
        staging.push_f32(&[0.4], 1);
        assert_eq!(staging.samples.len(), 4, "no frame is dropped before resampling");
    }

    #[test]
    fn rms_of_silence_is_zero() {
        assert_eq!(rms(&[0.0, 0.0, 0.0]), 0.0);
        assert!(rms(&[0.5, -0.5]) > 0.49);
    }
}
