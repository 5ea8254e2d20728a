pub mod capture;
pub mod chunk;
pub mod device;
pub mod queue;
pub mod resample;

pub use capture::{CaptureHandle, CaptureOptions, CaptureSource, MicCapture};
pub use chunk::{normalize, AudioChunk, SAMPLE_RATE};
pub use device::{list_input_devices, select_input_device, DeviceSelection};
pub use queue::ChunkQueue;
pub use resample::RateConverter;
