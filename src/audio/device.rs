use cpal::traits::{DeviceTrait, HostTrait};
use serde::Serialize;
use tracing::warn;

use crate::error::{LuminoError, Result};

/// How a microphone was resolved for a session.
///
/// When the requested index is invalid the session falls back to the
/// platform default device instead of failing; `fell_back` keeps that
/// visible to the caller so the active mic identity is never hidden.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSelection {
    pub requested: Option<usize>,
    pub resolved_name: String,
    pub fell_back: bool,
}

/// Ordered list of human-readable input device names, indexable by the
/// integer passed to `set_input_device`.
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
    }
    names
}

/// Resolve an input device by index, falling back to the platform default
/// when the index is out of range. Errors only when no input device exists
/// at all.
pub fn select_input_device(requested: Option<usize>) -> Result<(cpal::Device, DeviceSelection)> {
    let host = cpal::default_host();

    if let Some(index) = requested {
        let found = host
            .input_devices()
            .ok()
            .and_then(|mut devices| devices.nth(index));
        if let Some(device) = found {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("input device #{index}"));
            return Ok((
                device,
                DeviceSelection {
                    requested,
                    resolved_name: name,
                    fell_back: false,
                },
            ));
        }
        warn!(
            index,
            "requested input device not available, falling back to default"
        );
    }

    let device = host
        .default_input_device()
        .ok_or_else(|| LuminoError::Device("no default input device available".to_string()))?;
    let name = device
        .name()
        .unwrap_or_else(|_| "default input device".to_string());

    Ok((
        device,
        DeviceSelection {
            requested,
            resolved_name: name,
            fell_back: requested.is_some(),
        },
    ))
}
