//! Device enumeration and selection policies

use super::{CameraDevice, CameraHost};
use crate::error::SessionError;

/// Read-only view of the devices a host reports
pub struct DeviceCatalog;

impl DeviceCatalog {
    /// Query the host. An unavailable subsystem is reported as an empty list.
    pub fn enumerate<H: CameraHost>(host: &mut H) -> Vec<CameraDevice> {
        match host.list_devices() {
            Ok(devices) => {
                tracing::debug!("Host reported {} camera(s)", devices.len());
                devices
            }
            Err(e) => {
                tracing::warn!("Camera enumeration unavailable: {:#}", e);
                Vec::new()
            }
        }
    }

    /// First device that is not front-facing, in enumeration order
    pub fn first_rear_facing(devices: &[CameraDevice]) -> Option<&CameraDevice> {
        devices.iter().find(|device| !device.front_facing)
    }

    /// Validate an explicit "camera N at resolution M" request
    pub fn pick(
        devices: &[CameraDevice],
        camera_index: usize,
        resolution_index: usize,
    ) -> Result<&CameraDevice, SessionError> {
        let device = devices
            .get(camera_index)
            .ok_or(SessionError::CameraIndexOutOfRange {
                index: camera_index,
                available: devices.len(),
            })?;

        if resolution_index >= device.resolutions.len() {
            return Err(SessionError::ResolutionIndexOutOfRange {
                index: resolution_index,
                available: device.resolutions.len(),
            });
        }

        Ok(device)
    }

    /// Human-readable listing for diagnostics
    pub fn describe(devices: &[CameraDevice]) -> Vec<String> {
        if devices.is_empty() {
            return vec!["No cameras available".to_string()];
        }

        let mut lines = Vec::new();
        for (index, device) in devices.iter().enumerate() {
            lines.push(format!("[{}] {}", index, device));
            if device.resolutions.is_empty() {
                lines.push("    (no resolutions reported)".to_string());
            }
            for (res_index, resolution) in device.resolutions.iter().enumerate() {
                lines.push(format!("    {}: {}", res_index, resolution));
            }
        }
        lines
    }
}
