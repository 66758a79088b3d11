use super::{CameraDevice, CameraHost, ResolutionOption, Rotation};
use anyhow::{bail, Result};
use image::RgbImage;

/// Handle to a stream opened on a [`ScriptedHost`]
#[derive(Debug, PartialEq, Eq)]
pub struct ScriptedStream {
    id: u64,
    resolution: ResolutionOption,
}

impl ScriptedStream {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// In-memory camera host
///
/// Devices, rotation and frames are set by the owner. Every open and close
/// is counted so stream ownership can be checked from the outside.
#[derive(Debug, Default)]
pub struct ScriptedHost {
    devices: Option<Vec<CameraDevice>>,
    rotation: Rotation,
    frame: Option<RgbImage>,
    frame_pending: bool,
    continuous: bool,
    fail_open: bool,
    live: Vec<u64>,
    peak_live: usize,
    negotiated: Option<ResolutionOption>,
    next_id: u64,
    opened: u64,
    closed: u64,
}

impl ScriptedHost {
    pub fn new(devices: Vec<CameraDevice>) -> Self {
        Self {
            devices: Some(devices),
            ..Self::default()
        }
    }

    /// Host whose camera subsystem cannot be queried
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set_rotation(&mut self, rotation: Rotation) {
        self.rotation = rotation;
    }

    /// Publish a frame; it is reported as new until the next read
    pub fn push_frame(&mut self, frame: RgbImage) {
        self.frame = Some(frame);
        self.frame_pending = true;
    }

    /// Mark the current frame as new again without replacing it
    pub fn touch_frame(&mut self) {
        self.frame_pending = true;
    }

    /// Report the current frame as new on every tick, like a live sensor
    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    pub fn set_fail_open(&mut self, fail: bool) {
        self.fail_open = fail;
    }

    /// Make the next opened streams run at `resolution` whatever was requested
    pub fn set_negotiated(&mut self, resolution: Option<ResolutionOption>) {
        self.negotiated = resolution;
    }

    pub fn opened(&self) -> u64 {
        self.opened
    }

    pub fn closed(&self) -> u64 {
        self.closed
    }

    /// Ids of streams that are open right now
    pub fn live_streams(&self) -> &[u64] {
        &self.live
    }

    /// Most streams that were ever open at the same time
    pub fn peak_live_streams(&self) -> usize {
        self.peak_live
    }
}

impl CameraHost for ScriptedHost {
    type Stream = ScriptedStream;

    fn list_devices(&mut self) -> Result<Vec<CameraDevice>> {
        match &self.devices {
            Some(devices) => Ok(devices.clone()),
            None => bail!("camera subsystem unavailable"),
        }
    }

    fn open_stream(
        &mut self,
        device: &CameraDevice,
        resolution: &ResolutionOption,
    ) -> Result<ScriptedStream> {
        if self.fail_open {
            bail!("device {} refused to open", device.name);
        }

        self.next_id += 1;
        self.opened += 1;
        self.live.push(self.next_id);
        self.peak_live = self.peak_live.max(self.live.len());
        tracing::debug!("Scripted stream {} opened on {} at {}", self.next_id, device, resolution);

        Ok(ScriptedStream {
            id: self.next_id,
            resolution: self.negotiated.unwrap_or(*resolution),
        })
    }

    fn close_stream(&mut self, stream: ScriptedStream) {
        self.closed += 1;
        self.live.retain(|id| *id != stream.id);
        tracing::debug!("Scripted stream {} closed", stream.id);
    }

    fn rotation(&self, _stream: &ScriptedStream) -> Rotation {
        self.rotation
    }

    fn negotiated_resolution(&self, stream: &ScriptedStream) -> Option<ResolutionOption> {
        Some(stream.resolution)
    }

    fn has_new_frame(&mut self, _stream: &mut ScriptedStream) -> bool {
        self.frame_pending || (self.continuous && self.frame.is_some())
    }

    fn pixels(&mut self, stream: &mut ScriptedStream) -> Option<RgbImage> {
        self.frame_pending = false;
        match &self.frame {
            Some(frame) => Some(frame.clone()),
            None => {
                tracing::trace!(
                    "No frame yet for stream {} ({}x{})",
                    stream.id,
                    stream.resolution.width,
                    stream.resolution.height
                );
                None
            }
        }
    }
}
