pub mod catalog;
mod nokhwa_host;
pub mod scripted;
pub mod session;

pub use catalog::DeviceCatalog;
pub use nokhwa_host::NokhwaHost;
pub use scripted::ScriptedHost;
pub use session::{CaptureSession, PendingSession, SessionState};

use anyhow::Result;
use image::RgbImage;
use std::fmt;

/// A capture resolution advertised by a camera device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionOption {
    pub width: u32,
    pub height: u32,
    /// Refresh rate in Hz
    pub refresh_rate: u32,
}

impl ResolutionOption {
    pub fn new(width: u32, height: u32, refresh_rate: u32) -> Self {
        Self {
            width,
            height,
            refresh_rate,
        }
    }
}

impl fmt::Display for ResolutionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} @ {}Hz", self.width, self.height, self.refresh_rate)
    }
}

/// A camera as reported by the host, never mutated by this crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraDevice {
    /// Host identifier, unique even when two devices share a name
    pub id: String,
    pub name: String,
    pub front_facing: bool,
    /// Supported resolutions in the order the host reports them
    pub resolutions: Vec<ResolutionOption>,
}

impl CameraDevice {
    /// Device whose id is its name
    pub fn new(name: impl Into<String>, front_facing: bool, resolutions: Vec<ResolutionOption>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            front_facing,
            resolutions,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

impl fmt::Display for CameraDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let facing = if self.front_facing { "front" } else { "rear" };
        write!(f, "{} ({})", self.name, facing)
    }
}

/// Clockwise rotation needed to present the sensor's frame upright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalise an angle in degrees. Only multiples of 90 are accepted.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True when the frame has to be presented with width and height swapped
    pub fn is_portrait(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Trait for the host camera subsystem
///
/// `Stream` is the frame-buffer handle of one open stream. Closing takes
/// the handle by value, so a handle can only ever be released once.
pub trait CameraHost {
    type Stream;

    /// Enumerate devices in host order
    fn list_devices(&mut self) -> Result<Vec<CameraDevice>>;

    /// Start streaming from `device` at `resolution`
    fn open_stream(&mut self, device: &CameraDevice, resolution: &ResolutionOption)
        -> Result<Self::Stream>;

    /// Stop the stream and release its frame buffer
    fn close_stream(&mut self, stream: Self::Stream);

    /// Rotation reported for the current frame
    fn rotation(&self, stream: &Self::Stream) -> Rotation;

    /// Resolution the stream actually runs at, when the host can tell
    fn negotiated_resolution(&self, _stream: &Self::Stream) -> Option<ResolutionOption> {
        None
    }

    /// Whether a frame arrived since the last display tick
    fn has_new_frame(&mut self, stream: &mut Self::Stream) -> bool;

    /// Copy of the latest frame. `None` when nothing has been captured yet.
    fn pixels(&mut self, stream: &mut Self::Stream) -> Option<RgbImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::Deg0));
        assert_eq!(Rotation::from_degrees(90), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(45), None);
    }

    #[test]
    fn test_rotation_portrait() {
        assert!(!Rotation::Deg0.is_portrait());
        assert!(Rotation::Deg90.is_portrait());
        assert!(!Rotation::Deg180.is_portrait());
        assert!(Rotation::Deg270.is_portrait());
        assert_eq!(Rotation::Deg270.degrees(), 270);
    }

    #[test]
    fn test_resolution_display() {
        let res = ResolutionOption::new(1920, 1080, 30);
        assert_eq!(res.to_string(), "1920x1080 @ 30Hz");
    }

    #[test]
    fn test_device_id_defaults_to_name() {
        let device = CameraDevice::new("USB Camera", false, vec![]);
        assert_eq!(device.id, "USB Camera");
        assert_eq!(device.with_id("1").id, "1");
    }
}
