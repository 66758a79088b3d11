mod log_surface;

pub use log_surface::LogSurface;

use crate::capture::Rotation;
use crate::viewport::ViewportSize;

/// Trait for the UI element that shows the camera feed and scan results
pub trait DisplaySurface {
    /// Resize the video element
    fn set_viewport(&mut self, size: ViewportSize);

    /// Rotate the video element so the frame appears upright
    fn set_rotation(&mut self, rotation: Rotation);

    /// Show the most recently decoded text
    fn show_text(&mut self, text: &str);
}
