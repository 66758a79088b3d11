use super::DisplaySurface;
use crate::capture::Rotation;
use crate::viewport::ViewportSize;

/// Display surface that reports changes through `tracing`
///
/// Viewport and rotation are published every tick, so only changes are logged.
#[derive(Debug, Default)]
pub struct LogSurface {
    viewport: Option<ViewportSize>,
    rotation: Option<Rotation>,
    text: Option<String>,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Option<ViewportSize> {
        self.viewport
    }

    pub fn rotation(&self) -> Option<Rotation> {
        self.rotation
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

impl DisplaySurface for LogSurface {
    fn set_viewport(&mut self, size: ViewportSize) {
        if self.viewport != Some(size) {
            tracing::info!("Video surface resized to {:.1}x{:.1}", size.width, size.height);
            self.viewport = Some(size);
        }
    }

    fn set_rotation(&mut self, rotation: Rotation) {
        if self.rotation != Some(rotation) {
            tracing::info!("Video surface rotated to {}°", rotation.degrees());
            self.rotation = Some(rotation);
        }
    }

    fn show_text(&mut self, text: &str) {
        tracing::info!("Scan result: {}", text);
        self.text = Some(text.to_string());
    }
}
