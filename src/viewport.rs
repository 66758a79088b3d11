//! Aspect-preserving fit of the video surface inside the reference canvas

use crate::capture::{ResolutionOption, Rotation};
use crate::config::ReferenceCanvas;

/// Size the on-screen video element should take, in canvas units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportSize {
    pub width: f32,
    pub height: f32,
}

/// Letterbox or pillarbox `resolution` into `canvas`
///
/// At 90 and 270 degrees the frame is presented sideways, so the effective
/// aspect ratio is height over width.
pub fn fit(resolution: ResolutionOption, rotation: Rotation, canvas: ReferenceCanvas) -> ViewportSize {
    let (w, h) = (resolution.width as f32, resolution.height as f32);
    let aspect = if rotation.is_portrait() { h / w } else { w / h };

    if aspect > canvas.aspect() {
        ViewportSize {
            width: canvas.width,
            height: canvas.width / aspect,
        }
    } else {
        ViewportSize {
            width: canvas.height * aspect,
            height: canvas.height,
        }
    }
}

/// Holds the last published rectangle
///
/// The rectangle is recomputed on every update that has an active
/// resolution. Without one it stays frozen at its last value.
#[derive(Debug, Clone)]
pub struct ViewportFitter {
    canvas: ReferenceCanvas,
    current: Option<ViewportSize>,
}

impl ViewportFitter {
    pub fn new(canvas: ReferenceCanvas) -> Self {
        Self {
            canvas,
            current: None,
        }
    }

    /// Recompute for this tick. Returns the new rectangle, or `None` when
    /// nothing was fitted.
    pub fn update(&mut self, active: Option<(ResolutionOption, Rotation)>) -> Option<ViewportSize> {
        let (resolution, rotation) = active?;
        if resolution.width == 0 || resolution.height == 0 {
            tracing::warn!("Ignoring degenerate resolution {}", resolution);
            return None;
        }

        let size = fit(resolution, rotation, self.canvas);
        if self.current != Some(size) {
            tracing::debug!(
                "Viewport {:.1}x{:.1} for {} at {}°",
                size.width,
                size.height,
                resolution,
                rotation.degrees()
            );
        }
        self.current = Some(size);
        Some(size)
    }

    /// Last published rectangle, if any
    pub fn current(&self) -> Option<ViewportSize> {
        self.current
    }

    pub fn canvas(&self) -> ReferenceCanvas {
        self.canvas
    }
}
