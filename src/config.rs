use std::time::Duration;

/// Smallest accepted decode interval, in seconds
pub const MIN_READ_INTERVAL: f32 = 0.01;

/// Logical screen size the UI layout is authored against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceCanvas {
    pub width: f32,
    pub height: f32,
}

impl ReferenceCanvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Both sides finite and positive
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl Default for ReferenceCanvas {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

/// Which camera to bind once the session has warmed up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// First rear-facing device at its first resolution
    #[default]
    Auto,
    /// A specific device and resolution index from the catalog
    Explicit { camera: usize, resolution: usize },
}

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Seconds between decode attempts
    pub read_interval: f32,
    pub reference_canvas: ReferenceCanvas,
    /// Framerate requested through the lifecycle bridge
    pub target_framerate: Option<u32>,
    pub selection: Selection,
    /// Longest a decode attempt may hold up a tick
    pub decode_budget: Duration,
    /// Frames larger than this on their longest side are downsized before decoding
    pub max_decode_dimension: u32,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            read_interval: 1.0,
            reference_canvas: ReferenceCanvas::default(),
            target_framerate: Some(60),
            selection: Selection::Auto,
            decode_budget: Duration::from_millis(50),
            max_decode_dimension: 1280,
        }
    }
}

/// Clamp a read interval up to [`MIN_READ_INTERVAL`]. NaN also maps to the floor.
pub fn clamp_read_interval(seconds: f32) -> f32 {
    if seconds > MIN_READ_INTERVAL {
        seconds
    } else {
        MIN_READ_INTERVAL
    }
}
