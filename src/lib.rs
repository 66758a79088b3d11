//! Camera scanning core
//!
//! Keeps one camera stream alive, samples its frames into a barcode decoder
//! at a bounded rate, and sizes the on-screen video surface to the stream's
//! aspect ratio and rotation inside a fixed reference canvas.
//!
//! Everything is driven from a single display loop through
//! [`Scanner::tick`](scanner::Scanner::tick).

pub mod capture;
pub mod config;
pub mod decode;
pub mod error;
pub mod lifecycle;
pub mod output;
pub mod sampler;
pub mod scanner;
pub mod viewport;

pub use capture::{CameraDevice, CameraHost, CaptureSession, ResolutionOption, Rotation};
pub use config::{ReferenceCanvas, ScannerConfig, Selection};
pub use decode::Decoder;
pub use error::SessionError;
pub use output::DisplaySurface;
pub use scanner::{Scanner, TickOutcome};
pub use viewport::{ViewportFitter, ViewportSize};
