mod budget;
mod preprocess;
mod qr;

pub use budget::BudgetedDecoder;
pub use preprocess::Preprocessor;
pub use qr::QrDecoder;

use image::RgbImage;

/// Trait for barcode decoders
/// Allows swapping the decoding backend without touching the sampler
pub trait Decoder {
    /// Decode a single frame
    ///
    /// Returns the decoded text, or `None` when nothing was detected or
    /// decoding could not finish. Failures are never reported as errors.
    fn decode(&mut self, frame: &RgbImage) -> Option<String>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decode(&mut self, frame: &RgbImage) -> Option<String> {
        (**self).decode(frame)
    }
}
