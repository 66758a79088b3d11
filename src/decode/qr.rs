use super::preprocess::Preprocessor;
use super::Decoder;
use image::RgbImage;

/// QR code decoder backed by `rqrr`
///
/// Frames are converted to greyscale (and downsized when large) before grid
/// detection. The first grid that decodes wins.
pub struct QrDecoder {
    preprocessor: Preprocessor,
}

impl QrDecoder {
    pub fn new(max_dimension: u32) -> Self {
        tracing::info!("QR decoder ready (max input side {}px)", max_dimension);
        Self {
            preprocessor: Preprocessor::new(max_dimension),
        }
    }
}

impl Decoder for QrDecoder {
    fn decode(&mut self, frame: &RgbImage) -> Option<String> {
        let _span = tracing::debug_span!("qr_decode").entered();

        let gray = self.preprocessor.prepare(frame);
        let (width, height) = gray.dimensions();
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                gray.get_pixel(x as u32, y as u32)[0]
            });

        let grids = prepared.detect_grids();
        if grids.is_empty() {
            tracing::trace!("No QR grid in {}x{} frame", width, height);
            return None;
        }

        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) => return Some(content),
                Err(e) => tracing::debug!("QR grid failed to decode: {:?}", e),
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_has_no_result() {
        let mut decoder = QrDecoder::new(640);
        let frame = RgbImage::from_pixel(320, 240, image::Rgb([255, 255, 255]));
        assert_eq!(decoder.decode(&frame), None);
    }

    #[test]
    fn test_tiny_frame_has_no_result() {
        let mut decoder = QrDecoder::new(640);
        assert_eq!(decoder.decode(&RgbImage::new(1, 1)), None);
    }
}
