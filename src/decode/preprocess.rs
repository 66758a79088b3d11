use image::{imageops, GrayImage, RgbImage};

/// Preprocessor for turning camera frames into decoder input
pub struct Preprocessor {
    max_dimension: u32,
}

impl Preprocessor {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Convert an RGB frame to greyscale, downsizing it first if its longest
    /// side exceeds `max_dimension`
    ///
    /// Aspect ratio is preserved; neither side drops below one pixel.
    pub fn prepare(&self, frame: &RgbImage) -> GrayImage {
        let _span = tracing::debug_span!("preprocess").entered();

        let gray = imageops::grayscale(frame);
        let (width, height) = gray.dimensions();
        let (target_width, target_height) = self.target_size(width, height);

        if (target_width, target_height) == (width, height) {
            return gray;
        }

        imageops::resize(
            &gray,
            target_width,
            target_height,
            imageops::FilterType::Triangle,
        )
    }

    fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height);
        if longest <= self.max_dimension {
            return (width, height);
        }

        let scale = self.max_dimension as f64 / longest as f64;
        let scaled = |side: u32| ((side as f64 * scale).round() as u32).max(1);
        (scaled(width), scaled(height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_frame_untouched() {
        let pre = Preprocessor::new(1280);
        let gray = pre.prepare(&RgbImage::new(640, 480));
        assert_eq!(gray.dimensions(), (640, 480));
    }

    #[test]
    fn test_large_frame_downsized_keeping_aspect() {
        let pre = Preprocessor::new(960);
        let gray = pre.prepare(&RgbImage::new(1920, 1080));
        assert_eq!(gray.dimensions(), (960, 540));
    }

    #[test]
    fn test_grayscale_conversion() {
        let pre = Preprocessor::new(16);
        let frame = RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]));
        let gray = pre.prepare(&frame);
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
    }
}
