//! JPEG/PNG to SVG via per-pixel emission.

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::convert::svg::emit_svg;
use crate::convert::Converter;
use crate::error::{AppError, Result};

pub struct ImageToSvg {
    max_dimension: u32,
}

impl ImageToSvg {
    pub fn new(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    /// Shrink `image` so neither side exceeds the configured bound, keeping aspect ratio.
    /// Images already within bounds are returned untouched.
    pub fn bound(&self, image: DynamicImage) -> DynamicImage {
        if image.width() <= self.max_dimension && image.height() <= self.max_dimension {
            return image;
        }
        let bounded = image.thumbnail(self.max_dimension, self.max_dimension);
        debug!(
            from_width = image.width(),
            from_height = image.height(),
            to_width = bounded.width(),
            to_height = bounded.height(),
            "Downsampled image before vectorizing"
        );
        bounded
    }
}

impl Converter for ImageToSvg {
    fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        // Sniff the content; a PNG uploaded as .jpg still decodes
        let image = image::ImageReader::open(input)?
            .with_guessed_format()?
            .decode()
            .map_err(|e| AppError::Conversion(format!("Failed to decode image: {}", e)))?;
        let raster = self.bound(image).to_rgba8();
        let svg = emit_svg(&raster);
        std::fs::write(output, svg)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "image_to_svg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_bound_keeps_small_images() {
        let converter = ImageToSvg::new(500);
        let img = DynamicImage::ImageRgba8(RgbaImage::new(40, 30));
        let out = converter.bound(img);
        assert_eq!((out.width(), out.height()), (40, 30));
    }

    #[test]
    fn test_bound_preserves_aspect() {
        let converter = ImageToSvg::new(500);
        let img = DynamicImage::ImageRgba8(RgbaImage::new(1000, 250));
        let out = converter.bound(img);
        assert_eq!(out.width(), 500);
        assert!((124..=126).contains(&out.height()));

        let img = DynamicImage::ImageRgba8(RgbaImage::new(300, 900));
        let out = converter.bound(img);
        assert_eq!(out.height(), 500);
        assert!(out.width() <= 500);
    }

    #[test]
    fn test_convert_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("dot.png");
        let output = dir.path().join("dot.svg");

        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(1, 0, Rgba([0, 128, 255, 255]));
        img.save(&input).unwrap();

        ImageToSvg::new(500).convert(&input, &output).unwrap();
        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.contains(r#"width="3" height="1""#));
        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(svg.contains(r##"<rect x="1" y="0" width="1" height="1" fill="#0080ff"/>"##));
    }

    #[test]
    fn test_convert_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fake.png");
        std::fs::write(&input, b"definitely not a png").unwrap();
        let err = ImageToSvg::new(500)
            .convert(&input, &dir.path().join("out.svg"))
            .unwrap_err();
        assert!(matches!(err, AppError::Conversion(_)));
    }
}
