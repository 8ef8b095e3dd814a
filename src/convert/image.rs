//! Image re-encoding between JPEG, PNG and WebP.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, Rgb, RgbImage};
use tracing::debug;

use super::error::ConvertError;
use super::format::Format;

/// Encoder options for image output.
#[derive(Debug, Clone, Copy)]
pub struct ImageOptions {
    /// Colour that transparent pixels are blended onto for JPEG output.
    pub jpeg_background: [u8; 3],
    pub jpeg_quality: u8,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            jpeg_background: [255, 255, 255],
            jpeg_quality: 95,
        }
    }
}

pub fn convert_image(
    input: &Path,
    output: &Path,
    target: Format,
    options: &ImageOptions,
) -> Result<(), ConvertError> {
    let img = ImageReader::open(input)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(ConvertError::unreadable_input)?
        .decode()
        .map_err(|e| ConvertError::library("image decode", e))?;

    debug!(
        "Decoded {}x{} image ({:?}) from {:?}",
        img.width(),
        img.height(),
        img.color(),
        input
    );

    let mut writer = BufWriter::new(File::create(output)?);
    match target {
        Format::Jpg | Format::Jpeg => {
            let flat = flatten(&img, options.jpeg_background);
            let encoder = JpegEncoder::new_with_quality(&mut writer, options.jpeg_quality);
            flat.write_with_encoder(encoder)
                .map_err(|e| ConvertError::library("jpeg encode", e))?;
        }
        Format::Png => {
            img.write_to(&mut writer, ImageFormat::Png)
                .map_err(|e| ConvertError::library("png encode", e))?;
        }
        Format::Webp => {
            // The WebP encoder only takes 8-bit RGB(A).
            let img = if img.color().has_alpha() {
                DynamicImage::ImageRgba8(img.to_rgba8())
            } else {
                DynamicImage::ImageRgb8(img.to_rgb8())
            };
            img.write_to(&mut writer, ImageFormat::WebP)
                .map_err(|e| ConvertError::library("webp encode", e))?;
        }
        other => {
            return Err(ConvertError::library(
                "image encode",
                format!("{other} is not an image format"),
            ));
        }
    }

    std::io::Write::flush(&mut writer)?;
    Ok(())
}

/// Composite onto an opaque background, dropping the alpha channel.
pub fn flatten(img: &DynamicImage, background: [u8; 3]) -> DynamicImage {
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |fg: u8, bg: u8| -> u8 {
            ((u16::from(fg) * alpha + u16::from(bg) * (255 - alpha) + 127) / 255) as u8
        };
        out.put_pixel(
            x,
            y,
            Rgb([
                blend(r, background[0]),
                blend(g, background[1]),
                blend(b, background[2]),
            ]),
        );
    }
    DynamicImage::ImageRgb8(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_flatten_transparent_onto_white() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 255]));

        let flat = flatten(&DynamicImage::ImageRgba8(img), [255, 255, 255]);
        let rgb = flat.as_rgb8().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_flatten_half_alpha() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 128]));
        let flat = flatten(&DynamicImage::ImageRgba8(img), [255, 255, 255]);
        let [r, g, b] = flat.as_rgb8().unwrap().get_pixel(0, 0).0;
        assert_eq!((r, g, b), (127, 127, 127));
    }

    #[test]
    fn test_flatten_custom_background() {
        let mut img = RgbaImage::new(1, 1);
        img.put_pixel(0, 0, Rgba([255, 255, 255, 0]));
        let flat = flatten(&DynamicImage::ImageRgba8(img), [0, 128, 0]);
        assert_eq!(flat.as_rgb8().unwrap().get_pixel(0, 0).0, [0, 128, 0]);
    }

    #[test]
    fn test_flatten_opaque_is_unchanged() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([1, 2, 3])));
        let flat = flatten(&img, [255, 255, 255]);
        assert!(!flat.color().has_alpha());
        assert_eq!(flat.as_rgb8().unwrap().get_pixel(2, 2).0, [1, 2, 3]);
    }
}
