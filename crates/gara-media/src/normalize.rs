//! Bound-constrained image downscaling.
//!
//! The scale factor is a single integer shared by both axes, computed as
//! the larger of the per-axis overshoot ratios rounded up.  Coarse on
//! purpose: an image 2x over on width and 1.1x over on height is halved on
//! both axes rather than fitted per axis, trading optimal packing for a
//! fast, deterministic policy.
//!
//! Output is always JPEG, whatever the input format.  This is a known
//! lossy conversion (transparency is flattened to black) in exchange for a
//! predictable, smaller payload.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::GenericImageView;

use gara_shared::constants::JPEG_QUALITY;

use crate::error::MediaError;

/// A pixel raster re-encoded for transfer.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// JPEG-encoded bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// The integer factor both axes are divided by when an image exceeds the
/// bounds.  Always >= 2 when downscaling triggers, since a factor of 1 on
/// both ratios means the image already fits.
pub fn scale_factor(width: u32, height: u32, max_width: u32, max_height: u32) -> u32 {
    let wr = width.div_ceil(max_width);
    let hr = height.div_ceil(max_height);
    wr.max(hr)
}

/// Decode an image, downscale it if it exceeds `max_width` x `max_height`,
/// and re-encode it as JPEG.
///
/// Images already within bounds keep their pixel dimensions; a second pass
/// over the output therefore changes nothing.
pub fn normalize(
    bytes: &[u8],
    max_width: u32,
    max_height: u32,
) -> Result<NormalizedImage, MediaError> {
    if bytes.is_empty() {
        return Err(MediaError::EmptyInput);
    }

    let decoded = image::load_from_memory(bytes)?;
    let (width, height) = decoded.dimensions();

    let rgb = decoded.to_rgb8();

    let (rgb, out_width, out_height) = if width > max_width || height > max_height {
        let factor = scale_factor(width, height, max_width, max_height);
        let out_width = (width / factor).max(1);
        let out_height = (height / factor).max(1);

        tracing::debug!(width, height, factor, out_width, out_height, "downscaling image");

        (
            imageops::resize(&rgb, out_width, out_height, FilterType::Triangle),
            out_width,
            out_height,
        )
    } else {
        (rgb, width, height)
    };

    let mut data = Vec::new();
    let mut cursor = Cursor::new(&mut data);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;

    Ok(NormalizedImage {
        data,
        width: out_width,
        height: out_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> Vec<u8> {
        use image::{ImageBuffer, Rgb};
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 0]));
        let mut buf = Vec::new();
        let mut cursor = Cursor::new(&mut buf);
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn within_bounds_keeps_dimensions() {
        let bytes = create_test_image(400, 300);
        let out = normalize(&bytes, 512, 1024).unwrap();
        assert_eq!((out.width, out.height), (400, 300));
    }

    #[test]
    fn oversized_image_is_downscaled() {
        // width ratio ceil(2000/512) = 4, height ratio ceil(500/1024) = 1
        let bytes = create_test_image(2000, 500);
        let out = normalize(&bytes, 512, 1024).unwrap();
        assert_eq!((out.width, out.height), (500, 125));
    }

    #[test]
    fn normalization_is_idempotent() {
        let bytes = create_test_image(2000, 500);
        let once = normalize(&bytes, 512, 1024).unwrap();
        let twice = normalize(&once.data, 512, 1024).unwrap();
        assert_eq!((once.width, once.height), (twice.width, twice.height));
    }

    #[test]
    fn scale_factor_is_at_least_two_when_triggered() {
        // Barely over on one axis still doubles.
        assert_eq!(scale_factor(513, 100, 512, 1024), 2);
        assert_eq!(scale_factor(100, 1025, 512, 1024), 2);
        // Larger overshoot picks the worse axis.
        assert_eq!(scale_factor(2000, 500, 512, 1024), 4);
        assert_eq!(scale_factor(2000, 5000, 512, 1024), 5);
    }

    #[test]
    fn result_never_exceeds_bounds() {
        for (w, h) in [(513, 100), (2049, 2049), (512, 2049), (5000, 10)] {
            let bytes = create_test_image(w, h);
            let out = normalize(&bytes, 512, 1024).unwrap();
            assert!(out.width <= 512, "width {} for input {}x{}", out.width, w, h);
            assert!(out.height <= 1024, "height {} for input {}x{}", out.height, w, h);
        }
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(normalize(&[], 512, 1024), Err(MediaError::EmptyInput)));
    }
}
