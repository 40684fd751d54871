//! Overlay scaling — fits the sunglasses asset to one face's width.

use crate::types::{FacialLandmark, LandmarkSet};
use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage, RgbImage, RgbaImage};
use thiserror::Error;

/// Overlay width relative to the jaw-to-jaw face width.
pub const FACE_WIDTH_MARGIN: f64 = 1.1;
/// Largest side a scaled overlay may have.
pub const MAX_OVERLAY_SIDE: u32 = 16_384;

#[derive(Error, Debug, PartialEq)]
pub enum ScaleError {
    #[error("invalid landmarks: jaw end x ({right_x}) must exceed jaw start x ({left_x})")]
    InvalidLandmarks { left_x: i32, right_x: i32 },
    #[error("invalid landmarks: scale factor {scale} collapses the overlay to zero size")]
    DegenerateScale { scale: f64 },
    #[error("scaled overlay would be {width}x{height}, over {max} px per side", max = MAX_OVERLAY_SIDE)]
    OversizedOverlay { width: f64, height: f64 },
    #[error("overlay asset is empty ({width}x{height})")]
    EmptyOverlay { width: u32, height: u32 },
}

/// Per-face overlay: color pixels plus a [0, 1] mask with alpha in every channel.
#[derive(Debug, Clone)]
pub struct ScaledOverlay {
    pub color: RgbImage,
    pub mask: Rgb32FImage,
    pub scale: f64,
}

impl ScaledOverlay {
    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// Scale factor that maps the asset width onto the face width plus margin.
pub fn scale_factor(asset_width: u32, landmarks: &LandmarkSet) -> Result<f64, ScaleError> {
    let left_x = landmarks.point(FacialLandmark::JawStart).x;
    let right_x = landmarks.point(FacialLandmark::JawEnd).x;
    if right_x <= left_x {
        return Err(ScaleError::InvalidLandmarks { left_x, right_x });
    }

    let face_width = (f64::from(right_x) - f64::from(left_x)) * FACE_WIDTH_MARGIN;
    Ok(face_width / f64::from(asset_width))
}

/// Resize `asset` uniformly to the face described by `landmarks` and split
/// it into color and normalized mask.
pub fn scale_overlay(asset: &RgbaImage, landmarks: &LandmarkSet) -> Result<ScaledOverlay, ScaleError> {
    let (width, height) = asset.dimensions();
    if width == 0 || height == 0 {
        return Err(ScaleError::EmptyOverlay { width, height });
    }

    let scale = scale_factor(width, landmarks)?;
    let scaled_width = (f64::from(width) * scale).round();
    let scaled_height = (f64::from(height) * scale).round();
    if scaled_width < 1.0 || scaled_height < 1.0 {
        return Err(ScaleError::DegenerateScale { scale });
    }
    let limit = f64::from(MAX_OVERLAY_SIDE);
    if scaled_width > limit || scaled_height > limit {
        return Err(ScaleError::OversizedOverlay {
            width: scaled_width,
            height: scaled_height,
        });
    }
    let new_width = scaled_width as u32;
    let new_height = scaled_height as u32;

    let resized = imageops::resize(asset, new_width, new_height, FilterType::Triangle);

    let color = RgbImage::from_fn(new_width, new_height, |x, y| {
        let [r, g, b, _] = resized.get_pixel(x, y).0;
        Rgb([r, g, b])
    });
    let mask = Rgb32FImage::from_fn(new_width, new_height, |x, y| {
        let alpha = f32::from(resized.get_pixel(x, y).0[3]) / 255.0;
        Rgb([alpha; 3])
    });

    tracing::debug!(
        scale,
        width = new_width,
        height = new_height,
        "scaled overlay to face"
    );

    Ok(ScaledOverlay { color, mask, scale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::face_landmarks;
    use crate::types::Point;
    use image::Rgba;

    fn opaque_asset(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([20, 30, 40, 255]))
    }

    fn face(left: i32, right: i32) -> LandmarkSet {
        face_landmarks(
            Point::new(left, 200),
            Point::new(right, 200),
            (Point::new(140, 230), Point::new(160, 230)),
        )
    }

    #[test]
    fn test_scale_factor_uses_face_width_margin() {
        let scale = scale_factor(50, &face(100, 200)).unwrap();
        assert!((scale - 2.2).abs() < 1e-9, "scale = {scale}");
    }

    #[test]
    fn test_scale_overlay_dimensions() {
        let overlay = scale_overlay(&opaque_asset(50, 20), &face(100, 200)).unwrap();
        assert_eq!(overlay.dimensions(), (110, 44));
        assert_eq!(overlay.mask.dimensions(), (110, 44));
    }

    #[test]
    fn test_color_and_mask_always_match() {
        for (w, h, right) in [(7, 3, 101), (640, 200, 180), (33, 90, 250)] {
            let overlay = scale_overlay(&opaque_asset(w, h), &face(100, right)).unwrap();
            let (ow, oh) = overlay.dimensions();
            assert!(ow > 0 && oh > 0);
            assert_eq!(overlay.mask.dimensions(), (ow, oh));
        }
    }

    #[test]
    fn test_mask_normalized_and_replicated() {
        let mut asset = RgbaImage::new(11, 10);
        for (x, _, px) in asset.enumerate_pixels_mut() {
            *px = Rgba([255, 0, 0, if x < 5 { 0 } else { 255 }]);
        }
        // 1.1 * 10 / 11 keeps the asset size.
        let overlay = scale_overlay(&asset, &face(0, 10)).unwrap();
        assert_eq!(overlay.dimensions(), (11, 10));

        for px in overlay.mask.pixels() {
            let [a, b, c] = px.0;
            assert!((0.0..=1.0).contains(&a));
            assert_eq!(a, b);
            assert_eq!(b, c);
        }
        assert_eq!(overlay.mask.get_pixel(0, 5).0, [0.0; 3]);
        assert_eq!(overlay.mask.get_pixel(10, 5).0, [1.0; 3]);
        assert_eq!(overlay.color.get_pixel(10, 5).0, [255, 0, 0]);
    }

    #[test]
    fn test_reversed_landmarks_rejected() {
        let err = scale_overlay(&opaque_asset(50, 20), &face(200, 100)).unwrap_err();
        assert_eq!(err, ScaleError::InvalidLandmarks { left_x: 200, right_x: 100 });
    }

    #[test]
    fn test_zero_width_face_rejected() {
        let err = scale_overlay(&opaque_asset(50, 20), &face(150, 150)).unwrap_err();
        assert!(matches!(err, ScaleError::InvalidLandmarks { .. }));
    }

    #[test]
    fn test_tiny_face_collapsing_height_rejected() {
        // 1.1 px wide face on a 1000x10 asset rounds the height to zero.
        let err = scale_overlay(&opaque_asset(1000, 10), &face(100, 101)).unwrap_err();
        assert!(matches!(err, ScaleError::DegenerateScale { .. }));
    }

    #[test]
    fn test_extreme_jaw_coordinates_do_not_overflow() {
        let wide = face(i32::MIN, i32::MAX);
        let scale = scale_factor(50, &wide).unwrap();
        let expected = (f64::from(i32::MAX) - f64::from(i32::MIN)) * FACE_WIDTH_MARGIN / 50.0;
        assert!((scale - expected).abs() < 1.0);

        let err = scale_overlay(&opaque_asset(50, 20), &face(-10, i32::MAX)).unwrap_err();
        assert!(matches!(err, ScaleError::OversizedOverlay { .. }));
    }

    #[test]
    fn test_overlay_side_limit() {
        // 1.1 * 14896 = 16385.6 rounds past the limit; 14894 stays under it.
        let err = scale_overlay(&opaque_asset(1000, 1), &face(0, 14_896)).unwrap_err();
        assert!(matches!(err, ScaleError::OversizedOverlay { .. }));
        let overlay = scale_overlay(&opaque_asset(1000, 1), &face(0, 14_894)).unwrap();
        assert_eq!(overlay.dimensions(), (16_383, 16));
    }

    #[test]
    fn test_empty_asset_rejected() {
        let err = scale_overlay(&RgbaImage::new(0, 0), &face(100, 200)).unwrap_err();
        assert_eq!(err, ScaleError::EmptyOverlay { width: 0, height: 0 });
    }
}
