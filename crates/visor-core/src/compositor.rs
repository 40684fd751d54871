//! Alpha compositing with a per-pixel mask and a global opacity.

use crate::placement::ClippedRegion;
use crate::types::Opacity;
use image::imageops;
use image::{ImageBuffer, Pixel, Rgb, Rgb32FImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CompositeError {
    #[error(
        "shape mismatch: background {background:?}, foreground {foreground:?}, mask {mask:?}"
    )]
    ShapeMismatch {
        background: (u32, u32),
        foreground: (u32, u32),
        mask: (u32, u32),
    },
}

/// Blend `foreground` over `background`.
///
/// Per channel: `out = bg * (1 - w) + fg * w` with `w = mask * opacity`,
/// computed in `f32` and rounded back to `u8`. Inputs are only read; the
/// result is a new buffer.
pub fn blend(
    background: &RgbImage,
    foreground: &RgbImage,
    mask: &Rgb32FImage,
    opacity: Opacity,
) -> Result<RgbImage, CompositeError> {
    let dims = background.dimensions();
    if foreground.dimensions() != dims || mask.dimensions() != dims {
        return Err(CompositeError::ShapeMismatch {
            background: dims,
            foreground: foreground.dimensions(),
            mask: mask.dimensions(),
        });
    }

    let opacity = opacity.value();
    let mut out = RgbImage::new(dims.0, dims.1);
    for (((dst, bg), fg), m) in out
        .pixels_mut()
        .zip(background.pixels())
        .zip(foreground.pixels())
        .zip(mask.pixels())
    {
        for c in 0..3 {
            let weight = m.0[c] * opacity;
            let val = f32::from(bg.0[c]) * (1.0 - weight) + f32::from(fg.0[c]) * weight;
            dst.0[c] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    Ok(out)
}

/// Copy the area of `image` starting at `(x, y)` with the size of `region`.
pub fn crop_at<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    x: u32,
    y: u32,
    region: &ClippedRegion,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    imageops::crop_imm(image, x, y, region.width, region.height).to_image()
}

/// Read the base-image area covered by `region`.
pub fn crop_region(image: &RgbImage, region: &ClippedRegion) -> RgbImage {
    crop_at(image, region.x, region.y, region)
}

/// Read the overlay-space area covered by `region`.
pub fn crop_overlay<P>(
    overlay: &ImageBuffer<P, Vec<P::Subpixel>>,
    region: &ClippedRegion,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    crop_at(overlay, region.offset_x, region.offset_y, region)
}

/// Write `blended` back into `canvas` at `region` in one step.
pub fn commit_region(canvas: &mut RgbImage, region: &ClippedRegion, blended: &RgbImage) {
    imageops::replace(canvas, blended, i64::from(region.x), i64::from(region.y));
}

/// Blend `foreground` into `canvas` at `region`, reading the background
/// from `source`.
///
/// `source` and `canvas` are separate so that every face of a pass sees
/// the pass input, not what an earlier face already wrote.
pub fn composite_region(
    source: &RgbImage,
    canvas: &mut RgbImage,
    region: &ClippedRegion,
    foreground: &RgbImage,
    mask: &Rgb32FImage,
    opacity: Opacity,
) -> Result<(), CompositeError> {
    let background = crop_region(source, region);
    let blended = blend(&background, foreground, mask, opacity)?;
    commit_region(canvas, region, &blended);
    Ok(())
}

/// A full-size mask with the same weight everywhere.
pub fn uniform_mask(width: u32, height: u32, weight: f32) -> Rgb32FImage {
    Rgb32FImage::from_pixel(width, height, Rgb([weight; 3]))
}
