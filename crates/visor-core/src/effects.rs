//! Full-frame effect layers blended over the glasses area.

use image::imageops::{self, FilterType};
use image::{GrayImage, Rgb, RgbImage};

/// Reflection layer: a grayscale picture stretched to the frame and
/// replicated into three channels.
pub fn reflection_layer(luma: &GrayImage, width: u32, height: u32) -> RgbImage {
    let resized = imageops::resize(luma, width, height, FilterType::Triangle);
    RgbImage::from_fn(width, height, |x, y| Rgb([resized.get_pixel(x, y).0[0]; 3]))
}

/// Texture layer: a color picture stretched to the frame.
pub fn fancy_layer(texture: &RgbImage, width: u32, height: u32) -> RgbImage {
    if texture.dimensions() == (width, height) {
        return texture.clone();
    }
    imageops::resize(texture, width, height, FilterType::Triangle)
}

/// Both effect layers, sized to one base image.
#[derive(Debug, Clone)]
pub struct EffectLayers {
    pub reflection: RgbImage,
    pub fancy: RgbImage,
}

impl EffectLayers {
    pub fn fit(reflection: &GrayImage, fancy: &RgbImage, width: u32, height: u32) -> Self {
        tracing::debug!(width, height, "fitting effect layers to frame");
        Self {
            reflection: reflection_layer(reflection, width, height),
            fancy: fancy_layer(fancy, width, height),
        }
    }
}
