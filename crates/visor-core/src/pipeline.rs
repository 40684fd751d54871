//! Effect pipeline — glasses, then reflection and fancy passes over the
//! same per-face regions.
//!
//! Every pass reads backgrounds from its immutable input and writes into a
//! fresh canvas, so overlapping faces resolve as last-face-wins.

use crate::compositor::{self, CompositeError};
use crate::effects::EffectLayers;
use crate::placement::{
    resolve_placement, BoundsPolicy, ClippedRegion, PlacementError, PlacementRegion,
};
use crate::scaler::{scale_overlay, ScaleError};
use crate::source::{LandmarkSource, SourceError};
use crate::types::{DetectedFace, LandmarkSet, Opacity, OpacityError};
use image::{Rgb32FImage, RgbImage, RgbaImage};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_GLASSES_OPACITY: f32 = 0.7;
pub const DEFAULT_REFLECTION_OPACITY: f32 = 0.4;
pub const DEFAULT_FANCY_OPACITY: f32 = 0.4;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("scaling overlay for face {face}: {source}")]
    Scale { face: usize, source: ScaleError },
    #[error("placing overlay for face {face}: {source}")]
    Placement { face: usize, source: PlacementError },
    #[error("compositing: {0}")]
    Composite(#[from] CompositeError),
    #[error("invalid opacity: {0}")]
    Opacity(#[from] OpacityError),
    #[error("effect layer is {layer:?}, frame is {frame:?}")]
    LayerSizeMismatch { layer: (u32, u32), frame: (u32, u32) },
    #[error("landmark source: {0}")]
    Source(#[from] SourceError),
}

/// Blend strengths and bounds handling for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Blend strength of the sunglasses overlay.
    pub glasses_opacity: f32,
    /// Blend strength of the reflection layer.
    pub reflection_opacity: f32,
    /// Blend strength of the texture layer.
    pub fancy_opacity: f32,
    pub bounds: BoundsPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            glasses_opacity: DEFAULT_GLASSES_OPACITY,
            reflection_opacity: DEFAULT_REFLECTION_OPACITY,
            fancy_opacity: DEFAULT_FANCY_OPACITY,
            bounds: BoundsPolicy::default(),
        }
    }
}

/// The overlay pieces one face contributes, already cut to the visible area.
#[derive(Debug, Clone)]
pub struct PlacedOverlay {
    pub clip: ClippedRegion,
    pub color: RgbImage,
    pub mask: Rgb32FImage,
}

/// Where one face's glasses went. Reused unchanged by the effect passes.
#[derive(Debug, Clone)]
pub struct FacePlacement {
    pub region: PlacementRegion,
    pub scale: f64,
    /// `None` when the region lies entirely outside the frame.
    pub placed: Option<PlacedOverlay>,
}

/// All three results of one run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub with_glasses: RgbImage,
    pub with_reflection: RgbImage,
    pub with_fancy: RgbImage,
    pub placements: Vec<FacePlacement>,
}

/// Stateless overlay pipeline around one shared sunglasses asset.
pub struct EffectPipeline<'a> {
    glasses: &'a RgbaImage,
    glasses_opacity: Opacity,
    reflection_opacity: Opacity,
    fancy_opacity: Opacity,
    bounds: BoundsPolicy,
}

impl<'a> EffectPipeline<'a> {
    pub fn new(glasses: &'a RgbaImage, config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            glasses,
            glasses_opacity: Opacity::new(config.glasses_opacity)?,
            reflection_opacity: Opacity::new(config.reflection_opacity)?,
            fancy_opacity: Opacity::new(config.fancy_opacity)?,
            bounds: config.bounds,
        })
    }

    /// Detect faces with `source`, then run every pass.
    pub fn process(
        &self,
        source: &mut dyn LandmarkSource,
        image: &RgbImage,
        layers: &EffectLayers,
    ) -> Result<(Vec<DetectedFace>, PipelineOutput), PipelineError> {
        let faces = source.detect_faces(image)?;
        let landmarks: Vec<LandmarkSet> = faces.iter().map(|f| f.landmarks.clone()).collect();
        let output = self.run(image, &landmarks, layers)?;
        Ok((faces, output))
    }

    /// Run the glasses pass and both effect passes for already-detected faces.
    pub fn run(
        &self,
        image: &RgbImage,
        faces: &[LandmarkSet],
        layers: &EffectLayers,
    ) -> Result<PipelineOutput, PipelineError> {
        let (with_glasses, placements) = self.apply_glasses(image, faces)?;
        let with_reflection =
            self.apply_layer(&with_glasses, &layers.reflection, &placements, self.reflection_opacity)?;
        // Branches from the glasses result, not from the reflection result.
        let with_fancy =
            self.apply_layer(&with_glasses, &layers.fancy, &placements, self.fancy_opacity)?;

        Ok(PipelineOutput {
            with_glasses,
            with_reflection,
            with_fancy,
            placements,
        })
    }

    /// Scale, place and blend the sunglasses onto every face.
    pub fn apply_glasses(
        &self,
        image: &RgbImage,
        faces: &[LandmarkSet],
    ) -> Result<(RgbImage, Vec<FacePlacement>), PipelineError> {
        let (width, height) = image.dimensions();
        let mut canvas = image.clone();
        let mut placements = Vec::with_capacity(faces.len());

        for (face, landmarks) in faces.iter().enumerate() {
            let overlay = scale_overlay(self.glasses, landmarks)
                .map_err(|source| PipelineError::Scale { face, source })?;
            let region = resolve_placement(overlay.dimensions(), landmarks);
            let clip = region
                .constrain(self.bounds, width, height)
                .map_err(|source| PipelineError::Placement { face, source })?;

            let placed = match clip {
                Some(clip) => {
                    let color = compositor::crop_overlay(&overlay.color, &clip);
                    let mask = compositor::crop_overlay(&overlay.mask, &clip);
                    compositor::composite_region(
                        image,
                        &mut canvas,
                        &clip,
                        &color,
                        &mask,
                        self.glasses_opacity,
                    )?;
                    if (clip.width, clip.height) != (region.width, region.height) {
                        tracing::debug!(face, ?region, ?clip, "overlay clipped at frame edge");
                    }
                    Some(PlacedOverlay { clip, color, mask })
                }
                None => {
                    tracing::warn!(face, ?region, "overlay lies outside the frame; skipping face");
                    None
                }
            };

            tracing::debug!(face, scale = overlay.scale, ?region, "glasses applied");
            placements.push(FacePlacement {
                region,
                scale: overlay.scale,
                placed,
            });
        }

        tracing::info!(faces = faces.len(), "glasses pass complete");
        Ok((canvas, placements))
    }

    /// Blend a full-frame `layer` into each recorded glasses area of `base`,
    /// weighted by that face's glasses mask.
    pub fn apply_layer(
        &self,
        base: &RgbImage,
        layer: &RgbImage,
        placements: &[FacePlacement],
        opacity: Opacity,
    ) -> Result<RgbImage, PipelineError> {
        if layer.dimensions() != base.dimensions() {
            return Err(PipelineError::LayerSizeMismatch {
                layer: layer.dimensions(),
                frame: base.dimensions(),
            });
        }

        let mut canvas = base.clone();
        for placed in placements.iter().filter_map(|p| p.placed.as_ref()) {
            let foreground = compositor::crop_region(layer, &placed.clip);
            compositor::composite_region(
                base,
                &mut canvas,
                &placed.clip,
                &foreground,
                &placed.mask,
                opacity,
            )?;
        }
        Ok(canvas)
    }
}
