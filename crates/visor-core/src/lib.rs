//! visor-core — Landmark-driven sunglasses overlay.
//!
//! Scales a sunglasses asset to each detected face, centers it between the
//! eyes and alpha-blends it in, then reuses the same regions for
//! reflection and texture effect passes. Face landmarks come from any
//! [`LandmarkSource`]; an ONNX Runtime implementation (SCRFD + 68-point
//! regressor) and a JSON-file implementation are provided.

pub mod annotate;
pub mod compositor;
pub mod detector;
pub mod effects;
pub mod landmarker;
pub mod pipeline;
pub mod placement;
pub mod scaler;
pub mod source;
pub mod types;

pub use effects::EffectLayers;
pub use pipeline::{EffectPipeline, PipelineConfig, PipelineError, PipelineOutput};
pub use placement::BoundsPolicy;
pub use source::{JsonLandmarkSource, LandmarkSource, OnnxLandmarkSource};
pub use types::{DetectedFace, FaceBox, FacialLandmark, LandmarkSet, Opacity, Point};

/// Default model directory: `$XDG_DATA_HOME/visor/models`, falling back to
/// `~/.local/share/visor/models`.
pub fn default_model_dir() -> std::path::PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            std::path::PathBuf::from(home).join(".local/share")
        })
        .join("visor/models")
}
