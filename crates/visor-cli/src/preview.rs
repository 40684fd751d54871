//! Preview sink: each named preview becomes `<out_dir>/<slug>.png`.

use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};

pub struct PreviewDir {
    dir: PathBuf,
}

impl PreviewDir {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating preview directory {}", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.png", slug(name)))
    }

    pub fn show(&self, name: &str, image: &RgbImage) -> Result<PathBuf> {
        let path = self.path_for(name);
        image
            .save(&path)
            .with_context(|| format!("writing preview {name:?} to {}", path.display()))?;
        tracing::info!(preview = name, path = %path.display(), "preview written");
        Ok(path)
    }
}

/// "Glasses With Fancy Effect" → "glasses_with_fancy_effect".
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Glasses With Fancy Effect"), "glasses_with_fancy_effect");
        assert_eq!(slug("  Faces with glasses! "), "faces_with_glasses");
        assert_eq!(slug("Input Image"), "input_image");
    }

    #[test]
    fn test_path_for() {
        let sink = PreviewDir { dir: PathBuf::from("/tmp/out") };
        assert_eq!(sink.path_for("Facial Landmarks"), PathBuf::from("/tmp/out/facial_landmarks.png"));
    }
}
