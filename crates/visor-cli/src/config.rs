use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use visor_core::{BoundsPolicy, Opacity, PipelineConfig};

/// Resolved CLI configuration.
///
/// Layered lowest to highest: built-in defaults, TOML config file,
/// `VISOR_*` environment variables, command-line flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub pipeline: PipelineConfig,
    /// Factor applied to the input photo before processing (1.0 = as is).
    pub input_scale: f32,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
}

/// One configuration layer. Unset fields leave lower layers in place.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    pub glasses_opacity: Option<f32>,
    pub reflection_opacity: Option<f32>,
    pub fancy_opacity: Option<f32>,
    pub bounds: Option<BoundsPolicy>,
    pub input_scale: Option<f32>,
    pub model_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            input_scale: 1.0,
            model_dir: visor_core::default_model_dir(),
        }
    }
}

impl Config {
    /// Build the configuration from an optional file, the process
    /// environment and CLI flags.
    pub fn load(file: Option<&Path>, flags: Overrides) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = file {
            config.apply(Overrides::from_file(path)?);
        }
        config.apply(Overrides::from_vars(|key| std::env::var(key).ok())?);
        config.apply(flags);
        config.validate()?;
        tracing::debug!(?config, "configuration resolved");
        Ok(config)
    }

    pub fn apply(&mut self, layer: Overrides) {
        let pipeline = &mut self.pipeline;
        if let Some(v) = layer.glasses_opacity {
            pipeline.glasses_opacity = v;
        }
        if let Some(v) = layer.reflection_opacity {
            pipeline.reflection_opacity = v;
        }
        if let Some(v) = layer.fancy_opacity {
            pipeline.fancy_opacity = v;
        }
        if let Some(v) = layer.bounds {
            pipeline.bounds = v;
        }
        if let Some(v) = layer.input_scale {
            self.input_scale = v;
        }
        if let Some(v) = layer.model_dir {
            self.model_dir = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("glasses_opacity", self.pipeline.glasses_opacity),
            ("reflection_opacity", self.pipeline.reflection_opacity),
            ("fancy_opacity", self.pipeline.fancy_opacity),
        ] {
            Opacity::new(value).with_context(|| format!("invalid {name}"))?;
        }
        if !(self.input_scale.is_finite() && self.input_scale > 0.0) {
            bail!("input_scale must be a positive number, got {}", self.input_scale);
        }
        Ok(())
    }
}

impl Overrides {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read `VISOR_*` variables through `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            glasses_opacity: parse_var(&lookup, "VISOR_GLASSES_OPACITY")?,
            reflection_opacity: parse_var(&lookup, "VISOR_REFLECTION_OPACITY")?,
            fancy_opacity: parse_var(&lookup, "VISOR_FANCY_OPACITY")?,
            bounds: parse_var(&lookup, "VISOR_BOUNDS")?,
            input_scale: parse_var(&lookup, "VISOR_INPUT_SCALE")?,
            model_dir: lookup("VISOR_MODEL_DIR").map(PathBuf::from),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse() {
            Ok(v) => Ok(Some(v)),
            Err(e) => bail!("{key}={raw:?}: {e}"),
        },
    }
}
