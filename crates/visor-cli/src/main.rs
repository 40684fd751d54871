use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};
use visor_core::annotate::{draw_face_boxes, draw_landmarks};
use visor_core::{
    BoundsPolicy, EffectLayers, EffectPipeline, JsonLandmarkSource, LandmarkSource,
    OnnxLandmarkSource,
};

mod config;
mod preview;

use config::{Config, Overrides};
use preview::PreviewDir;

#[derive(Parser)]
#[command(name = "visor", about = "Put sunglasses on every face in a photo")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply sunglasses, reflection and fancy effects and write previews
    Apply(ApplyArgs),
    /// Detect faces and print their landmarks as JSON
    Detect(DetectArgs),
}

#[derive(Args)]
struct ApplyArgs {
    #[command(flatten)]
    assets: AssetArgs,
    /// Precomputed landmarks (output of `visor detect`) instead of running models
    #[arg(long)]
    landmarks: Option<PathBuf>,
    /// Directory the preview PNGs are written to
    #[arg(long, default_value = "visor-out")]
    out_dir: PathBuf,
    #[command(flatten)]
    tuning: TuningArgs,
}

#[derive(Args)]
struct AssetArgs {
    /// Photo to process
    #[arg(long)]
    image: PathBuf,
    /// Sunglasses graphic with an alpha channel
    #[arg(long)]
    glasses: PathBuf,
    /// Picture used as the specular reflection (converted to grayscale)
    #[arg(long)]
    reflection: PathBuf,
    /// Texture used for the fancy effect
    #[arg(long)]
    fancy: PathBuf,
}

#[derive(Args)]
struct DetectArgs {
    /// Photo to process
    #[arg(long)]
    image: PathBuf,
    #[command(flatten)]
    tuning: TuningArgs,
}

#[derive(Args)]
struct TuningArgs {
    /// Directory containing det_10g.onnx and landmarks_68.onnx
    #[arg(long)]
    model_dir: Option<PathBuf>,
    /// Resize factor applied to the photo before processing
    #[arg(long)]
    input_scale: Option<f32>,
    /// Blend strength of the sunglasses (0-1)
    #[arg(long)]
    glasses_opacity: Option<f32>,
    /// Blend strength of the reflection layer (0-1)
    #[arg(long)]
    reflection_opacity: Option<f32>,
    /// Blend strength of the fancy layer (0-1)
    #[arg(long)]
    fancy_opacity: Option<f32>,
    /// What to do with glasses that leave the frame: clip or reject
    #[arg(long)]
    bounds: Option<BoundsPolicy>,
}

impl From<TuningArgs> for Overrides {
    fn from(args: TuningArgs) -> Self {
        Self {
            glasses_opacity: args.glasses_opacity,
            reflection_opacity: args.reflection_opacity,
            fancy_opacity: args.fancy_opacity,
            bounds: args.bounds,
            input_scale: args.input_scale,
            model_dir: args.model_dir,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Apply(args) => {
            let config = Config::load(cli.config.as_deref(), args.tuning.into())?;
            run_apply(&config, &args.assets, args.landmarks.as_deref(), &args.out_dir)?;
        }
        Commands::Detect(args) => {
            let config = Config::load(cli.config.as_deref(), args.tuning.into())?;
            run_detect(&config, &args.image)?;
        }
    }

    Ok(())
}

fn run_apply(
    config: &Config,
    assets: &AssetArgs,
    landmarks_path: Option<&Path>,
    out_dir: &Path,
) -> Result<()> {
    let image = load_frame(&assets.image, config.input_scale)?;
    let (width, height) = image.dimensions();

    let glasses = open_image(&assets.glasses, "glasses")?.to_rgba8();
    let reflection = open_image(&assets.reflection, "reflection")?.to_luma8();
    let fancy = open_image(&assets.fancy, "fancy")?.to_rgb8();
    let layers = EffectLayers::fit(&reflection, &fancy, width, height);

    let previews = PreviewDir::create(out_dir)?;
    previews.show("Input Image", &image)?;
    previews.show("Specular Reflection", &layers.reflection)?;
    previews.show("Fancy Effect", &layers.fancy)?;

    let mut source = open_source(config, landmarks_path)?;
    let pipeline = EffectPipeline::new(&glasses, &config.pipeline)?;
    let (faces, output) = pipeline.process(source.as_mut(), &image, &layers)?;
    println!("Number of faces detected: {}", faces.len());

    previews.show("Detected Faces", &draw_face_boxes(&image, &faces))?;
    previews.show("Facial Landmarks", &draw_landmarks(&image, &faces))?;
    previews.show("Faces with glasses", &output.with_glasses)?;
    previews.show("Glasses With Specular Reflection", &output.with_reflection)?;
    previews.show("Glasses With Fancy Effect", &output.with_fancy)?;

    for (i, placement) in output.placements.iter().enumerate() {
        let region = placement.region;
        match &placement.placed {
            Some(_) => println!(
                "face {i}: scale {:.3}, glasses at ({}, {}) size {}x{}",
                placement.scale, region.left, region.top, region.width, region.height
            ),
            None => println!("face {i}: glasses fall outside the frame, skipped"),
        }
    }
    println!("Previews written to {}", out_dir.display());

    Ok(())
}

fn run_detect(config: &Config, image_path: &Path) -> Result<()> {
    let image = load_frame(image_path, config.input_scale)?;
    let mut source = OnnxLandmarkSource::load(&config.model_dir)
        .with_context(|| format!("loading models from {}", config.model_dir.display()))?;
    let faces = source.detect_faces(&image)?;
    println!("{}", serde_json::to_string_pretty(&faces)?);
    Ok(())
}

fn open_source(config: &Config, landmarks_path: Option<&Path>) -> Result<Box<dyn LandmarkSource>> {
    let source: Box<dyn LandmarkSource> = match landmarks_path {
        Some(path) => Box::new(JsonLandmarkSource::load(path)?),
        None => Box::new(
            OnnxLandmarkSource::load(&config.model_dir)
                .with_context(|| format!("loading models from {}", config.model_dir.display()))?,
        ),
    };
    Ok(source)
}

fn open_image(path: &Path, what: &str) -> Result<DynamicImage> {
    image::open(path).with_context(|| format!("opening {what} image {}", path.display()))
}

/// Open a photo as RGB and apply the configured pre-scale.
fn load_frame(path: &Path, scale: f32) -> Result<RgbImage> {
    let image = open_image(path, "input")?.to_rgb8();
    if scale == 1.0 {
        return Ok(image);
    }

    let width = ((image.width() as f32 * scale).round() as u32).max(1);
    let height = ((image.height() as f32 * scale).round() as u32).max(1);
    tracing::debug!(scale, width, height, "rescaling input frame");
    Ok(imageops::resize(&image, width, height, FilterType::Triangle))
}
