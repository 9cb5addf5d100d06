use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub mod canvas;
pub mod error;
pub mod font;
pub mod logging;
pub mod mrz;
pub mod render;
pub mod settings;
pub mod style;
#[cfg(test)]
mod test_util;

pub use canvas::{CanvasConfig, RenderedSample, SampleInfo, WordCanvas};
pub use error::{CanvasError, MrzViolation};
pub use font::{BankOptions, CharacterCache, CharacterSet, FontBank, FontEntry, FontHandle};
pub use mrz::{MrzConfig, MrzGenerator, MrzRecord, MrzText, MrzType};
pub use render::{BBox, ClusterRule, GlyphRasterizer, Regularizer};
pub use style::{AlignMode, Direction, OutputDirection, OutputSize, StyleConfig};

/// One invocation of the generator binary: settings file plus command-line overrides.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub text: Option<String>,
    pub count: usize,
    pub output_dir: PathBuf,
    /// `TD1`, `TD2`, `TD3` or `random`; switches to MRZ output.
    pub mrz: Option<String>,
    pub mrz_text: Vec<String>,
    pub settings_path: Option<String>,
    pub seed: Option<u64>,
    pub font_path: Option<String>,
    pub font_bank: Option<String>,
    pub output_size: Option<String>,
    pub direction: Option<String>,
    pub align_mode: Option<String>,
    pub output_direction: Option<String>,
    pub enable_all_random: bool,
    pub random_font: bool,
    pub random_font_weight: bool,
    pub random_text: bool,
    pub random_direction: bool,
    pub random_text_color: bool,
    pub random_background_color: bool,
    pub random_align_mode: bool,
}

/// Generates `config.count` images into `config.output_dir` and returns the written PNG paths.
pub fn run(config: Config) -> Result<Vec<PathBuf>> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    if let Some(mrz_type) = config.mrz.as_deref() {
        let mrz_type = match mrz_type.trim() {
            value if value.eq_ignore_ascii_case("random") => None,
            value => Some(value.parse::<MrzType>()?),
        };
        let mrz_text = match config.mrz_text.as_slice() {
            [] => None,
            [single] => Some(MrzText::Single(single.clone())),
            lines => Some(MrzText::Lines(lines.to_vec())),
        };
        let generator = MrzGenerator::new(settings.mrz.clone())
            .with_context(|| "failed to prepare mrz generator")?;
        return write_mrz_records(&config, &generator, mrz_type, mrz_text.as_ref(), &mut rng);
    }

    let canvas_config = apply_overrides(settings.canvas.clone(), &config)?;
    let canvas = WordCanvas::new(canvas_config).with_context(|| "failed to prepare canvas")?;
    write_samples(&config, &canvas, &mut rng)
}

fn apply_overrides(mut canvas: CanvasConfig, config: &Config) -> Result<CanvasConfig> {
    if let Some(path) = config.font_path.as_deref() {
        canvas.font_path = PathBuf::from(path);
    }
    if let Some(path) = config.font_bank.as_deref() {
        canvas.font_bank = PathBuf::from(path);
    }
    if let Some(size) = config.output_size.as_deref() {
        canvas.output_size = Some(size.parse()?);
    }
    if let Some(direction) = config.direction.as_deref() {
        canvas.direction = direction.parse()?;
    }
    if let Some(align_mode) = config.align_mode.as_deref() {
        canvas.align_mode = align_mode.parse()?;
    }
    if let Some(direction) = config.output_direction.as_deref() {
        canvas.output_direction = direction.parse()?;
    }
    canvas.enable_all_random |= config.enable_all_random;
    canvas.random_font |= config.random_font;
    canvas.use_random_font_weight |= config.random_font_weight;
    canvas.random_text |= config.random_text;
    canvas.random_direction |= config.random_direction;
    canvas.random_text_color |= config.random_text_color;
    canvas.random_background_color |= config.random_background_color;
    canvas.random_align_mode |= config.random_align_mode;
    Ok(canvas)
}

fn write_samples(config: &Config, canvas: &WordCanvas, rng: &mut StdRng) -> Result<Vec<PathBuf>> {
    let text = config.text.as_deref().filter(|text| !text.is_empty());
    if text.is_none() && !canvas.config().random_text {
        return Err(anyhow!("no --text given and random text is disabled"));
    }
    let mut written = Vec::with_capacity(config.count);
    for index in 0..config.count {
        let sample = canvas
            .generate_with(text, rng)
            .with_context(|| format!("failed to generate sample {}", index))?;
        let image_path = config.output_dir.join(format!("sample_{}.png", index));
        let info_path = config.output_dir.join(format!("sample_{}.json", index));
        sample
            .image
            .save(&image_path)
            .with_context(|| format!("failed to write image: {}", image_path.display()))?;
        let content = serde_json::to_string_pretty(&sample.info)?;
        fs::write(&info_path, content)
            .with_context(|| format!("failed to write metadata: {}", info_path.display()))?;
        written.push(image_path);
    }
    info!(count = written.len(), dir = %config.output_dir.display(), "wrote samples");
    Ok(written)
}

fn write_mrz_records(
    config: &Config,
    generator: &MrzGenerator,
    mrz_type: Option<MrzType>,
    mrz_text: Option<&MrzText>,
    rng: &mut StdRng,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(config.count);
    for index in 0..config.count {
        let record = generator
            .compose_with(mrz_type, mrz_text, rng)
            .with_context(|| format!("failed to compose mrz record {}", index))?;
        let image_path = config.output_dir.join(format!("mrz_{}.png", index));
        let info_path = config.output_dir.join(format!("mrz_{}.json", index));
        record
            .image
            .save(&image_path)
            .with_context(|| format!("failed to write image: {}", image_path.display()))?;
        let content = serde_json::to_string_pretty(&json!({
            "mrz_type": record.mrz_type,
            "text": record.text,
            "delimiter": generator.delimiter(),
            "points": record.points,
            "width": record.image.width(),
            "height": record.image.height(),
        }))?;
        fs::write(&info_path, content)
            .with_context(|| format!("failed to write metadata: {}", info_path.display()))?;
        written.push(image_path);
    }
    info!(count = written.len(), dir = %config.output_dir.display(), "wrote mrz records");
    Ok(written)
}
