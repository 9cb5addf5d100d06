use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::canvas::CanvasConfig;
use crate::mrz::MrzConfig;
use crate::render::ClusterRule;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub canvas: CanvasConfig,
    pub mrz: MrzConfig,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    canvas: Option<CanvasSettings>,
    random: Option<RandomSettings>,
    mrz: Option<MrzSettings>,
    cache: Option<CacheSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct CanvasSettings {
    font_path: Option<String>,
    font_bank: Option<String>,
    font_size: Option<f32>,
    direction: Option<String>,
    text_color: Option<[i32; 3]>,
    background_color: Option<[i32; 3]>,
    text_aspect_ratio: Option<f32>,
    align_mode: Option<String>,
    output_size: Option<String>,
    output_direction: Option<String>,
    block_font_list: Option<Vec<String>>,
    cluster_pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RandomSettings {
    enable_all: Option<bool>,
    font: Option<bool>,
    font_weight: Option<bool>,
    text: Option<bool>,
    min_text_length: Option<usize>,
    max_text_length: Option<usize>,
    direction: Option<bool>,
    text_color: Option<bool>,
    background_color: Option<bool>,
    align_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct MrzSettings {
    font_path: Option<String>,
    font_size: Option<f32>,
    text_color: Option<[i32; 3]>,
    background_color: Option<[i32; 3]>,
    interval: Option<u32>,
    delimiter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CacheSettings {
    dir: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings
                .merge(parsed)
                .with_context(|| format!("invalid settings in {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) -> Result<()> {
        if let Some(canvas) = incoming.canvas {
            let config = &mut self.canvas;
            if let Some(path) = non_empty(canvas.font_path) {
                config.font_path = PathBuf::from(path);
            }
            if let Some(path) = non_empty(canvas.font_bank) {
                config.font_bank = PathBuf::from(path);
            }
            if let Some(size) = canvas.font_size {
                if size > 0.0 {
                    config.font_size = size;
                }
            }
            if let Some(direction) = non_empty(canvas.direction) {
                config.direction = direction.parse()?;
            }
            if let Some(color) = canvas.text_color {
                config.text_color = color;
            }
            if let Some(color) = canvas.background_color {
                config.background_color = color;
            }
            if let Some(ratio) = canvas.text_aspect_ratio {
                config.text_aspect_ratio = ratio;
            }
            if let Some(align_mode) = non_empty(canvas.align_mode) {
                config.align_mode = align_mode.parse()?;
            }
            if let Some(size) = non_empty(canvas.output_size) {
                config.output_size = Some(size.parse()?);
            }
            if let Some(direction) = non_empty(canvas.output_direction) {
                config.output_direction = direction.parse()?;
            }
            if let Some(list) = canvas.block_font_list {
                config.block_font_list = list;
            }
            if let Some(pattern) = non_empty(canvas.cluster_pattern) {
                config.cluster_rule = ClusterRule::new(&pattern)?;
            }
        }
        if let Some(random) = incoming.random {
            let config = &mut self.canvas;
            if let Some(value) = random.enable_all {
                config.enable_all_random = value;
            }
            if let Some(value) = random.font {
                config.random_font = value;
            }
            if let Some(value) = random.font_weight {
                config.use_random_font_weight = value;
            }
            if let Some(value) = random.text {
                config.random_text = value;
            }
            if let Some(value) = random.min_text_length {
                config.min_random_text_length = value;
            }
            if let Some(value) = random.max_text_length {
                config.max_random_text_length = value;
            }
            if let Some(value) = random.direction {
                config.random_direction = value;
            }
            if let Some(value) = random.text_color {
                config.random_text_color = value;
            }
            if let Some(value) = random.background_color {
                config.random_background_color = value;
            }
            if let Some(value) = random.align_mode {
                config.random_align_mode = value;
            }
        }
        if let Some(mrz) = incoming.mrz {
            let config = &mut self.mrz;
            if let Some(path) = non_empty(mrz.font_path) {
                config.font_path = PathBuf::from(path);
            }
            if let Some(size) = mrz.font_size {
                if size > 0.0 {
                    config.font_size = size;
                }
            }
            if let Some(color) = mrz.text_color {
                config.text_color = color;
            }
            if let Some(color) = mrz.background_color {
                config.background_color = color;
            }
            if let Some(interval) = mrz.interval {
                config.interval = Some(interval);
            }
            if let Some(delimiter) = mrz.delimiter {
                config.delimiter = delimiter;
            }
        }
        if let Some(cache) = incoming.cache {
            if let Some(dir) = non_empty(cache.dir) {
                self.canvas.cache_dir = Some(PathBuf::from(&dir));
                self.mrz.cache_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".wordcanvas"))
        }
    })
}
