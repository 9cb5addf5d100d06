use std::path::PathBuf;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

use crate::error::{CanvasError, Result};
use crate::font::{
    BankOptions, CharacterCache, CharacterSet, FontBank, FontEntry, FontHandle, blocked_by,
    characters_of, font_stem,
};
use crate::render::imageops::{rotate90_clockwise, rotate270_clockwise};
use crate::render::{
    ClusterRule, GlyphRasterizer, Regularizer, RenderRequest, ScatterRequest, compose_scatter,
    render_text,
};
use crate::style::{
    AlignMode, Direction, OutputDirection, OutputSize, StyleConfig, clamp_color,
};

pub const DEFAULT_FONT_PATH: &str = "fonts/NotoSansTC-Regular.otf";
pub const DEFAULT_FONT_BANK: &str = "fonts";

/// Everything a [`WordCanvas`] needs, fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct CanvasConfig {
    pub font_path: PathBuf,
    pub font_size: f32,
    pub direction: Direction,
    pub text_color: [i32; 3],
    pub background_color: [i32; 3],
    /// Width over height of a glyph cell; below 1.0 widens the text.
    pub text_aspect_ratio: f32,
    pub align_mode: AlignMode,
    pub output_size: Option<OutputSize>,
    pub output_direction: OutputDirection,
    /// Font stems containing any of these are never used.
    pub block_font_list: Vec<String>,
    pub enable_all_random: bool,
    pub font_bank: PathBuf,
    pub random_font: bool,
    pub use_random_font_weight: bool,
    pub random_text: bool,
    pub min_random_text_length: usize,
    pub max_random_text_length: usize,
    pub random_direction: bool,
    pub random_text_color: bool,
    pub random_background_color: bool,
    pub random_align_mode: bool,
    pub cluster_rule: ClusterRule,
    pub cache_dir: Option<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
            font_size: 64.0,
            direction: Direction::Ltr,
            text_color: [255, 255, 255],
            background_color: [0, 0, 0],
            text_aspect_ratio: 1.0,
            align_mode: AlignMode::default(),
            output_size: None,
            output_direction: OutputDirection::default(),
            block_font_list: Vec::new(),
            enable_all_random: false,
            font_bank: PathBuf::from(DEFAULT_FONT_BANK),
            random_font: false,
            use_random_font_weight: false,
            random_text: false,
            min_random_text_length: 1,
            max_random_text_length: 7,
            random_direction: false,
            random_text_color: false,
            random_background_color: false,
            random_align_mode: false,
            cluster_rule: ClusterRule::default(),
            cache_dir: None,
        }
    }
}

impl CanvasConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if !self.text_aspect_ratio.is_finite() || self.text_aspect_ratio <= 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "text aspect ratio must be positive, got {}",
                self.text_aspect_ratio
            )));
        }
        if self.min_random_text_length == 0
            || self.min_random_text_length > self.max_random_text_length
        {
            return Err(CanvasError::InvalidConfig(format!(
                "random text length range {}..={} is empty or starts at zero",
                self.min_random_text_length, self.max_random_text_length
            )));
        }
        if let Some(size) = self.output_size {
            OutputSize::new(size.height, size.width)?;
        }
        Ok(())
    }

    fn weighted_fonts(&self) -> bool {
        self.use_random_font_weight && self.random_font && self.random_text
    }

    fn random_colors(&self) -> (bool, bool) {
        (
            self.random_text_color || self.enable_all_random,
            self.random_background_color || self.enable_all_random,
        )
    }

    fn cache(&self) -> Option<CharacterCache> {
        self.cache_dir.as_ref().map(CharacterCache::new)
    }
}

/// Metadata describing one generated sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleInfo {
    pub text: String,
    pub font_name: String,
    pub direction: Direction,
    pub text_color: [u8; 3],
    pub background_color: [u8; 3],
    pub align_mode: AlignMode,
    pub output_direction: OutputDirection,
    pub output_size: Option<OutputSize>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct RenderedSample {
    pub image: RgbImage,
    pub info: SampleInfo,
}

/// Text image generator: resolves a style per call, renders, fits and orients the result.
#[derive(Debug, Clone)]
pub struct WordCanvas<R = FontHandle> {
    config: CanvasConfig,
    fonts: Arc<FontBank<R>>,
}

impl WordCanvas<FontHandle> {
    /// Loads the configured font, or the whole font bank when `random_font` is set.
    pub fn new(config: CanvasConfig) -> Result<Self> {
        config.validate()?;
        let fonts = if config.random_font {
            let options = BankOptions {
                font_size: config.font_size,
                block_list: config.block_font_list.clone(),
                cache: config.cache(),
            };
            FontBank::load(&config.font_bank, &options)?
        } else {
            let stem = font_stem(&config.font_path);
            if let Some(blocked) = blocked_by(&stem, &config.block_font_list) {
                return Err(CanvasError::InvalidConfig(format!(
                    "font {} matches block list entry {:?} and cannot be used",
                    stem, blocked
                )));
            }
            let font = FontHandle::load(&config.font_path, config.font_size)?;
            let characters = match config.cache() {
                Some(cache) => cache.characters_of(&font)?,
                None => characters_of(&font)?,
            };
            FontBank::single(FontEntry { font, characters })
        };
        Self::with_fonts(config, Arc::new(fonts))
    }
}

impl<R: GlyphRasterizer> WordCanvas<R> {
    /// Uses an already-built font bank, e.g. one shared between several canvases.
    ///
    /// Without `random_font` only the first font of the bank is used.
    pub fn with_fonts(config: CanvasConfig, fonts: Arc<FontBank<R>>) -> Result<Self> {
        config.validate()?;
        if !config.random_font {
            let first = fonts.get(0).map(|entry| entry.font.name()).unwrap_or_default();
            if let Some(blocked) = blocked_by(first, &config.block_font_list) {
                return Err(CanvasError::InvalidConfig(format!(
                    "font {} matches block list entry {:?} and cannot be used",
                    first, blocked
                )));
            }
        }
        Ok(Self { config, fonts })
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn fonts(&self) -> &Arc<FontBank<R>> {
        &self.fonts
    }

    /// Every character any usable font can draw.
    pub fn characters(&self) -> &CharacterSet {
        self.fonts.all_characters()
    }

    /// Resolves font, text and style for one call without rendering.
    pub fn resolve<G: Rng + ?Sized>(&self, text: Option<&str>, rng: &mut G) -> Result<StyleConfig> {
        self.resolve_entry(text, rng).map(|(_, style)| style)
    }

    pub fn generate(&self, text: Option<&str>) -> Result<RenderedSample> {
        self.generate_with(text, &mut rand::thread_rng())
    }

    pub fn generate_with<G: Rng + ?Sized>(
        &self,
        text: Option<&str>,
        rng: &mut G,
    ) -> Result<RenderedSample> {
        let (entry, style) = self.resolve_entry(text, rng)?;
        let image = self.render(&entry.font, &style)?;
        let info = SampleInfo {
            text: style.text,
            font_name: style.font_name,
            direction: style.direction,
            text_color: style.text_color.0,
            background_color: style.background_color.0,
            align_mode: style.align_mode,
            output_direction: style.output_direction,
            output_size: style.output_size,
            width: image.width(),
            height: image.height(),
        };
        debug!(
            text = %info.text,
            font = %info.font_name,
            direction = %info.direction,
            align = %info.align_mode,
            width = info.width,
            height = info.height,
            "generated sample"
        );
        Ok(RenderedSample { image, info })
    }

    fn resolve_entry<G: Rng + ?Sized>(
        &self,
        text: Option<&str>,
        rng: &mut G,
    ) -> Result<(&FontEntry<R>, StyleConfig)> {
        let config = &self.config;
        if text.is_none() && !config.random_text {
            return Err(CanvasError::MissingText);
        }

        let entry = if config.random_font {
            self.fonts.pick(rng, config.weighted_fonts())
        } else {
            self.fonts.get(0).ok_or_else(|| CanvasError::EmptyFontBank {
                origin: config.font_path.display().to_string(),
            })?
        };

        let text = if config.random_text {
            let length = rng.gen_range(config.min_random_text_length..=config.max_random_text_length);
            let candidates = entry.characters.as_slice();
            (0..length)
                .filter_map(|_| candidates.choose(rng).copied())
                .collect()
        } else {
            text.unwrap_or_default().to_string()
        };

        let (random_text_color, random_background_color) = config.random_colors();
        let text_color = if random_text_color {
            random_color(rng)
        } else {
            clamp_color(config.text_color)
        };
        let background_color = if random_background_color {
            random_color(rng)
        } else {
            clamp_color(config.background_color)
        };
        let direction = if config.random_direction || config.enable_all_random {
            Direction::ALL[rng.gen_range(0..Direction::ALL.len())]
        } else {
            config.direction
        };
        let align_mode = if config.random_align_mode || config.enable_all_random {
            AlignMode::ALL[rng.gen_range(0..AlignMode::ALL.len())]
        } else {
            config.align_mode
        };

        let style = StyleConfig {
            font_name: entry.font.name().to_string(),
            text,
            direction,
            text_color,
            background_color,
            align_mode,
            text_aspect_ratio: config.text_aspect_ratio,
            output_size: config.output_size,
            output_direction: config.output_direction,
        };
        Ok((entry, style))
    }

    fn render(&self, font: &R, style: &StyleConfig) -> Result<RgbImage> {
        let image = match style.output_size {
            Some(size) if style.align_mode == AlignMode::Scatter => compose_scatter(
                font,
                &ScatterRequest {
                    text: &style.text,
                    direction: style.direction,
                    text_color: style.text_color,
                    background_color: style.background_color,
                    aspect_ratio: style.text_aspect_ratio,
                    target_extent: size.width,
                    rule: &self.config.cluster_rule,
                },
            )?,
            _ => {
                let request = RenderRequest::new(
                    &style.text,
                    style.direction,
                    style.text_color,
                    style.background_color,
                );
                render_text(font, &request)?.image
            }
        };

        let image = match style.output_size {
            Some(size) => Regularizer::new(size, style.text_aspect_ratio).apply(
                &image,
                style.direction,
                style.align_mode,
                style.background_color,
            ),
            None => image,
        };

        Ok(match (style.output_direction, style.direction) {
            (OutputDirection::Vertical, Direction::Ltr) => rotate90_clockwise(&image),
            (OutputDirection::Horizontal, Direction::Ttb) => rotate270_clockwise(&image),
            _ => image,
        })
    }
}

fn random_color<G: Rng + ?Sized>(rng: &mut G) -> Rgb<u8> {
    Rgb([
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::BlockRasterizer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn canvas(config: CanvasConfig) -> WordCanvas<BlockRasterizer> {
        let fonts = FontBank::from_entries(
            "test",
            [
                FontEntry {
                    font: BlockRasterizer::new("Block"),
                    characters: CharacterSet::new("ABCabc中文".chars()),
                },
                FontEntry {
                    font: BlockRasterizer::sized("Narrow", 4, 8, 12),
                    characters: CharacterSet::new("xyz".chars()),
                },
            ],
            &[],
        )
        .expect("bank");
        WordCanvas::with_fonts(config, Arc::new(fonts)).expect("canvas")
    }

    #[test]
    fn missing_text_without_random_text_is_an_error() {
        let canvas = canvas(CanvasConfig::default());
        let err = canvas.generate(None).unwrap_err();
        assert!(matches!(err, CanvasError::MissingText));
    }

    #[test]
    fn fixed_style_renders_with_the_first_font() {
        let canvas = canvas(CanvasConfig::default());
        let sample = canvas.generate(Some("AB")).expect("sample");
        assert_eq!(sample.info.font_name, "Block");
        assert_eq!(sample.info.text, "AB");
        assert_eq!(sample.info.text_color, [255, 255, 255]);
        assert_eq!(sample.info.background_color, [0, 0, 0]);
        assert_eq!(sample.image.dimensions(), (20, 16));
    }

    #[test]
    fn configured_colors_are_clamped() {
        let canvas = canvas(CanvasConfig {
            text_color: [-10, 128, 300],
            background_color: [255, 256, 999],
            ..CanvasConfig::default()
        });
        let style = canvas.resolve(Some("A"), &mut StdRng::seed_from_u64(1)).expect("style");
        assert_eq!(style.text_color, Rgb([0, 128, 255]));
        assert_eq!(style.background_color, Rgb([255, 255, 255]));
    }

    #[test]
    fn random_text_lengths_stay_in_range() {
        let canvas = canvas(CanvasConfig {
            random_text: true,
            random_font: true,
            min_random_text_length: 2,
            max_random_text_length: 5,
            ..CanvasConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let style = canvas.resolve(None, &mut rng).expect("style");
            let length = style.text.chars().count();
            assert!((2..=5).contains(&length), "length {length}");
            let font = canvas.fonts().find(&style.font_name).expect("font");
            assert!(font.characters.supports(&style.text));
        }
    }

    #[test]
    fn fixed_random_text_length_is_exact() {
        let canvas = canvas(CanvasConfig {
            random_text: true,
            random_font: true,
            min_random_text_length: 5,
            max_random_text_length: 5,
            ..CanvasConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let style = canvas.resolve(None, &mut rng).expect("style");
            assert_eq!(style.text.chars().count(), 5);
        }
    }

    #[test]
    fn random_text_may_draw_only_spaces() {
        let fonts = FontBank::single(FontEntry {
            font: BlockRasterizer::new("Block"),
            characters: CharacterSet::new("A".chars()),
        });
        let canvas = WordCanvas::with_fonts(
            CanvasConfig {
                random_text: true,
                min_random_text_length: 1,
                max_random_text_length: 1,
                ..CanvasConfig::default()
            },
            Arc::new(fonts),
        )
        .expect("canvas");
        let mut rng = StdRng::seed_from_u64(3);
        let mut blanks = 0;
        for _ in 0..100 {
            let sample = canvas.generate_with(None, &mut rng).expect("sample");
            if sample.info.text == " " {
                blanks += 1;
                assert_eq!(sample.image.dimensions(), (5, 16));
            }
        }
        assert!(blanks > 0);
    }

    #[test]
    fn resolution_is_deterministic_for_a_seed() {
        let canvas = canvas(CanvasConfig {
            random_text: true,
            random_font: true,
            enable_all_random: true,
            ..CanvasConfig::default()
        });
        let first = canvas.resolve(None, &mut StdRng::seed_from_u64(9)).expect("style");
        let second = canvas.resolve(None, &mut StdRng::seed_from_u64(9)).expect("style");
        assert_eq!(first, second);
    }

    #[test]
    fn vertical_output_rotates_horizontal_text() {
        let canvas = canvas(CanvasConfig {
            output_size: Some(OutputSize::new(32, 100).expect("size")),
            output_direction: OutputDirection::Vertical,
            ..CanvasConfig::default()
        });
        let sample = canvas.generate(Some("abc")).expect("sample");
        assert_eq!(sample.image.dimensions(), (32, 100));
        assert_eq!((sample.info.width, sample.info.height), (32, 100));
    }

    #[test]
    fn horizontal_output_rotates_vertical_text_back() {
        let canvas = canvas(CanvasConfig {
            direction: Direction::Ttb,
            output_size: Some(OutputSize::new(32, 100).expect("size")),
            output_direction: OutputDirection::Horizontal,
            ..CanvasConfig::default()
        });
        let sample = canvas.generate(Some("中文")).expect("sample");
        assert_eq!(sample.image.dimensions(), (100, 32));

        let remain = canvas_with_direction(Direction::Ttb, OutputDirection::Remain);
        let sample = remain.generate(Some("中文")).expect("sample");
        assert_eq!(sample.image.dimensions(), (32, 100));
    }

    fn canvas_with_direction(
        direction: Direction,
        output_direction: OutputDirection,
    ) -> WordCanvas<BlockRasterizer> {
        canvas(CanvasConfig {
            direction,
            output_size: Some(OutputSize::new(32, 100).expect("size")),
            output_direction,
            ..CanvasConfig::default()
        })
    }

    #[test]
    fn scatter_fills_the_output_width() {
        let canvas = canvas(CanvasConfig {
            align_mode: AlignMode::Scatter,
            output_size: Some(OutputSize::new(16, 61).expect("size")),
            ..CanvasConfig::default()
        });
        let sample = canvas.generate(Some("AB 中")).expect("sample");
        assert_eq!(sample.image.dimensions(), (61, 16));
        assert_eq!(*sample.image.get_pixel(0, 8), Rgb([255, 255, 255]));
        assert_eq!(*sample.image.get_pixel(30, 8), Rgb([0, 0, 0]));
        assert_eq!(*sample.image.get_pixel(60, 8), Rgb([255, 255, 255]));
    }

    #[test]
    fn glyph_failures_propagate() {
        let fonts = FontBank::single(FontEntry {
            font: BlockRasterizer::new("Gappy").missing("Q"),
            characters: CharacterSet::new("AQ".chars()),
        });
        let canvas = WordCanvas::with_fonts(CanvasConfig::default(), Arc::new(fonts)).expect("canvas");
        let err = canvas.generate(Some("AQ")).unwrap_err();
        assert!(matches!(err, CanvasError::GlyphRender { font, .. } if font == "Gappy"));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let fonts = Arc::new(FontBank::single(FontEntry {
            font: BlockRasterizer::new("NotoColorEmoji"),
            characters: CharacterSet::new("A".chars()),
        }));
        for config in [
            CanvasConfig {
                text_aspect_ratio: 0.0,
                ..CanvasConfig::default()
            },
            CanvasConfig {
                min_random_text_length: 4,
                max_random_text_length: 3,
                ..CanvasConfig::default()
            },
            CanvasConfig {
                min_random_text_length: 0,
                ..CanvasConfig::default()
            },
            CanvasConfig {
                block_font_list: vec!["Emoji".to_string()],
                ..CanvasConfig::default()
            },
        ] {
            let err = WordCanvas::with_fonts(config, fonts.clone()).unwrap_err();
            assert!(matches!(err, CanvasError::InvalidConfig(_)), "{err}");
        }
    }

    #[test]
    fn blocked_single_font_fails_before_loading() {
        let err = WordCanvas::new(CanvasConfig {
            font_path: PathBuf::from("/nonexistent/NotoColorEmoji.ttf"),
            block_font_list: vec!["Emoji".to_string()],
            ..CanvasConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, CanvasError::InvalidConfig(_)));
    }
}
