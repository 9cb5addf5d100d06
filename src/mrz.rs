use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbImage;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::canvas::{CanvasConfig, WordCanvas};
use crate::error::{CanvasError, MrzViolation, Result};
use crate::font::{FontBank, FontHandle};
use crate::render::GlyphRasterizer;
use crate::render::imageops::{Padding, pad, solid, vconcat};
use crate::style::clamp_color;

pub const DEFAULT_MRZ_FONT_PATH: &str = "fonts/OcrB-Regular.ttf";

/// Characters a machine-readable zone may contain.
const MRZ_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789<";

/// ICAO 9303 machine-readable zone layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MrzType {
    TD1,
    TD2,
    TD3,
}

impl MrzType {
    pub const ALL: [MrzType; 3] = [MrzType::TD1, MrzType::TD2, MrzType::TD3];

    pub fn lines(self) -> usize {
        match self {
            MrzType::TD1 => 3,
            MrzType::TD2 | MrzType::TD3 => 2,
        }
    }

    /// Characters per line.
    pub fn length(self) -> usize {
        match self {
            MrzType::TD1 => 30,
            MrzType::TD2 => 36,
            MrzType::TD3 => 44,
        }
    }

    fn gap_range(self) -> std::ops::RangeInclusive<u32> {
        match self {
            MrzType::TD1 => 8..=24,
            MrzType::TD2 | MrzType::TD3 => 8..=64,
        }
    }
}

impl fmt::Display for MrzType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MrzType::TD1 => "TD1",
            MrzType::TD2 => "TD2",
            MrzType::TD3 => "TD3",
        };
        f.write_str(name)
    }
}

impl FromStr for MrzType {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TD1" => Ok(MrzType::TD1),
            "TD2" => Ok(MrzType::TD2),
            "TD3" => Ok(MrzType::TD3),
            _ => Err(CanvasError::UnknownOption {
                kind: "mrz type",
                value: value.to_string(),
                expected: "TD1, TD2, TD3",
            }),
        }
    }
}

/// Caller-supplied MRZ content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MrzText {
    Lines(Vec<String>),
    /// One string holding every line, separated by newlines or the delimiter.
    Single(String),
}

impl MrzText {
    /// Accepts a JSON string or a JSON list of strings.
    pub fn from_value(value: &Value) -> Result<Self, MrzViolation> {
        match value {
            Value::String(text) => Ok(MrzText::Single(text.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(line) => Ok(line.clone()),
                    other => Err(MrzViolation::NotLines {
                        found: format!("a list containing {}", json_kind(other)),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(MrzText::Lines),
            other => Err(MrzViolation::NotLines {
                found: json_kind(other).to_string(),
            }),
        }
    }

    pub fn lines(&self, delimiter: &str) -> Vec<String> {
        match self {
            MrzText::Lines(lines) => lines.clone(),
            MrzText::Single(text) => text
                .lines()
                .flat_map(|line| {
                    if delimiter.is_empty() {
                        vec![line.to_string()]
                    } else {
                        line.split(delimiter).map(str::to_string).collect()
                    }
                })
                .collect(),
        }
    }
}

impl From<Vec<String>> for MrzText {
    fn from(lines: Vec<String>) -> Self {
        MrzText::Lines(lines)
    }
}

impl From<&str> for MrzText {
    fn from(text: &str) -> Self {
        MrzText::Single(text.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// Checks line count and per-line character count against the layout.
pub fn validate_lines(mrz_type: MrzType, lines: &[String]) -> Result<(), MrzViolation> {
    if lines.len() != mrz_type.lines() {
        return Err(MrzViolation::LineCount {
            mrz_type,
            expected: mrz_type.lines(),
            actual: lines.len(),
        });
    }
    for (line, text) in lines.iter().enumerate() {
        let actual = text.chars().count();
        if actual != mrz_type.length() {
            return Err(MrzViolation::LineLength {
                mrz_type,
                line,
                expected: mrz_type.length(),
                actual,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MrzConfig {
    pub font_path: PathBuf,
    pub font_size: f32,
    pub text_color: [i32; 3],
    pub background_color: [i32; 3],
    /// Fixed gap between lines; drawn per record when unset.
    pub interval: Option<u32>,
    pub delimiter: String,
    pub cache_dir: Option<PathBuf>,
}

impl Default for MrzConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from(DEFAULT_MRZ_FONT_PATH),
            font_size: 64.0,
            text_color: [0, 0, 0],
            background_color: [255, 255, 255],
            interval: None,
            delimiter: "&".to_string(),
            cache_dir: None,
        }
    }
}

impl MrzConfig {
    fn canvas_config(&self) -> CanvasConfig {
        CanvasConfig {
            font_path: self.font_path.clone(),
            font_size: self.font_size,
            text_color: self.text_color,
            background_color: self.background_color,
            cache_dir: self.cache_dir.clone(),
            ..CanvasConfig::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct MrzRecord {
    pub mrz_type: MrzType,
    /// Lines joined with the delimiter.
    pub text: String,
    /// Center of every character cell, line by line, as `(x, y)` from the top-left.
    pub points: Vec<(u32, u32)>,
    pub image: RgbImage,
}

pub struct MrzGenerator<R = FontHandle> {
    canvas: WordCanvas<R>,
    interval: Option<u32>,
    delimiter: String,
}

impl MrzGenerator<FontHandle> {
    pub fn new(config: MrzConfig) -> Result<Self> {
        let canvas = WordCanvas::new(config.canvas_config())?;
        Ok(Self {
            canvas,
            interval: config.interval,
            delimiter: config.delimiter,
        })
    }
}

impl<R: GlyphRasterizer> MrzGenerator<R> {
    pub fn with_fonts(config: MrzConfig, fonts: Arc<FontBank<R>>) -> Result<Self> {
        let canvas = WordCanvas::with_fonts(config.canvas_config(), fonts)?;
        Ok(Self {
            canvas,
            interval: config.interval,
            delimiter: config.delimiter,
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn compose(&self, mrz_type: Option<MrzType>, text: Option<&MrzText>) -> Result<MrzRecord> {
        self.compose_with(mrz_type, text, &mut rand::thread_rng())
    }

    pub fn compose_with<G: Rng + ?Sized>(
        &self,
        mrz_type: Option<MrzType>,
        text: Option<&MrzText>,
        rng: &mut G,
    ) -> Result<MrzRecord> {
        let mrz_type = match mrz_type {
            Some(mrz_type) => mrz_type,
            None => MrzType::ALL[rng.gen_range(0..MrzType::ALL.len())],
        };
        let lines = match text {
            Some(text) => {
                let lines = text.lines(&self.delimiter);
                validate_lines(mrz_type, &lines)?;
                lines
            }
            None => (0..mrz_type.lines())
                .map(|_| random_line(mrz_type.length(), rng))
                .collect(),
        };

        let mut images = Vec::with_capacity(lines.len());
        for line in &lines {
            images.push(self.canvas.generate_with(Some(line.as_str()), rng)?.image);
        }
        let gap = match self.interval {
            Some(gap) => gap,
            None => rng.gen_range(mrz_type.gap_range()),
        };
        let background = clamp_color(self.canvas.config().background_color);
        let width = images.iter().map(RgbImage::width).max().unwrap_or(1);

        let mut parts = Vec::with_capacity(images.len() * 2);
        let mut bands = Vec::with_capacity(images.len());
        let mut top = 0u32;
        for (index, image) in images.iter().enumerate() {
            if index > 0 && gap > 0 {
                parts.push(solid(width, gap, background));
                top += gap;
            }
            let padded = pad(
                image,
                Padding {
                    right: width - image.width(),
                    ..Padding::default()
                },
                background,
            );
            bands.push((top, padded.height()));
            top += padded.height();
            parts.push(padded);
        }
        let image = vconcat(&parts);

        let length = mrz_type.length();
        let slot = image.width() as f64 / length as f64;
        let points = bands
            .iter()
            .flat_map(|&(top, height)| {
                (0..length).map(move |i| {
                    let x = (slot / 2.0 + slot * i as f64) as u32;
                    (x, top + height / 2)
                })
            })
            .collect::<Vec<_>>();

        let record = MrzRecord {
            mrz_type,
            text: lines.join(&self.delimiter),
            points,
            image,
        };
        debug!(
            mrz_type = %record.mrz_type,
            gap,
            width = record.image.width(),
            height = record.image.height(),
            "composed mrz record"
        );
        Ok(record)
    }
}

fn random_line<G: Rng + ?Sized>(length: usize, rng: &mut G) -> String {
    (0..length)
        .map(|_| MRZ_ALPHABET[rng.gen_range(0..MRZ_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{CharacterSet, FontEntry};
    use crate::test_util::BlockRasterizer;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn generator(config: MrzConfig) -> MrzGenerator<BlockRasterizer> {
        let fonts = FontBank::single(FontEntry {
            font: BlockRasterizer::new("OcrB-Regular"),
            characters: CharacterSet::new(MRZ_ALPHABET.iter().map(|&b| b as char)),
        });
        MrzGenerator::with_fonts(config, Arc::new(fonts)).expect("generator")
    }

    fn line(ch: char, n: usize) -> String {
        std::iter::repeat_n(ch, n).collect()
    }

    #[test]
    fn mrz_type_parses_case_insensitively() {
        assert_eq!("td2".parse::<MrzType>().expect("td2"), MrzType::TD2);
        assert!(matches!(
            "TD4".parse::<MrzType>(),
            Err(CanvasError::UnknownOption { .. })
        ));
    }

    #[test]
    fn short_td1_line_names_the_expected_length() {
        let lines = vec![line('A', 30), line('B', 29), line('C', 30)];
        let err = validate_lines(MrzType::TD1, &lines).unwrap_err();
        assert_eq!(
            err,
            MrzViolation::LineLength {
                mrz_type: MrzType::TD1,
                line: 1,
                expected: 30,
                actual: 29,
            }
        );
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn td2_with_one_line_is_a_count_violation() {
        let generator = generator(MrzConfig::default());
        let text = MrzText::Lines(vec![line('A', 36)]);
        let err = generator
            .compose_with(Some(MrzType::TD2), Some(&text), &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(
            err,
            CanvasError::MalformedMrz(MrzViolation::LineCount {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn non_string_values_are_rejected() {
        let err = MrzText::from_value(&json!(123)).unwrap_err();
        assert_eq!(
            err,
            MrzViolation::NotLines {
                found: "a number".to_string()
            }
        );
        assert!(MrzText::from_value(&json!(["A<", 4])).is_err());
        assert_eq!(
            MrzText::from_value(&json!(["A", "B"])).expect("lines"),
            MrzText::Lines(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn single_text_splits_on_newlines_and_delimiter() {
        let text = MrzText::from("AB&CD\nEF");
        assert_eq!(text.lines("&"), vec!["AB", "CD", "EF"]);
    }

    #[test]
    fn random_td1_has_ninety_anchors_inside_the_image() {
        let generator = generator(MrzConfig::default());
        let record = generator
            .compose_with(Some(MrzType::TD1), None, &mut StdRng::seed_from_u64(3))
            .expect("record");
        assert_eq!(record.points.len(), 90);
        let (width, height) = record.image.dimensions();
        assert!(record.points.iter().all(|&(x, y)| x < width && y < height));
        assert_eq!(record.text.split('&').count(), 3);
        assert!(record.text.split('&').all(|line| line.len() == 30));
    }

    #[test]
    fn anchors_sit_on_cell_centers() {
        let generator = generator(MrzConfig {
            interval: Some(10),
            ..MrzConfig::default()
        });
        let text = MrzText::Lines(vec![line('P', 44), line('<', 44)]);
        let record = generator
            .compose_with(Some(MrzType::TD3), Some(&text), &mut StdRng::seed_from_u64(5))
            .expect("record");
        assert_eq!(record.image.dimensions(), (440, 42));
        assert_eq!(record.points[0], (5, 8));
        assert_eq!(record.points[43], (435, 8));
        assert_eq!(record.points[44], (5, 34));
        assert_eq!(record.text, format!("{}&{}", line('P', 44), line('<', 44)));
    }

    #[test]
    fn custom_delimiter_joins_and_splits() {
        let generator = generator(MrzConfig {
            delimiter: "|".to_string(),
            interval: Some(0),
            ..MrzConfig::default()
        });
        let joined = format!("{}|{}", line('I', 36), line('0', 36));
        let record = generator
            .compose_with(
                Some(MrzType::TD2),
                Some(&MrzText::from(joined.as_str())),
                &mut StdRng::seed_from_u64(8),
            )
            .expect("record");
        assert_eq!(record.text, joined);
        assert_eq!(record.image.height(), 32);
    }
}
