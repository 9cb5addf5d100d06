use std::fmt;
use std::str::FromStr;

use image::Rgb;
use serde::Serialize;

use crate::error::{CanvasError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Ttb,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Ltr, Direction::Ttb];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Ltr => "ltr",
            Direction::Ttb => "ttb",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ltr" => Ok(Direction::Ltr),
            "ttb" => Ok(Direction::Ttb),
            _ => Err(CanvasError::UnknownOption {
                kind: "direction",
                value: value.to_string(),
                expected: "ltr, ttb",
            }),
        }
    }
}

/// Where rendered text sits inside a fixed output canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignMode {
    #[default]
    Left,
    Right,
    Center,
    Scatter,
}

impl AlignMode {
    pub const ALL: [AlignMode; 4] = [
        AlignMode::Left,
        AlignMode::Right,
        AlignMode::Center,
        AlignMode::Scatter,
    ];
}

impl fmt::Display for AlignMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlignMode::Left => "left",
            AlignMode::Right => "right",
            AlignMode::Center => "center",
            AlignMode::Scatter => "scatter",
        };
        f.write_str(name)
    }
}

impl FromStr for AlignMode {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "default" | "0" => Ok(AlignMode::Left),
            "right" | "1" => Ok(AlignMode::Right),
            "center" | "centre" | "2" => Ok(AlignMode::Center),
            "scatter" | "3" => Ok(AlignMode::Scatter),
            _ => Err(CanvasError::UnknownOption {
                kind: "align mode",
                value: value.to_string(),
                expected: "left, right, center, scatter",
            }),
        }
    }
}

/// Orientation of the final image, independent of the writing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDirection {
    #[default]
    Remain,
    Horizontal,
    Vertical,
}

impl fmt::Display for OutputDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputDirection::Remain => "remain",
            OutputDirection::Horizontal => "horizontal",
            OutputDirection::Vertical => "vertical",
        };
        f.write_str(name)
    }
}

impl FromStr for OutputDirection {
    type Err = CanvasError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "remain" | "default" | "0" => Ok(OutputDirection::Remain),
            "horizontal" | "1" => Ok(OutputDirection::Horizontal),
            "vertical" | "2" => Ok(OutputDirection::Vertical),
            _ => Err(CanvasError::UnknownOption {
                kind: "output direction",
                value: value.to_string(),
                expected: "remain, horizontal, vertical",
            }),
        }
    }
}

/// Clamps each channel into `0..=255`.
pub fn clamp_color(rgb: [i32; 3]) -> Rgb<u8> {
    Rgb(rgb.map(|channel| channel.clamp(0, 255) as u8))
}

/// Fixed output canvas as `(height, width)`, both at least one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputSize {
    pub height: u32,
    pub width: u32,
}

impl OutputSize {
    pub fn new(height: u32, width: u32) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(CanvasError::InvalidConfig(format!(
                "output size must be at least 1x1, got {}x{}",
                height, width
            )));
        }
        Ok(Self { height, width })
    }
}

impl FromStr for OutputSize {
    type Err = CanvasError;

    /// Parses `HxW`, e.g. `64x512`.
    fn from_str(value: &str) -> Result<Self> {
        let invalid = || {
            CanvasError::InvalidConfig(format!(
                "output size {:?} is not in HEIGHTxWIDTH form",
                value
            ))
        };
        let (height, width) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(invalid)?;
        let height = height.trim().parse::<u32>().map_err(|_| invalid())?;
        let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
        OutputSize::new(height, width)
    }
}

/// Parameters of one generation call after every random draw is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    pub font_name: String,
    pub text: String,
    pub direction: Direction,
    pub text_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
    pub align_mode: AlignMode,
    pub text_aspect_ratio: f32,
    pub output_size: Option<OutputSize>,
    pub output_direction: OutputDirection,
}
