use image::{Rgb, RgbImage};

use super::imageops::{Padding, pad, resize_exact, resize_to_height, resize_to_width};
use crate::style::{AlignMode, Direction, OutputSize};

/// Fits rendered text into a fixed canvas.
///
/// Horizontal text lands on an `height x width` canvas. Vertical text swaps the roles:
/// the canvas is `width` rows by `height` columns, so a 270 degree turn gives back the
/// horizontal shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regularizer {
    pub output_size: OutputSize,
    pub text_aspect_ratio: f32,
}

impl Regularizer {
    pub fn new(output_size: OutputSize, text_aspect_ratio: f32) -> Self {
        Self {
            output_size,
            text_aspect_ratio,
        }
    }

    pub fn apply(
        &self,
        image: &RgbImage,
        direction: Direction,
        align_mode: AlignMode,
        background: Rgb<u8>,
    ) -> RgbImage {
        let OutputSize { height, width } = self.output_size;
        match direction {
            Direction::Ltr => {
                let scaled = self.squeeze(image);
                let fitted = resize_to_height(&scaled, height);
                let fitted = if fitted.width() >= width {
                    resize_exact(&fitted, width, height)
                } else {
                    let (lead, trail) = split_padding(width - fitted.width(), align_mode);
                    pad(
                        &fitted,
                        Padding {
                            left: lead,
                            right: trail,
                            ..Padding::default()
                        },
                        background,
                    )
                };
                resize_exact(&fitted, width, height)
            }
            Direction::Ttb => {
                let (rows, cols) = (width, height);
                let scaled = if align_mode == AlignMode::Scatter {
                    image.clone()
                } else {
                    self.squeeze(image)
                };
                let fitted = resize_to_width(&scaled, cols);
                let fitted = if fitted.height() >= rows {
                    resize_exact(&fitted, cols, rows)
                } else {
                    let (lead, trail) = split_padding(rows - fitted.height(), align_mode);
                    pad(
                        &fitted,
                        Padding {
                            top: lead,
                            bottom: trail,
                            ..Padding::default()
                        },
                        background,
                    )
                };
                resize_exact(&fitted, cols, rows)
            }
        }
    }

    fn squeeze(&self, image: &RgbImage) -> RgbImage {
        if self.text_aspect_ratio == 1.0 {
            return image.clone();
        }
        let (w, h) = image.dimensions();
        resize_exact(image, (w as f32 / self.text_aspect_ratio) as u32, h)
    }
}

/// Splits `total` padding into (leading, trailing) for an alignment mode.
fn split_padding(total: u32, align_mode: AlignMode) -> (u32, u32) {
    match align_mode {
        AlignMode::Left => (0, total),
        AlignMode::Right => (total, 0),
        AlignMode::Center | AlignMode::Scatter => {
            let lead = total / 2;
            (lead, total - lead)
        }
    }
}
