use image::{Rgb, RgbImage};

use super::imageops::solid;
use super::raster::{BBox, GlyphRasterizer};
use crate::error::{CanvasError, Result};
use crate::style::Direction;

pub struct RenderRequest<'a> {
    pub text: &'a str,
    pub direction: Direction,
    pub text_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
    /// Forces the canvas width instead of the bbox width.
    pub width: Option<u32>,
    /// Forces the canvas height instead of the bbox height.
    pub height: Option<u32>,
    /// Replaces the rasterizer's offset, keeping separately rendered pieces on one baseline.
    pub offset: Option<(i32, i32)>,
}

impl<'a> RenderRequest<'a> {
    pub fn new(
        text: &'a str,
        direction: Direction,
        text_color: Rgb<u8>,
        background_color: Rgb<u8>,
    ) -> Self {
        Self {
            text,
            direction,
            text_color,
            background_color,
            width: None,
            height: None,
            offset: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderResult {
    pub image: RgbImage,
    pub text: String,
    pub bbox: BBox,
    pub offset: (i32, i32),
    pub direction: Direction,
    pub text_color: Rgb<u8>,
    pub background_color: Rgb<u8>,
}

/// Renders one string as a single unit on a canvas sized to its bbox.
pub fn render_text<R: GlyphRasterizer + ?Sized>(
    font: &R,
    request: &RenderRequest<'_>,
) -> Result<RenderResult> {
    let text = request.text;
    let direction = request.direction;
    let bbox = font
        .bbox(text, direction)
        .map_err(|err| glyph_error(err, text, font.name()))?;
    let offset = match request.offset {
        Some(offset) => offset,
        None => font
            .offset(text, direction)
            .map_err(|err| glyph_error(err, text, font.name()))?,
    };

    let empty = || CanvasError::EmptyRender {
        text: text.to_string(),
        font: font.name().to_string(),
        width: bbox.width(),
        height: bbox.height(),
    };
    let width = match request.width {
        Some(width) => width.max(1),
        None if bbox.width() > 0 => bbox.width() as u32,
        None => return Err(empty()),
    };
    let height = match request.height {
        Some(height) => height.max(1),
        None if bbox.height() > 0 => bbox.height() as u32,
        None => return Err(empty()),
    };

    let mut image = solid(width, height, request.background_color);
    font.draw(
        &mut image,
        text,
        (-offset.0, -offset.1),
        direction,
        request.text_color,
    )
    .map_err(|err| glyph_error(err, text, font.name()))?;

    Ok(RenderResult {
        image,
        text: text.to_string(),
        bbox,
        offset,
        direction,
        text_color: request.text_color,
        background_color: request.background_color,
    })
}

pub(crate) fn glyph_error(err: CanvasError, text: &str, font: &str) -> CanvasError {
    match err {
        CanvasError::GlyphRender { .. } => err,
        other => CanvasError::GlyphRender {
            text: text.to_string(),
            font: font.to_string(),
            reason: other.to_string(),
        },
    }
}
