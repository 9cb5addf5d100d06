use image::{Rgb, RgbImage};

use crate::error::Result;
use crate::style::Direction;

/// Pixel bounding box of a laid-out string, relative to the layout origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Lays out and paints strings for one font at one size.
///
/// Implementations fail with [`crate::CanvasError::GlyphRender`] when a string contains
/// glyphs they cannot produce.
pub trait GlyphRasterizer {
    /// Identity of the font, the file stem for fonts loaded from disk.
    fn name(&self) -> &str;

    fn bbox(&self, text: &str, direction: Direction) -> Result<BBox>;

    /// Shift that moves the top-left of the inked area to the canvas origin.
    fn offset(&self, text: &str, direction: Direction) -> Result<(i32, i32)> {
        let bbox = self.bbox(text, direction)?;
        Ok((bbox.left, bbox.top))
    }

    /// Paints `text` with its layout origin placed at `origin` on `canvas`.
    fn draw(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        origin: (i32, i32),
        direction: Direction,
        fill: Rgb<u8>,
    ) -> Result<()>;
}

impl<T: GlyphRasterizer + ?Sized> GlyphRasterizer for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn bbox(&self, text: &str, direction: Direction) -> Result<BBox> {
        (**self).bbox(text, direction)
    }

    fn offset(&self, text: &str, direction: Direction) -> Result<(i32, i32)> {
        (**self).offset(text, direction)
    }

    fn draw(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        origin: (i32, i32),
        direction: Direction,
        fill: Rgb<u8>,
    ) -> Result<()> {
        (**self).draw(canvas, text, origin, direction, fill)
    }
}
