use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{Rgb, RgbImage};
use tiny_skia::{FillRule, IntSize, Paint, Path as SkPath, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use crate::error::{CanvasError, Result};
use crate::render::{BBox, GlyphRasterizer};
use crate::style::Direction;

/// A font file loaded at one pixel size.
#[derive(Clone)]
pub struct FontHandle {
    name: String,
    path: Option<PathBuf>,
    data: Arc<Vec<u8>>,
    face_index: u32,
    size: f32,
}

impl fmt::Debug for FontHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontHandle")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("face_index", &self.face_index)
            .field("size", &self.size)
            .finish()
    }
}

impl FontHandle {
    pub fn load(path: &Path, size: f32) -> Result<Self> {
        let data = std::fs::read(path).map_err(|err| CanvasError::FontLoad {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("font")
            .to_string();
        let mut handle = Self::from_data(name, data, size).map_err(|err| match err {
            CanvasError::FontLoad { reason, .. } => CanvasError::FontLoad {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })?;
        handle.path = Some(path.to_path_buf());
        Ok(handle)
    }

    /// Wraps raw font bytes, picking the first face of a collection that parses.
    pub fn from_data(name: impl Into<String>, data: Vec<u8>, size: f32) -> Result<Self> {
        let name = name.into();
        if !size.is_finite() || size <= 0.0 {
            return Err(CanvasError::InvalidConfig(format!(
                "font size must be positive, got {}",
                size
            )));
        }
        let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
        let mut last_error = None;
        for index in 0..count {
            match Face::parse(&data, index).map(|_| ()) {
                Ok(_) => {
                    return Ok(Self {
                        name,
                        path: None,
                        data: Arc::new(data),
                        face_index: index,
                        size,
                    });
                }
                Err(err) => last_error = Some(err.to_string()),
            }
        }
        Err(CanvasError::FontLoad {
            path: PathBuf::from(&name),
            reason: last_error.unwrap_or_else(|| "font collection is empty".to_string()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub(crate) fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, self.face_index).map_err(|err| CanvasError::FontLoad {
            path: self.path.clone().unwrap_or_else(|| PathBuf::from(&self.name)),
            reason: err.to_string(),
        })
    }

    /// Whether the font maps `ch` to a glyph at all, inked or not.
    pub fn is_character_supported(&self, ch: char) -> bool {
        self.face()
            .map(|face| face.glyph_index(ch).is_some())
            .unwrap_or(false)
    }

    fn layout(&self, face: &Face<'_>, text: &str, direction: Direction) -> Result<Layout> {
        let scale = self.size / face.units_per_em().max(1) as f32;
        let ascent = face.ascender() as f32 * scale;
        let line = (face.ascender() as i32 - face.descender() as i32).max(1) as f32 * scale;
        let mut layout = Layout::default();
        let mut pen = 0.0f32;

        for ch in text.chars() {
            let glyph = face.glyph_index(ch).ok_or_else(|| CanvasError::GlyphRender {
                text: text.to_string(),
                font: self.name.clone(),
                reason: format!("no glyph for {:?} (U+{:04X})", ch, ch as u32),
            })?;
            let hor_advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f32 * scale;
            let (origin_x, origin_y, advance) = match direction {
                Direction::Ltr => (pen, ascent, hor_advance),
                Direction::Ttb => {
                    let ver_advance = face
                        .glyph_ver_advance(glyph)
                        .map(|advance| advance as f32 * scale)
                        .unwrap_or(line);
                    (-hor_advance / 2.0, pen + ascent, ver_advance)
                }
            };
            if let Some(rect) = face.glyph_bounding_box(glyph) {
                layout.ink(
                    origin_x + rect.x_min as f32 * scale,
                    origin_y - rect.y_max as f32 * scale,
                    origin_x + rect.x_max as f32 * scale,
                    origin_y - rect.y_min as f32 * scale,
                );
            }
            layout.glyphs.push(PlacedGlyph {
                glyph,
                origin_x,
                origin_y,
            });
            pen += advance;
        }
        layout.advance = pen;
        layout.line = line;
        layout.scale = scale;
        Ok(layout)
    }
}

impl GlyphRasterizer for FontHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn bbox(&self, text: &str, direction: Direction) -> Result<BBox> {
        let face = self.face()?;
        let layout = self.layout(&face, text, direction)?;
        Ok(layout.bbox(direction))
    }

    fn draw(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        origin: (i32, i32),
        direction: Direction,
        fill: Rgb<u8>,
    ) -> Result<()> {
        let face = self.face()?;
        let layout = self.layout(&face, text, direction)?;

        let mut builder = GlyphPathBuilder::new(layout.scale);
        for placed in &layout.glyphs {
            builder.origin_x = origin.0 as f32 + placed.origin_x;
            builder.origin_y = origin.1 as f32 + placed.origin_y;
            face.outline_glyph(placed.glyph, &mut builder);
        }
        let Some(path) = builder.finish() else {
            return Ok(());
        };

        let mut pixmap = to_pixmap(canvas).ok_or_else(|| CanvasError::GlyphRender {
            text: text.to_string(),
            font: self.name.clone(),
            reason: format!("cannot allocate a {}x{} canvas", canvas.width(), canvas.height()),
        })?;
        let mut paint = Paint::default();
        paint.set_color_rgba8(fill[0], fill[1], fill[2], 255);
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);

        for (pixel, rgba) in canvas.pixels_mut().zip(pixmap.data().chunks_exact(4)) {
            *pixel = Rgb([rgba[0], rgba[1], rgba[2]]);
        }
        Ok(())
    }
}

fn to_pixmap(canvas: &RgbImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(canvas.width(), canvas.height())?;
    let mut data = Vec::with_capacity(canvas.len() / 3 * 4);
    for pixel in canvas.pixels() {
        data.extend_from_slice(&[pixel[0], pixel[1], pixel[2], 255]);
    }
    Pixmap::from_vec(data, size)
}

struct PlacedGlyph {
    glyph: GlyphId,
    origin_x: f32,
    origin_y: f32,
}

#[derive(Default)]
struct Layout {
    glyphs: Vec<PlacedGlyph>,
    ink: Option<(f32, f32, f32, f32)>,
    advance: f32,
    /// Ascent minus descent, in pixels.
    line: f32,
    scale: f32,
}

impl Layout {
    fn ink(&mut self, left: f32, top: f32, right: f32, bottom: f32) {
        self.ink = Some(match self.ink {
            Some((l, t, r, b)) => (l.min(left), t.min(top), r.max(right), b.max(bottom)),
            None => (left, top, right, bottom),
        });
    }

    /// Ink extents, widened to the pen advance along the writing axis.
    ///
    /// Text without ink (blank runs) takes the line box across the writing axis.
    fn bbox(&self, direction: Direction) -> BBox {
        let (mut left, mut top, mut right, mut bottom) = self.ink.unwrap_or_default();
        match direction {
            Direction::Ltr => {
                if self.ink.is_none() {
                    left = 0.0;
                    bottom = self.line;
                }
                left = left.min(0.0);
                right = right.max(self.advance);
            }
            Direction::Ttb => {
                if self.ink.is_none() {
                    top = 0.0;
                    left = -self.line / 2.0;
                    right = self.line / 2.0;
                }
                top = top.min(0.0);
                bottom = bottom.max(self.advance);
            }
        }
        BBox {
            left: left.floor() as i32,
            top: top.floor() as i32,
            right: right.ceil() as i32,
            bottom: bottom.ceil() as i32,
        }
    }
}

/// Feeds glyph outlines into one tiny-skia path, flipping font units to pixel space.
struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x: 0.0,
            origin_y: 0.0,
            scale,
        }
    }

    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }

    fn finish(self) -> Option<SkPath> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
