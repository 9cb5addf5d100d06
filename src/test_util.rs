#[cfg(test)]
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME is only touched while HOME_MUTEX is held.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    if let Some(old) = old_home {
        unsafe { std::env::set_var("HOME", old) };
    } else {
        unsafe { std::env::remove_var("HOME") };
    }
    result
}

#[cfg(test)]
pub(crate) use fake::BlockRasterizer;

#[cfg(test)]
mod fake {
    use image::{Rgb, RgbImage};

    use crate::error::{CanvasError, Result};
    use crate::render::{BBox, GlyphRasterizer};
    use crate::style::Direction;

    /// Draws every non-whitespace char as a solid block: `ascii` or `wide` pixels
    /// along the writing axis, `thickness` pixels across it. Blank text still spans
    /// `thickness` across, like a real font's line box.
    #[derive(Debug, Clone)]
    pub(crate) struct BlockRasterizer {
        pub(crate) name: String,
        pub(crate) ascii: u32,
        pub(crate) wide: u32,
        pub(crate) space: u32,
        pub(crate) thickness: u32,
        pub(crate) missing: Vec<char>,
    }

    impl BlockRasterizer {
        pub(crate) fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                ascii: 10,
                wide: 20,
                space: 5,
                thickness: 16,
                missing: Vec::new(),
            }
        }

        pub(crate) fn sized(name: &str, ascii: u32, wide: u32, thickness: u32) -> Self {
            Self {
                ascii,
                wide,
                space: ascii,
                thickness,
                ..Self::new(name)
            }
        }

        pub(crate) fn missing(mut self, chars: &str) -> Self {
            self.missing = chars.chars().collect();
            self
        }

        fn advance(&self, ch: char) -> u32 {
            if ch.is_whitespace() {
                self.space
            } else if ch.is_ascii() {
                self.ascii
            } else {
                self.wide
            }
        }

        fn check(&self, text: &str) -> Result<()> {
            if let Some(ch) = text.chars().find(|ch| self.missing.contains(ch)) {
                return Err(CanvasError::GlyphRender {
                    text: text.to_string(),
                    font: self.name.clone(),
                    reason: format!("no glyph for {:?}", ch),
                });
            }
            Ok(())
        }
    }

    impl GlyphRasterizer for BlockRasterizer {
        fn name(&self) -> &str {
            &self.name
        }

        fn bbox(&self, text: &str, direction: Direction) -> Result<BBox> {
            self.check(text)?;
            let along: u32 = text.chars().map(|ch| self.advance(ch)).sum();
            let across = if text.is_empty() { 0 } else { self.thickness };
            let (right, bottom) = match direction {
                Direction::Ltr => (along, across),
                Direction::Ttb => (across, along),
            };
            Ok(BBox {
                left: 0,
                top: 0,
                right: right as i32,
                bottom: bottom as i32,
            })
        }

        fn draw(
            &self,
            canvas: &mut RgbImage,
            text: &str,
            origin: (i32, i32),
            direction: Direction,
            fill: Rgb<u8>,
        ) -> Result<()> {
            self.check(text)?;
            let mut pen = 0i32;
            for ch in text.chars() {
                let advance = self.advance(ch) as i32;
                if !ch.is_whitespace() {
                    let (x0, y0, w, h) = match direction {
                        Direction::Ltr => (origin.0 + pen, origin.1, advance, self.thickness as i32),
                        Direction::Ttb => (origin.0, origin.1 + pen, self.thickness as i32, advance),
                    };
                    for y in y0.max(0)..(y0 + h).min(canvas.height() as i32) {
                        for x in x0.max(0)..(x0 + w).min(canvas.width() as i32) {
                            canvas.put_pixel(x as u32, y as u32, fill);
                        }
                    }
                }
                pen += advance;
            }
            Ok(())
        }
    }

    /// One char per pixel: `#` where the pixel differs from `background`, `.` elsewhere.
    pub(crate) fn ascii_art(image: &RgbImage, background: Rgb<u8>) -> String {
        image
            .rows()
            .map(|row| {
                row.map(|pixel| if *pixel == background { '.' } else { '#' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
pub(crate) use fake::ascii_art;
