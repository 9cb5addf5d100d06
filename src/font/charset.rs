use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use ttf_parser::OutlineBuilder;

use super::FontHandle;
use crate::error::{CanvasError, Result};
use crate::render::GlyphRasterizer;

/// Sorted, deduplicated set of characters a font draws with visible ink.
///
/// Space is always a member so random text can contain word breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<char>", into = "Vec<char>")]
pub struct CharacterSet {
    chars: Vec<char>,
}

impl CharacterSet {
    pub fn new(chars: impl IntoIterator<Item = char>) -> Self {
        let mut chars: Vec<char> = chars.into_iter().collect();
        chars.push(' ');
        chars.sort_unstable();
        chars.dedup();
        Self { chars }
    }

    pub fn contains(&self, ch: char) -> bool {
        self.chars.binary_search(&ch).is_ok()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_slice(&self) -> &[char] {
        &self.chars
    }

    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    pub fn supports(&self, text: &str) -> bool {
        text.chars().all(|ch| self.contains(ch))
    }
}

impl From<Vec<char>> for CharacterSet {
    fn from(chars: Vec<char>) -> Self {
        Self::new(chars)
    }
}

impl From<CharacterSet> for Vec<char> {
    fn from(set: CharacterSet) -> Self {
        set.chars
    }
}

impl FromIterator<char> for CharacterSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Enumerates every Unicode-mapped character of `font` whose outline records drawing commands.
pub fn characters_of(font: &FontHandle) -> Result<CharacterSet> {
    let face = font.face()?;
    let tables = face.tables();
    if tables.glyf.is_none() && tables.cff.is_none() {
        return Err(CanvasError::UnsupportedFontFormat {
            font: font.name().to_string(),
        });
    }
    let Some(cmap) = tables.cmap else {
        return Ok(CharacterSet::new([]));
    };

    let mut codepoints = Vec::new();
    for subtable in cmap.subtables {
        if !subtable.is_unicode() {
            continue;
        }
        subtable.codepoints(|cp| {
            if subtable.glyph_index(cp).is_some_and(|glyph| glyph.0 != 0) {
                codepoints.push(cp);
            }
        });
    }
    codepoints.sort_unstable();
    codepoints.dedup();

    let mut chars = Vec::with_capacity(codepoints.len());
    for cp in codepoints {
        let Some(ch) = char::from_u32(cp) else {
            continue;
        };
        let Some(glyph) = face.glyph_index(ch) else {
            continue;
        };
        let mut probe = InkProbe::default();
        face.outline_glyph(glyph, &mut probe);
        if probe.commands > 0 {
            chars.push(ch);
        }
    }
    debug!(font = font.name(), characters = chars.len(), "built character set");
    Ok(CharacterSet::new(chars))
}

#[derive(Default)]
struct InkProbe {
    commands: usize,
}

impl OutlineBuilder for InkProbe {
    fn move_to(&mut self, _x: f32, _y: f32) {}

    fn line_to(&mut self, _x: f32, _y: f32) {
        self.commands += 1;
    }

    fn quad_to(&mut self, _x1: f32, _y1: f32, _x: f32, _y: f32) {
        self.commands += 1;
    }

    fn curve_to(&mut self, _x1: f32, _y1: f32, _x2: f32, _y2: f32, _x: f32, _y: f32) {
        self.commands += 1;
    }

    fn close(&mut self) {}
}

/// On-disk store of character sets, one `<stem>_cache.json` per font.
///
/// Entries are keyed by stem only. A font file that changes under the same name keeps its
/// stale entry until the file is removed.
#[derive(Debug, Clone)]
pub struct CharacterCache {
    dir: PathBuf,
}

impl CharacterCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}_cache.json"))
    }

    pub fn load(&self, stem: &str) -> Result<Option<CharacterSet>> {
        let path = self.path_for(stem);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|err| CanvasError::Cache {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let set = serde_json::from_str(&content).map_err(|err| CanvasError::Cache {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        Ok(Some(set))
    }

    pub fn store(&self, stem: &str, set: &CharacterSet) -> Result<()> {
        let path = self.path_for(stem);
        fs::create_dir_all(&self.dir).map_err(|err| CanvasError::Cache {
            path: self.dir.clone(),
            reason: err.to_string(),
        })?;
        let content = serde_json::to_string(set).map_err(|err| CanvasError::Cache {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        fs::write(&path, content).map_err(|err| CanvasError::Cache {
            path,
            reason: err.to_string(),
        })
    }

    /// Returns the cached set for `font`, building and storing it on a miss.
    ///
    /// Unreadable entries are rebuilt and write failures only warn.
    pub fn characters_of(&self, font: &FontHandle) -> Result<CharacterSet> {
        let stem = font.name();
        match self.load(stem) {
            Ok(Some(set)) => return Ok(set),
            Ok(None) => {}
            Err(err) => warn!(font = stem, error = %err, "ignoring unreadable character cache"),
        }
        let set = characters_of(font)?;
        if let Err(err) = self.store(stem, &set) {
            warn!(font = stem, error = %err, "failed to write character cache");
        }
        Ok(set)
    }
}
