use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use tracing::{info, warn};

use super::{CharacterCache, CharacterSet, FontHandle, characters_of};
use crate::error::{CanvasError, Result};
use crate::render::GlyphRasterizer;

/// First code point of the Variation Selectors Supplement.
const VARIATION_SELECTORS_SUPPLEMENT: u32 = 0xE0100;

const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

#[derive(Debug, Clone)]
pub struct FontEntry<R = FontHandle> {
    pub font: R,
    pub characters: CharacterSet,
}

#[derive(Debug, Clone)]
pub struct BankOptions {
    pub font_size: f32,
    pub block_list: Vec<String>,
    pub cache: Option<CharacterCache>,
}

impl Default for BankOptions {
    fn default() -> Self {
        Self {
            font_size: 64.0,
            block_list: Vec::new(),
            cache: None,
        }
    }
}

/// An immutable, non-empty set of fonts keyed by stem.
#[derive(Debug, Clone)]
pub struct FontBank<R = FontHandle> {
    entries: Vec<FontEntry<R>>,
    all_characters: CharacterSet,
}

impl FontBank<FontHandle> {
    /// Scans `dir` recursively for `.ttf`/`.otf` files and keeps every font that passes
    /// the bank policy. Rejected fonts are logged and skipped.
    pub fn load(dir: &Path, options: &BankOptions) -> Result<Self> {
        let files = collect_font_files(dir)?;
        let mut admission = Admission::new(&options.block_list);
        for path in files {
            let stem = font_stem(&path);
            if !admission.accepts_stem(&stem, &path) {
                continue;
            }
            let loaded = FontHandle::load(&path, options.font_size).and_then(|font| {
                let characters = match &options.cache {
                    Some(cache) => cache.characters_of(&font)?,
                    None => characters_of(&font)?,
                };
                Ok(FontEntry { font, characters })
            });
            match loaded {
                Ok(entry) => admission.push(stem, &path, entry),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping font that failed to load")
                }
            }
        }
        let bank = admission.finish(dir.display().to_string())?;
        info!(
            dir = %dir.display(),
            fonts = bank.len(),
            characters = bank.all_characters.len(),
            "loaded font bank"
        );
        Ok(bank)
    }
}

impl<R: GlyphRasterizer> FontBank<R> {
    /// Builds a bank from already-loaded fonts, applying the same policy as [`FontBank::load`].
    pub fn from_entries(
        origin: &str,
        entries: impl IntoIterator<Item = FontEntry<R>>,
        block_list: &[String],
    ) -> Result<Self> {
        let mut admission = Admission::new(block_list);
        for entry in entries {
            let stem = entry.font.name().to_string();
            let path = PathBuf::from(&stem);
            if admission.accepts_stem(&stem, &path) {
                admission.push(stem, &path, entry);
            }
        }
        admission.finish(origin.to_string())
    }

    /// Wraps one font without applying the bank policy.
    pub fn single(entry: FontEntry<R>) -> Self {
        let all_characters = entry.characters.clone();
        Self {
            entries: vec![entry],
            all_characters,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FontEntry<R>] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&FontEntry<R>> {
        self.entries.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.font.name() == name)
    }

    pub fn find(&self, name: &str) -> Option<&FontEntry<R>> {
        self.position(name).and_then(|index| self.get(index))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.font.name())
    }

    /// Union of every member's characters.
    pub fn all_characters(&self) -> &CharacterSet {
        &self.all_characters
    }

    /// Draws one font, uniformly or weighted by character-set size.
    pub fn pick<G: Rng + ?Sized>(&self, rng: &mut G, weighted: bool) -> &FontEntry<R> {
        let index = if weighted {
            let weights = self.entries.iter().map(|entry| entry.characters.len());
            match WeightedIndex::new(weights) {
                Ok(dist) => dist.sample(rng),
                Err(_) => rng.gen_range(0..self.entries.len()),
            }
        } else {
            rng.gen_range(0..self.entries.len())
        };
        &self.entries[index]
    }
}

struct Admission<'a, R> {
    block_list: &'a [String],
    seen: HashSet<String>,
    entries: Vec<FontEntry<R>>,
}

impl<'a, R> Admission<'a, R> {
    fn new(block_list: &'a [String]) -> Self {
        Self {
            block_list,
            seen: HashSet::new(),
            entries: Vec::new(),
        }
    }

    fn accepts_stem(&self, stem: &str, path: &Path) -> bool {
        if let Some(blocked) = blocked_by(stem, self.block_list) {
            warn!(path = %path.display(), blocked, "skipping blocked font");
            return false;
        }
        if self.seen.contains(stem) {
            warn!(path = %path.display(), stem, "skipping font with duplicate name");
            return false;
        }
        true
    }

    fn push(&mut self, stem: String, path: &Path, entry: FontEntry<R>) {
        if let Some(ch) = entry
            .characters
            .iter()
            .find(|&ch| ch as u32 >= VARIATION_SELECTORS_SUPPLEMENT)
        {
            warn!(
                path = %path.display(),
                codepoint = %format!("U+{:04X}", ch as u32),
                "skipping font that maps variation selectors"
            );
            return;
        }
        self.seen.insert(stem);
        self.entries.push(entry);
    }

    fn finish(self, origin: String) -> Result<FontBank<R>> {
        if self.entries.is_empty() {
            return Err(CanvasError::EmptyFontBank { origin });
        }
        let all_characters = self
            .entries
            .iter()
            .flat_map(|entry| entry.characters.iter())
            .collect();
        Ok(FontBank {
            entries: self.entries,
            all_characters,
        })
    }
}

/// Returns the block-list entry contained in `stem`, if any.
pub(crate) fn blocked_by<'a>(stem: &str, block_list: &'a [String]) -> Option<&'a str> {
    block_list
        .iter()
        .map(|entry| entry.trim())
        .find(|entry| !entry.is_empty() && stem.contains(entry))
}

pub(crate) fn font_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
        .to_string()
}

fn collect_font_files(root: &Path) -> Result<Vec<PathBuf>> {
    let read_error = |path: &Path, err: std::io::Error| CanvasError::FontLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    };
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|err| read_error(&dir, err))?;
        for entry in entries {
            let entry = entry.map_err(|err| read_error(&dir, err))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|err| read_error(&path, err))?;
            if file_type.is_dir() {
                stack.push(path);
            } else if file_type.is_file() && is_font_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FONT_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
