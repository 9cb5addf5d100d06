use std::path::PathBuf;

use thiserror::Error;

use crate::mrz::MrzType;

pub type Result<T, E = CanvasError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("failed to load font {path}: {reason}")]
    FontLoad { path: PathBuf, reason: String },

    #[error("unsupported font format in {font}: the face has neither glyf nor CFF outlines")]
    UnsupportedFontFormat { font: String },

    #[error("failed to render {text:?} with font {font}: {reason}; do not use this font for rendering")]
    GlyphRender {
        text: String,
        font: String,
        reason: String,
    },

    #[error("{text:?} laid out to a degenerate {width}x{height} box with font {font}")]
    EmptyRender {
        text: String,
        font: String,
        width: i32,
        height: i32,
    },

    #[error("no text supplied and random text is disabled")]
    MissingText,

    #[error("malformed mrz text: {0}")]
    MalformedMrz(#[from] MrzViolation),

    #[error("unknown {kind} {value:?}, expected one of: {expected}")]
    UnknownOption {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("font bank {origin} contains no usable fonts")]
    EmptyFontBank { origin: String },

    #[error("character cache {path}: {reason}")]
    Cache { path: PathBuf, reason: String },
}

/// Which MRZ schema constraint a supplied text broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MrzViolation {
    #[error("{mrz_type} needs exactly {expected} lines, got {actual}")]
    LineCount {
        mrz_type: MrzType,
        expected: usize,
        actual: usize,
    },

    #[error("{mrz_type} line {line} needs exactly {expected} characters, got {actual}")]
    LineLength {
        mrz_type: MrzType,
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("mrz text must be either a single string or a list of strings, got {found}")]
    NotLines { found: String },
}
