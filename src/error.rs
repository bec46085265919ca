use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError { // every decoder reports through this, the cli wraps it in Box<dyn Error>
    #[error("unknown model format tag {tag:#010x}")]
    UnknownFormat { tag: u32 },

    #[error("wrong ident {found:#010x} (should be {expected:#010x})")]
    BadIdent { found: u32, expected: u32 },

    #[error("wrong version number {found} (should be {expected})")]
    VersionMismatch { found: i32, expected: i32 },

    #[error("corrupt header: {0}")]
    CorruptHeader(String),

    #[error("invalid {chunk} chunk version {found} (should be {expected})")]
    InvalidVersion { chunk: String, found: i32, expected: i32 },

    #[error("invalid {chunk} chunk size {found} (should be {expected})")]
    InvalidSize { chunk: String, found: usize, expected: usize },

    #[error("unknown chunk {0:?}")]
    UnknownChunk(String),

    #[error("chunk {0:?} appears before the header chunk")]
    MissingHeader(String),

    #[error("unsupported variant: {0}")]
    UnsupportedVariant(String),

    #[error("{what} count {value} outside {min}..={max}")]
    LimitExceeded { what: &'static str, value: i64, min: i64, max: i64 },

    #[error("truncated input: {what} needs {needed} bytes, buffer has {available}")]
    TruncatedInput { what: &'static str, needed: usize, available: usize },

    #[error("arena view {offset}+{len} outside committed bound {bound}")]
    ArenaBounds { offset: usize, len: usize, bound: usize },

    #[error("model registry is full ({0} slots)")]
    RegistryFull(usize),

    #[error("an i/o error occurred: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, LoadError>;

pub(crate) fn corrupt(message: impl Into<String>) -> LoadError {
    LoadError::CorruptHeader(message.into())
}

pub(crate) fn truncated(what: &'static str, needed: usize, available: usize) -> LoadError {
    LoadError::TruncatedInput { what, needed, available }
}
