//! Error types for the crate's I/O boundaries.
//!
//! Per spec: malformed feedback text is reported as a boolean, not an
//! error; programming-contract violations (mismatched lengths, etc.)
//! are assertions, not `Result`s. `EngineError` only covers the two
//! places that actually touch the filesystem: loading the dictionary
//! and loading/saving the state cache.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("could not read dictionary file {path}: {source}")]
    DictionaryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("word {word:?} in dictionary has length {len}, expected {expected}")]
    DictionaryWordLength {
        word: String,
        len: usize,
        expected: usize,
    },

    #[error("cache file {path} is corrupt: {reason}")]
    CacheFormat { path: PathBuf, reason: String },

    #[error("cache I/O error at {path}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
