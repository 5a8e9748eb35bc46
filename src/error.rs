//! Error kinds for the mapping pipeline.
//!
//! Mirrors the distinction `rmap.cpp`/`roptions.c` made informally between
//! fatal setup errors (bad index, bad config), per-file I/O errors that
//! should not abort the whole run, and `MappingInsufficient` which is not
//! an error at all — it's the normal "emit as unmapped" path.

use thiserror::Error;

/// Errors produced by the mapping pipeline.
///
/// `MappingInsufficient` is intentionally not surfaced as a `Result::Err`
/// anywhere in the pipeline: a read with too few chains or too few events
/// is emitted as an unmapped PAF record with `mapq = 0`, never treated as
/// a failure. The variant exists so callers that want to distinguish
/// "couldn't map" from "crashed" have a name for it.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read signal file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed index: {0}")]
    MalformedIndex(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("insufficient evidence to map read {read_name}: {reason}")]
    MappingInsufficient { read_name: String, reason: String },

    #[error("programming error: {0}")]
    Programming(String),
}

pub type MapResult<T> = Result<T, MapError>;
