//! Ingest error types for pubcheck-model.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! ways a line of NDJSON can fail to become a well-formed record.

use thiserror::Error;

/// Errors produced while reading NDJSON trace/CFG records.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A line could not be parsed as JSON at all.
    #[error("malformed JSON at {path}:{line}: {source}")]
    MalformedJson {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A record was missing a field required by its kind.
    #[error("{path}:{line}: record missing required field '{field}'")]
    MissingField {
        path: String,
        line: usize,
        field: &'static str,
    },

    /// A trace instruction's `use_tys` length did not match `uses`.
    #[error(
        "{path}:{line}: use_tys length {use_tys_len} does not match uses length {uses_len}"
    )]
    UseTypeLengthMismatch {
        path: String,
        line: usize,
        uses_len: usize,
        use_tys_len: usize,
    },

    /// A transmitter tag's `which` index was out of bounds for `uses`.
    #[error("{path}:{line}: transmitter index {which} out of bounds for {uses_len} uses")]
    TransmitterIndexOutOfBounds {
        path: String,
        line: usize,
        which: usize,
        uses_len: usize,
    },

    /// A record carried a `kind` discriminator this crate does not recognize.
    #[error("{path}:{line}: unrecognized record kind '{kind}'")]
    UnrecognizedKind {
        path: String,
        line: usize,
        kind: String,
    },

    /// The underlying file could not be opened or read.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
