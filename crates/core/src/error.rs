//! Error types for the synthetic codec library.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur while loading trace data.
///
/// Per the codec contract, construction failures never escape a codec
/// constructor: a codec that fails to load its traces simply reports
/// `valid() == false` for the rest of its life. These variants surface on
/// the standalone loading APIs ([`TraceCatalog::load`](crate::TraceCatalog::load),
/// [`read_trace_file`](crate::trace::reader::read_trace_file)) and map to
/// specific failure modes:
///
/// - **Filesystem**: [`Io`](Self::Io) — directory or file access failures.
/// - **File content**: [`Parse`](Self::Parse) — malformed trace lines.
/// - **Catalog shape**: [`EmptyCatalog`](Self::EmptyCatalog),
///   [`InconsistentLength`](Self::InconsistentLength),
///   [`TraceTooShort`](Self::TraceTooShort).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Underlying I/O error while scanning or reading trace files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A trace file line could not be parsed as a frame record.
    #[error("trace parse error in {path} line {line}: {kind}")]
    Parse {
        path: PathBuf,
        /// 1-based line number of the offending line.
        line: usize,
        kind: ParseErrorKind,
    },

    /// The directory contained no admissible trace files for the prefix.
    #[error("no admissible trace files found")]
    EmptyCatalog,

    /// Trace files under one catalog must all describe the same raw video,
    /// so they must agree on the number of frames.
    #[error("{path} has {found} frames, other traces in the catalog have {expected}")]
    InconsistentLength {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    /// Traces must be long enough to survive the wrap to the first
    /// non-excluded frame.
    #[error("{path} has {found} frames, need at least {min}")]
    TraceTooShort {
        path: PathBuf,
        found: usize,
        min: usize,
    },
}

/// Specific kind of trace line parse failure.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// The line had no columns at all.
    MissingSize,
    /// The leading column was not an unsigned byte count.
    InvalidSize(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSize => write!(f, "missing frame size column"),
            Self::InvalidSize(token) => write!(f, "invalid frame size {token:?}"),
        }
    }
}

/// Convenience alias for `Result<T, CodecError>`.
pub type Result<T> = std::result::Result<T, CodecError>;
