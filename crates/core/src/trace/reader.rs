//! Trace file reader.
//!
//! A trace file describes the frame sequence a real codec produced when
//! encoding one raw video at a fixed resolution and target bitrate. The
//! format is plain text, one frame per line:
//!
//! ```text
//! # optional comments
//! <size_bytes> [<frame type> [<PSNR> ...]]
//! ```
//!
//! Only the leading column (the encoded frame size in bytes) is consumed
//! by the codecs. Trailing columns are preserved on the record untouched.
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{CodecError, ParseErrorKind, Result};

/// A single frame record parsed from a trace file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    /// Encoded frame size in bytes.
    pub size_bytes: u64,
    /// Trailing columns (frame type, PSNR, …) as they appeared in the file.
    /// Carried along for completeness; the codec algorithms never read them.
    pub extra: Vec<String>,
}

/// Parse a whole trace file into its frame records.
///
/// Returns [`CodecError::Parse`] (with path and 1-based line number) on the
/// first malformed line, or [`CodecError::Io`] on filesystem failures.
pub fn read_trace_file(path: &Path) -> Result<Vec<LineRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let mut frames = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut columns = line.split_whitespace();
        let size_token = columns.next().ok_or_else(|| CodecError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            kind: ParseErrorKind::MissingSize,
        })?;
        let size_bytes = size_token.parse::<u64>().map_err(|_| CodecError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            kind: ParseErrorKind::InvalidSize(size_token.to_string()),
        })?;

        frames.push(LineRecord {
            size_bytes,
            extra: columns.map(str::to_string).collect(),
        });
    }

    tracing::trace!(path = %path.display(), frames = frames.len(), "trace file read");
    Ok(frames)
}
