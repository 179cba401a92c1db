//! The trace catalog: a two-level index over a directory of trace files.
//!
//! File names follow `<prefix>_<label>_<bitrate>.txt`, e.g.
//! `myvideo_720p_1200.txt`. The label must be one of the canonical
//! [`Resolution`] labels and the bitrate must sit on the admissible grid;
//! anything else in the directory is skipped. All admitted files must
//! describe the same raw video, so they must agree on frame count.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{CodecError, Result};
use crate::trace::reader::{self, LineRecord};
use crate::trace::resolution::Resolution;

/// Trace bitrate in kilobits per second.
pub type Bitrate = u32;

/// The frame sequence of one (resolution, bitrate) trace file.
pub type FrameSequence = Vec<LineRecord>;

/// Minimum admissible trace bitrate (kbps).
pub const TRACE_MIN_BITRATE: Bitrate = 100;
/// Maximum admissible trace bitrate (kbps).
pub const TRACE_MAX_BITRATE: Bitrate = 6000;
/// Admissible trace bitrates must be divisible by this step (kbps).
pub const TRACE_BITRATE_STEP: Bitrate = 100;

/// Number of leading frames skipped when the frame index wraps around.
///
/// The first frame of a trace is almost always an I-frame; wrapping back to
/// it would inject a periodic I-frame into the synthetic sequence, which
/// real conferencing codecs do not do. The wrap lands here instead.
pub const N_FRAMES_EXCLUDED: usize = 20;

/// Indexed trace data for one raw video: resolution → bitrate → frames.
///
/// The resolution level iterates in canonical ascending order restricted to
/// the labels actually present; the bitrate level is ordered ascending. The
/// catalog is built once at codec construction and immutable afterwards.
#[derive(Debug)]
pub struct TraceCatalog {
    traces: Vec<(Resolution, BTreeMap<Bitrate, FrameSequence>)>,
    frame_count: usize,
}

impl TraceCatalog {
    /// Scan `dir` for `<prefix>_<label>_<bitrate>.txt` files and load every
    /// admissible one.
    ///
    /// Files with unknown labels or off-grid bitrates are skipped silently
    /// (logged at debug). Fails if the directory yields no admissible file,
    /// if the admitted traces disagree on frame count, or if the traces are
    /// too short to survive the wrap to [`N_FRAMES_EXCLUDED`].
    pub fn load(dir: &Path, prefix: &str) -> Result<Self> {
        let mut by_resolution: BTreeMap<Resolution, BTreeMap<Bitrate, FrameSequence>> =
            BTreeMap::new();
        let mut frame_count: Option<usize> = None;

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some((resolution, bitrate)) = parse_trace_name(name, prefix) else {
                tracing::debug!(file = name, "skipping non-trace file");
                continue;
            };

            let path = entry.path();
            let frames = reader::read_trace_file(&path)?;

            match frame_count {
                None => frame_count = Some(frames.len()),
                Some(expected) if expected != frames.len() => {
                    return Err(CodecError::InconsistentLength {
                        path,
                        expected,
                        found: frames.len(),
                    });
                }
                Some(_) => {}
            }

            tracing::debug!(
                file = name,
                %resolution,
                bitrate_kbps = bitrate,
                frames = frames.len(),
                "trace loaded"
            );
            by_resolution
                .entry(resolution)
                .or_default()
                .insert(bitrate, frames);
        }

        let Some(frame_count) = frame_count else {
            return Err(CodecError::EmptyCatalog);
        };
        if frame_count < N_FRAMES_EXCLUDED + 1 {
            return Err(CodecError::TraceTooShort {
                path: dir.to_path_buf(),
                found: frame_count,
                min: N_FRAMES_EXCLUDED + 1,
            });
        }

        // BTreeMap iteration follows Resolution's canonical Ord.
        let traces: Vec<_> = by_resolution.into_iter().collect();
        tracing::debug!(
            resolutions = traces.len(),
            frames = frame_count,
            "trace catalog ready"
        );
        Ok(Self {
            traces,
            frame_count,
        })
    }

    /// Shared length of every frame sequence in the catalog.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Number of resolutions with at least one trace.
    pub fn resolution_count(&self) -> usize {
        self.traces.len()
    }

    /// Resolution at `idx` in canonical ascending order.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= resolution_count()`.
    pub fn resolution_at(&self, idx: usize) -> Resolution {
        self.traces[idx].0
    }

    /// Position of `res` among the present resolutions, if it has traces.
    pub fn index_of(&self, res: Resolution) -> Option<usize> {
        self.traces.iter().position(|(r, _)| *r == res)
    }

    /// Largest bitrate at `res` that is ≤ `kbps`, if any.
    pub fn bitrate_at_most(&self, res: Resolution, kbps: Bitrate) -> Option<Bitrate> {
        self.rates(res)?.range(..=kbps).next_back().map(|(b, _)| *b)
    }

    /// Smallest bitrate at `res` that is > `kbps`, if any.
    pub fn bitrate_above(&self, res: Resolution, kbps: Bitrate) -> Option<Bitrate> {
        let from = kbps.saturating_add(1);
        self.rates(res)?.range(from..).next().map(|(b, _)| *b)
    }

    /// Smallest bitrate available at `res`, if any.
    pub fn min_bitrate(&self, res: Resolution) -> Option<Bitrate> {
        self.rates(res)?.keys().next().copied()
    }

    /// Frame size in bytes at (`res`, `bitrate`, `frame_idx`).
    pub fn frame_size(&self, res: Resolution, bitrate: Bitrate, frame_idx: usize) -> Option<u64> {
        self.rates(res)?
            .get(&bitrate)?
            .get(frame_idx)
            .map(|record| record.size_bytes)
    }

    fn rates(&self, res: Resolution) -> Option<&BTreeMap<Bitrate, FrameSequence>> {
        self.traces
            .iter()
            .find(|(r, _)| *r == res)
            .map(|(_, rates)| rates)
    }
}

/// Split a candidate file name into (resolution, bitrate), or `None` when
/// it is not an admissible trace file for this prefix.
fn parse_trace_name(name: &str, prefix: &str) -> Option<(Resolution, Bitrate)> {
    let rest = name.strip_prefix(prefix)?.strip_prefix('_')?;
    let rest = rest.strip_suffix(".txt")?;
    let (label, bitrate) = rest.rsplit_once('_')?;
    let resolution = Resolution::from_label(label)?;
    let kbps: Bitrate = bitrate.parse().ok()?;
    if !(TRACE_MIN_BITRATE..=TRACE_MAX_BITRATE).contains(&kbps) || kbps % TRACE_BITRATE_STEP != 0 {
        return None;
    }
    Some((resolution, kbps))
}
