//! # syncodec — synthetic video codecs for congestion-control experiments
//!
//! A family of synthetic codecs that generate rate-adaptive video-like
//! traffic without encoding any actual video. They are meant to drive
//! real-time media congestion controllers (RMCAT-style evaluation) in
//! simulators and testbeds alike: each codec is a pull-based producer of
//! frame records, and the caller decides how to spend the reported
//! inter-frame delays (wall-clock sleeps or virtual time).
//!
//! ## References
//!
//! | Reference | Topic | How this crate uses it |
//! |-----------|-------|------------------------|
//! | [RMCAT WG](https://datatracker.ietf.org/wg/rmcat/) | Congestion control for real-time media | The consumer these codecs were built for |
//! | draft-zhu-rmcat-video-traffic-source | Video traffic source model | Trace-based codec algorithm, bits-per-pixel resolution adaptation |
//! | Ben Waggoner's 0.75 rule | Bits-per-pixel scaling above 480p | [`TraceBasedCodec`] resolution decisions |
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  Consumer (congestion controller / driver)    │
//! ├───────────────────────────────────────────────┤
//! │  ShapedPacketizer — MTU slicing, pacing       │  wraps any codec
//! ├───────────────────────────────────────────────┤
//! │  PerfectCodec — constant cadence              │
//! │  SimpleFpsCodec — fixed fps                   │
//! │  StatisticsCodec — steady/transient model     │
//! │  TraceBasedCodec — pre-encoded traces         │
//! │  TraceBasedCodecWithScaling — + interpolation │
//! ├───────────────────────────────────────────────┤
//! │  TraceCatalog — directory scan, (res, rate)   │
//! │  reader — trace file line parsing             │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use syncodec::{Codec, ShapedPacketizer, SimpleFpsCodec};
//!
//! let inner = Box::new(SimpleFpsCodec::new(30.0));
//! let mut codec = ShapedPacketizer::new(inner, 1000);
//! codec.set_target_rate(800_000.0);
//!
//! while codec.valid() {
//!     codec.advance();
//!     let record = codec.current();
//!     // ship record.payload.len() bytes, then wait record.delay_seconds
//! #   break;
//! }
//! ```
//!
//! ## Crate layout
//!
//! - [`codec`] — the [`Codec`] contract and every codec variant.
//! - [`trace`] — trace file reader, [`Resolution`] labels, [`TraceCatalog`].
//! - [`error`] — [`CodecError`] enum and [`Result`] alias.

pub mod codec;
pub mod error;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_support;

pub use codec::perfect::PerfectCodec;
pub use codec::scaling::TraceBasedCodecWithScaling;
pub use codec::shaped::ShapedPacketizer;
pub use codec::simple::SimpleFpsCodec;
pub use codec::statistics::{NoiseFn, StatisticsCodec, StatisticsConfig, RAND_UNIFORM_MAX_RATIO};
pub use codec::trace_based::TraceBasedCodec;
pub use codec::{Codec, FrameRecord, DEFAULT_TARGET_RATE_BPS};
pub use error::{CodecError, ParseErrorKind, Result};
pub use trace::catalog::{
    Bitrate, FrameSequence, TraceCatalog, N_FRAMES_EXCLUDED, TRACE_BITRATE_STEP,
    TRACE_MAX_BITRATE, TRACE_MIN_BITRATE,
};
pub use trace::reader::LineRecord;
pub use trace::resolution::Resolution;
