use std::path::Path;

use crate::codec::simple::DEFAULT_FPS;
use crate::codec::trace_based::{load_walk, TraceWalk};
use crate::codec::{Codec, FrameRecord, DEFAULT_TARGET_RATE_BPS};
use crate::trace::catalog::Bitrate;
use crate::trace::resolution::Resolution;

/// The trace-based codec with scaling and interpolation.
///
/// [`TraceBasedCodec`](crate::TraceBasedCodec) uses trace data as-is, so
/// under small target-rate variations it keeps emitting the very same size
/// sequence. This variant instead brackets the target between the nearest
/// trace bitrates at the current resolution and blends their frame sizes:
///
/// - target inside the available range — linear interpolation between the
///   bracketing traces' sizes for the current frame;
/// - target above every available bitrate — the highest trace's size,
///   scaled proportionally to the target;
/// - target below every available bitrate — the lowest trace's size,
///   scaled proportionally to the target.
///
/// Resolution adaptation works as in the base codec, except bits per pixel
/// are computed from the exact target rate rather than a matched trace
/// bitrate.
pub struct TraceBasedCodecWithScaling {
    fps: f64,
    target_rate_bps: f32,
    walk: Option<TraceWalk>,
    low_rate: Option<Bitrate>,
    high_rate: Option<Bitrate>,
    current: FrameRecord,
}

impl TraceBasedCodecWithScaling {
    /// Load traces from `dir` with the given file prefix; 25 fps, variable
    /// resolution mode.
    pub fn new(dir: &Path, prefix: &str) -> Self {
        Self::with_options(dir, prefix, DEFAULT_FPS, false)
    }

    /// Full construction: frame rate and starting mode.
    pub fn with_options(dir: &Path, prefix: &str, fps: f64, fixed: bool) -> Self {
        let walk = load_walk(dir, prefix, fixed);
        let mut codec = Self {
            fps,
            target_rate_bps: DEFAULT_TARGET_RATE_BPS,
            walk,
            low_rate: None,
            high_rate: None,
            current: FrameRecord::zeroed(0, 0.0),
        };
        if codec.walk.is_some() {
            codec.match_bitrate();
            codec.current = codec.make_record();
        }
        codec
    }

    /// The bracketing trace bitrates (kbps) around the target rate:
    /// `(largest ≤ target, smallest > target)`.
    pub fn bracket(&self) -> (Option<Bitrate>, Option<Bitrate>) {
        (self.low_rate, self.high_rate)
    }

    /// The resolution the lookups currently operate at, when valid.
    pub fn current_resolution(&self) -> Option<Resolution> {
        self.walk.as_ref().map(TraceWalk::resolution)
    }

    /// Whether the codec is in fixed resolution mode.
    pub fn get_fixed_mode(&self) -> bool {
        self.walk.as_ref().is_some_and(TraceWalk::fixed_mode)
    }

    /// Switch between fixed and variable resolution mode.
    pub fn set_fixed_mode(&mut self, fixed: bool) {
        if let Some(walk) = &mut self.walk {
            walk.set_fixed_mode(fixed);
        }
    }

    /// Use the middle resolution when in fixed mode.
    pub fn set_default_resolution_for_fixed_mode(&mut self) {
        if let Some(walk) = &mut self.walk {
            walk.select_middle_fixed_resolution();
        }
    }

    /// Use `res` when in fixed mode. Returns `false` (and changes nothing)
    /// when the catalog has no traces for `res`.
    pub fn set_resolution_for_fixed_mode(&mut self, res: Resolution) -> bool {
        match &mut self.walk {
            Some(walk) => walk.set_fixed_resolution(res),
            None => false,
        }
    }

    fn target_kbps(&self) -> f64 {
        f64::from(self.target_rate_bps) / 1000.0
    }

    /// Find the bitrates bracketing the target at the current resolution.
    fn match_bitrate(&mut self) {
        let Some(walk) = &self.walk else { return };
        let resolution = walk.resolution();
        // Trace bitrates are integers, so flooring the target preserves
        // both comparisons.
        let floor_kbps = self.target_kbps() as Bitrate;
        let low = walk.catalog.bitrate_at_most(resolution, floor_kbps);
        let high = walk.catalog.bitrate_above(resolution, floor_kbps);
        if (low, high) != (self.low_rate, self.high_rate) {
            tracing::debug!(
                %resolution,
                target_kbps = self.target_kbps(),
                low_kbps = low,
                high_kbps = high,
                "bracket switched"
            );
            self.low_rate = low;
            self.high_rate = high;
        }
    }

    fn make_record(&self) -> FrameRecord {
        FrameRecord::zeroed(self.interpolated_bytes(), 1.0 / self.fps)
    }

    /// Blend the bracketing traces' sizes for the current frame.
    fn interpolated_bytes(&self) -> usize {
        let Some(walk) = &self.walk else { return 0 };
        let resolution = walk.resolution();
        let idx = walk.frame_idx;
        let size_of = |rate: Bitrate| {
            walk.catalog
                .frame_size(resolution, rate, idx)
                .unwrap_or(0) as f64
        };
        let target = self.target_kbps();

        let bytes = match (self.low_rate, self.high_rate) {
            (Some(low), Some(high)) => {
                let s_low = size_of(low);
                let s_high = size_of(high);
                s_low + (s_high - s_low) * (target - f64::from(low))
                    / (f64::from(high) - f64::from(low))
            }
            // Target above everything available: scale the top trace up.
            (Some(low), None) => size_of(low) * target / f64::from(low),
            // Target below everything available: scale the bottom trace down.
            (None, Some(high)) => size_of(high) * target / f64::from(high),
            (None, None) => 0.0,
        };
        bytes.round().max(0.0) as usize
    }
}

impl Codec for TraceBasedCodecWithScaling {
    fn current(&self) -> &FrameRecord {
        &self.current
    }

    fn advance(&mut self) {
        let target_bps = f64::from(self.target_rate_bps);
        let fps = self.fps;
        let Some(walk) = &mut self.walk else { return };
        walk.step_frame();
        // Resolution decisions use the exact target rate here, not a
        // matched trace bitrate.
        let bpp = walk.bits_per_pixel(target_bps, fps);
        walk.adjust_resolution(bpp);
        self.match_bitrate();
        self.current = self.make_record();
    }

    fn valid(&self) -> bool {
        self.walk.is_some()
    }

    fn target_rate(&self) -> f32 {
        self.target_rate_bps
    }

    fn set_target_rate(&mut self, new_rate_bps: f32) -> f32 {
        if new_rate_bps > 0.0 {
            self.target_rate_bps = new_rate_bps;
            self.match_bitrate();
        }
        self.target_rate_bps
    }
}
