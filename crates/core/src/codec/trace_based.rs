use std::path::Path;

use crate::codec::simple::DEFAULT_FPS;
use crate::codec::{Codec, FrameRecord, DEFAULT_TARGET_RATE_BPS};
use crate::trace::catalog::{Bitrate, TraceCatalog, N_FRAMES_EXCLUDED};
use crate::trace::resolution::Resolution;

/// Below this many bits per pixel the resolution steps up one label.
pub(crate) const LOW_BPP_THRESH: f64 = 0.1;
/// Above this many bits per pixel the resolution steps down one label.
pub(crate) const HIGH_BPP_THRESH: f64 = 0.3;

/// Shared walk state of the trace-driven codecs: the frame index into the
/// raw video, and the resolution the lookups operate at.
///
/// Both [`TraceBasedCodec`] and
/// [`TraceBasedCodecWithScaling`](crate::TraceBasedCodecWithScaling)
/// compose one of these; only their bitrate-matching differs.
pub(crate) struct TraceWalk {
    pub catalog: TraceCatalog,
    pub frame_idx: usize,
    res_idx: usize,
    fixed_res_idx: usize,
    fixed_mode: bool,
}

impl TraceWalk {
    /// Start at frame 0 with the middle resolution (index ⌊n/2⌋ of the
    /// present labels) as both the current and the fixed-mode resolution.
    pub fn new(catalog: TraceCatalog, fixed: bool) -> Self {
        let middle = catalog.resolution_count() / 2;
        Self {
            catalog,
            frame_idx: 0,
            res_idx: middle,
            fixed_res_idx: middle,
            fixed_mode: fixed,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.catalog.resolution_at(self.res_idx)
    }

    /// Advance the frame index, wrapping past the end to
    /// [`N_FRAMES_EXCLUDED`] so the trace's opening I-frame never repeats.
    pub fn step_frame(&mut self) {
        self.frame_idx += 1;
        if self.frame_idx >= self.catalog.frame_count() {
            self.frame_idx = N_FRAMES_EXCLUDED;
        }
    }

    /// Bits per pixel at `rate_bps` for the current resolution.
    ///
    /// At 480p and below this is the plain ratio of frame bits to frame
    /// pixels. Above 480p, Waggoner's 0.75 rule applies: the pixel count is
    /// capped at 480p and the result is scaled by
    /// `(pixels / pixels_480p)^0.75`.
    pub fn bits_per_pixel(&self, rate_bps: f64, fps: f64) -> f64 {
        let resolution = self.resolution();
        let pixels = resolution.pixels();
        let pixels_480p = Resolution::R480p.pixels();
        let (scaling, target_pixels) = if resolution <= Resolution::R480p {
            (1.0, pixels)
        } else {
            ((pixels / pixels_480p).powf(0.75), pixels_480p)
        };
        rate_bps / (fps * target_pixels * scaling)
    }

    /// Move the resolution at most one label, and only in variable mode.
    pub fn adjust_resolution(&mut self, bpp: f64) {
        if self.fixed_mode {
            return;
        }
        let old = self.resolution();
        if bpp < LOW_BPP_THRESH && self.res_idx + 1 < self.catalog.resolution_count() {
            self.res_idx += 1;
        } else if bpp > HIGH_BPP_THRESH && self.res_idx > 0 {
            self.res_idx -= 1;
        }
        let new = self.resolution();
        if new != old {
            tracing::debug!(%old, %new, bpp, "resolution adjusted");
        }
    }

    pub fn fixed_mode(&self) -> bool {
        self.fixed_mode
    }

    /// Entering fixed mode pins the walk to the fixed-mode resolution;
    /// leaving it lets the current resolution evolve from wherever it is.
    pub fn set_fixed_mode(&mut self, fixed: bool) {
        if fixed {
            self.res_idx = self.fixed_res_idx;
        }
        self.fixed_mode = fixed;
    }

    /// Select the middle resolution for fixed mode.
    pub fn select_middle_fixed_resolution(&mut self) {
        self.fixed_res_idx = self.catalog.resolution_count() / 2;
        if self.fixed_mode {
            self.res_idx = self.fixed_res_idx;
        }
    }

    /// Select `res` for fixed mode. Rejected (returning `false`, no state
    /// change) unless the catalog has traces for it.
    pub fn set_fixed_resolution(&mut self, res: Resolution) -> bool {
        match self.catalog.index_of(res) {
            Some(idx) => {
                self.fixed_res_idx = idx;
                if self.fixed_mode {
                    self.res_idx = idx;
                }
                true
            }
            None => false,
        }
    }
}

/// An adaptive-bitrate codec replaying pre-encoded trace files.
///
/// Construction loads every admissible trace under a directory into a
/// [`TraceCatalog`] (see the catalog docs for the file naming scheme). On
/// every advance the codec picks, at its current resolution, the trace
/// with the largest bitrate not exceeding the target rate (or the
/// smallest available one when the target sits below them all) and
/// reports that trace's size for the current frame. Changing the target
/// rate may switch traces, but never moves the frame index: the output
/// keeps referring to the same frame of the raw video.
///
/// In **variable** mode (the default) the resolution evolves by bits per
/// pixel: below [`LOW_BPP_THRESH`] it steps up one present label, above
/// [`HIGH_BPP_THRESH`] it steps down one, at most one step per advance.
/// Resolutions above 480p apply Waggoner's 0.75 scaling rule to the BPP
/// computation. In **fixed** mode the resolution is pinned.
///
/// A codec whose catalog failed to load is permanently invalid; a loaded
/// one stays valid forever (the frame index wraps indefinitely).
pub struct TraceBasedCodec {
    fps: f64,
    target_rate_bps: f32,
    walk: Option<TraceWalk>,
    matched_rate: Option<Bitrate>,
    current: FrameRecord,
}

impl TraceBasedCodec {
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
            matched_rate: None,
            current: FrameRecord::zeroed(0, 0.0),
        };
        if codec.walk.is_some() {
            codec.match_bitrate();
            codec.current = codec.make_record();
        }
        codec
    }

    /// The bitrate (kbps) of the trace currently in use, when valid.
    pub fn matched_rate(&self) -> Option<Bitrate> {
        self.matched_rate
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

    /// Pick the trace for the current target rate at the current
    /// resolution: largest bitrate ≤ target, else the smallest available.
    fn match_bitrate(&mut self) {
        let Some(walk) = &self.walk else { return };
        let resolution = walk.resolution();
        let target_kbps = (self.target_rate_bps / 1000.0) as Bitrate;
        let matched = walk
            .catalog
            .bitrate_at_most(resolution, target_kbps)
            .or_else(|| walk.catalog.min_bitrate(resolution));
        if matched != self.matched_rate {
            tracing::debug!(
                %resolution,
                target_kbps,
                matched_kbps = matched,
                "trace switched"
            );
            self.matched_rate = matched;
        }
    }

    fn make_record(&self) -> FrameRecord {
        let bytes = match (&self.walk, self.matched_rate) {
            (Some(walk), Some(rate)) => walk
                .catalog
                .frame_size(walk.resolution(), rate, walk.frame_idx)
                .unwrap_or(0),
            _ => 0,
        };
        FrameRecord::zeroed(bytes as usize, 1.0 / self.fps)
    }
}

impl Codec for TraceBasedCodec {
    fn current(&self) -> &FrameRecord {
        &self.current
    }

    fn advance(&mut self) {
        let Some(walk) = &mut self.walk else { return };
        walk.step_frame();
        if let Some(rate) = self.matched_rate {
            let bpp = walk.bits_per_pixel(f64::from(rate) * 1000.0, self.fps);
            walk.adjust_resolution(bpp);
        }
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
            // Re-run the lookup now; the frame index (and the emitted
            // record) only move on the next advance.
            self.match_bitrate();
        }
        self.target_rate_bps
    }
}

/// Load the catalog, downgrading failures to a log line: the codec is
/// simply born invalid, per the contract.
pub(crate) fn load_walk(dir: &Path, prefix: &str, fixed: bool) -> Option<TraceWalk> {
    match TraceCatalog::load(dir, prefix) {
        Ok(catalog) => Some(TraceWalk::new(catalog, fixed)),
        Err(error) => {
            tracing::warn!(
                path = %dir.display(),
                prefix,
                %error,
                "trace catalog load failed, codec will be invalid"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{flat_sizes, unique_trace_dir, write_trace};
    use std::path::PathBuf;

    const FRAMES: usize = 25;

    /// One 720p ladder: 500/1000/1500 kbps with distinguishable sizes.
    fn make_ladder_dir() -> PathBuf {
        let dir = unique_trace_dir("trace-codec");
        write_trace(&dir, "vid", "720p", 500, &flat_sizes(2500, FRAMES));
        write_trace(&dir, "vid", "720p", 1000, &flat_sizes(5000, FRAMES));
        write_trace(&dir, "vid", "720p", 1500, &flat_sizes(7500, FRAMES));
        dir
    }

    /// Several resolutions sharing a single bitrate each.
    fn make_multi_res_dir(labels: &[&str], bitrate: u32) -> PathBuf {
        let dir = unique_trace_dir("trace-codec");
        for label in labels {
            write_trace(&dir, "vid", label, bitrate, &flat_sizes(1000, FRAMES));
        }
        dir
    }

    #[test]
    fn invalid_when_directory_unusable() {
        let dir = unique_trace_dir("trace-codec").join("absent");
        let mut codec = TraceBasedCodec::new(&dir, "vid");
        assert!(!codec.valid());
        // Safe defaults out of contract.
        assert_eq!(codec.current().size(), 0);
        codec.advance();
        assert!(!codec.valid());
        assert_eq!(codec.matched_rate(), None);
        assert!(!codec.set_resolution_for_fixed_mode(Resolution::R720p));
    }

    #[test]
    fn matches_largest_bitrate_below_target() {
        let dir = make_ladder_dir();
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        assert!(codec.valid());

        codec.set_target_rate(1_200_000.0);
        assert_eq!(codec.matched_rate(), Some(1000));
        codec.advance();
        assert_eq!(codec.current().size(), 5000);
        assert_eq!(codec.current().delay_seconds, 1.0 / 25.0);
    }

    #[test]
    fn falls_back_to_smallest_when_target_below_all() {
        let dir = make_ladder_dir();
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        codec.set_target_rate(400_000.0);
        assert_eq!(codec.matched_rate(), Some(500));
        codec.advance();
        assert_eq!(codec.current().size(), 2500);
    }

    #[test]
    fn exact_trace_rate_matches_itself() {
        let dir = make_ladder_dir();
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        codec.set_target_rate(1_500_000.0);
        assert_eq!(codec.matched_rate(), Some(1500));
    }

    #[test]
    fn frame_index_wraps_past_excluded_frames() {
        let dir = unique_trace_dir("trace-codec");
        let ramp: Vec<u64> = (0..FRAMES as u64).collect();
        write_trace(&dir, "vid", "720p", 1000, &ramp);
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        codec.set_target_rate(1_000_000.0);

        // Sizes mirror the index, so the walk is directly observable.
        assert_eq!(codec.current().size(), 0);
        for expected in 1..FRAMES {
            codec.advance();
            assert_eq!(codec.current().size(), expected);
        }
        // Wrap: not back to 0, but to the first non-excluded frame.
        codec.advance();
        assert_eq!(codec.current().size(), N_FRAMES_EXCLUDED);
        for expected in N_FRAMES_EXCLUDED + 1..FRAMES {
            codec.advance();
            assert_eq!(codec.current().size(), expected);
        }
        codec.advance();
        assert_eq!(codec.current().size(), N_FRAMES_EXCLUDED);
    }

    #[test]
    fn starts_at_middle_resolution() {
        let dir = make_multi_res_dir(&["240p", "360p", "480p"], 1000);
        let codec = TraceBasedCodec::new(&dir, "vid");
        assert_eq!(codec.current_resolution(), Some(Resolution::R360p));

        let dir = make_multi_res_dir(&["240p", "360p", "480p", "540p"], 1000);
        let codec = TraceBasedCodec::new(&dir, "vid");
        assert_eq!(codec.current_resolution(), Some(Resolution::R480p));
    }

    #[test]
    fn low_bpp_steps_resolution_up_one_label_per_advance() {
        // 100 kbps at >= 360p is far below any plausible low threshold.
        let dir = make_multi_res_dir(&["360p", "480p", "540p", "720p"], 100);
        let mut codec = TraceBasedCodec::new(&dir, "vid");
        assert_eq!(codec.current_resolution(), Some(Resolution::R540p));

        codec.advance();
        assert_eq!(codec.current_resolution(), Some(Resolution::R720p));
        // Upper boundary: no further step.
        codec.advance();
        assert_eq!(codec.current_resolution(), Some(Resolution::R720p));
    }

    #[test]
    fn high_bpp_steps_resolution_down_one_label_per_advance() {
        // 6000 kbps at <= 360p is far above any plausible high threshold.
        let dir = make_multi_res_dir(&["180p", "240p", "360p"], 6000);
        let mut codec = TraceBasedCodec::new(&dir, "vid");
        codec.set_target_rate(6_000_000.0);
        assert_eq!(codec.current_resolution(), Some(Resolution::R240p));

        codec.advance();
        assert_eq!(codec.current_resolution(), Some(Resolution::R180p));
        // Lower boundary: no further step.
        codec.advance();
        assert_eq!(codec.current_resolution(), Some(Resolution::R180p));
    }

    #[test]
    fn fixed_mode_pins_resolution() {
        let dir = make_multi_res_dir(&["360p", "480p", "540p"], 100);
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        assert!(codec.get_fixed_mode());
        for _ in 0..5 {
            codec.advance();
            assert_eq!(codec.current_resolution(), Some(Resolution::R480p));
        }
    }

    #[test]
    fn fixed_resolution_selection() {
        let dir = make_multi_res_dir(&["360p", "480p", "540p"], 1000);
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);

        assert!(codec.set_resolution_for_fixed_mode(Resolution::R540p));
        assert_eq!(codec.current_resolution(), Some(Resolution::R540p));

        // Absent label: rejected, nothing moves.
        assert!(!codec.set_resolution_for_fixed_mode(Resolution::R1080p));
        assert_eq!(codec.current_resolution(), Some(Resolution::R540p));

        codec.set_default_resolution_for_fixed_mode();
        assert_eq!(codec.current_resolution(), Some(Resolution::R480p));
    }

    #[test]
    fn leaving_fixed_mode_keeps_resolution_until_bpp_moves_it() {
        let dir = make_multi_res_dir(&["360p", "480p", "540p"], 1000);
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        assert!(codec.set_resolution_for_fixed_mode(Resolution::R360p));
        codec.set_fixed_mode(false);
        assert!(!codec.get_fixed_mode());
        assert_eq!(codec.current_resolution(), Some(Resolution::R360p));
    }

    #[test]
    fn waggoner_rule_above_480p() {
        let dir = make_multi_res_dir(&["720p"], 1000);
        let codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        let walk = codec.walk.as_ref().unwrap();

        let rate_bps = 1_000_000.0;
        let pixels_720p = Resolution::R720p.pixels();
        let pixels_480p = Resolution::R480p.pixels();
        let scaling = (pixels_720p / pixels_480p).powf(0.75);
        let expected = rate_bps / (25.0 * pixels_480p * scaling);
        assert!((walk.bits_per_pixel(rate_bps, 25.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn plain_bpp_at_480p_and_below() {
        let dir = make_multi_res_dir(&["480p"], 1000);
        let codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        let walk = codec.walk.as_ref().unwrap();
        let expected = 1_000_000.0 / (25.0 * Resolution::R480p.pixels());
        assert!((walk.bits_per_pixel(1_000_000.0, 25.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn rate_change_keeps_frame_position() {
        let dir = unique_trace_dir("trace-codec");
        let ramp: Vec<u64> = (100..100 + FRAMES as u64).collect();
        let double: Vec<u64> = ramp.iter().map(|s| s * 2).collect();
        write_trace(&dir, "vid", "720p", 500, &ramp);
        write_trace(&dir, "vid", "720p", 1000, &double);
        let mut codec = TraceBasedCodec::with_options(&dir, "vid", 25.0, true);
        codec.set_target_rate(500_000.0);
        for _ in 0..4 {
            codec.advance();
        }
        assert_eq!(codec.current().size(), 104);

        // Switching traces continues at frame 5 of the new trace.
        codec.set_target_rate(1_000_000.0);
        assert_eq!(codec.matched_rate(), Some(1000));
        codec.advance();
        assert_eq!(codec.current().size(), 210);
    }
}
