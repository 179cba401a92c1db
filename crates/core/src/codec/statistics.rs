use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::codec::{Codec, FrameRecord, DEFAULT_TARGET_RATE_BPS};

/// Width of the uniform distribution used by the default noise function:
/// frame sizes are scaled by a factor drawn from `[1 − R, 1 + R]`.
pub const RAND_UNIFORM_MAX_RATIO: f32 = 0.1;

/// Frame-size noise callback: nominal size in, noisy size out.
pub type NoiseFn = Box<dyn FnMut(f32) -> f32 + Send>;

/// Tunable parameters of the [`StatisticsCodec`].
#[derive(Debug, Clone)]
pub struct StatisticsConfig {
    /// Largest accepted relative rate change per update; larger requests
    /// are clamped to `old · (1 ± max_update_ratio)`. 0 disables clamping.
    pub max_update_ratio: f32,
    /// Seconds after an accepted update during which further updates are
    /// rejected.
    pub update_interval: f64,
    /// Relative change at or above which an update is "substantial" and
    /// triggers a transient phase (bypassing `max_update_ratio`).
    pub big_change_ratio: f32,
    /// Length of a transient phase in frames.
    pub transient_length: u32,
    /// I-frame size as a multiple of a steady-state frame.
    pub i_frame_ratio: f32,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            max_update_ratio: 0.10,
            update_interval: 0.10,
            big_change_ratio: 0.50,
            transient_length: 10,
            i_frame_ratio: 4.0,
        }
    }
}

/// Codec phase (statistical model state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Frame sizes fit the target rate directly.
    Steady,
    /// An I-frame burst is being amortized after a substantial rate change.
    Transient,
}

/// A synthetic codec driven by a statistical model instead of traces.
///
/// In the **steady** phase every frame nominally weighs
/// `target_rate / (8 · fps)` bytes. A substantial rate change (relative
/// change ≥ `big_change_ratio`) switches the codec to a **transient**
/// phase of `transient_length` frames: the first one is an I-frame of
/// `i_frame_ratio` times the steady size, and the remaining frames shrink
/// to amortize the excess so the window still averages the steady size.
/// Those remaining frames never drop below 0.2 of a steady frame; when
/// that floor bites, the window overshoots the target and the codec
/// accepts it.
///
/// Whatever the phase, the configured noise callback perturbs every frame
/// size last. The default draws a uniform multiplier from
/// `[1 − RAND_UNIFORM_MAX_RATIO, 1 + RAND_UNIFORM_MAX_RATIO]` out of a
/// per-instance generator; use [`with_seed`](Self::with_seed) to make it
/// reproducible, or [`with_noise`](Self::with_noise) to supply your own
/// model.
///
/// Rate updates are throttled: after an accepted update the codec rejects
/// further updates for `update_interval` seconds of frame time, and
/// non-substantial changes are clamped to `max_update_ratio`.
pub struct StatisticsCodec {
    fps: f64,
    config: StatisticsConfig,
    target_rate_bps: f32,
    phase: Phase,
    remaining_burst_frames: u32,
    time_to_update: f64,
    add_noise: NoiseFn,
    current: FrameRecord,
}

impl StatisticsCodec {
    /// Default configuration with entropy-seeded noise.
    pub fn new(fps: f64) -> Self {
        Self::with_noise(fps, default_noise(StdRng::from_os_rng()))
    }

    /// Default configuration with deterministic noise for reproducible runs.
    pub fn with_seed(fps: f64, seed: u64) -> Self {
        Self::with_noise(fps, default_noise(StdRng::seed_from_u64(seed)))
    }

    /// Default configuration with a caller-provided noise model.
    pub fn with_noise(fps: f64, add_noise: NoiseFn) -> Self {
        Self::with_config(fps, add_noise, StatisticsConfig::default())
    }

    /// Full control over the model parameters.
    pub fn with_config(fps: f64, add_noise: NoiseFn, config: StatisticsConfig) -> Self {
        let mut codec = Self {
            fps,
            config,
            target_rate_bps: DEFAULT_TARGET_RATE_BPS,
            phase: Phase::Steady,
            remaining_burst_frames: 0,
            time_to_update: 0.0,
            add_noise,
            current: FrameRecord::zeroed(0, 0.0),
        };
        codec.advance();
        codec
    }

    /// Nominal steady-state frame size in bytes for the current rate.
    fn steady_frame_bytes(&self) -> f32 {
        self.target_rate_bps / (8.0 * self.fps as f32)
    }

    /// Nominal size of the next frame, before noise.
    fn next_nominal_bytes(&mut self) -> f32 {
        let base = self.steady_frame_bytes();
        match self.phase {
            Phase::Steady => base,
            Phase::Transient => {
                let size = if self.remaining_burst_frames == self.config.transient_length {
                    self.config.i_frame_ratio * base
                } else {
                    // Amortize the I-frame excess over the rest of the
                    // window, floored at 0.2 of a steady frame.
                    let frames = self.config.transient_length as f32;
                    let share = base * (frames - self.config.i_frame_ratio) / (frames - 1.0);
                    share.max(0.2 * base)
                };
                self.remaining_burst_frames -= 1;
                if self.remaining_burst_frames == 0 {
                    self.phase = Phase::Steady;
                    tracing::debug!("transient phase over");
                }
                size
            }
        }
    }
}

impl Codec for StatisticsCodec {
    fn current(&self) -> &FrameRecord {
        &self.current
    }

    fn advance(&mut self) {
        let nominal = self.next_nominal_bytes();
        let noisy = (self.add_noise)(nominal).max(0.0);
        let delay = 1.0 / self.fps;
        self.time_to_update = (self.time_to_update - delay).max(0.0);
        self.current = FrameRecord::zeroed(noisy.round() as usize, delay);
    }

    fn valid(&self) -> bool {
        true
    }

    fn target_rate(&self) -> f32 {
        self.target_rate_bps
    }

    fn set_target_rate(&mut self, new_rate_bps: f32) -> f32 {
        if new_rate_bps <= 0.0 {
            return self.target_rate_bps;
        }
        if self.time_to_update > 0.0 {
            tracing::trace!(
                requested = new_rate_bps,
                seconds_left = self.time_to_update,
                "rate update rejected, still in update interval"
            );
            return self.target_rate_bps;
        }

        let old = self.target_rate_bps;
        let ratio = (new_rate_bps - old).abs() / old;

        if ratio >= self.config.big_change_ratio {
            self.target_rate_bps = new_rate_bps;
            if self.config.transient_length > 0 {
                self.phase = Phase::Transient;
                self.remaining_burst_frames = self.config.transient_length;
            }
            tracing::debug!(old, new = new_rate_bps, ratio, "substantial rate change");
        } else if self.config.max_update_ratio > 0.0 && ratio > self.config.max_update_ratio {
            let clamped = if new_rate_bps > old {
                old * (1.0 + self.config.max_update_ratio)
            } else {
                old * (1.0 - self.config.max_update_ratio)
            };
            self.target_rate_bps = clamped;
            tracing::debug!(old, requested = new_rate_bps, adopted = clamped, "rate change clamped");
        } else {
            self.target_rate_bps = new_rate_bps;
        }

        self.time_to_update = self.config.update_interval;
        self.target_rate_bps
    }
}

/// The default noise model: a uniform multiplicative perturbation.
fn default_noise(mut rng: StdRng) -> NoiseFn {
    Box::new(move |size| {
        let ratio: f32 = rng.random_range(-RAND_UNIFORM_MAX_RATIO..=RAND_UNIFORM_MAX_RATIO);
        size * (1.0 + ratio)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Identity noise isolates the sizing model from the PRNG.
    fn make_noiseless(fps: f64) -> StatisticsCodec {
        StatisticsCodec::with_noise(fps, Box::new(|size| size))
    }

    /// Drain the post-construction update interval so the next
    /// `set_target_rate` is accepted.
    fn drain_update_interval(codec: &mut StatisticsCodec) {
        for _ in 0..20 {
            codec.advance();
        }
    }

    #[test]
    fn steady_frames_fit_rate() {
        let mut codec = make_noiseless(25.0);
        // The jump from the construction default is substantial; let the
        // resulting transient window pass before measuring steady state.
        codec.set_target_rate(500_000.0);
        drain_update_interval(&mut codec);
        for _ in 0..10 {
            codec.advance();
            assert_eq!(codec.current().size(), 2500);
            assert_eq!(codec.current().delay_seconds, 1.0 / 25.0);
        }
    }

    #[test]
    fn big_change_triggers_transient_with_i_frame() {
        let mut codec = make_noiseless(30.0);
        codec.set_target_rate(500_000.0);
        drain_update_interval(&mut codec);

        // ratio 1.0 >= 0.5 -> substantial
        assert_eq!(codec.set_target_rate(1_000_000.0), 1_000_000.0);
        let base = 1_000_000.0 / (8.0 * 30.0);

        codec.advance();
        let i_frame = codec.current().size() as f32;
        assert!((i_frame - 4.0 * base).abs() <= 1.0, "I-frame was {i_frame}");

        let mut total = i_frame;
        for _ in 0..9 {
            codec.advance();
            let size = codec.current().size() as f32;
            assert!(size >= 0.2 * base - 1.0);
            assert!(size < base);
            total += size;
        }
        // The whole window averages the steady size when no floor is hit.
        assert!((total / 10.0 - base).abs() <= 2.0, "mean was {}", total / 10.0);

        // Back to steady afterwards.
        codec.advance();
        assert!((codec.current().size() as f32 - base).abs() <= 1.0);
    }

    #[test]
    fn floored_transient_overshoots_mean() {
        // A huge I-frame over a short window forces the 0.2·base floor.
        let config = StatisticsConfig {
            i_frame_ratio: 8.0,
            transient_length: 5,
            ..StatisticsConfig::default()
        };
        let mut codec = StatisticsCodec::with_config(30.0, Box::new(|size| size), config);
        codec.set_target_rate(600_000.0);
        drain_update_interval(&mut codec);
        codec.set_target_rate(1_200_000.0);

        let base = 1_200_000.0 / (8.0 * 30.0);
        let mut total = 0.0;
        for _ in 0..5 {
            codec.advance();
            let size = codec.current().size() as f32;
            assert!(size >= 0.2 * base - 1.0);
            total += size;
        }
        // (8 - 5)/4 < 0.2, so the floor bites and the mean overshoots.
        assert!(total / 5.0 > base);
    }

    #[test]
    fn updates_rejected_inside_interval() {
        let mut codec = make_noiseless(30.0);
        codec.set_target_rate(500_000.0);
        drain_update_interval(&mut codec);

        assert_eq!(codec.set_target_rate(520_000.0), 520_000.0);
        // Only 1/30 s has passed of the 100 ms interval.
        codec.advance();
        assert_eq!(codec.set_target_rate(540_000.0), 520_000.0);
        // 4/30 s > 100 ms: accepted again.
        codec.advance();
        codec.advance();
        codec.advance();
        assert_eq!(codec.set_target_rate(540_000.0), 540_000.0);
    }

    #[test]
    fn moderate_change_is_clamped() {
        let mut codec = make_noiseless(30.0);
        codec.set_target_rate(500_000.0);
        drain_update_interval(&mut codec);

        // +20% is above the 10% cap but below the 50% transient threshold.
        assert_eq!(codec.set_target_rate(600_000.0), 550_000.0);
        drain_update_interval(&mut codec);
        // Downward likewise.
        assert_eq!(codec.set_target_rate(450_000.0), 495_000.0);
    }

    #[test]
    fn clamped_change_does_not_enter_transient() {
        let mut codec = make_noiseless(30.0);
        codec.set_target_rate(500_000.0);
        drain_update_interval(&mut codec);
        codec.set_target_rate(600_000.0);

        let base = 550_000.0 / (8.0 * 30.0);
        codec.advance();
        assert!((codec.current().size() as f32 - base).abs() <= 1.0);
    }

    #[test]
    fn rejects_non_positive_rate() {
        let mut codec = make_noiseless(30.0);
        codec.set_target_rate(500_000.0);
        assert_eq!(codec.set_target_rate(0.0), 500_000.0);
        assert_eq!(codec.set_target_rate(-10.0), 500_000.0);
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let mut a = StatisticsCodec::with_seed(30.0, 42);
        let mut b = StatisticsCodec::with_seed(30.0, 42);
        a.set_target_rate(500_000.0);
        b.set_target_rate(500_000.0);
        for _ in 0..50 {
            a.advance();
            b.advance();
            assert_eq!(a.current().size(), b.current().size());
        }
    }

    #[test]
    fn default_noise_stays_within_ratio() {
        let mut codec = StatisticsCodec::with_seed(30.0, 7);
        codec.set_target_rate(600_000.0);
        drain_update_interval(&mut codec);
        let base = 600_000.0 / (8.0 * 30.0);
        for _ in 0..100 {
            codec.advance();
            let size = codec.current().size() as f32;
            assert!(size >= base * (1.0 - RAND_UNIFORM_MAX_RATIO) - 1.0);
            assert!(size <= base * (1.0 + RAND_UNIFORM_MAX_RATIO) + 1.0);
        }
    }

    #[test]
    fn noise_clamped_at_zero() {
        let mut codec = StatisticsCodec::with_noise(30.0, Box::new(|_| -100.0));
        codec.set_target_rate(500_000.0);
        codec.advance();
        assert_eq!(codec.current().size(), 0);
    }
}
