//! The codec contract and every codec variant.

pub mod perfect;
pub mod scaling;
pub mod shaped;
pub mod simple;
pub mod statistics;
pub mod trace_based;

/// Target bitrate every codec starts with, in bits per second.
///
/// 150 kbps is the customary starting rate of RMCAT evaluation scenarios;
/// it keeps the `target_rate > 0` invariant holding from construction.
/// Callers set their own rate before measuring anything.
pub const DEFAULT_TARGET_RATE_BPS: f32 = 150_000.0;

/// One unit of codec output: an opaque payload plus the time the consumer
/// should wait before requesting the next record.
///
/// The payload bytes are zeroed; only `payload.len()` carries meaning.
/// A vector (rather than a bare length) is kept so that composed codecs
/// such as [`ShapedPacketizer`](crate::ShapedPacketizer) can buffer and
/// slice real byte ranges, and future variants can stash data in the
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Frame or packet contents. Length is the semantic frame size.
    pub payload: Vec<u8>,
    /// Seconds to wait before the next `advance()`.
    pub delay_seconds: f64,
}

impl FrameRecord {
    /// A record of `size` zero bytes with the given inter-frame delay.
    pub fn zeroed(size: usize, delay_seconds: f64) -> Self {
        Self {
            payload: vec![0; size],
            delay_seconds,
        }
    }

    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}

/// The pull-based contract every synthetic codec implements.
///
/// Congestion controllers drive a codec through this trait alone:
///
/// 1. Construct a concrete codec. A freshly built codec already points at
///    its first frame (when valid).
/// 2. Read the current record via [`current`](Codec::current); it is stable
///    until the next [`advance`](Codec::advance).
/// 3. Wait `current().delay_seconds` (wall-clock in a testbed, virtual
///    time in a simulator); the codec never sleeps on its own.
/// 4. Call [`advance`](Codec::advance) for the next record.
/// 5. Steer the codec at any time with
///    [`set_target_rate`](Codec::set_target_rate) and observe the rate it
///    actually adopted from the return value.
///
/// A codec that failed construction (e.g. an unusable trace directory) or
/// ran past its last producible frame reports `valid() == false`; calling
/// anything but [`valid`](Codec::valid) on an invalid codec is outside the
/// contract (implementations return safe defaults rather than panic).
///
/// Instances are strictly single-threaded: no internal synchronization,
/// callers serialize access per instance. Distinct instances are
/// independent. Heterogeneous collections and composition go through
/// `Box<dyn Codec>`.
pub trait Codec: Send {
    /// The current frame record. Stable between advances.
    fn current(&self) -> &FrameRecord;

    /// Produce the next frame record.
    ///
    /// May flip validity as a side effect; an invalid codec stays put.
    fn advance(&mut self);

    /// True iff `current()` and the next `advance()` are both well-defined.
    fn valid(&self) -> bool;

    /// Current target bitrate in bits per second.
    fn target_rate(&self) -> f32;

    /// Ask the codec to adopt a new target bitrate (bits per second).
    ///
    /// Returns the rate actually adopted, which may differ when the variant
    /// throttles or clamps changes. Non-positive requests are rejected and
    /// leave the current rate untouched. Re-applying the active rate is
    /// idempotent.
    fn set_target_rate(&mut self, new_rate_bps: f32) -> f32;
}
