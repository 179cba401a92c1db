use crate::codec::{Codec, FrameRecord, DEFAULT_TARGET_RATE_BPS};

/// A packetizer that wraps any codec and shapes its output.
///
/// The packetizer owns an inner codec, pulls whole frames from it, and
/// re-emits them as fragments no larger than `max_payload` bytes. Rather
/// than bursting all fragments of a frame at once, it spreads them evenly
/// across the inner codec's inter-frame delay: a 3500-byte inner frame due
/// 40 ms before the next one, with a 1000-byte maximum payload, comes out
/// as four fragments of 1000/1000/1000/500 bytes at 10 ms intervals.
///
/// A per-packet overhead (IP+UDP+RTP headers and the like) can be
/// configured; the packetizer then throttles the inner codec's target rate
/// by the wire-to-payload ratio of the previous frame's fragmentation, so
/// the rate set on the packetizer approximates what actually hits the
/// network. Leave it at 0 if wire overhead is not a concern.
///
/// The best inner codecs are the ones that emit whole frames
/// ([`SimpleFpsCodec`](crate::SimpleFpsCodec),
/// [`TraceBasedCodec`](crate::TraceBasedCodec), and so on); wrapping
/// something that already respects an MTU achieves nothing.
pub struct ShapedPacketizer {
    inner: Box<dyn Codec>,
    max_payload: usize,
    overhead: usize,
    target_rate_bps: f32,
    /// Bytes of the current inner frame not yet emitted.
    bytes_to_send: Vec<u8>,
    /// The inner codec's inter-frame delay being spread over fragments.
    seconds_to_next_inner: f64,
    /// Fragment count of the current inner frame (delay divisor).
    slots: usize,
    /// Wire/payload ratio of the previous inner frame's fragmentation.
    last_overhead_factor: f64,
    current: FrameRecord,
}

impl ShapedPacketizer {
    /// Wrap `inner`, emitting fragments of at most `max_payload` bytes.
    pub fn new(inner: Box<dyn Codec>, max_payload: usize) -> Self {
        Self::with_overhead(inner, max_payload, 0)
    }

    /// Wrap `inner` and account `overhead` extra wire bytes per fragment
    /// when back-pressuring the inner codec's target rate.
    pub fn with_overhead(inner: Box<dyn Codec>, max_payload: usize, overhead: usize) -> Self {
        let mut packetizer = Self {
            inner,
            max_payload: max_payload.max(1),
            overhead,
            target_rate_bps: DEFAULT_TARGET_RATE_BPS,
            bytes_to_send: Vec::new(),
            seconds_to_next_inner: 0.0,
            slots: 1,
            last_overhead_factor: 1.0,
            current: FrameRecord::zeroed(0, 0.0),
        };
        if packetizer.inner.valid() {
            packetizer.advance();
        }
        packetizer
    }

    /// Pull the next frame out of the inner codec, refreshing the fragment
    /// buffer and the overhead estimate.
    fn pull_inner_frame(&mut self) {
        // Compensate for the previous frame's per-packet overhead so the
        // wire rate tracks our own target.
        let adjusted = self.target_rate_bps / self.last_overhead_factor as f32;
        self.inner.set_target_rate(adjusted);
        self.inner.advance();
        if !self.inner.valid() {
            return;
        }

        let frame = self.inner.current();
        self.bytes_to_send = frame.payload.clone();
        self.seconds_to_next_inner = frame.delay_seconds;

        let len = self.bytes_to_send.len();
        self.slots = usize::max(1, len.div_ceil(self.max_payload));
        self.last_overhead_factor = if len == 0 {
            1.0
        } else {
            1.0 + (self.slots * self.overhead) as f64 / len as f64
        };
        tracing::trace!(
            frame_bytes = len,
            fragments = self.slots,
            overhead_factor = self.last_overhead_factor,
            "inner frame pulled"
        );
    }
}

impl Codec for ShapedPacketizer {
    fn current(&self) -> &FrameRecord {
        &self.current
    }

    fn advance(&mut self) {
        if self.bytes_to_send.is_empty() {
            self.pull_inner_frame();
            if !self.inner.valid() {
                return;
            }
        }
        let take = usize::min(self.max_payload, self.bytes_to_send.len());
        self.bytes_to_send.drain(..take);
        self.current = FrameRecord::zeroed(take, self.seconds_to_next_inner / self.slots as f64);
    }

    fn valid(&self) -> bool {
        self.inner.valid()
    }

    fn target_rate(&self) -> f32 {
        self.target_rate_bps
    }

    fn set_target_rate(&mut self, new_rate_bps: f32) -> f32 {
        if new_rate_bps > 0.0 {
            // Adopted now, pushed to the inner codec at the next pull.
            self.target_rate_bps = new_rate_bps;
        }
        self.target_rate_bps
    }
}
