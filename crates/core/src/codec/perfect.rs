use crate::codec::{Codec, FrameRecord, DEFAULT_TARGET_RATE_BPS};

/// The smoothest synthetic codec: constant-size packets at a constant
/// cadence.
///
/// Every record carries exactly `max_payload` bytes, and the inter-packet
/// delay is whatever makes the sequence fit the target bitrate:
/// `delay = max_payload · 8 / target_rate`. As long as the target rate is
/// stable the output has no bursts and no noise, hence "perfect".
#[derive(Debug)]
pub struct PerfectCodec {
    max_payload: usize,
    target_rate_bps: f32,
    current: FrameRecord,
}

impl PerfectCodec {
    /// `max_payload` is the fixed packet size in bytes.
    pub fn new(max_payload: usize) -> Self {
        let mut codec = Self {
            max_payload,
            target_rate_bps: DEFAULT_TARGET_RATE_BPS,
            current: FrameRecord::zeroed(0, 0.0),
        };
        codec.current = codec.make_record();
        codec
    }

    fn make_record(&self) -> FrameRecord {
        let delay = self.max_payload as f64 * 8.0 / f64::from(self.target_rate_bps);
        FrameRecord::zeroed(self.max_payload, delay)
    }
}

impl Codec for PerfectCodec {
    fn current(&self) -> &FrameRecord {
        &self.current
    }

    fn advance(&mut self) {
        self.current = self.make_record();
    }

    fn valid(&self) -> bool {
        true
    }

    fn target_rate(&self) -> f32 {
        self.target_rate_bps
    }

    fn set_target_rate(&mut self, new_rate_bps: f32) -> f32 {
        if new_rate_bps > 0.0 {
            self.target_rate_bps = new_rate_bps;
        }
        self.target_rate_bps
    }
}
