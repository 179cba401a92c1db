use crate::codec::{Codec, FrameRecord, DEFAULT_TARGET_RATE_BPS};

/// Default frame rate for fps-based codecs.
pub const DEFAULT_FPS: f64 = 25.0;

/// A fixed-cadence codec: one frame every `1/fps` seconds, sized to fit
/// the target bitrate.
///
/// Frames come out at `target_rate / (8 · fps)` bytes. Note these are whole
/// raw frames, possibly far larger than a network MTU; wrap the codec in a
/// [`ShapedPacketizer`](crate::ShapedPacketizer) before shipping its output
/// as packets.
#[derive(Debug)]
pub struct SimpleFpsCodec {
    fps: f64,
    target_rate_bps: f32,
    current: FrameRecord,
}

impl SimpleFpsCodec {
    pub fn new(fps: f64) -> Self {
        let mut codec = Self {
            fps,
            target_rate_bps: DEFAULT_TARGET_RATE_BPS,
            current: FrameRecord::zeroed(0, 0.0),
        };
        codec.current = codec.make_record();
        codec
    }

    fn make_record(&self) -> FrameRecord {
        let bytes = (f64::from(self.target_rate_bps) / (8.0 * self.fps)).round();
        FrameRecord::zeroed(bytes.max(0.0) as usize, 1.0 / self.fps)
    }
}

impl Default for SimpleFpsCodec {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

impl Codec for SimpleFpsCodec {
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
