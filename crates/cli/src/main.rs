use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use syncodec::{
    Codec, PerfectCodec, ShapedPacketizer, SimpleFpsCodec, StatisticsCodec, TraceBasedCodec,
    TraceBasedCodecWithScaling,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodecKind {
    /// Constant-size packets at a constant cadence
    Perfect,
    /// One frame per 1/fps, sized to the target rate
    Simple,
    /// Statistical steady/transient model
    Statistics,
    /// Pre-encoded trace replay
    Trace,
    /// Trace replay with scaling and interpolation
    TraceScaling,
}

#[derive(Parser)]
#[command(
    name = "syncodec",
    about = "Replay a synthetic codec and print its frame records"
)]
struct Args {
    /// Codec variant to replay
    #[arg(value_enum)]
    codec: CodecKind,

    /// Frames per second for fps-based codecs
    #[arg(long, default_value_t = 25.0)]
    fps: f64,

    /// Initial target bitrate in kbps
    #[arg(long, default_value_t = 500)]
    rate: u32,

    /// Number of frame records to replay
    #[arg(long, default_value_t = 100)]
    frames: u32,

    /// Wrap the codec in a shaped packetizer with this max payload (bytes)
    #[arg(long)]
    mtu: Option<usize>,

    /// Per-packet wire overhead for the packetizer (bytes)
    #[arg(long, default_value_t = 0)]
    overhead: usize,

    /// Directory containing trace files (trace codecs only)
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Common file prefix of the trace files (trace codecs only)
    #[arg(long)]
    prefix: Option<String>,

    /// Start trace codecs in fixed resolution mode
    #[arg(long)]
    fixed: bool,

    /// Noise seed for the statistics codec (reproducible runs)
    #[arg(long)]
    seed: Option<u64>,

    /// Factor applied to inter-frame delays when sleeping; 0 disables
    /// sleeping, 100 replays in 100x slow motion
    #[arg(long, default_value_t = 1.0)]
    slowdown: f64,
}

fn build_codec(args: &Args) -> Result<Box<dyn Codec>, String> {
    let codec: Box<dyn Codec> = match args.codec {
        CodecKind::Perfect => Box::new(PerfectCodec::new(args.mtu.unwrap_or(1000))),
        CodecKind::Simple => Box::new(SimpleFpsCodec::new(args.fps)),
        CodecKind::Statistics => match args.seed {
            Some(seed) => Box::new(StatisticsCodec::with_seed(args.fps, seed)),
            None => Box::new(StatisticsCodec::new(args.fps)),
        },
        CodecKind::Trace | CodecKind::TraceScaling => {
            let (Some(dir), Some(prefix)) = (&args.trace_dir, &args.prefix) else {
                return Err("trace codecs need --trace-dir and --prefix".to_string());
            };
            match args.codec {
                CodecKind::Trace => {
                    Box::new(TraceBasedCodec::with_options(dir, prefix, args.fps, args.fixed))
                }
                _ => Box::new(TraceBasedCodecWithScaling::with_options(
                    dir, prefix, args.fps, args.fixed,
                )),
            }
        }
    };
    if !codec.valid() {
        return Err("codec failed to initialize (unusable trace data?)".to_string());
    }
    Ok(codec)
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let mut codec = match build_codec(&args) {
        Ok(codec) => codec,
        Err(e) => {
            eprintln!("Failed to build codec: {e}");
            std::process::exit(1);
        }
    };

    // The packetizer composes over any of the variants.
    if let Some(mtu) = args.mtu {
        if !matches!(args.codec, CodecKind::Perfect) {
            codec = Box::new(ShapedPacketizer::with_overhead(codec, mtu, args.overhead));
        }
    }

    let adopted = codec.set_target_rate(args.rate as f32 * 1000.0);
    println!(
        "replaying {} frames at {} kbps (adopted {:.0} kbps)",
        args.frames,
        args.rate,
        adopted / 1000.0
    );

    for n in 0..args.frames {
        let record = codec.current();
        println!(
            "frame #{n}: {} bytes, next in {:.2} ms",
            record.size(),
            record.delay_seconds * 1000.0
        );
        if args.slowdown > 0.0 {
            thread::sleep(Duration::from_secs_f64(record.delay_seconds * args.slowdown));
        }
        codec.advance();
    }
}
