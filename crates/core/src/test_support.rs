//! Helpers for tests that need trace files on disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

static DIR_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Create a unique empty directory under the system temp dir.
pub fn unique_trace_dir(tag: &str) -> PathBuf {
    let n = DIR_COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir().join(format!("syncodec-{tag}-{}-{n}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Write `<prefix>_<label>_<bitrate>.txt` with the given frame sizes, one
/// per line with a dummy frame-type column.
pub fn write_trace(dir: &Path, prefix: &str, label: &str, bitrate: u32, sizes: &[u64]) {
    let mut body = String::new();
    for (i, size) in sizes.iter().enumerate() {
        let frame_type = if i == 0 { 'I' } else { 'P' };
        body.push_str(&format!("{size} {frame_type}\n"));
    }
    std::fs::write(dir.join(format!("{prefix}_{label}_{bitrate}.txt")), body).unwrap();
}

/// A catalog-sized constant frame sequence: `count` frames of `size` bytes.
pub fn flat_sizes(size: u64, count: usize) -> Vec<u64> {
    vec![size; count]
}
