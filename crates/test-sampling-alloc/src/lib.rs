//! Shared helpers for the sampling allocator examples.

use std::hint::black_box;

/// Interval used by the examples when `HEAPSAMPLE_INTERVAL` is not set.
pub const DEFAULT_INTERVAL: u64 = 4096;

/// Logs to stderr so stdout stays parseable. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Allocates and frees `count` zeroed buffers of `size` bytes. Returns the
/// number of bytes requested.
pub fn churn(count: usize, size: usize) -> u64 {
    for _ in 0..count {
        let buffer = vec![0u8; size];
        black_box(&buffer);
    }
    (count * size) as u64
}
