use std::alloc::System;

use heapsample::{SamplerConfig, SamplingAllocator, INTERVAL_ENV};
use test_sampling_alloc::{churn, init_tracing, DEFAULT_INTERVAL};

#[global_allocator]
static GLOBAL: SamplingAllocator<System> = SamplingAllocator::new(System);

fn main() -> eyre::Result<()> {
    init_tracing();

    let mut config = SamplerConfig::from_env();
    if std::env::var_os(INTERVAL_ENV).is_none() {
        config = config.with_sampling_interval(DEFAULT_INTERVAL);
    }
    config.apply();

    let mut workload_bytes = churn(200_000, 256);
    workload_bytes += churn(100, 64 * 1024);

    // Freeze the numbers before printing allocates anything else.
    heapsample::set_sampling_interval(0);
    let mut report = heapsample::report();
    report.sampling_interval = config.sampling_interval;

    tracing::info!(samples = report.samples, "workload finished");

    println!("{report}");
    println!("workload_bytes={workload_bytes}");
    println!("estimated_bytes={}", report.estimated_bytes);

    Ok(())
}
