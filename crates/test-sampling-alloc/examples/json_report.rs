use std::alloc::System;

use heapsample::SamplingAllocator;
use test_sampling_alloc::{churn, init_tracing};

#[global_allocator]
static GLOBAL: SamplingAllocator<System> = SamplingAllocator::new(System);

fn main() -> eyre::Result<()> {
    init_tracing();

    heapsample::set_sampling_interval(512);
    churn(10_000, 64);
    heapsample::set_sampling_interval(0);

    let mut report = heapsample::report();
    report.sampling_interval = 512;
    println!("{}", report.to_json_pretty()?);

    Ok(())
}
