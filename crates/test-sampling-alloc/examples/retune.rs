use std::alloc::System;
use std::thread;

use heapsample::SamplingAllocator;
use test_sampling_alloc::{churn, init_tracing};

#[global_allocator]
static GLOBAL: SamplingAllocator<System> = SamplingAllocator::new(System);

fn churn_on_threads(threads: usize) {
    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| churn(20_000, 128));
        }
    });
}

fn main() -> eyre::Result<()> {
    init_tracing();

    heapsample::set_sampling_interval(1024);
    churn_on_threads(4);
    let enabled = heapsample::report();
    println!("enabled_samples={}", enabled.samples);
    println!("enabled_threads={}", enabled.threads.len());

    heapsample::set_sampling_interval(0);
    heapsample::reset_stats();
    churn_on_threads(4);
    churn(10, 1 << 20);
    let disabled = heapsample::report();
    println!("disabled_samples={}", disabled.samples);

    heapsample::set_sampling_interval(1024);
    churn(20_000, 128);
    heapsample::set_sampling_interval(0);
    let reenabled = heapsample::report();
    println!("reenabled_samples={}", reenabled.samples);

    Ok(())
}
