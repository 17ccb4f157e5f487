use std::alloc::System;
use std::sync::atomic::{AtomicU64, Ordering};

use heapsample::{SampledAllocation, SamplingAllocator};
use test_sampling_alloc::{churn, init_tracing};

#[global_allocator]
static GLOBAL: SamplingAllocator<System> = SamplingAllocator::new(System);

static HOOK_CALLS: AtomicU64 = AtomicU64::new(0);
static HOOK_WEIGHT: AtomicU64 = AtomicU64::new(0);

fn on_sample(sample: &SampledAllocation) {
    HOOK_CALLS.fetch_add(1, Ordering::Relaxed);
    HOOK_WEIGHT.fetch_add(sample.weight, Ordering::Relaxed);
    // Allocating here must not recurse into the sampler.
    let scratch = format!("{:#x}", sample.address);
    std::hint::black_box(scratch);
}

fn main() -> eyre::Result<()> {
    init_tracing();

    if heapsample::set_sample_hook(on_sample).is_err() {
        eyre::bail!("sample hook already installed");
    }

    heapsample::set_sampling_interval(2048);
    churn(50_000, 100);
    heapsample::set_sampling_interval(0);

    let calls = HOOK_CALLS.load(Ordering::Relaxed);
    let weight = HOOK_WEIGHT.load(Ordering::Relaxed);
    let report = heapsample::report();

    println!("hook_calls={calls}");
    println!("report_samples={}", report.samples);
    println!("hook_weight={weight}");
    println!("report_estimated_bytes={}", report.estimated_bytes);

    Ok(())
}
