//! Poisson allocation sampling for heap profiling.
//!
//! Recording every allocation is too expensive to leave on in production.
//! [`Sampler`] instead picks allocations so that, on average, one sample is
//! taken per `sampling_interval` allocated bytes, and tells you how many
//! bytes each sample stands for. Summing those weights gives an unbiased
//! estimate of the total allocated bytes.
//!
//! [`SamplingAllocator`] wires a sampler per thread into a global allocator,
//! [`SamplerConfig`] reads the interval from `HEAPSAMPLE_INTERVAL`, and
//! [`report`] summarizes what has been sampled.
//!
//! ## Setup
//!
//! ```rust,no_run
//! use std::alloc::System;
//! use heapsample::{SamplerConfig, SamplingAllocator};
//!
//! #[global_allocator]
//! static GLOBAL: SamplingAllocator<System> = SamplingAllocator::new(System);
//!
//! fn main() {
//!     SamplerConfig::from_env().apply();
//!     // ... run the workload ...
//!     println!("{}", heapsample::report());
//! }
//! ```

mod alloc;
mod config;
mod report;
mod sampler;

pub use alloc::{
    current_slot, reset_stats, sampling_interval, set_sample_hook, set_sampling_interval,
    SampleHook, SampledAllocation, SamplingAllocator, MAX_THREAD_SLOTS,
};
pub use config::{parse_byte_size, SamplerConfig, INTERVAL_ENV};
pub use report::{format_bytes, report, SamplingReport, ThreadReport};
pub use sampler::Sampler;
