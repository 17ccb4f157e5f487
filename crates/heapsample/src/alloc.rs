//! Global allocator integration.
//!
//! [`SamplingAllocator`] keeps one [`crate::Sampler`] per thread and adds up
//! what gets sampled in a fixed table of per-thread slots, so nothing on the
//! allocation path allocates or takes a lock.

pub(crate) mod allocator;
pub(crate) mod core;
pub(crate) mod hook;

pub use self::allocator::SamplingAllocator;
pub use self::core::MAX_THREAD_SLOTS;
pub use self::hook::{set_sample_hook, SampleHook, SampledAllocation};

/// Sets the sampling interval in bytes for every thread using
/// [`SamplingAllocator`]. 0 turns sampling off.
///
/// Threads pick up the new interval on their next allocation.
pub fn set_sampling_interval(interval: u64) {
    let previous = self::core::load_sampling_interval();
    self::core::store_sampling_interval(interval);

    if interval == 0 {
        tracing::debug!(previous, "allocation sampling disabled");
    } else {
        tracing::debug!(previous, interval, "allocation sampling interval set");
    }
}

/// Process-wide sampling interval in bytes, 0 when sampling is off.
pub fn sampling_interval() -> u64 {
    self::core::load_sampling_interval()
}

/// Clears the statistics collected so far. The interval is left untouched.
pub fn reset_stats() {
    self::core::reset_slots();
}

/// Statistics slot of the calling thread, once it has allocated through
/// [`SamplingAllocator`].
pub fn current_slot() -> Option<usize> {
    self::core::current_slot()
}

#[cfg(test)]
mod tests {
    use std::alloc::{GlobalAlloc, Layout, System};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    // The interval and the slot table are process-wide.
    static GLOBAL_STATE: Mutex<()> = Mutex::new(());

    static HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn count_hook(sample: &SampledAllocation) {
        assert!(sample.address != 0);
        assert!(sample.weight >= sample.size as u64);
        HOOK_CALLS.fetch_add(1, Ordering::Relaxed);
    }

    fn allocate(allocator: &SamplingAllocator<System>, size: usize, count: usize) {
        let layout = Layout::from_size_align(size, 8).unwrap();
        for _ in 0..count {
            unsafe {
                let ptr = allocator.alloc(layout);
                assert!(!ptr.is_null());
                allocator.dealloc(ptr, layout);
            }
        }
    }

    fn slot_samples(slot: usize) -> u64 {
        super::core::slot_stats(slot).0
    }

    #[test]
    fn disabled_allocator_records_nothing() {
        let _guard = GLOBAL_STATE.lock().unwrap();
        let allocator = SamplingAllocator::new(System);

        set_sampling_interval(0);
        reset_stats();
        allocate(&allocator, 1 << 20, 100);

        let slot = current_slot().expect("slot assigned on first allocation");
        assert_eq!(slot_samples(slot), 0);
        assert_eq!(sampling_interval(), 0);
    }

    #[test]
    fn oversized_allocations_are_always_recorded() {
        let _guard = GLOBAL_STATE.lock().unwrap();
        let allocator = SamplingAllocator::new(System);

        set_sampling_interval(64);
        reset_stats();
        allocate(&allocator, 1 << 20, 10);

        let slot = current_slot().unwrap();
        let (samples, sampled_bytes, requested_bytes) = super::core::slot_stats(slot);
        assert_eq!(samples, 10);
        assert_eq!(sampled_bytes, 10 << 20);
        assert_eq!(requested_bytes, 10 << 20);

        set_sampling_interval(0);
    }

    #[test]
    fn retuning_applies_to_running_threads() {
        let _guard = GLOBAL_STATE.lock().unwrap();
        let allocator = SamplingAllocator::new(System);

        set_sampling_interval(128);
        reset_stats();
        allocate(&allocator, 64, 10_000);
        let slot = current_slot().unwrap();
        assert!(slot_samples(slot) > 0);

        set_sampling_interval(0);
        reset_stats();
        allocate(&allocator, 64, 10_000);
        allocate(&allocator, 1 << 20, 10);
        assert_eq!(slot_samples(slot), 0);
    }

    #[test]
    fn hook_sees_sampled_allocations() {
        let _guard = GLOBAL_STATE.lock().unwrap();
        let allocator = SamplingAllocator::new(System);

        assert!(set_sample_hook(count_hook).is_ok());
        assert!(set_sample_hook(count_hook).is_err());

        set_sampling_interval(16);
        reset_stats();
        HOOK_CALLS.store(0, Ordering::Relaxed);
        allocate(&allocator, 4096, 50);

        let slot = current_slot().unwrap();
        assert_eq!(HOOK_CALLS.load(Ordering::Relaxed), 50);
        assert_eq!(slot_samples(slot), 50);

        set_sampling_interval(0);
    }

    #[test]
    fn realloc_samples_the_new_size() {
        let _guard = GLOBAL_STATE.lock().unwrap();
        let allocator = SamplingAllocator::new(System);

        set_sampling_interval(32);
        reset_stats();
        let layout = Layout::from_size_align(8, 8).unwrap();
        unsafe {
            let ptr = allocator.alloc(layout);
            let slot = current_slot().unwrap();
            let before = super::core::slot_stats(slot);

            let grown = allocator.realloc(ptr, layout, 1 << 16);
            assert!(!grown.is_null());
            let after = super::core::slot_stats(slot);
            assert_eq!(after.0, before.0 + 1);
            assert_eq!(after.1, before.1 + (1 << 16));

            allocator.dealloc(grown, Layout::from_size_align(1 << 16, 8).unwrap());
        }

        set_sampling_interval(0);
    }
}
