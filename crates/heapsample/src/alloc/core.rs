use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::sampler::Sampler;

/// Number of per-thread statistics slots. Threads beyond this share slots.
pub const MAX_THREAD_SLOTS: usize = 256;

/// Per-thread sampling statistics (lock-free)
pub struct ThreadSampleStats {
    pub samples: AtomicU64,
    /// Sum of sample weights, i.e. the estimated number of allocated bytes.
    pub sampled_bytes: AtomicU64,
    /// Sum of the requested sizes of sampled allocations.
    pub requested_bytes: AtomicU64,
}

impl Default for ThreadSampleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadSampleStats {
    pub const fn new() -> Self {
        Self {
            samples: AtomicU64::new(0),
            sampled_bytes: AtomicU64::new(0),
            requested_bytes: AtomicU64::new(0),
        }
    }

    fn reset(&self) {
        self.samples.store(0, Ordering::Relaxed);
        self.sampled_bytes.store(0, Ordering::Relaxed);
        self.requested_bytes.store(0, Ordering::Relaxed);
    }
}

#[allow(clippy::declare_interior_mutable_const)]
static THREAD_SAMPLE_STATS: [ThreadSampleStats; MAX_THREAD_SLOTS] = {
    const INIT: ThreadSampleStats = ThreadSampleStats::new();
    [INIT; MAX_THREAD_SLOTS]
};

static SAMPLING_INTERVAL: AtomicU64 = AtomicU64::new(0);
/// Bumped on every interval change so thread samplers know to pick it up.
static INTERVAL_GENERATION: AtomicU64 = AtomicU64::new(0);
static NEXT_SLOT: AtomicUsize = AtomicUsize::new(0);

/// A sampler owned by one thread, plus the bookkeeping tying it to the
/// process-wide settings.
struct ThreadSampler {
    sampler: Sampler,
    generation: u64,
    slot: usize,
}

impl ThreadSampler {
    fn new() -> Self {
        let slot = NEXT_SLOT.fetch_add(1, Ordering::Relaxed) % MAX_THREAD_SLOTS;
        // Panicking inside the allocator aborts the process, so fall back to
        // a clock-based seed if the OS has no entropy to give.
        let rng = SmallRng::try_from_os_rng().unwrap_or_else(|_| {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_nanos() as u64)
                .unwrap_or_default();
            SmallRng::seed_from_u64(nanos ^ slot as u64)
        });

        let generation = INTERVAL_GENERATION.load(Ordering::Acquire);
        let mut sampler = Sampler::with_rng(rng);
        sampler.set_sampling_interval(SAMPLING_INTERVAL.load(Ordering::Relaxed));

        Self {
            sampler,
            generation,
            slot,
        }
    }

    #[inline]
    fn sync_interval(&mut self) {
        let generation = INTERVAL_GENERATION.load(Ordering::Acquire);
        if generation != self.generation {
            self.generation = generation;
            self.sampler
                .set_sampling_interval(SAMPLING_INTERVAL.load(Ordering::Relaxed));
        }
    }
}

thread_local! {
    // `None` until the thread's first allocation. While borrowed, allocations
    // on this thread pass through unsampled.
    static THREAD_SAMPLER: RefCell<Option<ThreadSampler>> = const { RefCell::new(None) };
}

/// Outcome of a positive sampling decision, carried across the inner
/// allocation call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Decision {
    pub weight: u64,
    pub slot: usize,
}

/// Sets the interval used by every thread's sampler.
pub(crate) fn store_sampling_interval(interval: u64) {
    SAMPLING_INTERVAL.store(interval, Ordering::Relaxed);
    INTERVAL_GENERATION.fetch_add(1, Ordering::Release);
}

pub(crate) fn load_sampling_interval() -> u64 {
    SAMPLING_INTERVAL.load(Ordering::Relaxed)
}

/// Called by the allocator before delegating an allocation of `size` bytes.
#[inline]
pub(crate) fn decide(size: usize) -> Option<Decision> {
    THREAD_SAMPLER
        .try_with(|cell| {
            let Ok(mut state) = cell.try_borrow_mut() else {
                return None;
            };
            let state = state.get_or_insert_with(ThreadSampler::new);
            state.sync_interval();

            if !state.sampler.should_sample(size) {
                return None;
            }

            Some(Decision {
                weight: state.sampler.sample_size(size),
                slot: state.slot,
            })
        })
        .ok()
        .flatten()
}

/// Called by the allocator once a sampled allocation succeeded.
pub(crate) fn record(address: usize, size: usize, decision: Decision) {
    let slot = &THREAD_SAMPLE_STATS[decision.slot];
    slot.samples.fetch_add(1, Ordering::Relaxed);
    slot.sampled_bytes.fetch_add(decision.weight, Ordering::Relaxed);
    slot.requested_bytes.fetch_add(size as u64, Ordering::Relaxed);

    let Some(hook) = super::hook::sample_hook() else {
        return;
    };

    let sample = super::hook::SampledAllocation {
        address,
        size,
        weight: decision.weight,
        slot: decision.slot,
    };

    // Hold the thread's sampler while the hook runs so whatever the hook
    // allocates is not sampled itself.
    let _ = THREAD_SAMPLER.try_with(|cell| {
        if let Ok(_busy) = cell.try_borrow_mut() {
            hook(&sample);
        }
    });
}

/// Reads `(samples, sampled_bytes, requested_bytes)` for a slot.
pub(crate) fn slot_stats(slot: usize) -> (u64, u64, u64) {
    let stats = &THREAD_SAMPLE_STATS[slot];
    (
        stats.samples.load(Ordering::Relaxed),
        stats.sampled_bytes.load(Ordering::Relaxed),
        stats.requested_bytes.load(Ordering::Relaxed),
    )
}

pub(crate) fn reset_slots() {
    for slot in &THREAD_SAMPLE_STATS {
        slot.reset();
    }
}

/// Slot assigned to the current thread, if it has allocated through the
/// sampling allocator yet.
pub(crate) fn current_slot() -> Option<usize> {
    THREAD_SAMPLER
        .try_with(|cell| {
            cell.try_borrow()
                .ok()
                .and_then(|state| state.as_ref().map(|state| state.slot))
        })
        .ok()
        .flatten()
}
