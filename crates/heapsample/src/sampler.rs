//! Byte-interval allocation sampler.
//!
//! Allocated bytes are treated as a Poisson process: every byte has a
//! `1 / sampling_interval` chance of being a sample point, and an allocation
//! is sampled when it covers at least one such point. Instead of rolling the
//! dice per byte, the sampler draws the distance to the next sample point from
//! an exponential distribution and counts it down as allocations come in.
//!
//! See <https://perfetto.dev/docs/design-docs/heapprofd-sampling> for the
//! background of this scheme.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;

/// Countdown value used while sampling is off. Allocations practically never
/// bring it down to zero, so the fast path needs no separate "enabled" check.
const DISABLED_COUNTDOWN: i64 = i64::MAX;

/// Decides which allocations should be recorded and how much each one weighs.
///
/// A `Sampler` is meant to be owned by a single thread (or shard). It starts
/// out disabled; call [`Sampler::set_sampling_interval`] with a nonzero value
/// to turn it on.
///
/// # Examples
///
/// ```rust
/// use heapsample::Sampler;
///
/// let mut sampler = Sampler::new();
/// sampler.set_sampling_interval(100);
///
/// // Anything larger than the interval is always sampled at its own size.
/// assert!(sampler.should_sample(1_000_000));
/// assert_eq!(sampler.sample_size(1_000_000), 1_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct Sampler<R = SmallRng> {
    /// Average number of bytes between samples, 0 means off.
    sampling_interval: u64,
    /// `1 / sampling_interval`, the rate of the exponential distribution.
    sampling_rate: f64,
    /// Bytes left until the next sample.
    countdown: i64,
    rng: R,
}

impl Sampler {
    /// Creates a disabled sampler whose generator is seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> Sampler<R> {
    /// Creates a disabled sampler drawing from the given generator.
    pub fn with_rng(rng: R) -> Self {
        Self {
            sampling_interval: 0,
            sampling_rate: 0.0,
            countdown: DISABLED_COUNTDOWN,
            rng,
        }
    }

    /// Sets the sampling interval in bytes. Setting it to 0 turns sampling off.
    ///
    /// The countdown to the next sample is restarted either way.
    pub fn set_sampling_interval(&mut self, sampling_interval: u64) {
        self.sampling_interval = sampling_interval;
        if sampling_interval == 0 {
            self.countdown = DISABLED_COUNTDOWN;
            return;
        }
        self.sampling_rate = 1.0 / sampling_interval as f64;
        self.countdown = self.next_interval();
    }

    /// Returns true if an allocation of `alloc_size` bytes should be sampled.
    #[inline]
    pub fn should_sample(&mut self, alloc_size: usize) -> bool {
        // Decrement first and only look at whether sampling is on after the
        // countdown ran out. With sampling off the countdown sits at
        // `i64::MAX`, so that check is almost never reached.
        self.countdown = self.countdown.saturating_sub(clamp_size(alloc_size));
        if self.countdown > 0 {
            return false;
        }
        self.replenish(alloc_size);
        self.sampling_interval != 0
    }

    /// Current sampling interval in bytes, 0 when sampling is off.
    #[inline]
    pub fn sampling_interval(&self) -> u64 {
        self.sampling_interval
    }

    /// Whether a nonzero sampling interval is set.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.sampling_interval != 0
    }

    /// How many bytes a sampled allocation of `alloc_size` bytes accounts for.
    ///
    /// Allocations smaller than the interval are sampled with probability
    /// `alloc_size / sampling_interval`, so each such sample stands for a
    /// whole interval. Larger allocations are always sampled and count as
    /// themselves.
    #[inline]
    pub fn sample_size(&self, alloc_size: usize) -> u64 {
        (alloc_size as u64).max(self.sampling_interval)
    }

    /// Restores a positive countdown after `alloc_size` ran it down to zero
    /// or below.
    #[cold]
    fn replenish(&mut self, alloc_size: usize) {
        if self.sampling_interval == 0 {
            // Sampling is off and we somehow burned through `i64::MAX` bytes.
            self.countdown = DISABLED_COUNTDOWN;
        } else if alloc_size as u64 > self.sampling_interval {
            // Big allocations are taken as a whole. Drawing until the
            // countdown turns positive again could take many iterations, so
            // the size is just added back.
            self.countdown = self.countdown.saturating_add(clamp_size(alloc_size));
        } else {
            while self.countdown <= 0 {
                let next = self.next_interval();
                self.countdown = self.countdown.saturating_add(next);
            }
        }
    }

    /// Draws the distance in bytes to the next sample point.
    fn next_interval(&mut self) -> i64 {
        let draw: f64 = self.rng.sample(Exp1);
        // The exponential draw approximates a geometric distribution. Its
        // integer part is the number of bytes skipped before the next sample;
        // the +1 counts the sampled byte itself, so the gap is never zero.
        ((draw / self.sampling_rate) as i64).saturating_add(1)
    }

    #[cfg(test)]
    pub(crate) fn countdown(&self) -> i64 {
        self.countdown
    }
}

#[inline]
fn clamp_size(alloc_size: usize) -> i64 {
    i64::try_from(alloc_size).unwrap_or(i64::MAX)
}
