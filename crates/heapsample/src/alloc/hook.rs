use std::sync::OnceLock;

/// A sampled allocation, as handed to the sample hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledAllocation {
    /// Address returned by the inner allocator.
    pub address: usize,
    /// Requested size in bytes.
    pub size: usize,
    /// Bytes this sample accounts for, see [`crate::Sampler::sample_size`].
    pub weight: u64,
    /// Statistics slot of the allocating thread.
    pub slot: usize,
}

/// Callback invoked for every sampled allocation.
///
/// Runs on the allocating thread, inside the allocator. Allocations made by
/// the hook itself are not sampled, but it should still stay short.
pub type SampleHook = fn(&SampledAllocation);

static SAMPLE_HOOK: OnceLock<SampleHook> = OnceLock::new();

/// Installs the sample hook. It can only be set once; on later calls the
/// rejected hook is handed back.
pub fn set_sample_hook(hook: SampleHook) -> Result<(), SampleHook> {
    SAMPLE_HOOK.set(hook)
}

#[inline]
pub(crate) fn sample_hook() -> Option<SampleHook> {
    SAMPLE_HOOK.get().copied()
}
