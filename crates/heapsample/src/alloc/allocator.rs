use std::alloc::{GlobalAlloc, Layout, System};

/// Global allocator that samples allocations before handing them to `A`.
///
/// Every thread gets its own [`crate::Sampler`], created on the thread's first
/// allocation. Sampling starts disabled; turn it on with
/// [`crate::set_sampling_interval`] or [`crate::SamplerConfig::apply`].
///
/// ```rust,no_run
/// use std::alloc::System;
/// use heapsample::SamplingAllocator;
///
/// #[global_allocator]
/// static GLOBAL: SamplingAllocator<System> = SamplingAllocator::new(System);
///
/// fn main() {
///     heapsample::set_sampling_interval(512 * 1024);
///     let _buffer = vec![0u8; 1 << 20];
///     println!("{}", heapsample::report());
/// }
/// ```
#[derive(Debug, Default)]
pub struct SamplingAllocator<A = System> {
    inner: A,
}

impl<A> SamplingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: GlobalAlloc> SamplingAllocator<A> {
    #[inline]
    fn sampled(&self, size: usize, alloc: impl FnOnce(&A) -> *mut u8) -> *mut u8 {
        let decision = super::core::decide(size);
        let ptr = alloc(&self.inner);

        if let Some(decision) = decision {
            if !ptr.is_null() {
                super::core::record(ptr as usize, size, decision);
            }
        }

        ptr
    }
}

unsafe impl<A: GlobalAlloc> GlobalAlloc for SamplingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.sampled(layout.size(), |inner| unsafe { inner.alloc(layout) })
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.sampled(layout.size(), |inner| unsafe { inner.alloc_zeroed(layout) })
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe {
            self.inner.dealloc(ptr, layout);
        }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.sampled(new_size, |inner| unsafe {
            inner.realloc(ptr, layout, new_size)
        })
    }
}
