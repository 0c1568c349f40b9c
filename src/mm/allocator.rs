//! Kernel Heap Allocator
//!
//! Uses `linked_list_allocator` for heap management. The descriptor table,
//! user strings and bounce buffers all live on this heap.
//!
//! With the `kernel-heap` feature the heap is installed as the
//! `#[global_allocator]`; hosted builds keep the platform allocator.

use linked_list_allocator::LockedHeap;

/// Kernel heap instance
#[cfg_attr(feature = "kernel-heap", global_allocator)]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Initialize the kernel heap over `[start, start + size)`.
///
/// # Safety
/// - Must be called exactly once, before any heap allocation
/// - The region must be valid, unused memory for the kernel's lifetime
pub unsafe fn init_heap(start: *mut u8, size: usize) {
    // SAFETY: Caller guarantees the region is valid and exclusively ours
    unsafe {
        ALLOCATOR.lock().init(start, size);
    }
    log::debug!("heap: {} KiB at {:p}", size / 1024, start);
}

/// Total size of the kernel heap
pub fn heap_size() -> usize {
    ALLOCATOR.lock().size()
}

/// Bytes currently free on the kernel heap
pub fn heap_free() -> usize {
    ALLOCATOR.lock().free()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::alloc::Layout;

    #[test]
    fn test_heap_region() {
        const SIZE: usize = 16 * 1024;
        let region: &'static mut [u8] = Box::leak(vec![0u8; SIZE].into_boxed_slice());
        unsafe { init_heap(region.as_mut_ptr(), SIZE) };
        let total = heap_size();
        assert!(total > SIZE / 2 && total <= SIZE);

        let layout = Layout::from_size_align(256, 8).unwrap();
        let block = ALLOCATOR.lock().allocate_first_fit(layout).unwrap();
        assert!(heap_free() <= total - 256);
        unsafe { ALLOCATOR.lock().deallocate(block, layout) };
        assert_eq!(heap_free(), total);
    }
}
