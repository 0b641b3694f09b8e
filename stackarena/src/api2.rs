//! `allocator_api2::alloc::Allocator` for stack allocators.
//!
//! Lets `allocator_api2`'s `Vec` and `Box`, and anything else built on that trait, take their
//! storage from a stack arena.

use core::alloc::Layout;
use core::ptr::NonNull;

use allocator_api2::alloc::{AllocError, Allocator};

use crate::align::Alignment;
use crate::allocator::StackAllocator;

unsafe impl<T, const N: usize, A: Alignment> Allocator for StackAllocator<'_, T, N, A> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = self.arena().allocate_layout(layout)?;
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.arena().deallocate(ptr, layout.size())
    }
}
