//! The global heap, as an `Alloc`.

use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

use std::alloc;

use crate::error::ArenaError;
use crate::Alloc;

/// Allocator for values of type `T` on the global heap.
///
/// Zero-sized. All `Heap` allocators compare equal, whatever their element type.
pub struct Heap<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> Heap<T> {
    /// Creates a heap allocator for `T` values.
    #[inline]
    pub const fn new() -> Self {
        Self { marker: PhantomData }
    }
}

unsafe impl<T> Alloc for Heap<T> {
    type Value = T;
    type Rebind<U> = Heap<U>;

    #[inline]
    fn allocate(&self, n: usize) -> Result<NonNull<T>, ArenaError> {
        let layout = Layout::array::<T>(n)?;

        if layout.size() > 0 {
            let ptr = unsafe { alloc::alloc(layout) };
            NonNull::new(ptr).map(NonNull::cast)
                             .ok_or(ArenaError::HeapExhausted { layout })
        } else {
            Ok(NonNull::dangling())
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        let layout = Layout::from_size_align_unchecked(core::mem::size_of::<T>() * n,
                                                       core::mem::align_of::<T>());
        if layout.size() > 0 {
            alloc::dealloc(ptr.as_ptr().cast(), layout);
        }
    }

    #[inline]
    fn rebind<U>(&self) -> Heap<U> {
        Heap::new()
    }
}

impl<T> Default for Heap<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Heap<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Heap<T> {}

impl<T, U> PartialEq<Heap<U>> for Heap<T> {
    #[inline]
    fn eq(&self, _: &Heap<U>) -> bool {
        true
    }
}

impl<T> Eq for Heap<T> {}

impl<T> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Heap")
         .field(&core::any::type_name::<T>())
         .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate() {
        let heap = Heap::<u64>::new();

        let p = heap.allocate(4).unwrap();
        unsafe {
            for i in 0 .. 4 {
                p.as_ptr().add(i).write(i as u64);
            }
            assert_eq!(p.as_ptr().add(3).read(), 3);
            heap.deallocate(p, 4);
        }
    }

    #[test]
    fn empty_alloc() {
        let heap = Heap::<u64>::new();
        let p = heap.allocate(0).unwrap();
        assert_eq!(p, NonNull::dangling());
        unsafe { heap.deallocate(p, 0) };

        let unit = heap.rebind::<()>();
        let p = unit.allocate(100).unwrap();
        assert_eq!(p, NonNull::dangling());
        unsafe { unit.deallocate(p, 100) };
    }

    #[test]
    fn equality() {
        assert!(Heap::<u8>::new() == Heap::<u64>::new());
        assert_eq!(Heap::<u8>::default(), Heap::<u8>::new().rebind::<u64>().rebind::<u8>());
    }
}
