//! Typed allocators over a stack arena.

use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem;
use core::ptr::{self, NonNull};

use crate::align::{Alignment, CheckCapacity, CheckType, DefaultAlign};
use crate::arena::StackArena;
use crate::error::ArenaError;
use crate::Alloc;

/// Allocator for values of type `T`, drawing from a `&'a StackArena<N, A>`.
///
/// This is a thin, `Copy`able, handle: all state lives in the arena. The lifetime `'a` is the
/// lifetime of the borrow, so the arena is guaranteed to outlive the allocator and anything
/// using it.
///
/// Allocators compare equal when they refer to the same arena, whatever their element types.
pub struct StackAllocator<'a, T, const N: usize, A: Alignment = DefaultAlign> {
    marker: PhantomData<fn() -> T>,
    arena: &'a StackArena<N, A>,
}

impl<'a, T, const N: usize, A: Alignment> StackAllocator<'a, T, N, A> {
    /// Creates an allocator for `arena`.
    ///
    /// Fails to build if `N` isn't a multiple of `A::ALIGN`, or `T` is more strictly aligned than
    /// the arena.
    #[inline]
    pub fn new(arena: &'a StackArena<N, A>) -> Self {
        let () = CheckCapacity::<A, N>::OK;
        let () = CheckType::<A, T>::ALIGNMENT;

        Self {
            marker: PhantomData,
            arena,
        }
    }

    /// Returns an allocator for `U` values, sharing this allocator's arena.
    #[inline]
    pub fn rebind<U>(&self) -> StackAllocator<'a, U, N, A> {
        StackAllocator::new(self.arena)
    }

    /// The arena this allocator draws from.
    #[inline]
    pub fn arena(&self) -> &'a StackArena<N, A> {
        self.arena
    }

    /// Allocates uninitialized storage for `n` values of type `T`.
    #[inline]
    pub fn allocate(&self, n: usize) -> Result<NonNull<T>, ArenaError> {
        let layout = Layout::array::<T>(n)?;
        self.arena.bump_or_spill(layout.size())
                  .map(NonNull::cast)
    }

    /// Releases storage for `n` values of type `T`.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from `allocate(n)` on an allocator equal to this one, and not have been
    /// released since.
    #[inline]
    pub unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        // Can't overflow, as allocate() succeeded with the same count.
        let size = mem::size_of::<T>() * n;
        self.arena.deallocate(ptr.cast(), size)
    }
}

unsafe impl<'a, T, const N: usize, A: Alignment> Alloc for StackAllocator<'a, T, N, A> {
    type Value = T;
    type Rebind<U> = StackAllocator<'a, U, N, A>;

    #[inline]
    fn allocate(&self, n: usize) -> Result<NonNull<T>, ArenaError> {
        StackAllocator::allocate(self, n)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<T>, n: usize) {
        StackAllocator::deallocate(self, ptr, n)
    }

    #[inline]
    fn rebind<U>(&self) -> StackAllocator<'a, U, N, A> {
        StackAllocator::rebind(self)
    }
}

impl<'a, T, const N: usize, A: Alignment> From<&'a StackArena<N, A>> for StackAllocator<'a, T, N, A> {
    #[inline]
    fn from(arena: &'a StackArena<N, A>) -> Self {
        Self::new(arena)
    }
}

impl<T, const N: usize, A: Alignment> Clone for StackAllocator<'_, T, N, A> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const N: usize, A: Alignment> Copy for StackAllocator<'_, T, N, A> {}

impl<T, U, const N: usize, const M: usize, A, B> PartialEq<StackAllocator<'_, U, M, B>> for StackAllocator<'_, T, N, A>
where A: Alignment,
      B: Alignment,
{
    #[inline]
    fn eq(&self, other: &StackAllocator<'_, U, M, B>) -> bool {
        N == M
            && A::ALIGN == B::ALIGN
            && ptr::eq(self.arena as *const _ as *const u8,
                       other.arena as *const _ as *const u8)
    }
}

impl<T, const N: usize, A: Alignment> Eq for StackAllocator<'_, T, N, A> {}

impl<T, const N: usize, A: Alignment> fmt::Debug for StackAllocator<'_, T, N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackAllocator")
         .field("value", &core::any::type_name::<T>())
         .field("arena", &(self.arena as *const StackArena<N, A>))
         .finish()
    }
}
