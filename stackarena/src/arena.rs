//! Fixed capacity stack arenas.

use core::alloc::Layout;
use core::cell::{Cell, UnsafeCell};
use core::fmt;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use std::alloc;

use crate::align::{self, Alignment, CheckAlign, CheckCapacity, DefaultAlign};
use crate::error::ArenaError;

/// `N` bytes of storage, aligned to `A`.
#[repr(C)]
struct Buffer<A, const N: usize> {
    _align: [A; 0],
    bytes: UnsafeCell<[MaybeUninit<u8>; N]>,
}

/// A fixed capacity, bump allocated arena.
///
/// The arena owns `N` bytes of inline storage aligned to `A::ALIGN`, and a cursor marking the
/// first free byte. Allocations are carved off the top by advancing the cursor. Deallocation only
/// reclaims space when the block being freed is the most recent one still on top; any other block
/// stays in use until [`reset`](Self::reset). Requests that don't fit are transparently served by
/// the global allocator instead.
///
/// Arenas are not `Sync`, and don't implement `Clone`. Allocators borrow the arena, so it can't be
/// moved or dropped while any of them, or any container using them, is alive.
///
/// The raw [`allocate`](Self::allocate) methods return pointers that aren't tied to a borrow.
/// Moving the arena moves its buffer, invalidating every block still outstanding: the moved
/// arena no longer recognises them, and would hand them to the global allocator on release.
/// Release or [`reset`](Self::reset) every raw block before moving the arena.
///
/// # Examples
///
/// ```
/// use stackarena::{StackArena, Align8};
///
/// let arena = StackArena::<64, Align8>::new();
///
/// let a = arena.allocate::<8>(24).unwrap();
/// let b = arena.allocate::<8>(16).unwrap();
/// assert_eq!(arena.used(), 40);
///
/// unsafe { arena.deallocate(b, 16) };
/// assert_eq!(arena.used(), 24);
///
/// // Not on top of the stack anymore, so nothing is reclaimed.
/// let _c = arena.allocate::<8>(8).unwrap();
/// unsafe { arena.deallocate(a, 24) };
/// assert_eq!(arena.used(), 32);
///
/// // Only move the arena once nothing is outstanding.
/// let mut arena = arena;
/// arena.reset();
/// let arena = Box::new(arena);
/// let d = arena.allocate::<8>(8).unwrap();
/// assert!(arena.contains(d));
/// unsafe { arena.deallocate(d, 8) };
/// assert_eq!(arena.used(), 0);
/// ```
pub struct StackArena<const N: usize, A: Alignment = DefaultAlign> {
    buffer: Buffer<A, N>,
    cursor: Cell<usize>,
}

impl<const N: usize, A: Alignment> StackArena<N, A> {
    /// Total capacity in bytes.
    pub const CAPACITY: usize = N;

    /// Creates a new, empty, arena.
    ///
    /// Fails to build if `N` isn't a multiple of `A::ALIGN`.
    pub fn new() -> Self {
        let () = CheckCapacity::<A, N>::OK;

        Self {
            buffer: Buffer {
                _align: [],
                bytes: UnsafeCell::new([MaybeUninit::uninit(); N]),
            },
            cursor: Cell::new(0),
        }
    }

    /// Allocates `size` bytes aligned to at least `ALIGN`.
    ///
    /// Fails to build if `ALIGN` is stricter than the arena's alignment. If the arena doesn't have
    /// room for `size` rounded up to the arena's alignment, the block comes from the global
    /// allocator instead and the arena is left untouched.
    #[inline]
    pub fn allocate<const ALIGN: usize>(&self, size: usize) -> Result<NonNull<u8>, ArenaError> {
        let () = CheckAlign::<A, ALIGN>::OK;
        self.bump_or_spill(size)
    }

    /// Allocates a block for a `Layout` only known at runtime.
    ///
    /// Layouts more strictly aligned than the arena are rejected.
    pub fn allocate_layout(&self, layout: Layout) -> Result<NonNull<u8>, ArenaError> {
        if layout.align() > A::ALIGN {
            return Err(ArenaError::Overaligned {
                requested: layout.align(),
                supported: A::ALIGN,
            });
        }
        self.bump_or_spill(layout.size())
    }

    /// Releases a block previously returned by this arena.
    ///
    /// Space is only reclaimed if `ptr` is the top of the stack: the most recently allocated block
    /// that hasn't been released yet. Blocks from the heap fallback are returned to the global
    /// allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by an allocation method of this arena with the same `size`,
    /// and must not have been released already, or reset away. The arena must not have been moved
    /// since `ptr` was allocated: a moved arena takes its own blocks for heap blocks.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>, size: usize) {
        self.debug_check_live();

        if self.contains(ptr) {
            let aligned_size = align::align_up(size, A::ALIGN);
            let offset = ptr.as_ptr() as usize - self.start() as usize;

            if offset + aligned_size == self.cursor.get() {
                self.cursor.set(offset);
            } else {
                tracing::trace!(offset, size = aligned_size, used = self.cursor.get(),
                                "retaining arena block until reset");
            }
        } else {
            tracing::trace!(size, "releasing heap fallback block");

            let layout = Layout::from_size_align_unchecked(size, A::ALIGN);
            alloc::dealloc(ptr.as_ptr(), layout);
        }
    }

    /// Bytes currently in use.
    #[inline]
    pub fn used(&self) -> usize {
        self.cursor.get()
    }

    /// Bytes still available before allocations spill to the heap.
    #[inline]
    pub fn remaining(&self) -> usize {
        N - self.cursor.get()
    }

    /// Total capacity in bytes.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Alignment, in bytes, of every block handed out by the arena.
    #[inline]
    pub const fn alignment(&self) -> usize {
        A::ALIGN
    }

    /// Rewinds the cursor to the start of the buffer, releasing every block at once.
    ///
    /// Borrowing mutably ensures that no allocator or container still refers to the arena. Raw
    /// pointers obtained earlier must not be used afterwards.
    pub fn reset(&mut self) {
        tracing::debug!(discarded = self.cursor.get(), capacity = N, "resetting arena");
        self.cursor.set(0);
    }

    /// Returns true if `ptr` points into the buffer.
    ///
    /// The upper bound is inclusive: the one-past-the-end address, returned for zero sized
    /// requests on a full arena, counts as part of the buffer.
    #[inline]
    pub fn contains<T: ?Sized>(&self, ptr: NonNull<T>) -> bool {
        let start = self.start() as usize;
        let addr = ptr.cast::<u8>().as_ptr() as usize;
        start <= addr && addr <= start + N
    }

    #[inline(always)]
    fn start(&self) -> *mut u8 {
        self.buffer.bytes.get().cast()
    }

    #[inline(always)]
    fn debug_check_live(&self) {
        debug_assert!(self.cursor.get() <= N,
                      "arena cursor out of bounds; allocator has outlived its arena?");
    }

    pub(crate) fn bump_or_spill(&self, size: usize) -> Result<NonNull<u8>, ArenaError> {
        self.debug_check_live();

        let layout = Layout::from_size_align(size, A::ALIGN)?;
        let aligned_size = layout.pad_to_align().size();

        let cursor = self.cursor.get();
        let remaining = N - cursor;
        if remaining >= aligned_size {
            self.cursor.set(cursor + aligned_size);

            // SAFETY: cursor <= N, so the result is within, or one past the end of, the buffer.
            unsafe {
                Ok(NonNull::new_unchecked(self.start().add(cursor)))
            }
        } else {
            tracing::trace!(size, remaining, "arena full, spilling to the heap");

            // aligned_size > remaining >= 0, so the layout isn't zero sized.
            let ptr = unsafe { alloc::alloc(layout) };
            NonNull::new(ptr).ok_or(ArenaError::HeapExhausted { layout })
        }
    }
}

impl<const N: usize, A: Alignment> Default for StackArena<N, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, A: Alignment> fmt::Debug for StackArena<N, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackArena")
         .field("start", &self.start())
         .field("used", &self.used())
         .field("capacity", &N)
         .field("alignment", &A::ALIGN)
         .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::align::{Align1, Align8, Align16};

    fn offset<const N: usize, A: Alignment>(arena: &StackArena<N, A>, ptr: NonNull<u8>) -> usize {
        assert!(arena.contains(ptr));
        ptr.as_ptr() as usize - arena.start() as usize
    }

    #[test]
    fn new_is_empty() {
        let arena = StackArena::<128>::new();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.remaining(), 128);
        assert_eq!(arena.capacity(), 128);
        assert_eq!(arena.alignment(), 16);
        assert_eq!(StackArena::<128>::CAPACITY, 128);
        assert_eq!(arena.start() as usize % 16, 0);
    }

    #[test]
    fn bump() {
        let arena = StackArena::<64, Align8>::new();

        let a = arena.allocate::<8>(3).unwrap();
        let b = arena.allocate::<4>(8).unwrap();
        let c = arena.allocate::<1>(17).unwrap();

        assert_eq!(offset(&arena, a), 0);
        assert_eq!(offset(&arena, b), 8);
        assert_eq!(offset(&arena, c), 16);
        assert_eq!(arena.used(), 40);
        assert_eq!(arena.remaining(), 24);
    }

    #[test]
    fn lifo_and_non_lifo() {
        let arena = StackArena::<64, Align8>::new();

        let first = arena.allocate::<8>(24).unwrap();
        assert_eq!(offset(&arena, first), 0);
        assert_eq!(arena.used(), 24);

        let second = arena.allocate::<8>(16).unwrap();
        assert_eq!(offset(&arena, second), 24);
        assert_eq!(arena.used(), 40);

        unsafe { arena.deallocate(second, 16) };
        assert_eq!(arena.used(), 24);

        let third = arena.allocate::<8>(8).unwrap();
        assert_eq!(third, second);
        assert_eq!(arena.used(), 32);

        unsafe { arena.deallocate(first, 24) };
        assert_eq!(arena.used(), 32);
    }

    #[test]
    fn deallocate_rounds_size() {
        let arena = StackArena::<32, Align8>::new();

        let a = arena.allocate::<1>(5).unwrap();
        assert_eq!(arena.used(), 8);
        unsafe { arena.deallocate(a, 5) };
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn spill_to_heap() {
        let arena = StackArena::<16, Align8>::new();

        let a = arena.allocate::<8>(8).unwrap();
        let b = arena.allocate::<8>(8).unwrap();
        assert_eq!(arena.used(), 16);

        let c = arena.allocate::<8>(8).unwrap();
        assert!(!arena.contains(c));
        assert_eq!(c.as_ptr() as usize % 8, 0);
        assert_eq!(arena.used(), 16);

        unsafe {
            c.as_ptr().write_bytes(0xaa, 8);
            arena.deallocate(c, 8);
            assert_eq!(arena.used(), 16);

            arena.deallocate(b, 8);
            arena.deallocate(a, 8);
        }
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn spill_keeps_arena_alignment() {
        let arena = StackArena::<0, Align16>::new();

        let p = arena.allocate::<1>(1).unwrap();
        assert!(!arena.contains(p));
        assert_eq!(p.as_ptr() as usize % 16, 0);
        unsafe { arena.deallocate(p, 1) };
    }

    #[test]
    fn zero_sized() {
        let arena = StackArena::<8, Align8>::new();

        let z = arena.allocate::<1>(0).unwrap();
        assert_eq!(offset(&arena, z), 0);
        assert_eq!(arena.used(), 0);

        let full = arena.allocate::<8>(8).unwrap();
        let end = arena.allocate::<8>(0).unwrap();
        assert!(arena.contains(end));
        assert_eq!(offset(&arena, end), 8);
        assert_eq!(arena.used(), 8);

        unsafe {
            arena.deallocate(end, 0);
            arena.deallocate(full, 8);
            arena.deallocate(z, 0);
        }
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn allocate_layout() {
        let arena = StackArena::<32, Align8>::new();

        let p = arena.allocate_layout(Layout::new::<u32>()).unwrap();
        assert_eq!(offset(&arena, p), 0);
        assert_eq!(arena.used(), 8);

        assert_eq!(arena.allocate_layout(Layout::from_size_align(8, 16).unwrap()),
                   Err(ArenaError::Overaligned { requested: 16, supported: 8 }));
        assert_eq!(arena.used(), 8);
    }

    #[test]
    fn oversized_request() {
        let arena = StackArena::<8, Align1>::new();
        assert!(matches!(arena.allocate::<1>(usize::MAX),
                         Err(ArenaError::Layout(_))));
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn reset() {
        let mut arena = StackArena::<32, Align8>::new();
        let _ = arena.allocate::<8>(20).unwrap();
        assert_eq!(arena.used(), 24);

        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.remaining(), 32);
    }

    #[test]
    fn move_after_release() {
        let arena = StackArena::<32, Align8>::new();
        let a = arena.allocate::<8>(8).unwrap();
        let b = arena.allocate::<8>(16).unwrap();
        unsafe {
            arena.deallocate(b, 16);
            arena.deallocate(a, 8);
        }
        assert_eq!(arena.used(), 0);

        let moved = Box::new(arena);
        let c = moved.allocate::<8>(8).unwrap();
        assert!(moved.contains(c));
        assert_eq!(moved.used(), 8);

        unsafe { moved.deallocate(c, 8) };
        assert_eq!(moved.used(), 0);
    }

    #[test]
    fn move_after_reset() {
        let mut arena = StackArena::<32, Align8>::new();
        let _ = arena.allocate::<8>(24).unwrap();
        arena.reset();

        let moved = Box::new(arena);
        assert_eq!(moved.used(), 0);
        let p = moved.allocate::<8>(32).unwrap();
        assert!(moved.contains(p));
        assert_eq!(moved.remaining(), 0);
    }

    #[test]
    fn contains_bounds() {
        let arena = StackArena::<16, Align8>::new();
        let start = arena.start();

        unsafe {
            assert!(arena.contains(NonNull::new_unchecked(start)));
            assert!(arena.contains(NonNull::new_unchecked(start.add(16))));
        }
        let outside = Box::new(0u64);
        assert!(!arena.contains(NonNull::from(&*outside)));
    }
}
