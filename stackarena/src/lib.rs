//! Fixed capacity stack arenas, and typed allocators that draw from them.
//!
//! A [`StackArena`] reserves a contiguous, aligned, buffer up front and hands out blocks by
//! bumping a cursor. A [`StackAllocator`] binds an element type to an arena, so node based
//! containers can take their storage from the arena instead of the heap:
//!
//! ```
//! use stackarena::{StackArena, StackAllocator};
//!
//! let arena = StackArena::<1024>::new();
//! let alloc = StackAllocator::<u64, 1024>::new(&arena);
//!
//! let block = alloc.allocate(4).unwrap();
//! assert_eq!(arena.used(), 32);
//!
//! unsafe { alloc.deallocate(block, 4) };
//! assert_eq!(arena.used(), 0);
//!
//! // Rebound allocators share the arena, and compare equal.
//! let bytes = alloc.rebind::<u8>();
//! assert!(bytes == alloc);
//! ```
//!
//! Only the most recently allocated block is ever reclaimed; everything else stays in use until
//! [`StackArena::reset`]. When the arena is full, allocations spill over to the global allocator.

use core::ptr::NonNull;

pub mod align;
pub use self::align::{
    Alignment, DefaultAlign,
    Align1, Align2, Align4, Align8, Align16, Align32, Align64, Align128, Align256, Align4096,
};

mod error;
pub use self::error::ArenaError;

pub mod arena;
pub use self::arena::StackArena;

pub mod allocator;
pub use self::allocator::StackAllocator;

pub mod heap;
pub use self::heap::Heap;

#[cfg(feature = "allocator-api2")]
mod api2;

/// A typed allocator, as used by generic containers.
///
/// An `Alloc` hands out uninitialized storage for `Value`s. Containers that need storage for some
/// other type, say their internal nodes, use [`rebind`](Self::rebind) to get an allocator for that
/// type drawing from the same underlying memory.
///
/// Two allocators comparing equal means that either can release storage obtained from the other.
///
/// # Safety
///
/// Implementations must return blocks that are valid for reads and writes of `n` values, aligned
/// for `Value`, and disjoint from every other live block. Equal allocators, including rebound
/// ones, must be able to release each other's blocks.
pub unsafe trait Alloc : Clone + PartialEq {
    /// The element type storage is allocated for.
    type Value;

    /// The same allocator, for elements of type `U`.
    type Rebind<U> : Alloc<Value = U>;

    /// Allocates uninitialized storage for `n` values.
    fn allocate(&self, n: usize) -> Result<NonNull<Self::Value>, ArenaError>;

    /// Releases storage for `n` values.
    ///
    /// The values themselves are not dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate(n)` on this allocator, or an allocator equal to
    /// it, and not released since.
    unsafe fn deallocate(&self, ptr: NonNull<Self::Value>, n: usize);

    /// Creates an allocator for another element type, sharing the same storage.
    fn rebind<U>(&self) -> Self::Rebind<U>;
}
