//! Compile-time alignment parameters.

use core::fmt;
use core::marker::PhantomData;
use core::mem;

use static_assertions::const_assert_eq;

mod private {
    pub trait Sealed {}
}

/// A zero-sized marker type whose alignment is the alignment of an arena's buffer.
///
/// Rust can't (yet) take `#[repr(align(N))]` from a const generic, so the alignment of a
/// [`StackArena`](crate::StackArena) is selected with one of these marker types instead. A
/// zero-length array of the marker is placed in front of the buffer, which forces the buffer to
/// the marker's alignment without taking up any space.
pub trait Alignment: private::Sealed + 'static + Copy + Default + fmt::Debug {
    /// The alignment in bytes. Always a power of two, and always equal to
    /// `mem::align_of::<Self>()`.
    const ALIGN: usize = mem::align_of::<Self>();
}

macro_rules! alignments {
    ( $( $name:ident = $n:literal, )* ) => {
        $(
            #[doc = concat!("Alignment of ", stringify!($n), " bytes.")]
            #[repr(align($n))]
            #[derive(Debug,Default,Clone,Copy,PartialEq,Eq,PartialOrd,Ord,Hash)]
            pub struct $name;

            const_assert_eq!(mem::align_of::<$name>(), $n);
            const_assert_eq!(mem::size_of::<$name>(), 0);

            impl private::Sealed for $name {}
            impl Alignment for $name {}
        )*
    }
}

alignments! {
    Align1 = 1,
    Align2 = 2,
    Align4 = 4,
    Align8 = 8,
    Align16 = 16,
    Align32 = 32,
    Align64 = 64,
    Align128 = 128,
    Align256 = 256,
    Align4096 = 4096,
}

/// The default arena alignment.
///
/// Strict enough for every fundamental type on mainstream 64-bit targets, like C's
/// `max_align_t`.
pub type DefaultAlign = Align16;

const_assert_eq!(DefaultAlign::ALIGN, 16);

/// Rounds `size` up to the next multiple of `align`.
///
/// `align` must be a power of two, and the result must not overflow; callers check the latter
/// with `Layout` before getting here.
#[inline(always)]
pub const fn align_up(size: usize, align: usize) -> usize {
    (size + (align - 1)) & !(align - 1)
}

/// Post-monomorphization checks of arena parameters.
///
/// Referencing one of the associated constants forces it to be evaluated for the concrete
/// parameters, turning a bad configuration into a build error.
pub(crate) struct CheckCapacity<A, const N: usize>(PhantomData<A>);

impl<A: Alignment, const N: usize> CheckCapacity<A, N> {
    /// `N` is a whole number of alignment units.
    pub(crate) const OK: () = assert!(N % A::ALIGN == 0,
                                      "arena capacity needs to be a multiple of its alignment");
}

/// Checks that a requested alignment can be satisfied by an arena aligned to `A`.
pub(crate) struct CheckAlign<A, const ALIGN: usize>(PhantomData<A>);

impl<A: Alignment, const ALIGN: usize> CheckAlign<A, ALIGN> {
    pub(crate) const OK: () = assert!(ALIGN.is_power_of_two() && ALIGN <= A::ALIGN,
                                      "alignment is too strict for this arena");
}

/// Checks that values of type `T` can live in an arena aligned to `A`.
pub(crate) struct CheckType<A, T>(PhantomData<(A, fn() -> T)>);

impl<A: Alignment, T> CheckType<A, T> {
    pub(crate) const ALIGNMENT: () = assert!(mem::align_of::<T>() <= A::ALIGN,
                                             "element type is more strictly aligned than the arena");
}
