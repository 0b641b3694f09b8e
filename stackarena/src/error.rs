use core::alloc::{Layout, LayoutError};

use thiserror::Error;

/// Errors returned when an allocation can't be satisfied.
///
/// Running out of arena space isn't one of them: the arena spills to the heap instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// The requested size overflowed when rounded up to the arena's alignment.
    #[error("invalid allocation size: {0}")]
    Layout(#[from] LayoutError),

    /// A runtime layout asked for stricter alignment than the arena provides.
    #[error("requested alignment {requested} exceeds arena alignment {supported}")]
    Overaligned {
        requested: usize,
        supported: usize,
    },

    /// The global allocator failed to serve a heap fallback request.
    #[error("heap fallback failed to allocate {} bytes aligned to {}", .layout.size(), .layout.align())]
    HeapExhausted {
        layout: Layout,
    },
}

#[cfg(feature = "allocator-api2")]
impl From<ArenaError> for allocator_api2::alloc::AllocError {
    #[inline]
    fn from(_: ArenaError) -> Self {
        allocator_api2::alloc::AllocError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let layout = Layout::from_size_align(24, 8).unwrap();
        assert_eq!(ArenaError::HeapExhausted { layout }.to_string(),
                   "heap fallback failed to allocate 24 bytes aligned to 8");

        assert_eq!(ArenaError::Overaligned { requested: 32, supported: 16 }.to_string(),
                   "requested alignment 32 exceeds arena alignment 16");

        let err: ArenaError = Layout::from_size_align(usize::MAX, 8).unwrap_err().into();
        assert!(matches!(err, ArenaError::Layout(_)));
    }
}
