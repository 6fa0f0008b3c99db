//! Alignment arithmetic shared by the arena and the allocator engine.
//! These don't belong to any concrete component of the heap.


/// It aligns `to_be_aligned` using `aligment`.
///
/// This is used to round block sizes up to the configured alignment multiple
/// and arena commits up to [`crate::kernel::page_size`]. `aligment` must be
/// a power of two.
pub fn align(to_be_aligned: usize, aligment: usize) -> usize {
    (to_be_aligned + aligment - 1) & !(aligment - 1)
}

/// Same as [`align`] but returns `None` instead of wrapping around when
/// `to_be_aligned` is close to `usize::MAX`.
pub fn checked_align(to_be_aligned: usize, aligment: usize) -> Option<usize> {
    to_be_aligned
        .checked_add(aligment - 1)
        .map(|value| value & !(aligment - 1))
}

/// Rounds `needed` up to the smallest multiple of `increment` that can hold it.
/// Unlike [`align`], `increment` doesn't need to be a power of two.
pub fn round_to_increment(needed: usize, increment: usize) -> Option<usize> {
    needed.div_ceil(increment).checked_mul(increment)
}
