use std::fmt;

/// Summary of the free list. All sizes are usable bytes, header overhead
/// excluded. Everything is zero when there are no free blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocInfo {
    pub free_size: usize,
    pub free_chunks: usize,
    pub largest_free_chunk_size: usize,
    pub smallest_free_chunk_size: usize,
}

impl AllocInfo {
    /// Folds the usable sizes of the free blocks into a summary.
    pub fn collect<I: IntoIterator<Item = usize>>(usable_sizes: I) -> Self {
        usable_sizes.into_iter().fold(Self::default(), |mut info, usable| {
            if info.free_chunks == 0 {
                info.largest_free_chunk_size = usable;
                info.smallest_free_chunk_size = usable;
            } else {
                info.largest_free_chunk_size = info.largest_free_chunk_size.max(usable);
                info.smallest_free_chunk_size = info.smallest_free_chunk_size.min(usable);
            }

            info.free_size += usable;
            info.free_chunks += 1;
            info
        })
    }
}

impl fmt::Display for AllocInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes free in {} chunks (largest {}, smallest {})",
            self.free_size, self.free_chunks, self.largest_free_chunk_size, self.smallest_free_chunk_size
        )
    }
}

/// A block sitting in the free list, as seen by [`crate::Heap::free_blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    /// Address of the block header.
    pub addr: usize,
    /// Total size, header included.
    pub size: usize,
}

impl FreeBlock {
    /// One past the last byte of the block.
    pub fn end(&self) -> usize {
        self.addr + self.size
    }

    pub fn usable(&self) -> usize {
        self.size - crate::block::HEADER_SIZE
    }
}
