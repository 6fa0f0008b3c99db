use std::ptr::NonNull;

use crate::{
    block::Header,
    list::{Cursor, Iter, Link, List},
    strategy::Strategy,
};

/// Linked list to keep track of free [`Header`] blocks.
///
/// The links live inside the free blocks themselves: a free block's payload
/// is unused, so its header's `next` field is all the bookkeeping we need.
///
/// ```text
///  head
///   |          Next free block             Next free block
///   |     +---------------------------+  +--------------------------+
///   |     |                           |  |                          |
/// +-v-----|----+-----------+----------v--|-+-----------+------------v-+
/// |  Free      |  Block    |  Free         |  Block    |  Free        |
/// +------------+-----------+---------------+-----------+--------------+
///                             arena
/// ```
///
/// Order is most recently inserted first, there is no other index. Every
/// lookup is a linear scan.
pub(crate) struct FreeList {
    blocks: List<Header>,
}

impl FreeList {
    /// Creates a new empty FreeList
    pub const fn new() -> Self {
        Self { blocks: List::new() }
    }

    /// It tells whether the FreeList is empty or not.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Drops every free block on the floor. Used when the heap is reset and
    /// the memory behind them is no longer ours.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    /// Pushes `block` to the front of the list.
    ///
    /// **SAFETY**: `block` must be a valid header inside the arena that is
    /// neither allocated nor already free.
    pub unsafe fn insert(&mut self, block: NonNull<Header>) {
        unsafe { self.blocks.push_front(block) }
    }

    /// Unlinks `block`, whose predecessor `prev` was found during the scan
    /// that selected it.
    ///
    /// **SAFETY**: see [`List::remove`].
    pub unsafe fn remove(&mut self, block: NonNull<Header>, prev: Link<Header>) {
        unsafe { self.blocks.remove(block, prev) }
    }

    /// Returns the free block `strategy` picks for a block of `needed` bytes
    /// (header included), together with its predecessor.
    pub fn find(&self, strategy: Strategy, needed: usize) -> Option<Cursor<Header>> {
        if self.is_empty() {
            return None;
        }

        let candidates = self
            .blocks
            .iter()
            .map(|cursor| (cursor, unsafe { cursor.node.as_ref().size }));

        strategy.select(candidates, needed)
    }

    /// Returns the first free block that touches `block` on either side.
    ///
    /// **SAFETY**: `block` must point to a valid header.
    pub unsafe fn find_neighbor(&self, block: NonNull<Header>) -> Option<(Cursor<Header>, Side)> {
        let start = Header::start(block);
        let end = unsafe { Header::end(block) };

        self.blocks.iter().find_map(|cursor| {
            if unsafe { Header::end(cursor.node) } == start {
                Some((cursor, Side::Left))
            } else if Header::start(cursor.node) == end {
                Some((cursor, Side::Right))
            } else {
                None
            }
        })
    }

    pub fn iter(&self) -> Iter<'_, Header> {
        self.blocks.iter()
    }
}

/// Where a neighbor sits relative to the block being released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// Ends exactly where the block starts.
    Left,
    /// Starts exactly where the block ends.
    Right,
}
