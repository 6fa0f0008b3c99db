//! # fitalloc - free list heap with selectable placement
//!
//! A user space allocator that carves blocks out of a single arena grown on
//! demand in fixed increments. Free blocks are threaded through an intrusive
//! list and picked with first-fit, best-fit or worst-fit.
//!
//! ```text
//!   baseline                                                   boundary
//!      |                                                           |
//!      v                                                           v
//!      +--------+----------+--------+------------+--------+--------+
//!      | in use |   free   | in use |    free    | in use |  free  |
//!      +--------+----------+--------+------------+--------+--------+
//!                    ^                    |                   ^
//!                    |                    |                   |
//!       head --------+--------------------+-------------------+
//!                (free list, most recently released first)
//! ```
//!
//! - `acquire` scans the free list once with the configured [`Strategy`],
//!   grows the arena if nothing fits, and splits off whatever is left over.
//! - `release` merges the block with every address adjacent free block, so
//!   the free list never holds two blocks that touch.
//! - `report` summarizes the free list.
//!
//! ```rust
//! use fitalloc::{Config, Heap, Strategy};
//!
//! let mut heap = Heap::new(Config::new(Strategy::BestFit)).unwrap();
//!
//! let a = heap.acquire(100).unwrap();
//! let b = heap.acquire(200).unwrap();
//! heap.release(a).unwrap();
//!
//! let info = heap.report();
//! assert!(info.free_chunks >= 1);
//! assert!(info.largest_free_chunk_size >= 100);
//! # heap.release(b).unwrap();
//! ```
//!
//! A [`Heap`] is a plain single threaded value. Wrap it in a [`SharedHeap`]
//! to use it from several threads.

mod arena;
mod block;
mod config;
mod error;
mod freelist;
pub mod kernel;
mod list;
mod shared;
mod stats;
mod strategy;
mod utils;

use std::{
    collections::HashSet,
    ptr::NonNull,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{debug, trace};

use crate::{
    arena::Arena,
    block::{HEADER_ALIGN, Header},
    freelist::{FreeList, Side},
    utils::checked_align,
};

pub use block::HEADER_SIZE;
pub use config::{ArenaReset, Config};
pub use error::{AllocError, Exhaustion, Misuse};
pub use kernel::{BulkMemory, VirtualArena, page_size};
pub use shared::SharedHeap;
pub use stats::{AllocInfo, FreeBlock};
pub use strategy::{ParseStrategyError, Strategy};

/// Address space reserved by [`Heap::new`].
pub const DEFAULT_CAPACITY: usize = 256 << 20;

/// Source of heap tokens. Every heap, and every `configure` call, gets a new
/// one so handles can't outlive the heap state they were carved from.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

fn next_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

/// A block handed out by [`Heap::acquire`].
///
/// The handle owns the block: it can't be cloned and [`Heap::release`]
/// consumes it, so a block can't be released twice through it. It also
/// remembers which heap (and which configuration of it) produced it.
#[derive(Debug)]
pub struct Allocation {
    header: NonNull<Header>,
    /// Usable bytes, at least what was requested.
    len: usize,
    token: u64,
}

// The handle is the only owner of its block.
unsafe impl Send for Allocation {}

impl Allocation {
    /// Start of the usable memory.
    #[inline]
    pub fn as_non_null(&self) -> NonNull<u8> {
        unsafe { Header::payload(self.header) }
    }

    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.as_non_null().as_ptr()
    }

    /// Usable bytes in the block. Can be larger than the request when the
    /// leftover was too small to split off.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gives up the handle, leaving only the raw pointer. The block can then
    /// only be released through [`Heap::release_raw`].
    pub fn into_raw(self) -> *mut u8 {
        self.as_ptr()
    }
}

/// The allocator engine. It owns the arena and the free list, and is the only
/// thing that mutates either.
pub struct Heap<M: BulkMemory = VirtualArena> {
    arena: Arena<M>,
    free: FreeList,
    config: Config,
    token: u64,
    /// Header addresses of every outstanding block, when tracking is on.
    live: Option<HashSet<usize>>,
}

// The heap owns its arena and every block in it.
unsafe impl<M: BulkMemory + Send> Send for Heap<M> {}

impl Heap<VirtualArena> {
    /// Creates a heap over a fresh [`VirtualArena`] of [`DEFAULT_CAPACITY`].
    pub fn new(config: Config) -> Result<Self, AllocError> {
        Self::with_capacity(DEFAULT_CAPACITY, config)
    }

    /// Creates a heap over a fresh [`VirtualArena`] of `capacity` bytes.
    pub fn with_capacity(capacity: usize, config: Config) -> Result<Self, AllocError> {
        Self::with_memory(VirtualArena::reserve(capacity)?, config)
    }
}

impl<M: BulkMemory> Heap<M> {
    /// Creates a heap anchored at the current boundary of `memory`.
    pub fn with_memory(memory: M, config: Config) -> Result<Self, AllocError> {
        config.validate()?;

        if memory.boundary().as_ptr() as usize % HEADER_ALIGN != 0 {
            return Err(AllocError::InvalidConfig("arena boundary is not aligned for block headers"));
        }

        debug!(strategy = %config.strategy, ceiling = ?config.byte_ceiling, increment = config.increment, "created heap");

        Ok(Self {
            arena: Arena::new(memory, &config),
            free: FreeList::new(),
            live: config.track_live.then(HashSet::new),
            config,
            token: next_token(),
        })
    }

    /// Resets the heap to empty and applies `config`.
    ///
    /// Every outstanding [`Allocation`] becomes stale: releasing it fails with
    /// [`Misuse::StaleHandle`]. Raw pointers obtained before the call must not
    /// be released at all.
    pub fn configure(&mut self, config: Config) -> Result<(), AllocError> {
        config.validate()?;
        self.arena.reconfigure(&config)?;

        self.free.clear();
        self.live = config.track_live.then(HashSet::new);
        self.token = next_token();

        debug!(
            strategy = %config.strategy,
            ceiling = ?config.byte_ceiling,
            increment = config.increment,
            reset = ?config.reset,
            baseline = ?self.arena.baseline(),
            "configured heap"
        );

        self.config = config;

        Ok(())
    }

    /// Returns a block with at least `size` usable bytes, disjoint from every
    /// other live or free block.
    pub fn acquire(&mut self, size: usize) -> Result<Allocation, AllocError> {
        if size == 0 {
            return Err(AllocError::InvalidRequest { requested: size });
        }

        let needed = size
            .checked_add(HEADER_SIZE)
            .and_then(|total| checked_align(total, self.config.alignment))
            .ok_or(AllocError::OutOfMemory {
                needed: usize::MAX,
                cause: Exhaustion::Overflow,
            })?;

        let mut block = match self.free.find(self.config.strategy, needed) {
            Some(cursor) => {
                unsafe { self.free.remove(cursor.node, cursor.prev) };
                trace!(block = ?cursor.node, needed, "reusing free block");
                cursor.node
            }
            // Fresh growth never went through the free list, nothing to unlink.
            None => self.arena.grow(needed)?,
        };

        let len = unsafe {
            self.split(block, needed);
            block.as_mut().next = None;
            Header::usable(block)
        };

        if let Some(live) = &mut self.live {
            live.insert(Header::start(block));
        }

        trace!(block = ?block, size, len, "acquired");

        Ok(Allocation {
            header: block,
            len,
            token: self.token,
        })
    }

    /// Returns `allocation` to the free list. `None` is a no-op.
    pub fn release(&mut self, allocation: impl Into<Option<Allocation>>) -> Result<(), AllocError> {
        let Some(allocation) = allocation.into() else {
            return Ok(());
        };

        if allocation.token != self.token {
            return Err(AllocError::CallerMisuse(Misuse::StaleHandle));
        }

        if let Some(live) = &mut self.live {
            live.remove(&Header::start(allocation.header));
        }

        // Same heap, same configuration and the handle was never duplicated,
        // so the block is allocated and ours.
        unsafe { self.free_block(allocation.header) };

        Ok(())
    }

    /// Releases a block given the pointer [`Allocation::into_raw`] returned.
    /// A null pointer is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`Allocation::into_raw`] on a handle from this
    /// heap, acquired since the last [`Heap::configure`], and must not have
    /// been released already. Pointers outside the arena are always
    /// rejected; the rest of the contract is only checked when the heap
    /// tracks live allocations ([`Config::track_live`]).
    pub unsafe fn release_raw(&mut self, ptr: *mut u8) -> Result<(), AllocError> {
        let Some(payload) = NonNull::new(ptr) else {
            return Ok(());
        };

        let addr = ptr as usize;
        let header_addr = addr.wrapping_sub(HEADER_SIZE);

        if addr < HEADER_SIZE || !self.arena.contains(header_addr) {
            return Err(AllocError::CallerMisuse(Misuse::ForeignPointer(addr)));
        }

        if let Some(live) = &mut self.live {
            if !live.remove(&header_addr) {
                return Err(AllocError::CallerMisuse(Misuse::NotLive(addr)));
            }
        }

        unsafe {
            let header = Header::from_payload(payload);
            self.free_block(header);
        }

        Ok(())
    }

    /// Summary of the free list.
    pub fn report(&self) -> AllocInfo {
        AllocInfo::collect(self.free.iter().map(|cursor| unsafe { Header::usable(cursor.node) }))
    }

    /// Free blocks in scan order.
    pub fn free_blocks(&self) -> impl Iterator<Item = FreeBlock> + '_ {
        self.free.iter().map(|cursor| FreeBlock {
            addr: Header::start(cursor.node),
            size: unsafe { cursor.node.as_ref().size },
        })
    }

    /// Bytes taken from the arena since the last `configure`.
    #[inline]
    pub fn acquired_bytes(&self) -> usize {
        self.arena.acquired()
    }

    #[inline]
    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Trims `block` down to `needed` bytes when the leftover can hold a block
    /// of its own, and frees the leftover.
    ///
    /// **SAFETY**: `block` must be a valid header outside the free list with
    /// `size >= needed`, and `needed` must be a multiple of the alignment.
    unsafe fn split(&mut self, mut block: NonNull<Header>, needed: usize) {
        unsafe {
            let remainder = block.as_ref().size - needed;

            // Anything not larger than a header stays with the block.
            if remainder <= HEADER_SIZE {
                return;
            }

            let rest = Header::write(block.cast::<u8>().add(needed), remainder);
            self.free.insert(rest);
            block.as_mut().size = needed;

            trace!(block = ?block, rest = ?rest, remainder, "split block");
        }
    }

    /// Merges `block` with its free neighbors and links the result.
    ///
    /// **SAFETY**: `block` must be an allocated block of this heap.
    unsafe fn free_block(&mut self, block: NonNull<Header>) {
        unsafe {
            let block = self.coalesce(block);
            self.free.insert(block);
            trace!(block = ?block, size = block.as_ref().size, free_blocks = self.free.len(), "released");
        }
    }

    /// Absorbs address adjacent free blocks into `block` until none is left,
    /// restarting the scan after every merge since a grown block can touch
    /// blocks the previous pass already skipped. Returns the merged block,
    /// which is not linked.
    ///
    /// **SAFETY**: `block` must be a valid header outside the free list.
    unsafe fn coalesce(&mut self, mut block: NonNull<Header>) -> NonNull<Header> {
        unsafe {
            while let Some((cursor, side)) = self.free.find_neighbor(block) {
                self.free.remove(cursor.node, cursor.prev);

                let mut neighbor = cursor.node;

                match side {
                    Side::Left => {
                        neighbor.as_mut().size += block.as_ref().size;
                        block = neighbor;
                    }
                    Side::Right => block.as_mut().size += neighbor.as_ref().size,
                }

                trace!(block = ?block, size = block.as_ref().size, ?side, "coalesced");
            }
        }

        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::align;
    use std::mem;

    fn heap(config: Config) -> Heap {
        Heap::with_capacity(1 << 20, config).unwrap()
    }

    /// Block size the heap carves for a `size` byte request with the default
    /// alignment.
    fn block_for(size: usize) -> usize {
        align(size + HEADER_SIZE, mem::align_of::<usize>())
    }

    fn assert_no_adjacent_free_blocks<M: BulkMemory>(heap: &Heap<M>) {
        let blocks: Vec<_> = heap.free_blocks().collect();

        for a in &blocks {
            for b in &blocks {
                assert_ne!(a.end(), b.addr, "{a:?} and {b:?} should have been merged");
            }
        }
    }

    #[test]
    fn zero_size_is_invalid() {
        let mut heap = heap(Config::default());
        let before = heap.report();

        assert_eq!(heap.acquire(0).unwrap_err(), AllocError::InvalidRequest { requested: 0 });
        assert_eq!(heap.report(), before);
        assert_eq!(heap.acquired_bytes(), 0);
    }

    #[test]
    fn first_acquire_grows_and_splits() {
        let mut heap = heap(Config::default().with_increment(4096));
        let a = heap.acquire(100).unwrap();

        assert_eq!(heap.acquired_bytes(), 4096);
        assert_eq!(a.len(), block_for(100) - HEADER_SIZE);
        assert!(a.len() >= 100);
        assert_eq!(
            heap.report(),
            AllocInfo {
                free_size: 4096 - block_for(100) - HEADER_SIZE,
                free_chunks: 1,
                largest_free_chunk_size: 4096 - block_for(100) - HEADER_SIZE,
                smallest_free_chunk_size: 4096 - block_for(100) - HEADER_SIZE,
            }
        );
    }

    #[test]
    fn allocations_are_disjoint_and_usable() {
        let mut heap = heap(Config::default().with_increment(512));
        let sizes = [24, 100, 7, 300, 1000, 64];

        let blocks: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, size)| {
                let allocation = heap.acquire(*size).unwrap();
                unsafe { allocation.as_ptr().write_bytes(i as u8, *size) };
                allocation
            })
            .collect();

        for (i, (allocation, size)) in blocks.iter().zip(sizes).enumerate() {
            assert_eq!(allocation.as_ptr() as usize % HEADER_ALIGN, 0);

            let bytes = unsafe { std::slice::from_raw_parts(allocation.as_ptr(), size) };
            assert!(bytes.iter().all(|byte| *byte == i as u8));
        }

        let mut ranges: Vec<_> = blocks
            .iter()
            .map(|a| (a.as_ptr() as usize, a.as_ptr() as usize + a.len()))
            .collect();
        ranges.sort();

        for pair in ranges.windows(2) {
            assert!(pair[0].1 <= pair[1].0);
        }
    }

    #[test]
    fn release_restores_free_space() {
        let mut heap = heap(Config::default().with_increment(4096));

        let first = heap.acquire(100).unwrap();
        heap.release(first).unwrap();
        let before = heap.report();

        let again = heap.acquire(100).unwrap();
        heap.release(again).unwrap();

        assert_eq!(heap.report(), before);
        assert_eq!(before.free_size, 4096 - HEADER_SIZE);
        assert_eq!(before.free_chunks, 1);
    }

    #[test]
    fn release_none_is_a_no_op() {
        let mut heap = heap(Config::default());
        let _a = heap.acquire(8).unwrap();
        let before = heap.report();

        heap.release(None).unwrap();
        assert_eq!(heap.report(), before);
    }

    #[test]
    fn report_is_idempotent() {
        let mut heap = heap(Config::default());
        let a = heap.acquire(10).unwrap();
        let _b = heap.acquire(20).unwrap();
        heap.release(a).unwrap();

        assert_eq!(heap.report(), heap.report());
    }

    #[test]
    fn small_leftovers_stay_with_the_block() {
        let mut heap = heap(Config::default().with_increment(4096));

        // Leaves exactly one word over, too small for a header.
        let request = 4096 - HEADER_SIZE - mem::size_of::<usize>();
        let a = heap.acquire(request).unwrap();

        assert_eq!(a.len(), 4096 - HEADER_SIZE);
        assert_eq!(heap.report(), AllocInfo::default());
    }

    #[test]
    fn oversized_requests_grow_in_one_step() {
        let mut heap = heap(Config::default().with_increment(256));
        let a = heap.acquire(1000).unwrap();

        assert_eq!(heap.acquired_bytes(), 1024);
        assert!(a.len() >= 1000);
    }

    #[test]
    fn scenario_free_first_of_two() {
        let mut heap = heap(Config::new(Strategy::FirstFit).with_ceiling(0));

        let a = heap.acquire(100).unwrap();
        let _b = heap.acquire(200).unwrap();
        heap.release(a).unwrap();

        let info = heap.report();
        assert!(info.free_chunks >= 1);
        assert!(info.largest_free_chunk_size >= 100);
    }

    /// Leaves free blocks of 40, 104 and 16 usable bytes in that scan order,
    /// kept apart by live separators, and nothing else free.
    fn fragmented(strategy: Strategy) -> (Heap, [usize; 3], Vec<Allocation>) {
        let sizes = [40, 104, 16];
        let separator = 8;
        let increment = sizes.iter().map(|size| block_for(*size) + block_for(separator)).sum();
        let mut heap = heap(Config::new(strategy).with_increment(increment));

        let mut holes = Vec::new();
        let mut separators = Vec::new();

        for size in sizes {
            holes.push(heap.acquire(size).unwrap());
            separators.push(heap.acquire(separator).unwrap());
        }

        assert_eq!(heap.acquired_bytes(), increment);
        assert_eq!(heap.report(), AllocInfo::default());

        let addrs = [holes[0].as_ptr() as usize, holes[1].as_ptr() as usize, holes[2].as_ptr() as usize];

        // Releasing back to front leaves the first hole at the head.
        for hole in holes.into_iter().rev() {
            heap.release(hole).unwrap();
        }

        let usable: Vec<_> = heap.free_blocks().map(|block| block.usable()).collect();
        assert_eq!(usable, sizes);

        (heap, addrs, separators)
    }

    #[test]
    fn strategy_conformance() {
        let expected = [
            (Strategy::FirstFit, 0),
            (Strategy::BestFit, 2),
            (Strategy::WorstFit, 1),
        ];

        for (strategy, hole) in expected {
            let (mut heap, addrs, _separators) = fragmented(strategy);
            let acquired = heap.acquired_bytes();
            let picked = heap.acquire(10).unwrap();

            assert_eq!(picked.as_ptr() as usize, addrs[hole], "{strategy} picked the wrong block");
            assert_eq!(heap.acquired_bytes(), acquired);
        }
    }

    #[test]
    fn coalesces_both_sides() {
        let mut heap = heap(Config::default().with_increment(4096));

        let a = heap.acquire(100).unwrap();
        let b = heap.acquire(100).unwrap();
        let c = heap.acquire(100).unwrap();

        heap.release(a).unwrap();
        assert_eq!(heap.report().free_chunks, 2);
        assert_no_adjacent_free_blocks(&heap);

        // Merges with the tail on its right.
        heap.release(c).unwrap();
        assert_eq!(heap.report().free_chunks, 2);
        assert_no_adjacent_free_blocks(&heap);

        // Merges with `a` on its left, then with `c` + tail on its right.
        heap.release(b).unwrap();
        assert_eq!(
            heap.report(),
            AllocInfo {
                free_size: 4096 - HEADER_SIZE,
                free_chunks: 1,
                largest_free_chunk_size: 4096 - HEADER_SIZE,
                smallest_free_chunk_size: 4096 - HEADER_SIZE,
            }
        );
    }

    #[test]
    fn coalesces_across_increments() {
        let mut heap = heap(Config::default().with_increment(256));

        let a = heap.acquire(256 - HEADER_SIZE).unwrap();
        let b = heap.acquire(256 - HEADER_SIZE).unwrap();
        assert_eq!(heap.acquired_bytes(), 512);

        heap.release(a).unwrap();
        heap.release(b).unwrap();

        assert_eq!(heap.report().free_chunks, 1);
        assert_eq!(heap.report().free_size, 512 - HEADER_SIZE);

        // The merged block serves a request neither increment could alone.
        let big = heap.acquire(400).unwrap();
        assert_eq!(heap.acquired_bytes(), 512);
        heap.release(big).unwrap();
    }

    #[test]
    fn ceiling_stops_growth() {
        let mut heap = heap(Config::new(Strategy::FirstFit).with_increment(1024).with_ceiling(4096));
        let mut blocks = Vec::new();

        for _ in 0..4 {
            blocks.push(heap.acquire(1000).unwrap());
        }

        let before = heap.report();
        let err = heap.acquire(1000).unwrap_err();

        assert_eq!(
            err,
            AllocError::OutOfMemory {
                needed: block_for(1000),
                cause: Exhaustion::Ceiling { acquired: 4096, requested: 1024, ceiling: 4096 },
            }
        );
        assert_eq!(heap.report(), before);
        assert_eq!(heap.acquired_bytes(), 4096);

        // Free blocks are still served below the ceiling.
        heap.release(blocks.pop().unwrap()).unwrap();
        blocks.push(heap.acquire(1000).unwrap());
        assert!(heap.acquire(1).is_err());
    }

    #[test]
    fn platform_failure_leaves_free_list_untouched() {
        let config = Config::default().with_increment(page_size());
        let mut heap = Heap::with_capacity(page_size(), config).unwrap();

        let _a = heap.acquire(100).unwrap();
        let before: Vec<_> = heap.free_blocks().collect();

        let err = heap.acquire(page_size()).unwrap_err();
        assert!(matches!(err, AllocError::OutOfMemory { cause: Exhaustion::Platform { .. }, .. }));
        assert_eq!(heap.free_blocks().collect::<Vec<_>>(), before);
    }

    #[test]
    fn huge_requests_overflow() {
        let mut heap = heap(Config::default());

        let err = heap.acquire(usize::MAX - 4).unwrap_err();
        assert!(matches!(err, AllocError::OutOfMemory { cause: Exhaustion::Overflow, .. }));
        assert_eq!(heap.acquired_bytes(), 0);
    }

    #[test]
    fn configure_resets_the_heap() {
        let mut heap = heap(Config::default().with_increment(4096));

        let a = heap.acquire(100).unwrap();
        let first = a.as_ptr();
        let _b = heap.acquire(100).unwrap();

        heap.configure(Config::new(Strategy::WorstFit).with_increment(4096)).unwrap();

        assert_eq!(heap.report(), AllocInfo::default());
        assert_eq!(heap.acquired_bytes(), 0);
        assert_eq!(heap.strategy(), Strategy::WorstFit);

        // Rewinding hands out the same memory again.
        let again = heap.acquire(100).unwrap();
        assert_eq!(again.as_ptr(), first);

        // Handles from before the reset are rejected.
        assert_eq!(heap.release(a).unwrap_err(), AllocError::CallerMisuse(Misuse::StaleHandle));
        assert_eq!(heap.report().free_chunks, 1);
    }

    #[test]
    fn reanchor_skips_old_memory() {
        let mut heap = heap(Config::default().with_increment(4096));
        let a = heap.acquire(100).unwrap();
        let first = a.as_ptr() as usize;

        heap.configure(Config::default().with_increment(4096).with_reset(ArenaReset::Reanchor)).unwrap();

        let b = heap.acquire(100).unwrap();
        assert_eq!(b.as_ptr() as usize, first + 4096);
        assert_eq!(heap.acquired_bytes(), 4096);
    }

    #[test]
    fn rewind_reclaims_memory_skipped_by_reanchor() {
        let mut heap = heap(Config::default().with_increment(4096));
        let first = heap.acquire(100).unwrap().as_ptr();

        heap.configure(Config::default().with_increment(4096).with_reset(ArenaReset::Reanchor)).unwrap();
        heap.acquire(100).unwrap();

        heap.configure(Config::default().with_increment(4096)).unwrap();
        assert_eq!(heap.acquire(100).unwrap().as_ptr(), first);
        assert_eq!(heap.acquired_bytes(), 4096);
    }

    #[test]
    fn zero_ceiling_field_is_unbounded() {
        let mut config = Config::default().with_increment(4096);
        config.byte_ceiling = Some(0);

        let mut heap = heap(config.clone());
        assert!(heap.acquire(100).is_ok());
        assert!(heap.acquire(8000).is_ok());
        assert_eq!(heap.acquired_bytes(), 4096 + 8192);

        heap.configure(config).unwrap();
        assert!(heap.acquire(100).is_ok());
    }

    #[test]
    fn invalid_config_is_rejected_on_creation() {
        let err = Heap::with_capacity(1 << 20, Config::default().with_alignment(3)).err();
        assert!(matches!(err, Some(AllocError::InvalidConfig(_))));
    }

    #[test]
    fn configure_rejects_invalid_config() {
        let mut heap = heap(Config::default().with_increment(4096));
        let a = heap.acquire(10).unwrap();

        let err = heap.configure(Config::default().with_alignment(3)).unwrap_err();
        assert!(matches!(err, AllocError::InvalidConfig(_)));

        // Nothing was reset.
        assert_eq!(heap.acquired_bytes(), 4096);
        heap.release(a).unwrap();
    }

    #[test]
    fn handles_from_other_heaps_are_rejected() {
        let mut one = heap(Config::default());
        let mut other = heap(Config::default());

        let a = one.acquire(10).unwrap();
        let before = other.report();

        assert_eq!(other.release(a).unwrap_err(), AllocError::CallerMisuse(Misuse::StaleHandle));
        assert_eq!(other.report(), before);
    }

    #[test]
    fn raw_release_with_tracking() {
        let mut heap = heap(Config::default().with_live_tracking(true));

        let a = heap.acquire(32).unwrap().into_raw();
        let _b = heap.acquire(32).unwrap();

        unsafe {
            assert_eq!(heap.release_raw(std::ptr::null_mut()), Ok(()));
            assert_eq!(heap.release_raw(a), Ok(()));
            assert_eq!(
                heap.release_raw(a).unwrap_err(),
                AllocError::CallerMisuse(Misuse::NotLive(a as usize))
            );

            let mut local = 0u64;
            let foreign = (&mut local as *mut u64).cast::<u8>();
            assert_eq!(
                heap.release_raw(foreign).unwrap_err(),
                AllocError::CallerMisuse(Misuse::ForeignPointer(foreign as usize))
            );
        }
    }

    #[test]
    fn raw_release_without_tracking() {
        let mut heap = heap(Config::default().with_increment(4096).with_live_tracking(false));

        let a = heap.acquire(32).unwrap().into_raw();
        unsafe { heap.release_raw(a).unwrap() };

        assert_eq!(heap.report().free_size, 4096 - HEADER_SIZE);
    }

    #[test]
    fn unaligned_memory_is_rejected() {
        struct Offset(VirtualArena);

        unsafe impl BulkMemory for Offset {
            fn boundary(&self) -> NonNull<u8> {
                unsafe { self.0.boundary().add(1) }
            }

            fn extend(&mut self, len: usize) -> Option<NonNull<u8>> {
                self.0.extend(len).map(|start| unsafe { start.add(1) })
            }

            fn reset(&mut self, boundary: NonNull<u8>) -> bool {
                self.0.reset(unsafe { boundary.sub(1) })
            }
        }

        let memory = Offset(VirtualArena::reserve(page_size()).unwrap());
        assert!(matches!(
            Heap::with_memory(memory, Config::default()),
            Err(AllocError::InvalidConfig(_))
        ));
    }
}
