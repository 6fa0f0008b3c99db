use std::mem;

use crate::{
    block::{HEADER_ALIGN, HEADER_SIZE},
    error::AllocError,
    kernel,
    strategy::Strategy,
};

/// What `configure` does with the memory the heap already took from the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArenaReset {
    /// Move the boundary back to where the heap was first anchored, undoing
    /// any earlier `Reanchor`. The same memory is reused by the next run.
    #[default]
    Rewind,
    /// Leave the boundary where it is and anchor the new baseline there. The
    /// old memory is abandoned, never handed out again.
    Reanchor,
}

/// Heap configuration. Built with [`Config::new`] or [`Config::default`] and
/// the `with_*` methods, then passed to [`crate::Heap::new`] or
/// [`crate::Heap::configure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Placement policy.
    pub strategy: Strategy,
    /// Maximum number of bytes the heap may take from the arena. `None` and
    /// `Some(0)` are unbounded.
    pub byte_ceiling: Option<usize>,
    /// Growth step. The arena always grows by a multiple of this.
    pub increment: usize,
    /// Every block size is rounded up to a multiple of this. Payloads are
    /// only guaranteed the header alignment.
    pub alignment: usize,
    pub reset: ArenaReset,
    /// Keep a set of live allocations so that raw pointer releases of
    /// unknown or already released pointers are reported instead of
    /// corrupting the heap.
    pub track_live: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            byte_ceiling: None,
            increment: kernel::page_size(),
            alignment: mem::align_of::<usize>(),
            reset: ArenaReset::default(),
            track_live: cfg!(debug_assertions),
        }
    }
}

impl Config {
    pub fn new(strategy: Strategy) -> Self {
        Self::default().with_strategy(strategy)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the byte ceiling. `0` means unbounded.
    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.byte_ceiling = (ceiling != 0).then_some(ceiling);
        self
    }

    pub fn with_increment(mut self, increment: usize) -> Self {
        self.increment = increment;
        self
    }

    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_reset(mut self, reset: ArenaReset) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_live_tracking(mut self, track_live: bool) -> Self {
        self.track_live = track_live;
        self
    }

    /// Checks that blocks carved with this configuration keep their headers
    /// aligned and that one increment can hold at least one block.
    pub fn validate(&self) -> Result<(), AllocError> {
        if !self.alignment.is_power_of_two() {
            return Err(AllocError::InvalidConfig("alignment must be a power of two"));
        }

        if self.alignment < HEADER_ALIGN {
            return Err(AllocError::InvalidConfig("alignment is smaller than the block header alignment"));
        }

        if self.increment == 0 || self.increment % self.alignment != 0 {
            return Err(AllocError::InvalidConfig("increment must be a non-zero multiple of the alignment"));
        }

        if self.increment <= HEADER_SIZE {
            return Err(AllocError::InvalidConfig("increment can't hold a block header"));
        }

        Ok(())
    }
}
