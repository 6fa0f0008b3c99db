use std::ptr::NonNull;

use tracing::debug;

use crate::{
    block::Header,
    config::{ArenaReset, Config},
    error::{AllocError, Exhaustion},
    kernel::BulkMemory,
    utils::round_to_increment,
};

/// Owns the bulk memory the heap carves blocks from and decides how much to
/// ask for when the free list comes up empty.
///
/// ```text
///  baseline                                 boundary
///     |                                        |
///     v                                        v
///     +-------------+-------------+------------+
///     | increment 1 | increment 2 |  2 x inc   |  ...
///     +-------------+-------------+------------+
///     \_________________ acquired _____________/
/// ```
///
/// Each growth hands back a single free block covering the whole new region.
/// Linking it into the free list is the caller's job.
pub(crate) struct Arena<M> {
    memory: M,
    /// Boundary when the arena was first created. `Rewind` returns here.
    origin: NonNull<u8>,
    /// Boundary at the time the heap was (re)anchored.
    baseline: NonNull<u8>,
    /// Bytes taken from `memory` since `baseline`.
    acquired: usize,
    increment: usize,
    ceiling: Option<usize>,
}

impl<M: BulkMemory> Arena<M> {
    pub fn new(memory: M, config: &Config) -> Self {
        let origin = memory.boundary();

        Self {
            memory,
            origin,
            baseline: origin,
            acquired: 0,
            increment: config.increment,
            ceiling: ceiling_of(config),
        }
    }

    /// Forgets every block handed out so far and applies `config`.
    pub fn reconfigure(&mut self, config: &Config) -> Result<(), AllocError> {
        match config.reset {
            ArenaReset::Rewind => {
                if !self.memory.reset(self.origin) {
                    return Err(AllocError::InvalidConfig("the arena refused to rewind to its origin"));
                }

                self.baseline = self.origin;
            }
            ArenaReset::Reanchor => self.baseline = self.memory.boundary(),
        }

        self.acquired = 0;
        self.increment = config.increment;
        self.ceiling = ceiling_of(config);

        Ok(())
    }

    #[inline]
    pub fn baseline(&self) -> NonNull<u8> {
        self.baseline
    }

    #[inline]
    pub fn acquired(&self) -> usize {
        self.acquired
    }

    /// Whether `addr` falls inside the memory taken since the baseline.
    pub fn contains(&self, addr: usize) -> bool {
        let start = self.baseline.as_ptr() as usize;
        (start..start + self.acquired).contains(&addr)
    }

    /// Bytes one growth step would request to fit a block of `needed` bytes.
    pub fn growth_for(&self, needed: usize) -> Option<usize> {
        round_to_increment(needed, self.increment)
    }

    /// Extends the arena by the smallest multiple of the increment that can
    /// hold `needed` bytes and returns the new region as one unlinked free
    /// block.
    pub fn grow(&mut self, needed: usize) -> Result<NonNull<Header>, AllocError> {
        let out_of_memory = |cause| AllocError::OutOfMemory { needed, cause };

        let requested = self.growth_for(needed).ok_or(out_of_memory(Exhaustion::Overflow))?;

        if let Some(ceiling) = self.ceiling {
            let total = self.acquired.checked_add(requested);

            if total.is_none_or(|total| total > ceiling) {
                debug!(acquired = self.acquired, requested, ceiling, "arena growth refused by ceiling");

                return Err(out_of_memory(Exhaustion::Ceiling {
                    acquired: self.acquired,
                    requested,
                    ceiling,
                }));
            }
        }

        let Some(start) = self.memory.extend(requested) else {
            debug!(requested, "platform refused to extend the arena");
            return Err(out_of_memory(Exhaustion::Platform { requested }));
        };

        self.acquired += requested;

        debug!(start = ?start, requested, acquired = self.acquired, "extended arena");

        // The granted region is ours and the baseline plus a multiple of the
        // increment keeps it header aligned.
        Ok(unsafe { Header::write(start, requested) })
    }
}

/// A ceiling of zero is the same as no ceiling.
fn ceiling_of(config: &Config) -> Option<usize> {
    config.byte_ceiling.filter(|ceiling| *ceiling != 0)
}
