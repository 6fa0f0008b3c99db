use thiserror::Error;


/// Everything that can go wrong while configuring the heap or serving a
/// request. Failed operations never leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    /// Zero-byte request.
    #[error("invalid request of {requested} bytes")]
    InvalidRequest { requested: usize },

    /// No free block fits and the arena can't grow to make one.
    #[error("out of memory while looking for a {needed} byte block: {cause}")]
    OutOfMemory { needed: usize, cause: Exhaustion },

    /// The caller broke the release contract.
    #[error("caller misuse: {0}")]
    CallerMisuse(Misuse),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The OS refused to reserve address space for the arena.
    #[error("could not reserve {capacity} bytes of address space")]
    Reserve { capacity: usize },
}

/// Why the arena couldn't grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Exhaustion {
    #[error("growing by {requested} bytes would exceed the ceiling ({acquired} of {ceiling} bytes used)")]
    Ceiling {
        acquired: usize,
        requested: usize,
        ceiling: usize,
    },

    #[error("the platform refused to extend the arena by {requested} bytes")]
    Platform { requested: usize },

    #[error("request size overflows the address space")]
    Overflow,
}

/// Release calls that violate the caller's obligations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Misuse {
    /// The handle belongs to another heap or predates the last `configure`.
    #[error("allocation handle is stale or belongs to another heap")]
    StaleHandle,

    #[error("pointer {0:#x} does not point into the arena")]
    ForeignPointer(usize),

    /// Only reported when live allocations are tracked.
    #[error("pointer {0:#x} is not a live allocation")]
    NotLive(usize),
}
