use parking_lot::Mutex;

use crate::{
    Allocation, Heap,
    config::Config,
    error::AllocError,
    kernel::{BulkMemory, VirtualArena},
    stats::AllocInfo,
};

/// A [`Heap`] behind a single lock, for callers that need to share one heap
/// between threads. Every operation holds the lock for its whole duration.
pub struct SharedHeap<M: BulkMemory = VirtualArena> {
    heap: Mutex<Heap<M>>,
}

impl SharedHeap<VirtualArena> {
    pub fn new(config: Config) -> Result<Self, AllocError> {
        Heap::new(config).map(Self::from)
    }
}

impl<M: BulkMemory> From<Heap<M>> for SharedHeap<M> {
    fn from(heap: Heap<M>) -> Self {
        Self { heap: Mutex::new(heap) }
    }
}

impl<M: BulkMemory> SharedHeap<M> {
    pub fn acquire(&self, size: usize) -> Result<Allocation, AllocError> {
        self.heap.lock().acquire(size)
    }

    pub fn release(&self, allocation: impl Into<Option<Allocation>>) -> Result<(), AllocError> {
        self.heap.lock().release(allocation)
    }

    pub fn report(&self) -> AllocInfo {
        self.heap.lock().report()
    }

    pub fn configure(&self, config: Config) -> Result<(), AllocError> {
        self.heap.lock().configure(config)
    }

    /// Runs `f` with exclusive access to the heap.
    pub fn with<R>(&self, f: impl FnOnce(&mut Heap<M>) -> R) -> R {
        f(&mut self.heap.lock())
    }

    pub fn into_inner(self) -> Heap<M> {
        self.heap.into_inner()
    }
}
