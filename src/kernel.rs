use std::{
    ptr::NonNull,
    sync::atomic::{AtomicUsize, Ordering},
};

use tracing::debug;

use crate::{
    error::AllocError,
    utils::{align, checked_align},
};

/// Virtual memory page size of the computer. This is usually 4096.
/// We can't know it at compile time, so it is queried once and cached.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// The bulk memory primitive the heap grows into. It behaves like a program
/// break: one boundary that only moves through this trait.
///
/// ```text
///   base                      boundary
///    |                           |
///    v                           v
///    +---------------------------+- - - - - - - - - - - - -+
///    |  granted (read + write)   |     not granted yet     |
///    +---------------------------+- - - - - - - - - - - - -+
///                                 \_ extend(len) returns this
///                                    address and moves the
///                                    boundary len bytes up
/// ```
///
/// # Safety
///
/// Implementors must guarantee that:
/// - `extend(len)` returns the boundary as it was before the call and that
///   `len` bytes starting there are readable and writable until a `reset`
///   moves the boundary below them.
/// - Consecutive grants are contiguous.
/// - `reset` only accepts boundaries previously returned by `boundary`.
pub unsafe trait BulkMemory {
    /// Current boundary. Nothing at or above it belongs to the caller.
    fn boundary(&self) -> NonNull<u8>;

    /// Moves the boundary up by `len` bytes. Returns the old boundary, which
    /// is the start of the granted region, or `None` if the platform refused.
    fn extend(&mut self, len: usize) -> Option<NonNull<u8>>;

    /// Moves the boundary back down to `boundary`. Returns `false` (and does
    /// nothing) if `boundary` is not between the base and the current boundary.
    fn reset(&mut self, boundary: NonNull<u8>) -> bool;
}

/// This trait provides an abstraction to handle low level memory operations
/// and syscalls. The arena has nothing to do with the concrete APIs offered
/// by each kernel.
trait PlatformMemory {
    /// Reserves `len` bytes of address space without making them accessible.
    unsafe fn reserve(len: usize) -> Option<NonNull<u8>>;

    /// Makes `len` bytes starting at the page aligned `addr` readable and writable.
    unsafe fn commit(addr: NonNull<u8>, len: usize) -> bool;

    /// Returns the whole reservation back to the kernel.
    unsafe fn release(addr: NonNull<u8>, len: usize);

    /// Returns the virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// A private program break: a fixed range of reserved address space whose
/// pages get committed as the boundary moves past them.
///
/// It stands in for `sbrk`, whose break is shared with the system allocator.
///
/// Pages stay committed after a `reset`, the next `extend` reuses them.
pub struct VirtualArena {
    /// Start of the reservation.
    base: NonNull<u8>,
    /// Reserved bytes, a multiple of the page size.
    capacity: usize,
    /// Offset of the boundary from `base`.
    cursor: usize,
    /// Offset up to which pages are accessible.
    committed: usize,
}

// The reservation is owned exclusively by this value.
unsafe impl Send for VirtualArena {}

impl VirtualArena {
    /// Reserves at least `capacity` bytes of address space.
    pub fn reserve(capacity: usize) -> Result<Self, AllocError> {
        let capacity = checked_align(capacity.max(1), page_size())
            .ok_or(AllocError::Reserve { capacity })?;

        let base = unsafe { Self::reserve_platform(capacity) }
            .ok_or(AllocError::Reserve { capacity })?;

        debug!(base = ?base, capacity, "reserved arena");

        Ok(Self {
            base,
            capacity,
            cursor: 0,
            committed: 0,
        })
    }

    /// Total bytes that can ever be granted.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Start of the reservation.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    #[inline]
    unsafe fn reserve_platform(len: usize) -> Option<NonNull<u8>> {
        unsafe { <Self as PlatformMemory>::reserve(len) }
    }
}

unsafe impl BulkMemory for VirtualArena {
    fn boundary(&self) -> NonNull<u8> {
        unsafe { self.base.add(self.cursor) }
    }

    fn extend(&mut self, len: usize) -> Option<NonNull<u8>> {
        let end = self.cursor.checked_add(len).filter(|end| *end <= self.capacity)?;

        if end > self.committed {
            // Capacity is page aligned so this never passes the reservation.
            let commit_end = align(end, page_size());

            unsafe {
                let addr = self.base.add(self.committed);

                if !<Self as PlatformMemory>::commit(addr, commit_end - self.committed) {
                    return None;
                }
            }

            self.committed = commit_end;
        }

        let start = self.boundary();
        self.cursor = end;

        Some(start)
    }

    fn reset(&mut self, boundary: NonNull<u8>) -> bool {
        let Some(offset) = (boundary.as_ptr() as usize).checked_sub(self.base.as_ptr() as usize)
        else {
            return false;
        };

        if offset > self.cursor {
            return false;
        }

        self.cursor = offset;
        true
    }
}

impl Drop for VirtualArena {
    fn drop(&mut self) {
        unsafe { <Self as PlatformMemory>::release(self.base, self.capacity) }
    }
}

/// Wrapper to calculate the computer's page size.
#[inline]
pub fn page_size() -> usize {
    match PAGE_SIZE.load(Ordering::Relaxed) {
        0 => {
            let size = unsafe { <VirtualArena as PlatformMemory>::page_size() };
            PAGE_SIZE.store(size, Ordering::Relaxed);
            size
        }
        size => size,
    }
}

#[cfg(unix)]
mod unix {
    use super::{PlatformMemory, VirtualArena};

    use libc::{mmap, mprotect, munmap, off_t, size_t};

    use std::{os::raw::{c_int, c_void}, ptr::NonNull};

    impl PlatformMemory for VirtualArena {
        unsafe fn reserve(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // No access until committed.
            const PROT: c_int = libc::PROT_NONE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                if addr == libc::MAP_FAILED {
                    return None;
                }

                NonNull::new(addr.cast::<u8>())
            }
        }

        unsafe fn commit(addr: NonNull<u8>, len: usize) -> bool {
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;

            unsafe { mprotect(addr.as_ptr().cast::<c_void>(), len as size_t, PROT) == 0 }
        }

        unsafe fn release(addr: NonNull<u8>, len: usize) {
            unsafe { munmap(addr.as_ptr().cast::<c_void>(), len as size_t); }
        }

        unsafe fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::{mem::MaybeUninit, os::raw::c_void, ptr::NonNull};

    use super::{PlatformMemory, VirtualArena};

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for VirtualArena {
        unsafe fn reserve(len: usize) -> Option<NonNull<u8>> {
            unsafe {
                let addr = Memory::VirtualAlloc(None, len, Memory::MEM_RESERVE, Memory::PAGE_NOACCESS);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn commit(addr: NonNull<u8>, len: usize) -> bool {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            unsafe {
                let addr = Memory::VirtualAlloc(
                    Some(addr.as_ptr() as *const c_void),
                    len,
                    Memory::MEM_COMMIT,
                    protection,
                );

                !addr.is_null()
            }
        }

        unsafe fn release(addr: NonNull<u8>, _len: usize) {
            unsafe { let _ = Memory::VirtualFree(addr.as_ptr() as *mut c_void, 0, Memory::MEM_RELEASE); }
        }

        unsafe fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}
