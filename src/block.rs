use std::{mem, ptr::NonNull};
use crate::list::{Link, Linked};


/// Size of the header written at the start of every block, free or not.
pub const HEADER_SIZE: usize = mem::size_of::<Header>();

/// Alignment of [`Header`]. Every configured alignment must be at least this,
/// otherwise headers created by splitting could land on misaligned addresses.
pub(crate) const HEADER_ALIGN: usize = mem::align_of::<Header>();

/// This is the metadata at the start of every block. Content is placed right
/// after it, and that is the address handed out to the user.
///
/// ```text
/// +---------------------+ <------+
/// |        size         |        |
/// +---------------------+        | -> Header
/// |        next         |        |
/// +---------------------+ <------+ <- address returned by `acquire`
/// |       Content       |        |
/// |         ...         |        | -> Usable content (size - HEADER_SIZE)
/// |         ...         |        |
/// +---------------------+ <------+ <- start + size
/// ```
///
/// `size` counts the header itself, so the block at `start` ends exactly
/// at `start + size` and the next block in the arena (if any) begins there.
/// `next` only means something while the block sits in the free list.
#[repr(C)]
pub(crate) struct Header {
    /// Total size of the block, header included.
    pub size: usize,
    /// Next free block. Cleared while the block is allocated.
    pub next: Link<Header>,
}

impl Linked for Header {
    #[inline]
    fn next(&self) -> Link<Self> {
        self.next
    }

    #[inline]
    fn set_next(&mut self, next: Link<Self>) {
        self.next = next;
    }
}

impl Header {
    /// Writes a fresh, unlinked header of `size` bytes at `addr`.
    ///
    /// **SAFETY**: `addr` must be aligned to [`HEADER_ALIGN`] and `size` bytes
    /// starting at `addr` must be writable memory owned by the heap.
    pub unsafe fn write(addr: NonNull<u8>, size: usize) -> NonNull<Header> {
        let header = addr.cast::<Header>();

        unsafe {
            header.as_ptr().write(Header { size, next: None });
        }

        header
    }

    /// First byte of the block (the header itself).
    #[inline]
    pub fn start(block: NonNull<Header>) -> usize {
        block.as_ptr() as usize
    }

    /// One past the last byte of the block.
    ///
    /// **SAFETY**: `block` must point to a valid header.
    #[inline]
    pub unsafe fn end(block: NonNull<Header>) -> usize {
        unsafe { Self::start(block) + block.as_ref().size }
    }

    /// Address right after the header.
    ///
    /// **SAFETY**: `block` must point to a valid header.
    #[inline]
    pub unsafe fn payload(block: NonNull<Header>) -> NonNull<u8> {
        unsafe { block.cast::<u8>().add(HEADER_SIZE) }
    }

    /// Inverse of [`Header::payload`].
    ///
    /// **SAFETY**: `payload` must have been produced by [`Header::payload`].
    #[inline]
    pub unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<Header> {
        unsafe { payload.sub(HEADER_SIZE).cast() }
    }

    /// Bytes a caller can use in this block.
    ///
    /// **SAFETY**: `block` must point to a valid header.
    #[inline]
    pub unsafe fn usable(block: NonNull<Header>) -> usize {
        unsafe { block.as_ref().size - HEADER_SIZE }
    }
}
