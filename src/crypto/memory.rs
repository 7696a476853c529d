//! Locked, self-wiping memory for secrets.
//!
//! A `LockedBuffer` is a region carved out of the process-wide
//! [`SecurePool`](super::pool), which keeps its pages pinned with
//! `mlock(2)` so they are never written to swap.  Regions never overlap,
//! and a page is unpinned only once every buffer on it has been dropped.
//!
//! Teardown order on drop: zero the whole region, hand it back to the
//! pool, which unpins and frees the page when its last user is gone.  A
//! failed unlock is logged and teardown continues.

use std::fmt;
use std::slice;

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::pool::{Block, SecurePool};
use super::runtime;
use crate::errors::Result;

/// A fixed-size byte buffer held in locked memory and zeroed on release.
pub struct LockedBuffer {
    block: Block,
    len: usize,
    pool: &'static SecurePool,
}

// SAFETY: the buffer exclusively owns its region; shared access only
// hands out `&[u8]`.
unsafe impl Send for LockedBuffer {}
unsafe impl Sync for LockedBuffer {}

impl LockedBuffer {
    /// Allocate and lock a zero-filled buffer of exactly `len` bytes.
    ///
    /// Fails with `MemoryLock` if the backing pages cannot be pinned; in
    /// that case nothing is left allocated.
    pub fn allocate(len: usize) -> Result<Self> {
        let pool = runtime::current()?.pool();
        let block = pool.acquire(len)?;
        Ok(Self { block, len, pool })
    }

    /// Allocate a locked buffer holding a copy of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let mut buffer = Self::allocate(bytes.len())?;
        buffer.as_mut_slice().copy_from_slice(bytes);
        Ok(buffer)
    }

    /// Copy the contents into a new, separately locked buffer.
    pub fn try_clone(&self) -> Result<Self> {
        Self::from_slice(self.as_slice())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the block is valid for `capacity >= len` initialized bytes.
        unsafe { slice::from_raw_parts(self.block.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { slice::from_raw_parts_mut(self.block.as_ptr(), self.len) }
    }

    /// Overwrite the contents with zeros, keeping the buffer allocated.
    pub fn wipe(&mut self) {
        self.whole_region().zeroize();
    }

    /// Constant-time equality of contents.
    pub fn ct_eq(&self, other: &Self) -> bool {
        self.as_slice().ct_eq(other.as_slice()).into()
    }

    fn whole_region(&mut self) -> &mut [u8] {
        // SAFETY: the block spans exactly `capacity` bytes owned by `self`.
        unsafe { slice::from_raw_parts_mut(self.block.as_ptr(), self.block.capacity()) }
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        self.whole_region().zeroize();
        self.pool.release(&self.block);
    }
}

impl PartialEq for LockedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other)
    }
}

impl Eq for LockedBuffer {}

impl fmt::Debug for LockedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LockedBuffer([REDACTED; {} bytes])", self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::init;

    #[test]
    fn allocate_returns_zeroed_buffer_of_requested_len() {
        init().unwrap();
        let buffer = LockedBuffer::allocate(37).unwrap();
        assert_eq!(buffer.len(), 37);
        assert!(buffer.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_length_buffer_is_usable() {
        init().unwrap();
        let buffer = LockedBuffer::allocate(0).unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.as_slice().is_empty());
    }

    #[test]
    fn from_slice_copies_contents() {
        init().unwrap();
        let buffer = LockedBuffer::from_slice(b"hunter2").unwrap();
        assert_eq!(buffer.as_slice(), b"hunter2");
    }

    #[test]
    fn wipe_zeroes_contents_in_place() {
        init().unwrap();
        let mut buffer = LockedBuffer::from_slice(&[0xAA; 64]).unwrap();
        buffer.wipe();
        assert_eq!(buffer.len(), 64);
        assert!(buffer.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn try_clone_does_not_alias() {
        init().unwrap();
        let original = LockedBuffer::from_slice(b"secret").unwrap();
        let mut copy = original.try_clone().unwrap();
        copy.as_mut_slice()[0] = b'S';
        assert_eq!(original.as_slice(), b"secret");
        assert_eq!(copy.as_slice(), b"Secret");
    }

    #[test]
    fn buffers_never_overlap() {
        init().unwrap();
        let a = LockedBuffer::from_slice(&[0x11; 8]).unwrap();
        let b = LockedBuffer::from_slice(&[0x22; 8]).unwrap();
        let (pa, pb) = (a.block.as_ptr() as usize, b.block.as_ptr() as usize);
        assert!(pa + a.block.capacity() <= pb || pb + b.block.capacity() <= pa);
        assert_eq!(a.as_slice(), &[0x11; 8]);
        assert_eq!(b.as_slice(), &[0x22; 8]);
    }

    #[test]
    fn dropping_a_neighbour_keeps_contents_intact() {
        init().unwrap();
        let keep = LockedBuffer::from_slice(b"long-lived key").unwrap();
        for _ in 0..64 {
            let neighbour = LockedBuffer::from_slice(b"short-lived").unwrap();
            drop(neighbour);
        }
        assert_eq!(keep.as_slice(), b"long-lived key");
    }

    #[test]
    fn thousands_of_small_buffers_fit() {
        init().unwrap();
        let buffers: Vec<LockedBuffer> = (0..3000u32)
            .map(|i| LockedBuffer::from_slice(&i.to_be_bytes()[2..]).unwrap())
            .collect();
        for (i, buffer) in buffers.iter().enumerate() {
            assert_eq!(buffer.as_slice(), &(i as u32).to_be_bytes()[2..]);
        }
    }

    #[cfg(unix)]
    #[test]
    fn pinning_failure_is_a_memory_lock_error() {
        use crate::crypto::pool::sys;
        use crate::errors::LockboxError;

        let page = init().unwrap().page_size();
        sys::fail_next_lock();

        // Larger than a slab slot, so the request always pins fresh pages.
        let result = LockedBuffer::allocate(page * 2);
        assert!(matches!(result, Err(LockboxError::MemoryLock(_))));

        let buffer = LockedBuffer::allocate(page * 2).unwrap();
        assert_eq!(buffer.len(), page * 2);
    }

    #[test]
    fn equality_compares_contents() {
        init().unwrap();
        let a = LockedBuffer::from_slice(b"same").unwrap();
        let b = LockedBuffer::from_slice(b"same").unwrap();
        let c = LockedBuffer::from_slice(b"diff").unwrap();
        let d = LockedBuffer::from_slice(b"longer").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn debug_output_is_redacted() {
        init().unwrap();
        let buffer = LockedBuffer::from_slice(b"p@ssw0rd").unwrap();
        let rendered = format!("{buffer:?}");
        assert!(!rendered.contains("p@ssw0rd"));
        assert!(rendered.contains("REDACTED"));
    }
}
