//! Shared pool of locked pages backing every `LockedBuffer`.
//!
//! Small requests are carved out of slab pages split into equal,
//! power-of-two slots.  A slab page is pinned once, when it is created, and
//! stays pinned while any of its slots is live; releasing the last slot
//! zeroes the page, unpins it and frees it.  Requests larger than half a
//! page get whole pages of their own, pinned and unpinned with the block.
//!
//! Packing secrets this way keeps the number of locked pages proportional
//! to the bytes actually held, so thousands of short passwords fit well
//! inside a default `RLIMIT_MEMLOCK`.

use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::{Mutex, MutexGuard, PoisonError};

use zeroize::Zeroize;

use crate::errors::{LockboxError, Result};

/// Smallest slot handed out from a slab page.
const MIN_SLOT: usize = 16;

/// A region handed out by the pool.  Released with `SecurePool::release`.
#[derive(Debug)]
pub(crate) struct Block {
    ptr: NonNull<u8>,
    capacity: usize,
    kind: BlockKind,
}

#[derive(Debug)]
enum BlockKind {
    /// A slot inside a shared slab page.
    Slot,
    /// Whole pages owned by this block alone.
    Pages(Layout),
}

impl Block {
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Usable bytes, always at least the requested length.
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug)]
pub(crate) struct SecurePool {
    page_size: usize,
    page_layout: Layout,
    state: Mutex<PoolState>,
}

#[derive(Debug, Default)]
struct PoolState {
    /// Slab pages keyed by base address.
    slabs: HashMap<usize, Slab>,
    /// Pages currently pinned by `BlockKind::Pages` blocks.
    dedicated_pages: usize,
}

#[derive(Debug)]
struct Slab {
    base: NonNull<u8>,
    slot_size: usize,
    free: Vec<usize>,
    live: usize,
}

// SAFETY: a slab exclusively owns its page and is only touched while the
// pool mutex is held.
unsafe impl Send for Slab {}

impl Slab {
    /// Split a freshly pinned page into slots and take the first one.
    fn carve(base: NonNull<u8>, slot_size: usize, page_size: usize) -> (Self, usize) {
        let free = (1..page_size / slot_size).rev().map(|i| i * slot_size).collect();
        let slab = Self { base, slot_size, free, live: 1 };
        (slab, 0)
    }

    fn take(&mut self, slot_size: usize) -> Option<usize> {
        if self.slot_size != slot_size {
            return None;
        }
        let offset = self.free.pop()?;
        self.live += 1;
        Some(offset)
    }
}

impl SecurePool {
    pub(crate) fn new(page_size: usize) -> Result<Self> {
        let page_layout = Layout::from_size_align(page_size, page_size)
            .map_err(|e| LockboxError::MemoryLock(format!("invalid page size {page_size}: {e}")))?;
        Ok(Self {
            page_size,
            page_layout,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Reserve a zero-filled, pinned region of at least `len` bytes.
    ///
    /// Fails with `MemoryLock` if new pages cannot be pinned; those pages
    /// are freed before returning.
    pub(crate) fn acquire(&self, len: usize) -> Result<Block> {
        match len.max(MIN_SLOT).checked_next_power_of_two() {
            Some(slot_size) if slot_size <= self.page_size / 2 => self.acquire_slot(slot_size),
            _ => self.acquire_pages(len),
        }
    }

    /// Return a block to the pool.  Call exactly once per block, after its
    /// bytes have been zeroed.
    pub(crate) fn release(&self, block: &Block) {
        let mut state = self.state();
        match block.kind {
            BlockKind::Pages(layout) => {
                state.dedicated_pages -= layout.size() / self.page_size;
                drop(state);
                self.unpin_and_free(block.ptr, layout);
            }
            BlockKind::Slot => {
                let addr = block.ptr.as_ptr() as usize;
                let page = addr & !(self.page_size - 1);
                let Some(slab) = state.slabs.get_mut(&page) else {
                    tracing::warn!(addr, "released slot has no owning slab page");
                    return;
                };
                slab.free.push(addr - page);
                slab.live -= 1;
                if slab.live > 0 {
                    return;
                }
                if let Some(slab) = state.slabs.remove(&page) {
                    drop(state);
                    self.unpin_and_free(slab.base, self.page_layout);
                }
            }
        }
    }

    /// Number of pages this pool currently holds pinned.
    pub(crate) fn pinned_pages(&self) -> usize {
        let state = self.state();
        state.slabs.len() + state.dedicated_pages
    }

    fn acquire_slot(&self, slot_size: usize) -> Result<Block> {
        let mut state = self.state();

        let reused = state.slabs.values_mut().find_map(|slab| {
            slab.take(slot_size).map(|offset| (slab.base, offset))
        });

        let (base, offset) = match reused {
            Some(found) => found,
            None => {
                let base = self.pin_new(self.page_layout)?;
                let (slab, offset) = Slab::carve(base, slot_size, self.page_size);
                state.slabs.insert(base.as_ptr() as usize, slab);
                tracing::trace!(slot_size, pages = state.slabs.len(), "pinned new slab page");
                (base, offset)
            }
        };

        // SAFETY: `offset + slot_size <= page_size`, inside the slab page.
        let ptr = unsafe { NonNull::new_unchecked(base.as_ptr().add(offset)) };
        Ok(Block {
            ptr,
            capacity: slot_size,
            kind: BlockKind::Slot,
        })
    }

    fn acquire_pages(&self, len: usize) -> Result<Block> {
        let page = self.page_size;
        let capacity = len
            .checked_add(page - 1)
            .map(|n| n / page * page)
            .ok_or_else(|| LockboxError::MemoryLock(format!("buffer of {len} bytes is too large")))?;
        let layout = Layout::from_size_align(capacity, page)
            .map_err(|e| LockboxError::MemoryLock(format!("invalid layout: {e}")))?;

        let ptr = self.pin_new(layout)?;
        self.state().dedicated_pages += capacity / page;

        Ok(Block {
            ptr,
            capacity,
            kind: BlockKind::Pages(layout),
        })
    }

    fn pin_new(&self, layout: Layout) -> Result<NonNull<u8>> {
        // SAFETY: `layout` has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            LockboxError::MemoryLock(format!("failed to allocate {} bytes", layout.size()))
        })?;

        if let Err(err) = sys::lock(ptr.as_ptr(), layout.size()) {
            // SAFETY: allocated above with `layout` and never handed out.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
            return Err(LockboxError::MemoryLock(format!(
                "mlock of {} bytes failed: {err}",
                layout.size()
            )));
        }

        Ok(ptr)
    }

    fn unpin_and_free(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: `ptr` was allocated by `pin_new` with `layout` and no
        // block referencing it is still live.
        unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), layout.size()) }.zeroize();

        if let Err(err) = sys::unlock(ptr.as_ptr(), layout.size()) {
            tracing::warn!(
                bytes = layout.size(),
                error = %err,
                "failed to unlock secret memory"
            );
        }

        // SAFETY: as above.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
    }

    fn state(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(unix)]
pub(crate) mod sys {
    use std::io;

    #[cfg(test)]
    use std::cell::Cell;

    #[cfg(test)]
    thread_local! {
        static FAIL_NEXT_LOCK: Cell<bool> = const { Cell::new(false) };
    }

    /// Make the next `lock` on this thread fail with `ENOMEM`.
    #[cfg(test)]
    pub(crate) fn fail_next_lock() {
        FAIL_NEXT_LOCK.with(|flag| flag.set(true));
    }

    pub(super) fn lock(ptr: *const u8, len: usize) -> io::Result<()> {
        #[cfg(test)]
        if FAIL_NEXT_LOCK.with(|flag| flag.replace(false)) {
            return Err(io::Error::from_raw_os_error(libc::ENOMEM));
        }

        // SAFETY: `ptr..ptr + len` is a live allocation owned by the caller.
        let rc = unsafe { libc::mlock(ptr.cast(), len) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub(super) fn unlock(ptr: *const u8, len: usize) -> io::Result<()> {
        // SAFETY: as for `lock`.
        let rc = unsafe { libc::munlock(ptr.cast(), len) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}

#[cfg(not(unix))]
pub(crate) mod sys {
    use std::io;

    pub(super) fn lock(_ptr: *const u8, _len: usize) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "memory locking is only supported on Unix platforms",
        ))
    }

    pub(super) fn unlock(_ptr: *const u8, _len: usize) -> io::Result<()> {
        Ok(())
    }
}
