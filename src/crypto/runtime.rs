//! Process-wide crypto runtime.
//!
//! `init` must run once before any `LockedBuffer` is allocated.  It records
//! the system page size, sets up the shared pool of locked pages and
//! probes the OS random source so a broken CSPRNG is reported up front
//! instead of on the first seal.  There is no teardown.

use std::sync::OnceLock;

use rand::rngs::OsRng;
use rand::TryRngCore;

use super::pool::SecurePool;
use crate::errors::{LockboxError, Result};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Facts about the host gathered by `init`.
#[derive(Debug)]
pub struct Runtime {
    page_size: usize,
    pool: SecurePool,
}

impl Runtime {
    /// Size in bytes of one virtual memory page.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages currently pinned on behalf of live `LockedBuffer`s.
    pub fn pinned_pages(&self) -> usize {
        self.pool.pinned_pages()
    }

    pub(crate) fn pool(&self) -> &SecurePool {
        &self.pool
    }
}

/// Initialize the crypto runtime.  Safe to call more than once.
pub fn init() -> Result<&'static Runtime> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }

    let page_size = query_page_size()?;
    let pool = SecurePool::new(page_size)?;

    let mut probe = [0u8; 16];
    fill_random(&mut probe)?;

    let runtime = RUNTIME.get_or_init(|| Runtime { page_size, pool });
    tracing::debug!(page_size = runtime.page_size, "crypto runtime initialized");
    Ok(runtime)
}

/// Return the initialized runtime, or `InvalidState` if `init` never ran.
pub(crate) fn current() -> Result<&'static Runtime> {
    RUNTIME.get().ok_or_else(|| {
        LockboxError::InvalidState(
            "crypto runtime not initialized — call lockbox::crypto::init() first".into(),
        )
    })
}

/// Fill `buf` from the operating system CSPRNG.
///
/// Never falls back to a weaker generator.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| LockboxError::Random(e.to_string()))
}

#[cfg(unix)]
fn query_page_size() -> Result<usize> {
    // SAFETY: sysconf has no memory-safety preconditions.
    let raw = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(raw)
        .ok()
        .filter(|size| size.is_power_of_two())
        .ok_or_else(|| LockboxError::MemoryLock(format!("cannot determine page size (got {raw})")))
}

#[cfg(not(unix))]
fn query_page_size() -> Result<usize> {
    Err(LockboxError::MemoryLock(
        "memory locking is only supported on Unix platforms".into(),
    ))
}
