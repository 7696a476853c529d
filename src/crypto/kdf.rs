//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The derived key is written straight into locked memory; the salt is
//! public and travels in plaintext at the front of the vault file.

use std::fmt;

use hmac::Hmac;
use pbkdf2::pbkdf2;
use sha2::Sha256;

use super::memory::LockedBuffer;
use super::runtime::fill_random;
use crate::errors::{LockboxError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Iteration count used when none is configured.
pub const DEFAULT_ITERATIONS: u32 = 200_000;

/// Configured counts below this are accepted but logged as weak.
pub const RECOMMENDED_MIN_ITERATIONS: u32 = 100_000;

/// Per-vault random salt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_LEN]);

impl Salt {
    /// Generate a fresh salt from the OS random source.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; SALT_LEN];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SALT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_LEN] {
        &self.0
    }
}

/// A 32-byte symmetric key held in locked memory.
///
/// Not `Clone`: a session owns exactly one copy of its key.
pub struct DerivedKey(LockedBuffer);

impl DerivedKey {
    /// Access the raw key bytes (e.g. to key the cipher).
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    pub(crate) fn wipe(&mut self) {
        self.0.wipe();
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive a 32-byte key from a password and salt.
///
/// The same password + salt + iterations always produce the same key.
pub fn derive(password: &LockedBuffer, salt: &Salt, iterations: u32) -> Result<DerivedKey> {
    if iterations < 1 {
        return Err(LockboxError::KeyDerivation(
            "iteration count must be at least 1".into(),
        ));
    }

    let mut key = LockedBuffer::allocate(KEY_LEN)?;
    pbkdf2::<Hmac<Sha256>>(password.as_slice(), salt.as_bytes(), iterations, key.as_mut_slice())
        .map_err(|e| LockboxError::KeyDerivation(format!("PBKDF2-HMAC-SHA256 failed: {e}")))?;

    Ok(DerivedKey(key))
}
