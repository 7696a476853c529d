//! AES-256-GCM authenticated encryption.
//!
//! `seal` generates a fresh random 12-byte nonce on every call; callers
//! cannot supply one.  Encryption happens in place inside a locked scratch
//! buffer, so the plaintext is never copied into ordinary memory.  The
//! 16-byte tag is returned detached and the ciphertext has exactly the
//! plaintext's length.
//!
//! `open` verifies the tag in constant time before any plaintext byte is
//! produced.  Every failure is reported as the same `Integrity` error.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce as GcmNonce, Tag as GcmTag};

use super::kdf::DerivedKey;
use super::memory::LockedBuffer;
use super::runtime::fill_random;
use crate::errors::{LockboxError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// A 96-bit nonce.  Public, persisted next to its ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    fn generate() -> Result<Self> {
        let mut bytes = [0u8; NONCE_LEN];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Rebuild a nonce read back from storage.
    pub fn from_bytes(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

/// A 128-bit authentication tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    pub fn from_bytes(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

/// Output of `seal`.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub nonce: Nonce,
    pub ciphertext: Vec<u8>,
    pub tag: Tag,
}

/// Encrypt and authenticate `plaintext` under `key`.
pub fn seal(plaintext: &LockedBuffer, key: &DerivedKey, associated_data: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| LockboxError::Encryption(format!("invalid key length: {e}")))?;

    let nonce = Nonce::generate()?;

    // Encrypt a locked copy in place; it is wiped when `work` drops.
    let mut work = plaintext.try_clone()?;
    let tag = cipher
        .encrypt_in_place_detached(
            GcmNonce::from_slice(nonce.as_bytes()),
            associated_data,
            work.as_mut_slice(),
        )
        .map_err(|e| LockboxError::Encryption(format!("encryption error: {e}")))?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(Sealed {
        nonce,
        ciphertext: work.as_slice().to_vec(),
        tag: Tag(tag_bytes),
    })
}

/// Verify and decrypt data produced by `seal`.
///
/// Returns the plaintext in locked memory, or `Integrity` on any mismatch.
pub fn open(
    nonce: &Nonce,
    ciphertext: &[u8],
    tag: &Tag,
    key: &DerivedKey,
    associated_data: &[u8],
) -> Result<LockedBuffer> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| LockboxError::Integrity)?;

    let mut plaintext = LockedBuffer::from_slice(ciphertext)?;
    cipher
        .decrypt_in_place_detached(
            GcmNonce::from_slice(nonce.as_bytes()),
            associated_data,
            plaintext.as_mut_slice(),
            GcmTag::from_slice(tag.as_bytes()),
        )
        .map_err(|_| LockboxError::Integrity)?;

    Ok(plaintext)
}
