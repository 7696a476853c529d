//! Binary vault container layout.
//!
//! A vault file has this layout:
//!
//! ```text
//! [salt: 16 bytes][nonce: 12 bytes][ciphertext: len bytes][tag: 16 bytes]
//! ```
//!
//! - **Salt**: public PBKDF2 salt, one per vault.
//! - **Nonce**: AES-256-GCM nonce used for this particular save.
//! - **Ciphertext**: the sealed entry payload (same length as the payload).
//! - **Tag**: GCM authentication tag over the ciphertext.
//!
//! There is no magic or version prefix; the file is exactly
//! `44 + len` bytes.

use crate::crypto::{Nonce, Salt, Sealed, Tag, NONCE_LEN, SALT_LEN, TAG_LEN};
use crate::errors::{LockboxError, Result};

/// Offset of the nonce within the file.
const NONCE_OFFSET: usize = SALT_LEN;

/// Offset of the ciphertext within the file.
const CIPHERTEXT_OFFSET: usize = SALT_LEN + NONCE_LEN;

/// Smallest valid container: salt + nonce + tag around an empty ciphertext.
pub const MIN_CONTAINER_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// A container split into its parts.  The ciphertext borrows the input.
#[derive(Debug)]
pub struct ContainerParts<'a> {
    pub salt: Salt,
    pub nonce: Nonce,
    pub ciphertext: &'a [u8],
    pub tag: Tag,
}

/// Lay out `salt` and a sealed payload as container bytes.
pub fn write_container(salt: &Salt, sealed: &Sealed) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MIN_CONTAINER_LEN + sealed.ciphertext.len());
    buf.extend_from_slice(salt.as_bytes()); // 16 bytes
    buf.extend_from_slice(sealed.nonce.as_bytes()); // 12 bytes
    buf.extend_from_slice(&sealed.ciphertext); // len bytes
    buf.extend_from_slice(sealed.tag.as_bytes()); // 16 bytes
    buf
}

/// Split container bytes into salt, nonce, ciphertext and tag.
///
/// Only checks framing; authenticity is established later by `open`.
pub fn parse_container(data: &[u8]) -> Result<ContainerParts<'_>> {
    if data.len() < MIN_CONTAINER_LEN {
        return Err(LockboxError::Format(format!(
            "file is {} bytes, a vault needs at least {MIN_CONTAINER_LEN}",
            data.len()
        )));
    }

    let tag_offset = data.len() - TAG_LEN;

    let salt: [u8; SALT_LEN] = data[..NONCE_OFFSET]
        .try_into()
        .map_err(|_| LockboxError::Format("bad salt".into()))?;
    let nonce: [u8; NONCE_LEN] = data[NONCE_OFFSET..CIPHERTEXT_OFFSET]
        .try_into()
        .map_err(|_| LockboxError::Format("bad nonce".into()))?;
    let tag: [u8; TAG_LEN] = data[tag_offset..]
        .try_into()
        .map_err(|_| LockboxError::Format("bad tag".into()))?;

    Ok(ContainerParts {
        salt: Salt::from_bytes(salt),
        nonce: Nonce::from_bytes(nonce),
        ciphertext: &data[CIPHERTEXT_OFFSET..tag_offset],
        tag: Tag::from_bytes(tag),
    })
}
