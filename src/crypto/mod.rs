//! Cryptographic primitives for Lockbox.
//!
//! This module provides:
//! - Process-wide runtime initialization and the OS random source (`runtime`)
//! - A shared pool of pinned pages (`pool`)
//! - Locked, self-wiping secret memory (`memory`)
//! - PBKDF2-HMAC-SHA256 password-based key derivation (`kdf`)
//! - AES-256-GCM seal and open (`encryption`)

pub mod encryption;
pub mod kdf;
pub mod memory;
mod pool;
pub mod runtime;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{init, seal, open, derive, LockedBuffer, ...};
pub use encryption::{open, seal, Nonce, Sealed, Tag, NONCE_LEN, TAG_LEN};
pub use kdf::{derive, DerivedKey, Salt, DEFAULT_ITERATIONS, KEY_LEN, SALT_LEN};
pub use memory::LockedBuffer;
pub use runtime::init;
