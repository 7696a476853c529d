//! Vault module — the encrypted credential container.
//!
//! This module provides:
//! - The `Entry` record type (`entry`)
//! - Length-prefixed payload encoding (`codec`)
//! - The binary container layout (`format`)
//! - The `VaultContainer` session with its five operations (`container`)
//! - Atomic file persistence (`storage`)

pub mod codec;
pub mod container;
pub mod entry;
pub mod format;
pub mod storage;

// Re-export the most commonly used items.
pub use container::{VaultContainer, VaultState};
pub use entry::Entry;
pub use format::MIN_CONTAINER_LEN;
