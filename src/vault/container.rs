//! The vault session: salt, derived key and entries of one open vault.
//!
//! `VaultContainer` ties the crypto layer, the codec and the container
//! layout together behind five operations: `initialize`, `add_entry`,
//! `save`, `load` and `close`.
//!
//! Lifecycle: there is no uninitialized value (the only constructors are
//! `initialize` and `load`), a fresh container is `Open`, and `close`
//! moves it to `Closed` for good.  The container is not meant to be shared
//! between threads; wrap it in a mutex if you must.

use tracing::debug;

use super::codec;
use super::entry::Entry;
use super::format;
use crate::crypto::kdf::{self, DerivedKey, Salt, DEFAULT_ITERATIONS};
use crate::crypto::{encryption, LockedBuffer};
use crate::errors::{LockboxError, Result};

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// Session key held; entries readable and writable.
    Open,
    /// Key and passwords wiped; every operation fails.
    Closed,
}

/// An open (or closed) vault session.
#[derive(Debug)]
pub struct VaultContainer {
    /// Public salt, stored at the front of the file.
    salt: Salt,

    /// PBKDF2 iteration count the key was derived with.
    iterations: u32,

    /// Session key.  Never persisted.
    key: DerivedKey,

    /// Entries in insertion order.
    entries: Vec<Entry>,

    state: VaultState,
}

impl VaultContainer {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Start a brand-new vault.
    ///
    /// Generates a random salt, derives the session key from the password
    /// and starts with no entries.
    pub fn initialize(master_password: &LockedBuffer, iterations: u32) -> Result<Self> {
        let salt = Salt::generate()?;
        let key = kdf::derive(master_password, &salt, iterations)?;

        debug!(iterations, "vault initialized");

        Ok(Self {
            salt,
            iterations,
            key,
            entries: Vec::new(),
            state: VaultState::Open,
        })
    }

    /// Open container bytes produced by `save`, using the default
    /// iteration count.
    pub fn load(container_bytes: &[u8], master_password: &LockedBuffer) -> Result<Self> {
        Self::load_with_iterations(container_bytes, master_password, DEFAULT_ITERATIONS)
    }

    /// Open container bytes whose key was derived with `iterations` rounds.
    ///
    /// All-or-nothing: the key is re-derived and the payload authenticated
    /// before any entry is decoded.  On failure every intermediate secret
    /// is dropped, and therefore wiped, before the error is returned.
    pub fn load_with_iterations(
        container_bytes: &[u8],
        master_password: &LockedBuffer,
        iterations: u32,
    ) -> Result<Self> {
        let parts = format::parse_container(container_bytes)?;

        let key = kdf::derive(master_password, &parts.salt, iterations)?;

        let payload = encryption::open(&parts.nonce, parts.ciphertext, &parts.tag, &key, &[])?;
        let entries = codec::decode(payload.as_slice())?;

        debug!(entries = entries.len(), iterations, "vault loaded");

        Ok(Self {
            salt: parts.salt,
            iterations,
            key,
            entries,
            state: VaultState::Open,
        })
    }

    // ------------------------------------------------------------------
    // Entry operations
    // ------------------------------------------------------------------

    /// Append an entry.  Takes ownership of the password buffer.
    pub fn add_entry(&mut self, service: &str, username: &str, password: LockedBuffer) -> Result<()> {
        self.ensure_open("add_entry")?;
        self.entries.push(Entry::new(service, username, password));
        Ok(())
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Result<&[Entry]> {
        self.ensure_open("entries")?;
        Ok(&self.entries)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encode and seal the entries into container bytes.
    ///
    /// Every call uses a fresh nonce.  In-memory state is untouched.
    pub fn save(&self) -> Result<Vec<u8>> {
        self.ensure_open("save")?;

        let payload = codec::encode(&self.entries)?;
        let sealed = encryption::seal(&payload, &self.key, &[])?;
        let bytes = format::write_container(&self.salt, &sealed);

        debug!(entries = self.entries.len(), bytes = bytes.len(), "vault sealed");
        Ok(bytes)
    }

    /// Wipe the session key and every entry password, then close.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open("close")?;

        self.key.wipe();
        for entry in &mut self.entries {
            entry.wipe_password();
        }
        self.state = VaultState::Closed;

        debug!("vault closed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> VaultState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == VaultState::Open
    }

    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        match self.state {
            VaultState::Open => Ok(()),
            VaultState::Closed => Err(LockboxError::InvalidState(format!(
                "cannot {operation}: vault is closed"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::init;

    fn secret(bytes: &[u8]) -> LockedBuffer {
        init().unwrap();
        LockedBuffer::from_slice(bytes).unwrap()
    }

    fn open_vault() -> VaultContainer {
        let mut vault = VaultContainer::initialize(&secret(b"master"), 10).unwrap();
        vault.add_entry("a.example", "alice", secret(b"pw-a")).unwrap();
        vault.add_entry("b.example", "bob", secret(b"pw-b")).unwrap();
        vault
    }

    #[test]
    fn close_wipes_key_and_passwords() {
        let mut vault = open_vault();
        assert!(vault.key.as_bytes().iter().any(|&b| b != 0));

        vault.close().unwrap();

        assert_eq!(vault.state(), VaultState::Closed);
        assert!(vault.key.as_bytes().iter().all(|&b| b == 0));
        for entry in &vault.entries {
            assert!(!entry.password().is_empty());
            assert!(entry.password().as_slice().iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn operations_after_close_fail_with_invalid_state() {
        let mut vault = open_vault();
        vault.close().unwrap();

        assert!(matches!(
            vault.add_entry("c", "carol", secret(b"x")),
            Err(LockboxError::InvalidState(_))
        ));
        assert!(matches!(vault.save(), Err(LockboxError::InvalidState(_))));
        assert!(matches!(vault.entries(), Err(LockboxError::InvalidState(_))));
        assert!(matches!(vault.close(), Err(LockboxError::InvalidState(_))));
    }

    #[test]
    fn save_does_not_mutate_state() {
        let vault = open_vault();
        let first = vault.save().unwrap();
        let second = vault.save().unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first[..16], second[..16]);
        assert_ne!(first[16..28], second[16..28]);
        assert_eq!(vault.entries().unwrap().len(), 2);
        assert!(vault.is_open());
    }

    #[test]
    fn loaded_container_keeps_salt_and_iterations() {
        let vault = open_vault();
        let bytes = vault.save().unwrap();
        let loaded = VaultContainer::load_with_iterations(&bytes, &secret(b"master"), 10).unwrap();
        assert_eq!(loaded.salt(), vault.salt());
        assert_eq!(loaded.iterations(), 10);
        assert_eq!(loaded.key.as_bytes(), vault.key.as_bytes());
    }
}
