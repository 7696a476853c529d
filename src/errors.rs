use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Lockbox.
#[derive(Debug, Error)]
pub enum LockboxError {
    // --- Secure memory errors ---
    #[error("Failed to lock secret memory: {0}")]
    MemoryLock(String),

    // --- Crypto errors ---
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Deliberately carries no detail: a wrong password and a corrupted
    /// file must be indistinguishable to the caller.
    #[error("Integrity check failed — wrong password or corrupted vault")]
    Integrity,

    #[error("Secure random source unavailable: {0}")]
    Random(String),

    // --- Vault errors ---
    #[error("Invalid vault format: {0}")]
    Format(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for Lockbox results.
pub type Result<T> = std::result::Result<T, LockboxError>;
