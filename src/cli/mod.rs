//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::LockedBuffer;
use crate::errors::{LockboxError, Result};
use crate::vault::{storage, VaultContainer};

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable that supplies the master password non-interactively.
const PASSWORD_ENV: &str = "LOCKBOX_PASSWORD";

/// Lockbox CLI: encrypted credential vault.
#[derive(Parser)]
#[command(name = "lockbox", about = "Encrypted credential vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault file (default: `vault_path` from .lockbox.toml, else lockbox.vault)
    #[arg(long, global = true)]
    pub vault: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new, empty vault
    Init,

    /// Add a credential (password read from stdin or prompted)
    Add {
        /// Service name (e.g. example.com)
        service: String,
        /// Username for the service
        username: String,
    },

    /// List services and usernames (never passwords)
    List,

    /// Print the password(s) stored for a service
    Get {
        /// Service name
        service: String,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load `.lockbox.toml` from the working directory.
pub fn load_settings() -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    Settings::load(&cwd)
}

/// Resolve the vault path: `--vault` wins over the config file.
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match &cli.vault {
        Some(path) => cwd.join(path),
        None => settings.vault_path(&cwd),
    })
}

/// Get the master password, trying in order:
/// 1. `LOCKBOX_PASSWORD` env var (scripts, CI)
/// 2. Interactive prompt (no echo)
///
/// The password is moved into locked memory and the intermediate
/// `String` is wiped on drop.
pub fn prompt_password() -> Result<LockedBuffer> {
    if let Some(pw) = password_from_env() {
        return LockedBuffer::from_slice(pw.as_bytes());
    }

    let pw = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt("Enter master password")
            .interact()
            .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?,
    );
    LockedBuffer::from_slice(pw.as_bytes())
}

/// Prompt for a new master password with confirmation (used by `init`).
///
/// Also respects `LOCKBOX_PASSWORD`.  Enforces a minimum length.
pub fn prompt_new_password() -> Result<LockedBuffer> {
    if let Some(pw) = password_from_env() {
        check_password_len(&pw)?;
        return LockedBuffer::from_slice(pw.as_bytes());
    }

    loop {
        let pw = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose master password")
                .with_confirmation(
                    "Confirm master password",
                    "Passwords do not match, try again",
                )
                .interact()
                .map_err(|e| LockboxError::CommandFailed(format!("password prompt: {e}")))?,
        );

        match check_password_len(&pw) {
            Ok(()) => return LockedBuffer::from_slice(pw.as_bytes()),
            Err(e) => output::warning(&e.to_string()),
        }
    }
}

/// Read and open the vault the CLI points at.
///
/// Returns the vault path too so commands can write it back.
pub fn open_vault(cli: &Cli) -> Result<(PathBuf, VaultContainer)> {
    let settings = load_settings()?;
    let path = vault_path(cli, &settings)?;

    let bytes = storage::read_vault(&path)?;
    let password = prompt_password()?;
    let vault = VaultContainer::load_with_iterations(&bytes, &password, settings.kdf_iterations)
        .map_err(|err| {
            if matches!(err, LockboxError::Integrity) {
                output::tip(&format!(
                    "If the password is right, check that kdf_iterations ({}) matches the value the vault was created with.",
                    settings.kdf_iterations
                ));
            }
            err
        })?;

    Ok((path, vault))
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

fn check_password_len(pw: &str) -> Result<()> {
    if pw.chars().count() < MIN_PASSWORD_LEN {
        return Err(LockboxError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_passwords_are_rejected() {
        assert!(check_password_len("short").is_err());
        assert!(check_password_len("").is_err());
    }

    #[test]
    fn long_enough_passwords_are_accepted() {
        assert!(check_password_len("12345678").is_ok());
        assert!(check_password_len("correct horse battery staple").is_ok());
    }

    #[test]
    fn password_length_counts_characters_not_bytes() {
        // Eight characters pass; seven two-byte characters (fourteen bytes) do not.
        assert!(check_password_len("ääääääää").is_ok());
        assert!(check_password_len("äääääää").is_err());
    }

    #[test]
    fn cli_parses_add_with_global_vault_flag() {
        let cli = Cli::parse_from(["lockbox", "add", "example.com", "alice", "--vault", "x.vault"]);
        assert_eq!(cli.vault.as_deref(), Some("x.vault"));
        match cli.command {
            Commands::Add { service, username } => {
                assert_eq!(service, "example.com");
                assert_eq!(username, "alice");
            }
            _ => panic!("expected add"),
        }
    }
}
