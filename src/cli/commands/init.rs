//! `lockbox init` — create a new, empty vault.

use crate::cli::output;
use crate::cli::{load_settings, prompt_new_password, vault_path, Cli};
use crate::errors::{LockboxError, Result};
use crate::vault::{storage, VaultContainer};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = load_settings()?;
    let path = vault_path(cli, &settings)?;

    // 1. Never overwrite an existing vault.
    if path.exists() {
        output::tip("Use `lockbox add` to add credentials to the existing vault.");
        return Err(LockboxError::VaultAlreadyExists(path));
    }

    // 2. Prompt for a new password (with confirmation).
    let password = prompt_new_password()?;

    // 3. Create the session and persist the empty vault.
    let mut vault = VaultContainer::initialize(&password, settings.kdf_iterations)?;
    let bytes = vault.save()?;
    storage::write_vault(&path, &bytes)?;
    vault.close()?;

    output::success(&format!("Vault created at {}", path.display()));
    output::tip("Run `lockbox add <SERVICE> <USERNAME>` to store a credential.");

    Ok(())
}
