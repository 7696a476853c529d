//! `lockbox get` — print the stored password(s) for a service.

use std::io::{self, Write};

use crate::cli::{open_vault, Cli};
use crate::errors::{LockboxError, Result};

/// Execute the `get` command.
///
/// Duplicates are allowed, so every matching entry is printed, one
/// `username<TAB>password` line each, in insertion order.
pub fn execute(cli: &Cli, service: &str) -> Result<()> {
    let (_path, mut vault) = open_vault(cli)?;

    let mut stdout = io::stdout().lock();
    let mut found = 0usize;
    for entry in vault.entries()?.iter().filter(|e| e.service() == service) {
        stdout.write_all(entry.username().as_bytes())?;
        stdout.write_all(b"\t")?;
        stdout.write_all(entry.password().as_slice())?;
        stdout.write_all(b"\n")?;
        found += 1;
    }
    stdout.flush()?;

    vault.close()?;

    if found == 0 {
        return Err(LockboxError::CommandFailed(format!(
            "no entry for service '{service}'"
        )));
    }
    Ok(())
}
