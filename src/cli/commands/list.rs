//! `lockbox list` — display services and usernames in a table.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (path, mut vault) = open_vault(cli)?;

    let entries = vault.entries()?;
    output::info(&format!("{} — {} entr(ies)", path.display(), entries.len()));
    output::print_entries_table(entries);

    vault.close()
}
