//! `lockbox add` — append a credential to the vault.

use std::io::{self, IsTerminal, Read};

use zeroize::{Zeroize, Zeroizing};

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::crypto::LockedBuffer;
use crate::errors::{LockboxError, Result};
use crate::vault::storage;

/// Execute the `add` command.
pub fn execute(cli: &Cli, service: &str, username: &str) -> Result<()> {
    // Open first so a wrong master password fails before asking for more.
    let (path, mut vault) = open_vault(cli)?;

    let password = read_entry_password(service)?;

    vault.add_entry(service, username, password)?;
    let bytes = vault.save()?;
    storage::write_vault(&path, &bytes)?;

    let total = vault.entries()?.len();
    vault.close()?;

    output::success(&format!(
        "Added '{service}' ({username}) to {} ({total} total)",
        path.display()
    ));

    Ok(())
}

/// Longest entry password accepted on stdin.
const MAX_PIPED_PASSWORD_LEN: usize = 4096;

/// Read the entry password from piped stdin, or prompt without echo.
fn read_entry_password(service: &str) -> Result<LockedBuffer> {
    if !io::stdin().is_terminal() {
        return read_piped_password(&mut io::stdin().lock());
    }

    let value = Zeroizing::new(
        dialoguer::Password::new()
            .with_prompt(format!("Password for {service}"))
            .interact()
            .map_err(|e| LockboxError::CommandFailed(format!("input prompt: {e}")))?,
    );
    LockedBuffer::from_slice(value.as_bytes())
}

/// Read a password from `reader` straight into locked memory, dropping a
/// trailing line ending.
fn read_piped_password(reader: &mut impl Read) -> Result<LockedBuffer> {
    let mut buf = LockedBuffer::allocate(MAX_PIPED_PASSWORD_LEN)?;
    let mut filled = 0;

    loop {
        let window = &mut buf.as_mut_slice()[filled..];
        if window.is_empty() {
            let mut extra = [0u8; 1];
            if reader.read(&mut extra)? != 0 {
                extra.zeroize();
                return Err(LockboxError::CommandFailed(format!(
                    "entry password is longer than {MAX_PIPED_PASSWORD_LEN} bytes"
                )));
            }
            break;
        }
        match reader.read(window) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let value = &buf.as_slice()[..filled];
    let end = value
        .iter()
        .rposition(|&b| b != b'\r' && b != b'\n')
        .map_or(0, |i| i + 1);
    LockedBuffer::from_slice(&value[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::init;

    fn read(input: &[u8]) -> Result<LockedBuffer> {
        init().unwrap();
        read_piped_password(&mut &input[..])
    }

    #[test]
    fn trailing_line_endings_are_dropped() {
        assert_eq!(read(b"p@ss1\n").unwrap().as_slice(), b"p@ss1");
        assert_eq!(read(b"p@ss1\r\n").unwrap().as_slice(), b"p@ss1");
        assert_eq!(read(b"p@ss1").unwrap().as_slice(), b"p@ss1");
    }

    #[test]
    fn inner_newlines_and_spaces_are_kept() {
        assert_eq!(read(b" a\nb \n").unwrap().as_slice(), b" a\nb ");
    }

    #[test]
    fn empty_input_gives_empty_password() {
        assert!(read(b"").unwrap().is_empty());
        assert!(read(b"\n").unwrap().is_empty());
    }

    #[test]
    fn password_at_the_limit_is_accepted() {
        let input = vec![b'x'; MAX_PIPED_PASSWORD_LEN];
        assert_eq!(read(&input).unwrap().len(), MAX_PIPED_PASSWORD_LEN);
    }

    #[test]
    fn oversized_password_is_rejected() {
        let input = vec![b'x'; MAX_PIPED_PASSWORD_LEN + 1];
        assert!(matches!(read(&input), Err(LockboxError::CommandFailed(_))));
    }
}
