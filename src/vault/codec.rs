//! Length-prefixed encoding of the entry list.
//!
//! The plaintext payload sealed inside a vault file has this layout:
//!
//! ```text
//! [count: u32 BE]
//! repeated `count` times:
//!   [service_len: u32 BE][service][username_len: u32 BE][username][password_len: u32 BE][password]
//! ```
//!
//! Every field carries its own length, so any byte value (including `|`,
//! newlines and NUL) is allowed inside a field.  The payload holds
//! passwords, so it is always built in locked memory.

use super::entry::Entry;
use crate::crypto::LockedBuffer;
use crate::errors::{LockboxError, Result};

/// Size of every length prefix (and of the entry count).
const LEN_PREFIX: usize = 4;

/// Fields per entry: service, username, password.
const FIELDS_PER_ENTRY: usize = 3;

/// Serialize `entries` in order into a locked payload buffer.
pub fn encode(entries: &[Entry]) -> Result<LockedBuffer> {
    let count = u32::try_from(entries.len()).map_err(|_| {
        LockboxError::Format(format!("{} entries exceed the u32 entry count", entries.len()))
    })?;

    // Size the buffer exactly so the payload is written once, in place.
    let mut total = LEN_PREFIX;
    for entry in entries {
        for field in entry.fields() {
            field_len(field)?;
            total = total
                .checked_add(LEN_PREFIX + field.len())
                .ok_or_else(|| LockboxError::Format("payload size overflows usize".into()))?;
        }
    }

    let mut payload = LockedBuffer::allocate(total)?;
    let mut writer = Writer::new(payload.as_mut_slice());
    writer.put_u32(count);
    for entry in entries {
        for field in entry.fields() {
            writer.put_u32(field_len(field)?);
            writer.put_bytes(field);
        }
    }

    Ok(payload)
}

/// Parse a payload produced by `encode`.
///
/// Rejects truncated fields, lengths that run past the buffer, non-UTF-8
/// service or username text, and trailing bytes.
pub fn decode(bytes: &[u8]) -> Result<Vec<Entry>> {
    let mut reader = Reader::new(bytes);

    let count = reader.read_u32()?;
    let count = usize::try_from(count)
        .map_err(|_| LockboxError::Format(format!("entry count {count} is too large")))?;

    // Each entry needs at least its three length prefixes.
    let max_entries = reader.remaining() / (FIELDS_PER_ENTRY * LEN_PREFIX);
    if count > max_entries {
        return Err(LockboxError::Format(format!(
            "entry count {count} does not fit in {} remaining bytes",
            reader.remaining()
        )));
    }

    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let service = reader.read_text("service")?;
        let username = reader.read_text("username")?;
        let password = LockedBuffer::from_slice(reader.read_field()?)?;
        entries.push(Entry::new(service, username, password));
    }

    if reader.remaining() != 0 {
        return Err(LockboxError::Format(format!(
            "{} trailing bytes after {count} entries",
            reader.remaining()
        )));
    }

    Ok(entries)
}

fn field_len(field: &[u8]) -> Result<u32> {
    u32::try_from(field.len()).map_err(|_| {
        LockboxError::Format(format!("field of {} bytes exceeds u32 length prefix", field.len()))
    })
}

// ---------------------------------------------------------------------------
// Cursor helpers
// ---------------------------------------------------------------------------

/// Writes into a buffer that `encode` has already sized exactly.
struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_u32(&mut self, value: u32) {
        self.put_bytes(&value.to_be_bytes());
    }

    fn put_bytes(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(LockboxError::Format(format!(
                "declared length {len} exceeds the {} remaining bytes",
                self.remaining()
            )));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes: [u8; LEN_PREFIX] = self
            .take(LEN_PREFIX)?
            .try_into()
            .map_err(|_| LockboxError::Format("bad length prefix".into()))?;
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_field(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()?;
        let len = usize::try_from(len)
            .map_err(|_| LockboxError::Format(format!("field length {len} is too large")))?;
        self.take(len)
    }

    fn read_text(&mut self, what: &str) -> Result<String> {
        let bytes = self.read_field()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| LockboxError::Format(format!("{what} is not valid UTF-8")))
    }
}
