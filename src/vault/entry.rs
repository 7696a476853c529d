//! A single credential record.

use crate::crypto::LockedBuffer;

/// One (service, username, password) record.
///
/// Service and username are plain text; the password lives in locked
/// memory and is zeroed when the entry is dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct Entry {
    service: String,
    username: String,
    password: LockedBuffer,
}

impl Entry {
    pub fn new(service: impl Into<String>, username: impl Into<String>, password: LockedBuffer) -> Self {
        Self {
            service: service.into(),
            username: username.into(),
            password,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &LockedBuffer {
        &self.password
    }

    pub(crate) fn wipe_password(&mut self) {
        self.password.wipe();
    }

    /// The three encoded fields, in wire order.
    pub(crate) fn fields(&self) -> [&[u8]; 3] {
        [
            self.service.as_bytes(),
            self.username.as_bytes(),
            self.password.as_slice(),
        ]
    }
}
