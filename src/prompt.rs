//! Interactive password entry: a terminal prompt with echo disabled, an
//! 8-character minimum, and (when generating a fresh key) a second prompt
//! that must match the first.

use zeroize::Zeroizing;

use crate::constants::{MIN_PASSWORD_LEN, PASSWORD_BUFFER_LEN};
use crate::error::{FilterError, Result};
use crate::sensitive::SensitiveBuffer;

/// Whether the prompt is unlocking an existing key or generating a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    /// Prompt once; the password already has an on-disk salt/fingerprint to
    /// verify against.
    Unlock,
    /// Prompt twice and require both entries to match before accepting.
    CreateNew,
}

/// A fixed-capacity, page-locked scratch buffer holding an entered password.
/// Only the first `len` bytes are meaningful; the rest is unused (zeroed)
/// capacity kept locked for the buffer's whole lifetime.
pub struct PasswordBuffer {
    buf: SensitiveBuffer,
    len: usize,
}

impl PasswordBuffer {
    /// The entered password's bytes, excluding unused buffer capacity.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf.as_slice()[..self.len]
    }
}

/// Prompt on the controlling terminal and return the entered password in a
/// locked, zero-on-drop buffer.
///
/// Retries on a too-short password or, for [`PromptAction::CreateNew`], a
/// mismatched confirmation.
pub fn prompt_password(action: PromptAction) -> Result<PasswordBuffer> {
    loop {
        let first = read_line("Enter volume encryption key: ")?;
        if first.len() < MIN_PASSWORD_LEN {
            eprintln!("Password too short (minimum {MIN_PASSWORD_LEN} characters), try again");
            continue;
        }
        if first.len() > PASSWORD_BUFFER_LEN {
            eprintln!("Password too long (maximum {PASSWORD_BUFFER_LEN} characters), try again");
            continue;
        }

        if action == PromptAction::Unlock {
            return Ok(into_buffer(first));
        }

        let second = read_line("Confirm volume encryption key: ")?;
        if first.as_bytes() != second.as_bytes() {
            eprintln!("Passwords do not match, try again");
            continue;
        }
        return Ok(into_buffer(first));
    }
}

fn read_line(prompt: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(prompt)
        .map(Zeroizing::new)
        .map_err(|e| FilterError::password_abort(format!("could not read password: {e}")))
}

fn into_buffer(password: Zeroizing<String>) -> PasswordBuffer {
    let bytes = password.as_bytes();
    let mut buf = SensitiveBuffer::new(PASSWORD_BUFFER_LEN);
    buf.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
    PasswordBuffer { buf, len: bytes.len() }
}
