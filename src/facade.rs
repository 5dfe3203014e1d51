//! Thin adapter exposing `init`/`prepare`/`process`/`finish` to the host
//! filter-dispatch framework, plus the static identity block the host uses
//! to enumerate and select this filter.

use std::collections::HashMap;
use std::path::Path;

use crate::engine::{Action, CipherEngine, Mode};
use crate::error::Result;
use crate::provisioning;

/// Filter name as advertised to the host.
pub const NAME: &str = "aes256";
/// Filter UUID as advertised to the host.
pub const UUID: &str = "35a5404d-1513-4009-904c-6ee5b0cd8634";
/// `(major, minor)` ABI version this filter implements.
pub const ABI_VERSION: (u32, u32) = (1, 6);
/// One-line description surfaced in host tooling.
pub const DESCRIPTION: &str = "AES-256 encryption filter";
/// Documentation-only options string surfaced in host tooling.
pub const OPTIONS_HELP: &str = "\n\tnogenkey (don't generate a key file when creating a volume)\n\tparanoid (don't use key files at all - always ask for a password)\n\tsalt:HEX (force given salt, HEX must be 32 chars long)";

/// An open, provisioned filter session.
///
/// `prepare` returns an owned `Filter`; `process` drives it; `finish`
/// consumes it. There is no reachable "handle after teardown" state in safe
/// code because `finish` takes `self` by value.
pub struct Filter {
    engine: CipherEngine,
}

impl Filter {
    /// Per-process lifecycle hook. Nothing to initialize.
    pub fn init() -> Result<()> {
        Ok(())
    }

    /// Reconcile configuration, key cache, and password into a ready
    /// session. See [`provisioning::prepare`].
    pub fn prepare(
        filename: &str,
        cfgdir: &Path,
        blob: &[u8],
        metadata: &mut HashMap<String, Vec<u8>>,
        mode: Mode,
    ) -> Result<Self> {
        let engine = provisioning::prepare(filename, cfgdir, blob, metadata, mode)?;
        Ok(Self { engine })
    }

    /// Encrypt or decrypt one step of the stream. See [`CipherEngine::process`].
    pub fn process(&mut self, input: &[u8], output: &mut [u8], action: Action) -> Result<(usize, Action)> {
        self.engine.process(input, output, action)
    }

    /// Whether a prior `process` call failed authentication. The host should
    /// treat the whole stream as untrusted once this is `true`.
    pub fn decrypt_failed(&self) -> bool {
        self.engine.decrypt_failed()
    }

    /// Idempotent teardown. Dropping the underlying [`CipherEngine`] zeroes
    /// and unlocks every sensitive region it owns on every exit path,
    /// including an early return from `prepare` via `?`. Deleting the key
    /// cache after a failed decrypt is deliberately not done here.
    pub fn finish(self) {}
}
