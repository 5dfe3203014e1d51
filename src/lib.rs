//! Streaming authenticated-encryption filter: AES-256-CBC under a per-block
//! chained IV, authenticated with truncated HMAC-SHA-512, with password-based
//! key provisioning and a pull-style producer interface that tolerates
//! arbitrary input/output buffer sizes.
//!
//! The primary entry point is [`Filter`]: `prepare` turns a password and a
//! configuration blob into a session, `process` drives the stream one step
//! at a time, `finish` tears it down. The lower-level building blocks
//! ([`CipherEngine`], [`derive_key`], [`create_fingerprint`]/
//! [`verify_fingerprint`]) are exported for callers that need to drive the
//! cipher or key machinery directly, bypassing interactive provisioning.

#![warn(missing_docs)]
#![deny(unsafe_code)]

mod constants;
mod engine;
mod error;
mod facade;
mod fingerprint;
mod kdf;
mod prompt;
mod provisioning;
mod sensitive;

pub use constants::{BLOCK, CIPHER_BLOCK, FP_LEN, IV_LEN, KEY_LEN, MAC_LEN, SALT_LEN};
pub use engine::{Action, CipherEngine, MasterKey, Mode};
pub use error::{FilterError, Result};
pub use facade::{Filter, ABI_VERSION, DESCRIPTION, NAME, OPTIONS_HELP, UUID};
pub use fingerprint::create as create_fingerprint;
pub use fingerprint::verify as verify_fingerprint;
pub use kdf::derive as derive_key;
