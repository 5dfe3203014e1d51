//! Key derivation: an expensive password-hardening KDF followed by a
//! SHA-512 post-hash over the KDF's entire printable output string.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, Params, Version,
};
use sha2::{Digest, Sha512};

use crate::constants::{KDF_M_COST_KIB, KDF_P_COST, KDF_T_COST, KEY_LEN};
use crate::error::{FilterError, Result};

/// Derive a 64-byte master secret from `(password, salt)`.
///
/// `salt` may be any length `SaltString` accepts b64-encoded; callers in
/// this crate always pass the 16-byte volume salt or a 16-byte fingerprint
/// salt, hex/base64-encoded internally by `argon2`'s own salt type.
pub fn derive(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(KDF_M_COST_KIB, KDF_T_COST, KDF_P_COST, None)
        .map_err(|e| FilterError::internal(format!("invalid argon2 params: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let salt_string = SaltString::encode_b64(salt)
        .map_err(|e| FilterError::internal(format!("invalid salt: {e}")))?;

    let hash = argon2
        .hash_password(password, &salt_string)
        .map_err(FilterError::from)?;

    // Post-hash the *entire* PHC string (cost + salt + hash), not just the
    // hash portion, so the caller can never accidentally use the KDF's own
    // embedded salt as key material.
    let phc_string = hash.to_string();

    let mut digest = Sha512::new();
    digest.update(phc_string.as_bytes());
    let out = digest.finalize();

    if out.len() != KEY_LEN {
        return Err(FilterError::internal(format!(
            "unexpected digest length: {}",
            out.len()
        )));
    }

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&out);
    Ok(key)
}
