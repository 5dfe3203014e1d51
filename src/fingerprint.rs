//! Key-fingerprint protocol: binds a derived master key to a volume without
//! ever transmitting the key.

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::constants::{FP_LEN, KEY_LEN, SALT_LEN};
use crate::error::{FilterError, Result};
use crate::kdf;

/// Create a fresh fingerprint for `master_key`: `fp_salt ‖ derive(hex(sha256(master_key)), fp_salt)`.
pub fn create(master_key: &[u8; KEY_LEN]) -> Result<[u8; FP_LEN]> {
    let mut fp_salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut fp_salt);

    let digest = fingerprint_digest(master_key, &fp_salt)?;

    let mut fp = [0u8; FP_LEN];
    fp[..SALT_LEN].copy_from_slice(&fp_salt);
    fp[SALT_LEN..].copy_from_slice(&digest);
    Ok(fp)
}

/// Verify that `fp` was produced by [`create`] for `master_key`.
///
/// Fails with [`FilterError::InvalidPassword`] on any mismatch.
pub fn verify(fp: &[u8; FP_LEN], master_key: &[u8; KEY_LEN]) -> Result<()> {
    let mut fp_salt = [0u8; SALT_LEN];
    fp_salt.copy_from_slice(&fp[..SALT_LEN]);
    let mut expected = [0u8; KEY_LEN];
    expected.copy_from_slice(&fp[SALT_LEN..]);

    let digest = fingerprint_digest(master_key, &fp_salt)?;

    if digest != expected {
        return Err(FilterError::InvalidPassword);
    }
    Ok(())
}

fn fingerprint_digest(master_key: &[u8; KEY_LEN], fp_salt: &[u8; SALT_LEN]) -> Result<[u8; KEY_LEN]> {
    let tmp = Sha256::digest(master_key);
    let hex_tmp = hex::encode(tmp);
    kdf::derive(hex_tmp.as_bytes(), fp_salt)
}
