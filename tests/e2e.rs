//! End-to-end scenarios for the cryptographic core.
//!
//! Password entry happens on the controlling terminal (`rpassword`) and is
//! not something a `cargo test` run can drive deterministically. These
//! scenarios exercise the exact derive/fingerprint/cipher sequence that
//! `KeyProvisioning::prepare` runs once it already has a password in hand,
//! using the same public building blocks it calls internally
//! (`derive_key`, `create_fingerprint`, `verify_fingerprint`, `CipherEngine`).
//! The file-cache reconciliation side effects that don't depend on a
//! password (custfp rewrite on password change, cache-hit bypassing the
//! prompt) are covered directly against the provisioning module's own
//! private state in its `#[cfg(test)]` suite.

mod common;

use std::collections::HashMap;

use aes256_filter::{
    create_fingerprint, derive_key, verify_fingerprint, CipherEngine, FilterError, MasterKey,
    Mode, CIPHER_BLOCK, FP_LEN, IV_LEN, MAC_LEN, SALT_LEN,
};
use common::drive;

/// E1: paranoid round trip. All-zero salt, password "password", ten bytes of
/// plaintext `0x00..0x09`; upload then download recovers the originals, and
/// the wire length matches the one-block formula exactly.
#[test]
fn e1_paranoid_round_trip() {
    let salt = [0u8; SALT_LEN];
    let key_bytes = derive_key(b"password", &salt).unwrap();

    let plaintext: Vec<u8> = (0u8..10).collect();
    let mut enc = CipherEngine::new(Mode::Upload, MasterKey::new(key_bytes), None).unwrap();
    let wire = drive(&mut enc, &plaintext, 4096);
    assert_eq!(wire.len(), 16 + 16 + 32);

    let mut dec = CipherEngine::new(Mode::Download, MasterKey::new(key_bytes), None).unwrap();
    let recovered = drive(&mut dec, &wire, 4096);
    assert_eq!(recovered, plaintext);
}

/// E2: the first upload to a fresh volume derives a key, mints an
/// independent fingerprint salt, and publishes `salt ‖ fingerprint` in
/// custom metadata. A later session deriving the same key from the same
/// password verifies against that published fingerprint.
#[test]
fn e2_first_upload_creates_a_verifiable_fingerprint() {
    let salt = [0x11u8; SALT_LEN];
    let key_bytes = derive_key(b"correcthorse", &salt).unwrap();
    let fp = create_fingerprint(&key_bytes).unwrap();

    let mut mdata = Vec::with_capacity(SALT_LEN + FP_LEN);
    mdata.extend_from_slice(&salt);
    mdata.extend_from_slice(&fp);

    let mut metadata = HashMap::new();
    metadata.insert("aes256_fp".to_string(), mdata.clone());

    assert_eq!(mdata.len(), 96);
    assert_ne!(&fp[..SALT_LEN], &salt[..]);

    // A repeat derivation from the same password verifies cleanly.
    let key_again = derive_key(b"correcthorse", &salt).unwrap();
    assert!(verify_fingerprint(&fp, &key_again).is_ok());
}

/// E3: a second session with a different password derives a different key
/// and fails fingerprint verification against the one E2 published.
#[test]
fn e3_wrong_password_rejected() {
    let salt = [0x11u8; SALT_LEN];
    let key_bytes = derive_key(b"correcthorse", &salt).unwrap();
    let fp = create_fingerprint(&key_bytes).unwrap();

    let wrong_key = derive_key(b"incorrecthorse", &salt).unwrap();
    assert!(matches!(
        verify_fingerprint(&fp, &wrong_key),
        Err(FilterError::InvalidPassword)
    ));
}

/// E5: an exact one-block plaintext produces exactly one 16 448-byte wire
/// block, and draining it through a 1-byte output buffer still recovers the
/// full plaintext after many `Repeat` iterations.
#[test]
fn e5_block_boundary_exact() {
    let plaintext = vec![0xAAu8; aes256_filter::BLOCK];
    let key_bytes = [3u8; aes256_filter::KEY_LEN];

    let mut enc = CipherEngine::new(Mode::Upload, MasterKey::new(key_bytes), None).unwrap();
    let wire = drive(&mut enc, &plaintext, 32768);
    assert_eq!(wire.len(), IV_LEN + aes256_filter::BLOCK + CIPHER_BLOCK + MAC_LEN);
    assert_eq!(wire.len(), 16_448);

    let mut dec = CipherEngine::new(Mode::Download, MasterKey::new(key_bytes), None).unwrap();
    let recovered = drive(&mut dec, &wire, 1);
    assert_eq!(recovered, plaintext);
}

/// E6: a plaintext one byte past a block boundary produces two wire blocks,
/// and the second block's IV is derived by chaining through the first
/// block's final `iv_state`, not from a fresh all-zero state.
#[test]
fn e6_two_block_chain_has_dependent_ivs() {
    let plaintext = vec![0x5Bu8; aes256_filter::BLOCK + 1];
    let key_bytes = [4u8; aes256_filter::KEY_LEN];

    let mut enc = CipherEngine::new(Mode::Upload, MasterKey::new(key_bytes), None).unwrap();
    let wire = drive(&mut enc, &plaintext, 65536);

    let first_block_len = IV_LEN + aes256_filter::BLOCK + CIPHER_BLOCK + MAC_LEN;
    assert!(wire.len() > first_block_len);

    let second_iv = &wire[first_block_len..first_block_len + IV_LEN];

    // The second block's IV must differ from an independent first-block
    // encryption of the same single trailing byte under a fresh all-zero
    // iv_state -- proving it was chained, not reset.
    let mut fresh = CipherEngine::new(Mode::Upload, MasterKey::new(key_bytes), None).unwrap();
    let fresh_wire = drive(&mut fresh, &plaintext[aes256_filter::BLOCK..], 4096);
    let fresh_iv = &fresh_wire[..IV_LEN];

    assert_ne!(second_iv, fresh_iv);

    // Re-running the whole two-block stream is still fully deterministic.
    let mut enc2 = CipherEngine::new(Mode::Upload, MasterKey::new(key_bytes), None).unwrap();
    let wire2 = drive(&mut enc2, &plaintext, 65536);
    assert_eq!(wire, wire2);

    let mut dec = CipherEngine::new(Mode::Download, MasterKey::new(key_bytes), None).unwrap();
    let recovered = drive(&mut dec, &wire, 65536);
    assert_eq!(recovered, plaintext);
}
