//! Invariant 7: a fingerprint created for one master key verifies only
//! against that same key, and binds independently of the key's use in a
//! live cipher session.

use aes256_filter::{create_fingerprint, verify_fingerprint, FilterError, KEY_LEN};

#[test]
fn fingerprint_round_trips_for_its_own_key() {
    let key = [0x5Au8; KEY_LEN];
    let fp = create_fingerprint(&key).unwrap();
    assert!(verify_fingerprint(&fp, &key).is_ok());
}

#[test]
fn fingerprint_rejects_every_other_key_tried() {
    let key = [0x5Au8; KEY_LEN];
    let fp = create_fingerprint(&key).unwrap();

    for seed in 0u8..20 {
        if seed == 0x5A {
            continue;
        }
        let other = [seed; KEY_LEN];
        assert!(matches!(
            verify_fingerprint(&fp, &other),
            Err(FilterError::InvalidPassword)
        ));
    }
}

#[test]
fn fingerprint_rejects_a_tampered_salt() {
    let key = [0x11u8; KEY_LEN];
    let mut fp = create_fingerprint(&key).unwrap();
    fp[0] ^= 0xFF;
    assert!(matches!(
        verify_fingerprint(&fp, &key),
        Err(FilterError::InvalidPassword)
    ));
}

#[test]
fn fingerprint_rejects_a_tampered_digest() {
    let key = [0x22u8; KEY_LEN];
    let mut fp = create_fingerprint(&key).unwrap();
    let last = fp.len() - 1;
    fp[last] ^= 0xFF;
    assert!(matches!(
        verify_fingerprint(&fp, &key),
        Err(FilterError::InvalidPassword)
    ));
}

#[test]
fn two_similar_keys_produce_unverifiable_cross_fingerprints() {
    let mut key_a = [0u8; KEY_LEN];
    key_a[0] = 1;
    let mut key_b = key_a;
    key_b[KEY_LEN - 1] = 1;

    let fp_a = create_fingerprint(&key_a).unwrap();
    assert!(verify_fingerprint(&fp_a, &key_a).is_ok());
    assert!(matches!(
        verify_fingerprint(&fp_a, &key_b),
        Err(FilterError::InvalidPassword)
    ));
}
