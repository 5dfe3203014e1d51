//! Wire-format and algorithm constants. These are load-bearing: changing any
//! of them changes the on-disk/on-wire format and breaks interop with
//! ciphertext this filter has already produced.

/// Size of one logical plaintext block.
pub const BLOCK: usize = 16384;
/// AES block size / CBC IV size.
pub const IV_LEN: usize = 16;
/// Truncated HMAC-SHA-512 tag size (first half of the 64-byte digest).
pub const MAC_LEN: usize = 32;
/// Volume salt size.
pub const SALT_LEN: usize = 16;
/// Derived master key size (SHA-512 digest size): `K_mac` (32) ‖ `K_enc` (32).
pub const KEY_LEN: usize = 64;
/// Fingerprint size: `fp_salt` (16) ‖ derived digest (64).
pub const FP_LEN: usize = SALT_LEN + KEY_LEN;
/// Argon2 memory cost, in KiB. Chosen to keep interactive password entry in
/// the same ballpark of latency as a `2^14`-round password hash.
pub const KDF_M_COST_KIB: u32 = 1 << 14;
/// Argon2 time cost.
pub const KDF_T_COST: u32 = 1;
/// Argon2 parallelism.
pub const KDF_P_COST: u32 = 1;
/// AES cipher block size (also the CBC padding granularity).
pub const CIPHER_BLOCK: usize = 16;
/// Minimum accepted interactive password length.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Capacity of the password entry scratch buffer.
pub const PASSWORD_BUFFER_LEN: usize = 1024;

/// Capacity of the input staging buffer, which must hold a full wire block
/// on download: IV + plaintext + one padding block + MAC.
pub const fn input_capacity_for_download() -> usize {
    IV_LEN + BLOCK + CIPHER_BLOCK + MAC_LEN
}
