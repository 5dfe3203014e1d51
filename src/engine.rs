//! Per-stream block cipher state machine: IV chaining, HMAC authentication,
//! and a pull-style producer interface that tolerates arbitrary
//! input/output buffer sizes. Uses RustCrypto's `cbc`/`hmac`/`sha1`/`sha2`
//! traits, constructing a fresh `cbc::Encryptor`/`Decryptor` per block with
//! `BlockEncryptMut`/`BlockDecryptMut` and `Pkcs7` padding.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::constants::{input_capacity_for_download, CIPHER_BLOCK, IV_LEN, MAC_LEN, BLOCK};
use crate::error::{FilterError, Result};
use crate::sensitive::SensitiveBuffer;

type HmacSha1 = Hmac<Sha1>;
type HmacSha512 = Hmac<Sha512>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Upload (encrypt) or download (decrypt) direction for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Plaintext in, wire blocks out.
    Upload,
    /// Wire blocks in, plaintext out.
    Download,
}

/// Host-framing signal exchanged with [`CipherEngine::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Ready for the next input buffer.
    Normal,
    /// Call again with the same input buffer position; more output pending
    /// or more of the current input remains to be ingested.
    Repeat,
    /// Stream complete; no more output will follow.
    DataEnd,
}

/// The 64-byte derived secret, split into `K_mac` (HMAC key) and `K_enc`
/// (AES key). Never copied outside `SensitiveBuffer`-backed memory except
/// for the per-construction copies block ciphers and HMAC implementations
/// necessarily take of their own key material (the same unavoidable copy
/// OpenSSL's own `EVP_CIPHER_CTX`/`HMAC_CTX` make internally).
pub struct MasterKey(SensitiveBuffer);

impl MasterKey {
    /// Wrap a 64-byte derived secret.
    pub fn new(bytes: [u8; crate::constants::KEY_LEN]) -> Self {
        let mut buf = SensitiveBuffer::new(bytes.len());
        buf.as_mut_slice().copy_from_slice(&bytes);
        Self(buf)
    }

    /// First 32 bytes: the HMAC key shared by the IV chain and the block MAC.
    pub fn k_mac(&self) -> &[u8] {
        &self.0.as_slice()[..32]
    }

    /// Last 32 bytes: the AES-256 key.
    pub fn k_enc(&self) -> &[u8] {
        &self.0.as_slice()[32..64]
    }
}

/// Per-open-file cipher state. Created by `provisioning::prepare`, driven by
/// repeated calls to [`process`](CipherEngine::process), destroyed by
/// [`finish`](crate::facade::Filter::finish).
pub struct CipherEngine {
    mode: Mode,
    key: MasterKey,
    k_enc: Zeroizing<[u8; 32]>,
    ivhash: HmacSha1,
    hmac: HmacSha512,
    iv_state: [u8; 20],
    in_buf: Vec<u8>,
    in_filled: usize,
    out_buf: Vec<u8>,
    out_filled: usize,
    out_left: usize,
    produced_since_input: usize,
    end_seen: bool,
    decrypt_failed: bool,
    key_cache_path: Option<std::path::PathBuf>,
}

impl CipherEngine {
    /// Build a fresh session from a provisioned master key.
    pub fn new(mode: Mode, key: MasterKey, key_cache_path: Option<std::path::PathBuf>) -> Result<Self> {
        let k_mac = key.k_mac().to_vec();
        let mut k_enc = Zeroizing::new([0u8; 32]);
        k_enc.copy_from_slice(key.k_enc());

        let ivhash = HmacSha1::new_from_slice(&k_mac)
            .map_err(|e| FilterError::internal(format!("HMAC-SHA1 init failed: {e}")))?;
        let hmac = HmacSha512::new_from_slice(&k_mac)
            .map_err(|e| FilterError::internal(format!("HMAC-SHA512 init failed: {e}")))?;

        let capacity = input_capacity_for_download();
        Ok(Self {
            mode,
            key,
            k_enc,
            ivhash,
            hmac,
            iv_state: [0u8; 20],
            in_buf: vec![0u8; capacity],
            in_filled: 0,
            out_buf: vec![0u8; capacity],
            out_filled: 0,
            out_left: 0,
            produced_since_input: 0,
            end_seen: false,
            decrypt_failed: false,
            key_cache_path,
        })
    }

    /// Whether a prior decrypt call failed authentication.
    pub fn decrypt_failed(&self) -> bool {
        self.decrypt_failed
    }

    /// The key-cache path recorded for this session, if any.
    pub fn key_cache_path(&self) -> Option<&std::path::Path> {
        self.key_cache_path.as_deref()
    }

    fn block_capacity(&self) -> usize {
        match self.mode {
            Mode::Upload => BLOCK,
            Mode::Download => input_capacity_for_download(),
        }
    }

    /// Encrypt or decrypt one logical block at a time, draining into `out`
    /// and pulling from `input`, honoring the `action` framing protocol.
    ///
    /// Returns the number of bytes written into `out` this call and the
    /// action the host should take next.
    pub fn process(&mut self, input: &[u8], out: &mut [u8], action: Action) -> Result<(usize, Action)> {
        if action == Action::DataEnd {
            self.end_seen = true;
        }

        let mut written = 0usize;

        loop {
            if self.out_left > 0 {
                let remaining_out = out.len() - written;
                if remaining_out == 0 {
                    return Ok((written, Action::Repeat));
                }
                let take = remaining_out.min(self.out_left);
                let start = self.out_filled - self.out_left;
                out[written..written + take].copy_from_slice(&self.out_buf[start..start + take]);
                written += take;
                self.out_left -= take;

                if self.out_left > 0 {
                    return Ok((written, Action::Repeat));
                }
                self.out_filled = 0;

                if self.produced_since_input == input.len() {
                    self.produced_since_input = 0;
                    return Ok((written, if self.end_seen { Action::DataEnd } else { Action::Normal }));
                }
                // Leftover input remains in the same buffer; fall through
                // to ingest more of it in this same call.
            }

            let capacity = self.block_capacity();
            let need = capacity - self.in_filled;
            let available = input.len() - self.produced_since_input;
            let take = need.min(available);
            if take > 0 {
                self.in_buf[self.in_filled..self.in_filled + take]
                    .copy_from_slice(&input[self.produced_since_input..self.produced_since_input + take]);
                self.in_filled += take;
                self.produced_since_input += take;
            }

            let block_ready = self.in_filled == capacity || (self.in_filled > 0 && self.end_seen);

            if !block_ready {
                if self.produced_since_input == input.len() {
                    self.produced_since_input = 0;
                }
                return Ok((written, if self.end_seen { Action::DataEnd } else { Action::Normal }));
            }

            let out_filled = match self.mode {
                Mode::Upload => self.encrypt_block()?,
                Mode::Download => self.decrypt_block()?,
            };
            self.in_filled = 0;
            self.out_filled = out_filled;

            let remaining_out = out.len() - written;
            if out_filled <= remaining_out {
                out[written..written + out_filled].copy_from_slice(&self.out_buf[..out_filled]);
                written += out_filled;
                self.out_filled = 0;

                if self.produced_since_input == input.len() {
                    self.produced_since_input = 0;
                    return Ok((written, if self.end_seen { Action::DataEnd } else { Action::Normal }));
                }
                // more input queued in this same buffer; loop to ingest it
                continue;
            } else {
                out[written..].copy_from_slice(&self.out_buf[..remaining_out]);
                self.out_left = out_filled - remaining_out;
                written = out.len();
                return Ok((written, Action::Repeat));
            }
        }
    }

    fn encrypt_block(&mut self) -> Result<usize> {
        let plaintext_len = self.in_filled;

        self.ivhash.update(&self.iv_state);
        self.ivhash.update(&self.in_buf[..plaintext_len]);
        let mac = self.ivhash.finalize_reset().into_bytes();
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&mac[..IV_LEN]);
        self.iv_state.copy_from_slice(&mac);

        self.out_buf[..IV_LEN].copy_from_slice(&iv);

        let cipher = Aes256CbcEnc::new(&(*self.k_enc).into(), &iv.into());
        let cipher_region = &mut self.out_buf[IV_LEN..IV_LEN + plaintext_len + CIPHER_BLOCK];
        cipher_region[..plaintext_len].copy_from_slice(&self.in_buf[..plaintext_len]);
        let ciphertext_len = cipher
            .encrypt_padded_mut::<Pkcs7>(cipher_region, plaintext_len)
            .map_err(|e| FilterError::internal(format!("CBC padding error: {e:?}")))?
            .len();

        let mut total = IV_LEN + ciphertext_len;

        self.hmac.update(&self.out_buf[..total]);
        let tag = self.hmac.finalize_reset().into_bytes();
        self.out_buf[total..total + MAC_LEN].copy_from_slice(&tag[..MAC_LEN]);
        total += MAC_LEN;

        Ok(total)
    }

    fn decrypt_block(&mut self) -> Result<usize> {
        let wire_len = self.in_filled;
        if wire_len < IV_LEN + MAC_LEN {
            return Err(FilterError::internal(format!(
                "incomplete data: {wire_len} bytes"
            )));
        }

        let iv_and_ciphertext_len = wire_len - MAC_LEN;

        self.hmac.update(&self.in_buf[..iv_and_ciphertext_len]);
        let computed = self.hmac.finalize_reset().into_bytes();

        let received = &self.in_buf[iv_and_ciphertext_len..wire_len];
        if computed[..MAC_LEN].ct_eq(received).unwrap_u8() == 0 {
            self.decrypt_failed = true;
            return Err(FilterError::authentication_failure(
                "HMAC mismatch (invalid password/key file or broken data)",
            ));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&self.in_buf[..IV_LEN]);
        let ciphertext_len = iv_and_ciphertext_len - IV_LEN;

        self.out_buf[..ciphertext_len].copy_from_slice(&self.in_buf[IV_LEN..iv_and_ciphertext_len]);

        let cipher = Aes256CbcDec::new(&(*self.k_enc).into(), &iv.into());
        let result = cipher.decrypt_padded_mut::<Pkcs7>(&mut self.out_buf[..ciphertext_len]);
        match result {
            Ok(plaintext) => Ok(plaintext.len()),
            Err(_) => {
                self.decrypt_failed = true;
                Err(FilterError::authentication_failure(
                    "bad padding (invalid password/key file or broken data)",
                ))
            }
        }
    }
}

impl Drop for CipherEngine {
    /// `key` and `k_enc` zero themselves on drop already
    /// (`SensitiveBuffer`/`Zeroizing`); the staging buffers and IV-chain
    /// state are plain `Vec`/array scratch space that can hold plaintext or
    /// key-derived bytes across calls, so `finish`'s zero-the-whole-session
    /// teardown covers them too.
    fn drop(&mut self) {
        self.in_buf.zeroize();
        self.out_buf.zeroize();
        self.iv_state.zeroize();
    }
}
