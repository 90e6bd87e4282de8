//! Whole-container encryption using AES-256-CBC.
//!
//! The key is derived from the password with PBKDF2-HMAC-SHA1, using the
//! random IV as salt. The ciphertext carries no authentication tag: a wrong
//! password or a tampered payload decrypts to garbage without an error here,
//! and is only caught when the result fails to parse as a container.

use cipher::block_padding::{NoPadding, Pkcs7};
use cipher::generic_array::GenericArray;
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha1::Sha1;

use crate::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Initialization vector length, which is also the KDF salt length.
pub const IV_LEN: usize = 16;

/// AES-256 key length.
pub const KEY_LEN: usize = 32;

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// PBKDF2 iteration count.
pub const KDF_ROUNDS: u32 = 10_000;

/// Derive the AES key for `password` and `salt`.
pub fn derive_key(password: &str, salt: &[u8; IV_LEN]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha1>(password.as_bytes(), salt, KDF_ROUNDS, &mut key);
    key
}

/// Encrypt `plain` under a fresh random IV.
///
/// Returns the IV and the PKCS#7-padded ciphertext.
pub fn encrypt(plain: &[u8], password: &str) -> Result<([u8; IV_LEN], Vec<u8>)> {
    let mut iv = [0u8; IV_LEN];
    OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| Error::Crypto(format!("random IV generation failed: {e}")))?;

    let key = derive_key(password, &iv);
    let cipher = Aes256CbcEnc::new(GenericArray::from_slice(&key), GenericArray::from_slice(&iv));
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plain);
    Ok((iv, ciphertext))
}

/// Decrypt `ciphertext` with the key derived from `password` and `iv`.
///
/// Only structural failures are reported. If the final block does not carry
/// valid PKCS#7 padding, which is what a wrong password produces, the blocks
/// are returned as decrypted and left for the caller to reject.
pub fn decrypt(ciphertext: &[u8], iv: &[u8; IV_LEN], password: &str) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(Error::Crypto(format!(
            "ciphertext length {} is not a positive multiple of {BLOCK_LEN}",
            ciphertext.len()
        )));
    }

    let key = derive_key(password, iv);
    let cipher = Aes256CbcDec::new(GenericArray::from_slice(&key), GenericArray::from_slice(iv));
    let mut plain = cipher
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|e| Error::Crypto(format!("decryption failed: {e}")))?;

    match pkcs7_len(&plain) {
        Some(len) => plain.truncate(len),
        None => tracing::debug!("decrypted payload has invalid padding; keeping it unpadded"),
    }
    Ok(plain)
}

/// Length of `data` without its PKCS#7 padding, if the padding is valid.
fn pkcs7_len(data: &[u8]) -> Option<usize> {
    let pad = *data.last()? as usize;
    if pad == 0 || pad > BLOCK_LEN || pad > data.len() {
        return None;
    }
    let body = data.len() - pad;
    data[body..].iter().all(|&b| b as usize == pad).then_some(body)
}
