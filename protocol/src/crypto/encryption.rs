//! # AES-256-GCM Encryption
//!
//! The symmetric half of the envelope. Every credential record and every
//! master-layer wrap is encrypted here before it gets signed.
//!
//! ## Keying
//!
//! There are no standalone symmetric keys in KEYSEAL. The AES key is
//! derived from the serialized material of whatever keypair the caller
//! seals under (see [`Keypair::material`]) via BLAKE3's `derive_key` mode,
//! with a fixed domain-separation context. Same keypair, same AES key;
//! anyone holding the keypair can open what was sealed under it.
//!
//! ## Nonce management
//!
//! Random 96-bit nonces from a CSPRNG. The birthday bound is ~2^48
//! messages per key, which a single identity will not approach by writing
//! one credential record.
//!
//! ## Wire format
//!
//! `encrypt()` returns `nonce || ciphertext` as a single `Vec<u8>`. The
//! first 12 bytes are the nonce, the rest is the ciphertext + auth tag.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use super::keys::Keypair;
use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH, ENVELOPE_KEY_CONTEXT};

/// Errors that can occur during encryption/decryption.
///
/// We intentionally keep these vague. The difference between "wrong key"
/// and "corrupted ciphertext" is none of an attacker's business.
#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("ciphertext too short: must be at least {AES_NONCE_LENGTH} bytes")]
    CiphertextTooShort,
}

/// Derive the AES-256 key for a keypair from its serialized material.
pub fn derive_key(keypair: &Keypair) -> [u8; AES_KEY_LENGTH] {
    blake3::derive_key(ENVELOPE_KEY_CONTEXT, &keypair.material())
}

/// Encrypt plaintext with AES-256-GCM using a random nonce.
///
/// Returns `nonce || ciphertext`.
///
/// # Example
///
/// ```
/// use keyseal_protocol::crypto::encryption::{encrypt, decrypt};
///
/// let key = [0x42u8; 32];
/// let sealed = encrypt(&key, b"alias and phrase").unwrap();
/// assert_eq!(decrypt(&key, &sealed).unwrap(), b"alias and phrase");
/// ```
pub fn encrypt(key: &[u8; AES_KEY_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;

    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| EncryptionError::EncryptFailed)?;

    let mut out = Vec::with_capacity(AES_NONCE_LENGTH + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt data previously encrypted with [`encrypt`].
///
/// Returns `EncryptionError::DecryptFailed` for a wrong key, a modified
/// ciphertext, or a mismatched nonce. We don't distinguish on purpose.
pub fn decrypt(key: &[u8; AES_KEY_LENGTH], data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    if data.len() < AES_NONCE_LENGTH {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let (nonce_bytes, ciphertext) = data.split_at(AES_NONCE_LENGTH);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| EncryptionError::DecryptFailed)
}

/// Encrypt under the key derived from `keypair`.
pub fn encrypt_for(keypair: &Keypair, plaintext: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    encrypt(&derive_key(keypair), plaintext)
}

/// Decrypt under the key derived from `keypair`.
pub fn decrypt_for(keypair: &Keypair, data: &[u8]) -> Result<Vec<u8>, EncryptionError> {
    decrypt(&derive_key(keypair), data)
}
