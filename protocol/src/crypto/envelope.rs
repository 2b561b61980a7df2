//! # Crypto Envelope
//!
//! Seal = encrypt, then sign the ciphertext, then (optionally) compress.
//! Open = decompress if needed, verify, then (optionally) decrypt.
//!
//! ```text
//!   payload ──AES-256-GCM(key(keypair))──▶ ciphertext
//!           ──Ed25519(keypair)──────────▶ {"m": ct, "s": sig}   (seal_and_sign)
//!           ──LZ4 + base64url───────────▶ compact text          (seal_and_compress)
//! ```
//!
//! Integrity is bound to the *ciphertext*: tampering is caught by the
//! signature check before a single AES-GCM operation runs, so malformed
//! input never reaches the decryptor.
//!
//! ## Failure modes
//!
//! | Error                        | Meaning                                           |
//! |------------------------------|---------------------------------------------------|
//! | [`EnvelopeError::Encryption`] | payload could not be serialized or encrypted      |
//! | [`EnvelopeError::Integrity`]  | input undecodable or signature check failed      |
//! | [`EnvelopeError::Decryption`] | signature fine, but the keypair can't decrypt it |
//!
//! Nothing here panics on hostile input.

use serde::Serialize;
use thiserror::Error;

use super::compression::{compress, decompress};
use super::encryption::{decrypt_for, encrypt_for};
use super::keys::Keypair;
use super::signatures::SignedBlob;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("could not seal payload")]
    Encryption,

    #[error("integrity check failed")]
    Integrity,

    #[error("could not decrypt payload")]
    Decryption,
}

/// Result of [`open_verified`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opened {
    /// Signature checked, payload still encrypted.
    Verified(Vec<u8>),
    /// Signature checked and payload decrypted.
    Plaintext(Vec<u8>),
}

impl Opened {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Opened::Verified(bytes) | Opened::Plaintext(bytes) => bytes,
        }
    }
}

/// Encrypt `payload` under `keypair` and sign the ciphertext. Returns the
/// uncompressed signed blob text.
pub fn seal_and_sign(payload: &[u8], keypair: &Keypair) -> Result<String, EnvelopeError> {
    let ciphertext = encrypt_for(keypair, payload).map_err(|_| EnvelopeError::Encryption)?;
    Ok(SignedBlob::sign(keypair, &ciphertext).to_text())
}

/// [`seal_and_sign`], then compress the blob to compact text.
///
/// ```
/// use keyseal_protocol::crypto::envelope::{open, seal_and_compress};
/// use keyseal_protocol::crypto::keys::Keypair;
///
/// let kp = Keypair::generate();
/// let sealed = seal_and_compress(b"hello", &kp).unwrap();
/// assert_eq!(open(&sealed, &kp).unwrap(), b"hello");
/// ```
pub fn seal_and_compress(payload: &[u8], keypair: &Keypair) -> Result<String, EnvelopeError> {
    Ok(compress(&seal_and_sign(payload, keypair)?))
}

/// Serialize `value` to JSON and seal it with [`seal_and_sign`].
pub fn seal_json<T: Serialize>(value: &T, keypair: &Keypair) -> Result<String, EnvelopeError> {
    let payload = serde_json::to_vec(value).map_err(|_| EnvelopeError::Encryption)?;
    seal_and_sign(&payload, keypair)
}

/// Open a sealed value, compressed or raw.
///
/// Verification always uses the public half of `keypair`. Unless
/// `verify_only` is set, the verified ciphertext is then decrypted with the
/// full keypair.
pub fn open_verified(
    input: &str,
    keypair: &Keypair,
    verify_only: bool,
) -> Result<Opened, EnvelopeError> {
    let blob_text = if SignedBlob::looks_like(input) {
        input.to_owned()
    } else {
        decompress(input).map_err(|e| {
            tracing::debug!(error = %e, "sealed input did not decompress");
            EnvelopeError::Integrity
        })?
    };

    let blob = SignedBlob::parse(&blob_text).map_err(|_| EnvelopeError::Integrity)?;
    let ciphertext = blob
        .verify(&keypair.public_key())
        .map_err(|_| EnvelopeError::Integrity)?;

    if verify_only {
        return Ok(Opened::Verified(ciphertext));
    }

    decrypt_for(keypair, &ciphertext)
        .map(Opened::Plaintext)
        .map_err(|_| EnvelopeError::Decryption)
}

/// Verify and decrypt, returning the plaintext bytes.
pub fn open(input: &str, keypair: &Keypair) -> Result<Vec<u8>, EnvelopeError> {
    open_verified(input, keypair, false).map(Opened::into_bytes)
}

/// Verify and decrypt a payload that is known to be UTF-8 text.
pub fn open_text(input: &str, keypair: &Keypair) -> Result<String, EnvelopeError> {
    String::from_utf8(open(input, keypair)?).map_err(|_| EnvelopeError::Decryption)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::EncryptionKeypair;

    #[test]
    fn test_compressed_roundtrip() {
        let kp = Keypair::generate();
        let sealed = seal_and_compress(b"alias + phrase", &kp).unwrap();
        assert!(!SignedBlob::looks_like(&sealed));
        assert_eq!(open(&sealed, &kp).unwrap(), b"alias + phrase");
    }

    #[test]
    fn test_raw_roundtrip() {
        let kp = Keypair::generate_with_encryption();
        let sealed = seal_and_sign(b"inner layer", &kp).unwrap();
        assert!(SignedBlob::looks_like(&sealed));
        assert_eq!(open(&sealed, &kp).unwrap(), b"inner layer");
    }

    #[test]
    fn test_roundtrip_various_payloads() {
        let kp = Keypair::generate();
        for payload in [
            Vec::new(),
            b"x".to_vec(),
            "ünïcödé 🔑".as_bytes().to_vec(),
            vec![0xAB; 8 * 1024],
        ] {
            let sealed = seal_and_compress(&payload, &kp).unwrap();
            assert_eq!(open(&sealed, &kp).unwrap(), payload);
        }
    }

    #[test]
    fn test_verify_only_returns_ciphertext() {
        let kp = Keypair::generate();
        let sealed = seal_and_compress(b"plain", &kp).unwrap();
        match open_verified(&sealed, &kp, true).unwrap() {
            Opened::Verified(ct) => assert_ne!(ct, b"plain"),
            Opened::Plaintext(_) => panic!("verify_only must not decrypt"),
        }
    }

    #[test]
    fn test_wrong_keypair_fails_integrity() {
        let sealed = seal_and_compress(b"secret", &Keypair::generate()).unwrap();
        assert!(matches!(
            open(&sealed, &Keypair::generate()),
            Err(EnvelopeError::Integrity)
        ));
    }

    #[test]
    fn test_same_signer_wrong_material_fails_decryption() {
        // Signature checks out (same signing key) but the symmetric key was
        // derived from the four-field material.
        let full = Keypair::generate().with_encryption(EncryptionKeypair::generate());
        let sealed = seal_and_sign(b"secret", &full).unwrap();
        assert!(matches!(
            open(&sealed, &full.signing_only()),
            Err(EnvelopeError::Decryption)
        ));
    }

    #[test]
    fn test_every_byte_flip_fails_verification() {
        let kp = Keypair::generate();
        let sealed = seal_and_sign(b"tamper me", &kp).unwrap();
        let bytes = sealed.as_bytes();
        for i in 0..bytes.len() {
            let mut flipped = bytes.to_vec();
            flipped[i] ^= 0x01;
            let Ok(text) = String::from_utf8(flipped) else {
                continue;
            };
            if text == sealed {
                continue;
            }
            let result = open(&text, &kp);
            assert!(
                matches!(result, Err(EnvelopeError::Integrity)),
                "flip at {i} gave {result:?}"
            );
        }
    }

    #[test]
    fn test_compressed_flip_never_yields_plaintext() {
        let kp = Keypair::generate();
        let sealed = seal_and_compress(b"tamper me too", &kp).unwrap();
        let bytes = sealed.as_bytes();
        for i in 0..bytes.len() {
            let mut flipped = bytes.to_vec();
            flipped[i] ^= 0x01;
            let Ok(text) = String::from_utf8(flipped) else {
                continue;
            };
            if let Ok(plain) = open(&text, &kp) {
                // A flip inside base64 padding bits can decode to the same
                // bytes. Anything else must fail.
                assert_eq!(plain, b"tamper me too", "flip at {i} produced garbage");
            }
        }
    }

    #[test]
    fn test_garbage_input_is_integrity_error() {
        let kp = Keypair::generate();
        assert!(matches!(open("", &kp), Err(EnvelopeError::Integrity)));
        assert!(matches!(open("{}", &kp), Err(EnvelopeError::Integrity)));
        assert!(matches!(open("!!!", &kp), Err(EnvelopeError::Integrity)));
    }

    #[test]
    fn test_seal_json_opens_as_text() {
        let kp = Keypair::generate();
        let sealed = seal_json(&serde_json::json!({ "a": "alice" }), &kp).unwrap();
        let text = open_text(&sealed, &kp).unwrap();
        assert_eq!(text, r#"{"a":"alice"}"#);
    }
}
