//! # Digital Signatures
//!
//! Ed25519 signing and verification, plus the signed-blob text format the
//! envelope layer hands to storage.
//!
//! ## Signed blob
//!
//! A signed blob is a small JSON object:
//!
//! ```text
//! {"m":"<base64url message>","s":"<hex signature>"}
//! ```
//!
//! `m` is the signed message (in practice, AES-GCM ciphertext), `s` is the
//! Ed25519 signature over the decoded `m` bytes. JSON because it's text, it
//! survives every key/value store we've thrown it at, and it's debuggable
//! with `jq`. The outer compression layer makes the overhead irrelevant.

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::keys::{Keypair, PublicKey, Signature};

/// Errors during signature operations.
///
/// Intentionally vague: we don't tell attackers why verification failed.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("malformed signed blob")]
    MalformedBlob,
}

/// Sign a message using a keypair.
pub fn sign(keypair: &Keypair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

/// Verify an Ed25519 signature. `true` if valid, `false` otherwise.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature)
}

/// A message together with its detached signature, in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBlob {
    /// Base64url (no padding) encoded message bytes.
    pub m: String,
    /// Hex-encoded Ed25519 signature over the decoded message.
    pub s: String,
}

impl SignedBlob {
    /// Sign `message` and package it.
    pub fn sign(keypair: &Keypair, message: &[u8]) -> Self {
        Self {
            m: BASE64_URL_SAFE_NO_PAD.encode(message),
            s: sign(keypair, message).to_hex(),
        }
    }

    /// Serialize to the JSON text form.
    pub fn to_text(&self) -> String {
        // Two string fields: serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse the JSON text form.
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        serde_json::from_str(text).map_err(|_| SignatureError::MalformedBlob)
    }

    /// Cheap check: does this text look like a signed blob rather than
    /// something compressed? Compressed text is base64url and can never
    /// start with `{`.
    pub fn looks_like(text: &str) -> bool {
        text.trim_start().starts_with('{')
    }

    /// Verify against `public_key` and return the message bytes.
    pub fn verify(&self, public_key: &PublicKey) -> Result<Vec<u8>, SignatureError> {
        let message = BASE64_URL_SAFE_NO_PAD
            .decode(&self.m)
            .map_err(|_| SignatureError::MalformedBlob)?;
        let signature = Signature::from_hex(&self.s).map_err(|_| SignatureError::MalformedBlob)?;
        if !verify(public_key, &message, &signature) {
            return Err(SignatureError::VerificationFailed);
        }
        Ok(message)
    }
}
