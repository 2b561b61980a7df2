//! Session payload handed to the session issuer after a successful
//! registration or login.
//!
//! The payload carries the identity's encryption sub-pair, sealed under the
//! master keypair, plus the colour code the user typed. How it becomes a
//! cookie (or anything else) is the issuer's business; see
//! [`SessionIssuer`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::envelope::{open, seal_and_compress, EnvelopeError};
use crate::crypto::keys::{AuthKeys, MasterKeypair};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not seal session payload: {0}")]
    Seal(#[from] EnvelopeError),

    #[error("could not encode session: {0}")]
    Encode(String),

    #[error("session value is malformed")]
    Malformed,

    #[error("session value failed authentication")]
    Tampered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    #[serde(rename = "encryptedEnvelope")]
    pub encrypted_envelope: String,
    #[serde(rename = "colorCode")]
    pub color_code: String,
}

impl SessionPayload {
    /// Seal `encryption` under the master keypair and pair it with the
    /// colour code.
    pub fn seal(
        encryption: &AuthKeys,
        color_code: &str,
        master: &MasterKeypair,
    ) -> Result<Self, SessionError> {
        let json =
            serde_json::to_vec(encryption).map_err(|e| SessionError::Encode(e.to_string()))?;
        Ok(Self {
            encrypted_envelope: seal_and_compress(&json, master.keypair())?,
            color_code: color_code.to_owned(),
        })
    }

    /// Recover the encryption sub-pair. Only the master keypair that sealed
    /// it can do this.
    pub fn open_encryption(&self, master: &MasterKeypair) -> Result<AuthKeys, SessionError> {
        let json = open(&self.encrypted_envelope, master.keypair())?;
        serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)
    }
}

/// Turns a [`SessionPayload`] into a transport value (e.g. a `Set-Cookie`
/// header) and back.
pub trait SessionIssuer: Send + Sync {
    fn issue(&self, payload: &SessionPayload) -> Result<String, SessionError>;

    /// Parse a value previously produced by [`issue`](Self::issue). Returns
    /// [`SessionError::Tampered`] if it was altered.
    fn read(&self, value: &str) -> Result<SessionPayload, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_recovers_subpair() {
        let master = MasterKeypair::generate();
        let enc = AuthKeys::new("aa".repeat(32), "bb".repeat(32));
        let payload = SessionPayload::seal(&enc, "aabbcc", &master).unwrap();

        assert_eq!(payload.color_code, "aabbcc");
        assert!(!payload.encrypted_envelope.contains(&enc.private));
        assert_eq!(payload.open_encryption(&master).unwrap(), enc);
    }

    #[test]
    fn other_master_cannot_open() {
        let enc = AuthKeys::new("aa", "bb");
        let payload = SessionPayload::seal(&enc, "aabbcc", &MasterKeypair::generate()).unwrap();
        assert!(matches!(
            payload.open_encryption(&MasterKeypair::generate()),
            Err(SessionError::Seal(EnvelopeError::Integrity))
        ));
    }

    #[test]
    fn json_field_names() {
        let payload = SessionPayload {
            encrypted_envelope: "x".into(),
            color_code: "y".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "encryptedEnvelope": "x", "colorCode": "y" }));
    }
}
