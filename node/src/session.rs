//! # Session Cookies
//!
//! [`CookieSessionIssuer`] turns a [`SessionPayload`] into a `Set-Cookie`
//! header value:
//!
//! ```text
//! KS_session=<base64url(json)>.<hex(blake3 keyed MAC)>; Path=/; Max-Age=2592000; HttpOnly; Secure; SameSite=Lax
//! ```
//!
//! The MAC key is derived from the master encryption private key, so a node
//! restarted with the same master keys still accepts its own cookies, and a
//! node with different keys rejects them. The payload itself is already
//! sealed under the master keypair; the MAC only stops clients from editing
//! the colour code or swapping envelopes.

use base64::prelude::*;

use keyseal_protocol::config::{SESSION_COOKIE_NAME, SESSION_MAC_CONTEXT, SESSION_MAX_AGE};
use keyseal_protocol::crypto::hash::{keyed_hash, mac_eq};
use keyseal_protocol::crypto::keys::MasterKeypair;
use keyseal_protocol::identity::{SessionError, SessionIssuer, SessionPayload};

pub struct CookieSessionIssuer {
    mac_key: [u8; 32],
}

impl CookieSessionIssuer {
    pub fn new(master: &MasterKeypair) -> Self {
        Self {
            mac_key: blake3::derive_key(
                SESSION_MAC_CONTEXT,
                &master.encryption().secret_key_bytes(),
            ),
        }
    }

    /// `base64url(json).hex(mac)`
    fn encode_value(&self, payload: &SessionPayload) -> Result<String, SessionError> {
        let json = serde_json::to_vec(payload).map_err(|e| SessionError::Encode(e.to_string()))?;
        let body = BASE64_URL_SAFE_NO_PAD.encode(json);
        let mac = keyed_hash(&self.mac_key, body.as_bytes());
        Ok(format!("{body}.{}", hex::encode(mac)))
    }

    /// Pull our cookie's value out of a request `Cookie` header.
    pub fn cookie_value(header: &str) -> Option<&str> {
        header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE_NAME).then_some(value)
        })
    }
}

impl SessionIssuer for CookieSessionIssuer {
    fn issue(&self, payload: &SessionPayload) -> Result<String, SessionError> {
        let value = self.encode_value(payload)?;
        Ok(format!(
            "{SESSION_COOKIE_NAME}={value}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=Lax",
            SESSION_MAX_AGE.as_secs()
        ))
    }

    fn read(&self, value: &str) -> Result<SessionPayload, SessionError> {
        let (body, mac_hex) = value.rsplit_once('.').ok_or(SessionError::Malformed)?;

        let mut presented = [0u8; 32];
        hex::decode_to_slice(mac_hex, &mut presented).map_err(|_| SessionError::Malformed)?;
        let expected = keyed_hash(&self.mac_key, body.as_bytes());
        if !mac_eq(&expected, &presented) {
            return Err(SessionError::Tampered);
        }

        let json = BASE64_URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|_| SessionError::Malformed)?;
        serde_json::from_slice(&json).map_err(|_| SessionError::Malformed)
    }
}
