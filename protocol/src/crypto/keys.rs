//! # Key Management
//!
//! Identity keypairs for KEYSEAL. A user *is* a keypair: an Ed25519 signing
//! key, optionally extended with an X25519 encryption sub-pair. There is no
//! password anywhere in the system. Whoever holds the keypair is the user.
//!
//! Three shapes of key material live here:
//!
//! - [`Keypair`]: the in-memory, typed keypair. Signs, verifies, and
//!   yields the secret material the envelope layer derives its AES key from.
//! - [`AuthKeys`]: the wire form `{ "pub": hex, "priv": hex }`. This is
//!   what callers paste into a login form and what registration hands back.
//! - [`MasterKeypair`]: the node's own four-field keypair. Loaded once at
//!   start-up, passed around as `Arc<MasterKeypair>`, never a global.
//!
//! ## Security considerations
//!
//! - Private keys are zeroized on drop (thanks, ed25519-dalek and x25519-dalek).
//! - Key generation uses `OsRng`.
//! - Key bytes are never logged. If you add logging to this module,
//!   you will be asked to leave.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::config::{SIGNATURE_LENGTH, SIGNING_KEY_LENGTH, VERIFYING_KEY_LENGTH};

/// Errors that can occur during key operations.
///
/// These are intentionally vague about *why* something failed: leaking
/// details about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid secret key: expected {SIGNING_KEY_LENGTH} hex-encoded bytes")]
    InvalidSecretKey,

    #[error("invalid public key: expected a {VERIFYING_KEY_LENGTH}-byte hex-encoded point")]
    InvalidPublicKey,

    #[error("keypair validation failed: public key does not match secret key")]
    KeypairMismatch,

    #[error("master keypair is incomplete: {0} is missing")]
    MissingMasterField(&'static str),
}

// ---------------------------------------------------------------------------
// Hex helpers
// ---------------------------------------------------------------------------

fn decode_32(hex_str: &str) -> Option<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim()).ok()?;
    bytes.as_slice().try_into().ok()
}

// ---------------------------------------------------------------------------
// AuthKeys (wire form)
// ---------------------------------------------------------------------------

/// The caller-facing `{pub, priv}` pair, both hex-encoded.
///
/// Used for the signing pair (`auth`) and the encryption sub-pair (`enc`)
/// alike. It derives `Serialize` because it *is* the thing we hand to the
/// caller, but its `Debug` impl never prints `priv`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthKeys {
    #[serde(rename = "pub")]
    pub public: String,
    #[serde(rename = "priv")]
    pub private: String,
}

impl AuthKeys {
    pub fn new(public: impl Into<String>, private: impl Into<String>) -> Self {
        Self {
            public: public.into(),
            private: private.into(),
        }
    }
}

impl fmt::Debug for AuthKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthKeys")
            .field("pub", &self.public)
            .field("priv", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EncryptionKeypair
// ---------------------------------------------------------------------------

/// The X25519 encryption sub-pair (`epub`/`epriv`).
///
/// Stored inside the sealed credential record and handed to the session
/// layer after a successful login.
#[derive(Clone)]
pub struct EncryptionKeypair {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl EncryptionKeypair {
    /// Generate a fresh sub-pair from the OS RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild from raw secret bytes. The public half is re-derived.
    pub fn from_secret_bytes(bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild from the wire form, checking that `pub` matches `priv`.
    pub fn from_auth_keys(keys: &AuthKeys) -> Result<Self, KeyError> {
        let secret = decode_32(&keys.private).ok_or(KeyError::InvalidSecretKey)?;
        let public = decode_32(&keys.public).ok_or(KeyError::InvalidPublicKey)?;
        let pair = Self::from_secret_bytes(secret);
        if pair.public.to_bytes() != public {
            return Err(KeyError::KeypairMismatch);
        }
        Ok(pair)
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Wire form of this sub-pair.
    pub fn auth_keys(&self) -> AuthKeys {
        AuthKeys::new(self.public_key_hex(), hex::encode(self.secret_key_bytes()))
    }
}

impl fmt::Debug for EncryptionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKeypair(epub={})", self.public_key_hex())
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// A KEYSEAL identity keypair.
///
/// `Keypair` intentionally does NOT implement `Serialize`/`Deserialize`.
/// Use [`auth_keys`](Self::auth_keys) when you deliberately mean to hand the
/// private half to its owner.
///
/// # Examples
///
/// ```
/// use keyseal_protocol::crypto::keys::Keypair;
///
/// let kp = Keypair::generate();
/// let sig = kp.sign(b"hello");
/// assert!(kp.public_key().verify(b"hello", &sig));
/// ```
pub struct Keypair {
    signing_key: SigningKey,
    encryption: Option<EncryptionKeypair>,
}

/// The public half of a signing keypair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: [u8; 32],
}

/// An Ed25519 signature. Always 64 bytes when produced by us; anything
/// else simply fails verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    bytes: Vec<u8>,
}

impl Keypair {
    /// Generate a fresh signing keypair with no encryption sub-pair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
            encryption: None,
        }
    }

    /// Generate a signing keypair together with a fresh encryption sub-pair.
    pub fn generate_with_encryption() -> Self {
        Self::generate().with_encryption(EncryptionKeypair::generate())
    }

    /// Deterministic construction from a 32-byte seed. Weak seed, weak key.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
            encryption: None,
        }
    }

    /// Rebuild a signing keypair from its wire form.
    ///
    /// The public key is re-derived from `priv` and must equal `pub`; a
    /// caller presenting someone else's public key with their own private
    /// key gets [`KeyError::KeypairMismatch`], not a confusing decrypt error.
    pub fn from_auth_keys(keys: &AuthKeys) -> Result<Self, KeyError> {
        let secret = decode_32(&keys.private).ok_or(KeyError::InvalidSecretKey)?;
        let claimed = PublicKey::from_hex(&keys.public)?;
        let keypair = Self::from_seed(&secret);
        if keypair.public_key() != claimed {
            return Err(KeyError::KeypairMismatch);
        }
        Ok(keypair)
    }

    /// Attach an encryption sub-pair.
    pub fn with_encryption(mut self, encryption: EncryptionKeypair) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// A copy of this keypair without the encryption sub-pair.
    pub fn signing_only(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }

    pub fn encryption(&self) -> Option<&EncryptionKeypair> {
        self.encryption.as_ref()
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Hex public key. This is what record addresses are built from.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Sign a message. Deterministic per RFC 8032.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes().to_vec(),
        }
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public_key().verify(message, signature)
    }

    /// Raw 32-byte signing secret. **Handle with extreme care.**
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Wire form of the signing pair.
    pub fn auth_keys(&self) -> AuthKeys {
        AuthKeys::new(self.public_key_hex(), hex::encode(self.secret_key_bytes()))
    }

    /// Serialized key material, in a fixed order: signing secret, signing
    /// public, then the encryption secret and public when present.
    ///
    /// The envelope layer derives its symmetric key from these bytes, so a
    /// four-field keypair and its two-field signing half seal differently.
    pub fn material(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(128);
        out.extend_from_slice(&self.secret_key_bytes());
        out.extend_from_slice(&self.public_key_bytes());
        if let Some(enc) = &self.encryption {
            out.extend_from_slice(&enc.secret_key_bytes());
            out.extend_from_slice(&enc.public_key_bytes());
        }
        out
    }
}

impl Clone for Keypair {
    /// Cloning a keypair is allowed but should make you uncomfortable.
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
            encryption: self.encryption.clone(),
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even "partially."
        match &self.encryption {
            Some(enc) => write!(
                f,
                "Keypair(pub={}, epub={})",
                self.public_key_hex(),
                enc.public_key_hex()
            ),
            None => write!(f, "Keypair(pub={})", self.public_key_hex()),
        }
    }
}

impl PartialEq for Keypair {
    /// Compared by public halves only. Comparing secrets in non-constant
    /// time is a habit worth not having.
    fn eq(&self, other: &Self) -> bool {
        self.public_key_bytes() == other.public_key_bytes()
            && self.encryption.as_ref().map(|e| e.public_key_bytes())
                == other.encryption.as_ref().map(|e| e.public_key_bytes())
    }
}

impl Eq for Keypair {}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

impl PublicKey {
    /// Parse and validate a hex public key. Off-curve points are rejected.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = decode_32(s).ok_or(KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Verify a signature. `false` on any failure, never a panic.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let Some(dalek_sig) = signature.to_dalek_signature() else {
            return false;
        };
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn to_dalek_signature(&self) -> Option<DalekSignature> {
        let arr: [u8; SIGNATURE_LENGTH] = self.bytes.as_slice().try_into().ok()?;
        Some(DalekSignature::from_bytes(&arr))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse a hex signature. Length is checked at verification time.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self {
            bytes: hex::decode(s)?,
        })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        if hex_str.len() >= 128 {
            write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
        } else {
            write!(f, "Signature({})", hex_str)
        }
    }
}

// ---------------------------------------------------------------------------
// MasterKeypair
// ---------------------------------------------------------------------------

/// The node's own keypair: all four fields, always.
///
/// Wraps every stored value and keys the session cookie MAC. Built once at
/// start-up from configuration and injected into each component.
#[derive(Clone)]
pub struct MasterKeypair {
    keypair: Keypair,
    encryption: EncryptionKeypair,
}

impl MasterKeypair {
    /// A disposable master keypair. Tests and `keyseal-node generate`.
    pub fn generate() -> Self {
        Self::from_parts(Keypair::generate(), EncryptionKeypair::generate())
    }

    fn from_parts(signing: Keypair, encryption: EncryptionKeypair) -> Self {
        Self {
            keypair: signing.with_encryption(encryption.clone()),
            encryption,
        }
    }

    /// Build from the four hex-encoded configuration values.
    ///
    /// Empty strings count as missing, so an unset environment variable that
    /// clap turned into `""` gets a useful error instead of a hex error.
    pub fn from_hex_parts(
        public: &str,
        private: &str,
        enc_public: &str,
        enc_private: &str,
    ) -> Result<Self, KeyError> {
        for (name, value) in [
            ("PUB", public),
            ("PRIV", private),
            ("EPUB", enc_public),
            ("EPRIV", enc_private),
        ] {
            if value.trim().is_empty() {
                return Err(KeyError::MissingMasterField(name));
            }
        }
        let signing = Keypair::from_auth_keys(&AuthKeys::new(public, private))?;
        let encryption = EncryptionKeypair::from_auth_keys(&AuthKeys::new(enc_public, enc_private))?;
        Ok(Self::from_parts(signing, encryption))
    }

    /// The full four-field keypair. Seal and open under this.
    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }

    pub fn encryption(&self) -> &EncryptionKeypair {
        &self.encryption
    }

    pub fn public_key_hex(&self) -> String {
        self.keypair.public_key_hex()
    }

    /// The four configuration values, hex-encoded: `(pub, priv, epub, epriv)`.
    pub fn to_hex_parts(&self) -> (String, String, String, String) {
        let auth = self.keypair.auth_keys();
        let enc = self.encryption.auth_keys();
        (auth.public, auth.private, enc.public, enc.private)
    }
}

impl fmt::Debug for MasterKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MasterKeypair(pub={})", self.public_key_hex())
    }
}
