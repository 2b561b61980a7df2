//! # Protocol Configuration & Constants
//!
//! Every magic number in KEYSEAL lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Changing anything in the "Wire & Storage" section after records have been
//! written orphans those records. Choose wisely.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The protocol version string reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 for signatures. Deterministic, compact, boring in the best way.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Signing key length in bytes. Ed25519 secret keys are 32 bytes.
pub const SIGNING_KEY_LENGTH: usize = 32;

/// Public (verifying) key length in bytes.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// X25519 for the encryption sub-pair carried alongside every identity.
pub const KEY_EXCHANGE_ALGORITHM: &str = "X25519";

/// AES-256-GCM for symmetric encryption.
pub const SYMMETRIC_ALGORITHM: &str = "AES-256-GCM";

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce length in bytes. Twelve. Not 16. Not 8.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

/// Hash output length in bytes for BLAKE3 digests.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// BLAKE3 `derive_key` context for turning serialized keypair material into
/// an AES-256 key. Bump the version suffix if the serialization ever changes.
pub const ENVELOPE_KEY_CONTEXT: &str = "keyseal 2026 envelope symmetric key v1";

/// BLAKE3 `derive_key` context for the proof salt.
pub const PROOF_SALT_CONTEXT: &str = "keyseal 2026 validation proof salt v1";

/// BLAKE3 `derive_key` context for the session cookie MAC key.
pub const SESSION_MAC_CONTEXT: &str = "keyseal 2026 session cookie mac v1";

/// Argon2id memory cost for the validation proof, in KiB (19 MiB).
pub const PROOF_MEMORY_KIB: u32 = 19_456;

/// Argon2id iteration count for the validation proof.
pub const PROOF_TIME_COST: u32 = 2;

/// Argon2id lanes for the validation proof.
pub const PROOF_PARALLELISM: u32 = 1;

/// Length of the derived proof in bytes.
pub const PROOF_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Wire & Storage
// ---------------------------------------------------------------------------

/// Prefix for the canonical record address: `@<public key hex>`.
pub const RECORD_ADDRESS_PREFIX: &str = "@";

/// Prefix for the alias index address: `~<alias>`.
pub const ALIAS_ADDRESS_PREFIX: &str = "~";

/// Field holding the sealed credential record.
pub const CREDS_FIELD: &str = "creds";

/// Field in the alias index holding the owning public key.
pub const OWNER_FIELD: &str = "owner";

/// Separator between address and field in flat key/value backends.
/// A NUL byte cannot appear in a hex key or in a form-decoded alias.
pub const KEY_SEPARATOR: u8 = 0x00;

/// Name of the sled tree holding every document.
pub const DOCUMENTS_TREE: &str = "documents";

/// Largest plaintext a compressed value may claim to expand to. Sealed
/// records are a few hundred bytes; anything near this is hostile.
pub const MAX_DECOMPRESSED_BYTES: usize = 1 << 20;

/// Upper bound on any single store round-trip. Hitting it is a store failure,
/// never "not found".
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Credential Rules
// ---------------------------------------------------------------------------

/// Minimum secret-phrase length, counted in UTF-16 code units.
pub const MIN_SECRET_PHRASE_CHARS: usize = 20;

/// Minimum colour-code length, counted in UTF-16 code units.
pub const MIN_COLOR_CODE_CHARS: usize = 6;

/// Longest alias accepted, in UTF-16 code units. Aliases become store
/// addresses, so they are kept short.
pub const MAX_ALIAS_CHARS: usize = 64;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "KS_session";

/// Session cookie lifetime: 30 days.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default HTTP port for the authentication API.
pub const DEFAULT_HTTP_PORT: u16 = 9841;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Argon2id cost parameters for the validation proof.
///
/// Production uses the constants above. Tests dial these down so a full
/// register-then-validate cycle doesn't spend its life in a memory-hard KDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofParams {
    pub memory_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for ProofParams {
    fn default() -> Self {
        Self {
            memory_kib: PROOF_MEMORY_KIB,
            time_cost: PROOF_TIME_COST,
            parallelism: PROOF_PARALLELISM,
        }
    }
}

impl ProofParams {
    /// Cheap parameters for tests. Never ship these.
    pub fn insecure_fast() -> Self {
        Self {
            memory_kib: 64,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Tunables for the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Bound applied to every store call.
    pub store_timeout: Duration,
    /// Cost of the proof derived during validation.
    pub proof: ProofParams,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            proof: ProofParams::default(),
        }
    }
}

/// Canonical record address for a hex-encoded public key.
pub fn record_address(public_key_hex: &str) -> String {
    format!("{RECORD_ADDRESS_PREFIX}{public_key_hex}")
}

/// Alias index address. Surrounding whitespace is not part of an alias.
pub fn alias_address(alias: &str) -> String {
    format!("{ALIAS_ADDRESS_PREFIX}{}", alias.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_prefixes_are_distinct() {
        // If these collide, an alias could shadow a record. Bad day.
        assert_ne!(RECORD_ADDRESS_PREFIX, ALIAS_ADDRESS_PREFIX);
        assert_ne!(record_address("abc"), alias_address("abc"));
    }

    #[test]
    fn test_record_address_format() {
        assert_eq!(record_address("deadbeef"), "@deadbeef");
        assert_eq!(alias_address("alice"), "~alice");
    }

    #[test]
    fn test_alias_address_ignores_surrounding_whitespace() {
        assert_eq!(alias_address("  zed\t"), alias_address("zed"));
    }

    #[test]
    fn test_crypto_parameter_sizes() {
        assert_eq!(SIGNING_KEY_LENGTH, 32);
        assert_eq!(VERIFYING_KEY_LENGTH, 32);
        assert_eq!(SIGNATURE_LENGTH, 64);
        assert_eq!(AES_KEY_LENGTH, 32);
        assert_eq!(AES_NONCE_LENGTH, 12);
        assert_eq!(HASH_OUTPUT_LENGTH, 32);
    }

    #[test]
    fn test_credential_rules_sanity() {
        assert!(MIN_SECRET_PHRASE_CHARS > MIN_COLOR_CODE_CHARS);
        assert_eq!(MIN_SECRET_PHRASE_CHARS, 20);
    }

    #[test]
    fn test_default_config_uses_constants() {
        let cfg = IdentityConfig::default();
        assert_eq!(cfg.store_timeout, DEFAULT_STORE_TIMEOUT);
        assert_eq!(cfg.proof.memory_kib, PROOF_MEMORY_KIB);
        assert!(ProofParams::insecure_fast().memory_kib < cfg.proof.memory_kib);
    }

    #[test]
    fn test_contexts_are_distinct() {
        assert_ne!(ENVELOPE_KEY_CONTEXT, PROOF_SALT_CONTEXT);
        assert_ne!(ENVELOPE_KEY_CONTEXT, SESSION_MAC_CONTEXT);
        assert_ne!(PROOF_SALT_CONTEXT, SESSION_MAC_CONTEXT);
    }
}
