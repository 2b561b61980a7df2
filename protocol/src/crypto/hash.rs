//! # Hashing Utilities
//!
//! BLAKE3 for everything fast, Argon2id for the one thing that should be slow.
//!
//! - **BLAKE3**: digests, keyed MACs (session cookies), and the salt for
//!   the validation proof.
//! - **Argon2id**: the validation proof itself. Logging in means proving
//!   you can decrypt your record *and* paying a memory-hard derivation over
//!   the decrypted bytes and your keypair. Online guessing gets expensive.
//!
//! ## derive_proof
//!
//! ```text
//! salt  = BLAKE3-derive_key(PROOF_SALT_CONTEXT, keypair material)
//! proof = Argon2id(password = data || public key, salt, params)
//! ```
//!
//! Deterministic for a given (data, keypair, params). Not a random nonce.

use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

use super::keys::Keypair;
use crate::config::{ProofParams, HASH_OUTPUT_LENGTH, PROOF_OUTPUT_LENGTH, PROOF_SALT_CONTEXT};

/// Errors from the proof derivation.
#[derive(Debug, Error)]
pub enum ProofError {
    #[error("invalid proof parameters: {0}")]
    InvalidParams(String),

    #[error("proof derivation failed: {0}")]
    DerivationFailed(String),
}

/// BLAKE3 digest of the input.
///
/// ```
/// use keyseal_protocol::crypto::blake3_hash;
///
/// assert_eq!(blake3_hash(b"keyseal").len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 keyed hash. A MAC, when the key is secret.
pub fn keyed_hash(key: &[u8; 32], data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    *blake3::keyed_hash(key, data).as_bytes()
}

/// Constant-time comparison of two MACs. `blake3::Hash` implements
/// constant-time `PartialEq`, so we lean on it rather than `==` on arrays.
pub fn mac_eq(a: &[u8; HASH_OUTPUT_LENGTH], b: &[u8; HASH_OUTPUT_LENGTH]) -> bool {
    blake3::Hash::from(*a) == blake3::Hash::from(*b)
}

/// Derive the validation proof over `data` and `keypair`.
pub fn derive_proof(
    data: &[u8],
    keypair: &Keypair,
    params: ProofParams,
) -> Result<Vec<u8>, ProofError> {
    let argon_params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.parallelism,
        Some(PROOF_OUTPUT_LENGTH),
    )
    .map_err(|e| ProofError::InvalidParams(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let salt = blake3::derive_key(PROOF_SALT_CONTEXT, &keypair.material());

    let mut password = Vec::with_capacity(data.len() + 32);
    password.extend_from_slice(data);
    password.extend_from_slice(&keypair.public_key_bytes());

    let mut output = vec![0u8; PROOF_OUTPUT_LENGTH];
    argon2
        .hash_password_into(&password, &salt, &mut output)
        .map_err(|e| ProofError::DerivationFailed(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake3_deterministic() {
        assert_eq!(blake3_hash(b"keyseal"), blake3_hash(b"keyseal"));
        assert_ne!(blake3_hash(b"keyseal"), blake3_hash(b"keyseaL"));
    }

    #[test]
    fn test_keyed_hash_depends_on_key() {
        let a = keyed_hash(&[1u8; 32], b"cookie");
        let b = keyed_hash(&[2u8; 32], b"cookie");
        assert!(!mac_eq(&a, &b));
        assert!(mac_eq(&a, &keyed_hash(&[1u8; 32], b"cookie")));
    }

    #[test]
    fn test_proof_deterministic() {
        let kp = Keypair::generate();
        let params = ProofParams::insecure_fast();
        let p1 = derive_proof(b"record", &kp, params).unwrap();
        let p2 = derive_proof(b"record", &kp, params).unwrap();
        assert_eq!(p1, p2);
        assert_eq!(p1.len(), PROOF_OUTPUT_LENGTH);
    }

    #[test]
    fn test_proof_bound_to_keypair_and_data() {
        let params = ProofParams::insecure_fast();
        let kp = Keypair::generate();
        let base = derive_proof(b"record", &kp, params).unwrap();
        assert_ne!(base, derive_proof(b"record!", &kp, params).unwrap());
        assert_ne!(
            base,
            derive_proof(b"record", &Keypair::generate(), params).unwrap()
        );
    }

    #[test]
    fn test_proof_rejects_bad_params() {
        let params = ProofParams {
            memory_kib: 1,
            time_cost: 0,
            parallelism: 1,
        };
        assert!(matches!(
            derive_proof(b"x", &Keypair::generate(), params),
            Err(ProofError::InvalidParams(_))
        ));
    }
}
