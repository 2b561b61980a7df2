//! # Cryptographic Primitives for KEYSEAL
//!
//! Every sealed record, every signature, every proof flows through here.
//!
//! We deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures: fast, deterministic, and nobody has broken it.
//! - **X25519** for the encryption sub-pair each identity carries.
//! - **AES-256-GCM** for symmetric encryption: AEAD done right.
//! - **BLAKE3** for hashing and key derivation.
//! - **Argon2id** for the validation proof: slow on purpose.
//!
//! On top of those sit two KEYSEAL-specific pieces: [`compression`] (the
//! outermost text layer) and [`envelope`] (encrypt-then-sign and its inverse).
//! Everything else in the crate should talk to the envelope, not to the
//! primitives directly.

pub mod compression;
pub mod encryption;
pub mod envelope;
pub mod hash;
pub mod keys;
pub mod signatures;

pub use compression::{compress, decompress};
pub use envelope::{open, open_verified, seal_and_compress, seal_and_sign, EnvelopeError, Opened};
pub use hash::{blake3_hash, derive_proof, keyed_hash};
pub use keys::{AuthKeys, EncryptionKeypair, Keypair, MasterKeypair, PublicKey, Signature};
pub use signatures::{sign, verify, SignedBlob};
