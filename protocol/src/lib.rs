// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # KEYSEAL: Core Library
//!
//! Keypair-based identity without a password table. A user *is* an Ed25519
//! keypair; their credentials live in a key/value store encrypted and
//! signed under that keypair, then wrapped again under a node-wide master
//! keypair. Logging back in means presenting the keypair and proving it can
//! open the record.
//!
//! ## Architecture
//!
//! - **crypto**: Keypairs, AES-256-GCM, Ed25519 signatures, Argon2id proof,
//!   LZ4 compression, and the encrypt-then-sign envelope that ties them
//!   together. Don't roll your own.
//! - **storage**: The `KvStore` capability (sled on disk, DashMap in
//!   memory) and the `KeyStore` that seals everything under the master
//!   keypair and bounds every call with a timeout.
//! - **identity**: Form decoding, registration, validation, and the session
//!   payload handed out on success.
//! - **config**: Protocol constants and runtime tunables.
//!
//! ## Quick tour
//!
//! ```no_run
//! use std::sync::Arc;
//! use keyseal_protocol::config::IdentityConfig;
//! use keyseal_protocol::crypto::MasterKeypair;
//! use keyseal_protocol::identity::IdentityService;
//! use keyseal_protocol::storage::MemoryStore;
//!
//! # async fn demo() {
//! let service = IdentityService::with_backend(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MasterKeypair::generate()),
//!     IdentityConfig::default(),
//! );
//! let created = service.create_user("alice", "correct horse battery staple!!").await;
//! let keys = created.keys.expect("registered");
//! assert!(service.validate(&keys.auth).await.ok);
//! # }
//! ```
//!
//! ## Design Philosophy
//!
//! 1. Tampering is detected before anything is decrypted.
//! 2. "Wrong key" and "corrupted record" look the same from outside.
//! 3. A timeout is a failure, never a "not found".
//! 4. No globals. The master keypair is passed in.

pub mod config;
pub mod crypto;
pub mod identity;
pub mod storage;
