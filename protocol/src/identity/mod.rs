//! # Identity Module
//!
//! A KEYSEAL identity *is* a keypair. There is no password table and no
//! account row: what the store holds is a credential record that only the
//! owner's keypair can open, and "logging in" means proving you can open it.
//!
//! The module is layered:
//!
//! 1. **Credentials**: decoding the flat authentication form into a typed
//!    [`AuthRequest`], collecting every field problem on the way.
//! 2. **Service**: [`IdentityService`] handles registration, validation, alias
//!    lookup, and the single `authenticate` entry point that dispatches
//!    between them.
//! 3. **Session**: the [`SessionPayload`] produced on success and the
//!    [`SessionIssuer`] seam through which it leaves the core.
//!
//! ## Design Decisions
//!
//! - The public key is the canonical record address (`@<pub>`). Aliases are
//!   a secondary index (`~<alias>`) claimed with compare-and-swap, which is
//!   what makes alias uniqueness hold under concurrent registrations.
//! - The master keypair is passed in, never looked up globally. Tests build
//!   a throwaway one per case.

pub mod credentials;
pub mod service;
pub mod session;

pub use credentials::{AuthRequest, CredentialRecord, FieldErrors};
pub use service::{
    AuthOutcome, Authenticated, IdentityError, IdentityService, IssuedKeys, Registration,
    RequestKind,
};
pub use session::{SessionError, SessionIssuer, SessionPayload};
