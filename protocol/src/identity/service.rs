//! # Identity Service
//!
//! Creates identities and validates re-authentication attempts. This is
//! where the crypto envelope, the key store and the form decoding meet.
//!
//! ## Registration
//!
//! ```text
//! Start
//!   → KeypairGenerated   fresh Ed25519 pair + X25519 sub-pair
//!   → UniquenessChecked  nothing at @<pub>/creds, alias claimed at ~<alias>/owner (CAS)
//!   → Sealed             record encrypted + signed under the signing pair
//!   → Stored             put_new at @<pub>/creds, wrapped under the master keypair
//!   → Success | Failure
//! ```
//!
//! The alias claim is a compare-and-swap, so two concurrent registrations
//! for the same alias can't both win. If the record write fails after the
//! claim, the claim is released so the alias isn't burned.
//!
//! ## Validation
//!
//! ```text
//! Start
//!   → RecordFetched   @<pub>/creds exists
//!   → Decrypted       signature verified, record decrypted with the presented pair
//!   → Proved          Argon2id proof over (record ‖ pub), salted by the pair
//!   → Success | Failure
//! ```
//!
//! "Wrong key" and "corrupted record" both come out as `Keys invalid`. The
//! caller never learns which.
//!
//! ## Threading
//!
//! `IdentityService` is `Clone` and everything inside is behind `Arc`. Share
//! it freely between request handlers. The proof runs on the blocking pool
//! so a slow KDF doesn't stall the runtime.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::credentials::{AuthRequest, CredentialRecord, FieldErrors};
use super::session::{SessionError, SessionIssuer, SessionPayload};
use crate::config::{alias_address, record_address, IdentityConfig, CREDS_FIELD, OWNER_FIELD};
use crate::crypto::compression::compress;
use crate::crypto::envelope::{open_verified, seal_json, EnvelopeError};
use crate::crypto::hash::derive_proof;
use crate::crypto::keys::{AuthKeys, EncryptionKeypair, Keypair, MasterKeypair};
use crate::storage::{KeyStore, KvStore, StoreError};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Everything that can go wrong in the identity flows.
///
/// The `Display` strings are exactly what callers see in `result`.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Malformed input. Carries every offending field.
    #[error("{0}")]
    Validation(FieldErrors),

    #[error("Alias already exists")]
    DuplicateIdentity,

    #[error("Alias Not Found")]
    NotFound,

    /// Wrong keypair, tampered record, or failed proof. Deliberately vague.
    #[error("Keys invalid")]
    InvalidKeys,

    /// The record write during registration failed.
    #[error("Could not store credentials")]
    StoreWrite(#[source] StoreError),

    /// Any other store failure (timeouts included).
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("could not seal credentials: {0}")]
    Seal(#[from] EnvelopeError),

    #[error("could not create session: {0}")]
    Session(#[from] SessionError),
}

impl IdentityError {
    /// The `{ ok: false, result }` form of this error.
    pub fn into_outcome(self) -> AuthOutcome {
        let result = match &self {
            IdentityError::Validation(errors) => {
                serde_json::to_value(errors).unwrap_or_else(|_| Value::String(self.to_string()))
            }
            other => Value::String(other.to_string()),
        };
        AuthOutcome {
            ok: false,
            result,
            keys: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Keys handed to a freshly registered user. Shown once, never stored in
/// the clear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedKeys {
    pub auth: AuthKeys,
    pub enc: AuthKeys,
    pub phrase: String,
}

/// The caller-facing `{ ok, result, keys? }` shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthOutcome {
    pub ok: bool,
    pub result: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<IssuedKeys>,
}

/// A successful registration.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Compressed sealed record, openable with `keys.auth`.
    pub sealed: String,
    pub keys: IssuedKeys,
}

impl From<Registration> for AuthOutcome {
    fn from(reg: Registration) -> Self {
        AuthOutcome {
            ok: true,
            result: Value::String(reg.sealed),
            keys: Some(reg.keys),
        }
    }
}

/// Which flow a request went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Register,
    Login,
}

/// Result of [`IdentityService::authenticate`].
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub outcome: AuthOutcome,
    /// Present only on success.
    pub session: Option<SessionPayload>,
    /// `None` when the form couldn't be decoded at all.
    pub kind: Option<RequestKind>,
}

impl Authenticated {
    fn failed(kind: Option<RequestKind>, error: IdentityError) -> Self {
        Self {
            outcome: error.into_outcome(),
            session: None,
            kind,
        }
    }

    /// Hand the session payload to `issuer`. `Ok(None)` when there is no
    /// session to issue.
    pub fn issue_session(
        &self,
        issuer: &dyn SessionIssuer,
    ) -> Result<Option<String>, SessionError> {
        self.session
            .as_ref()
            .map(|payload| issuer.issue(payload))
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// IdentityService
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct IdentityService {
    store: KeyStore,
    master: Arc<MasterKeypair>,
    config: IdentityConfig,
}

impl IdentityService {
    pub fn new(store: KeyStore, master: Arc<MasterKeypair>, config: IdentityConfig) -> Self {
        Self {
            store,
            master,
            config,
        }
    }

    /// Build the key store over `backend` using the configured timeout.
    pub fn with_backend(
        backend: Arc<dyn KvStore>,
        master: Arc<MasterKeypair>,
        config: IdentityConfig,
    ) -> Self {
        let store = KeyStore::new(backend, Arc::clone(&master), config.store_timeout);
        Self::new(store, master, config)
    }

    pub fn store(&self) -> &KeyStore {
        &self.store
    }

    pub fn master(&self) -> &MasterKeypair {
        &self.master
    }

    // -- registration -------------------------------------------------------

    /// Register a new identity. Always returns the `{ ok, result, keys? }`
    /// shape; see [`register`](Self::register) for the typed form.
    pub async fn create_user(&self, alias: &str, secret_phrase: &str) -> AuthOutcome {
        match self.register(alias, secret_phrase).await {
            Ok(reg) => reg.into(),
            Err(e) => e.into_outcome(),
        }
    }

    pub async fn register(
        &self,
        alias: &str,
        secret_phrase: &str,
    ) -> Result<Registration, IdentityError> {
        let alias = alias.trim();
        debug!(alias, "registration: start");

        let signing = Keypair::generate();
        let encryption = EncryptionKeypair::generate();
        let public_hex = signing.public_key_hex();
        debug!(alias, public_key = %public_hex, "registration: keypair generated");

        let record_addr = record_address(&public_hex);
        if self.store.exists(&record_addr, CREDS_FIELD).await? {
            warn!(public_key = %public_hex, "registration: record already present for fresh key");
            return Err(IdentityError::DuplicateIdentity);
        }

        let alias_addr = alias_address(alias);
        match self
            .store
            .put_new(&alias_addr, OWNER_FIELD, &public_hex, None)
            .await
        {
            Ok(_) => {}
            Err(StoreError::AlreadyExists { .. }) => {
                debug!(alias, "registration: alias taken");
                return Err(IdentityError::DuplicateIdentity);
            }
            Err(e) => return Err(e.into()),
        }
        debug!(alias, "registration: uniqueness checked");

        let record = CredentialRecord {
            alias: alias.to_owned(),
            secret_phrase: secret_phrase.to_owned(),
            encryption: encryption.auth_keys(),
        };
        let sealed = match seal_json(&record, &signing) {
            Ok(sealed) => sealed,
            Err(e) => {
                self.release_alias(&alias_addr).await;
                return Err(e.into());
            }
        };
        debug!(alias, bytes = sealed.len(), "registration: sealed");

        if let Err(e) = self
            .store
            .put_new(&record_addr, CREDS_FIELD, &sealed, None)
            .await
        {
            warn!(alias, error = %e, "registration: record write failed");
            self.release_alias(&alias_addr).await;
            return Err(IdentityError::StoreWrite(e));
        }
        debug!(alias, "registration: stored");

        let compressed = compress(&sealed);
        info!(alias, public_key = %public_hex, size = compressed.len(), "identity registered");

        Ok(Registration {
            sealed: compressed,
            keys: IssuedKeys {
                auth: signing.auth_keys(),
                enc: record.encryption,
                phrase: record.secret_phrase,
            },
        })
    }

    async fn release_alias(&self, alias_addr: &str) {
        if let Err(e) = self.store.remove(alias_addr, OWNER_FIELD).await {
            warn!(address = alias_addr, error = %e, "could not release alias claim");
        }
    }

    // -- validation ---------------------------------------------------------

    /// Validate a presented keypair against its stored record. Always
    /// returns the `{ ok, result }` shape; see [`verify`](Self::verify) for
    /// the typed form.
    pub async fn validate(&self, keys: &AuthKeys) -> AuthOutcome {
        match self.verify(keys).await {
            Ok(record) => AuthOutcome {
                ok: true,
                result: serde_json::to_value(&record).unwrap_or(Value::Null),
                keys: None,
            },
            Err(e) => e.into_outcome(),
        }
    }

    pub async fn verify(&self, keys: &AuthKeys) -> Result<CredentialRecord, IdentityError> {
        debug!(public_key = %keys.public, "validation: start");

        let keypair = Keypair::from_auth_keys(keys).map_err(|e| {
            debug!(error = %e, "validation: presented keys malformed");
            IdentityError::InvalidKeys
        })?;
        let public_hex = keypair.public_key_hex();

        let stored = self
            .store
            .get(&record_address(&public_hex), CREDS_FIELD, None)
            .await
            .map_err(|e| match e {
                // Unreadable under our own master key: treat as a bad record.
                StoreError::Envelope(_) => IdentityError::InvalidKeys,
                other => IdentityError::Store(other),
            })?
            .ok_or(IdentityError::NotFound)?;
        debug!(public_key = %public_hex, "validation: record fetched");

        let plaintext = open_verified(&stored, &keypair, false)
            .map_err(|e| {
                debug!(error = %e, "validation: record did not open");
                IdentityError::InvalidKeys
            })?
            .into_bytes();
        debug!(public_key = %public_hex, "validation: decrypted");

        let params = self.config.proof;
        let proof_input = plaintext.clone();
        let proof = tokio::task::spawn_blocking(move || derive_proof(&proof_input, &keypair, params))
            .await
            .map_err(|e| {
                warn!(error = %e, "validation: proof task failed");
                IdentityError::InvalidKeys
            })?
            .map_err(|e| {
                warn!(error = %e, "validation: proof derivation failed");
                IdentityError::InvalidKeys
            })?;
        if proof.is_empty() {
            return Err(IdentityError::InvalidKeys);
        }
        debug!(public_key = %public_hex, "validation: proved");

        let record: CredentialRecord =
            serde_json::from_slice(&plaintext).map_err(|_| IdentityError::InvalidKeys)?;
        info!(alias = %record.alias, public_key = %public_hex, "identity validated");
        Ok(record)
    }

    /// Public key that owns `alias`, if it's taken. Surrounding whitespace
    /// is ignored, as it is on registration.
    pub async fn lookup_alias(&self, alias: &str) -> Result<Option<String>, IdentityError> {
        Ok(self
            .store
            .get(&alias_address(alias), OWNER_FIELD, None)
            .await?)
    }

    // -- entry point --------------------------------------------------------

    /// Decode `form`, dispatch to registration or validation, and build the
    /// session payload on success.
    pub async fn authenticate(&self, form: &HashMap<String, String>) -> Authenticated {
        let request = match AuthRequest::from_form(form) {
            Ok(request) => request,
            Err(errors) => {
                debug!(fields = errors.len(), "authenticate: form rejected");
                let kind = if form.contains_key(super::credentials::fields::ALIAS) {
                    Some(RequestKind::Register)
                } else if form.contains_key(super::credentials::fields::PUB) {
                    Some(RequestKind::Login)
                } else {
                    None
                };
                return Authenticated::failed(kind, IdentityError::Validation(errors));
            }
        };

        match request {
            AuthRequest::Register {
                alias,
                secret_phrase,
                color_code,
            } => {
                let kind = Some(RequestKind::Register);
                let registration = match self.register(&alias, &secret_phrase).await {
                    Ok(reg) => reg,
                    Err(e) => return Authenticated::failed(kind, e),
                };
                match SessionPayload::seal(&registration.keys.enc, &color_code, &self.master) {
                    Ok(session) => Authenticated {
                        outcome: registration.into(),
                        session: Some(session),
                        kind,
                    },
                    Err(e) => Authenticated::failed(kind, e.into()),
                }
            }
            AuthRequest::Login {
                keys, color_code, ..
            } => {
                let kind = Some(RequestKind::Login);
                let record = match self.verify(&keys).await {
                    Ok(record) => record,
                    Err(e) => return Authenticated::failed(kind, e),
                };
                let session =
                    match SessionPayload::seal(&record.encryption, &color_code, &self.master) {
                        Ok(session) => session,
                        Err(e) => return Authenticated::failed(kind, e.into()),
                    };
                Authenticated {
                    outcome: AuthOutcome {
                        ok: true,
                        result: serde_json::to_value(&record).unwrap_or(Value::Null),
                        keys: None,
                    },
                    session: Some(session),
                    kind,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProofParams;
    use crate::crypto::envelope::open;
    use crate::config::RECORD_ADDRESS_PREFIX;
    use crate::storage::{MemoryStore, StoreResult};
    use std::time::Duration;

    const PHRASE: &str = "correct horse battery staple!!";

    fn service() -> (Arc<MemoryStore>, IdentityService) {
        let backend = Arc::new(MemoryStore::new());
        let config = IdentityConfig {
            store_timeout: Duration::from_secs(2),
            proof: ProofParams::insecure_fast(),
        };
        let svc = IdentityService::with_backend(
            backend.clone(),
            Arc::new(MasterKeypair::generate()),
            config,
        );
        (backend, svc)
    }

    fn form(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn register_then_validate() {
        let (_, svc) = service();
        let outcome = svc.create_user("alice", PHRASE).await;
        assert!(outcome.ok, "{outcome:?}");
        let keys = outcome.keys.clone().unwrap();
        assert_eq!(keys.phrase, PHRASE);

        let validated = svc.validate(&keys.auth).await;
        assert!(validated.ok, "{validated:?}");
        assert_eq!(validated.result["alias"], "alice");
        assert_eq!(validated.result["secretPhrase"], PHRASE);
        assert_eq!(validated.result["encryption"]["pub"], keys.enc.public.as_str());
    }

    #[tokio::test]
    async fn returned_record_opens_with_auth_keys() {
        let (_, svc) = service();
        let reg = svc.register("alice", PHRASE).await.unwrap();
        let keypair = Keypair::from_auth_keys(&reg.keys.auth).unwrap();
        let plain = open(&reg.sealed, &keypair).unwrap();
        let record: CredentialRecord = serde_json::from_slice(&plain).unwrap();
        assert_eq!(record.alias, "alice");
    }

    #[tokio::test]
    async fn duplicate_alias_rejected() {
        let (_, svc) = service();
        assert!(svc.create_user("alice", PHRASE).await.ok);
        let second = svc.create_user("alice", PHRASE).await;
        assert!(!second.ok);
        assert_eq!(second.result, "Alias already exists");
        assert!(second.keys.is_none());
    }

    #[tokio::test]
    async fn lookup_alias_returns_owner() {
        let (_, svc) = service();
        let reg = svc.register("carol", PHRASE).await.unwrap();
        assert_eq!(
            svc.lookup_alias("carol").await.unwrap(),
            Some(reg.keys.auth.public.clone())
        );
        assert_eq!(svc.lookup_alias("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_keypair_is_not_found() {
        let (_, svc) = service();
        let outcome = svc.validate(&Keypair::generate().auth_keys()).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.result, "Alias Not Found");
    }

    #[tokio::test]
    async fn mismatched_private_key_is_invalid() {
        let (_, svc) = service();
        let reg = svc.register("alice", PHRASE).await.unwrap();
        let stranger = Keypair::generate().auth_keys();
        let forged = AuthKeys::new(reg.keys.auth.public.clone(), stranger.private);
        let outcome = svc.validate(&forged).await;
        assert_eq!(outcome.result, "Keys invalid");
    }

    #[tokio::test]
    async fn corrupted_record_is_invalid() {
        let (backend, svc) = service();
        let reg = svc.register("alice", PHRASE).await.unwrap();
        backend.insert_raw(&record_address(&reg.keys.auth.public), CREDS_FIELD, "garbage");
        let outcome = svc.validate(&reg.keys.auth).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.result, "Keys invalid");
    }

    #[tokio::test]
    async fn authenticate_register_builds_session() {
        let (_, svc) = service();
        let result = svc
            .authenticate(&form(&[
                ("alias", "dave"),
                ("secretPhrase", PHRASE),
                ("colorCode", "aabbcc"),
            ]))
            .await;
        assert_eq!(result.kind, Some(RequestKind::Register));
        assert!(result.outcome.ok);
        let session = result.session.unwrap();
        assert_eq!(session.color_code, "aabbcc");
        let enc = session.open_encryption(svc.master()).unwrap();
        assert_eq!(enc, result.outcome.keys.unwrap().enc);
    }

    #[tokio::test]
    async fn authenticate_login_round_trip() {
        let (_, svc) = service();
        let reg = svc.register("erin", PHRASE).await.unwrap();
        let result = svc
            .authenticate(&form(&[
                ("pub", &reg.keys.auth.public),
                ("priv", &reg.keys.auth.private),
                ("secretPhrase", PHRASE),
                ("colorCode", "ffeedd"),
            ]))
            .await;
        assert_eq!(result.kind, Some(RequestKind::Login));
        assert!(result.outcome.ok, "{:?}", result.outcome);
        assert_eq!(result.outcome.result["alias"], "erin");
        assert!(result.outcome.keys.is_none());
        let session = result.session.unwrap();
        assert_eq!(session.open_encryption(svc.master()).unwrap(), reg.keys.enc);
    }

    #[tokio::test]
    async fn authenticate_reports_field_errors() {
        let (backend, svc) = service();
        let result = svc
            .authenticate(&form(&[
                ("alias", "frank"),
                ("secretPhrase", "short"),
                ("colorCode", "ab"),
            ]))
            .await;
        assert!(!result.outcome.ok);
        assert!(result.session.is_none());
        assert!(result.outcome.result["secretPhrase"].is_string());
        assert!(result.outcome.result["colorCode"].is_string());
        // Nothing was written.
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn failed_login_issues_no_session() {
        let (_, svc) = service();
        let stranger = Keypair::generate().auth_keys();
        let result = svc
            .authenticate(&form(&[
                ("pub", &stranger.public),
                ("priv", &stranger.private),
                ("secretPhrase", PHRASE),
                ("colorCode", "aabbcc"),
            ]))
            .await;
        assert!(!result.outcome.ok);
        assert!(result.session.is_none());
        assert_eq!(result.outcome.result, "Alias Not Found");
    }

    #[tokio::test]
    async fn concurrent_registrations_single_winner() {
        let (_, svc) = service();
        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let svc = svc.clone();
                tokio::spawn(async move { svc.create_user("bob", PHRASE).await })
            })
            .collect();

        let mut wins = 0;
        for task in tasks {
            let outcome = task.await.unwrap();
            if outcome.ok {
                wins += 1;
            } else {
                assert_eq!(outcome.result, "Alias already exists");
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn outcome_json_shape() {
        let (_, svc) = service();
        let outcome = svc.create_user("gina", PHRASE).await;
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["ok"], true);
        assert!(json["result"].is_string());
        assert!(json["keys"]["auth"]["pub"].is_string());
        assert!(json["keys"]["enc"]["priv"].is_string());
        assert_eq!(json["keys"]["phrase"], PHRASE);

        let failure = serde_json::to_value(svc.validate(&Keypair::generate().auth_keys()).await)
            .unwrap();
        assert!(failure.get("keys").is_none());
    }

    // -- store failures -------------------------------------------------------

    /// Memory backend whose record writes fail; alias claims still succeed.
    struct RecordWriteFails {
        inner: MemoryStore,
    }

    #[async_trait::async_trait]
    impl KvStore for RecordWriteFails {
        async fn get(&self, address: &str, field: &str) -> StoreResult<Option<String>> {
            self.inner.get(address, field).await
        }
        async fn put(&self, address: &str, field: &str, value: String) -> StoreResult<()> {
            self.inner.put(address, field, value).await
        }
        async fn put_if_absent(
            &self,
            address: &str,
            field: &str,
            value: String,
        ) -> StoreResult<bool> {
            if address.starts_with(RECORD_ADDRESS_PREFIX) {
                return Err(StoreError::Unavailable("disk full".into()));
            }
            self.inner.put_if_absent(address, field, value).await
        }
        async fn remove(&self, address: &str, field: &str) -> StoreResult<()> {
            self.inner.remove(address, field).await
        }
    }

    /// A backend that never answers.
    struct StalledStore;

    #[async_trait::async_trait]
    impl KvStore for StalledStore {
        async fn get(&self, _: &str, _: &str) -> StoreResult<Option<String>> {
            std::future::pending().await
        }
        async fn put(&self, _: &str, _: &str, _: String) -> StoreResult<()> {
            std::future::pending().await
        }
        async fn put_if_absent(&self, _: &str, _: &str, _: String) -> StoreResult<bool> {
            std::future::pending().await
        }
        async fn remove(&self, _: &str, _: &str) -> StoreResult<()> {
            std::future::pending().await
        }
    }

    fn service_over(backend: Arc<dyn KvStore>) -> IdentityService {
        IdentityService::with_backend(
            backend,
            Arc::new(MasterKeypair::generate()),
            IdentityConfig {
                store_timeout: Duration::from_millis(100),
                proof: ProofParams::insecure_fast(),
            },
        )
    }

    #[tokio::test]
    async fn failed_record_write_releases_alias() {
        let backend = Arc::new(RecordWriteFails {
            inner: MemoryStore::new(),
        });
        let svc = service_over(backend.clone());

        let outcome = svc.create_user("dora", PHRASE).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.result, "Could not store credentials");
        assert!(outcome.keys.is_none());
        assert!(backend.inner.is_empty());
        assert_eq!(svc.lookup_alias("dora").await.unwrap(), None);

        assert!(matches!(
            svc.register("dora", PHRASE).await,
            Err(IdentityError::StoreWrite(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_store_is_a_store_failure_not_absence() {
        let svc = service_over(Arc::new(StalledStore));

        let outcome = svc.validate(&Keypair::generate().auth_keys()).await;
        assert!(!outcome.ok);
        assert_ne!(outcome.result, "Alias Not Found");
        assert!(matches!(
            svc.verify(&Keypair::generate().auth_keys()).await,
            Err(IdentityError::Store(StoreError::Timeout(_)))
        ));
        assert!(matches!(
            svc.register("erin", PHRASE).await,
            Err(IdentityError::Store(StoreError::Timeout(_)))
        ));
    }

    // -- normalisation ---------------------------------------------------------

    #[tokio::test]
    async fn uppercase_public_key_still_validates() {
        let (_, svc) = service();
        let reg = svc.register("fern", PHRASE).await.unwrap();
        let shouting = AuthKeys::new(
            reg.keys.auth.public.to_uppercase(),
            reg.keys.auth.private.clone(),
        );
        let outcome = svc.validate(&shouting).await;
        assert!(outcome.ok, "{outcome:?}");
        assert_eq!(outcome.result["alias"], "fern");
    }

    #[tokio::test]
    async fn malformed_public_key_never_reaches_the_store() {
        let svc = service_over(Arc::new(StalledStore));
        let outcome = svc.validate(&AuthKeys::new("zz-not-hex", "00")).await;
        assert_eq!(outcome.result, "Keys invalid");
    }

    #[tokio::test]
    async fn alias_whitespace_is_ignored_on_lookup() {
        let (_, svc) = service();
        let reg = svc.register(" zed ", PHRASE).await.unwrap();
        assert_eq!(
            svc.lookup_alias(" zed ").await.unwrap().as_deref(),
            Some(reg.keys.auth.public.as_str())
        );
        assert_eq!(
            svc.lookup_alias("zed").await.unwrap().as_deref(),
            Some(reg.keys.auth.public.as_str())
        );

        let record = svc.verify(&reg.keys.auth).await.unwrap();
        assert_eq!(record.alias, "zed");
    }
}
