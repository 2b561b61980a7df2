//! # Credentials
//!
//! Typed decoding of the flat authentication form, and the record that ends
//! up (sealed twice) in the store.
//!
//! The form is a plain string map. Which flow runs is decided by what's in
//! it:
//!
//! ```text
//! alias present            → Register { alias, secret_phrase, color_code }
//! pub + priv present       → Login    { keys, secret_phrase, color_code }
//! neither                  → FieldErrors { "keys": ... }
//! ```
//!
//! Decoding never stops at the first problem. Every malformed field is
//! collected into one [`FieldErrors`] map so the caller can show them all.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::config::{MAX_ALIAS_CHARS, MIN_COLOR_CODE_CHARS, MIN_SECRET_PHRASE_CHARS};
use crate::crypto::keys::AuthKeys;

/// Form field names.
pub mod fields {
    pub const ALIAS: &str = "alias";
    pub const SECRET_PHRASE: &str = "secretPhrase";
    /// Older clients post the phrase under this name.
    pub const SECRET_PHRASE_LEGACY: &str = "idString";
    pub const COLOR_CODE: &str = "colorCode";
    pub const PUB: &str = "pub";
    pub const PRIV: &str = "priv";
    /// Error key used when neither an alias nor a keypair was supplied.
    pub const KEYS: &str = "keys";
}

// ---------------------------------------------------------------------------
// FieldErrors
// ---------------------------------------------------------------------------

/// Field name → human-readable problem. Ordered, so responses are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_owned(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AuthRequest
// ---------------------------------------------------------------------------

/// A decoded, validated authentication request.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthRequest {
    Register {
        alias: String,
        secret_phrase: String,
        color_code: String,
    },
    Login {
        keys: AuthKeys,
        secret_phrase: String,
        color_code: String,
    },
}

impl AuthRequest {
    /// Decode the flat form map.
    ///
    /// Returns every problem at once. A form with a non-empty `alias` is a
    /// registration; otherwise both `pub` and `priv` are required.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let secret_phrase = form
            .get(fields::SECRET_PHRASE)
            .or_else(|| form.get(fields::SECRET_PHRASE_LEGACY))
            .cloned()
            .unwrap_or_default();
        if utf16_len(&secret_phrase) < MIN_SECRET_PHRASE_CHARS {
            errors.insert(
                fields::SECRET_PHRASE,
                format!(
                    "Secret phrase must be at least {MIN_SECRET_PHRASE_CHARS} characters long. \
                     Try 'oH pen seSAme SEEDS'. Note: UTF-16 characters accepted"
                ),
            );
        }

        let color_code = form.get(fields::COLOR_CODE).cloned().unwrap_or_default();
        if utf16_len(&color_code) < MIN_COLOR_CODE_CHARS {
            errors.insert(
                fields::COLOR_CODE,
                format!("Color code combo must be at least {MIN_COLOR_CODE_CHARS} long"),
            );
        }

        let alias = form
            .get(fields::ALIAS)
            .map(|a| a.trim())
            .filter(|a| !a.is_empty());

        let request = match alias {
            Some(alias) => {
                if let Some(problem) = alias_problem(alias) {
                    errors.insert(fields::ALIAS, problem);
                }
                AuthRequest::Register {
                    alias: alias.to_owned(),
                    secret_phrase,
                    color_code,
                }
            }
            None => {
                let public = nonempty(form.get(fields::PUB));
                let private = nonempty(form.get(fields::PRIV));
                match (public, private) {
                    (Some(public), Some(private)) => AuthRequest::Login {
                        keys: AuthKeys::new(public, private),
                        secret_phrase,
                        color_code,
                    },
                    _ => {
                        errors.insert(
                            fields::KEYS,
                            "Was unable to find keys stored in your browser. \
                             Please paste in your keys and try again.",
                        );
                        return Err(errors);
                    }
                }
            }
        };

        if errors.is_empty() {
            Ok(request)
        } else {
            Err(errors)
        }
    }

    pub fn color_code(&self) -> &str {
        match self {
            AuthRequest::Register { color_code, .. } | AuthRequest::Login { color_code, .. } => {
                color_code
            }
        }
    }

    pub fn is_registration(&self) -> bool {
        matches!(self, AuthRequest::Register { .. })
    }
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthRequest::Register { alias, .. } => f
                .debug_struct("Register")
                .field("alias", alias)
                .finish_non_exhaustive(),
            AuthRequest::Login { keys, .. } => f
                .debug_struct("Login")
                .field("pub", &keys.public)
                .finish_non_exhaustive(),
        }
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

fn nonempty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn alias_problem(alias: &str) -> Option<String> {
    if utf16_len(alias) > MAX_ALIAS_CHARS {
        return Some(format!("Alias must be at most {MAX_ALIAS_CHARS} characters long"));
    }
    if alias.chars().any(char::is_control) {
        return Some("Alias must not contain control characters".to_owned());
    }
    None
}

// ---------------------------------------------------------------------------
// CredentialRecord
// ---------------------------------------------------------------------------

/// What gets sealed and stored for each identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub alias: String,
    #[serde(rename = "secretPhrase")]
    pub secret_phrase: String,
    /// The identity's encryption sub-pair.
    pub encryption: AuthKeys,
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("alias", &self.alias)
            .field("secretPhrase", &"<redacted>")
            .field("encryption", &self.encryption)
            .finish()
    }
}
