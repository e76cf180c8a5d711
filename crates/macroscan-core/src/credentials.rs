//! Static API credential rotation.
//!
//! The rotator holds no cursor: each caller passes a seed and gets the full
//! rotation starting at `seed mod N`, so concurrent scans never contend.

use std::fmt::{Debug, Formatter};

use crate::ValidationError;

/// Environment variable holding comma-separated provider API keys.
pub const API_KEYS_ENV: &str = "MACROSCAN_API_KEYS";

/// Opaque provider token and its position in rotation order.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    position: usize,
}

impl Credential {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub const fn position(&self) -> usize {
        self.position
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("position", &self.position)
            .finish()
    }
}

/// Round-robin credential source seeded per instrument.
#[derive(Debug, Clone)]
pub struct CredentialRotator {
    credentials: Vec<Credential>,
}

impl CredentialRotator {
    pub fn new<I, S>(tokens: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials = tokens
            .into_iter()
            .enumerate()
            .map(|(position, token)| {
                let token = token.into().trim().to_owned();
                if token.is_empty() {
                    return Err(ValidationError::BlankCredential { position });
                }
                Ok(Credential { token, position })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if credentials.is_empty() {
            return Err(ValidationError::EmptyCredentials);
        }

        Ok(Self { credentials })
    }

    /// Parses a comma-separated key list, ignoring empty segments.
    pub fn from_list(raw: &str) -> Result<Self, ValidationError> {
        Self::new(raw.split(',').map(str::trim).filter(|token| !token.is_empty()))
    }

    /// Reads [`API_KEYS_ENV`]; a missing variable is an empty credential set.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_env_var(API_KEYS_ENV)
    }

    pub fn from_env_var(name: &str) -> Result<Self, ValidationError> {
        let raw = std::env::var(name).unwrap_or_default();
        Self::from_list(&raw)
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// All credentials, starting at `seed mod N` and wrapping.
    pub fn rotation(&self, seed: usize) -> impl Iterator<Item = &Credential> + '_ {
        let count = self.credentials.len();
        let start = seed % count;
        (0..count).map(move |offset| &self.credentials[(start + offset) % count])
    }
}
