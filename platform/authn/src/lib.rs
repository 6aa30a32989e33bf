//! Platform authentication helpers.
//!
//! Resolves request credentials into a [`Principal`] carrying the permissions it
//! was granted upstream. Nothing here decides access; that is `platform-authz`.

use std::{collections::HashMap, fmt, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthnError {
    #[error("missing credentials")]
    MissingCredentials,
    #[error("unsupported authorization scheme: {0}")]
    UnsupportedScheme(String),
    #[error("malformed credentials")]
    Malformed,
    #[error("invalid credentials")]
    InvalidCredentials,
}

/// Stable identity of an authenticated principal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single permission granted to a principal, as delivered by the identity
/// provider (`{"action": "<identifier>"}`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantedPermission {
    pub action: String,
}

impl GrantedPermission {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<GrantedPermission>,
    #[serde(default)]
    pub is_staff: bool,
}

impl Principal {
    pub fn new(name: impl Into<String>, permissions: Vec<GrantedPermission>) -> Self {
        Self {
            id: PrincipalId::new(),
            name: name.into(),
            permissions,
            is_staff: false,
        }
    }

    pub fn staff(mut self) -> Self {
        self.is_staff = true;
        self
    }
}

/// Principals compare by identity only; two records with the same id are the
/// same principal even if their grant lists were loaded at different times.
impl PartialEq for Principal {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Principal {}

/// How the request proved who it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Basic,
    Session,
    PluginToken,
}

#[derive(Clone, Debug)]
pub struct Authenticated {
    pub principal: Arc<Principal>,
    pub method: AuthMethod,
}

/// In-memory credential table: bearer tokens and basic-auth pairs.
#[derive(Default, Debug)]
pub struct TokenRegistry {
    tokens: HashMap<String, Arc<Principal>>,
    basic: HashMap<(String, String), Arc<Principal>>,
}

impl TokenRegistry {
    pub fn with_token(mut self, token: impl Into<String>, principal: Arc<Principal>) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }

    pub fn with_basic(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        principal: Arc<Principal>,
    ) -> Self {
        self.basic
            .insert((username.into(), password.into()), principal);
        self
    }

    pub fn principals(&self) -> Vec<Arc<Principal>> {
        let mut seen: Vec<Arc<Principal>> = Vec::new();
        for principal in self.tokens.values().chain(self.basic.values()) {
            if !seen.iter().any(|p| p.id == principal.id) {
                seen.push(principal.clone());
            }
        }
        seen.sort_by(|a, b| a.name.cmp(&b.name));
        seen
    }

    /// Resolve an `Authorization` header value.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Authenticated, AuthnError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(AuthnError::MissingCredentials)?;
        let (scheme, credentials) = header.split_once(' ').ok_or(AuthnError::Malformed)?;
        let credentials = credentials.trim();

        let authenticated = if scheme.eq_ignore_ascii_case("bearer") {
            let principal = self
                .tokens
                .get(credentials)
                .ok_or(AuthnError::InvalidCredentials)?;
            Authenticated {
                principal: principal.clone(),
                method: AuthMethod::PluginToken,
            }
        } else if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(credentials)
                .map_err(|_| AuthnError::Malformed)?;
            let decoded = String::from_utf8(decoded).map_err(|_| AuthnError::Malformed)?;
            let (username, password) = decoded.split_once(':').ok_or(AuthnError::Malformed)?;
            let principal = self
                .basic
                .get(&(username.to_string(), password.to_string()))
                .ok_or(AuthnError::InvalidCredentials)?;
            Authenticated {
                principal: principal.clone(),
                method: AuthMethod::Basic,
            }
        } else {
            return Err(AuthnError::UnsupportedScheme(scheme.to_string()));
        };

        debug!(
            principal = %authenticated.principal.id,
            method = ?authenticated.method,
            "request authenticated"
        );
        Ok(authenticated)
    }
}
