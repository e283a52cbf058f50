// common/src/models/session.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Signed SIWE message submitted at login
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub message: Option<String>,
    pub signature: Option<String>,
    /// Double-submit copy of the CSRF cookie
    #[serde(rename = "csrfToken", default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<String>,
}

impl Credentials {
    pub fn new(message: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            signature: Some(signature.into()),
            csrf_token: None,
        }
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }
}

/// Identity produced by a successful signature verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizedUser {
    /// Composite `"<chainId>:<address>"` identifier
    pub id: String,
    pub address: String,
    pub chain_id: u64,
}

impl AuthorizedUser {
    pub fn new(chain_id: u64, address: impl Into<String>) -> Self {
        let account = AccountId {
            chain_id,
            address: address.into(),
        };
        Self {
            id: account.to_string(),
            address: account.address,
            chain_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIdError {
    #[error("expected `<chainId>:<address>`, got `{0}`")]
    Format(String),
    #[error("account identifier has an empty component")]
    Empty,
    #[error("invalid chain id `{0}`")]
    ChainId(String),
}

/// Composite identity stored in the `sub` claim of a session token.
///
/// Rendered as `"<chainId>:<address>"`. Parsing also accepts a namespaced
/// three-field form such as `eip155:1:0xabc`, discarding the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountId {
    pub chain_id: u64,
    pub address: String,
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.address)
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let (chain_id, address) = match parts.as_slice() {
            [chain_id, address] | [_, chain_id, address] => (*chain_id, *address),
            _ => return Err(AccountIdError::Format(s.to_string())),
        };

        if chain_id.is_empty() || address.is_empty() {
            return Err(AccountIdError::Empty);
        }

        let chain_id = chain_id
            .parse::<u64>()
            .map_err(|_| AccountIdError::ChainId(chain_id.to_string()))?;

        Ok(Self {
            chain_id,
            address: address.to_string(),
        })
    }
}

/// Payload of the signed session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub name: String,
}

/// Session handed to callers, rebuilt from the token on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    pub expires: DateTime<Utc>,
}

impl Session {
    /// Empty session carrying only its expiry
    pub fn new(expires: DateTime<Utc>) -> Self {
        Self {
            address: None,
            chain_id: None,
            user: None,
            expires,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.address.is_some() && self.chain_id.is_some()
    }
}
