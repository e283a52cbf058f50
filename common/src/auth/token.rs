// common/src/auth/token.rs
use chrono::{TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::session::{AuthorizedUser, Session, SessionClaims};

use super::callbacks::{jwt_callback, session_callback};
use super::errors::TokenError;

/// Token minted at login together with the session it represents
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Result of reading a presented session token
#[derive(Debug, Clone)]
pub struct SessionRead {
    pub session: Session,
    pub claims: SessionClaims,
    /// Replacement token when the presented one was due for refresh
    pub refreshed: Option<String>,
}

/// Issues and reads HS256-signed session tokens
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_age: i64,
    update_age: i64,
}

impl SessionManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            max_age: config.session_max_age_secs as i64,
            update_age: config.session_update_age_secs as i64,
        }
    }

    pub fn max_age_secs(&self) -> i64 {
        self.max_age
    }

    /// Mint a token for a freshly authorized user
    pub fn issue(&self, user: &AuthorizedUser) -> Result<IssuedSession, TokenError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: Some(user.id.clone()),
            address: None,
            chain_id: None,
            iat: now,
            exp: now + self.max_age,
            jti: Uuid::new_v4().to_string(),
        };
        let claims = jwt_callback(claims, Some(user));
        let token = self.encode(&claims)?;

        Ok(IssuedSession {
            token,
            session: Self::project(&claims),
        })
    }

    pub fn encode(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        Ok(encode(&Header::default(), claims, &self.encoding_key)?)
    }

    /// Validate signature and expiry
    pub fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Resolve a presented token into a session.
    ///
    /// Invalid or expired tokens yield `None`. Tokens older than the update
    /// age are re-issued with a new expiry.
    pub fn read(&self, token: &str) -> Option<SessionRead> {
        let claims = match self.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                return None;
            }
        };

        let now = Utc::now().timestamp();
        let (claims, refreshed) = if now - claims.iat >= self.update_age {
            let mut renewed = jwt_callback(claims.clone(), None);
            renewed.iat = now;
            renewed.exp = now + self.max_age;
            match self.encode(&renewed) {
                Ok(token) => {
                    tracing::debug!("Re-issued session token {}", renewed.jti);
                    (renewed, Some(token))
                }
                Err(e) => {
                    tracing::warn!("Failed to re-issue session token: {}", e);
                    (claims, None)
                }
            }
        } else {
            (claims, None)
        };

        Some(SessionRead {
            session: Self::project(&claims),
            claims,
            refreshed,
        })
    }

    fn project(claims: &SessionClaims) -> Session {
        let expires = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(Utc::now);
        session_callback(Session::new(expires), claims)
    }
}
