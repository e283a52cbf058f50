// auth-server/src/state.rs
use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::HttpRequest;
use common::auth::{
    ChainedVerifier, CredentialsProvider, SessionManager, SessionRead, SignatureVerifier,
    VerifyError,
};
use common::{AuthConfig, Config};

use crate::utils::nonce::NonceStore;

/// Shared authentication state, built once at startup
pub struct AuthState {
    pub provider: CredentialsProvider,
    pub sessions: SessionManager,
    pub nonces: NonceStore,
    cookie_name: String,
    csrf_cookie_name: String,
    secure_cookie: bool,
}

impl AuthState {
    pub fn new(config: &AuthConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            provider: CredentialsProvider::new(config.project_id.clone(), verifier),
            sessions: SessionManager::new(config),
            nonces: NonceStore::new(Duration::from_secs(config.nonce_ttl_secs)),
            cookie_name: config.cookie_name.clone(),
            csrf_cookie_name: config.csrf_cookie_name.clone(),
            secure_cookie: config.secure_cookie,
        }
    }

    /// State backed by the production EIP-191 / ERC-1271 verifier
    pub fn from_config(config: &Config) -> Result<Self, VerifyError> {
        let verifier = ChainedVerifier::new(
            &config.auth.rpc_url,
            Duration::from_secs(config.auth.rpc_timeout_secs),
        )?;
        Ok(Self::new(&config.auth, Arc::new(verifier)))
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn csrf_cookie_name(&self) -> &str {
        &self.csrf_cookie_name
    }

    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(self.cookie_name.clone(), token)
            .path("/")
            .secure(self.secure_cookie)
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(self.sessions.max_age_secs()))
            .finish()
    }

    /// Empty cookie that clears the session
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.cookie_name.clone(), "")
            .path("/")
            .max_age(CookieDuration::seconds(0))
            .finish()
    }

    /// Session-scoped cookie carrying the CSRF token / SIWE nonce
    pub fn csrf_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(self.csrf_cookie_name.clone(), token)
            .path("/")
            .secure(self.secure_cookie)
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish()
    }

    /// Expires the CSRF cookie once its nonce has been spent
    pub fn csrf_removal_cookie(&self) -> Cookie<'static> {
        Cookie::build(self.csrf_cookie_name.clone(), "")
            .path("/")
            .max_age(CookieDuration::seconds(0))
            .finish()
    }

    /// Session carried by the request cookie, if any
    pub fn session_from_request(&self, req: &HttpRequest) -> Option<SessionRead> {
        let cookie = req.cookie(self.cookie_name())?;
        self.sessions.read(cookie.value())
    }
}
