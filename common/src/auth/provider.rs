// common/src/auth/provider.rs
use std::sync::Arc;

use chrono::Utc;

use crate::models::session::{AuthorizedUser, Credentials};

use super::errors::AuthError;
use super::siwe::SiweMessage;
use super::verifier::{SignatureVerifier, VerificationRequest};

/// Credentials provider for "Sign in with Ethereum"
pub struct CredentialsProvider {
    project_id: String,
    verifier: Arc<dyn SignatureVerifier>,
}

impl CredentialsProvider {
    pub fn new(project_id: impl Into<String>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            project_id: project_id.into(),
            verifier,
        }
    }

    /// Verify a signed SIWE message.
    ///
    /// Fails closed: every parse or verification problem yields `None`.
    pub async fn authorize(&self, credentials: &Credentials) -> Option<AuthorizedUser> {
        self.authorize_inner(credentials, None).await
    }

    /// Like [`authorize`](Self::authorize), additionally requiring the
    /// message `Nonce` to equal the token the server handed out.
    pub async fn authorize_with_nonce(
        &self,
        credentials: &Credentials,
        expected_nonce: &str,
    ) -> Option<AuthorizedUser> {
        self.authorize_inner(credentials, Some(expected_nonce)).await
    }

    async fn authorize_inner(
        &self,
        credentials: &Credentials,
        expected_nonce: Option<&str>,
    ) -> Option<AuthorizedUser> {
        match self.try_authorize(credentials, expected_nonce).await {
            Ok(Some(user)) => {
                tracing::info!("Authorized {} on chain {}", user.address, user.chain_id);
                Some(user)
            }
            Ok(None) => {
                tracing::warn!("Signature rejected by verifier");
                None
            }
            Err(e) => {
                tracing::warn!("Credentials rejected: {}", e);
                None
            }
        }
    }

    async fn try_authorize(
        &self,
        credentials: &Credentials,
        expected_nonce: Option<&str>,
    ) -> Result<Option<AuthorizedUser>, AuthError> {
        let message = credentials
            .message
            .as_deref()
            .filter(|message| !message.is_empty())
            .ok_or(AuthError::MissingMessage)?;
        let signature = credentials
            .signature
            .as_deref()
            .filter(|signature| !signature.is_empty())
            .ok_or(AuthError::MissingSignature)?;

        let siwe: SiweMessage = message.parse()?;
        siwe.check_time(Utc::now())?;
        if let Some(expected) = expected_nonce {
            if siwe.nonce.as_deref() != Some(expected) {
                return Err(AuthError::NonceMismatch);
            }
        }

        let request = VerificationRequest {
            address: &siwe.address,
            message,
            signature,
            chain_id: siwe.chain_id,
            project_id: &self.project_id,
        };

        if !self.verifier.verify(&request).await? {
            return Ok(None);
        }

        Ok(Some(AuthorizedUser::new(siwe.chain_id, siwe.address)))
    }
}
