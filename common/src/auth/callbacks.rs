// common/src/auth/callbacks.rs
//! Projections between a verified identity, the token payload and the session view.

use crate::models::session::{AccountId, AuthorizedUser, Session, SessionClaims, SessionUser};

/// Encode-on-login: copy the identity into the token.
///
/// Without a fresh `user` (token refresh) the claims pass through unchanged.
pub fn jwt_callback(mut token: SessionClaims, user: Option<&AuthorizedUser>) -> SessionClaims {
    if let Some(user) = user {
        match user.id.parse::<AccountId>() {
            Ok(account) => {
                token.address = Some(account.address);
                token.chain_id = Some(account.chain_id);
            }
            Err(e) => tracing::warn!("Unusable user id {}: {}", user.id, e),
        }
    }
    token
}

/// Decode-on-read: attach the identity carried in `sub` to the session.
///
/// A missing or malformed subject leaves the session untouched.
pub fn session_callback(mut session: Session, token: &SessionClaims) -> Session {
    let Some(sub) = token.sub.as_deref() else {
        return session;
    };

    match sub.parse::<AccountId>() {
        Ok(account) => {
            session.user = Some(SessionUser {
                name: account.address.clone(),
            });
            session.address = Some(account.address);
            session.chain_id = Some(account.chain_id);
        }
        Err(e) => tracing::debug!("Session subject {} carries no identity: {}", sub, e),
    }

    session
}
