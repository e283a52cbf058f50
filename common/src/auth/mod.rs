pub mod callbacks;
pub mod errors;
pub mod provider;
pub mod siwe;
pub mod token;
pub mod verifier;

pub use callbacks::{jwt_callback, session_callback};
pub use errors::{AuthError, SiweError, TokenError, VerifyError};
pub use provider::CredentialsProvider;
pub use siwe::SiweMessage;
pub use token::{IssuedSession, SessionManager, SessionRead};
pub use verifier::{
    address_from_key, personal_sign_hash, ChainedVerifier, Eip191Verifier, Erc1271Verifier,
    SignatureVerifier, VerificationRequest,
};
