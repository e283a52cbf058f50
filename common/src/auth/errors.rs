// common/src/auth/errors.rs
use thiserror::Error;

/// Reasons a login attempt is rejected. Never surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("SIWE message is missing")]
    MissingMessage,
    #[error("signature is missing")]
    MissingSignature,
    #[error("message nonce does not match the issued CSRF token")]
    NonceMismatch,
    #[error(transparent)]
    Siwe(#[from] SiweError),
    #[error("signature verification failed: {0}")]
    Verification(#[from] VerifyError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SiweError {
    #[error("message does not start with a SIWE header line")]
    Header,
    #[error("invalid address `{0}`")]
    Address(String),
    #[error("message has no Chain ID")]
    MissingChainId,
    #[error("invalid Chain ID `{0}`")]
    ChainId(String),
    #[error("unexpected line `{0}`")]
    UnexpectedLine(String),
    #[error("invalid timestamp `{0}`")]
    Timestamp(String),
    #[error("message expired at {0}")]
    Expired(String),
    #[error("message is not valid before {0}")]
    NotYetValid(String),
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("signature is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("signature must be 65 bytes, got {0}")]
    SignatureLength(usize),
    #[error("malformed signature: {0}")]
    Signature(String),
    #[error("invalid recovery id {0}")]
    RecoveryId(u8),
    #[error("failed to recover signer: {0}")]
    Recovery(String),
    #[error("invalid RPC url: {0}")]
    Url(#[from] url::ParseError),
    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("RPC response carried neither result nor error")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("session token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}
