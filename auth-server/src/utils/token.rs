// auth-server/src/utils/token.rs
use rand::{thread_rng, Rng};
use rand::distributions::Alphanumeric;

/// Length of CSRF tokens handed out as SIWE nonces
pub const CSRF_TOKEN_LENGTH: usize = 32;

/// Generate a cryptographically secure random alphanumeric token of specified length
pub fn generate_secure_token(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Token usable both as a CSRF token and as an EIP-4361 nonce (alphanumeric, 8+ chars)
pub fn generate_csrf_token() -> String {
    generate_secure_token(CSRF_TOKEN_LENGTH)
}
