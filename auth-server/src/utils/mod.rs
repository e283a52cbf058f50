pub mod nonce;
pub mod token;
