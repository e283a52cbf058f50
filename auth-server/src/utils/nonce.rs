// auth-server/src/utils/nonce.rs
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::token::generate_csrf_token;

/// Outstanding CSRF tokens / SIWE nonces. Each one is accepted at most once.
#[derive(Debug)]
pub struct NonceStore {
    issued: DashMap<String, Instant>,
    ttl: Duration,
}

impl NonceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            issued: DashMap::new(),
            ttl,
        }
    }

    /// Hand out a fresh nonce, dropping any that have lapsed
    pub fn issue(&self) -> String {
        let now = Instant::now();
        self.issued
            .retain(|_, issued_at| now.duration_since(*issued_at) < self.ttl);

        let nonce = generate_csrf_token();
        self.issued.insert(nonce.clone(), now);
        nonce
    }

    /// Spend a nonce. False if it was never issued, already spent or has lapsed.
    pub fn consume(&self, nonce: &str) -> bool {
        match self.issued.remove(nonce) {
            Some((_, issued_at)) => issued_at.elapsed() < self.ttl,
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.issued.len()
    }
}
