//! API key handling
//!
//! The orders API authenticates every request with an `x-api-key` header.
//! The key is injected at construction and only ever appears in logs in
//! masked form.

use sha2::{Digest, Sha256};
use std::fmt;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// API credentials container
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Create credentials from an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Get the API key
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.trim().is_empty()
    }

    /// Key with everything but the first and last four characters hidden
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 8 {
            return "*".repeat(chars.len());
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }

    /// Stable, non-reversible identifier for per-key bookkeeping
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.api_key.as_bytes());
        hex::encode(&digest[..8])
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.masked_key())
            .finish()
    }
}
