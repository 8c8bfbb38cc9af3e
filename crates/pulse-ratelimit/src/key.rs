//! Bucket key derivation for fixed-window counters.
//!
//! Time is divided into non-overlapping windows; each (identifier, window)
//! pair maps to one Redis key that expires with the window. Identifiers are
//! hashed so raw client ids never appear as plaintext keys.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Window granularity for a fixed-window counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Minute,
    Hour,
}

impl Window {
    /// Window length in seconds.
    pub fn seconds(&self) -> u64 {
        match self {
            Window::Minute => 60,
            Window::Hour => 3600,
        }
    }

    /// Label used in key derivation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Window::Minute => "minute",
            Window::Hour => "hour",
        }
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Privacy-preserving identifier hash (first 16 hex chars of SHA-256).
pub fn hash_identifier(identifier: &str) -> String {
    let digest = Sha256::digest(identifier.as_bytes());
    let mut hex = String::with_capacity(16);
    for byte in digest.iter().take(8) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

/// Bucket index for a timestamp: integer division by the window length.
pub fn bucket_index(unix_time: u64, window: Window) -> u64 {
    unix_time / window.seconds()
}

/// Composite counter key for an identifier at a given timestamp.
pub fn bucket_key(identifier: &str, window: Window, unix_time: u64) -> String {
    format!(
        "ratelimit:{}:{}:{}",
        window.as_str(),
        hash_identifier(identifier),
        bucket_index(unix_time, window)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_and_hex() {
        let a = hash_identifier("client:alice");
        let b = hash_identifier("client:alice");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_hides_identifier() {
        let hashed = hash_identifier("client:alice");
        assert!(!hashed.contains("alice"));
        assert_ne!(hashed, hash_identifier("client:bob"));
    }

    #[test]
    fn bucket_index_divides_by_window() {
        assert_eq!(bucket_index(0, Window::Minute), 0);
        assert_eq!(bucket_index(59, Window::Minute), 0);
        assert_eq!(bucket_index(60, Window::Minute), 1);
        assert_eq!(bucket_index(7200, Window::Hour), 2);
    }

    #[test]
    fn adjacent_windows_get_distinct_keys() {
        let now = 1_700_000_000;
        let current = bucket_key("client:alice", Window::Minute, now);
        let next = bucket_key("client:alice", Window::Minute, now + 60);
        assert_ne!(current, next);

        // Same window, same key.
        assert_eq!(current, bucket_key("client:alice", Window::Minute, now + 1));
    }

    #[test]
    fn key_shape() {
        let key = bucket_key("global", Window::Hour, 7200);
        let parts: Vec<&str> = key.split(':').collect();
        assert_eq!(parts[0], "ratelimit");
        assert_eq!(parts[1], "hour");
        assert_eq!(parts[2], hash_identifier("global"));
        assert_eq!(parts[3], "2");
    }
}
