//! Authentication configuration types.

use serde::Deserialize;

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Minimum accepted password length.
    pub min_password_length: usize,
    /// Consecutive failed sign-ins before an account is throttled.
    pub max_failed_attempts: u32,
    /// Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,
    /// Argon2 iteration count.
    pub hash_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            min_password_length: 6,
            max_failed_attempts: 5,
            hash_memory_kib: 19456,
            hash_iterations: 2,
        }
    }
}

impl AuthConfig {
    /// Minimal hashing cost for tests.
    pub fn for_test() -> Self {
        Self {
            hash_memory_kib: 8,
            hash_iterations: 1,
            ..Self::default()
        }
    }
}
