//! Password hashing.
//!
//! The client never puts a raw password on the wire: it sends the hex
//! SHA-256 of the password. The server stores the hex SHA-256 of a
//! per-user random salt concatenated with that client hash, and compares
//! digests on login.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// Client-side hash of a raw password, as sent in `LOG-` requests.
pub fn hash_password(password: &str) -> String {
    hex(&Sha256::digest(password.as_bytes()))
}

/// Fresh random salt for a new account.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);
    salt
}

/// Digest stored in the user table: SHA-256 over salt plus client hash.
pub fn salted_digest(salt: &[u8], password_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password_hash.as_bytes());
    hex(&hasher.finalize())
}

/// Whether a presented client hash matches the stored digest.
pub fn verify(salt: &[u8], stored_digest: &str, password_hash: &str) -> bool {
    salted_digest(salt, password_hash) == stored_digest
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_stable_hex() {
        let hash = hash_password("hunter2");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_password("hunter2"));
        assert_ne!(hash, hash_password("hunter3"));
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_accepts_the_right_password_only() {
        let salt = generate_salt();
        let stored = salted_digest(&salt, &hash_password("secret"));
        assert!(verify(&salt, &stored, &hash_password("secret")));
        assert!(!verify(&salt, &stored, &hash_password("wrong")));
    }

    #[test]
    fn test_salts_differentiate_equal_passwords() {
        let hash = hash_password("same");
        let a = salted_digest(&generate_salt(), &hash);
        let b = salted_digest(&generate_salt(), &hash);
        assert_ne!(a, b);
    }
}
