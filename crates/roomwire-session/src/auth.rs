//! Credentials presented when a session connects.
//!
//! The room authority shares an application key with its clients. A
//! client proves it holds the key by signing its user id together with
//! the current time and a random nonce:
//!
//! ```text
//! digest = hex(HMAC-SHA256(app_key, user_id ‖ timestamp ‖ nonce))
//! ```
//!
//! The timestamp bounds how long a credential is useful and the nonce
//! keeps two credentials from the same second apart. Expiry is enforced
//! by the authority, never here.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the application id.
pub const APP_ID_HEADER: &str = "X-App-Id";
/// Header carrying the user id.
pub const USER_ID_HEADER: &str = "X-User-Id";
/// Header carrying `Bearer <timestamp>.<nonce>.<digest>`.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// A signed, time-stamped proof of identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    user_id: String,
    /// Unix seconds, decimal.
    timestamp: String,
    /// 8 random bytes, lowercase hex.
    nonce: String,
    /// Lowercase hex HMAC-SHA256.
    digest: String,
}

impl Credential {
    /// Signs `user_id` at the current time with a fresh nonce.
    pub fn generate(app_key: &str, user_id: &str) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let nonce: [u8; 8] = rand::rng().random();
        Self::with_parts(app_key, user_id, &timestamp.to_string(), &hex::encode(nonce))
    }

    /// Signs `user_id` with a caller-chosen timestamp and nonce.
    pub fn with_parts(app_key: &str, user_id: &str, timestamp: &str, nonce: &str) -> Self {
        let digest = hex::encode(sign(app_key, user_id, timestamp, nonce).finalize().into_bytes());
        Self {
            user_id: user_id.to_string(),
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
            digest,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Recomputes the digest under `app_key` and compares in constant
    /// time, as the authority does. A digest that isn't valid hex fails.
    pub fn verify(&self, app_key: &str) -> bool {
        let Ok(expected) = hex::decode(&self.digest) else {
            return false;
        };
        sign(app_key, &self.user_id, &self.timestamp, &self.nonce)
            .verify_slice(&expected)
            .is_ok()
    }

    /// The `Authorization` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}.{}.{}", self.timestamp, self.nonce, self.digest)
    }

    /// Connect headers for this credential.
    pub fn headers(&self, app_id: &str) -> Vec<(String, String)> {
        vec![
            (APP_ID_HEADER.to_string(), app_id.to_string()),
            (USER_ID_HEADER.to_string(), self.user_id.clone()),
            (AUTHORIZATION_HEADER.to_string(), self.bearer()),
        ]
    }

    /// Parses a `Bearer <timestamp>.<nonce>.<digest>` value back into a
    /// credential for `user_id`.
    pub fn from_bearer(user_id: &str, header: &str) -> Option<Self> {
        let token = header.strip_prefix("Bearer ")?;
        let mut parts = token.splitn(3, '.');
        let (timestamp, nonce, digest) = (parts.next()?, parts.next()?, parts.next()?);
        Some(Self {
            user_id: user_id.to_string(),
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
            digest: digest.to_string(),
        })
    }
}

fn sign(app_key: &str, user_id: &str, timestamp: &str, nonce: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(app_key.as_bytes()).expect("hmac accepts keys of any length");
    mac.update(user_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(nonce.as_bytes());
    mac
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const KEY: &str = "testappkey";

    #[test]
    fn test_with_parts_same_inputs_same_digest() {
        let a = Credential::with_parts(KEY, "user001", "1700000000", "0011223344556677");
        let b = Credential::with_parts(KEY, "user001", "1700000000", "0011223344556677");
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
        assert!(a.digest().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_with_parts_any_changed_input_changes_digest() {
        let base = Credential::with_parts(KEY, "user001", "1700000000", "0011223344556677");
        let variants = [
            Credential::with_parts("otherkey", "user001", "1700000000", "0011223344556677"),
            Credential::with_parts(KEY, "user002", "1700000000", "0011223344556677"),
            Credential::with_parts(KEY, "user001", "1700000001", "0011223344556677"),
            Credential::with_parts(KEY, "user001", "1700000000", "0011223344556678"),
        ];

        let mut digests: HashSet<&str> = variants.iter().map(Credential::digest).collect();
        digests.insert(base.digest());
        assert_eq!(digests.len(), 5);
    }

    #[test]
    fn test_generate_uses_eight_byte_hex_nonce() {
        let credential = Credential::generate(KEY, "alice");
        assert_eq!(credential.nonce().len(), 16);
        assert!(credential.nonce().chars().all(|c| c.is_ascii_hexdigit()));
        assert!(credential.timestamp().parse::<u64>().is_ok());
    }

    #[test]
    fn test_generate_twice_gives_distinct_nonces() {
        let a = Credential::generate(KEY, "alice");
        let b = Credential::generate(KEY, "alice");
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_verify_accepts_right_key_rejects_wrong_key() {
        let credential = Credential::generate(KEY, "alice");
        assert!(credential.verify(KEY));
        assert!(!credential.verify("fuga"));
    }

    #[test]
    fn test_verify_rejects_other_user() {
        let credential = Credential::with_parts(KEY, "alice", "1700000000", "aa");
        let forged = Credential::from_bearer("bob", &credential.bearer()).unwrap();
        assert!(!forged.verify(KEY));
    }

    #[test]
    fn test_headers_carry_bearer_token() {
        let credential = Credential::with_parts(KEY, "alice", "1700000000", "0102");
        let headers = credential.headers("testapp");

        assert_eq!(headers[0], (APP_ID_HEADER.to_string(), "testapp".to_string()));
        assert_eq!(headers[1], (USER_ID_HEADER.to_string(), "alice".to_string()));
        assert_eq!(
            headers[2].1,
            format!("Bearer 1700000000.0102.{}", credential.digest())
        );
    }

    #[test]
    fn test_from_bearer_round_trip_verifies() {
        let credential = Credential::generate(KEY, "alice");
        let parsed = Credential::from_bearer("alice", &credential.bearer()).unwrap();
        assert_eq!(parsed, credential);
        assert!(parsed.verify(KEY));
    }

    #[test]
    fn test_from_bearer_malformed_returns_none() {
        assert!(Credential::from_bearer("alice", "Basic abc").is_none());
        assert!(Credential::from_bearer("alice", "Bearer 1700000000.only").is_none());
    }
}
