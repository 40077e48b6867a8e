//! Comparing submitted credentials against stored ones.
//!
//! Comparison time must not depend on how many leading bytes are correct,
//! or an attacker can recover a secret one byte at a time by measuring
//! response latency. Both matchers here compare with
//! [`subtle::ConstantTimeEq`]. Only the length of the inputs may leak.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::Credentials;

/// Decides whether submitted credentials match what the account has stored.
pub trait CredentialMatcher: Send + Sync {
    fn matches(&self, submitted: &Credentials, stored: &Credentials) -> bool;
}

/// Byte-for-byte comparison in constant time. The stored credentials are
/// the plain secret.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantTimeMatcher;

impl CredentialMatcher for ConstantTimeMatcher {
    fn matches(&self, submitted: &Credentials, stored: &Credentials) -> bool {
        submitted.expose().ct_eq(stored.expose()).into()
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// A one-way hash function, treated as a black box.
///
/// Keyward ships no hash algorithm. Plug in whatever the host uses (argon2,
/// bcrypt, salted SHA-256) by implementing this trait, or pass a closure.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, input: &[u8]) -> Vec<u8>;
}

impl<F> CredentialHasher for F
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync,
{
    fn hash(&self, input: &[u8]) -> Vec<u8> {
        self(input)
    }
}

/// How a stored hash is written down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashEncoding {
    /// The raw digest bytes.
    #[default]
    Bytes,
    /// Lowercase hex of the digest.
    Hex,
    /// Standard (padded) Base64 of the digest.
    Base64,
}

/// Hashes the submitted credentials and compares the digest against the
/// stored one in constant time.
#[derive(Debug, Clone)]
pub struct HashedCredentialMatcher<H> {
    hasher: H,
    encoding: HashEncoding,
}

impl<H: CredentialHasher> HashedCredentialMatcher<H> {
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            encoding: HashEncoding::Bytes,
        }
    }

    /// Expect stored hashes in the given encoding.
    pub fn with_encoding(mut self, encoding: HashEncoding) -> Self {
        self.encoding = encoding;
        self
    }
}

impl<H: CredentialHasher> CredentialMatcher for HashedCredentialMatcher<H> {
    fn matches(&self, submitted: &Credentials, stored: &Credentials) -> bool {
        let digest = Zeroizing::new(self.hasher.hash(submitted.expose()));
        let encoded = match self.encoding {
            HashEncoding::Bytes => digest,
            HashEncoding::Hex => {
                Zeroizing::new(hex::encode(digest.as_slice()).into_bytes())
            }
            HashEncoding::Base64 => {
                Zeroizing::new(STANDARD.encode(digest.as_slice()).into_bytes())
            }
        };
        encoded.as_slice().ct_eq(stored.expose()).into()
    }
}
