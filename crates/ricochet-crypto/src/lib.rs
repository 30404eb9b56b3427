//! Ricochet Cryptographic Primitives
//!
//! This crate provides the cryptographic operations the Ricochet protocol
//! is built on:
//! - RSA-1024 hidden-service identities (PKCS#1 PEM keys)
//! - Tor v2 onion hostname derivation (SHA-1 + base32)
//! - Cookie-based HMAC-SHA256 authentication challenges
//! - PKCS#1 v1.5 / SHA-256 proof signing and verification
//!
//! RSA-1024 and SHA-1 are weak by modern standards. They are retained
//! because the wire protocol is keyed by Tor v2 hidden-service identities,
//! which are defined in terms of these primitives.

pub mod auth;
pub mod error;
pub mod hostname;
pub mod identity;

pub use auth::AuthHandshake;
pub use error::{CryptoError, CryptoResult};
pub use hostname::onion_hostname;
pub use identity::{verify_challenge, Identity};

/// Protocol constants
pub mod constants {
    /// Authentication cookie size in bytes
    pub const COOKIE_SIZE: usize = 16;

    /// HMAC-SHA256 challenge size
    pub const CHALLENGE_SIZE: usize = 32;

    /// RSA-1024 PKCS#1 v1.5 signature size
    pub const SIGNATURE_SIZE: usize = 128;

    /// Length of a Tor v2 onion hostname (without the .onion suffix)
    pub const HOSTNAME_LENGTH: usize = 16;

    /// Bytes of the SHA-1 public key digest used for the hostname
    pub const HOSTNAME_DIGEST_BYTES: usize = 10;
}
