//! Crypto error types

use thiserror::Error;

/// Crypto layer errors
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Private key file could not be read or parsed
    #[error("Invalid private key file: {0}")]
    InvalidPrivateKeyFile(String),

    /// DER public key could not be parsed
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature did not verify against the challenge
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Signing failed (malformed key)
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
