//! Hidden-service identity
//!
//! A Ricochet peer is identified by the Tor v2 onion hostname derived from
//! its RSA-1024 public key. The private key signs authentication challenges;
//! the DER-encoded public key travels in the proof so the verifier can
//! recompute the claimed hostname.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::path::Path;

use crate::constants::CHALLENGE_SIZE;
use crate::error::{CryptoError, CryptoResult};
use crate::hostname::onion_hostname;

/// A hidden-service identity backed by an RSA-1024 private key
#[derive(Clone)]
pub struct Identity {
    key: RsaPrivateKey,
    public_key_der: Vec<u8>,
    hostname: String,
}

impl Identity {
    /// Build an identity from an existing private key
    pub fn new(key: RsaPrivateKey) -> CryptoResult<Self> {
        let public_key_der = key
            .to_public_key()
            .to_pkcs1_der()
            .map_err(|e| CryptoError::InvalidPrivateKeyFile(e.to_string()))?
            .as_bytes()
            .to_vec();
        let hostname = onion_hostname(&public_key_der);
        Ok(Self {
            key,
            public_key_der,
            hostname,
        })
    }

    /// Parse a PKCS#1 `RSA PRIVATE KEY` PEM block
    pub fn from_pem(pem: &str) -> CryptoResult<Self> {
        let key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| CryptoError::InvalidPrivateKeyFile(e.to_string()))?;
        Self::new(key)
    }

    /// Load a private key from a PEM file
    pub fn from_pem_file(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let pem = std::fs::read_to_string(path)
            .map_err(|e| CryptoError::InvalidPrivateKeyFile(e.to_string()))?;
        Self::from_pem(&pem)
    }

    /// The onion hostname this identity answers to
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// DER (PKCS#1 `RSAPublicKey`) encoding of the public key
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Sign an authentication challenge.
    ///
    /// The challenge is already a 32-byte HMAC-SHA256 output, so it is
    /// treated as the SHA-256 digest inside the PKCS#1 v1.5 signature.
    pub fn sign_challenge(&self, challenge: &[u8; CHALLENGE_SIZE]) -> CryptoResult<Vec<u8>> {
        self.key
            .sign(Pkcs1v15Sign::new::<Sha256>(), challenge)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("hostname", &self.hostname)
            .finish()
    }
}

/// Verify a signed challenge against a DER-encoded public key.
///
/// Returns the hostname the public key authenticates as.
pub fn verify_challenge(
    der_public_key: &[u8],
    challenge: &[u8; CHALLENGE_SIZE],
    signature: &[u8],
) -> CryptoResult<String> {
    let public_key =
        RsaPublicKey::from_pkcs1_der(der_public_key).map_err(|_| CryptoError::InvalidPublicKey)?;
    public_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), challenge, signature)
        .map_err(|_| CryptoError::SignatureVerificationFailed)?;
    Ok(onion_hostname(der_public_key))
}
