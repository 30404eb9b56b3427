//! Tor v2 onion hostname derivation
//!
//! A v2 hidden-service hostname is the lowercase base32 encoding of the
//! first 10 bytes of the SHA-1 digest of the DER-encoded RSA public key,
//! yielding the canonical 16-character identifier (without `.onion`).

use sha1::{Digest, Sha1};

use crate::constants::HOSTNAME_DIGEST_BYTES;

/// Derive the onion hostname for a DER-encoded (PKCS#1) RSA public key.
pub fn onion_hostname(der_public_key: &[u8]) -> String {
    let digest = Sha1::digest(der_public_key);
    base32::encode(
        base32::Alphabet::Rfc4648Lower { padding: false },
        &digest[..HOSTNAME_DIGEST_BYTES],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HOSTNAME_LENGTH;

    #[test]
    fn hostname_is_sixteen_lowercase_chars() {
        let hostname = onion_hostname(b"arbitrary key material");
        assert_eq!(hostname.len(), HOSTNAME_LENGTH);
        assert!(hostname
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn hostname_is_deterministic() {
        assert_eq!(onion_hostname(b"key"), onion_hostname(b"key"));
        assert_ne!(onion_hostname(b"key"), onion_hostname(b"other key"));
    }
}
