//! Authentication handshake state
//!
//! Each side of an authentication exchange contributes a 16-byte random
//! cookie. The two cookies concatenated (client first) key an HMAC-SHA256
//! over the concatenated hostnames (client first), producing the challenge
//! the client signs.

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::constants::{CHALLENGE_SIZE, COOKIE_SIZE};

type HmacSha256 = Hmac<Sha256>;

/// Cookie state for one authentication handshake
#[derive(Debug, Default, Clone)]
pub struct AuthHandshake {
    client_cookie: [u8; COOKIE_SIZE],
    server_cookie: [u8; COOKIE_SIZE],
}

impl AuthHandshake {
    /// Create handshake state with zeroed cookies
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw 16 uniform random bytes
    pub fn generate_cookie() -> [u8; COOKIE_SIZE] {
        let mut cookie = [0u8; COOKIE_SIZE];
        OsRng.fill_bytes(&mut cookie);
        cookie
    }

    /// Record the peer-supplied client cookie
    pub fn set_client_cookie(&mut self, cookie: [u8; COOKIE_SIZE]) {
        self.client_cookie = cookie;
    }

    /// Record the peer-supplied server cookie
    pub fn set_server_cookie(&mut self, cookie: [u8; COOKIE_SIZE]) {
        self.server_cookie = cookie;
    }

    /// Generate and store our client cookie
    pub fn gen_client_cookie(&mut self) -> [u8; COOKIE_SIZE] {
        self.client_cookie = Self::generate_cookie();
        self.client_cookie
    }

    /// Generate and store our server cookie
    pub fn gen_server_cookie(&mut self) -> [u8; COOKIE_SIZE] {
        self.server_cookie = Self::generate_cookie();
        self.server_cookie
    }

    /// Compute the authentication challenge both sides must agree on.
    ///
    /// Hostnames are the 16-character base32 form without the `.onion`
    /// suffix. The client/server order is fixed in both the key and the
    /// data; swapping either yields a different challenge.
    pub fn challenge(
        &self,
        client_hostname: &str,
        server_hostname: &str,
    ) -> [u8; CHALLENGE_SIZE] {
        let mut key = [0u8; COOKIE_SIZE * 2];
        key[..COOKIE_SIZE].copy_from_slice(&self.client_cookie);
        key[COOKIE_SIZE..].copy_from_slice(&self.server_cookie);

        // HMAC accepts keys of any length, so this cannot fail
        let mut mac = HmacSha256::new_from_slice(&key).expect("hmac key");
        mac.update(client_hostname.as_bytes());
        mac.update(server_hostname.as_bytes());

        let mut challenge = [0u8; CHALLENGE_SIZE];
        challenge.copy_from_slice(&mac.finalize().into_bytes());
        challenge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_matches_reference_vector() {
        let mut handshake = AuthHandshake::new();
        handshake.set_client_cookie(*b"abcdefghijklmnop");
        handshake.set_server_cookie(*b"qrstuvwxyz012345");
        let challenge = handshake.challenge("test.onion", "notareal.onion");
        assert_eq!(
            hex::encode(challenge),
            "f5dbfdf03d9414f14b3793e2a5114a983190eab8957a2eaad0d20c7495baab73"
        );
    }

    #[test]
    fn challenge_depends_on_hostname_order() {
        let mut handshake = AuthHandshake::new();
        handshake.set_client_cookie(*b"abcdefghijklmnop");
        handshake.set_server_cookie(*b"qrstuvwxyz012345");
        let forward = handshake.challenge("client", "server");
        let reversed = handshake.challenge("server", "client");
        assert_ne!(forward, reversed);
    }

    #[test]
    fn generated_cookies_are_stored() {
        let mut handshake = AuthHandshake::new();
        let client = handshake.gen_client_cookie();
        let server = handshake.gen_server_cookie();
        assert_eq!(client, handshake.client_cookie);
        assert_eq!(server, handshake.server_cookie);
        assert_ne!(client, server);
    }
}
