//! Authentication channel records

use serde::{Deserialize, Serialize};

use crate::error::WireResult;
use crate::{decode, encode};

/// A record exchanged on an authentication channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuthMessage {
    /// Client proof of hidden-service key ownership
    Proof {
        /// DER-encoded (PKCS#1) RSA public key
        public_key: Vec<u8>,
        /// PKCS#1 v1.5 / SHA-256 signature over the challenge
        signature: Vec<u8>,
    },

    /// Server verdict on a proof
    Result {
        accepted: bool,
        is_known_contact: bool,
    },
}

/// Client proof record
pub fn proof(public_key: &[u8], signature: &[u8]) -> WireResult<Vec<u8>> {
    encode(&AuthMessage::Proof {
        public_key: public_key.to_vec(),
        signature: signature.to_vec(),
    })
}

/// Server result record
pub fn auth_result(accepted: bool, is_known_contact: bool) -> WireResult<Vec<u8>> {
    encode(&AuthMessage::Result {
        accepted,
        is_known_contact,
    })
}

/// Parse an authentication channel payload
pub fn decode_auth(data: &[u8]) -> WireResult<AuthMessage> {
    decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proof_roundtrip() {
        let raw = proof(b"der bytes", &[0x42; 128]).unwrap();
        match decode_auth(&raw).unwrap() {
            AuthMessage::Proof {
                public_key,
                signature,
            } => {
                assert_eq!(public_key, b"der bytes");
                assert_eq!(signature, vec![0x42; 128]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn result_roundtrip() {
        let raw = auth_result(true, false).unwrap();
        assert_eq!(
            decode_auth(&raw).unwrap(),
            AuthMessage::Result {
                accepted: true,
                is_known_contact: false
            }
        );
    }
}
