//! Entry Signature Service
//!
//! Computes and verifies HMAC-SHA-256 authentication codes over entry
//! hashes using the process-wide secret key. Verification never errors:
//! a malformed or mismatched signature is a verification failure, not a
//! fault in the verifier.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signs entry hashes with a secret loaded once at process start.
///
/// No runtime key rotation: the key is fixed for the process lifetime.
pub struct SignatureService {
    key: Vec<u8>,
}

impl SignatureService {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    /// Compute the keyed MAC over an entry hash, hex-encoded.
    ///
    /// Deterministic: the same hash and key always produce the same
    /// signature.
    pub fn sign(&self, hash: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(hash.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute the expected MAC and compare it to `signature` in
    /// constant time.
    ///
    /// Returns false on non-hex input or a length mismatch.
    pub fn verify(&self, hash: &str, signature: &str) -> bool {
        let provided = match hex::decode(signature) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(hash.as_bytes());
        let expected = mac.finalize().into_bytes();

        provided.len() == expected.len()
            && bool::from(provided.as_slice().ct_eq(expected.as_slice()))
    }
}
