//! Elliptic curve key and signature surface over secp256k1.
//!
//! All curve math is delegated to k256; this module adds the Bitcoin
//! conventions on top: WIF serialization, P2PKH addresses, compact and
//! DER signature forms, and low-S normalization.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;

/// Check whether a byte slice is a valid secp256k1 private key scalar.
///
/// # Arguments
/// * `bytes` - Candidate key material.
///
/// # Returns
/// `true` if the slice is exactly 32 bytes and represents a non-zero
/// scalar below the curve order.
pub fn verify_private_key(bytes: &[u8]) -> bool {
    PrivateKey::from_bytes(bytes).is_ok()
}
