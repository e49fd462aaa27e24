//! ECDSA signature in compact and DER forms.
//!
//! Signatures are held internally as k256 scalar pairs. The compact form
//! is the 64-byte big-endian r and s concatenation; the recoverable form
//! is 65 bytes with a leading recovery header byte.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{self, RecoveryId, VerifyingKey};

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// Length of a compact signature: 32-byte r followed by 32-byte s.
pub const COMPACT_LEN: usize = 64;

/// Length of a recoverable compact signature: header byte plus r and s.
pub const RECOVERABLE_LEN: usize = 65;

/// Length of a signature hash in bytes.
const HASH_LEN: usize = 32;

/// An ECDSA signature over secp256k1.
///
/// Provides compact (64-byte) and DER serialization, low-S normalization
/// per BIP-0062, deterministic RFC6979 signing, and public key recovery
/// from the 65-byte recoverable form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ecdsa::Signature,
}

impl Signature {
    /// Parse a 64-byte compact signature (r ‖ s, big-endian).
    ///
    /// The input must be exactly 64 bytes; any other length is rejected,
    /// never truncated or padded. Zero or out-of-range components are
    /// also rejected.
    ///
    /// # Arguments
    /// * `bytes` - The 64-byte compact signature.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or `InvalidSignature` otherwise.
    pub fn from_compact(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != COMPACT_LEN {
            return Err(PrimitivesError::InvalidSignature(format!(
                "compact signature must be {} bytes, got {}",
                COMPACT_LEN,
                bytes.len()
            )));
        }
        let inner = ecdsa::Signature::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Serialize in 64-byte compact form (r ‖ s, big-endian).
    ///
    /// # Returns
    /// The 64-byte compact signature.
    pub fn to_compact(&self) -> [u8; COMPACT_LEN] {
        let mut out = [0u8; COMPACT_LEN];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Parse a DER-encoded ECDSA signature.
    ///
    /// # Arguments
    /// * `bytes` - DER-encoded signature bytes.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or `InvalidSignature` for malformed
    /// DER or out-of-range components.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = ecdsa::Signature::from_der(bytes)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner })
    }

    /// Serialize in DER format.
    ///
    /// The signature is serialized as-is; call [`Signature::normalize`]
    /// first if a low-S encoding is required.
    ///
    /// # Returns
    /// The DER-encoded signature bytes.
    pub fn to_der(&self) -> Vec<u8> {
        self.inner.to_der().as_bytes().to_vec()
    }

    /// Return the low-S normalized form of this signature per BIP-0062.
    ///
    /// If S exceeds half the curve order it is replaced with N - S;
    /// otherwise the signature is returned unchanged.
    ///
    /// # Returns
    /// A low-S `Signature`.
    pub fn normalize(&self) -> Signature {
        match self.inner.normalize_s() {
            Some(normalized) => Signature { inner: normalized },
            None => self.clone(),
        }
    }

    /// Check whether the S component is already in the lower half order.
    ///
    /// # Returns
    /// `true` if the signature is low-S.
    pub fn is_low_s(&self) -> bool {
        self.inner.normalize_s().is_none()
    }

    /// Sign a 32-byte message hash using RFC6979 deterministic nonces.
    ///
    /// The result is low-S normalized. The hash must be exactly 32
    /// bytes; other lengths are rejected.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error for a bad hash length or
    /// signing failure.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        check_hash_len(hash)?;
        let (sig, _recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(Signature { inner: sig }.normalize())
    }

    /// Verify this signature against a 32-byte message hash and public key.
    ///
    /// # Arguments
    /// * `hash` - The message hash that was signed.
    /// * `pub_key` - The public key to verify against.
    ///
    /// # Returns
    /// `true` if the signature is valid. A hash that is not 32 bytes
    /// never verifies.
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        if hash.len() != HASH_LEN {
            return false;
        }
        pub_key.verifying_key().verify_prehash(hash, &self.inner).is_ok()
    }

    /// Sign a hash and serialize in 65-byte recoverable compact form.
    ///
    /// Format: header byte (27 + recovery id + 4 for compressed keys)
    /// followed by the 32-byte r and s components.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash.
    /// * `priv_key` - The private key to sign with.
    ///
    /// # Returns
    /// The 65-byte recoverable signature.
    pub fn sign_recoverable(
        hash: &[u8],
        priv_key: &PrivateKey,
    ) -> Result<[u8; RECOVERABLE_LEN], PrimitivesError> {
        check_hash_len(hash)?;
        let (sig, recovery_id) = priv_key
            .signing_key()
            .sign_prehash_recoverable(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        // Low-S normalization flips the parity the recovery id encodes.
        let (sig, recovery_id) = match sig.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (sig, recovery_id),
        };

        let mut out = [0u8; RECOVERABLE_LEN];
        out[0] = 27 + recovery_id.to_byte() + 4;
        out[1..].copy_from_slice(&sig.to_bytes());
        Ok(out)
    }

    /// Recover the public key from a 65-byte recoverable signature.
    ///
    /// # Arguments
    /// * `recoverable` - The 65-byte signature (header ‖ r ‖ s).
    /// * `hash` - The 32-byte message hash that was signed.
    ///
    /// # Returns
    /// `Ok(PublicKey)` if recovery succeeds, or an error otherwise.
    pub fn recover_public_key(
        recoverable: &[u8],
        hash: &[u8],
    ) -> Result<PublicKey, PrimitivesError> {
        if recoverable.len() != RECOVERABLE_LEN {
            return Err(PrimitivesError::InvalidSignature(format!(
                "recoverable signature must be {} bytes, got {}",
                RECOVERABLE_LEN,
                recoverable.len()
            )));
        }
        check_hash_len(hash)?;

        let header = recoverable[0];
        if header < 27 {
            return Err(PrimitivesError::InvalidSignature(
                "invalid recovery header".to_string(),
            ));
        }
        let iteration = (header - 27) & !4u8;
        let recovery_id = RecoveryId::from_byte(iteration).ok_or_else(|| {
            PrimitivesError::InvalidSignature("invalid recovery id".to_string())
        })?;

        let sig = ecdsa::Signature::from_slice(&recoverable[1..])
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let recovered = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(PublicKey::from_verifying_key(&recovered))
    }
}

/// Require a signature hash of exactly 32 bytes.
fn check_hash_len(hash: &[u8]) -> Result<(), PrimitivesError> {
    if hash.len() != HASH_LEN {
        return Err(PrimitivesError::InvalidHash(format!(
            "signature hash must be {} bytes, got {}",
            HASH_LEN,
            hash.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{sha256, sha256d};

    #[test]
    fn test_der_parsing() {
        // Signature taken from a confirmed mainnet transaction.
        let valid = hex::decode(
            "304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd41\
             0220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09",
        )
        .unwrap();
        let sig = Signature::from_der(&valid).unwrap();
        assert_eq!(sig.to_der(), valid);

        assert!(Signature::from_der(&[]).is_err());

        // Wrong sequence tag.
        let mut bad_magic = valid.clone();
        bad_magic[0] = 0x31;
        assert!(Signature::from_der(&bad_magic).is_err());

        // Wrong integer tag.
        let mut bad_marker = valid.clone();
        bad_marker[2] = 0x03;
        assert!(Signature::from_der(&bad_marker).is_err());
    }

    #[test]
    fn test_compact_roundtrip() {
        let valid = hex::decode(
            "304402204e45e16932b8af514961a1d3a1a25fdf3f4f7732e9d624c6c61548ab5fb8cd41\
             0220181522ec8eca07de4860a4acdd12909d831cc56cbbac4622082221a8768d1d09",
        )
        .unwrap();
        let sig = Signature::from_der(&valid).unwrap();
        let compact = sig.to_compact();
        assert_eq!(Signature::from_compact(&compact).unwrap(), sig);
    }

    #[test]
    fn test_compact_rejects_wrong_length() {
        assert!(Signature::from_compact(&[0x01; 63]).is_err());
        assert!(Signature::from_compact(&[0x01; 65]).is_err());
        assert!(Signature::from_compact(&[]).is_err());
        // All-zero r and s are out of range.
        assert!(Signature::from_compact(&[0x00; 64]).is_err());
    }

    #[test]
    fn test_low_s_normalization() {
        // r ‖ s with s above half the curve order.
        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(
            &hex::decode("a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404")
                .unwrap(),
        );
        compact[32..].copy_from_slice(
            &hex::decode("971729c7fa944b465b35250c6570a2f31acbb14b13d1565fab7330dcb2b3dfb1")
                .unwrap(),
        );
        let sig = Signature::from_compact(&compact).unwrap();
        assert!(!sig.is_low_s());

        let normalized = sig.normalize();
        assert!(normalized.is_low_s());
        assert_eq!(
            hex::encode(normalized.to_der()),
            "3045022100a196ed0e7ebcbe7b63fe1d8eecbdbde03a67ceba4fc8f6482bdcb9606a911404\
             022068e8d638056bb4b9a4cadaf39a8f5d0b9fe32b9b9b7749dc145f2db01d826190",
        );
        // Normalizing twice is a no-op.
        assert_eq!(normalized.normalize(), normalized);
    }

    #[test]
    fn test_rfc6979_vectors() {
        let tests = vec![
            (
                "cca9fbcc1b41e5a95d369eaa6ddcff73b61a4efaa279cfc6567e8daa39cbaf50",
                "sample",
                "3045022100af340daf02cc15c8d5d08d7735dfe6b98a474ed373bdb5fbecf7571be52b384202205009fb27f37034a9b24b707b7c6b79ca23ddef9e25f7282e8a797efe53a8f124",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000001",
                "Satoshi Nakamoto",
                "3045022100934b1ea10a4b3c1757e2b0c017d0b6143ce3c9a7e6a4a49860d7a6ab210ee3d802202442ce9d2b916064108014783e923ec36b49743e2ffa1c4496f01a512aafd9e5",
            ),
            (
                "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364140",
                "Satoshi Nakamoto",
                "3045022100fd567d121db66e382991534ada77a6bd3106f0a1098c231e47993447cd6af2d002206b39cd0eb1bc8603e159ef5c20a5c8ad685a45b06ce9bebed3f153d10d93bed5",
            ),
            (
                "f8b8af8ce3c7cca5e300d33939540c10d45ce001b8f252bfbc57ba0342904181",
                "Alan Turing",
                "304402207063ae83e7f62bbb171798131b4a0564b956930092b33b07b395615d9ec7e15c022058dfcc1e00a35e1572f366ffe34ba0fc47db1e7189759b9fb233c5b05ab388ea",
            ),
        ];

        for (key_hex, msg, expected_der) in &tests {
            let priv_key = PrivateKey::from_hex(key_hex).unwrap();
            let hash = sha256(msg.as_bytes());
            let sig = priv_key.sign(&hash).unwrap();
            assert_eq!(
                hex::encode(sig.to_der()),
                *expected_der,
                "RFC6979 vector for message '{}'",
                msg
            );
            assert!(priv_key.public_key().verify(&hash, &sig));
        }
    }

    #[test]
    fn test_signing_is_deterministic() {
        let priv_key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let hash = sha256d(b"determinism check");
        let a = priv_key.sign(&hash).unwrap();
        let b = priv_key.sign(&hash).unwrap();
        assert_eq!(a.to_der(), b.to_der());
    }

    #[test]
    fn test_recoverable_roundtrip() {
        for _ in 0..5 {
            let priv_key = PrivateKey::new();
            let hash = sha256d(b"recoverable signature data");

            let recoverable = Signature::sign_recoverable(&hash, &priv_key).unwrap();
            let recovered = Signature::recover_public_key(&recoverable, &hash).unwrap();
            assert_eq!(recovered, priv_key.public_key());
        }
    }

    #[test]
    fn test_recover_rejects_bad_input() {
        let hash = sha256d(b"x");
        assert!(Signature::recover_public_key(&[0u8; 64], &hash).is_err());
        assert!(Signature::recover_public_key(&[0u8; 65], &hash).is_err());
    }
}
