//! secp256k1 private key with WIF serialization and signing.

use k256::ecdsa::SigningKey;
use k256::Scalar;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::base58;
use crate::ec::public_key::PublicKey;
use crate::ec::signature::Signature;
use crate::network::Network;
use crate::PrimitivesError;

/// Length of a serialized private key scalar in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// Flag byte appended to a WIF payload for compressed public keys.
const WIF_COMPRESSED_FLAG: u8 = 0x01;

/// A secp256k1 private key for transaction and PSBT signing.
///
/// Wraps a k256 `SigningKey`, which zeroizes its scalar when dropped,
/// and adds WIF serialization per network and deterministic RFC6979
/// signing. Owned buffers holding key material are scrubbed after use.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
}

impl PrivateKey {
    /// Generate a new random private key using the OS random number generator.
    ///
    /// # Returns
    /// A new randomly generated `PrivateKey`.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
        }
    }

    /// Create a private key from a raw 32-byte scalar.
    ///
    /// # Arguments
    /// * `bytes` - A 32-byte big-endian scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` if the scalar is non-zero and below the curve
    /// order, or `InvalidPrivateKey` otherwise.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey { inner })
    }

    /// Create a private key from a 64-character hexadecimal string.
    ///
    /// # Arguments
    /// * `hex_str` - Hex encoding of the 32-byte scalar.
    ///
    /// # Returns
    /// `Ok(PrivateKey)` on success, or an error for invalid hex or an
    /// invalid scalar.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let mut bytes = hex::decode(hex_str)?;
        let key = Self::from_bytes(&bytes);
        bytes.zeroize();
        key
    }

    /// Create a private key from a WIF (Wallet Import Format) string.
    ///
    /// Accepts compressed (34-byte payload) and uncompressed (33-byte
    /// payload) encodings for any known network prefix.
    ///
    /// # Arguments
    /// * `wif` - A Base58Check-encoded WIF string.
    ///
    /// # Returns
    /// The private key and the network resolved from the version byte,
    /// or an error for a malformed encoding or bad checksum.
    pub fn from_wif(wif: &str) -> Result<(Self, Network), PrimitivesError> {
        let mut payload = base58::check_decode(wif)
            .map_err(|e| match e {
                PrimitivesError::ChecksumMismatch => PrimitivesError::ChecksumMismatch,
                other => PrimitivesError::InvalidWif(other.to_string()),
            })?;

        // prefix + 32-byte scalar, optionally followed by the compressed flag
        match payload.len() {
            34 => {
                if payload[33] != WIF_COMPRESSED_FLAG {
                    payload.zeroize();
                    return Err(PrimitivesError::InvalidWif(
                        "invalid compression flag".to_string(),
                    ));
                }
            }
            33 => {}
            other => {
                payload.zeroize();
                return Err(PrimitivesError::InvalidWif(format!(
                    "invalid payload length {}",
                    other
                )));
            }
        }

        let network = Network::from_wif_prefix(payload[0]);
        let key = Self::from_bytes(&payload[1..1 + PRIVATE_KEY_BYTES_LEN]);
        payload.zeroize();
        Ok((key?, network?))
    }

    /// Encode the private key as a WIF string for the given network.
    ///
    /// Always encodes for compressed public key format.
    ///
    /// # Arguments
    /// * `network` - The network whose WIF version byte to use.
    ///
    /// # Returns
    /// A Base58Check-encoded WIF string.
    pub fn to_wif(&self, network: Network) -> String {
        let mut payload = Vec::with_capacity(1 + PRIVATE_KEY_BYTES_LEN + 1);
        payload.push(network.wif_prefix());
        payload.extend_from_slice(&self.to_bytes());
        payload.push(WIF_COMPRESSED_FLAG);
        let encoded = base58::check_encode(&payload);
        payload.zeroize();
        encoded
    }

    /// Serialize the private key as a 32-byte big-endian array.
    ///
    /// # Returns
    /// The 32-byte scalar.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.inner.to_bytes());
        out
    }

    /// Serialize the private key as a lowercase hexadecimal string.
    ///
    /// # Returns
    /// A 64-character hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derive the corresponding public key.
    ///
    /// # Returns
    /// The `PublicKey` for this private key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(self.inner.verifying_key())
    }

    /// Sign a 32-byte message hash using deterministic RFC6979 nonces.
    ///
    /// The resulting signature is low-S normalized. The hash must be
    /// exactly 32 bytes; other lengths are rejected, never padded or
    /// truncated.
    ///
    /// # Arguments
    /// * `hash` - The 32-byte message hash to sign.
    ///
    /// # Returns
    /// `Ok(Signature)` on success, or an error for a bad hash length or
    /// signing failure.
    pub fn sign(&self, hash: &[u8]) -> Result<Signature, PrimitivesError> {
        Signature::sign(hash, self)
    }

    /// Access the underlying k256 `SigningKey`.
    ///
    /// # Returns
    /// A reference to the inner `SigningKey`.
    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }

    /// Convert the private key to a k256 `Scalar` for arithmetic operations.
    ///
    /// # Returns
    /// The scalar representation of this private key.
    pub(crate) fn to_scalar(&self) -> Scalar {
        *self.inner.as_nonzero_scalar().as_ref()
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::sha256;

    #[test]
    fn test_private_key_roundtrips() {
        let pk = PrivateKey::new();

        let deserialized = PrivateKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(pk, deserialized);

        let deserialized = PrivateKey::from_hex(&pk.to_hex()).unwrap();
        assert_eq!(pk, deserialized);

        for network in [Network::Mainnet, Network::Testnet] {
            let wif = pk.to_wif(network);
            let (deserialized, net) = PrivateKey::from_wif(&wif).unwrap();
            assert_eq!(pk, deserialized);
            assert_eq!(net, network);
        }
    }

    #[test]
    fn test_sign_and_verify() {
        let key_bytes: [u8; 32] = [
            0xea, 0xf0, 0x2c, 0xa3, 0x48, 0xc5, 0x24, 0xe6, 0x39, 0x26, 0x55, 0xba, 0x4d, 0x29,
            0x60, 0x3c, 0xd1, 0xa7, 0x34, 0x7d, 0x9d, 0x65, 0xcf, 0xe9, 0x3c, 0xe1, 0xeb, 0xff,
            0xdc, 0xa2, 0x26, 0x94,
        ];
        let priv_key = PrivateKey::from_bytes(&key_bytes).unwrap();
        let pub_key = priv_key.public_key();

        let hash = sha256(b"message to sign");
        let sig = priv_key.sign(&hash).unwrap();
        assert!(pub_key.verify(&hash, &sig));
        assert_eq!(priv_key.to_bytes(), key_bytes);
    }

    #[test]
    fn test_sign_rejects_non_32_byte_hash() {
        let priv_key = PrivateKey::new();
        assert!(priv_key.sign(&[0u8; 20]).is_err());
        assert!(priv_key.sign(&[0u8; 33]).is_err());
        assert!(priv_key.sign(&[]).is_err());
    }

    #[test]
    fn test_from_invalid_scalar() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
        assert!(PrivateKey::from_bytes(&[0u8; 16]).is_err());
        assert!(PrivateKey::from_hex("").is_err());
        // Curve order N itself is out of range.
        assert!(PrivateKey::from_hex(
            "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"
        )
        .is_err());
    }

    #[test]
    fn test_from_invalid_wif() {
        // Tampered character.
        assert!(
            PrivateKey::from_wif("L401GXuUSHauk19f9Cfpm1qfSXZuGLBUAC2VZM6vdmfMxRxAYkWq").is_err()
        );
        // Truncated.
        assert!(
            PrivateKey::from_wif("L4o1GXuUSHauk19f9Cfpm1qfSXZuGLBUAC2VZM6vdmfMxRxAYkW").is_err()
        );
        assert!(PrivateKey::from_wif("").is_err());
    }

    #[test]
    fn test_known_testnet_wif() {
        // Compressed testnet WIF and its derived compressed pubkey.
        let (key, network) =
            PrivateKey::from_wif("cP53pDbR5WtAD8dYAW9hhTjuvvTVaEiQBdrz9XPrgLBeRFiyCbQr").unwrap();
        assert_eq!(network, Network::Testnet);
        assert_eq!(
            hex::encode(key.public_key().to_compressed()),
            "029583bf39ae0a609747ad199addd634fa6108559d6c5cd39b4c2183f1ab96e07f"
        );
        assert_eq!(key.to_wif(Network::Testnet), "cP53pDbR5WtAD8dYAW9hhTjuvvTVaEiQBdrz9XPrgLBeRFiyCbQr");
    }
}
