//! BIP-32 hierarchical deterministic keys.
//!
//! Provides the extended key type used for deterministic wallets:
//! master key generation from a seed, hardened and normal child
//! derivation, neutered (public-only) derivation, and the Base58Check
//! `xprv`/`xpub` serialization (`tprv`/`tpub` on testnet).

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::{PrimeField, ScalarPrimitive};
use k256::{ProjectivePoint, Scalar, Secp256k1};
use zeroize::Zeroize;

use crate::base58;
use crate::ec::{PrivateKey, PublicKey};
use crate::hash::{hash160, sha512_hmac};
use crate::network::Network;
use crate::PrimitivesError;

/// Marks a hardened element in a derivation path.
pub const HARDENED: u32 = 0x8000_0000;

/// Length of a key fingerprint.
pub const FINGERPRINT_LEN: usize = 4;

/// Length of a serialized extended key before the Base58Check wrap.
const SERIALIZED_LEN: usize = 78;

/// Length of a chain code.
const CHAIN_CODE_LEN: usize = 32;

// Serialization version prefixes.
const VERSION_MAINNET_PRIVATE: u32 = 0x0488_ade4;
const VERSION_MAINNET_PUBLIC: u32 = 0x0488_b21e;
const VERSION_TESTNET_PRIVATE: u32 = 0x0435_8394;
const VERSION_TESTNET_PUBLIC: u32 = 0x0435_87cf;

/// HMAC key for master key generation from a seed.
const MASTER_SEED_KEY: &[u8] = b"Bitcoin seed";

/// An extended key: a secp256k1 key plus the chain code and placement
/// metadata that make deterministic child derivation possible.
///
/// A key is either private (can derive any child and sign) or neutered
/// (public only, can derive non-hardened children). The master
/// fingerprint identifies the root of the tree; it is known for keys
/// built from a seed or parsed at depth zero, and travels through
/// derivation so derived keys can be matched against recorded key
/// origins.
#[derive(Clone, Debug)]
pub struct HDKey {
    network: Network,
    depth: u8,
    parent_fingerprint: [u8; FINGERPRINT_LEN],
    child_number: u32,
    chain_code: [u8; CHAIN_CODE_LEN],
    private_key: Option<PrivateKey>,
    public_key: PublicKey,
    master_fingerprint: Option<[u8; FINGERPRINT_LEN]>,
}

impl HDKey {
    /// Generate a master key from entropy.
    ///
    /// # Arguments
    /// * `seed` - 16, 32, or 64 bytes of seed material.
    /// * `network` - The network the serialized forms encode for.
    ///
    /// # Returns
    /// The master extended private key, or `InvalidBip32` for a bad
    /// seed length or the (vanishingly unlikely) out-of-range scalar.
    pub fn from_seed(seed: &[u8], network: Network) -> Result<Self, PrimitivesError> {
        if !matches!(seed.len(), 16 | 32 | 64) {
            return Err(PrimitivesError::InvalidBip32(format!(
                "seed must be 16, 32, or 64 bytes, got {}",
                seed.len()
            )));
        }
        let mut digest = sha512_hmac(MASTER_SEED_KEY, seed);
        let private_key = PrivateKey::from_bytes(&digest[..32]).map_err(|_| {
            PrimitivesError::InvalidBip32("seed produces an invalid master key".to_string())
        })?;
        let mut chain_code = [0u8; CHAIN_CODE_LEN];
        chain_code.copy_from_slice(&digest[32..]);
        digest.zeroize();

        let public_key = private_key.public_key();
        let master_fingerprint = Some(key_fingerprint(&public_key));
        Ok(HDKey {
            network,
            depth: 0,
            parent_fingerprint: [0; FINGERPRINT_LEN],
            child_number: 0,
            chain_code,
            private_key: Some(private_key),
            public_key,
            master_fingerprint,
        })
    }

    /// Parse an extended key from its Base58Check serialization.
    ///
    /// Accepts all four version prefixes. A key parsed at depth zero
    /// knows its master fingerprint; deeper keys do not, use
    /// [`HDKey::from_base58_with_fingerprint`] to supply it.
    ///
    /// # Arguments
    /// * `encoded` - An `xprv`, `xpub`, `tprv`, or `tpub` string.
    ///
    /// # Returns
    /// `Ok(HDKey)`, or an error for a bad checksum, length, version,
    /// or key payload.
    pub fn from_base58(encoded: &str) -> Result<Self, PrimitivesError> {
        let mut data = base58::check_decode(encoded)?;
        if data.len() != SERIALIZED_LEN {
            let length = data.len();
            data.zeroize();
            return Err(PrimitivesError::InvalidBip32(format!(
                "extended key is {} bytes, want {}",
                length, SERIALIZED_LEN
            )));
        }
        let result = Self::from_serialized(&data);
        data.zeroize();
        result
    }

    /// Parse an extended key and attach the fingerprint of the master
    /// key it descends from.
    ///
    /// # Arguments
    /// * `encoded` - An `xprv`, `xpub`, `tprv`, or `tpub` string.
    /// * `master_fingerprint` - Fingerprint of the tree's master key.
    ///
    /// # Returns
    /// `Ok(HDKey)`, or `InvalidBip32` when the key is itself a master
    /// key and the fingerprint does not match its own.
    pub fn from_base58_with_fingerprint(
        encoded: &str,
        master_fingerprint: [u8; FINGERPRINT_LEN],
    ) -> Result<Self, PrimitivesError> {
        let mut key = Self::from_base58(encoded)?;
        if let Some(own) = key.master_fingerprint {
            if own != master_fingerprint {
                return Err(PrimitivesError::InvalidBip32(
                    "master fingerprint does not match the key".to_string(),
                ));
            }
        }
        key.master_fingerprint = Some(master_fingerprint);
        Ok(key)
    }

    fn from_serialized(data: &[u8]) -> Result<Self, PrimitivesError> {
        let version = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let (network, has_private) = match version {
            VERSION_MAINNET_PRIVATE => (Network::Mainnet, true),
            VERSION_MAINNET_PUBLIC => (Network::Mainnet, false),
            VERSION_TESTNET_PRIVATE => (Network::Testnet, true),
            VERSION_TESTNET_PUBLIC => (Network::Testnet, false),
            other => {
                return Err(PrimitivesError::InvalidBip32(format!(
                    "unknown version prefix 0x{:08x}",
                    other
                )));
            }
        };

        let depth = data[4];
        let mut parent_fingerprint = [0u8; FINGERPRINT_LEN];
        parent_fingerprint.copy_from_slice(&data[5..9]);
        let child_number = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);
        if depth == 0 && (parent_fingerprint != [0; FINGERPRINT_LEN] || child_number != 0) {
            return Err(PrimitivesError::InvalidBip32(
                "master key carries parent data".to_string(),
            ));
        }
        let mut chain_code = [0u8; CHAIN_CODE_LEN];
        chain_code.copy_from_slice(&data[13..45]);

        let key_data = &data[45..SERIALIZED_LEN];
        let (private_key, public_key) = if has_private {
            if key_data[0] != 0 {
                return Err(PrimitivesError::InvalidBip32(
                    "private key data must lead with a zero byte".to_string(),
                ));
            }
            let key = PrivateKey::from_bytes(&key_data[1..])?;
            let public = key.public_key();
            (Some(key), public)
        } else {
            (None, PublicKey::from_bytes(key_data)?)
        };

        let mut key = HDKey {
            network,
            depth,
            parent_fingerprint,
            child_number,
            chain_code,
            private_key,
            public_key,
            master_fingerprint: None,
        };
        if depth == 0 {
            key.master_fingerprint = Some(key.fingerprint());
        }
        Ok(key)
    }

    /// Serialize the private form as Base58Check.
    ///
    /// # Returns
    /// The `xprv`/`tprv` string, or `InvalidBip32` for a neutered key.
    pub fn to_xprv(&self) -> Result<String, PrimitivesError> {
        let key = self.private_key.as_ref().ok_or_else(|| {
            PrimitivesError::InvalidBip32("neutered key has no private form".to_string())
        })?;
        let mut data = self.serialize_header(true);
        data.push(0);
        data.extend_from_slice(&key.to_bytes());
        let encoded = base58::check_encode(&data);
        data.zeroize();
        Ok(encoded)
    }

    /// Serialize the public form as Base58Check.
    ///
    /// # Returns
    /// The `xpub`/`tpub` string.
    pub fn to_xpub(&self) -> String {
        let mut data = self.serialize_header(false);
        data.extend_from_slice(&self.public_key.to_compressed());
        base58::check_encode(&data)
    }

    fn serialize_header(&self, private: bool) -> Vec<u8> {
        let version = match (self.network, private) {
            (Network::Mainnet | Network::Liquid, true) => VERSION_MAINNET_PRIVATE,
            (Network::Mainnet | Network::Liquid, false) => VERSION_MAINNET_PUBLIC,
            (Network::Testnet | Network::LiquidRegtest, true) => VERSION_TESTNET_PRIVATE,
            (Network::Testnet | Network::LiquidRegtest, false) => VERSION_TESTNET_PUBLIC,
        };
        let mut data = Vec::with_capacity(SERIALIZED_LEN);
        data.extend_from_slice(&version.to_be_bytes());
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.child_number.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data
    }

    /// Derive one child key.
    ///
    /// Hardened children (high bit set) require the private key.
    /// A neutered key derives neutered children by point addition.
    ///
    /// # Arguments
    /// * `child_number` - The child index, with [`HARDENED`] set for
    ///   hardened derivation.
    ///
    /// # Returns
    /// The child key, or `InvalidBip32` when hardened derivation is
    /// requested on a neutered key, the tree is 255 levels deep, or
    /// the derived key falls outside the curve order.
    pub fn derive_child(&self, child_number: u32) -> Result<Self, PrimitivesError> {
        let depth = self.depth.checked_add(1).ok_or_else(|| {
            PrimitivesError::InvalidBip32("derivation exceeds the maximum depth".to_string())
        })?;

        let mut data = Vec::with_capacity(37);
        if child_number & HARDENED != 0 {
            let key = self.private_key.as_ref().ok_or_else(|| {
                PrimitivesError::InvalidBip32(
                    "hardened derivation requires a private key".to_string(),
                )
            })?;
            data.push(0);
            data.extend_from_slice(&key.to_bytes());
        } else {
            data.extend_from_slice(&self.public_key.to_compressed());
        }
        data.extend_from_slice(&child_number.to_be_bytes());
        let mut digest = sha512_hmac(&self.chain_code, &data);
        data.zeroize();

        let mut tweak_bytes = [0u8; 32];
        tweak_bytes.copy_from_slice(&digest[..32]);
        let tweak = Option::<Scalar>::from(Scalar::from_repr(tweak_bytes.into()));
        let mut chain_code = [0u8; CHAIN_CODE_LEN];
        chain_code.copy_from_slice(&digest[32..]);
        digest.zeroize();
        tweak_bytes.zeroize();
        let tweak = tweak.ok_or_else(|| {
            PrimitivesError::InvalidBip32("derived tweak exceeds the curve order".to_string())
        })?;

        let (private_key, public_key) = match &self.private_key {
            Some(parent) => {
                // Child scalar is (tweak + parent) mod n; zero is invalid.
                let child_scalar = tweak + parent.to_scalar();
                let scalar_primitive: ScalarPrimitive<Secp256k1> = child_scalar.into();
                let key = PrivateKey::from_bytes(&scalar_primitive.to_bytes()).map_err(|_| {
                    PrimitivesError::InvalidBip32("derived key is zero".to_string())
                })?;
                let public = key.public_key();
                (Some(key), public)
            }
            None => {
                let parent_point =
                    ProjectivePoint::from(*self.public_key.verifying_key().as_affine());
                let child_point = ProjectivePoint::GENERATOR * tweak + parent_point;
                let encoded = child_point.to_affine().to_encoded_point(true);
                let public = PublicKey::from_bytes(encoded.as_bytes()).map_err(|_| {
                    PrimitivesError::InvalidBip32("derived point is the identity".to_string())
                })?;
                (None, public)
            }
        };

        Ok(HDKey {
            network: self.network,
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number,
            chain_code,
            private_key,
            public_key,
            master_fingerprint: self.master_fingerprint,
        })
    }

    /// Derive along a path rooted at the master key.
    ///
    /// A key that is not a master key consumes the leading path
    /// elements matching its own depth, so recorded origin paths can
    /// be replayed against intermediate keys.
    ///
    /// # Arguments
    /// * `path` - Path elements from the master key downward.
    ///
    /// # Returns
    /// The key at the end of the path, or an error from any single
    /// derivation step.
    pub fn derive(&self, path: &[u32]) -> Result<Self, PrimitivesError> {
        let remainder = if self.depth == 0 {
            path
        } else {
            let depth = self.depth as usize;
            if path.len() < depth {
                return Err(PrimitivesError::InvalidBip32(
                    "path is shorter than the key depth".to_string(),
                ));
            }
            &path[depth..]
        };

        let mut key = self.clone();
        for &child_number in remainder {
            key = key.derive_child(child_number)?;
        }
        Ok(key)
    }

    /// A copy of this key with the private half removed.
    pub fn neutered(&self) -> Self {
        let mut key = self.clone();
        key.private_key = None;
        key
    }

    /// Whether this key holds only the public half.
    pub fn is_neutered(&self) -> bool {
        self.private_key.is_none()
    }

    /// The private key, if this key is not neutered.
    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }

    /// The public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Fingerprint of this key: the first four bytes of its Hash160.
    pub fn fingerprint(&self) -> [u8; FINGERPRINT_LEN] {
        key_fingerprint(&self.public_key)
    }

    /// Fingerprint of the master key this key descends from, if known.
    pub fn master_fingerprint(&self) -> Option<[u8; FINGERPRINT_LEN]> {
        self.master_fingerprint
    }

    /// The network this key serializes for.
    pub fn network(&self) -> Network {
        self.network
    }

    /// How many derivation steps separate this key from the master.
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// The index this key was derived at, with the hardened bit.
    pub fn child_number(&self) -> u32 {
        self.child_number
    }
}

fn key_fingerprint(key: &PublicKey) -> [u8; FINGERPRINT_LEN] {
    let hash = hash160(&key.to_compressed());
    let mut fingerprint = [0u8; FINGERPRINT_LEN];
    fingerprint.copy_from_slice(&hash[..FINGERPRINT_LEN]);
    fingerprint
}

/// Parse a derivation path string such as `m/0'/0'/2'`.
///
/// The leading `m` (or `M`) is optional. Hardened elements are marked
/// with `'`, `h`, or `H`.
///
/// # Arguments
/// * `path` - The path string.
///
/// # Returns
/// The path elements with the hardened bit applied, or `InvalidBip32`
/// for an unparseable component or an index of 2^31 or more.
pub fn parse_path(path: &str) -> Result<Vec<u32>, PrimitivesError> {
    let mut elements = Vec::new();
    for (position, component) in path.split('/').enumerate() {
        if position == 0 && (component == "m" || component == "M") {
            continue;
        }
        let (digits, hardened) = if let Some(rest) = component
            .strip_suffix('\'')
            .or_else(|| component.strip_suffix('h'))
            .or_else(|| component.strip_suffix('H'))
        {
            (rest, true)
        } else {
            (component, false)
        };
        let index: u32 = digits.parse().map_err(|_| {
            PrimitivesError::InvalidBip32(format!("bad path component {:?}", component))
        })?;
        if index >= HARDENED {
            return Err(PrimitivesError::InvalidBip32(format!(
                "path index {} is out of range",
                index
            )));
        }
        elements.push(if hardened { index | HARDENED } else { index });
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vector 1 from the BIP-32 reference.
    const VECTOR_1_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    const MASTER_TPRV: &str = "tprv8ZgxMBicQKsPd9TeAdPADNnSyH9SSUUbTVeFszDE23Ki6TBB5nCefAdHkK8\
                               Fm3qMQR6sHwA56zqRmKmxnHk37JkiFzvncDqoKmPWubu7hDF";
    const MASTER_TPUB: &str = "tpubD6NzVbkrYhZ4WcVS4H3kcnSZYJfNbofW2oF3AWFXSK86vwRwiB2EqfF9vUy\
                               xVC9ZxDkVGZo9xvSLYxfVsBWdcQHKbN9xbE7iPp9eRgbgpfj";

    fn vector_1_master() -> HDKey {
        let seed = hex::decode(VECTOR_1_SEED).unwrap();
        HDKey::from_seed(&seed, Network::Mainnet).unwrap()
    }

    #[test]
    fn test_vector_1_master() {
        let master = vector_1_master();
        assert_eq!(master.depth(), 0);
        assert_eq!(
            master.to_xprv().unwrap(),
            "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF\
             5kejMRNNU3TGtRBeJgk33yuGBxrMPHi"
        );
        assert_eq!(
            master.to_xpub(),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8Y\
             tGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
    }

    #[test]
    fn test_vector_1_derivation() {
        let master = vector_1_master();

        let child = master.derive(&parse_path("m/0'").unwrap()).unwrap();
        assert_eq!(child.depth(), 1);
        assert_eq!(child.child_number(), HARDENED);
        assert_eq!(
            child.to_xprv().unwrap(),
            "xprv9uHRZZhk6KAJC1avXpDAp4MDc3sQKNxDiPvvkX8Br5ngLNv1TxvUxt4cV1rGL5hj6KCesnDYUhd7\
             oWgT11eZG7XnxHrnYeSvkzY7d2bhkJ7"
        );
        assert_eq!(
            child.to_xpub(),
            "xpub68Gmy5EdvgibQVfPdqkBBCHxA5htiqg55crXYuXoQRKfDBFA1WEjWgP6LHhwBZeNK1VTsfTFUHCd\
             rfp1bgwQ9xv5ski8PX9rL2dZXvgGDnw"
        );

        let grandchild = master.derive(&parse_path("m/0'/1").unwrap()).unwrap();
        assert_eq!(
            grandchild.to_xprv().unwrap(),
            "xprv9wTYmMFdV23N2TdNG573QoEsfRrWKQgWeibmLntzniatZvR9BmLnvSxqu53Kw1UmYPxLgboyZQaX\
             wTCg8MSY3H2EU4pWcQDnRnrVA1xe8fs"
        );
        assert_eq!(
            grandchild.to_xpub(),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7\
             SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
    }

    #[test]
    fn test_neutered_derivation_matches_private() {
        let child = vector_1_master().derive(&[HARDENED]).unwrap();
        let neutered = child.neutered();
        assert!(neutered.is_neutered());
        assert!(neutered.private_key().is_none());
        assert!(neutered.to_xprv().is_err());

        // Non-hardened public derivation lands on the same point.
        let by_point = neutered.derive_child(1).unwrap();
        let by_scalar = child.derive_child(1).unwrap();
        assert_eq!(by_point.to_xpub(), by_scalar.to_xpub());

        // Hardened derivation needs the private half.
        assert!(neutered.derive_child(HARDENED).is_err());
    }

    #[test]
    fn test_master_from_base58() {
        let master = HDKey::from_base58(MASTER_TPRV).unwrap();
        assert_eq!(master.network(), Network::Testnet);
        assert_eq!(master.depth(), 0);
        assert_eq!(master.fingerprint(), [0xd9, 0x0c, 0x6a, 0x4f]);
        assert_eq!(master.master_fingerprint(), Some([0xd9, 0x0c, 0x6a, 0x4f]));
        assert_eq!(master.to_xprv().unwrap(), MASTER_TPRV);
        assert_eq!(master.to_xpub(), MASTER_TPUB);

        let watch_only = HDKey::from_base58(MASTER_TPUB).unwrap();
        assert!(watch_only.is_neutered());
        assert_eq!(watch_only.to_xpub(), MASTER_TPUB);
    }

    #[test]
    fn test_derive_consumes_leading_path_by_depth() {
        let master = HDKey::from_base58(MASTER_TPRV).unwrap();
        let path = parse_path("m/0'/0'/2'").unwrap();
        let leaf = master.derive(&path).unwrap();
        assert_eq!(leaf.depth(), 3);
        assert_eq!(leaf.master_fingerprint(), master.master_fingerprint());

        // An intermediate key replays the absolute path from its own depth.
        let account = master.derive(&path[..2]).unwrap();
        let again = account.derive(&path).unwrap();
        assert_eq!(
            again.public_key().to_compressed(),
            leaf.public_key().to_compressed()
        );

        assert!(account.derive(&path[..1]).is_err(), "path shorter than depth");
    }

    #[test]
    fn test_from_base58_rejects_malformed_keys() {
        // Wrong payload length.
        assert!(HDKey::from_base58(
            "cP53pDbR5WtAD8dYAW9hhTjuvvTVaEiQBdrz9XPrgLBeRFiyCbQr"
        )
        .is_err());
        // Tampered character breaks the checksum.
        let mut tampered = MASTER_TPRV.to_string().into_bytes();
        tampered[10] = if tampered[10] == b'2' { b'3' } else { b'2' };
        assert!(HDKey::from_base58(std::str::from_utf8(&tampered).unwrap()).is_err());

        // Unknown version prefix.
        let mut data = vec![0u8; SERIALIZED_LEN];
        data[..4].copy_from_slice(&0xdead_beefu32.to_be_bytes());
        assert!(HDKey::from_base58(&base58::check_encode(&data)).is_err());

        // Depth zero with a nonzero parent fingerprint.
        let master = HDKey::from_base58(MASTER_TPRV).unwrap();
        let mut data = master.serialize_header(true);
        data.push(0);
        data.extend_from_slice(&master.private_key().unwrap().to_bytes());
        data[5] = 0xff;
        assert!(HDKey::from_base58(&base58::check_encode(&data)).is_err());
    }

    #[test]
    fn test_fingerprint_mismatch_rejected() {
        assert!(HDKey::from_base58_with_fingerprint(MASTER_TPRV, [0; 4]).is_err());
        let key =
            HDKey::from_base58_with_fingerprint(MASTER_TPRV, [0xd9, 0x0c, 0x6a, 0x4f]).unwrap();
        assert_eq!(key.master_fingerprint(), Some([0xd9, 0x0c, 0x6a, 0x4f]));
    }

    #[test]
    fn test_parse_path() {
        assert_eq!(parse_path("m").unwrap(), Vec::<u32>::new());
        assert_eq!(
            parse_path("m/0'/0'/2'").unwrap(),
            vec![HARDENED, HARDENED, 2 | HARDENED]
        );
        assert_eq!(parse_path("44h/1/0").unwrap(), vec![44 | HARDENED, 1, 0]);
        assert_eq!(parse_path("M/0H").unwrap(), vec![HARDENED]);

        assert!(parse_path("m/x").is_err());
        assert!(parse_path("m/").is_err());
        assert!(parse_path("m/2147483648").is_err());
    }

    #[test]
    fn test_from_seed_rejects_bad_lengths() {
        assert!(HDKey::from_seed(&[0u8; 15], Network::Mainnet).is_err());
        assert!(HDKey::from_seed(&[0u8; 33], Network::Mainnet).is_err());
        assert!(HDKey::from_seed(&[], Network::Mainnet).is_err());
    }
}
