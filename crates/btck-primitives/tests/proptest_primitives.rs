use proptest::prelude::*;

use btck_primitives::base58;
use btck_primitives::chainhash::Hash;
use btck_primitives::codec;
use btck_primitives::ec::private_key::PrivateKey;
use btck_primitives::ec::signature::Signature;
use btck_primitives::hash::sha256;
use btck_primitives::util::{ByteReader, ByteWriter, VarInt};
use btck_primitives::Network;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn wif_roundtrip_preserves_key_and_network(seed in prop::array::uniform32(any::<u8>())) {
        // Not all 32-byte arrays are valid private keys (must be < curve order, nonzero).
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            for network in [Network::Mainnet, Network::Testnet] {
                let wif = pk.to_wif(network);
                let (pk2, net2) = PrivateKey::from_wif(&wif).unwrap();
                prop_assert_eq!(pk.to_hex(), pk2.to_hex());
                prop_assert_eq!(network, net2);
            }
            prop_assert!(!pk.public_key().to_address(Network::Mainnet).is_empty());
        }
    }

    #[test]
    fn ecdsa_sign_verify_roundtrip(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let hash = sha256(&msg);
            let sig = pk.sign(&hash).unwrap();
            prop_assert!(pk.public_key().verify(&hash, &sig));

            // DER and compact forms decode back to the same signature.
            let from_der = Signature::from_der(&sig.to_der()).unwrap();
            prop_assert_eq!(&from_der, &sig);
            let from_compact = Signature::from_compact(&sig.to_compact()).unwrap();
            prop_assert_eq!(&from_compact, &sig);
        }
    }

    #[test]
    fn hash_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash::new(bytes);
        let hash2 = Hash::from_hex(&hash.to_string()).unwrap();
        prop_assert_eq!(hash.as_bytes(), hash2.as_bytes());
    }

    #[test]
    fn base58_check_roundtrip(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let encoded = base58::check_encode(&payload);
        prop_assert_eq!(base58::check_decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn hex_and_base64_roundtrip(data in prop::collection::vec(any::<u8>(), 0..128)) {
        prop_assert_eq!(codec::hex_decode(&codec::hex_encode(&data)).unwrap(), data.clone());
        prop_assert_eq!(codec::base64_decode(&codec::base64_encode(&data)).unwrap(), data);
    }

    #[test]
    fn varint_roundtrip(value in any::<u64>()) {
        let mut writer = ByteWriter::new();
        writer.write_varint(VarInt(value));
        let data = writer.into_bytes();
        prop_assert_eq!(data.len(), VarInt(value).length());
        let mut reader = ByteReader::new(&data);
        prop_assert_eq!(reader.read_varint().unwrap(), VarInt(value));
        prop_assert_eq!(reader.remaining(), 0);
    }
}
