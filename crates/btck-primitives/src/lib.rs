/// btck engine - cryptographic primitives, hashing, codecs, and wire utilities.
///
/// This crate provides the foundational building blocks for the btck engine:
/// - Hash functions (SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - Chain hash type for transaction identification
/// - Elliptic curve cryptography (secp256k1 keys, signatures, derivation)
/// - BIP-32 hierarchical deterministic keys
/// - Hex and Base64 codecs
/// - Base58 / Base58Check encoding and decoding
/// - Variable-length integer encoding and wire readers/writers
/// - Network constants (mainnet, testnet, liquid)

pub mod hash;
pub mod chainhash;
pub mod codec;
pub mod base58;
pub mod util;
pub mod ec;
pub mod bip32;
pub mod network;

mod error;
pub use error::PrimitivesError;
pub use network::Network;
