//! Network selection for address and WIF version bytes.

use std::fmt;

use crate::PrimitivesError;

/// The set of networks the engine can target.
///
/// Every version-byte lookup matches exhaustively on this enum, so adding
/// a network is a compile-time checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
    Liquid,
    LiquidRegtest,
}

impl Network {
    /// Return the numeric network identifier.
    ///
    /// # Returns
    /// 1 for mainnet, 2 for testnet, 3 for Liquid, 4 for Liquid regtest.
    pub fn id(&self) -> u8 {
        match self {
            Network::Mainnet => 0x01,
            Network::Testnet => 0x02,
            Network::Liquid => 0x03,
            Network::LiquidRegtest => 0x04,
        }
    }

    /// Resolve a numeric network identifier to a `Network`.
    ///
    /// # Arguments
    /// * `id` - The numeric identifier.
    ///
    /// # Returns
    /// `Ok(Network)` for a known identifier, or `InvalidNetwork` otherwise.
    pub fn from_id(id: u8) -> Result<Self, PrimitivesError> {
        match id {
            0x01 => Ok(Network::Mainnet),
            0x02 => Ok(Network::Testnet),
            0x03 => Ok(Network::Liquid),
            0x04 => Ok(Network::LiquidRegtest),
            other => Err(PrimitivesError::InvalidNetwork(other)),
        }
    }

    /// Return the WIF version byte for this network.
    ///
    /// Liquid shares mainnet's prefix and Liquid regtest shares testnet's.
    ///
    /// # Returns
    /// The version byte prepended to WIF-encoded private keys.
    pub fn wif_prefix(&self) -> u8 {
        match self {
            Network::Mainnet | Network::Liquid => 0x80,
            Network::Testnet | Network::LiquidRegtest => 0xef,
        }
    }

    /// Return the P2PKH address version byte for this network.
    ///
    /// # Returns
    /// The version byte prepended to Hash160 payloads in legacy addresses.
    pub fn p2pkh_prefix(&self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
            Network::Liquid => 0x39,
            Network::LiquidRegtest => 0xeb,
        }
    }

    /// Resolve a WIF version byte back to a network.
    ///
    /// 0x80 resolves to mainnet and 0xef to testnet; the Liquid networks
    /// share those prefixes and cannot be distinguished from WIF alone.
    ///
    /// # Arguments
    /// * `prefix` - The leading byte of a decoded WIF payload.
    ///
    /// # Returns
    /// `Ok(Network)` for a known prefix, or `InvalidWif` otherwise.
    pub fn from_wif_prefix(prefix: u8) -> Result<Self, PrimitivesError> {
        match prefix {
            0x80 => Ok(Network::Mainnet),
            0xef => Ok(Network::Testnet),
            other => Err(PrimitivesError::InvalidWif(format!(
                "unknown WIF version byte 0x{:02x}",
                other
            ))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Liquid => "liquid",
            Network::LiquidRegtest => "liquid-regtest",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        for net in [
            Network::Mainnet,
            Network::Testnet,
            Network::Liquid,
            Network::LiquidRegtest,
        ] {
            assert_eq!(Network::from_id(net.id()).unwrap(), net);
        }
        assert!(Network::from_id(0x00).is_err());
        assert!(Network::from_id(0x05).is_err());
    }

    #[test]
    fn test_version_bytes() {
        assert_eq!(Network::Mainnet.wif_prefix(), 0x80);
        assert_eq!(Network::Testnet.wif_prefix(), 0xef);
        assert_eq!(Network::Mainnet.p2pkh_prefix(), 0x00);
        assert_eq!(Network::Testnet.p2pkh_prefix(), 0x6f);
        assert_eq!(Network::Liquid.p2pkh_prefix(), 0x39);
        assert_eq!(Network::LiquidRegtest.p2pkh_prefix(), 0xeb);
    }

    #[test]
    fn test_wif_prefix_resolution() {
        assert_eq!(Network::from_wif_prefix(0x80).unwrap(), Network::Mainnet);
        assert_eq!(Network::from_wif_prefix(0xef).unwrap(), Network::Testnet);
        assert!(Network::from_wif_prefix(0x00).is_err());
    }
}
