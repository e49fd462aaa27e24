//! BIP-32 key origin attached to a public key in a PSBT.

use crate::PsbtError;

/// Length of a BIP-32 master key fingerprint.
pub const FINGERPRINT_LEN: usize = 4;

/// Marks a hardened element in a derivation path.
pub const HARDENED: u32 = 0x8000_0000;

/// The provenance of a key: master fingerprint plus derivation path.
///
/// # Wire format
///
/// `fingerprint (4 bytes) ‖ path element (4 bytes LE)*`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyOrigin {
    /// Fingerprint of the master key this key derives from.
    pub fingerprint: [u8; FINGERPRINT_LEN],

    /// Derivation path elements, hardened elements have the high bit set.
    pub path: Vec<u32>,
}

impl KeyOrigin {
    /// Create a key origin.
    ///
    /// # Arguments
    /// * `fingerprint` - The master key fingerprint.
    /// * `path` - The derivation path elements.
    pub fn new(fingerprint: [u8; FINGERPRINT_LEN], path: Vec<u32>) -> Self {
        KeyOrigin { fingerprint, path }
    }

    /// Decode a key origin from its wire form.
    ///
    /// # Arguments
    /// * `bytes` - The fingerprint followed by little-endian path elements.
    ///
    /// # Returns
    /// `Ok(KeyOrigin)`, or `Malformed` if the length is not four plus a
    /// multiple of four.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PsbtError> {
        if bytes.len() < FINGERPRINT_LEN || (bytes.len() - FINGERPRINT_LEN) % 4 != 0 {
            return Err(PsbtError::Malformed(format!(
                "key origin length {} is not 4 + 4n",
                bytes.len()
            )));
        }
        let mut fingerprint = [0u8; FINGERPRINT_LEN];
        fingerprint.copy_from_slice(&bytes[..FINGERPRINT_LEN]);

        let path = bytes[FINGERPRINT_LEN..]
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Ok(KeyOrigin { fingerprint, path })
    }

    /// Encode this origin to its wire form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FINGERPRINT_LEN + self.path.len() * 4);
        bytes.extend_from_slice(&self.fingerprint);
        for element in &self.path {
            bytes.extend_from_slice(&element.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_roundtrip() {
        let origin = KeyOrigin::new(
            [0xd9, 0x0c, 0x6a, 0x4f],
            vec![HARDENED, HARDENED, 2 | HARDENED],
        );
        let bytes = origin.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..4], &[0xd9, 0x0c, 0x6a, 0x4f]);
        assert_eq!(KeyOrigin::from_bytes(&bytes).unwrap(), origin);
    }

    #[test]
    fn test_empty_path() {
        let origin = KeyOrigin::new([0; 4], vec![]);
        assert_eq!(KeyOrigin::from_bytes(&origin.to_bytes()).unwrap(), origin);
    }

    #[test]
    fn test_bad_length_rejected() {
        assert!(KeyOrigin::from_bytes(&[0x01, 0x02]).is_err());
        assert!(KeyOrigin::from_bytes(&[0u8; 7]).is_err());
    }
}
