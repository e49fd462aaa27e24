//! Per-output PSBT map: scripts and key origins for change detection.

use btck_primitives::util::ByteWriter;
use btck_transaction::Script;

use crate::input::{require_bare_key, require_pubkey};
use crate::map::{entry_len, write_entry, KeyValueMap};
use crate::origin::KeyOrigin;
use crate::PsbtError;

// Output map key types (BIP-174).
pub const PSBT_OUT_REDEEM_SCRIPT: u8 = 0x00;
pub const PSBT_OUT_WITNESS_SCRIPT: u8 = 0x01;
pub const PSBT_OUT_BIP32_DERIVATION: u8 = 0x02;

/// Metadata attached to one transaction output.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PsbtOutput {
    /// Redeem script for a P2SH output.
    pub redeem_script: Option<Script>,

    /// Witness script for a P2WSH output.
    pub witness_script: Option<Script>,

    /// Public key bytes mapped to serialized [`KeyOrigin`]s.
    pub keypaths: KeyValueMap,

    /// Key-value pairs with unrecognized key types, preserved verbatim.
    pub unknowns: KeyValueMap,
}

impl PsbtOutput {
    /// Create an empty output map.
    pub fn new() -> Self {
        PsbtOutput::default()
    }

    /// The parsed key origin recorded for a public key, if any.
    pub fn key_origin(&self, pubkey: &[u8]) -> Option<KeyOrigin> {
        let value = self.keypaths.get(pubkey)?;
        KeyOrigin::from_bytes(value).ok()
    }

    /// Build an output from the key-value entries of one PSBT output map.
    ///
    /// # Arguments
    /// * `entries` - The raw entries, in file order.
    ///
    /// # Returns
    /// `Ok(PsbtOutput)`, or `Malformed` on duplicate or invalid keys.
    pub fn from_entries(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<Self, PsbtError> {
        let mut output = PsbtOutput::new();

        for (key, value) in entries {
            let (key_type, payload) = key
                .split_first()
                .ok_or_else(|| PsbtError::Malformed("empty key in output map".to_string()))?;

            match *key_type {
                PSBT_OUT_REDEEM_SCRIPT => {
                    require_bare_key(payload, "output redeem script")?;
                    if output.redeem_script.is_some() {
                        return Err(PsbtError::Malformed(
                            "duplicate output redeem script".to_string(),
                        ));
                    }
                    output.redeem_script = Some(Script::from_bytes(&value));
                }
                PSBT_OUT_WITNESS_SCRIPT => {
                    require_bare_key(payload, "output witness script")?;
                    if output.witness_script.is_some() {
                        return Err(PsbtError::Malformed(
                            "duplicate output witness script".to_string(),
                        ));
                    }
                    output.witness_script = Some(Script::from_bytes(&value));
                }
                PSBT_OUT_BIP32_DERIVATION => {
                    require_pubkey(payload, "output bip32 derivation")?;
                    KeyOrigin::from_bytes(&value)?;
                    if !output.keypaths.insert_new(payload.to_vec(), value) {
                        return Err(PsbtError::Malformed(
                            "duplicate output bip32 derivation key".to_string(),
                        ));
                    }
                }
                _ => {
                    if !output.unknowns.insert_new(key, value) {
                        return Err(PsbtError::Malformed(
                            "duplicate unknown key in output map".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(output)
    }

    /// Serialize this output map, including the trailing separator.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        if let Some(ref script) = self.redeem_script {
            write_entry(writer, &[PSBT_OUT_REDEEM_SCRIPT], script.as_bytes());
        }
        if let Some(ref script) = self.witness_script {
            write_entry(writer, &[PSBT_OUT_WITNESS_SCRIPT], script.as_bytes());
        }
        for (pubkey, origin) in self.keypaths.iter() {
            let mut key = Vec::with_capacity(1 + pubkey.len());
            key.push(PSBT_OUT_BIP32_DERIVATION);
            key.extend_from_slice(pubkey);
            write_entry(writer, &key, origin);
        }
        for (key, value) in self.unknowns.iter() {
            write_entry(writer, key, value);
        }
        writer.write_u8(0x00);
    }

    /// The encoded size of this map, including the trailing separator.
    pub fn encoded_len(&self) -> usize {
        let mut len = 1;
        if let Some(ref script) = self.redeem_script {
            len += entry_len(1, script.len());
        }
        if let Some(ref script) = self.witness_script {
            len += entry_len(1, script.len());
        }
        for (pubkey, origin) in self.keypaths.iter() {
            len += entry_len(1 + pubkey.len(), origin.len());
        }
        for (key, value) in self.unknowns.iter() {
            len += entry_len(key.len(), value.len());
        }
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_output_is_one_separator_byte() {
        let output = PsbtOutput::new();
        let mut writer = ByteWriter::new();
        output.write_to(&mut writer);
        assert_eq!(writer.as_bytes(), &[0x00]);
        assert_eq!(output.encoded_len(), 1);
    }

    #[test]
    fn test_keypath_roundtrip() {
        let pubkey = vec![0x02; 33];
        let origin = KeyOrigin::new([1, 2, 3, 4], vec![0, 5]);

        let entries = vec![(
            [&[PSBT_OUT_BIP32_DERIVATION][..], &pubkey[..]].concat(),
            origin.to_bytes(),
        )];
        let output = PsbtOutput::from_entries(entries).unwrap();
        assert_eq!(output.key_origin(&pubkey), Some(origin));
    }

    #[test]
    fn test_bad_origin_value_rejected() {
        let entries = vec![(
            [&[PSBT_OUT_BIP32_DERIVATION][..], &[0x02; 33][..]].concat(),
            vec![0x01, 0x02],
        )];
        assert!(PsbtOutput::from_entries(entries).is_err());
    }
}
