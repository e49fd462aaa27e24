//! Per-input PSBT map: UTXOs, partial signatures, scripts, key origins.

use btck_primitives::util::ByteWriter;
use btck_transaction::{Script, Transaction, TxOutput, Witness, TX_FLAG_USE_WITNESS};

use crate::map::{entry_len, write_entry, KeyValueMap};
use crate::origin::KeyOrigin;
use crate::PsbtError;

// Input map key types (BIP-174).
pub const PSBT_IN_NON_WITNESS_UTXO: u8 = 0x00;
pub const PSBT_IN_WITNESS_UTXO: u8 = 0x01;
pub const PSBT_IN_PARTIAL_SIG: u8 = 0x02;
pub const PSBT_IN_SIGHASH_TYPE: u8 = 0x03;
pub const PSBT_IN_REDEEM_SCRIPT: u8 = 0x04;
pub const PSBT_IN_WITNESS_SCRIPT: u8 = 0x05;
pub const PSBT_IN_BIP32_DERIVATION: u8 = 0x06;
pub const PSBT_IN_FINAL_SCRIPTSIG: u8 = 0x07;
pub const PSBT_IN_FINAL_WITNESS: u8 = 0x08;

/// The signing state of one transaction input.
///
/// Field encoding order follows the numeric key type, which is what the
/// reference vectors use; unknown keys are re-emitted last, in the order
/// they were read.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct PsbtInput {
    /// The full transaction containing the output being spent. Required
    /// for legacy (non-segwit) spends.
    pub non_witness_utxo: Option<Transaction>,

    /// The output being spent. Required for segwit spends, where it
    /// supplies the amount the signature commits to.
    pub witness_utxo: Option<TxOutput>,

    /// Signatures collected so far: compressed or uncompressed public
    /// key bytes mapped to a DER signature with the hashtype appended.
    pub partial_sigs: KeyValueMap,

    /// The sighash type to sign with, if one was recorded. `None`
    /// leaves the choice to the signer (SIGHASH_ALL). An explicit
    /// entry is preserved on re-encode even when its value is zero.
    pub sighash_type: Option<u32>,

    /// Redeem script for P2SH spends.
    pub redeem_script: Option<Script>,

    /// Witness script for P2WSH spends.
    pub witness_script: Option<Script>,

    /// The final unlocking script once this input is finalized.
    pub final_script_sig: Option<Script>,

    /// The final witness stack once this input is finalized.
    pub final_witness: Option<Witness>,

    /// Public key bytes mapped to serialized [`KeyOrigin`]s.
    pub keypaths: KeyValueMap,

    /// Key-value pairs with unrecognized key types, preserved verbatim.
    pub unknowns: KeyValueMap,
}

impl PsbtInput {
    /// Create an empty input map.
    pub fn new() -> Self {
        PsbtInput::default()
    }

    /// Check whether this input has been finalized.
    ///
    /// # Returns
    /// `true` if a final scriptSig or final witness is present.
    pub fn is_finalized(&self) -> bool {
        self.final_script_sig.is_some() || self.final_witness.is_some()
    }

    /// Check whether this input spends a segwit output.
    pub fn is_segwit(&self) -> bool {
        self.witness_utxo.is_some()
    }

    /// The amount in satoshis this input spends, if known.
    ///
    /// # Arguments
    /// * `vout` - The output index from the input's outpoint, used to
    ///   look inside a non-witness UTXO.
    ///
    /// # Returns
    /// The amount, or `None` when neither UTXO field can supply it.
    pub fn amount(&self, vout: u32) -> Option<u64> {
        if let Some(ref output) = self.witness_utxo {
            return Some(output.satoshis);
        }
        self.non_witness_utxo
            .as_ref()
            .and_then(|tx| tx.outputs.get(vout as usize))
            .map(|output| output.satoshis)
    }

    /// The parsed key origin recorded for a public key, if any.
    ///
    /// # Arguments
    /// * `pubkey` - The public key bytes as they appear in the map.
    pub fn key_origin(&self, pubkey: &[u8]) -> Option<KeyOrigin> {
        let value = self.keypaths.get(pubkey)?;
        KeyOrigin::from_bytes(value).ok()
    }

    /// Build an input from the key-value entries of one PSBT input map.
    ///
    /// # Arguments
    /// * `entries` - The raw entries, in file order.
    ///
    /// # Returns
    /// `Ok(PsbtInput)`, or `Malformed` on duplicate keys, bad key
    /// payloads, or undecodable values.
    pub fn from_entries(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Result<Self, PsbtError> {
        let mut input = PsbtInput::new();

        for (key, value) in entries {
            let (key_type, payload) = key
                .split_first()
                .ok_or_else(|| PsbtError::Malformed("empty key in input map".to_string()))?;

            match *key_type {
                PSBT_IN_NON_WITNESS_UTXO => {
                    require_bare_key(payload, "non-witness utxo")?;
                    replace_none(
                        &mut input.non_witness_utxo,
                        Transaction::from_bytes(&value, TX_FLAG_USE_WITNESS)?,
                        "non-witness utxo",
                    )?;
                }
                PSBT_IN_WITNESS_UTXO => {
                    require_bare_key(payload, "witness utxo")?;
                    replace_none(
                        &mut input.witness_utxo,
                        decode_output(&value)?,
                        "witness utxo",
                    )?;
                }
                PSBT_IN_PARTIAL_SIG => {
                    require_pubkey(payload, "partial signature")?;
                    if !input.partial_sigs.insert_new(payload.to_vec(), value) {
                        return Err(PsbtError::Malformed(
                            "duplicate partial signature key".to_string(),
                        ));
                    }
                }
                PSBT_IN_SIGHASH_TYPE => {
                    require_bare_key(payload, "sighash type")?;
                    if value.len() != 4 {
                        return Err(PsbtError::Malformed(
                            "sighash type is not 4 bytes".to_string(),
                        ));
                    }
                    if input.sighash_type.is_some() {
                        return Err(PsbtError::Malformed(
                            "duplicate sighash type".to_string(),
                        ));
                    }
                    input.sighash_type =
                        Some(u32::from_le_bytes([value[0], value[1], value[2], value[3]]));
                }
                PSBT_IN_REDEEM_SCRIPT => {
                    require_bare_key(payload, "redeem script")?;
                    replace_none(
                        &mut input.redeem_script,
                        Script::from_bytes(&value),
                        "redeem script",
                    )?;
                }
                PSBT_IN_WITNESS_SCRIPT => {
                    require_bare_key(payload, "witness script")?;
                    replace_none(
                        &mut input.witness_script,
                        Script::from_bytes(&value),
                        "witness script",
                    )?;
                }
                PSBT_IN_BIP32_DERIVATION => {
                    require_pubkey(payload, "bip32 derivation")?;
                    KeyOrigin::from_bytes(&value)?;
                    if !input.keypaths.insert_new(payload.to_vec(), value) {
                        return Err(PsbtError::Malformed(
                            "duplicate bip32 derivation key".to_string(),
                        ));
                    }
                }
                PSBT_IN_FINAL_SCRIPTSIG => {
                    require_bare_key(payload, "final scriptSig")?;
                    replace_none(
                        &mut input.final_script_sig,
                        Script::from_bytes(&value),
                        "final scriptSig",
                    )?;
                }
                PSBT_IN_FINAL_WITNESS => {
                    require_bare_key(payload, "final witness")?;
                    replace_none(
                        &mut input.final_witness,
                        decode_witness(&value)?,
                        "final witness",
                    )?;
                }
                _ => {
                    if !input.unknowns.insert_new(key, value) {
                        return Err(PsbtError::Malformed(
                            "duplicate unknown key in input map".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(input)
    }

    /// Serialize this input map, including the trailing separator.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        if let Some(ref tx) = self.non_witness_utxo {
            write_entry(
                writer,
                &[PSBT_IN_NON_WITNESS_UTXO],
                &tx.to_bytes(TX_FLAG_USE_WITNESS),
            );
        }
        if let Some(ref output) = self.witness_utxo {
            write_entry(writer, &[PSBT_IN_WITNESS_UTXO], &output.to_bytes());
        }
        for (pubkey, sig) in self.partial_sigs.iter() {
            let mut key = Vec::with_capacity(1 + pubkey.len());
            key.push(PSBT_IN_PARTIAL_SIG);
            key.extend_from_slice(pubkey);
            write_entry(writer, &key, sig);
        }
        if let Some(sighash_type) = self.sighash_type {
            write_entry(
                writer,
                &[PSBT_IN_SIGHASH_TYPE],
                &sighash_type.to_le_bytes(),
            );
        }
        if let Some(ref script) = self.redeem_script {
            write_entry(writer, &[PSBT_IN_REDEEM_SCRIPT], script.as_bytes());
        }
        if let Some(ref script) = self.witness_script {
            write_entry(writer, &[PSBT_IN_WITNESS_SCRIPT], script.as_bytes());
        }
        for (pubkey, origin) in self.keypaths.iter() {
            let mut key = Vec::with_capacity(1 + pubkey.len());
            key.push(PSBT_IN_BIP32_DERIVATION);
            key.extend_from_slice(pubkey);
            write_entry(writer, &key, origin);
        }
        if let Some(ref script) = self.final_script_sig {
            write_entry(writer, &[PSBT_IN_FINAL_SCRIPTSIG], script.as_bytes());
        }
        if let Some(ref witness) = self.final_witness {
            let mut value = ByteWriter::with_capacity(witness.serialized_len());
            witness.write_to(&mut value);
            write_entry(writer, &[PSBT_IN_FINAL_WITNESS], value.as_bytes());
        }
        for (key, value) in self.unknowns.iter() {
            write_entry(writer, key, value);
        }
        writer.write_u8(0x00);
    }

    /// The encoded size of this map, including the trailing separator.
    pub fn encoded_len(&self) -> usize {
        let mut len = 1;
        if let Some(ref tx) = self.non_witness_utxo {
            len += entry_len(1, tx.serialized_len(TX_FLAG_USE_WITNESS));
        }
        if let Some(ref output) = self.witness_utxo {
            len += entry_len(1, output.to_bytes().len());
        }
        for (pubkey, sig) in self.partial_sigs.iter() {
            len += entry_len(1 + pubkey.len(), sig.len());
        }
        if self.sighash_type.is_some() {
            len += entry_len(1, 4);
        }
        if let Some(ref script) = self.redeem_script {
            len += entry_len(1, script.len());
        }
        if let Some(ref script) = self.witness_script {
            len += entry_len(1, script.len());
        }
        for (pubkey, origin) in self.keypaths.iter() {
            len += entry_len(1 + pubkey.len(), origin.len());
        }
        if let Some(ref script) = self.final_script_sig {
            len += entry_len(1, script.len());
        }
        if let Some(ref witness) = self.final_witness {
            len += entry_len(1, witness.serialized_len());
        }
        for (key, value) in self.unknowns.iter() {
            len += entry_len(key.len(), value.len());
        }
        len
    }
}

/// Reject key payloads on types that carry none.
pub(crate) fn require_bare_key(payload: &[u8], what: &str) -> Result<(), PsbtError> {
    if payload.is_empty() {
        Ok(())
    } else {
        Err(PsbtError::Malformed(format!(
            "{} key carries unexpected data",
            what
        )))
    }
}

/// Require a plausible public key in the key payload.
pub(crate) fn require_pubkey(payload: &[u8], what: &str) -> Result<(), PsbtError> {
    if payload.len() == 33 || payload.len() == 65 {
        Ok(())
    } else {
        Err(PsbtError::Malformed(format!(
            "{} key is not a public key",
            what
        )))
    }
}

/// Set an optional field, rejecting a second occurrence.
fn replace_none<T>(slot: &mut Option<T>, value: T, what: &str) -> Result<(), PsbtError> {
    if slot.is_some() {
        return Err(PsbtError::Malformed(format!("duplicate {}", what)));
    }
    *slot = Some(value);
    Ok(())
}

/// Decode a serialized output, consuming the entire value.
fn decode_output(value: &[u8]) -> Result<TxOutput, PsbtError> {
    let mut reader = btck_primitives::util::ByteReader::new(value);
    let output = TxOutput::read_from(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(PsbtError::Malformed(
            "trailing bytes after witness utxo".to_string(),
        ));
    }
    Ok(output)
}

/// Decode a serialized witness stack, consuming the entire value.
fn decode_witness(value: &[u8]) -> Result<Witness, PsbtError> {
    let mut reader = btck_primitives::util::ByteReader::new(value);
    let witness = Witness::read_from(&mut reader)?;
    if reader.remaining() != 0 {
        return Err(PsbtError::Malformed(
            "trailing bytes after final witness".to_string(),
        ));
    }
    Ok(witness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_is_one_separator_byte() {
        let input = PsbtInput::new();
        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        assert_eq!(writer.as_bytes(), &[0x00]);
        assert_eq!(input.encoded_len(), 1);
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let entries = vec![
            (vec![PSBT_IN_REDEEM_SCRIPT], vec![0x51]),
            (vec![PSBT_IN_REDEEM_SCRIPT], vec![0x52]),
        ];
        assert!(matches!(
            PsbtInput::from_entries(entries),
            Err(PsbtError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_keys_preserved_in_order() {
        let entries = vec![
            (vec![0xfc, 0x01], vec![0xaa]),
            (vec![0xfd, 0x02], vec![0xbb]),
        ];
        let input = PsbtInput::from_entries(entries).unwrap();
        let keys: Vec<_> = input.unknowns.iter().map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys, vec![vec![0xfc, 0x01], vec![0xfd, 0x02]]);

        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        assert_eq!(
            writer.as_bytes(),
            &[0x02, 0xfc, 0x01, 0x01, 0xaa, 0x02, 0xfd, 0x02, 0x01, 0xbb, 0x00]
        );
        assert_eq!(input.encoded_len(), writer.as_bytes().len());
    }

    #[test]
    fn test_explicit_zero_sighash_type_roundtrips() {
        let entries = vec![(vec![PSBT_IN_SIGHASH_TYPE], vec![0x00, 0x00, 0x00, 0x00])];
        let input = PsbtInput::from_entries(entries).unwrap();
        assert_eq!(input.sighash_type, Some(0));

        let mut writer = ByteWriter::new();
        input.write_to(&mut writer);
        assert_eq!(
            writer.as_bytes(),
            &[0x01, 0x03, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
        assert_eq!(input.encoded_len(), writer.as_bytes().len());
    }

    #[test]
    fn test_duplicate_sighash_type_rejected() {
        let entries = vec![
            (vec![PSBT_IN_SIGHASH_TYPE], vec![0x00, 0x00, 0x00, 0x00]),
            (vec![PSBT_IN_SIGHASH_TYPE], vec![0x01, 0x00, 0x00, 0x00]),
        ];
        assert!(matches!(
            PsbtInput::from_entries(entries),
            Err(PsbtError::Malformed(_))
        ));
    }

    #[test]
    fn test_bad_pubkey_key_rejected() {
        let entries = vec![(vec![PSBT_IN_PARTIAL_SIG, 0x02, 0x03], vec![])];
        assert!(PsbtInput::from_entries(entries).is_err());
    }

    #[test]
    fn test_finalized_detection() {
        let mut input = PsbtInput::new();
        assert!(!input.is_finalized());
        input.final_witness = Some(Witness::from_items(vec![vec![0x01]]));
        assert!(input.is_finalized());
    }
}
