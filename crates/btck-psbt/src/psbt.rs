//! The partially signed transaction container (BIP-174).

use btck_primitives::codec::{base64_decode, base64_encode};
use btck_primitives::util::{ByteReader, ByteWriter};
use btck_transaction::{Transaction, TxInput, TxOutput};

use crate::input::PsbtInput;
use crate::map::{entry_len, read_entries, write_entry, KeyValueMap};
use crate::output::PsbtOutput;
use crate::PsbtError;

/// The five magic bytes opening every serialized PSBT.
pub const PSBT_MAGIC: [u8; 5] = *b"psbt\xff";

/// Drop non-witness UTXOs when cloning, shrinking the copy.
pub const PSBT_CLONE_FLAG_OMIT_NON_WITNESS_UTXO: u32 = 0x1;

// Global map key types.
const PSBT_GLOBAL_UNSIGNED_TX: u8 = 0x00;
const PSBT_GLOBAL_VERSION: u8 = 0xfb;

/// A partially signed Bitcoin transaction.
///
/// Carries the unsigned transaction plus one metadata map per input and
/// per output; the map lists stay parallel to the transaction's input
/// and output lists at all times. Only format version 0 is supported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Psbt {
    /// The unsigned transaction: no scriptSigs, no witness data.
    pub tx: Transaction,

    /// Signing state, one entry per transaction input.
    pub inputs: Vec<PsbtInput>,

    /// Metadata, one entry per transaction output.
    pub outputs: Vec<PsbtOutput>,

    /// Global key-value pairs with unrecognized key types.
    pub unknowns: KeyValueMap,

    version: u32,
}

impl Psbt {
    /// Create a PSBT around an unsigned transaction.
    ///
    /// # Arguments
    /// * `tx` - The transaction to sign. Must carry no scriptSigs or
    ///   witness data.
    ///
    /// # Returns
    /// `Ok(Psbt)` with empty input and output maps, or `Malformed` if
    /// the transaction is already signed.
    pub fn new(tx: Transaction) -> Result<Self, PsbtError> {
        ensure_unsigned(&tx)?;
        let inputs = vec![PsbtInput::new(); tx.inputs.len()];
        let outputs = vec![PsbtOutput::new(); tx.outputs.len()];
        Ok(Psbt {
            tx,
            inputs,
            outputs,
            unknowns: KeyValueMap::new(),
            version: 0,
        })
    }

    /// The PSBT format version. Always 0 for a decodable PSBT.
    pub fn version(&self) -> u32 {
        self.version
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a PSBT from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - The serialized PSBT, magic included.
    ///
    /// # Returns
    /// `Ok(Psbt)`, `VersionUnsupported` for a nonzero declared version,
    /// or `Malformed` on any structural violation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PsbtError> {
        let mut reader = ByteReader::new(bytes);
        let magic = reader
            .read_bytes(PSBT_MAGIC.len())
            .map_err(|_| PsbtError::Malformed("missing magic".to_string()))?;
        if magic != PSBT_MAGIC {
            return Err(PsbtError::Malformed("bad magic".to_string()));
        }

        let mut tx: Option<Transaction> = None;
        let mut unknowns = KeyValueMap::new();
        let mut version = 0u32;

        for (key, value) in read_entries(&mut reader)? {
            let (key_type, payload) = key
                .split_first()
                .ok_or_else(|| PsbtError::Malformed("empty key in global map".to_string()))?;
            match *key_type {
                PSBT_GLOBAL_UNSIGNED_TX => {
                    crate::input::require_bare_key(payload, "unsigned transaction")?;
                    if tx.is_some() {
                        return Err(PsbtError::Malformed(
                            "duplicate unsigned transaction".to_string(),
                        ));
                    }
                    let parsed = Transaction::from_bytes(&value, 0)?;
                    ensure_unsigned(&parsed)?;
                    tx = Some(parsed);
                }
                PSBT_GLOBAL_VERSION => {
                    crate::input::require_bare_key(payload, "version")?;
                    if value.len() != 4 {
                        return Err(PsbtError::Malformed(
                            "version is not 4 bytes".to_string(),
                        ));
                    }
                    version = u32::from_le_bytes([value[0], value[1], value[2], value[3]]);
                    if version != 0 {
                        return Err(PsbtError::VersionUnsupported(version));
                    }
                }
                _ => {
                    if !unknowns.insert_new(key, value) {
                        return Err(PsbtError::Malformed(
                            "duplicate unknown key in global map".to_string(),
                        ));
                    }
                }
            }
        }

        let tx = tx.ok_or_else(|| {
            PsbtError::Malformed("missing unsigned transaction".to_string())
        })?;

        let mut inputs = Vec::with_capacity(tx.inputs.len());
        for _ in 0..tx.inputs.len() {
            inputs.push(PsbtInput::from_entries(read_entries(&mut reader)?)?);
        }
        let mut outputs = Vec::with_capacity(tx.outputs.len());
        for _ in 0..tx.outputs.len() {
            outputs.push(PsbtOutput::from_entries(read_entries(&mut reader)?)?);
        }

        if reader.remaining() != 0 {
            return Err(PsbtError::Malformed(format!(
                "trailing {} bytes after output maps",
                reader.remaining()
            )));
        }

        Ok(Psbt {
            tx,
            inputs,
            outputs,
            unknowns,
            version,
        })
    }

    /// Parse a PSBT from its base64 encoding.
    pub fn from_base64(encoded: &str) -> Result<Self, PsbtError> {
        let bytes = base64_decode(encoded)?;
        Self::from_bytes(&bytes)
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this PSBT to raw bytes.
    ///
    /// Known fields are written in key-type order; unknown keys follow
    /// in their original order, so a parsed PSBT re-encodes byte for
    /// byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(self.get_length());
        writer.write_bytes(&PSBT_MAGIC);

        write_entry(&mut writer, &[PSBT_GLOBAL_UNSIGNED_TX], &self.tx.to_bytes(0));
        if self.version != 0 {
            write_entry(
                &mut writer,
                &[PSBT_GLOBAL_VERSION],
                &self.version.to_le_bytes(),
            );
        }
        for (key, value) in self.unknowns.iter() {
            write_entry(&mut writer, key, value);
        }
        writer.write_u8(0x00);

        for input in &self.inputs {
            input.write_to(&mut writer);
        }
        for output in &self.outputs {
            output.write_to(&mut writer);
        }
        writer.into_bytes()
    }

    /// Serialize this PSBT to base64.
    pub fn to_base64(&self) -> String {
        base64_encode(&self.to_bytes())
    }

    /// Compute the serialized byte length without building the buffer.
    ///
    /// # Returns
    /// The length `to_bytes` would produce.
    pub fn get_length(&self) -> usize {
        let mut len = PSBT_MAGIC.len();
        len += entry_len(1, self.tx.serialized_len(0));
        if self.version != 0 {
            len += entry_len(1, 4);
        }
        for (key, value) in self.unknowns.iter() {
            len += entry_len(key.len(), value.len());
        }
        len += 1;
        for input in &self.inputs {
            len += input.encoded_len();
        }
        for output in &self.outputs {
            len += output.encoded_len();
        }
        len
    }

    // -----------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------

    /// Append an input to the unsigned transaction along with an empty
    /// input map, keeping the two lists parallel.
    ///
    /// # Arguments
    /// * `input` - The transaction input. Must be unsigned.
    ///
    /// # Returns
    /// `Malformed` if the input carries a scriptSig or witness.
    pub fn add_input(&mut self, input: TxInput) -> Result<(), PsbtError> {
        if input.script_sig.is_some() || input.witness.is_some() {
            return Err(PsbtError::Malformed(
                "cannot add a signed input to a psbt".to_string(),
            ));
        }
        self.tx.add_input(input);
        self.inputs.push(PsbtInput::new());
        Ok(())
    }

    /// Append an output to the unsigned transaction along with an empty
    /// output map, keeping the two lists parallel.
    ///
    /// # Arguments
    /// * `output` - The transaction output.
    pub fn add_output(&mut self, output: TxOutput) {
        self.tx.add_output(output);
        self.outputs.push(PsbtOutput::new());
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// The transaction fee: total input value minus total output value.
    ///
    /// # Returns
    /// The fee in satoshis, or `None` when any input's amount is
    /// unknown, output totals overflow, or inputs do not cover outputs.
    pub fn fee(&self) -> Option<u64> {
        let total_out = self.tx.total_output_satoshis().ok()?;
        let mut total_in: u64 = 0;
        for (index, input) in self.inputs.iter().enumerate() {
            let vout = self.tx.inputs[index].vout;
            total_in = total_in.checked_add(input.amount(vout)?)?;
        }
        total_in.checked_sub(total_out)
    }

    /// Deep-copy this PSBT.
    ///
    /// # Arguments
    /// * `flags` - `PSBT_CLONE_FLAG_OMIT_NON_WITNESS_UTXO` to drop
    ///   non-witness UTXOs from the copy.
    pub fn clone_with_flags(&self, flags: u32) -> Psbt {
        let mut copy = self.clone();
        if flags & PSBT_CLONE_FLAG_OMIT_NON_WITNESS_UTXO != 0 {
            for input in &mut copy.inputs {
                input.non_witness_utxo = None;
            }
        }
        copy
    }
}

/// Reject a transaction carrying any scriptSig or witness data.
fn ensure_unsigned(tx: &Transaction) -> Result<(), PsbtError> {
    for input in &tx.inputs {
        if input.script_sig.is_some() || input.witness.is_some() {
            return Err(PsbtError::Malformed(
                "unsigned transaction carries signature data".to_string(),
            ));
        }
    }
    Ok(())
}
