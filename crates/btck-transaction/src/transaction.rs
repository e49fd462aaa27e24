//! Core transaction type with legacy and BIP-144 segwit serialization.

use btck_primitives::chainhash::Hash;
use btck_primitives::hash::sha256d;
use btck_primitives::util::{varint_length, ByteReader, ByteWriter, VarInt};

use crate::input::TxInput;
use crate::output::TxOutput;
use crate::witness::Witness;
use crate::TransactionError;

/// Serialization flag selecting BIP-144 segwit framing.
pub const TX_FLAG_USE_WITNESS: u32 = 0x1;

/// Maximum money supply in satoshis (21 million coins).
pub const MAX_MONEY: u64 = 21_000_000 * 100_000_000;

/// Segwit serialization marker byte, in place of a zero input count.
const SEGWIT_MARKER: u8 = 0x00;

/// Segwit serialization flag byte following the marker.
const SEGWIT_FLAG: u8 = 0x01;

/// A Bitcoin transaction.
///
/// # Wire format (legacy)
///
/// | Field        | Size                 |
/// |--------------|----------------------|
/// | version      | 4 bytes (LE)         |
/// | input count  | VarInt               |
/// | inputs       | variable (per input) |
/// | output count | VarInt               |
/// | outputs      | variable (per output)|
/// | lock_time    | 4 bytes (LE)         |
///
/// With `TX_FLAG_USE_WITNESS`, a marker byte 0x00 and flag byte 0x01
/// follow the version, and per-input witness stacks follow the outputs
/// (BIP-144).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of inputs.
    pub inputs: Vec<TxInput>,

    /// Ordered list of outputs.
    pub outputs: Vec<TxOutput>,

    /// Lock time: block height or Unix timestamp before which the
    /// transaction is invalid, or 0 for none.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction.
    ///
    /// # Arguments
    /// * `version` - The transaction format version.
    /// * `lock_time` - The lock time.
    ///
    /// # Returns
    /// A `Transaction` with no inputs or outputs.
    pub fn new(version: u32, lock_time: u32) -> Self {
        Transaction {
            version,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    /// * `flags` - `TX_FLAG_USE_WITNESS` to accept segwit framing.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `SerializationError` if the
    /// hex or the encoding is invalid.
    pub fn from_hex(hex_str: &str, flags: u32) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes, flags)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// The byte slice must contain exactly one complete transaction with
    /// no trailing data.
    ///
    /// # Arguments
    /// * `bytes` - The raw transaction bytes.
    /// * `flags` - `TX_FLAG_USE_WITNESS` to accept segwit framing.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `SerializationError` if the
    /// data is truncated, malformed, or has trailing bytes.
    pub fn from_bytes(bytes: &[u8], flags: u32) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader, flags)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of a transaction.
    /// * `flags` - `TX_FLAG_USE_WITNESS` to accept segwit framing.
    ///
    /// # Returns
    /// `Ok(Transaction)` on success, or a `SerializationError` on
    /// truncated or malformed data.
    pub fn read_from(reader: &mut ByteReader, flags: u32) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let mut count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;

        // A zero count in witness-aware mode is the BIP-144 marker.
        let mut has_witness = false;
        if count.value() == 0 && flags & TX_FLAG_USE_WITNESS != 0 {
            let flag = reader.read_u8().map_err(|e| {
                TransactionError::SerializationError(format!("reading segwit flag: {}", e))
            })?;
            if flag != SEGWIT_FLAG {
                return Err(TransactionError::SerializationError(format!(
                    "segwit marker followed by flag 0x{:02x}, want 0x{:02x}",
                    flag, SEGWIT_FLAG
                )));
            }
            has_witness = true;
            count = reader.read_varint().map_err(|e| {
                TransactionError::SerializationError(format!("reading input count: {}", e))
            })?;
            if count.value() == 0 {
                return Err(TransactionError::SerializationError(
                    "segwit transaction with zero inputs".to_string(),
                ));
            }
        }

        if count.value() > reader.remaining() as u64 {
            return Err(TransactionError::SerializationError(format!(
                "input count {} exceeds remaining data",
                count.value()
            )));
        }
        let mut inputs = Vec::with_capacity(count.value() as usize);
        for _ in 0..count.value() {
            inputs.push(TxInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;
        if output_count.value() > reader.remaining() as u64 {
            return Err(TransactionError::SerializationError(format!(
                "output count {} exceeds remaining data",
                output_count.value()
            )));
        }
        let mut outputs = Vec::with_capacity(output_count.value() as usize);
        for _ in 0..output_count.value() {
            outputs.push(TxOutput::read_from(reader)?);
        }

        if has_witness {
            for input in &mut inputs {
                let witness = Witness::read_from(reader)?;
                input.witness = if witness.is_empty() {
                    None
                } else {
                    Some(witness)
                };
            }
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw bytes.
    ///
    /// Segwit framing is emitted only when `flags` contains
    /// `TX_FLAG_USE_WITNESS` and at least one input carries a witness.
    ///
    /// # Arguments
    /// * `flags` - `TX_FLAG_USE_WITNESS` to include witness data.
    ///
    /// # Returns
    /// A `Vec<u8>` containing the wire-format bytes.
    pub fn to_bytes(&self, flags: u32) -> Vec<u8> {
        let use_witness = flags & TX_FLAG_USE_WITNESS != 0 && self.has_witness();

        let mut writer = ByteWriter::with_capacity(self.serialized_len(flags));
        writer.write_u32_le(self.version);

        if use_witness {
            writer.write_u8(SEGWIT_MARKER);
            writer.write_u8(SEGWIT_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        if use_witness {
            for input in &self.inputs {
                match &input.witness {
                    Some(witness) => witness.write_to(&mut writer),
                    None => writer.write_varint(VarInt(0)),
                }
            }
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a hex string.
    ///
    /// # Arguments
    /// * `flags` - `TX_FLAG_USE_WITNESS` to include witness data.
    ///
    /// # Returns
    /// A lowercase hex-encoded string of the raw bytes.
    pub fn to_hex(&self, flags: u32) -> String {
        hex::encode(self.to_bytes(flags))
    }

    /// Compute the serialized byte length without building the buffer.
    ///
    /// # Arguments
    /// * `flags` - `TX_FLAG_USE_WITNESS` to account for witness data.
    ///
    /// # Returns
    /// The length `to_bytes(flags)` would produce.
    pub fn serialized_len(&self, flags: u32) -> usize {
        let use_witness = flags & TX_FLAG_USE_WITNESS != 0 && self.has_witness();

        // version + lock_time
        let mut len = 8;
        if use_witness {
            len += 2;
        }

        len += varint_length(self.inputs.len() as u64);
        for input in &self.inputs {
            let script_len = input.script_sig.as_ref().map_or(0, |s| s.len());
            len += 32 + 4 + varint_length(script_len as u64) + script_len + 4;
        }

        len += varint_length(self.outputs.len() as u64);
        for output in &self.outputs {
            let script_len = output.script_pubkey.len();
            len += 8 + varint_length(script_len as u64) + script_len;
        }

        if use_witness {
            for input in &self.inputs {
                len += input.witness.as_ref().map_or(1, |w| w.serialized_len());
            }
        }
        len
    }

    // -----------------------------------------------------------------
    // Identification
    // -----------------------------------------------------------------

    /// Compute the transaction ID.
    ///
    /// The txid is the double SHA-256 of the witness-stripped
    /// serialization, so it is identical for the signed and unsigned
    /// forms of a segwit transaction.
    ///
    /// # Returns
    /// The txid as a `Hash` in internal byte order.
    pub fn txid(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes(0)))
    }

    /// Compute the witness transaction ID.
    ///
    /// The wtxid is the double SHA-256 of the full serialization
    /// including witness data. For a transaction without witnesses it
    /// equals the txid.
    ///
    /// # Returns
    /// The wtxid as a `Hash` in internal byte order.
    pub fn wtxid(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes(TX_FLAG_USE_WITNESS)))
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Check whether any input carries a witness stack.
    ///
    /// # Returns
    /// `true` if at least one input has a non-empty witness.
    pub fn has_witness(&self) -> bool {
        self.inputs
            .iter()
            .any(|i| i.witness.as_ref().is_some_and(|w| !w.is_empty()))
    }

    /// Check whether this is a coinbase transaction.
    ///
    /// # Returns
    /// `true` for a single input spending the all-zero outpoint with
    /// index `0xFFFFFFFF`.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_coinbase()
    }

    /// Compute the sum of all output satoshi values.
    ///
    /// # Returns
    /// The total, or `Overflow` if the sum wraps or exceeds the maximum
    /// money supply.
    pub fn total_output_satoshis(&self) -> Result<u64, TransactionError> {
        let mut total: u64 = 0;
        for output in &self.outputs {
            total = total
                .checked_add(output.satoshis)
                .ok_or(TransactionError::Overflow)?;
        }
        if total > MAX_MONEY {
            return Err(TransactionError::Overflow);
        }
        Ok(total)
    }

    /// Compute the transaction weight per BIP-141.
    ///
    /// Weight is three times the base (witness-stripped) size plus the
    /// total size.
    ///
    /// # Returns
    /// The weight in weight units.
    pub fn weight(&self) -> usize {
        let base = self.serialized_len(0);
        let total = self.serialized_len(TX_FLAG_USE_WITNESS);
        base * 3 + total
    }

    /// Compute the virtual size used for fee estimation.
    ///
    /// # Returns
    /// The weight divided by four, rounded up.
    pub fn vsize(&self) -> usize {
        (self.weight() + 3) / 4
    }

    // -----------------------------------------------------------------
    // Mutators
    // -----------------------------------------------------------------

    /// Append an input to this transaction.
    ///
    /// # Arguments
    /// * `input` - The input to add.
    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
    }

    /// Append an output to this transaction.
    ///
    /// # Arguments
    /// * `output` - The output to add.
    pub fn add_output(&mut self, output: TxOutput) {
        self.outputs.push(output);
    }

    /// Replace the scriptSig of the input at `index`.
    ///
    /// # Arguments
    /// * `index` - The input index.
    /// * `script_sig` - The new scriptSig, or `None` to clear it.
    ///
    /// # Returns
    /// `IndexOutOfRange` if the index does not exist; the transaction is
    /// unchanged in that case.
    pub fn set_input_script(
        &mut self,
        index: usize,
        script_sig: Option<crate::script::Script>,
    ) -> Result<(), TransactionError> {
        let len = self.inputs.len();
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(TransactionError::IndexOutOfRange { index, len })?;
        input.script_sig = script_sig;
        Ok(())
    }

    /// Replace the witness stack of the input at `index`.
    ///
    /// # Arguments
    /// * `index` - The input index.
    /// * `witness` - The new witness, or `None` to clear it.
    ///
    /// # Returns
    /// `IndexOutOfRange` if the index does not exist; the transaction is
    /// unchanged in that case.
    pub fn set_input_witness(
        &mut self,
        index: usize,
        witness: Option<Witness>,
    ) -> Result<(), TransactionError> {
        let len = self.inputs.len();
        let input = self
            .inputs
            .get_mut(index)
            .ok_or(TransactionError::IndexOutOfRange { index, len })?;
        input.witness = witness;
        Ok(())
    }
}
