//! Transaction input referencing a previous output.

use btck_primitives::chainhash::Hash;
use btck_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::script::Script;
use crate::transaction::TX_FLAG_USE_WITNESS;
use crate::witness::Witness;
use crate::TransactionError;

/// Sequence number marking a finalized input (no relative lock time).
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// A single transaction input.
///
/// References an output of a previous transaction by its txid and output
/// index. The scriptSig and witness supply the data that satisfies the
/// referenced output's scriptPubKey; both are absent on an unsigned
/// input, and an absent script is distinct from a present-but-empty one.
///
/// # Wire format (non-witness portion)
///
/// | Field      | Size          |
/// |------------|---------------|
/// | prev_txid  | 32 bytes (LE) |
/// | vout       | 4 bytes (LE)  |
/// | scriptSig  | varint + data |
/// | sequence   | 4 bytes (LE)  |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    /// Txid of the output being spent, in internal (little-endian) order.
    pub prev_txid: Hash,

    /// Index of the output within the previous transaction.
    pub vout: u32,

    /// Sequence number. Defaults to `0xFFFFFFFF` (final).
    pub sequence: u32,

    /// The unlocking script (scriptSig). `None` when unsigned.
    pub script_sig: Option<Script>,

    /// The witness stack. `None` for non-segwit inputs.
    pub witness: Option<Witness>,
}

impl TxInput {
    /// Create an input spending the given outpoint with a final sequence
    /// and no scriptSig or witness.
    ///
    /// # Arguments
    /// * `prev_txid` - Txid of the output being spent.
    /// * `vout` - Output index within that transaction.
    ///
    /// # Returns
    /// A new unsigned `TxInput`.
    pub fn new(prev_txid: Hash, vout: u32) -> Self {
        TxInput {
            prev_txid,
            vout,
            sequence: SEQUENCE_FINAL,
            script_sig: None,
            witness: None,
        }
    }

    /// Report the feature flags of this input.
    ///
    /// # Returns
    /// `TX_FLAG_USE_WITNESS` if a witness stack is attached, else 0.
    pub fn features(&self) -> u32 {
        match &self.witness {
            Some(w) if !w.is_empty() => TX_FLAG_USE_WITNESS,
            _ => 0,
        }
    }

    /// Check whether this input spends the coinbase outpoint.
    ///
    /// # Returns
    /// `true` for an all-zero txid with output index `0xFFFFFFFF`.
    pub fn is_coinbase(&self) -> bool {
        self.prev_txid.is_zero() && self.vout == 0xFFFF_FFFF
    }

    /// Deserialize the non-witness portion of an input.
    ///
    /// A zero-length scriptSig on the wire decodes as `None`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// `Ok(TxInput)` on success, or a `SerializationError` if the data is
    /// truncated or malformed.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading prev txid: {}", e))
        })?;
        let prev_txid = Hash::from_bytes(txid_bytes)?;

        let vout = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading scriptSig: {}", e))
        })?;
        let script_sig = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        let sequence = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence: {}", e))
        })?;

        Ok(TxInput {
            prev_txid,
            vout,
            sequence,
            script_sig,
            witness: None,
        })
    }

    /// Serialize the non-witness portion of this input.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.prev_txid.as_bytes());
        writer.write_u32_le(self.vout);
        match &self.script_sig {
            Some(script) => writer.write_var_bytes(script.as_bytes()),
            None => writer.write_varint(VarInt(0)),
        }
        writer.write_u32_le(self.sequence);
    }

    /// Serialize this input with the scriptSig omitted.
    ///
    /// Used when building legacy signature preimages, where every input
    /// except the one being signed carries an empty script.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_cleared(&self, writer: &mut ByteWriter) {
        writer.write_bytes(self.prev_txid.as_bytes());
        writer.write_u32_le(self.vout);
        writer.write_varint(VarInt(0));
        writer.write_u32_le(self.sequence);
    }
}
