//! Transaction output with satoshi value and scriptPubKey.

use btck_primitives::util::{ByteReader, ByteWriter};

use crate::script::Script;
use crate::TransactionError;

/// A single transaction output.
///
/// # Wire format
///
/// | Field         | Size          |
/// |---------------|---------------|
/// | satoshis      | 8 bytes (LE)  |
/// | scriptPubKey  | varint + data |
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TxOutput {
    /// The number of satoshis locked by this output.
    pub satoshis: u64,

    /// The locking script (scriptPubKey) defining spending conditions.
    pub script_pubkey: Script,
}

impl TxOutput {
    /// Create an output with the given value and locking script.
    ///
    /// # Arguments
    /// * `satoshis` - The output value.
    /// * `script_pubkey` - The locking script.
    ///
    /// # Returns
    /// A new `TxOutput`.
    pub fn new(satoshis: u64, script_pubkey: Script) -> Self {
        TxOutput {
            satoshis,
            script_pubkey,
        }
    }

    /// Deserialize a `TxOutput` from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// `Ok(TxOutput)` on success, or a `SerializationError` if the data
    /// is truncated or malformed.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let satoshis = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading satoshis: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::SerializationError(format!("reading scriptPubKey: {}", e))
        })?;

        Ok(TxOutput {
            satoshis,
            script_pubkey: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this `TxOutput` into a `ByteWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.satoshis);
        writer.write_var_bytes(self.script_pubkey.as_bytes());
    }

    /// Serialize this output to a byte vector.
    ///
    /// # Returns
    /// The wire-format bytes, also used in sighash computation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}
