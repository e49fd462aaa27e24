//! Segwit witness stack for a transaction input.

use btck_primitives::util::{ByteReader, ByteWriter};

use crate::TransactionError;

/// An ordered stack of witness items attached to one input.
///
/// # Wire format
///
/// `varint(item count) ‖ (varint(item length) ‖ item bytes)*`
///
/// Item order is preserved exactly as given; for P2WPKH spends the stack
/// is `[signature, pubkey]`.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Witness {
    items: Vec<Vec<u8>>,
}

impl Witness {
    /// Create a new empty witness stack.
    pub fn new() -> Self {
        Witness { items: Vec::new() }
    }

    /// Create a witness stack from a list of items.
    ///
    /// # Arguments
    /// * `items` - The witness items, bottom of the stack first.
    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Witness { items }
    }

    /// Append an item to the top of the stack.
    ///
    /// # Arguments
    /// * `item` - The item bytes.
    pub fn push(&mut self, item: Vec<u8>) {
        self.items.push(item);
    }

    /// Return the witness items in order.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    /// Return the number of items on the stack.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check whether the stack has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Deserialize a witness stack from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - The reader positioned at the varint item count.
    ///
    /// # Returns
    /// `Ok(Witness)` on success, or a `SerializationError` if the data
    /// is truncated or an item length exceeds the remaining bytes.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading witness count: {}", e))
        })?;
        if count.value() > reader.remaining() as u64 {
            return Err(TransactionError::SerializationError(format!(
                "witness count {} exceeds remaining data",
                count.value()
            )));
        }

        let mut items = Vec::with_capacity(count.value() as usize);
        for _ in 0..count.value() {
            let item = reader.read_var_bytes().map_err(|e| {
                TransactionError::SerializationError(format!("reading witness item: {}", e))
            })?;
            items.push(item.to_vec());
        }
        Ok(Witness { items })
    }

    /// Serialize this witness stack into a `ByteWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_varint(self.items.len().into());
        for item in &self.items {
            writer.write_var_bytes(item);
        }
    }

    /// Return the serialized byte length of this stack.
    ///
    /// # Returns
    /// The wire-format size including all varint prefixes.
    pub fn serialized_len(&self) -> usize {
        let mut len = btck_primitives::util::varint_length(self.items.len() as u64);
        for item in &self.items {
            len += btck_primitives::util::varint_length(item.len() as u64) + item.len();
        }
        len
    }
}
