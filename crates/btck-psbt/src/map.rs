//! Insertion-ordered byte-keyed map used throughout the PSBT format.

use btck_primitives::util::{varint_length, ByteReader, ByteWriter};

use crate::PsbtError;

/// A map from byte-string keys to byte-string values.
///
/// Entries keep the order they were inserted in, which the PSBT encoding
/// relies on for byte-exact round trips. Keys are unique by exact byte
/// comparison.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct KeyValueMap {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl KeyValueMap {
    /// Create an empty map.
    pub fn new() -> Self {
        KeyValueMap {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the value for an exact key.
    ///
    /// # Arguments
    /// * `key` - The key bytes.
    ///
    /// # Returns
    /// The value slice, or `None` if the key is absent.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Check whether a key is present.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert a key-value pair, replacing the value if the key exists.
    ///
    /// A replaced entry keeps its original position; a new entry is
    /// appended.
    ///
    /// # Arguments
    /// * `key` - The key bytes.
    /// * `value` - The value bytes.
    pub fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert a key-value pair only if the key is not already present.
    ///
    /// # Arguments
    /// * `key` - The key bytes.
    /// * `value` - The value bytes.
    ///
    /// # Returns
    /// `true` if the entry was inserted, `false` if the key existed.
    pub fn insert_new(&mut self, key: Vec<u8>, value: Vec<u8>) -> bool {
        if self.contains_key(&key) {
            return false;
        }
        self.entries.push((key, value));
        true
    }

    /// Remove an entry by exact key.
    ///
    /// # Arguments
    /// * `key` - The key bytes.
    ///
    /// # Returns
    /// The removed value, or `None` if the key was absent.
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// Write one key-value pair in PSBT wire form.
///
/// Both key and value carry a compact-size length prefix.
pub(crate) fn write_entry(writer: &mut ByteWriter, key: &[u8], value: &[u8]) {
    writer.write_var_bytes(key);
    writer.write_var_bytes(value);
}

/// The encoded size of one key-value pair.
pub(crate) fn entry_len(key_len: usize, value_len: usize) -> usize {
    varint_length(key_len as u64) + key_len + varint_length(value_len as u64) + value_len
}

/// Read key-value pairs up to and including the map separator.
///
/// # Arguments
/// * `reader` - The reader positioned at the first key length.
///
/// # Returns
/// The entries in file order, or `Malformed` if the data ends before
/// the separator.
pub(crate) fn read_entries(
    reader: &mut ByteReader,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>, PsbtError> {
    let mut entries = Vec::new();
    loop {
        let key_len = reader
            .read_varint()
            .map_err(|_| PsbtError::Malformed("unterminated map".to_string()))?;
        if key_len.value() == 0 {
            return Ok(entries);
        }
        let key = reader
            .read_bytes(key_len.value() as usize)
            .map_err(|_| PsbtError::Malformed("truncated map key".to_string()))?
            .to_vec();
        let value = reader
            .read_var_bytes()
            .map_err(|_| PsbtError::Malformed("truncated map value".to_string()))?
            .to_vec();
        entries.push((key, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut map = KeyValueMap::new();
        map.insert(vec![0x03], vec![1]);
        map.insert(vec![0x01], vec![2]);
        map.insert(vec![0x02], vec![3]);

        let keys: Vec<_> = map.iter().map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys, vec![vec![0x03], vec![0x01], vec![0x02]]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = KeyValueMap::new();
        map.insert(vec![0xaa], vec![1]);
        map.insert(vec![0xbb], vec![2]);
        map.insert(vec![0xaa], vec![9]);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&[0xaa]), Some(&[9u8][..]));
        let keys: Vec<_> = map.iter().map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys[0], vec![0xaa]);
    }

    #[test]
    fn test_insert_new_rejects_duplicates() {
        let mut map = KeyValueMap::new();
        assert!(map.insert_new(vec![0x01, 0x02], vec![]));
        assert!(!map.insert_new(vec![0x01, 0x02], vec![0xff]));
        assert_eq!(map.get(&[0x01, 0x02]), Some(&[][..]));
    }

    #[test]
    fn test_remove() {
        let mut map = KeyValueMap::new();
        map.insert(vec![0x01], vec![5]);
        assert_eq!(map.remove(&[0x01]), Some(vec![5]));
        assert_eq!(map.remove(&[0x01]), None);
        assert!(map.is_empty());
    }
}
