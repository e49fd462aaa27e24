//! Bitcoin script type with standard output templates and classifiers.
//!
//! A `Script` wraps a byte vector. The templates and classifiers here
//! cover the output types the PSBT signer and finalizer understand:
//! P2PKH, P2SH, P2WPKH, P2WSH, and bare m-of-n multisig.

use std::fmt;

use crate::TransactionError;

// ---------------------------------------------------------------------------
// Opcodes
// ---------------------------------------------------------------------------

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKMULTISIG: u8 = 0xae;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    ///
    /// # Returns
    /// An empty `Script` instance.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw script bytes.
    ///
    /// # Returns
    /// A `Script` wrapping a copy of the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script`, or a `SerializationError` if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Ok(Script(bytes))
    }

    /// Encode the script as a lowercase hex string.
    ///
    /// # Returns
    /// The hex representation of the script bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Return a reference to the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the script length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the script is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a minimally-encoded data push to the script.
    ///
    /// Uses a direct length byte below 0x4c and OP_PUSHDATA1/2/4 above.
    ///
    /// # Arguments
    /// * `data` - The bytes to push.
    pub fn push_data(&mut self, data: &[u8]) {
        match data.len() {
            0..=0x4b => self.0.push(data.len() as u8),
            0x4c..=0xff => {
                self.0.push(OP_PUSHDATA1);
                self.0.push(data.len() as u8);
            }
            0x100..=0xffff => {
                self.0.push(OP_PUSHDATA2);
                self.0.extend_from_slice(&(data.len() as u16).to_le_bytes());
            }
            _ => {
                self.0.push(OP_PUSHDATA4);
                self.0.extend_from_slice(&(data.len() as u32).to_le_bytes());
            }
        }
        self.0.extend_from_slice(data);
    }

    /// Append a raw opcode byte to the script.
    ///
    /// # Arguments
    /// * `opcode` - The opcode to append.
    pub fn push_opcode(&mut self, opcode: u8) {
        self.0.push(opcode);
    }

    // -----------------------------------------------------------------------
    // Output templates
    // -----------------------------------------------------------------------

    /// Build a P2PKH locking script for a 20-byte public key hash.
    ///
    /// `OP_DUP OP_HASH160 <hash160> OP_EQUALVERIFY OP_CHECKSIG`
    ///
    /// # Arguments
    /// * `pubkey_hash` - Hash160 of the public key.
    ///
    /// # Returns
    /// The 25-byte P2PKH script.
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut script = Script::new();
        script.push_opcode(OP_DUP);
        script.push_opcode(OP_HASH160);
        script.push_data(pubkey_hash);
        script.push_opcode(OP_EQUALVERIFY);
        script.push_opcode(OP_CHECKSIG);
        script
    }

    /// Build a P2SH locking script for a 20-byte script hash.
    ///
    /// `OP_HASH160 <hash160> OP_EQUAL`
    ///
    /// # Arguments
    /// * `script_hash` - Hash160 of the redeem script.
    ///
    /// # Returns
    /// The 23-byte P2SH script.
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        let mut script = Script::new();
        script.push_opcode(OP_HASH160);
        script.push_data(script_hash);
        script.push_opcode(OP_EQUAL);
        script
    }

    /// Build a P2WPKH (segwit v0) locking script.
    ///
    /// `OP_0 <20-byte hash160>`
    ///
    /// # Arguments
    /// * `pubkey_hash` - Hash160 of the compressed public key.
    ///
    /// # Returns
    /// The 22-byte P2WPKH script.
    pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Self {
        let mut script = Script::new();
        script.push_opcode(OP_0);
        script.push_data(pubkey_hash);
        script
    }

    /// Build a P2WSH (segwit v0) locking script.
    ///
    /// `OP_0 <32-byte sha256>`
    ///
    /// # Arguments
    /// * `script_hash` - SHA-256 of the witness script.
    ///
    /// # Returns
    /// The 34-byte P2WSH script.
    pub fn p2wsh(script_hash: &[u8; 32]) -> Self {
        let mut script = Script::new();
        script.push_opcode(OP_0);
        script.push_data(script_hash);
        script
    }

    /// Build a bare m-of-n multisig script.
    ///
    /// `OP_m <pubkey>* OP_n OP_CHECKMULTISIG`
    ///
    /// # Arguments
    /// * `threshold` - Required signature count m (1..=16, at most n).
    /// * `pubkeys` - The n public keys (1..=16), in order.
    ///
    /// # Returns
    /// The multisig script, or a `SerializationError` for an invalid
    /// threshold or key count.
    pub fn multisig(threshold: usize, pubkeys: &[Vec<u8>]) -> Result<Self, TransactionError> {
        if pubkeys.is_empty() || pubkeys.len() > 16 {
            return Err(TransactionError::SerializationError(format!(
                "multisig key count {} out of range",
                pubkeys.len()
            )));
        }
        if threshold == 0 || threshold > pubkeys.len() {
            return Err(TransactionError::SerializationError(format!(
                "multisig threshold {} out of range for {} keys",
                threshold,
                pubkeys.len()
            )));
        }
        let mut script = Script::new();
        script.push_opcode(OP_1 + (threshold as u8 - 1));
        for key in pubkeys {
            script.push_data(key);
        }
        script.push_opcode(OP_1 + (pubkeys.len() as u8 - 1));
        script.push_opcode(OP_CHECKMULTISIG);
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Classifiers
    // -----------------------------------------------------------------------

    /// Check whether this is a P2PKH locking script.
    pub fn is_p2pkh(&self) -> bool {
        self.0.len() == 25
            && self.0[0] == OP_DUP
            && self.0[1] == OP_HASH160
            && self.0[2] == 20
            && self.0[23] == OP_EQUALVERIFY
            && self.0[24] == OP_CHECKSIG
    }

    /// Check whether this is a P2SH locking script.
    pub fn is_p2sh(&self) -> bool {
        self.0.len() == 23
            && self.0[0] == OP_HASH160
            && self.0[1] == 20
            && self.0[22] == OP_EQUAL
    }

    /// Check whether this is a P2WPKH (segwit v0) locking script.
    pub fn is_p2wpkh(&self) -> bool {
        self.0.len() == 22 && self.0[0] == OP_0 && self.0[1] == 20
    }

    /// Check whether this is a P2WSH (segwit v0) locking script.
    pub fn is_p2wsh(&self) -> bool {
        self.0.len() == 34 && self.0[0] == OP_0 && self.0[1] == 32
    }

    /// Extract the 20-byte hash payload of a P2PKH, P2SH, or P2WPKH script.
    ///
    /// # Returns
    /// `Some(hash)` for a recognized 20-byte-hash template, else `None`.
    pub fn hash160_payload(&self) -> Option<[u8; 20]> {
        let slice = if self.is_p2pkh() {
            &self.0[3..23]
        } else if self.is_p2sh() {
            &self.0[2..22]
        } else if self.is_p2wpkh() {
            &self.0[2..22]
        } else {
            return None;
        };
        let mut out = [0u8; 20];
        out.copy_from_slice(slice);
        Some(out)
    }

    /// Extract the 32-byte program of a P2WSH script.
    ///
    /// # Returns
    /// `Some(hash)` for a P2WSH script, else `None`.
    pub fn p2wsh_payload(&self) -> Option<[u8; 32]> {
        if !self.is_p2wsh() {
            return None;
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&self.0[2..34]);
        Some(out)
    }

    /// Parse this script as a bare m-of-n multisig template.
    ///
    /// Recognizes `OP_m <pubkey>* OP_n OP_CHECKMULTISIG` where every key
    /// is a direct push of 33 or 65 bytes.
    ///
    /// # Returns
    /// `Some((threshold, pubkeys))` if the script matches, else `None`.
    pub fn multisig_info(&self) -> Option<(usize, Vec<Vec<u8>>)> {
        let bytes = &self.0;
        if bytes.len() < 4 || bytes[bytes.len() - 1] != OP_CHECKMULTISIG {
            return None;
        }
        let m_op = bytes[0];
        let n_op = bytes[bytes.len() - 2];
        if !(OP_1..=OP_16).contains(&m_op) || !(OP_1..=OP_16).contains(&n_op) {
            return None;
        }
        let threshold = (m_op - OP_1 + 1) as usize;
        let key_count = (n_op - OP_1 + 1) as usize;
        if threshold > key_count {
            return None;
        }

        let mut keys = Vec::with_capacity(key_count);
        let mut pos = 1;
        while pos < bytes.len() - 2 {
            let push_len = bytes[pos] as usize;
            if push_len != 33 && push_len != 65 {
                return None;
            }
            pos += 1;
            if pos + push_len > bytes.len() - 2 {
                return None;
            }
            keys.push(bytes[pos..pos + push_len].to_vec());
            pos += push_len;
        }
        if keys.len() != key_count {
            return None;
        }
        Some((threshold, keys))
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
