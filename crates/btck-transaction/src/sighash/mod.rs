//! Signature hash computation for transaction signing.
//!
//! Two digest algorithms are supported. The legacy algorithm serializes
//! a modified copy of the transaction with scriptSigs substituted. The
//! BIP-143 algorithm, selected by `TX_FLAG_USE_WITNESS`, commits to the
//! amount being spent and hashes prevouts, sequences, and outputs once.

use btck_primitives::hash::sha256d;
use btck_primitives::util::{ByteWriter, VarInt};

use crate::transaction::{Transaction, TX_FLAG_USE_WITNESS};
use crate::TransactionError;

// -----------------------------------------------------------------------
// Sighash flag constants
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output at the signed input's index.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with a base type: commit only to the signed input, allowing
/// other inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask extracting the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Compute the signature hash for one input of a transaction.
///
/// With `TX_FLAG_USE_WITNESS` in `flags` the BIP-143 digest is used;
/// otherwise the legacy digest. `script_code` is the script being
/// satisfied: the scriptPubKey for P2PKH, the redeem or witness script
/// for script-hash spends, or the P2PKH-style script for P2WPKH.
///
/// # Arguments
/// * `tx` - The transaction being signed.
/// * `input_index` - Index of the input being signed.
/// * `script_code` - The script committed to by the signature.
/// * `satoshis` - Value of the output being spent (BIP-143 only).
/// * `sighash_type` - Combined sighash flags (e.g. `SIGHASH_ALL`).
/// * `flags` - `TX_FLAG_USE_WITNESS` to select the BIP-143 digest.
///
/// # Returns
/// The 32-byte double-SHA-256 digest, or `IndexOutOfRange` for a bad
/// input index.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    satoshis: u64,
    sighash_type: u32,
    flags: u32,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::IndexOutOfRange {
            index: input_index,
            len: tx.inputs.len(),
        });
    }

    if flags & TX_FLAG_USE_WITNESS != 0 {
        Ok(sha256d(&segwit_preimage(
            tx,
            input_index,
            script_code,
            satoshis,
            sighash_type,
        )))
    } else {
        Ok(legacy_hash(tx, input_index, script_code, sighash_type))
    }
}

// -----------------------------------------------------------------------
// Legacy digest
// -----------------------------------------------------------------------

/// The digest defined for SIGHASH_SINGLE with no matching output:
/// the number one, serialized as a 32-byte little-endian integer.
const ONE_DIGEST: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

fn legacy_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
) -> [u8; 32] {
    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    // SIGHASH_SINGLE with no corresponding output hashes to the
    // constant one, not a serialization.
    if base_type == SIGHASH_SINGLE && input_index >= tx.outputs.len() {
        return ONE_DIGEST;
    }

    let mut writer = ByteWriter::with_capacity(256);
    writer.write_u32_le(tx.version);

    // Inputs, with scriptSigs substituted.
    if anyone_can_pay {
        writer.write_varint(VarInt(1));
        write_signing_input(&mut writer, tx, input_index, input_index, script_code, base_type);
    } else {
        writer.write_varint(VarInt::from(tx.inputs.len()));
        for index in 0..tx.inputs.len() {
            write_signing_input(&mut writer, tx, index, input_index, script_code, base_type);
        }
    }

    // Outputs, trimmed by base type.
    match base_type {
        SIGHASH_NONE => {
            writer.write_varint(VarInt(0));
        }
        SIGHASH_SINGLE => {
            writer.write_varint(VarInt::from(input_index + 1));
            // Preceding outputs are blanked: max value, empty script.
            for _ in 0..input_index {
                writer.write_u64_le(u64::MAX);
                writer.write_varint(VarInt(0));
            }
            writer.write_bytes(&tx.outputs[input_index].to_bytes());
        }
        _ => {
            writer.write_varint(VarInt::from(tx.outputs.len()));
            for output in &tx.outputs {
                writer.write_bytes(&output.to_bytes());
            }
        }
    }

    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);
    sha256d(writer.as_bytes())
}

/// Write one input of the legacy preimage.
///
/// The signed input carries the script code; all others carry an empty
/// script, and for NONE/SINGLE a zero sequence as well.
fn write_signing_input(
    writer: &mut ByteWriter,
    tx: &Transaction,
    index: usize,
    signing_index: usize,
    script_code: &[u8],
    base_type: u32,
) {
    let input = &tx.inputs[index];
    writer.write_bytes(input.prev_txid.as_bytes());
    writer.write_u32_le(input.vout);

    if index == signing_index {
        writer.write_var_bytes(script_code);
        writer.write_u32_le(input.sequence);
    } else {
        writer.write_varint(VarInt(0));
        let sequence = if base_type == SIGHASH_NONE || base_type == SIGHASH_SINGLE {
            0
        } else {
            input.sequence
        };
        writer.write_u32_le(sequence);
    }
}

// -----------------------------------------------------------------------
// BIP-143 digest
// -----------------------------------------------------------------------

/// Build the BIP-143 preimage for one input.
///
/// Layout: version, hashPrevouts, hashSequence, outpoint, scriptCode,
/// amount, sequence, hashOutputs, lock time, sighash type.
fn segwit_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    satoshis: u64,
    sighash_type: u32,
) -> Vec<u8> {
    let input = &tx.inputs[input_index];
    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let hash_prevouts = if !anyone_can_pay {
        prevouts_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_sequence = if !anyone_can_pay
        && base_type != SIGHASH_SINGLE
        && base_type != SIGHASH_NONE
    {
        sequences_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        outputs_hash(tx, None)
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        outputs_hash(tx, Some(input_index))
    } else {
        [0u8; 32]
    };

    let mut writer = ByteWriter::with_capacity(200 + script_code.len());
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    writer.write_bytes(input.prev_txid.as_bytes());
    writer.write_u32_le(input.vout);
    writer.write_var_bytes(script_code);
    writer.write_u64_le(satoshis);
    writer.write_u32_le(input.sequence);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);
    writer.into_bytes()
}

/// Double SHA-256 of all input outpoints concatenated.
fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        writer.write_bytes(input.prev_txid.as_bytes());
        writer.write_u32_le(input.vout);
    }
    sha256d(writer.as_bytes())
}

/// Double SHA-256 of all input sequence numbers concatenated.
fn sequences_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence);
    }
    sha256d(writer.as_bytes())
}

/// Double SHA-256 of serialized outputs.
///
/// `Some(n)` restricts the hash to the output at index `n` (used for
/// SIGHASH_SINGLE); `None` includes every output.
fn outputs_hash(tx: &Transaction, n: Option<usize>) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    match n {
        None => {
            for output in &tx.outputs {
                writer.write_bytes(&output.to_bytes());
            }
        }
        Some(index) => writer.write_bytes(&tx.outputs[index].to_bytes()),
    }
    sha256d(writer.as_bytes())
}
