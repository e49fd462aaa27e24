//! Spend template resolution shared by signing and finalization.

use btck_primitives::hash::sha256;
use btck_transaction::{Script, TxInput, TX_FLAG_USE_WITNESS};

use crate::input::PsbtInput;
use crate::PsbtError;

/// What the scriptPubKey (after unwrapping P2SH) demands.
pub(crate) enum SpendKind {
    /// Single key spend, legacy or witness. Holds the pubkey hash.
    Pubkey { hash: [u8; 20] },

    /// m-of-n CHECKMULTISIG spend.
    Multisig {
        threshold: usize,
        pubkeys: Vec<Vec<u8>>,
    },
}

/// How to sign and finalize one input, derived from its UTXO and the
/// scripts recorded in its map.
pub(crate) struct SpendPlan {
    /// The script the signature commits to.
    pub script_code: Script,

    /// Output value, committed by BIP-143 digests only.
    pub amount: u64,

    /// `TX_FLAG_USE_WITNESS` for BIP-143 digests, 0 for legacy.
    pub flags: u32,

    /// Redeem script to push as the final scriptSig for P2SH wrapping.
    pub p2sh_wrap: Option<Script>,

    pub kind: SpendKind,
}

/// Work out the spend plan for one input.
///
/// # Arguments
/// * `tx_input` - The input from the unsigned transaction.
/// * `input` - The corresponding PSBT input map.
///
/// # Returns
/// `Ok(Some(plan))` for a recognized template with all required pieces
/// present, `Ok(None)` when the template is unrecognized or a required
/// script or UTXO is missing, and `Malformed` when recorded data
/// contradicts itself (wrong UTXO txid, script hash mismatches).
pub(crate) fn resolve(
    tx_input: &TxInput,
    input: &PsbtInput,
) -> Result<Option<SpendPlan>, PsbtError> {
    let script_pubkey = match utxo_script(tx_input, input)? {
        Some(script) => script,
        None => return Ok(None),
    };

    if script_pubkey.is_p2pkh() {
        let hash = match script_pubkey.hash160_payload() {
            Some(hash) => hash,
            None => return Ok(None),
        };
        return Ok(Some(SpendPlan {
            script_code: script_pubkey,
            amount: 0,
            flags: 0,
            p2sh_wrap: None,
            kind: SpendKind::Pubkey { hash },
        }));
    }

    if script_pubkey.is_p2sh() {
        // Unwrap through the recorded redeem script.
        let hash = match script_pubkey.hash160_payload() {
            Some(hash) => hash,
            None => return Ok(None),
        };
        let redeem = match &input.redeem_script {
            Some(redeem) => redeem.clone(),
            None => return Ok(None),
        };
        if btck_primitives::hash::hash160(redeem.as_bytes()) != hash {
            return Err(PsbtError::Malformed(
                "redeem script does not hash to the scriptPubKey".to_string(),
            ));
        }

        if let Some(pubkey_hash) = witness_pubkey_hash(&redeem) {
            let amount = match input.witness_utxo {
                Some(ref utxo) => utxo.satoshis,
                None => return Ok(None),
            };
            return Ok(Some(SpendPlan {
                script_code: Script::p2pkh(&pubkey_hash),
                amount,
                flags: TX_FLAG_USE_WITNESS,
                p2sh_wrap: Some(redeem),
                kind: SpendKind::Pubkey { hash: pubkey_hash },
            }));
        }

        if redeem.is_p2wsh() {
            return witness_script_plan(input, &redeem, Some(redeem.clone()));
        }

        if let Some((threshold, pubkeys)) = redeem.multisig_info() {
            return Ok(Some(SpendPlan {
                script_code: redeem,
                amount: 0,
                flags: 0,
                p2sh_wrap: None,
                kind: SpendKind::Multisig { threshold, pubkeys },
            }));
        }
        return Ok(None);
    }

    if let Some(hash) = witness_pubkey_hash(&script_pubkey) {
        let amount = match input.witness_utxo {
            Some(ref utxo) => utxo.satoshis,
            None => return Ok(None),
        };
        return Ok(Some(SpendPlan {
            script_code: Script::p2pkh(&hash),
            amount,
            flags: TX_FLAG_USE_WITNESS,
            p2sh_wrap: None,
            kind: SpendKind::Pubkey { hash },
        }));
    }

    if script_pubkey.is_p2wsh() {
        return witness_script_plan(input, &script_pubkey, None);
    }

    Ok(None)
}

/// The scriptPubKey of the output this input spends.
///
/// Prefers the witness UTXO; falls back to the non-witness UTXO after
/// checking its txid against the input's outpoint.
fn utxo_script(
    tx_input: &TxInput,
    input: &PsbtInput,
) -> Result<Option<Script>, PsbtError> {
    if let Some(ref utxo) = input.witness_utxo {
        return Ok(Some(utxo.script_pubkey.clone()));
    }
    if let Some(ref prev_tx) = input.non_witness_utxo {
        if prev_tx.txid() != tx_input.prev_txid {
            return Err(PsbtError::Malformed(
                "non-witness utxo txid does not match the input outpoint".to_string(),
            ));
        }
        let output = prev_tx
            .outputs
            .get(tx_input.vout as usize)
            .ok_or_else(|| {
                PsbtError::Malformed("input outpoint index beyond utxo outputs".to_string())
            })?;
        return Ok(Some(output.script_pubkey.clone()));
    }
    Ok(None)
}

/// Build the plan for a P2WSH spend backed by a recorded witness script.
fn witness_script_plan(
    input: &PsbtInput,
    wrapper: &Script,
    p2sh_wrap: Option<Script>,
) -> Result<Option<SpendPlan>, PsbtError> {
    let witness_script = match &input.witness_script {
        Some(script) => script.clone(),
        None => return Ok(None),
    };
    let program = match wrapper.p2wsh_payload() {
        Some(program) => program,
        None => return Ok(None),
    };
    if sha256(witness_script.as_bytes()) != program {
        return Err(PsbtError::Malformed(
            "witness script does not hash to the witness program".to_string(),
        ));
    }
    let amount = match input.witness_utxo {
        Some(ref utxo) => utxo.satoshis,
        None => return Ok(None),
    };
    let kind = match witness_script.multisig_info() {
        Some((threshold, pubkeys)) => SpendKind::Multisig { threshold, pubkeys },
        None => return Ok(None),
    };
    Ok(Some(SpendPlan {
        script_code: witness_script,
        amount,
        flags: TX_FLAG_USE_WITNESS,
        p2sh_wrap,
        kind,
    }))
}

/// Extract the pubkey hash from a P2WPKH scriptPubKey.
fn witness_pubkey_hash(script: &Script) -> Option<[u8; 20]> {
    if !script.is_p2wpkh() {
        return None;
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script.as_bytes()[2..22]);
    Some(hash)
}
