//! Turning a fully signed PSBT into a broadcastable transaction.

use btck_transaction::script::OP_0;
use btck_transaction::{Script, Transaction, Witness};

use crate::input::PsbtInput;
use crate::psbt::Psbt;
use crate::template::{resolve, SpendKind, SpendPlan};
use crate::PsbtError;

impl Psbt {
    /// Whether every input carries its final scriptSig or witness.
    pub fn is_finalized(&self) -> bool {
        self.inputs.iter().all(PsbtInput::is_finalized)
    }

    /// Assemble final scriptSigs and witnesses from partial signatures.
    ///
    /// Each input is finalized independently. Multisig inputs take the
    /// first `threshold` signatures in script pubkey order. Once an
    /// input is final its partial signatures, scripts, keypaths, and
    /// sighash type are cleared; its UTXO fields stay.
    ///
    /// # Returns
    /// `Ok(())` once every input is final. `InsufficientSignatures` when
    /// an input lacks signatures or its spend template cannot be
    /// resolved; inputs finalized before the failing one keep their
    /// final form.
    pub fn finalize(&mut self) -> Result<(), PsbtError> {
        for index in 0..self.inputs.len() {
            if self.inputs[index].is_finalized() {
                continue;
            }
            let plan = resolve(&self.tx.inputs[index], &self.inputs[index])?
                .ok_or(PsbtError::InsufficientSignatures { input: index })?;
            finalize_input(&mut self.inputs[index], &plan, index)?;
        }
        Ok(())
    }

    /// Extract the signed transaction from a finalized PSBT.
    ///
    /// # Returns
    /// The network-ready transaction, or `NotFinalized` if any input is
    /// still missing its final scriptSig or witness.
    pub fn extract(&self) -> Result<Transaction, PsbtError> {
        if !self.is_finalized() {
            return Err(PsbtError::NotFinalized);
        }
        let mut tx = self.tx.clone();
        for (index, input) in self.inputs.iter().enumerate() {
            tx.set_input_script(index, input.final_script_sig.clone())?;
            tx.set_input_witness(index, input.final_witness.clone())?;
        }
        Ok(tx)
    }
}

/// Finalize one input in place according to its spend plan.
fn finalize_input(
    input: &mut PsbtInput,
    plan: &SpendPlan,
    index: usize,
) -> Result<(), PsbtError> {
    match &plan.kind {
        SpendKind::Pubkey { hash } => {
            let (pubkey, sig) = input
                .partial_sigs
                .iter()
                .find(|(pk, _)| btck_primitives::hash::hash160(pk) == *hash)
                .map(|(pk, sig)| (pk.to_vec(), sig.to_vec()))
                .ok_or(PsbtError::InsufficientSignatures { input: index })?;

            if plan.flags != 0 {
                input.final_witness = Some(Witness::from_items(vec![sig, pubkey]));
            } else {
                let mut script_sig = Script::new();
                script_sig.push_data(&sig);
                script_sig.push_data(&pubkey);
                input.final_script_sig = Some(script_sig);
            }
        }
        SpendKind::Multisig { threshold, pubkeys } => {
            let sigs: Vec<Vec<u8>> = pubkeys
                .iter()
                .filter_map(|pk| input.partial_sigs.get(pk))
                .take(*threshold)
                .map(|sig| sig.to_vec())
                .collect();
            if sigs.len() < *threshold {
                return Err(PsbtError::InsufficientSignatures { input: index });
            }

            if plan.flags != 0 {
                // CHECKMULTISIG pops one item too many; the stack leads
                // with an empty element to absorb it.
                let mut items = Vec::with_capacity(sigs.len() + 2);
                items.push(Vec::new());
                items.extend(sigs);
                items.push(plan.script_code.as_bytes().to_vec());
                input.final_witness = Some(Witness::from_items(items));
            } else {
                let mut script_sig = Script::new();
                script_sig.push_opcode(OP_0);
                for sig in &sigs {
                    script_sig.push_data(sig);
                }
                script_sig.push_data(plan.script_code.as_bytes());
                input.final_script_sig = Some(script_sig);
            }
        }
    }

    if let Some(ref redeem) = plan.p2sh_wrap {
        let mut script_sig = Script::new();
        script_sig.push_data(redeem.as_bytes());
        input.final_script_sig = Some(script_sig);
    }

    input.partial_sigs.clear();
    input.keypaths.clear();
    input.redeem_script = None;
    input.witness_script = None;
    input.sighash_type = None;
    Ok(())
}
