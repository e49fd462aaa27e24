//! Adding partial signatures to a PSBT.

use btck_primitives::bip32::HDKey;
use btck_primitives::ec::{PrivateKey, Signature};
use btck_transaction::sighash::{signature_hash, SIGHASH_ALL};

use crate::origin::KeyOrigin;
use crate::psbt::Psbt;
use crate::template::{resolve, SpendKind};
use crate::PsbtError;

impl Psbt {
    /// Sign every non-finalized input whose spend template involves the
    /// given key.
    ///
    /// The digest algorithm follows the template: legacy for P2PKH and
    /// P2SH multisig, BIP-143 for every witness form. The resulting DER
    /// signature, with the hashtype byte appended, is recorded under the
    /// compressed public key. Signing is deterministic (RFC 6979), so
    /// identical inputs always produce identical bytes. Inputs the key
    /// cannot sign are left untouched.
    ///
    /// # Arguments
    /// * `key` - The private key to sign with.
    ///
    /// # Returns
    /// The number of inputs signed; zero is a valid no-op. `Malformed`
    /// if recorded UTXO or script data contradicts the transaction, or
    /// if an input to be signed records a sighash type that does not
    /// fit the single hashtype byte.
    pub fn sign(&mut self, key: &PrivateKey) -> Result<usize, PsbtError> {
        let pubkey = key.public_key();
        let pubkey_bytes = pubkey.to_compressed().to_vec();
        let pubkey_hash = pubkey.hash160();
        let mut signed = 0;

        for index in 0..self.inputs.len() {
            if self.inputs[index].is_finalized() {
                continue;
            }
            let plan = match resolve(&self.tx.inputs[index], &self.inputs[index])? {
                Some(plan) => plan,
                None => continue,
            };

            let involved = match &plan.kind {
                SpendKind::Pubkey { hash } => *hash == pubkey_hash,
                SpendKind::Multisig { pubkeys, .. } => {
                    pubkeys.iter().any(|pk| *pk == pubkey_bytes)
                }
            };
            if !involved {
                continue;
            }

            // The digest commits to all four bytes, but the recorded
            // signature carries only one; wider values cannot be
            // represented and an explicit zero names no hash mode.
            let sighash_type = self.inputs[index].sighash_type.unwrap_or(SIGHASH_ALL);
            if sighash_type == 0 || sighash_type > 0xff {
                return Err(PsbtError::Malformed(format!(
                    "sighash type 0x{:08x} does not fit the hashtype byte",
                    sighash_type
                )));
            }
            let digest = signature_hash(
                &self.tx,
                index,
                plan.script_code.as_bytes(),
                plan.amount,
                sighash_type,
                plan.flags,
            )?;

            let mut sig = Signature::sign(&digest, key)?.to_der();
            sig.push(sighash_type as u8);
            self.inputs[index]
                .partial_sigs
                .insert(pubkey_bytes.clone(), sig);
            signed += 1;
        }
        Ok(signed)
    }

    /// Sign with every child of an extended key that the recorded key
    /// origins name.
    ///
    /// Each non-finalized input's key origins are walked: an origin
    /// whose fingerprint matches the extended key's master fingerprint
    /// has its path derived, and when the derived public key matches
    /// the one the origin is recorded under, the child key signs as
    /// [`Psbt::sign`] would. Origins the key cannot satisfy, including
    /// every origin when the master fingerprint is unknown, are
    /// skipped.
    ///
    /// # Arguments
    /// * `key` - The extended private key to derive signing keys from.
    ///
    /// # Returns
    /// The total number of inputs signed across all derived keys; zero
    /// is a valid no-op.
    pub fn sign_hd(&mut self, key: &HDKey) -> Result<usize, PsbtError> {
        let master_fingerprint = match key.master_fingerprint() {
            Some(fingerprint) => fingerprint,
            None => return Ok(0),
        };

        let mut children: Vec<PrivateKey> = Vec::new();
        for input in &self.inputs {
            if input.is_finalized() {
                continue;
            }
            for (pubkey, value) in input.keypaths.iter() {
                let origin = match KeyOrigin::from_bytes(value) {
                    Ok(origin) => origin,
                    Err(_) => continue,
                };
                if origin.fingerprint != master_fingerprint {
                    continue;
                }
                let child = match key.derive(&origin.path) {
                    Ok(child) => child,
                    Err(_) => continue,
                };
                if child.public_key().to_compressed()[..] != *pubkey {
                    continue;
                }
                if let Some(private) = child.private_key() {
                    if !children.contains(private) {
                        children.push(private.clone());
                    }
                }
            }
        }

        let mut signed = 0;
        for child in &children {
            signed += self.sign(child)?;
        }
        Ok(signed)
    }
}
