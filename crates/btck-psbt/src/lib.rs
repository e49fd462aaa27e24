//! Partially signed Bitcoin transactions (BIP-174).
//!
//! A [`Psbt`] wraps an unsigned transaction together with one metadata
//! map per input and output. Signers call [`Psbt::sign`] to add partial
//! signatures for the templates they recognize (P2PKH, P2SH multisig,
//! P2WPKH, P2WSH multisig, and their P2SH-wrapped forms), then
//! [`Psbt::finalize`] assembles the final scriptSigs and witnesses and
//! [`Psbt::extract`] yields the broadcastable transaction. Serialized
//! PSBTs round-trip byte for byte, unknown keys included.

pub mod input;
pub mod map;
pub mod origin;
pub mod output;
pub mod psbt;

mod error;
mod finalize;
mod sign;
mod template;

pub use error::PsbtError;
pub use input::PsbtInput;
pub use map::KeyValueMap;
pub use origin::KeyOrigin;
pub use output::PsbtOutput;
pub use psbt::{Psbt, PSBT_CLONE_FLAG_OMIT_NON_WITNESS_UTXO, PSBT_MAGIC};
