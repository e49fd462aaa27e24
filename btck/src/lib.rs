#![deny(missing_docs)]

//! Bitcoin primitives toolkit - complete crate.
//!
//! Re-exports all toolkit components for convenient single-crate usage.

pub use btck_primitives as primitives;
pub use btck_psbt as psbt;
pub use btck_transaction as transaction;
