//! Bitcoin transaction model with legacy and segwit serialization,
//! script templates, and signature hash computation.

pub mod input;
pub mod output;
pub mod script;
pub mod sighash;
pub mod transaction;
pub mod witness;

mod error;
pub use error::TransactionError;
pub use input::TxInput;
pub use output::TxOutput;
pub use script::Script;
pub use transaction::{Transaction, MAX_MONEY, TX_FLAG_USE_WITNESS};
pub use witness::Witness;
