//! Fundamental types for Concord.
//!
//! This crate defines the types shared by every other crate in the workspace:
//! transaction and node identities, the transaction capability trait, and the
//! avalanche parameters that drive position updates on disputed transactions.

pub mod error;
pub mod hash;
pub mod node;
pub mod params;
pub mod transaction;

pub use error::{IdError, ParamsError};
pub use hash::TxId;
pub use node::NodeId;
pub use params::{AvalancheParams, RoundPhase};
pub use transaction::{RawTransaction, Transaction};
