//! Cardano transaction construction.
//!
//! Provides the in-memory transaction model, a byte-exact CBOR codec, fee
//! and minimum-value arithmetic, and two coin-selection solvers: a
//! randomized knapsack search for normal sends and a deterministic solver
//! for sending the whole balance.

pub mod transaction;
pub mod serializer;
pub mod deserializer;
pub mod sign;
pub mod fee;
pub mod knapsack;
pub mod max_send;

#[cfg(test)]
mod test_support;

pub use transaction::{CardanoTransaction, Outpoint, TxInput, TxOutput, TxOutputType, TxWitness};
pub use serializer::{CardanoSerializer, SerializerOptions, WitnessSetMode};
pub use deserializer::{deserialize_transaction, RestrictedOutput, RestrictedTransaction};
pub use fee::{calc_min_output_value, calc_min_transaction_fee, min_fee, validate_amounts};
pub use knapsack::{KnapsackSolver, SelectionConfig, TrialState, KNAPSACK_ITERATIONS};
pub use max_send::{MaxSendSolver, MAX_SEND_ITERATIONS};
pub use sign::apply_signatures;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("invalid transaction: {0}")]
    Invalid(String),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("internal error: {0}")]
    Internal(String),
}
