//! Cardano wallet-side transaction construction.
//!
//! Ties the chain-state collaborators to the coin-selection solvers: a
//! `CreateTransactionTask` gathers fee parameters, the chain tip, spendable
//! outputs and a change address, then builds an unsigned transaction.

pub mod error;
pub mod chain;
pub mod utxo;
pub mod create_transaction;
pub mod inspect;

pub use chain::{ChainStateProvider, UtxoMap};
pub use create_transaction::{
    CreateTransactionOptions, CreateTransactionTask, Prerequisites, StepOutcome, TaskState,
    TX_VALIDITY_SLOTS,
};
pub use error::WalletError;
pub use inspect::{resolve_inputs, ResolvedInput};

use cardano_types::CardanoAddress;

/// Parse a user-supplied bech32 address.
pub fn parse_address(address: &str) -> Result<CardanoAddress, WalletError> {
    CardanoAddress::from_string(address).map_err(|e| WalletError::InvalidAddress(e.to_string()))
}
