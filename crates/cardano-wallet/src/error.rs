//! Wallet error types.

use cardano_tx::TxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("RPC error: {0}")]
    Rpc(#[from] cardano_rpc::RpcError),

    #[error("transaction error: {0}")]
    Tx(#[source] TxError),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("amount {amount} is below the minimum output value {minimum}")]
    AmountTooSmall { amount: u64, minimum: u64 },

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<TxError> for WalletError {
    fn from(e: TxError) -> Self {
        match e {
            TxError::InsufficientBalance => WalletError::InsufficientBalance,
            other => WalletError::Tx(other),
        }
    }
}
