//! Chain-state values handed to the transaction engine.

use cardano_types::constants::TX_HASH_SIZE;
use cardano_types::{CardanoAddress, TokenBalances};
use serde::{Deserialize, Serialize};

/// Tip of the chain as seen by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestBlock {
    pub height: u64,
    pub slot: u64,
    pub epoch: u64,
}

/// An output observed on chain and not yet spent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    pub tx_hash: [u8; TX_HASH_SIZE],
    pub output_index: u32,
    /// Never zero.
    pub lovelace_amount: u64,
    pub tokens: TokenBalances,
    pub address: CardanoAddress,
}

impl UnspentOutput {
    pub fn tx_hash_hex(&self) -> String {
        hex::encode(self.tx_hash)
    }
}
