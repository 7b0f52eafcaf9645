//! Protocol fee parameters for a single epoch.

use serde::{Deserialize, Serialize};

/// Fee and minimum-value parameters, snapshotted once per construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochParameters {
    /// Lovelace per serialized transaction byte (`a`).
    pub min_fee_coefficient: u64,
    /// Flat lovelace added to every fee (`b`).
    pub min_fee_constant: u64,
    /// Lovelace per byte of a stored UTxO.
    pub coins_per_utxo_size: u64,
}

impl EpochParameters {
    pub fn new(min_fee_coefficient: u64, min_fee_constant: u64, coins_per_utxo_size: u64) -> Self {
        Self {
            min_fee_coefficient,
            min_fee_constant,
            coins_per_utxo_size,
        }
    }
}

impl Default for EpochParameters {
    /// Mainnet values since the Babbage hard fork.
    fn default() -> Self {
        Self::new(44, 155_381, 4_310)
    }
}
