//! Chain state read from a JSON file instead of a live provider.
//!
//! The file holds raw Blockfrost responses, so a snapshot can be captured
//! with `curl` and replayed offline:
//!
//! ```json
//! {
//!   "epoch_parameters": { "min_fee_a": 44, "min_fee_b": 155381, "coins_per_utxo_size": "4310" },
//!   "latest_block": { "height": 11000000, "slot": 149763236, "epoch": 505 },
//!   "utxos": { "addr1...": [ { "address": "addr1...", "tx_hash": "...", "output_index": 0,
//!                              "amount": [ { "unit": "lovelace", "quantity": "5000000" } ] } ] },
//!   "change_address": "addr1..."
//! }
//! ```

use cardano_rpc::blockfrost::{parse_epoch_parameters, parse_latest_block, parse_utxos};
use cardano_rpc::{EpochParameters, LatestBlock, RpcError};
use cardano_types::CardanoAddress;
use cardano_wallet::{ChainStateProvider, UtxoMap};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Snapshot {
    epoch_parameters: Value,
    latest_block: Value,
    #[serde(default)]
    utxos: BTreeMap<String, Value>,
    change_address: String,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("reading {}: {}", path.display(), e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Every address the snapshot holds outputs for.
    pub fn addresses(&self) -> Result<Vec<CardanoAddress>, RpcError> {
        self.utxos
            .keys()
            .map(|a| {
                CardanoAddress::from_string(a)
                    .map_err(|e| RpcError::InvalidResponse(format!("snapshot address {}: {}", a, e)))
            })
            .collect()
    }
}

impl ChainStateProvider for Snapshot {
    async fn get_latest_epoch_parameters(&self) -> Result<EpochParameters, RpcError> {
        parse_epoch_parameters(&self.epoch_parameters)
    }

    async fn get_latest_block(&self) -> Result<LatestBlock, RpcError> {
        parse_latest_block(&self.latest_block)
    }

    async fn get_utxos(&self, addresses: &[CardanoAddress]) -> Result<UtxoMap, RpcError> {
        let mut map = UtxoMap::new();
        for address in addresses {
            let utxos = match self.utxos.get(&address.to_string()) {
                Some(page) => parse_utxos(page)?,
                None => Vec::new(),
            };
            map.insert(address.clone(), utxos);
        }
        Ok(map)
    }

    async fn discover_next_unused_change_address(&self) -> Result<CardanoAddress, RpcError> {
        CardanoAddress::from_string(&self.change_address)
            .map_err(|e| RpcError::InvalidResponse(format!("change address: {}", e)))
    }
}
