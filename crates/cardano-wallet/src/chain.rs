//! What the engine needs from whoever tracks chain state.

use cardano_rpc::{EpochParameters, LatestBlock, RpcError, UnspentOutput};
use cardano_types::CardanoAddress;
use std::collections::BTreeMap;

/// Unspent outputs grouped by owning address.
pub type UtxoMap = BTreeMap<CardanoAddress, Vec<UnspentOutput>>;

/// Chain-state queries used while building a transaction.
///
/// Implementations own transport, caching and retries. Every address passed
/// to `get_utxos` appears in the result; one with no outputs maps to an
/// empty list.
#[allow(async_fn_in_trait)]
pub trait ChainStateProvider {
    async fn get_latest_epoch_parameters(&self) -> Result<EpochParameters, RpcError>;

    async fn get_latest_block(&self) -> Result<LatestBlock, RpcError>;

    async fn get_utxos(&self, addresses: &[CardanoAddress]) -> Result<UtxoMap, RpcError>;

    async fn discover_next_unused_change_address(&self) -> Result<CardanoAddress, RpcError>;
}
