//! Turning observed UTxOs into transaction inputs.

use crate::chain::UtxoMap;
use cardano_rpc::UnspentOutput;
use cardano_tx::{Outpoint, TxInput};
use std::collections::BTreeSet;

pub fn outpoint_of(utxo: &UnspentOutput) -> Outpoint {
    Outpoint::new(utxo.tx_hash, utxo.output_index)
}

pub fn to_tx_input(utxo: &UnspentOutput) -> TxInput {
    TxInput::new(utxo.address.clone(), outpoint_of(utxo), utxo.lovelace_amount)
        .with_tokens(utxo.tokens.clone())
}

/// Every distinct UTxO in the map as an input, largest value first.
///
/// The same outpoint reported under two addresses is kept once. Ties in
/// value are broken by outpoint so the order never depends on map layout.
pub fn utxos_to_inputs(utxos: &UtxoMap) -> Vec<TxInput> {
    let mut seen = BTreeSet::new();
    let mut inputs: Vec<TxInput> = utxos
        .values()
        .flatten()
        .filter(|u| u.lovelace_amount > 0 && seen.insert(outpoint_of(u)))
        .map(to_tx_input)
        .collect();
    inputs.sort_by(|a, b| {
        b.utxo_value
            .cmp(&a.utxo_value)
            .then_with(|| a.utxo_outpoint.cmp(&b.utxo_outpoint))
    });
    inputs
}

/// Sum of lovelace over all distinct UTxOs, or `None` on overflow.
pub fn total_balance(utxos: &UtxoMap) -> Option<u64> {
    utxos_to_inputs(utxos)
        .iter()
        .try_fold(0u64, |acc, i| acc.checked_add(i.utxo_value))
}
