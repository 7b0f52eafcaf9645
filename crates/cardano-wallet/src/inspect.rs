//! Resolving decoded inputs against the wallet's own UTxOs.
//!
//! A transaction handed in for signing only names its inputs by outpoint.
//! Filling in address and value for the ones this wallet owns lets a caller
//! show what is actually being spent.

use crate::chain::UtxoMap;
use crate::utxo::outpoint_of;
use cardano_rpc::UnspentOutput;
use cardano_tx::{Outpoint, RestrictedTransaction};
use cardano_types::{CardanoAddress, TokenBalances};
use std::collections::BTreeMap;

/// A decoded input, with owner and value when the wallet knows them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub outpoint: Outpoint,
    pub address: Option<CardanoAddress>,
    pub value: Option<u64>,
    pub tokens: TokenBalances,
}

impl ResolvedInput {
    pub fn is_owned(&self) -> bool {
        self.address.is_some()
    }
}

pub fn resolve_inputs(tx: &RestrictedTransaction, utxos: &UtxoMap) -> Vec<ResolvedInput> {
    let known: BTreeMap<Outpoint, &UnspentOutput> = utxos
        .values()
        .flatten()
        .map(|u| (outpoint_of(u), u))
        .collect();

    tx.inputs
        .iter()
        .map(|outpoint| match known.get(outpoint) {
            Some(utxo) => ResolvedInput {
                outpoint: *outpoint,
                address: Some(utxo.address.clone()),
                value: Some(utxo.lovelace_amount),
                tokens: utxo.tokens.clone(),
            },
            None => ResolvedInput {
                outpoint: *outpoint,
                address: None,
                value: None,
                tokens: TokenBalances::new(),
            },
        })
        .collect()
}
