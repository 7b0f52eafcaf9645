//! In-memory transaction model.
//!
//! A `CardanoTransaction` is mutated in place by the solvers while it is
//! being built, then handed to a signer. Fee is never stored: it is always
//! `sum(inputs) - sum(outputs)`.

use cardano_types::constants::{PUBKEY_SIZE, SIGNATURE_SIZE, TX_HASH_SIZE};
use cardano_types::token::{add_token_balances, TokenBalances};
use cardano_types::CardanoAddress;
use serde::{Deserialize, Serialize};

/// Reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    #[serde(with = "hex_txid")]
    pub txid: [u8; TX_HASH_SIZE],
    pub index: u32,
}

impl Outpoint {
    pub fn new(txid: [u8; TX_HASH_SIZE], index: u32) -> Self {
        Self { txid, index }
    }
}

impl std::fmt::Display for Outpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", hex::encode(self.txid), self.index)
    }
}

mod hex_txid {
    use super::TX_HASH_SIZE;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(txid: &[u8; TX_HASH_SIZE], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(txid))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; TX_HASH_SIZE], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("txid must be 32 bytes"))
    }
}

/// A spendable output selected as an input. The value is copied from the
/// observed UTxO and is never zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInput {
    pub utxo_address: CardanoAddress,
    pub utxo_outpoint: Outpoint,
    pub utxo_value: u64,
    pub utxo_tokens: TokenBalances,
}

impl TxInput {
    pub fn new(utxo_address: CardanoAddress, utxo_outpoint: Outpoint, utxo_value: u64) -> Self {
        Self {
            utxo_address,
            utxo_outpoint,
            utxo_value,
            utxo_tokens: TokenBalances::new(),
        }
    }

    pub fn with_tokens(mut self, tokens: TokenBalances) -> Self {
        self.utxo_tokens = tokens;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutputType {
    Target,
    Change,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutput {
    pub output_type: TxOutputType,
    pub address: CardanoAddress,
    pub amount: u64,
    pub tokens: TokenBalances,
}

impl TxOutput {
    pub fn target(address: CardanoAddress, amount: u64) -> Self {
        Self {
            output_type: TxOutputType::Target,
            address,
            amount,
            tokens: TokenBalances::new(),
        }
    }

    pub fn change(address: CardanoAddress) -> Self {
        Self {
            output_type: TxOutputType::Change,
            address,
            amount: 0,
            tokens: TokenBalances::new(),
        }
    }

    pub fn is_change(&self) -> bool {
        self.output_type == TxOutputType::Change
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxWitness {
    pub public_key: [u8; PUBKEY_SIZE],
    pub signature: [u8; SIGNATURE_SIZE],
}

impl TxWitness {
    pub fn new(public_key: [u8; PUBKEY_SIZE], signature: [u8; SIGNATURE_SIZE]) -> Self {
        Self {
            public_key,
            signature,
        }
    }

    /// All-zero witness with the exact length of a real one.
    pub fn dummy() -> Self {
        Self::new([0u8; PUBKEY_SIZE], [0u8; SIGNATURE_SIZE])
    }
}

/// A transaction under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardanoTransaction {
    inputs: Vec<TxInput>,
    outputs: Vec<TxOutput>,
    witnesses: Vec<TxWitness>,
    invalid_after: u64,
    to: Option<CardanoAddress>,
    amount: u64,
    sending_max_amount: bool,
}

impl Default for CardanoTransaction {
    fn default() -> Self {
        Self::new()
    }
}

impl CardanoTransaction {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            witnesses: Vec::new(),
            invalid_after: 0,
            to: None,
            amount: 0,
            sending_max_amount: false,
        }
    }

    // ── request echo ────────────────────────────────────────────────────────

    pub fn to(&self) -> Option<&CardanoAddress> {
        self.to.as_ref()
    }

    pub fn set_to(&mut self, to: CardanoAddress) {
        self.to = Some(to);
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: u64) {
        self.amount = amount;
    }

    pub fn sending_max_amount(&self) -> bool {
        self.sending_max_amount
    }

    pub fn set_sending_max_amount(&mut self, sending_max_amount: bool) {
        self.sending_max_amount = sending_max_amount;
    }

    pub fn invalid_after(&self) -> u64 {
        self.invalid_after
    }

    pub fn set_invalid_after(&mut self, slot: u64) {
        self.invalid_after = slot;
    }

    // ── inputs ──────────────────────────────────────────────────────────────

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn add_input(&mut self, input: TxInput) {
        self.inputs.push(input);
    }

    pub fn add_inputs(&mut self, inputs: impl IntoIterator<Item = TxInput>) {
        self.inputs.extend(inputs);
    }

    pub fn clear_inputs(&mut self) {
        self.inputs.clear();
    }

    // ── outputs ─────────────────────────────────────────────────────────────

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    /// Append an output. A second change output is rejected.
    pub fn add_output(&mut self, output: TxOutput) -> bool {
        if output.is_change() && self.change_output().is_some() {
            return false;
        }
        self.outputs.push(output);
        true
    }

    pub fn target_output(&self) -> Option<&TxOutput> {
        self.outputs
            .iter()
            .find(|o| o.output_type == TxOutputType::Target)
    }

    pub fn target_output_mut(&mut self) -> Option<&mut TxOutput> {
        self.outputs
            .iter_mut()
            .find(|o| o.output_type == TxOutputType::Target)
    }

    pub fn change_output(&self) -> Option<&TxOutput> {
        self.outputs.iter().find(|o| o.is_change())
    }

    pub fn change_output_mut(&mut self) -> Option<&mut TxOutput> {
        self.outputs.iter_mut().find(|o| o.is_change())
    }

    pub fn remove_change_output(&mut self) -> Option<TxOutput> {
        let pos = self.outputs.iter().position(|o| o.is_change())?;
        Some(self.outputs.remove(pos))
    }

    // ── witnesses ───────────────────────────────────────────────────────────

    pub fn witnesses(&self) -> &[TxWitness] {
        &self.witnesses
    }

    pub fn add_witness(&mut self, witness: TxWitness) {
        self.witnesses.push(witness);
    }

    pub fn set_witnesses(&mut self, witnesses: Vec<TxWitness>) {
        self.witnesses = witnesses;
    }

    /// Signed iff there is exactly one witness per input.
    pub fn is_signed(&self) -> bool {
        !self.inputs.is_empty() && self.witnesses.len() == self.inputs.len()
    }

    // ── totals ──────────────────────────────────────────────────────────────

    pub fn total_inputs_amount(&self) -> Option<u64> {
        self.inputs
            .iter()
            .try_fold(0u64, |acc, i| acc.checked_add(i.utxo_value))
    }

    pub fn total_outputs_amount(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
    }

    /// `inputs - outputs`, or `None` when outputs exceed inputs.
    pub fn effective_fee_amount(&self) -> Option<u64> {
        self.total_inputs_amount()?
            .checked_sub(self.total_outputs_amount()?)
    }

    /// Sum of the token balances carried by all inputs.
    pub fn input_tokens(&self) -> Option<TokenBalances> {
        let mut total = TokenBalances::new();
        for input in &self.inputs {
            add_token_balances(&mut total, &input.utxo_tokens).ok()?;
        }
        Some(total)
    }

    /// Set change to whatever remains after the other outputs and `fee`.
    pub fn move_surplus_to_change(&mut self, fee: u64) -> bool {
        let Some(inputs) = self.total_inputs_amount() else {
            return false;
        };
        let others = self
            .outputs
            .iter()
            .filter(|o| !o.is_change())
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount));
        let surplus = others
            .and_then(|o| o.checked_add(fee))
            .and_then(|spent| inputs.checked_sub(spent));

        match (surplus, self.change_output_mut()) {
            (Some(surplus), Some(change)) => {
                change.amount = surplus;
                true
            }
            _ => false,
        }
    }
}
