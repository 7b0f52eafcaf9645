//! Randomized knapsack coin selection.
//!
//! Each trial walks the candidate pool (largest value first), committing
//! inputs on a coin flip until the transaction is fundable, then backs the
//! last input out again to look for a tighter set. A second, deterministic
//! pass runs only if the random pass never got there: it commits the rest
//! in pool order and stops at the first fundable set.
//!
//! The search runs once on the shell with its change output and once
//! without it. A change-less result burns its surplus as fee, so it is only
//! accepted when that surplus is too small to have formed a legal change
//! output.

use crate::fee::{
    calc_fee_with_options, calc_min_output_value, calc_min_transaction_fee, validate_amounts,
};
use crate::serializer::{SerializerOptions, WitnessSetMode};
use crate::transaction::{CardanoTransaction, TxInput, TxOutputType};
use crate::TxError;
use cardano_types::EpochParameters;
use rand::Rng;
use std::collections::BTreeSet;

/// Default number of random trials per shell.
pub const KNAPSACK_ITERATIONS: usize = 1000;

/// Tuning for the knapsack search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    pub iterations: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            iterations: KNAPSACK_ITERATIONS,
        }
    }
}

/// Which inputs of the pool one trial has committed, by pool index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrialState {
    committed: BTreeSet<usize>,
}

impl TrialState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, index: usize) {
        self.committed.insert(index);
    }

    pub fn uncommit(&mut self, index: usize) {
        self.committed.remove(&index);
    }

    pub fn is_committed(&self, index: usize) -> bool {
        self.committed.contains(&index)
    }

    pub fn committed_count(&self) -> usize {
        self.committed.len()
    }

    /// Copy of `shell` with the committed inputs appended in pool order.
    pub fn build_transaction(
        &self,
        shell: &CardanoTransaction,
        pool: &[TxInput],
    ) -> CardanoTransaction {
        let mut tx = shell.clone();
        tx.add_inputs(
            self.committed
                .iter()
                .filter_map(|&index| pool.get(index))
                .cloned(),
        );
        tx
    }
}

/// How candidates built on one shell are judged.
#[derive(Debug, Clone, Copy)]
enum ShellKind {
    /// Surplus goes to change, which must reach the dust threshold.
    WithChange { dust_threshold: u64 },
    /// Surplus is burnt as fee and must stay below `burn_limit`.
    WithoutChange { burn_limit: Option<u64> },
}

pub struct KnapsackSolver {
    base: CardanoTransaction,
    params: EpochParameters,
    inputs: Vec<TxInput>,
    config: SelectionConfig,
}

impl KnapsackSolver {
    /// `base` carries one target output and optionally a change output, and
    /// no inputs. The pool is sorted largest value first.
    pub fn new(base: CardanoTransaction, params: EpochParameters, mut inputs: Vec<TxInput>) -> Self {
        inputs.sort_by(|a, b| b.utxo_value.cmp(&a.utxo_value));
        Self {
            base,
            params,
            inputs,
            config: SelectionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SelectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn solve<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CardanoTransaction, TxError> {
        let targets = self
            .base
            .outputs()
            .iter()
            .filter(|o| o.output_type == TxOutputType::Target)
            .count();
        if targets != 1 {
            return Err(TxError::Invalid(format!(
                "coin selection needs exactly one target output, got {}",
                targets
            )));
        }
        if !self.base.inputs().is_empty() {
            return Err(TxError::Invalid("coin selection shell already has inputs".into()));
        }

        let pool_total = self
            .inputs
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.utxo_value));
        let target_total = self.base.total_outputs_amount().unwrap_or(u64::MAX);
        if self.inputs.is_empty() || pool_total < target_total {
            log::debug!(
                "knapsack: pool of {} inputs holds {}, target needs {}",
                self.inputs.len(),
                pool_total,
                target_total
            );
            return Err(TxError::InsufficientBalance);
        }

        let mut best: Option<CardanoTransaction> = None;
        let mut burn_limit = None;

        if self.base.change_output().is_some() {
            let dust_threshold = self.dust_threshold(&self.base)?;
            burn_limit = Some(dust_threshold);
            let found = self.search(&self.base, ShellKind::WithChange { dust_threshold }, rng);
            log::debug!(
                "knapsack: change shell, dust threshold {}, best fee {:?}",
                dust_threshold,
                found.as_ref().and_then(|tx| tx.effective_fee_amount())
            );
            keep_better(&mut best, found);
        }

        let mut no_change = self.base.clone();
        no_change.remove_change_output();
        let found = self.search(&no_change, ShellKind::WithoutChange { burn_limit }, rng);
        log::debug!(
            "knapsack: change-less shell, best fee {:?}",
            found.as_ref().and_then(|tx| tx.effective_fee_amount())
        );
        keep_better(&mut best, found);

        let tx = best.ok_or(TxError::InsufficientBalance)?;
        if !validate_amounts(&tx, &self.params) {
            return Err(TxError::Internal(
                "coin selection produced an invalid transaction".into(),
            ));
        }
        Ok(tx)
    }

    /// Fee cost of carrying the change output, floored at its minimum value.
    fn dust_threshold(&self, shell: &CardanoTransaction) -> Result<u64, TxError> {
        let options = SerializerOptions {
            max_value_for_change_output: true,
            max_value_for_fee: true,
            witness_set: WitnessSetMode::Dummy,
            ..Default::default()
        };
        let with_change = calc_fee_with_options(shell, &self.params, options)?;
        let mut without = shell.clone();
        let change = without
            .remove_change_output()
            .ok_or_else(|| TxError::Internal("dust threshold needs a change output".into()))?;
        let without_change = calc_fee_with_options(&without, &self.params, options)?;

        let min_value = calc_min_output_value(&change, &self.params)?;
        Ok(with_change.saturating_sub(without_change).max(min_value))
    }

    fn search<R: Rng + ?Sized>(
        &self,
        shell: &CardanoTransaction,
        kind: ShellKind,
        rng: &mut R,
    ) -> Option<CardanoTransaction> {
        let mut best = None;
        let mut evaluated = 0usize;

        for _ in 0..self.config.iterations {
            let mut state = TrialState::new();
            let mut solved = false;

            for pass in 0..2 {
                if pass == 1 && solved {
                    break;
                }
                for index in 0..self.inputs.len() {
                    if state.is_committed(index) {
                        continue;
                    }
                    if pass == 0 && !rng.gen_bool(0.5) {
                        continue;
                    }

                    state.commit(index);
                    let mut candidate = state.build_transaction(shell, &self.inputs);
                    evaluated += 1;
                    if self.evaluate(&mut candidate, kind) {
                        solved = true;
                        keep_better(&mut best, Some(candidate));
                        if pass == 1 {
                            break;
                        }
                        state.uncommit(index);
                    }
                }
            }
        }

        log::trace!("knapsack: evaluated {} candidates", evaluated);
        best
    }

    /// Price `tx` and place its surplus. True if the result is admissible.
    fn evaluate(&self, tx: &mut CardanoTransaction, kind: ShellKind) -> bool {
        let Some(input_tokens) = tx.input_tokens() else {
            return false;
        };

        match kind {
            ShellKind::WithChange { dust_threshold } => {
                let Some(change) = tx.change_output_mut() else {
                    return false;
                };
                change.amount = 0;
                change.tokens = input_tokens;

                // The fee field is sized from the pre-change surplus, which
                // only over-estimates.
                if tx.effective_fee_amount().is_none() {
                    return false;
                }
                let Ok(fee) = calc_min_transaction_fee(tx, &self.params) else {
                    return false;
                };
                if !tx.move_surplus_to_change(fee) {
                    return false;
                }
                match tx.change_output() {
                    Some(change) if change.amount >= dust_threshold => {}
                    _ => return false,
                }
            }
            ShellKind::WithoutChange { burn_limit } => {
                if !input_tokens.is_empty() {
                    return false;
                }
                let Some(effective) = tx.effective_fee_amount() else {
                    return false;
                };
                let Ok(fee) = calc_min_transaction_fee(tx, &self.params) else {
                    return false;
                };
                let Some(burnt) = effective.checked_sub(fee) else {
                    return false;
                };
                if burn_limit.is_some_and(|limit| burnt >= limit) {
                    return false;
                }
            }
        }

        validate_amounts(tx, &self.params)
    }
}

/// Replace `best` only on a strictly higher effective fee.
fn keep_better(best: &mut Option<CardanoTransaction>, candidate: Option<CardanoTransaction>) {
    let Some(candidate) = candidate else {
        return;
    };
    let fee = candidate.effective_fee_amount().unwrap_or(0);
    let replace = match best {
        Some(current) => fee > current.effective_fee_amount().unwrap_or(0),
        None => true,
    };
    if replace {
        *best = Some(candidate);
    }
}
