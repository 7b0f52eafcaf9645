//! "Send everything" solver.
//!
//! Spends every input and gives the target output whatever is left after
//! the fee and, when tokens are involved, a minimum-value change output to
//! carry them home.

use crate::fee::{calc_fee_with_options, calc_min_output_value, calc_required_fee, validate_amounts};
use crate::serializer::{SerializerOptions, WitnessSetMode};
use crate::transaction::{CardanoTransaction, TxInput, TxOutput, TxOutputType};
use crate::TxError;
use cardano_types::{CardanoAddress, EpochParameters};

/// Upper bound on size/fee fixed-point rounds.
pub const MAX_SEND_ITERATIONS: usize = 10;

pub struct MaxSendSolver {
    base: CardanoTransaction,
    params: EpochParameters,
    change_address: CardanoAddress,
    inputs: Vec<TxInput>,
}

impl MaxSendSolver {
    pub fn new(
        base: CardanoTransaction,
        params: EpochParameters,
        change_address: CardanoAddress,
        inputs: Vec<TxInput>,
    ) -> Self {
        Self {
            base,
            params,
            change_address,
            inputs,
        }
    }

    pub fn solve(&self) -> Result<CardanoTransaction, TxError> {
        let mut tx = self.base.clone();
        tx.remove_change_output();
        let targets = tx
            .outputs()
            .iter()
            .filter(|o| o.output_type == TxOutputType::Target)
            .count();
        if targets != 1 || tx.outputs().len() != 1 {
            return Err(TxError::Invalid(
                "max send needs exactly one target output".into(),
            ));
        }
        if self.inputs.is_empty() {
            return Err(TxError::InsufficientBalance);
        }

        tx.clear_inputs();
        tx.add_inputs(self.inputs.iter().cloned());
        let total_in = tx
            .total_inputs_amount()
            .ok_or_else(|| TxError::Invalid("input total overflow".into()))?;

        let tokens = tx
            .input_tokens()
            .ok_or_else(|| TxError::Invalid("token total overflow".into()))?;
        let mut change_amount = 0;
        if !tokens.is_empty() {
            let mut change = TxOutput::change(self.change_address.clone());
            change.tokens = tokens;
            self.settle_min_value(&mut change)?;
            change_amount = change.amount;
            tx.add_output(change);
        }

        let spendable = total_in
            .checked_sub(change_amount)
            .ok_or(TxError::InsufficientBalance)?;

        // Widest target and fee fields: an upper bound on the fee.
        let mut fee = calc_fee_with_options(
            &tx,
            &self.params,
            SerializerOptions {
                max_value_for_target_output: true,
                max_value_for_fee: true,
                witness_set: WitnessSetMode::Dummy,
                ..Default::default()
            },
        )?;

        // Lower the fee to what the resulting size needs until the two agree.
        // A target that crosses an encoding width can make the size bounce;
        // a repeated fee ends the walk and the largest funded target wins.
        let mut best: Option<(u64, u64)> = None;
        let mut tried = vec![fee];
        for round in 0..MAX_SEND_ITERATIONS {
            let target = spendable
                .checked_sub(fee)
                .ok_or(TxError::InsufficientBalance)?;
            set_target_amount(&mut tx, target)?;

            let required = calc_required_fee(&tx, &self.params)?;
            log::trace!(
                "max send round {}: target {}, fee {}, required {}",
                round,
                target,
                fee,
                required
            );
            if required <= fee && best.map_or(true, |(t, _)| target > t) {
                best = Some((target, fee));
            }
            if required == fee || tried.contains(&required) {
                break;
            }
            tried.push(required);
            fee = required;
        }
        let (target, fee) = best.ok_or(TxError::InsufficientBalance)?;
        let target = self.top_up(&mut tx, spendable, target, fee)?;

        let target_output = tx
            .target_output()
            .ok_or_else(|| TxError::Internal("target output vanished".into()))?;
        if target < calc_min_output_value(target_output, &self.params)? {
            log::debug!("max send: {} left for target is below its minimum value", target);
            return Err(TxError::InsufficientBalance);
        }

        if !validate_amounts(&tx, &self.params) {
            return Err(TxError::Internal(
                "max send produced an invalid transaction".into(),
            ));
        }
        tx.set_amount(target);
        Ok(tx)
    }

    /// Grow `target` up to the largest value its encoding width allows,
    /// paying at least the fee the transaction already needs.
    fn top_up(
        &self,
        tx: &mut CardanoTransaction,
        spendable: u64,
        target: u64,
        fee: u64,
    ) -> Result<u64, TxError> {
        set_target_amount(tx, target)?;
        let required = calc_required_fee(tx, &self.params)?;
        let floor = spendable.saturating_sub(same_width_ceiling(target));
        let raised = spendable - required.max(floor).min(fee);
        if raised > target {
            set_target_amount(tx, raised)?;
            if calc_required_fee(tx, &self.params)? <= spendable - raised {
                return Ok(raised);
            }
            set_target_amount(tx, target)?;
        }
        Ok(target)
    }

    /// Raise `change.amount` until it covers the minimum for its own encoding.
    fn settle_min_value(&self, change: &mut TxOutput) -> Result<(), TxError> {
        for _ in 0..MAX_SEND_ITERATIONS {
            let min = calc_min_output_value(change, &self.params)?;
            if change.amount >= min {
                return Ok(());
            }
            change.amount = min;
        }
        Err(TxError::Internal(
            "change minimum value did not settle".into(),
        ))
    }
}

/// Largest value with the same CBOR unsigned-integer width as `value`.
fn same_width_ceiling(value: u64) -> u64 {
    match value {
        0..=23 => 23,
        24..=0xff => 0xff,
        0x100..=0xffff => 0xffff,
        0x1_0000..=0xffff_ffff => 0xffff_ffff,
        _ => u64::MAX,
    }
}

fn set_target_amount(tx: &mut CardanoTransaction, amount: u64) -> Result<(), TxError> {
    let target = tx
        .target_output_mut()
        .ok_or_else(|| TxError::Internal("target output vanished".into()))?;
    target.amount = amount;
    Ok(())
}
