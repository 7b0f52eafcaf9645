//! Minimum fee and minimum output value.
//!
//! Both are linear in encoded size. All arithmetic is checked integer math;
//! an overflow means the transaction cannot be priced and is reported as
//! such, never wrapped.

use crate::serializer::{CardanoSerializer, SerializerOptions};
use crate::transaction::{CardanoTransaction, TxOutput};
use crate::TxError;
use cardano_types::EpochParameters;

/// Ledger overhead, in bytes, charged on top of every stored output.
pub const MIN_UTXO_OVERHEAD: u64 = 160;

/// `size * a + b`.
pub fn min_fee(size: usize, params: &EpochParameters) -> Option<u64> {
    u64::try_from(size)
        .ok()?
        .checked_mul(params.min_fee_coefficient)?
        .checked_add(params.min_fee_constant)
}

/// Minimum fee for `tx` sized under `options`.
pub fn calc_fee_with_options(
    tx: &CardanoTransaction,
    params: &EpochParameters,
    options: SerializerOptions,
) -> Result<u64, TxError> {
    let size = CardanoSerializer::new(options).calc_transaction_size(tx)?;
    min_fee(size, params).ok_or_else(|| TxError::Invalid(format!("fee overflow at {} bytes", size)))
}

/// Fee model for coin selection: change amount not yet known, witnesses
/// not yet made.
pub fn calc_min_transaction_fee(
    tx: &CardanoTransaction,
    params: &EpochParameters,
) -> Result<u64, TxError> {
    calc_fee_with_options(tx, params, SerializerOptions::estimation())
}

/// Fee the transaction needs as it stands, once signed.
pub fn calc_required_fee(tx: &CardanoTransaction, params: &EpochParameters) -> Result<u64, TxError> {
    calc_fee_with_options(tx, params, SerializerOptions::dummy_witnesses())
}

/// `(160 + encoded output size) * coins_per_utxo_size`.
pub fn calc_min_output_value(output: &TxOutput, params: &EpochParameters) -> Result<u64, TxError> {
    let size = CardanoSerializer::default().calc_output_size(output)? as u64;
    MIN_UTXO_OVERHEAD
        .checked_add(size)
        .and_then(|bytes| bytes.checked_mul(params.coins_per_utxo_size))
        .ok_or_else(|| TxError::Invalid("minimum output value overflow".into()))
}

/// Whether `tx` is admissible on-chain as far as amounts go.
///
/// Every output meets its minimum value, all input tokens land in the
/// change output, and inputs cover outputs plus the fee for the signed
/// size.
pub fn validate_amounts(tx: &CardanoTransaction, params: &EpochParameters) -> bool {
    for output in tx.outputs() {
        match calc_min_output_value(output, params) {
            Ok(min) if output.amount >= min => {}
            _ => return false,
        }
    }

    let Some(input_tokens) = tx.input_tokens() else {
        return false;
    };
    let tokens_ok = match tx.change_output() {
        Some(change) => change.tokens == input_tokens,
        None => input_tokens.is_empty(),
    };
    if !tokens_ok
        || tx
            .outputs()
            .iter()
            .any(|o| !o.is_change() && !o.tokens.is_empty())
    {
        return false;
    }

    let Some(effective_fee) = tx.effective_fee_amount() else {
        return false;
    };
    match calc_required_fee(tx, params) {
        Ok(required) => effective_fee >= required,
        Err(_) => false,
    }
}
