//! Transaction construction as a sequential state machine.
//!
//! The task fetches what it is missing from the chain, one prerequisite per
//! step, then hands everything to the right solver. It is passed by value:
//! each `step` either returns the task for another round or the finished
//! transaction.

use crate::chain::{ChainStateProvider, UtxoMap};
use crate::error::WalletError;
use crate::utxo::utxos_to_inputs;
use cardano_rpc::{EpochParameters, LatestBlock};
use cardano_tx::{
    calc_min_output_value, CardanoTransaction, KnapsackSolver, MaxSendSolver, SelectionConfig,
    TxOutput,
};
use cardano_types::CardanoAddress;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Slots after the latest block during which the transaction stays valid.
pub const TX_VALIDITY_SLOTS: u64 = 7200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateTransactionOptions {
    pub validity_slots: u64,
    pub selection: SelectionConfig,
}

impl Default for CreateTransactionOptions {
    fn default() -> Self {
        Self {
            validity_slots: TX_VALIDITY_SLOTS,
            selection: SelectionConfig::default(),
        }
    }
}

/// Steps in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    FetchFeeParameters,
    FetchLatestBlock,
    FetchUtxos,
    FetchChangeAddress,
    Solve,
}

/// Chain state gathered so far.
#[derive(Debug, Clone, Default)]
pub struct Prerequisites {
    pub epoch_parameters: Option<EpochParameters>,
    pub latest_block: Option<LatestBlock>,
    pub utxos: Option<UtxoMap>,
    pub change_address: Option<CardanoAddress>,
}

impl Prerequisites {
    /// First missing prerequisite, or `Solve` when all are in.
    pub fn next_state(&self) -> TaskState {
        if self.epoch_parameters.is_none() {
            TaskState::FetchFeeParameters
        } else if self.latest_block.is_none() {
            TaskState::FetchLatestBlock
        } else if self.utxos.is_none() {
            TaskState::FetchUtxos
        } else if self.change_address.is_none() {
            TaskState::FetchChangeAddress
        } else {
            TaskState::Solve
        }
    }
}

pub enum StepOutcome<R = StdRng> {
    Pending(CreateTransactionTask<R>),
    Done(CardanoTransaction),
}

pub struct CreateTransactionTask<R = StdRng> {
    addresses: Vec<CardanoAddress>,
    to: CardanoAddress,
    amount: u64,
    sending_max_amount: bool,
    options: CreateTransactionOptions,
    prerequisites: Prerequisites,
    transaction: CardanoTransaction,
    rng: R,
}

impl CreateTransactionTask<StdRng> {
    /// Spend from `addresses` to `to`. With `sending_max_amount` the amount
    /// is ignored and the whole balance goes out.
    pub fn new(
        addresses: Vec<CardanoAddress>,
        to: CardanoAddress,
        amount: u64,
        sending_max_amount: bool,
    ) -> Self {
        let mut transaction = CardanoTransaction::new();
        transaction.set_to(to.clone());
        transaction.set_amount(amount);
        transaction.set_sending_max_amount(sending_max_amount);
        Self {
            addresses,
            to,
            amount,
            sending_max_amount,
            options: CreateTransactionOptions::default(),
            prerequisites: Prerequisites::default(),
            transaction,
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> CreateTransactionTask<R> {
    pub fn with_rng<R2: Rng>(self, rng: R2) -> CreateTransactionTask<R2> {
        CreateTransactionTask {
            addresses: self.addresses,
            to: self.to,
            amount: self.amount,
            sending_max_amount: self.sending_max_amount,
            options: self.options,
            prerequisites: self.prerequisites,
            transaction: self.transaction,
            rng,
        }
    }

    pub fn with_options(mut self, options: CreateTransactionOptions) -> Self {
        self.options = options;
        self
    }

    /// Seed the fee parameters so the first fetch is skipped.
    pub fn with_epoch_parameters(mut self, params: EpochParameters) -> Self {
        self.prerequisites.epoch_parameters = Some(params);
        self
    }

    pub fn state(&self) -> TaskState {
        self.prerequisites.next_state()
    }

    pub fn prerequisites(&self) -> &Prerequisites {
        &self.prerequisites
    }

    pub fn transaction(&self) -> &CardanoTransaction {
        &self.transaction
    }

    /// Run one state. Fetch failures are returned as they came.
    pub async fn step<C: ChainStateProvider + ?Sized>(
        mut self,
        chain: &C,
    ) -> Result<StepOutcome<R>, WalletError> {
        let state = self.state();
        log::debug!("create transaction: {:?}", state);

        match state {
            TaskState::FetchFeeParameters => {
                let params = chain
                    .get_latest_epoch_parameters()
                    .await
                    .inspect_err(|e| log::warn!("fetching fee parameters failed: {}", e))?;
                self.prerequisites.epoch_parameters = Some(params);
            }
            TaskState::FetchLatestBlock => {
                let block = chain
                    .get_latest_block()
                    .await
                    .inspect_err(|e| log::warn!("fetching latest block failed: {}", e))?;
                self.prerequisites.latest_block = Some(block);
            }
            TaskState::FetchUtxos => {
                let utxos = chain
                    .get_utxos(&self.addresses)
                    .await
                    .inspect_err(|e| log::warn!("fetching utxos failed: {}", e))?;
                self.prerequisites.utxos = Some(utxos);
            }
            TaskState::FetchChangeAddress => {
                let address = chain
                    .discover_next_unused_change_address()
                    .await
                    .inspect_err(|e| log::warn!("discovering change address failed: {}", e))?;
                self.prerequisites.change_address = Some(address);
            }
            TaskState::Solve => return self.solve().map(StepOutcome::Done),
        }

        Ok(StepOutcome::Pending(self))
    }

    /// Step until done.
    pub async fn run<C: ChainStateProvider + ?Sized>(
        self,
        chain: &C,
    ) -> Result<CardanoTransaction, WalletError> {
        let mut task = self;
        loop {
            match task.step(chain).await? {
                StepOutcome::Pending(next) => task = next,
                StepOutcome::Done(tx) => return Ok(tx),
            }
        }
    }

    fn solve(mut self) -> Result<CardanoTransaction, WalletError> {
        let missing = |what: &str| WalletError::Internal(format!("solve reached without {}", what));
        let prerequisites = std::mem::take(&mut self.prerequisites);
        let params = prerequisites
            .epoch_parameters
            .ok_or_else(|| missing("fee parameters"))?;
        let block = prerequisites
            .latest_block
            .ok_or_else(|| missing("latest block"))?;
        let utxos = prerequisites.utxos.ok_or_else(|| missing("utxos"))?;
        let change_address = prerequisites
            .change_address
            .ok_or_else(|| missing("change address"))?;

        let invalid_after = block
            .slot
            .checked_add(self.options.validity_slots)
            .ok_or_else(|| WalletError::Internal("validity slot overflow".into()))?;
        self.transaction.set_invalid_after(invalid_after);

        let inputs = utxos_to_inputs(&utxos);
        log::debug!(
            "solving with {} candidate inputs, valid until slot {}",
            inputs.len(),
            invalid_after
        );

        let mut base = self.transaction;
        if self.sending_max_amount {
            if inputs.is_empty() {
                return Err(WalletError::InsufficientBalance);
            }
            base.add_output(TxOutput::target(self.to, 0));
            let tx = MaxSendSolver::new(base, params, change_address, inputs).solve()?;
            log::debug!("max send: {} lovelace out", tx.amount());
            return Ok(tx);
        }

        let target = TxOutput::target(self.to, self.amount);
        let minimum = calc_min_output_value(&target, &params)?;
        if self.amount < minimum {
            return Err(WalletError::AmountTooSmall {
                amount: self.amount,
                minimum,
            });
        }
        if inputs.is_empty() {
            return Err(WalletError::InsufficientBalance);
        }

        base.add_output(target);
        base.add_output(TxOutput::change(change_address));
        let tx = KnapsackSolver::new(base, params, inputs)
            .with_config(self.options.selection)
            .solve(&mut self.rng)?;
        log::debug!(
            "knapsack: {} inputs, fee {:?}",
            tx.inputs().len(),
            tx.effective_fee_amount()
        );
        Ok(tx)
    }
}
