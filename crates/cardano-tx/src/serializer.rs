//! Deterministic CBOR encoding of transactions.
//!
//! Wire layout:
//!
//! ```text
//! [ body, witness_set, true, null ]
//! body        = { 0: [input*], 1: [output*], 2: fee, 3: invalid_after }
//! input       = [ bytes(32) txid, uint index ]
//! output      = [ bytes address, uint amount ]
//!             | [ bytes address, [ uint amount, { policy: { name: uint } } ] ]
//! witness_set = { 0: [ [ bytes(32) vkey, bytes(64) signature ]* ] }
//! ```
//!
//! Every integer uses the shortest encoding except where an option asks for
//! a `u64::MAX` placeholder. The placeholders let the solvers size a
//! transaction before the amounts they are solving for are known.

use crate::transaction::{CardanoTransaction, TxOutput, TxOutputType, TxWitness};
use crate::TxError;
use cardano_types::constants::{PUBKEY_SIZE, SIGNATURE_SIZE, TX_HASH_SIZE};
use minicbor::encode::{self, Write};
use minicbor::Encoder;
use std::convert::Infallible;

/// Body map keys.
pub(crate) mod body_key {
    pub const INPUTS: u64 = 0;
    pub const OUTPUTS: u64 = 1;
    pub const FEE: u64 = 2;
    pub const INVALID_AFTER: u64 = 3;
}

/// Witness-set key for vkey witnesses.
pub(crate) const VKEY_WITNESS_KEY: u64 = 0;

/// Byte length of one opaque placeholder witness.
pub const PLACEHOLDER_WITNESS_SIZE: usize = PUBKEY_SIZE + SIGNATURE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WitnessSetMode {
    /// The witnesses stored on the transaction.
    #[default]
    Actual,
    /// One zeroed (key, signature) pair per input.
    Dummy,
    /// One unsplit 96-byte blob per input.
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializerOptions {
    pub max_value_for_target_output: bool,
    pub max_value_for_change_output: bool,
    pub max_value_for_fee: bool,
    pub witness_set: WitnessSetMode,
}

impl SerializerOptions {
    /// Options used to size a transaction for fee estimation: change amount
    /// unknown, signatures not yet made.
    pub fn estimation() -> Self {
        Self {
            max_value_for_change_output: true,
            witness_set: WitnessSetMode::Dummy,
            ..Default::default()
        }
    }

    /// Real amounts with one dummy witness per input.
    pub fn dummy_witnesses() -> Self {
        Self {
            witness_set: WitnessSetMode::Dummy,
            ..Default::default()
        }
    }
}

/// Byte sink that only counts.
#[derive(Debug, Default)]
struct SizeCounter(usize);

impl Write for SizeCounter {
    type Error = Infallible;

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        self.0 += buf.len();
        Ok(())
    }
}

fn encode_err<E: std::fmt::Display>(e: encode::Error<E>) -> TxError {
    TxError::Serialize(e.to_string())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CardanoSerializer {
    options: SerializerOptions,
}

impl CardanoSerializer {
    pub fn new(options: SerializerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> SerializerOptions {
        self.options
    }

    /// Encode the full signed-or-unsigned transaction.
    pub fn serialize_transaction(&self, tx: &CardanoTransaction) -> Result<Vec<u8>, TxError> {
        self.check_fee(tx)?;
        let mut buf = Vec::with_capacity(512);
        self.encode_transaction(&mut Encoder::new(&mut buf), tx)
            .map_err(encode_err)?;
        Ok(buf)
    }

    /// Encode the body map alone. Its hash is the transaction id.
    pub fn serialize_body(&self, tx: &CardanoTransaction) -> Result<Vec<u8>, TxError> {
        self.check_fee(tx)?;
        let mut buf = Vec::with_capacity(256);
        self.encode_body(&mut Encoder::new(&mut buf), tx)
            .map_err(encode_err)?;
        Ok(buf)
    }

    pub fn serialize_output(&self, output: &TxOutput) -> Result<Vec<u8>, TxError> {
        let mut buf = Vec::with_capacity(96);
        self.encode_output(&mut Encoder::new(&mut buf), output)
            .map_err(encode_err)?;
        Ok(buf)
    }

    /// Encoded length of `tx` under these options, without allocating.
    pub fn calc_transaction_size(&self, tx: &CardanoTransaction) -> Result<usize, TxError> {
        self.check_fee(tx)?;
        let mut counter = SizeCounter::default();
        self.encode_transaction(&mut Encoder::new(&mut counter), tx)
            .map_err(encode_err)?;
        Ok(counter.0)
    }

    pub fn calc_output_size(&self, output: &TxOutput) -> Result<usize, TxError> {
        let mut counter = SizeCounter::default();
        self.encode_output(&mut Encoder::new(&mut counter), output)
            .map_err(encode_err)?;
        Ok(counter.0)
    }

    /// Blake2b-256 of the encoded body.
    pub fn get_tx_hash(&self, tx: &CardanoTransaction) -> Result<[u8; TX_HASH_SIZE], TxError> {
        Ok(hash_body(&self.serialize_body(tx)?))
    }

    fn check_fee(&self, tx: &CardanoTransaction) -> Result<(), TxError> {
        if !self.options.max_value_for_fee && tx.effective_fee_amount().is_none() {
            return Err(TxError::Invalid(
                "outputs exceed inputs, fee would be negative".into(),
            ));
        }
        Ok(())
    }

    fn fee_value(&self, tx: &CardanoTransaction) -> u64 {
        if self.options.max_value_for_fee {
            u64::MAX
        } else {
            // Checked by `check_fee` before encoding starts.
            tx.effective_fee_amount().unwrap_or(u64::MAX)
        }
    }

    fn encode_transaction<W: Write>(
        &self,
        e: &mut Encoder<W>,
        tx: &CardanoTransaction,
    ) -> Result<(), encode::Error<W::Error>> {
        e.array(4)?;
        self.encode_body(e, tx)?;
        self.encode_witness_set(e, tx)?;
        e.bool(true)?.null()?;
        Ok(())
    }

    fn encode_body<W: Write>(
        &self,
        e: &mut Encoder<W>,
        tx: &CardanoTransaction,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(4)?;

        e.u64(body_key::INPUTS)?.array(tx.inputs().len() as u64)?;
        for input in tx.inputs() {
            e.array(2)?
                .bytes(&input.utxo_outpoint.txid)?
                .u32(input.utxo_outpoint.index)?;
        }

        e.u64(body_key::OUTPUTS)?.array(tx.outputs().len() as u64)?;
        for output in tx.outputs() {
            self.encode_output(e, output)?;
        }

        e.u64(body_key::FEE)?.u64(self.fee_value(tx))?;
        e.u64(body_key::INVALID_AFTER)?.u64(tx.invalid_after())?;
        Ok(())
    }

    fn encode_output<W: Write>(
        &self,
        e: &mut Encoder<W>,
        output: &TxOutput,
    ) -> Result<(), encode::Error<W::Error>> {
        let placeholder = match output.output_type {
            TxOutputType::Target => self.options.max_value_for_target_output,
            TxOutputType::Change => self.options.max_value_for_change_output,
        };
        let amount = if placeholder { u64::MAX } else { output.amount };

        e.array(2)?.bytes(output.address.as_bytes())?;
        if output.tokens.is_empty() {
            e.u64(amount)?;
            return Ok(());
        }

        e.array(2)?.u64(amount)?;

        // Tokens are ordered by policy then name, so each policy's names
        // form one contiguous run.
        let mut policies: Vec<(&[u8], Vec<(&[u8], u64)>)> = Vec::new();
        for (token, &quantity) in &output.tokens {
            let name = (token.asset_name.as_slice(), quantity);
            match policies.last_mut() {
                Some((policy, names)) if *policy == token.policy_id.as_slice() => names.push(name),
                _ => policies.push((token.policy_id.as_slice(), vec![name])),
            }
        }

        e.map(policies.len() as u64)?;
        for (policy, names) in policies {
            e.bytes(policy)?.map(names.len() as u64)?;
            for (name, quantity) in names {
                e.bytes(name)?.u64(quantity)?;
            }
        }
        Ok(())
    }

    fn encode_witness_set<W: Write>(
        &self,
        e: &mut Encoder<W>,
        tx: &CardanoTransaction,
    ) -> Result<(), encode::Error<W::Error>> {
        e.map(1)?.u64(VKEY_WITNESS_KEY)?;
        match self.options.witness_set {
            WitnessSetMode::Actual => {
                e.array(tx.witnesses().len() as u64)?;
                for w in tx.witnesses() {
                    encode_witness(e, w)?;
                }
            }
            WitnessSetMode::Dummy => {
                let dummy = TxWitness::dummy();
                e.array(tx.inputs().len() as u64)?;
                for _ in tx.inputs() {
                    encode_witness(e, &dummy)?;
                }
            }
            WitnessSetMode::Placeholder => {
                let blob = [0u8; PLACEHOLDER_WITNESS_SIZE];
                e.array(tx.inputs().len() as u64)?;
                for _ in tx.inputs() {
                    e.array(1)?.bytes(&blob)?;
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn encode_witness<W: Write>(
    e: &mut Encoder<W>,
    witness: &TxWitness,
) -> Result<(), encode::Error<W::Error>> {
    e.array(2)?
        .bytes(&witness.public_key)?
        .bytes(&witness.signature)?;
    Ok(())
}

pub(crate) fn hash_body(body: &[u8]) -> [u8; TX_HASH_SIZE] {
    let digest = blake2b_simd::Params::new()
        .hash_length(TX_HASH_SIZE)
        .hash(body);
    let mut out = [0u8; TX_HASH_SIZE];
    out.copy_from_slice(digest.as_bytes());
    out
}
