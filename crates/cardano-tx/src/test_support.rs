//! Fixtures shared by the unit tests.

use crate::transaction::{CardanoTransaction, Outpoint, TxInput, TxOutput, TxWitness};
use cardano_types::token::{TokenBalances, TokenId};
use cardano_types::{CardanoAddress, EpochParameters};

pub const ADDRESS_A: &str = "addr1q9zwt6rfn2e3mc63hesal6muyg807cwjnkwg3j5azkvmxm0tyqeyc8eu034zzmj4z53l7lh5u7z08l0rvp49ht88s5uskl6tsl";
pub const ADDRESS_B: &str = "addr1q8s90ehlgwwkq637d3r6qzuxwu6qnprphqadn9pjg2mtcp9hkfmyv4zfhyefvjmpww7f7w9gwem3x6gcm3ulw3kpcgws9sgrhg";
pub const REFERENCE_INPUT: &str = "a7b4c1021fa375a4fccb1ac1b3bb01743b3989b5eb732cc6240add8c71edb925";
pub const REFERENCE_TX_HASH: &str = "a634a34c535a86aa7125023e816d2fac982d530b0848dcc40738a33aca09c9ba";

pub fn address_a() -> CardanoAddress {
    CardanoAddress::from_string(ADDRESS_A).unwrap()
}

pub fn address_b() -> CardanoAddress {
    CardanoAddress::from_string(ADDRESS_B).unwrap()
}

pub fn reference_params() -> EpochParameters {
    EpochParameters::new(44, 155_381, 4_310)
}

/// Input from address A with a txid of `byte` repeated.
pub fn input(byte: u8, value: u64) -> TxInput {
    TxInput::new(address_a(), Outpoint::new([byte; 32], 0), value)
}

/// Balances under policies `[p; 28]`, asset names given as strings.
pub fn tokens(entries: &[(u8, &str, u64)]) -> TokenBalances {
    entries
        .iter()
        .map(|(p, name, q)| (TokenId::new([*p; 28], name.as_bytes().to_vec()).unwrap(), *q))
        .collect()
}

/// One input, a target to A, change to B, one witness.
pub fn reference_tx() -> CardanoTransaction {
    let mut txid = [0u8; 32];
    txid.copy_from_slice(&hex::decode(REFERENCE_INPUT).unwrap());

    let mut tx = CardanoTransaction::new();
    tx.add_input(TxInput::new(address_a(), Outpoint::new(txid, 0), 34_451_133));
    tx.add_output(TxOutput::target(address_a(), 10_000_000));
    let mut change = TxOutput::change(address_b());
    change.amount = 24_282_816;
    tx.add_output(change);
    tx.set_invalid_after(149_770_436);
    tx.add_witness(TxWitness::new([0x77; 32], [0x88; 64]));
    tx
}
