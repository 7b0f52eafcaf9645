//! Property checks for the two coin-selection solvers.

use cardano_tx::fee::calc_required_fee;
use cardano_tx::{
    deserialize_transaction, min_fee, CardanoSerializer, CardanoTransaction, KnapsackSolver,
    MaxSendSolver, Outpoint, SelectionConfig, SerializerOptions, TxError, TxInput, TxOutput,
};
use cardano_types::{CardanoAddress, EpochParameters};
use rand::rngs::StdRng;
use rand::SeedableRng;

const ADDRESS_A: &str = "addr1q9zwt6rfn2e3mc63hesal6muyg807cwjnkwg3j5azkvmxm0tyqeyc8eu034zzmj4z53l7lh5u7z08l0rvp49ht88s5uskl6tsl";
const ADDRESS_B: &str = "addr1q8s90ehlgwwkq637d3r6qzuxwu6qnprphqadn9pjg2mtcp9hkfmyv4zfhyefvjmpww7f7w9gwem3x6gcm3ulw3kpcgws9sgrhg";

fn params() -> EpochParameters {
    EpochParameters::new(44, 155_381, 4_310)
}

fn address(s: &str) -> CardanoAddress {
    s.parse().unwrap()
}

fn pool(values: &[u64]) -> Vec<TxInput> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let mut txid = [0u8; 32];
            txid[0] = i as u8;
            txid[31] = 0xcc;
            TxInput::new(address(ADDRESS_B), Outpoint::new(txid, i as u32), *v)
        })
        .collect()
}

fn send_shell(amount: u64) -> CardanoTransaction {
    let mut tx = CardanoTransaction::new();
    tx.add_output(TxOutput::target(address(ADDRESS_A), amount));
    tx.add_output(TxOutput::change(address(ADDRESS_B)));
    tx.set_invalid_after(150_000_000);
    tx
}

fn assert_invariant(tx: &CardanoTransaction) {
    let required = calc_required_fee(tx, &params()).unwrap();
    let inputs = tx.total_inputs_amount().unwrap();
    let outputs = tx.total_outputs_amount().unwrap();
    assert!(inputs >= outputs + required, "{} < {} + {}", inputs, outputs, required);
}

// ─── 1. Knapsack ────────────────────────────────────────────────────────────

#[test]
fn test_knapsack_insufficient_balance() {
    let solver = KnapsackSolver::new(send_shell(10_000_000), params(), pool(&[1_000_000]));
    let result = solver.solve(&mut StdRng::seed_from_u64(0));
    assert!(matches!(result, Err(TxError::InsufficientBalance)));
}

#[test]
fn test_knapsack_solutions_hold_invariant() {
    let values = [
        1_200_000, 5_500_000, 800_000, 2_750_000, 13_000_000, 1_000_000, 4_400_000,
    ];
    for (seed, amount) in [(1u64, 2_000_000u64), (2, 6_000_000), (3, 15_000_000), (4, 25_000_000)] {
        let solver = KnapsackSolver::new(send_shell(amount), params(), pool(&values))
            .with_config(SelectionConfig { iterations: 200 });
        let tx = solver.solve(&mut StdRng::seed_from_u64(seed)).unwrap();
        assert_eq!(tx.target_output().unwrap().amount, amount);
        assert_invariant(&tx);
    }
}

#[test]
fn test_knapsack_result_round_trips() {
    let solver = KnapsackSolver::new(send_shell(3_000_000), params(), pool(&[2_000_000, 2_500_000, 9_000_000]))
        .with_config(SelectionConfig { iterations: 100 });
    let tx = solver.solve(&mut StdRng::seed_from_u64(17)).unwrap();

    let bytes = CardanoSerializer::default().serialize_transaction(&tx).unwrap();
    let decoded = deserialize_transaction(&bytes).unwrap();
    let outpoints: Vec<Outpoint> = tx.inputs().iter().map(|i| i.utxo_outpoint).collect();
    let amounts: Vec<u64> = tx.outputs().iter().map(|o| o.amount).collect();
    assert_eq!(decoded.inputs, outpoints);
    assert_eq!(decoded.outputs.iter().map(|o| o.amount).collect::<Vec<_>>(), amounts);
    assert_eq!(Some(decoded.fee), tx.effective_fee_amount());
}

// ─── 2. Max send ────────────────────────────────────────────────────────────

#[test]
fn test_max_send_exact() {
    let mut shell = CardanoTransaction::new();
    shell.add_output(TxOutput::target(address(ADDRESS_A), 0));
    let inputs = pool(&[4_000_000, 2_500_000, 1_000_000, 750_000]);

    let tx = MaxSendSolver::new(shell, params(), address(ADDRESS_B), inputs)
        .solve()
        .unwrap();
    assert!(tx.change_output().is_none());
    assert_eq!(tx.inputs().len(), 4);
    let target = tx.target_output().unwrap().amount;
    assert_eq!(
        tx.total_inputs_amount().unwrap(),
        target + tx.effective_fee_amount().unwrap()
    );
    assert_invariant(&tx);
}

// ─── 3. Size monotonicity ───────────────────────────────────────────────────

#[test]
fn test_size_monotone_in_inputs() {
    let serializer = CardanoSerializer::new(SerializerOptions::estimation());
    let mut tx = send_shell(1_000_000);
    let mut last = 0;
    for input in pool(&[5_000_000; 12]) {
        tx.add_input(input);
        let size = serializer.calc_transaction_size(&tx).unwrap();
        assert!(size > last);
        assert!(min_fee(size, &params()).unwrap() >= min_fee(last, &params()).unwrap());
        last = size;
    }
}
