use crate::snapshot::Snapshot;
use cardano_types::constants::{PUBKEY_SIZE, SIGNATURE_SIZE};
use cardano_tx::{
    apply_signatures, deserialize_transaction, CardanoSerializer, CardanoTransaction,
    RestrictedTransaction, SelectionConfig, TxWitness,
};
use cardano_types::{CardanoAddress, Network, TokenBalances};
use cardano_wallet::{
    parse_address, resolve_inputs, ChainStateProvider, CreateTransactionOptions,
    CreateTransactionTask,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Map, Value};
use std::path::Path;

type Result = std::result::Result<(), Box<dyn std::error::Error>>;
type JsonResult = std::result::Result<Value, Box<dyn std::error::Error>>;

pub struct BuildRequest {
    pub network: Network,
    pub to: String,
    pub amount: u64,
    pub max: bool,
    pub from: Vec<String>,
    pub seed: Option<u64>,
    pub iterations: Option<usize>,
    pub validity_slots: Option<u64>,
}

// ─── Build ──────────────────────────────────────────────────────────────────

pub async fn build(snapshot: &Path, request: &BuildRequest) -> Result {
    let out = build_json(snapshot, request).await?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn build_json(snapshot: &Path, request: &BuildRequest) -> JsonResult {
    let snapshot = Snapshot::load(snapshot)?;
    let to = parse_network_address(&request.to, request.network)?;

    let addresses = if request.from.is_empty() {
        snapshot.addresses()?
    } else {
        request
            .from
            .iter()
            .map(|a| parse_network_address(a, request.network))
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    let mut options = CreateTransactionOptions::default();
    if let Some(iterations) = request.iterations {
        options.selection = SelectionConfig { iterations };
    }
    if let Some(slots) = request.validity_slots {
        options.validity_slots = slots;
    }
    let rng = match request.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let tx = CreateTransactionTask::new(addresses, to, request.amount, request.max)
        .with_rng(rng)
        .with_options(options)
        .run(&snapshot)
        .await?;

    let serializer = CardanoSerializer::default();
    let bytes = serializer.serialize_transaction(&tx)?;
    let hash = serializer.get_tx_hash(&tx)?;
    Ok(json!({
        "tx": hex::encode(&bytes),
        "hash": hex::encode(hash),
        "size": bytes.len(),
        "fee": tx.effective_fee_amount(),
        "amount": tx.amount(),
        "invalid_after": tx.invalid_after(),
        "inputs": built_inputs(&tx),
        "outputs": built_outputs(&tx),
    }))
}

fn built_inputs(tx: &CardanoTransaction) -> Vec<Value> {
    tx.inputs()
        .iter()
        .map(|i| {
            json!({
                "outpoint": i.utxo_outpoint.to_string(),
                "address": i.utxo_address.to_string(),
                "value": i.utxo_value,
                "tokens": tokens_json(&i.utxo_tokens),
            })
        })
        .collect()
}

fn built_outputs(tx: &CardanoTransaction) -> Vec<Value> {
    tx.outputs()
        .iter()
        .map(|o| {
            json!({
                "address": o.address.to_string(),
                "amount": o.amount,
                "change": o.is_change(),
                "tokens": tokens_json(&o.tokens),
            })
        })
        .collect()
}

// ─── Inspect ────────────────────────────────────────────────────────────────

pub async fn decode(tx_hex: &str, snapshot: Option<&Path>) -> Result {
    let out = decode_json(tx_hex, snapshot).await?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn decode_json(tx_hex: &str, snapshot: Option<&Path>) -> JsonResult {
    let tx = decode_hex_tx(tx_hex)?;

    let inputs: Vec<Value> = match snapshot {
        Some(path) => {
            let snapshot = Snapshot::load(path)?;
            let utxos = snapshot.get_utxos(&snapshot.addresses()?).await?;
            resolve_inputs(&tx, &utxos)
                .into_iter()
                .map(|input| {
                    json!({
                        "outpoint": input.outpoint.to_string(),
                        "owned": input.is_owned(),
                        "address": input.address.map(|a| a.to_string()),
                        "value": input.value,
                        "tokens": tokens_json(&input.tokens),
                    })
                })
                .collect()
        }
        None => tx
            .inputs
            .iter()
            .map(|o| json!({ "outpoint": o.to_string() }))
            .collect(),
    };

    let outputs: Vec<Value> = tx
        .outputs
        .iter()
        .map(|o| {
            let address = match o.address() {
                Some(a) => a.to_string(),
                None => hex::encode(&o.address_bytes),
            };
            json!({
                "address": address,
                "amount": o.amount,
                "tokens": tokens_json(&o.tokens),
            })
        })
        .collect();

    Ok(json!({
        "hash": hex::encode(tx.tx_hash()),
        "fee": tx.fee,
        "invalid_after": tx.invalid_after,
        "total_output": tx.total_outputs_amount(),
        "witness_count": tx.witness_count(),
        "inputs": inputs,
        "outputs": outputs,
    }))
}

pub fn hash(tx_hex: &str) -> Result {
    let tx = decode_hex_tx(tx_hex)?;
    println!("{}", hex::encode(tx.tx_hash()));
    Ok(())
}

// ─── Sign ───────────────────────────────────────────────────────────────────

pub fn sign(tx_hex: &str, witnesses: &[String]) -> Result {
    println!("{}", sign_hex(tx_hex, witnesses)?);
    Ok(())
}

fn sign_hex(tx_hex: &str, witnesses: &[String]) -> std::result::Result<String, Box<dyn std::error::Error>> {
    let raw = hex::decode(tx_hex.trim())?;
    let witnesses = witnesses
        .iter()
        .map(|w| parse_witness(w))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let signed = apply_signatures(&raw, &witnesses)?;
    Ok(hex::encode(signed))
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn parse_network_address(
    address: &str,
    network: Network,
) -> std::result::Result<CardanoAddress, Box<dyn std::error::Error>> {
    let parsed = parse_address(address)?;
    if parsed.network() != network {
        return Err(format!(
            "address {} is on {:?}, expected {:?}",
            address,
            parsed.network(),
            network
        )
        .into());
    }
    Ok(parsed)
}

fn decode_hex_tx(tx_hex: &str) -> std::result::Result<RestrictedTransaction, Box<dyn std::error::Error>> {
    let bytes = hex::decode(tx_hex.trim())?;
    Ok(deserialize_transaction(&bytes)?)
}

fn parse_witness(arg: &str) -> std::result::Result<TxWitness, Box<dyn std::error::Error>> {
    let (key, signature) = arg
        .split_once(':')
        .ok_or_else(|| format!("witness must be <public key>:<signature>, got {}", arg))?;
    let public_key: [u8; PUBKEY_SIZE] = hex::decode(key)?
        .try_into()
        .map_err(|_| format!("public key must be {} bytes", PUBKEY_SIZE))?;
    let signature: [u8; SIGNATURE_SIZE] = hex::decode(signature)?
        .try_into()
        .map_err(|_| format!("signature must be {} bytes", SIGNATURE_SIZE))?;
    Ok(TxWitness::new(public_key, signature))
}

fn tokens_json(tokens: &TokenBalances) -> Value {
    let map: Map<String, Value> = tokens
        .iter()
        .map(|(id, qty)| (id.to_unit(), json!(qty)))
        .collect();
    Value::Object(map)
}
