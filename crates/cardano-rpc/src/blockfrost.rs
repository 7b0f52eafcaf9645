//! Blockfrost response shapes.
//!
//! Blockfrost returns most quantities as decimal strings, some as numbers,
//! and reports failures as a JSON object carrying `status_code`. Each parser
//! checks for that object first.

use crate::error::RpcError;
use crate::types::{LatestBlock, UnspentOutput};
use cardano_types::constants::TX_HASH_SIZE;
use cardano_types::{CardanoAddress, EpochParameters, TokenBalances, TokenId};
use serde::Deserialize;
use serde_json::Value;

/// Asset unit Blockfrost uses for ada.
pub const LOVELACE_UNIT: &str = "lovelace";

/// A quantity that may arrive as a JSON number or a decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(u64),
    Text(String),
}

impl Quantity {
    pub fn value(&self, field: &str) -> Result<u64, RpcError> {
        match self {
            Quantity::Number(n) => Ok(*n),
            Quantity::Text(s) => s.trim().parse().map_err(|_| {
                RpcError::InvalidResponse(format!("{} is not an unsigned integer: {:?}", field, s))
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    status_code: u16,
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawEpochParameters {
    min_fee_a: Quantity,
    min_fee_b: Quantity,
    coins_per_utxo_size: Option<Quantity>,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    height: Option<u64>,
    slot: Option<u64>,
    epoch: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawAmount {
    unit: String,
    quantity: Quantity,
}

#[derive(Debug, Deserialize)]
struct RawUtxo {
    address: String,
    tx_hash: String,
    output_index: u32,
    amount: Vec<RawAmount>,
}

/// Turn a Blockfrost error object into an `RpcError`.
pub fn check_error(value: &Value) -> Result<(), RpcError> {
    if value.get("status_code").is_none() {
        return Ok(());
    }
    let body: ErrorBody = decode(value, "error body")?;
    let detail = format!("{} {}: {}", body.status_code, body.error, body.message);
    match body.status_code {
        404 => Err(RpcError::NotFound(detail)),
        400..=499 => Err(RpcError::Other(detail)),
        _ => Err(RpcError::Http(detail)),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: &Value, what: &str) -> Result<T, RpcError> {
    T::deserialize(value).map_err(|e| RpcError::InvalidResponse(format!("{}: {}", what, e)))
}

/// `GET /epochs/latest/parameters`
pub fn parse_epoch_parameters(value: &Value) -> Result<EpochParameters, RpcError> {
    check_error(value)?;
    let raw: RawEpochParameters = decode(value, "epoch parameters")?;
    let coins_per_utxo_size = raw
        .coins_per_utxo_size
        .ok_or_else(|| RpcError::InvalidResponse("coins_per_utxo_size is missing".into()))?
        .value("coins_per_utxo_size")?;
    Ok(EpochParameters {
        min_fee_coefficient: raw.min_fee_a.value("min_fee_a")?,
        min_fee_constant: raw.min_fee_b.value("min_fee_b")?,
        coins_per_utxo_size,
    })
}

/// `GET /blocks/latest`
pub fn parse_latest_block(value: &Value) -> Result<LatestBlock, RpcError> {
    check_error(value)?;
    let raw: RawBlock = decode(value, "latest block")?;
    let field = |v: Option<u64>, name: &str| {
        v.ok_or_else(|| RpcError::InvalidResponse(format!("latest block has no {}", name)))
    };
    Ok(LatestBlock {
        height: field(raw.height, "height")?,
        slot: field(raw.slot, "slot")?,
        epoch: field(raw.epoch, "epoch")?,
    })
}

/// One entry of `GET /addresses/{address}/utxos`.
pub fn parse_utxo(value: &Value) -> Result<UnspentOutput, RpcError> {
    let raw: RawUtxo = decode(value, "utxo")?;

    let address = CardanoAddress::from_string(&raw.address)
        .map_err(|e| RpcError::InvalidResponse(format!("utxo address: {}", e)))?;
    let tx_hash: [u8; TX_HASH_SIZE] = hex::decode(&raw.tx_hash)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| RpcError::InvalidResponse(format!("bad tx_hash {:?}", raw.tx_hash)))?;

    let mut lovelace = None;
    let mut tokens = TokenBalances::new();
    for amount in &raw.amount {
        let quantity = amount.quantity.value(&amount.unit)?;
        if amount.unit == LOVELACE_UNIT {
            if lovelace.replace(quantity).is_some() {
                return Err(RpcError::InvalidResponse("duplicate lovelace amount".into()));
            }
            continue;
        }
        let token = TokenId::from_unit(&amount.unit)
            .map_err(|e| RpcError::InvalidResponse(format!("unit {:?}: {}", amount.unit, e)))?;
        if tokens.contains_key(&token) {
            return Err(RpcError::InvalidResponse(format!(
                "duplicate unit {}",
                amount.unit
            )));
        }
        if quantity > 0 {
            tokens.insert(token, quantity);
        }
    }

    let lovelace_amount = match lovelace {
        Some(v) if v > 0 => v,
        _ => {
            return Err(RpcError::InvalidResponse(format!(
                "utxo {}#{} carries no lovelace",
                raw.tx_hash, raw.output_index
            )))
        }
    };

    Ok(UnspentOutput {
        tx_hash,
        output_index: raw.output_index,
        lovelace_amount,
        tokens,
        address,
    })
}

/// A full `GET /addresses/{address}/utxos` page. An address Blockfrost has
/// never seen answers 404, which is an empty list here.
pub fn parse_utxos(value: &Value) -> Result<Vec<UnspentOutput>, RpcError> {
    match check_error(value) {
        Err(RpcError::NotFound(detail)) => {
            log::debug!("utxo query not found, treating as empty: {}", detail);
            return Ok(Vec::new());
        }
        other => other?,
    }
    let entries = value
        .as_array()
        .ok_or_else(|| RpcError::InvalidResponse("utxo list is not an array".into()))?;
    entries.iter().map(parse_utxo).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ADDRESS: &str = "addr1q9zwt6rfn2e3mc63hesal6muyg807cwjnkwg3j5azkvmxm0tyqeyc8eu034zzmj4z53l7lh5u7z08l0rvp49ht88s5uskl6tsl";
    const TX_HASH: &str = "a7b4c1021fa375a4fccb1ac1b3bb01743b3989b5eb732cc6240add8c71edb925";
    const POLICY: &str = "1d7f33bd23d85e1a25d87d86fac4f199c3197a2f7afeb662a0f34e1e";

    #[test]
    fn test_epoch_parameters() {
        let value = json!({
            "epoch": 500,
            "min_fee_a": 44,
            "min_fee_b": 155381,
            "coins_per_utxo_size": "4310",
            "coins_per_utxo_word": "34482"
        });
        let params = parse_epoch_parameters(&value).unwrap();
        assert_eq!(params, EpochParameters::new(44, 155_381, 4_310));
    }

    #[test]
    fn test_epoch_parameters_string_fees() {
        let value = json!({"min_fee_a": "44", "min_fee_b": "155381", "coins_per_utxo_size": 4310});
        assert_eq!(
            parse_epoch_parameters(&value).unwrap(),
            EpochParameters::new(44, 155_381, 4_310)
        );
    }

    #[test]
    fn test_epoch_parameters_malformed() {
        let missing = json!({"min_fee_a": 44, "min_fee_b": 155381, "coins_per_utxo_size": null});
        assert!(matches!(
            parse_epoch_parameters(&missing),
            Err(RpcError::InvalidResponse(_))
        ));
        let negative = json!({"min_fee_a": -1, "min_fee_b": 1, "coins_per_utxo_size": "1"});
        assert!(matches!(
            parse_epoch_parameters(&negative),
            Err(RpcError::InvalidResponse(_))
        ));
        let text = json!({"min_fee_a": "lots", "min_fee_b": 1, "coins_per_utxo_size": "1"});
        assert!(matches!(
            parse_epoch_parameters(&text),
            Err(RpcError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_latest_block() {
        let value = json!({
            "hash": "ab",
            "height": 10_000_000,
            "slot": 149_763_236,
            "epoch": 505,
            "tx_count": 3
        });
        let block = parse_latest_block(&value).unwrap();
        assert_eq!(block.slot, 149_763_236);
        assert_eq!(block.epoch, 505);

        let no_slot = json!({"height": 1, "slot": null, "epoch": 1});
        assert!(matches!(
            parse_latest_block(&no_slot),
            Err(RpcError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_utxo_with_tokens() {
        let unit = format!("{}{}", POLICY, hex::encode("WMT"));
        let value = json!({
            "address": ADDRESS,
            "tx_hash": TX_HASH,
            "output_index": 1,
            "amount": [
                {"unit": "lovelace", "quantity": "1500000"},
                {"unit": unit, "quantity": "42"}
            ],
            "block": "00",
            "data_hash": null
        });
        let utxo = parse_utxo(&value).unwrap();
        assert_eq!(utxo.tx_hash_hex(), TX_HASH);
        assert_eq!(utxo.output_index, 1);
        assert_eq!(utxo.lovelace_amount, 1_500_000);
        assert_eq!(utxo.tokens[&TokenId::from_unit(&unit).unwrap()], 42);
        assert_eq!(utxo.address.to_string(), ADDRESS);
    }

    #[test]
    fn test_utxo_rejections() {
        let base = |amount: Value| {
            json!({"address": ADDRESS, "tx_hash": TX_HASH, "output_index": 0, "amount": amount})
        };
        let zero = base(json!([{"unit": "lovelace", "quantity": "0"}]));
        assert!(matches!(parse_utxo(&zero), Err(RpcError::InvalidResponse(_))));

        let unit = format!("{}00", POLICY);
        let dup = base(json!([
            {"unit": "lovelace", "quantity": "5"},
            {"unit": unit, "quantity": "1"},
            {"unit": unit, "quantity": "2"}
        ]));
        assert!(matches!(parse_utxo(&dup), Err(RpcError::InvalidResponse(_))));

        let mut bad_hash = base(json!([{"unit": "lovelace", "quantity": "5"}]));
        bad_hash["tx_hash"] = json!("abcd");
        assert!(matches!(parse_utxo(&bad_hash), Err(RpcError::InvalidResponse(_))));

        let mut bad_address = base(json!([{"unit": "lovelace", "quantity": "5"}]));
        bad_address["address"] = json!("addr1xyz");
        assert!(matches!(parse_utxo(&bad_address), Err(RpcError::InvalidResponse(_))));
    }

    #[test]
    fn test_utxos_not_found_is_empty() {
        let value = json!({
            "status_code": 404,
            "error": "Not Found",
            "message": "The requested component has not been found."
        });
        assert!(parse_utxos(&value).unwrap().is_empty());
    }

    #[test]
    fn test_error_bodies() {
        let limited = json!({"status_code": 429, "error": "Too Many Requests", "message": "slow down"});
        assert!(matches!(parse_latest_block(&limited), Err(RpcError::Other(_))));
        let server = json!({"status_code": 500, "error": "Internal Server Error", "message": ""});
        assert!(matches!(parse_utxos(&server), Err(RpcError::Http(_))));
        let not_found = json!({"status_code": 404, "error": "Not Found", "message": ""});
        assert!(matches!(parse_latest_block(&not_found), Err(RpcError::NotFound(_))));
    }

    #[test]
    fn test_utxos_list() {
        let value = json!([
            {"address": ADDRESS, "tx_hash": TX_HASH, "output_index": 0,
             "amount": [{"unit": "lovelace", "quantity": "1000000"}]},
            {"address": ADDRESS, "tx_hash": TX_HASH, "output_index": 1,
             "amount": [{"unit": "lovelace", "quantity": 2000000}]}
        ]);
        let utxos = parse_utxos(&value).unwrap();
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[1].lovelace_amount, 2_000_000);

        assert!(matches!(
            parse_utxos(&json!({"oops": true})),
            Err(RpcError::InvalidResponse(_))
        ));
    }
}
