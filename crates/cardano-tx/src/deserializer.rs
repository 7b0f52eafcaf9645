//! Strict decoding of transactions produced by this crate or a wallet.
//!
//! Only the subset of the ledger format that the engine itself emits is
//! accepted. Anything else is a `TxError::Parse` rather than a guess.

use crate::serializer::{body_key, hash_body, VKEY_WITNESS_KEY};
use crate::transaction::{Outpoint, TxWitness};
use crate::TxError;
use cardano_types::constants::{PUBKEY_SIZE, SIGNATURE_SIZE, TX_HASH_SIZE};
use cardano_types::token::{TokenBalances, TokenId, POLICY_ID_SIZE};
use cardano_types::CardanoAddress;
use minicbor::data::Type;
use minicbor::Decoder;

fn parse_err(e: minicbor::decode::Error) -> TxError {
    TxError::Parse(e.to_string())
}

fn definite(len: Option<u64>, what: &str) -> Result<u64, TxError> {
    len.ok_or_else(|| TxError::Parse(format!("indefinite-length {} not supported", what)))
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], TxError> {
    bytes.try_into().map_err(|_| {
        TxError::Parse(format!("{} must be {} bytes, got {}", what, N, bytes.len()))
    })
}

/// One decoded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedOutput {
    pub address_bytes: Vec<u8>,
    pub amount: u64,
    pub tokens: TokenBalances,
}

impl RestrictedOutput {
    /// The output address, if it is a Shelley address this crate understands.
    pub fn address(&self) -> Option<CardanoAddress> {
        CardanoAddress::from_bytes(&self.address_bytes).ok()
    }
}

/// What can be recovered from raw transaction bytes alone. Input values and
/// owners are not on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedTransaction {
    pub inputs: Vec<Outpoint>,
    pub outputs: Vec<RestrictedOutput>,
    pub fee: u64,
    pub invalid_after: Option<u64>,
    pub witnesses: Vec<TxWitness>,
    pub raw_body: Vec<u8>,
}

impl RestrictedTransaction {
    pub fn witness_count(&self) -> usize {
        self.witnesses.len()
    }

    pub fn tx_hash(&self) -> [u8; TX_HASH_SIZE] {
        hash_body(&self.raw_body)
    }

    pub fn total_outputs_amount(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
    }
}

/// Top-level pieces of an encoded transaction, borrowed from the input.
#[derive(Debug)]
pub(crate) struct TxParts<'a> {
    pub body: &'a [u8],
    pub witnesses: Vec<TxWitness>,
    pub is_valid: bool,
    pub auxiliary: &'a [u8],
}

pub(crate) fn split_transaction(bytes: &[u8]) -> Result<TxParts<'_>, TxError> {
    let mut d = Decoder::new(bytes);
    let len = definite(d.array().map_err(parse_err)?, "transaction")?;
    if len != 4 {
        return Err(TxError::Parse(format!(
            "transaction must have 4 elements, got {}",
            len
        )));
    }

    let body_start = d.position();
    if d.datatype().map_err(parse_err)? != Type::Map {
        return Err(TxError::Parse("transaction body must be a map".into()));
    }
    d.skip().map_err(parse_err)?;
    let body = &bytes[body_start..d.position()];

    let witnesses = decode_witness_set(&mut d)?;
    let is_valid = d.bool().map_err(parse_err)?;

    let aux_start = d.position();
    d.skip().map_err(parse_err)?;
    let auxiliary = &bytes[aux_start..d.position()];

    if d.position() != bytes.len() {
        return Err(TxError::Parse(format!(
            "{} trailing bytes after transaction",
            bytes.len() - d.position()
        )));
    }

    Ok(TxParts {
        body,
        witnesses,
        is_valid,
        auxiliary,
    })
}

/// Decode a serialized transaction into its restricted view.
pub fn deserialize_transaction(bytes: &[u8]) -> Result<RestrictedTransaction, TxError> {
    let parts = split_transaction(bytes)?;
    let mut d = Decoder::new(parts.body);

    let entries = definite(d.map().map_err(parse_err)?, "body")?;
    let mut inputs = None;
    let mut outputs = None;
    let mut fee = None;
    let mut invalid_after = None;

    for _ in 0..entries {
        let key = d.u64().map_err(parse_err)?;
        let duplicate = match key {
            body_key::INPUTS => inputs.replace(decode_inputs(&mut d)?).is_some(),
            body_key::OUTPUTS => outputs.replace(decode_outputs(&mut d)?).is_some(),
            body_key::FEE => fee.replace(d.u64().map_err(parse_err)?).is_some(),
            body_key::INVALID_AFTER => invalid_after
                .replace(d.u64().map_err(parse_err)?)
                .is_some(),
            other => {
                return Err(TxError::Parse(format!("unsupported body key {}", other)));
            }
        };
        if duplicate {
            return Err(TxError::Parse(format!("duplicate body key {}", key)));
        }
    }

    Ok(RestrictedTransaction {
        inputs: inputs.ok_or_else(|| TxError::Parse("body has no inputs".into()))?,
        outputs: outputs.ok_or_else(|| TxError::Parse("body has no outputs".into()))?,
        fee: fee.ok_or_else(|| TxError::Parse("body has no fee".into()))?,
        invalid_after,
        witnesses: parts.witnesses,
        raw_body: parts.body.to_vec(),
    })
}

fn decode_inputs(d: &mut Decoder<'_>) -> Result<Vec<Outpoint>, TxError> {
    let count = definite(d.array().map_err(parse_err)?, "input list")?;
    let mut inputs = Vec::new();
    for _ in 0..count {
        let len = definite(d.array().map_err(parse_err)?, "input")?;
        if len != 2 {
            return Err(TxError::Parse(format!("input must have 2 elements, got {}", len)));
        }
        let txid = fixed::<TX_HASH_SIZE>(d.bytes().map_err(parse_err)?, "input hash")?;
        let index = d.u32().map_err(parse_err)?;
        inputs.push(Outpoint::new(txid, index));
    }
    Ok(inputs)
}

fn decode_outputs(d: &mut Decoder<'_>) -> Result<Vec<RestrictedOutput>, TxError> {
    let count = definite(d.array().map_err(parse_err)?, "output list")?;
    let mut outputs = Vec::new();
    for _ in 0..count {
        let len = definite(d.array().map_err(parse_err)?, "output")?;
        if len != 2 {
            return Err(TxError::Parse(format!("output must have 2 elements, got {}", len)));
        }
        let address_bytes = d.bytes().map_err(parse_err)?.to_vec();
        if address_bytes.is_empty() {
            return Err(TxError::Parse("output address is empty".into()));
        }

        let (amount, tokens) = match d.datatype().map_err(parse_err)? {
            Type::Array => {
                let len = definite(d.array().map_err(parse_err)?, "output value")?;
                if len != 2 {
                    return Err(TxError::Parse(format!(
                        "output value must have 2 elements, got {}",
                        len
                    )));
                }
                let amount = d.u64().map_err(parse_err)?;
                (amount, decode_multiasset(d)?)
            }
            _ => (d.u64().map_err(parse_err)?, TokenBalances::new()),
        };

        outputs.push(RestrictedOutput {
            address_bytes,
            amount,
            tokens,
        });
    }
    Ok(outputs)
}

fn decode_multiasset(d: &mut Decoder<'_>) -> Result<TokenBalances, TxError> {
    let mut tokens = TokenBalances::new();
    let policies = definite(d.map().map_err(parse_err)?, "multiasset")?;
    for _ in 0..policies {
        let policy = fixed::<POLICY_ID_SIZE>(d.bytes().map_err(parse_err)?, "policy id")?;
        let names = definite(d.map().map_err(parse_err)?, "asset map")?;
        for _ in 0..names {
            let name = d.bytes().map_err(parse_err)?.to_vec();
            let quantity = d.u64().map_err(parse_err)?;
            if quantity == 0 {
                return Err(TxError::Parse("zero token quantity".into()));
            }
            let id = TokenId::new(policy, name).map_err(|e| TxError::Parse(e.to_string()))?;
            if tokens.insert(id, quantity).is_some() {
                return Err(TxError::Parse("duplicate token in output".into()));
            }
        }
    }
    Ok(tokens)
}

fn decode_witness_set(d: &mut Decoder<'_>) -> Result<Vec<TxWitness>, TxError> {
    let entries = definite(d.map().map_err(parse_err)?, "witness set")?;
    let mut witnesses = None;
    for _ in 0..entries {
        let key = d.u64().map_err(parse_err)?;
        if key != VKEY_WITNESS_KEY {
            return Err(TxError::Parse(format!("unsupported witness key {}", key)));
        }
        if witnesses.is_some() {
            return Err(TxError::Parse("duplicate witness key".into()));
        }

        let count = definite(d.array().map_err(parse_err)?, "witness list")?;
        let mut list = Vec::new();
        for _ in 0..count {
            let len = definite(d.array().map_err(parse_err)?, "witness")?;
            if len != 2 {
                return Err(TxError::Parse(format!(
                    "witness must have 2 elements, got {}",
                    len
                )));
            }
            let public_key = fixed::<PUBKEY_SIZE>(d.bytes().map_err(parse_err)?, "vkey")?;
            let signature = fixed::<SIGNATURE_SIZE>(d.bytes().map_err(parse_err)?, "signature")?;
            list.push(TxWitness::new(public_key, signature));
        }
        witnesses = Some(list);
    }
    Ok(witnesses.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::CardanoSerializer;
    use crate::test_support::{reference_tx, tokens, REFERENCE_TX_HASH};
    use minicbor::Encoder;

    fn encode(build: impl FnOnce(&mut Encoder<&mut Vec<u8>>)) -> Vec<u8> {
        let mut buf = Vec::new();
        build(&mut Encoder::new(&mut buf));
        buf
    }

    /// `[body, {}, true, null]` with a caller-built body.
    fn wrap_body(body: impl FnOnce(&mut Encoder<&mut Vec<u8>>)) -> Vec<u8> {
        encode(|e| {
            e.array(4).unwrap();
            body(e);
            e.map(0).unwrap().bool(true).unwrap().null().unwrap();
        })
    }

    #[test]
    fn test_decode_reference() {
        let tx = reference_tx();
        let bytes = CardanoSerializer::default().serialize_transaction(&tx).unwrap();
        let decoded = deserialize_transaction(&bytes).unwrap();

        assert_eq!(decoded.inputs, vec![tx.inputs()[0].utxo_outpoint]);
        assert_eq!(decoded.outputs.len(), 2);
        assert_eq!(decoded.outputs[0].amount, 10_000_000);
        assert_eq!(decoded.outputs[1].amount, 24_282_816);
        assert_eq!(
            decoded.outputs[0].address().as_ref(),
            Some(&tx.outputs()[0].address)
        );
        assert_eq!(decoded.fee, 168_317);
        assert_eq!(decoded.invalid_after, Some(149_770_436));
        assert_eq!(decoded.witness_count(), 1);
        assert_eq!(hex::encode(decoded.tx_hash()), REFERENCE_TX_HASH);
    }

    #[test]
    fn test_decode_tokens() {
        let mut tx = reference_tx();
        let balances = tokens(&[(3, "gold", 12), (3, "silver", 1), (4, "", 9)]);
        tx.change_output_mut().unwrap().tokens = balances.clone();
        let bytes = CardanoSerializer::default().serialize_transaction(&tx).unwrap();
        let decoded = deserialize_transaction(&bytes).unwrap();
        assert_eq!(decoded.outputs[1].tokens, balances);
        assert!(decoded.outputs[0].tokens.is_empty());
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = CardanoSerializer::default()
            .serialize_transaction(&reference_tx())
            .unwrap();
        bytes.push(0x00);
        assert!(matches!(deserialize_transaction(&bytes), Err(TxError::Parse(_))));
    }

    #[test]
    fn test_rejects_truncated() {
        let bytes = CardanoSerializer::default()
            .serialize_transaction(&reference_tx())
            .unwrap();
        for cut in [0, 1, 10, bytes.len() - 1] {
            assert!(deserialize_transaction(&bytes[..cut]).is_err());
        }
    }

    #[test]
    fn test_rejects_wrong_top_level_count() {
        let bytes = encode(|e| {
            e.array(3).unwrap().map(0).unwrap().map(0).unwrap().bool(true).unwrap();
        });
        assert!(matches!(deserialize_transaction(&bytes), Err(TxError::Parse(_))));
    }

    #[test]
    fn test_rejects_unknown_body_key() {
        let bytes = wrap_body(|e| {
            e.map(4).unwrap();
            e.u8(0).unwrap().array(0).unwrap();
            e.u8(1).unwrap().array(0).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
            e.u8(7).unwrap().u8(0).unwrap();
        });
        let err = deserialize_transaction(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported body key 7"));
    }

    #[test]
    fn test_rejects_duplicate_body_key() {
        let bytes = wrap_body(|e| {
            e.map(4).unwrap();
            e.u8(0).unwrap().array(0).unwrap();
            e.u8(1).unwrap().array(0).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
        });
        let err = deserialize_transaction(&bytes).unwrap_err();
        assert!(err.to_string().contains("duplicate body key 2"));
    }

    #[test]
    fn test_rejects_missing_fee() {
        let bytes = wrap_body(|e| {
            e.map(2).unwrap();
            e.u8(0).unwrap().array(0).unwrap();
            e.u8(1).unwrap().array(0).unwrap();
        });
        assert!(matches!(deserialize_transaction(&bytes), Err(TxError::Parse(_))));
    }

    #[test]
    fn test_rejects_short_input_hash() {
        let bytes = wrap_body(|e| {
            e.map(3).unwrap();
            e.u8(0).unwrap().array(1).unwrap();
            e.array(2).unwrap().bytes(&[1u8; 31]).unwrap().u8(0).unwrap();
            e.u8(1).unwrap().array(0).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
        });
        let err = deserialize_transaction(&bytes).unwrap_err();
        assert!(err.to_string().contains("input hash"));
    }

    #[test]
    fn test_rejects_input_element_count() {
        let bytes = wrap_body(|e| {
            e.map(3).unwrap();
            e.u8(0).unwrap().array(1).unwrap();
            e.array(3).unwrap().bytes(&[1u8; 32]).unwrap().u8(0).unwrap().u8(0).unwrap();
            e.u8(1).unwrap().array(0).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
        });
        assert!(matches!(deserialize_transaction(&bytes), Err(TxError::Parse(_))));
    }

    #[test]
    fn test_rejects_negative_amount() {
        let bytes = wrap_body(|e| {
            e.map(3).unwrap();
            e.u8(0).unwrap().array(0).unwrap();
            e.u8(1).unwrap().array(1).unwrap();
            e.array(2).unwrap().bytes(&[0x61; 29]).unwrap().i64(-5).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
        });
        assert!(matches!(deserialize_transaction(&bytes), Err(TxError::Parse(_))));
    }

    #[test]
    fn test_rejects_string_where_bytes_expected() {
        let bytes = wrap_body(|e| {
            e.map(3).unwrap();
            e.u8(0).unwrap().array(0).unwrap();
            e.u8(1).unwrap().array(1).unwrap();
            e.array(2).unwrap().str("addr1").unwrap().u8(1).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
        });
        assert!(matches!(deserialize_transaction(&bytes), Err(TxError::Parse(_))));
    }

    #[test]
    fn test_rejects_unsupported_witness_key() {
        let bytes = encode(|e| {
            e.array(4).unwrap();
            e.map(3).unwrap();
            e.u8(0).unwrap().array(0).unwrap();
            e.u8(1).unwrap().array(0).unwrap();
            e.u8(2).unwrap().u8(0).unwrap();
            e.map(1).unwrap().u8(1).unwrap().array(0).unwrap();
            e.bool(true).unwrap().null().unwrap();
        });
        let err = deserialize_transaction(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported witness key 1"));
    }

    #[test]
    fn test_accepts_auxiliary_data() {
        let bytes = encode(|e| {
            e.array(4).unwrap();
            e.map(3).unwrap();
            e.u8(0).unwrap().array(0).unwrap();
            e.u8(1).unwrap().array(0).unwrap();
            e.u8(2).unwrap().u8(9).unwrap();
            e.map(0).unwrap();
            e.bool(true).unwrap();
            e.map(1).unwrap().u16(674).unwrap().str("memo").unwrap();
        });
        let decoded = deserialize_transaction(&bytes).unwrap();
        assert_eq!(decoded.fee, 9);
        assert_eq!(decoded.invalid_after, None);
        assert_eq!(decoded.witness_count(), 0);
    }
}
