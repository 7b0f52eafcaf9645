//! Witness attachment.
//!
//! Signing itself happens outside this crate (the keys live in the wallet).
//! What comes back is a list of vkey witnesses, which are merged into the
//! encoded transaction here without touching the body bytes.

use crate::deserializer::{split_transaction, TxParts};
use crate::serializer::{encode_witness, VKEY_WITNESS_KEY};
use crate::transaction::TxWitness;
use crate::TxError;
use minicbor::encode;
use minicbor::Encoder;
use std::convert::Infallible;

/// Append `witnesses` to those already present in `raw_tx`.
///
/// The body is copied byte for byte, so the transaction hash is unchanged.
/// A witness whose public key is already present is skipped.
pub fn apply_signatures(raw_tx: &[u8], witnesses: &[TxWitness]) -> Result<Vec<u8>, TxError> {
    let parts = split_transaction(raw_tx)?;

    let mut merged = parts.witnesses.clone();
    for witness in witnesses {
        if !merged.iter().any(|w| w.public_key == witness.public_key) {
            merged.push(*witness);
        }
    }

    let mut out = Vec::with_capacity(raw_tx.len() + witnesses.len() * 101);
    encode_signed(&mut Encoder::new(&mut out), &parts, &merged)
        .map_err(|e| TxError::Serialize(e.to_string()))?;
    Ok(out)
}

fn encode_signed(
    e: &mut Encoder<&mut Vec<u8>>,
    parts: &TxParts<'_>,
    witnesses: &[TxWitness],
) -> Result<(), encode::Error<Infallible>> {
    e.array(4)?;
    e.writer_mut().extend_from_slice(parts.body);
    e.map(1)?.u64(VKEY_WITNESS_KEY)?.array(witnesses.len() as u64)?;
    for witness in witnesses {
        encode_witness(e, witness)?;
    }
    e.bool(parts.is_valid)?;
    e.writer_mut().extend_from_slice(parts.auxiliary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserializer::deserialize_transaction;
    use crate::serializer::CardanoSerializer;
    use crate::test_support::reference_tx;

    fn unsigned_bytes() -> Vec<u8> {
        let mut tx = reference_tx();
        tx.set_witnesses(Vec::new());
        CardanoSerializer::default().serialize_transaction(&tx).unwrap()
    }

    #[test]
    fn test_apply_preserves_hash() {
        let raw = unsigned_bytes();
        let before = deserialize_transaction(&raw).unwrap();
        assert_eq!(before.witness_count(), 0);

        let witness = TxWitness::new([0x5a; 32], [0xa5; 64]);
        let signed = apply_signatures(&raw, &[witness]).unwrap();
        let after = deserialize_transaction(&signed).unwrap();

        assert_eq!(after.tx_hash(), before.tx_hash());
        assert_eq!(after.raw_body, before.raw_body);
        assert_eq!(after.witnesses, vec![witness]);
    }

    #[test]
    fn test_apply_matches_serializer_output() {
        let witness = TxWitness::new([0x01; 32], [0x02; 64]);
        let mut tx = reference_tx();
        tx.set_witnesses(vec![witness]);
        let expected = CardanoSerializer::default().serialize_transaction(&tx).unwrap();

        let signed = apply_signatures(&unsigned_bytes(), &[witness]).unwrap();
        assert_eq!(signed, expected);
    }

    #[test]
    fn test_apply_appends_and_dedups() {
        let first = TxWitness::new([0x01; 32], [0x02; 64]);
        let second = TxWitness::new([0x03; 32], [0x04; 64]);

        let once = apply_signatures(&unsigned_bytes(), &[first]).unwrap();
        let twice = apply_signatures(&once, &[first, second]).unwrap();
        let decoded = deserialize_transaction(&twice).unwrap();
        assert_eq!(decoded.witnesses, vec![first, second]);
    }

    #[test]
    fn test_apply_empty_list_is_identity() {
        let raw = unsigned_bytes();
        assert_eq!(apply_signatures(&raw, &[]).unwrap(), raw);
    }

    #[test]
    fn test_apply_rejects_garbage() {
        assert!(matches!(
            apply_signatures(&[0xde, 0xad, 0xbe, 0xef], &[]),
            Err(TxError::Parse(_))
        ));
        assert!(apply_signatures(&[], &[]).is_err());
    }
}
