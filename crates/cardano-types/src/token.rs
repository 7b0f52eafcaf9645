//! Native token identifiers and balance maps.
//!
//! A token is named by its minting policy (a 28-byte script hash) and an
//! asset name of up to 32 bytes. Blockfrost and most tooling render the pair
//! as a single hex "unit": policy id followed by asset name.

use crate::constants::CREDENTIAL_HASH_SIZE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const POLICY_ID_SIZE: usize = CREDENTIAL_HASH_SIZE;
pub const MAX_ASSET_NAME_SIZE: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("invalid hex in token unit: {0}")]
    Hex(String),

    #[error("policy id must be {POLICY_ID_SIZE} bytes, got {0}")]
    PolicyIdLength(usize),

    #[error("asset name must be at most {MAX_ASSET_NAME_SIZE} bytes, got {0}")]
    AssetNameLength(usize),

    #[error("token balance overflow")]
    Overflow,
}

/// Identifies one native asset. Ordered by policy id, then asset name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenId {
    pub policy_id: [u8; POLICY_ID_SIZE],
    pub asset_name: Vec<u8>,
}

impl TokenId {
    pub fn new(policy_id: [u8; POLICY_ID_SIZE], asset_name: Vec<u8>) -> Result<Self, TokenError> {
        if asset_name.len() > MAX_ASSET_NAME_SIZE {
            return Err(TokenError::AssetNameLength(asset_name.len()));
        }
        Ok(Self {
            policy_id,
            asset_name,
        })
    }

    /// Build from raw policy and name slices, as found on the wire.
    pub fn from_parts(policy_id: &[u8], asset_name: &[u8]) -> Result<Self, TokenError> {
        let policy: [u8; POLICY_ID_SIZE] = policy_id
            .try_into()
            .map_err(|_| TokenError::PolicyIdLength(policy_id.len()))?;
        Self::new(policy, asset_name.to_vec())
    }

    /// Parse a hex unit string (`policy_id || asset_name`).
    pub fn from_unit(unit: &str) -> Result<Self, TokenError> {
        let bytes = hex::decode(unit).map_err(|e| TokenError::Hex(e.to_string()))?;
        if bytes.len() < POLICY_ID_SIZE {
            return Err(TokenError::PolicyIdLength(bytes.len()));
        }
        let (policy, name) = bytes.split_at(POLICY_ID_SIZE);
        Self::from_parts(policy, name)
    }

    pub fn to_unit(&self) -> String {
        let mut unit = hex::encode(self.policy_id);
        unit.push_str(&hex::encode(&self.asset_name));
        unit
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_unit())
    }
}

impl TryFrom<String> for TokenId {
    type Error = TokenError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_unit(&value)
    }
}

impl From<TokenId> for String {
    fn from(token: TokenId) -> Self {
        token.to_unit()
    }
}

/// Token quantities keyed by asset. Zero balances are never stored.
pub type TokenBalances = BTreeMap<TokenId, u64>;

/// Add `other` into `into`, failing on overflow. Zero entries are skipped.
pub fn add_token_balances(into: &mut TokenBalances, other: &TokenBalances) -> Result<(), TokenError> {
    for (token, &quantity) in other {
        if quantity == 0 {
            continue;
        }
        let entry = into.entry(token.clone()).or_insert(0);
        *entry = entry.checked_add(quantity).ok_or(TokenError::Overflow)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "1d7f33bd23d85e1a25d87d86fac4f199c3197a2f7afeb662a0f34e1e";

    fn token(name: &[u8]) -> TokenId {
        TokenId::from_parts(&hex::decode(POLICY).unwrap(), name).unwrap()
    }

    #[test]
    fn test_unit_round_trip() {
        let unit = format!("{}{}", POLICY, hex::encode(b"worldmobiletoken"));
        let id = TokenId::from_unit(&unit).unwrap();
        assert_eq!(id.asset_name, b"worldmobiletoken");
        assert_eq!(id.to_unit(), unit);
    }

    #[test]
    fn test_empty_asset_name() {
        let id = TokenId::from_unit(POLICY).unwrap();
        assert!(id.asset_name.is_empty());
    }

    #[test]
    fn test_rejects_bad_units() {
        assert!(matches!(TokenId::from_unit("zz"), Err(TokenError::Hex(_))));
        assert_eq!(TokenId::from_unit("abcd"), Err(TokenError::PolicyIdLength(2)));
        let long = format!("{}{}", POLICY, "00".repeat(33));
        assert_eq!(TokenId::from_unit(&long), Err(TokenError::AssetNameLength(33)));
    }

    #[test]
    fn test_ordering_policy_then_name() {
        let mut other_policy = [0u8; POLICY_ID_SIZE];
        other_policy[0] = 0xff;
        let late = TokenId::new(other_policy, vec![]).unwrap();
        assert!(token(b"a") < token(b"b"));
        assert!(token(b"zzz") < late);
    }

    #[test]
    fn test_add_token_balances() {
        let mut total = TokenBalances::new();
        let mut a = TokenBalances::new();
        a.insert(token(b"x"), 5);
        a.insert(token(b"y"), 0);
        add_token_balances(&mut total, &a).unwrap();
        add_token_balances(&mut total, &a).unwrap();
        assert_eq!(total.len(), 1);
        assert_eq!(total[&token(b"x")], 10);

        let mut max = TokenBalances::new();
        max.insert(token(b"x"), u64::MAX);
        assert_eq!(add_token_balances(&mut total, &max), Err(TokenError::Overflow));
    }
}
