//! Cardano Shelley address parsing, validation, and encoding.
//!
//! Addresses are carried as raw bytes (what goes on the wire) and rendered as
//! bech32 with the `addr` / `addr_test` prefix.

use crate::constants::{
    address_type, Network, BASE_ADDRESS_SIZE, ENTERPRISE_ADDRESS_SIZE,
};
use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must be a non-empty string")]
    Empty,

    #[error("bech32 decode error: {0}")]
    Bech32(String),

    #[error("unknown address prefix: {0}")]
    UnknownPrefix(String),

    #[error("address payload is empty")]
    EmptyPayload,

    #[error("unsupported address type: 0x{0:x}")]
    UnsupportedType(u8),

    #[error("unknown network id: {0}")]
    UnknownNetworkId(u8),

    #[error("invalid length {actual} for address type 0x{header_type:x}")]
    InvalidLength { header_type: u8, actual: usize },

    #[error("address network id {found} does not match prefix network {expected}")]
    NetworkMismatch { expected: Network, found: u8 },
}

/// A Shelley-era payment or reward address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardanoAddress {
    bytes: Vec<u8>,
}

impl CardanoAddress {
    /// Parse a bech32 address string.
    pub fn from_string(address: &str) -> Result<Self, AddressError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(AddressError::Empty);
        }

        let (hrp, data) =
            bech32::decode(address).map_err(|e| AddressError::Bech32(e.to_string()))?;
        let hrp = hrp.to_lowercase();
        let network =
            Network::from_address_hrp(&hrp).ok_or(AddressError::UnknownPrefix(hrp))?;

        let parsed = Self::from_bytes(&data)?;
        let found = parsed.bytes[0] & 0x0f;
        if found != network.network_id() {
            return Err(AddressError::NetworkMismatch {
                expected: network,
                found,
            });
        }
        Ok(parsed)
    }

    /// Build an address from its raw wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let header = *bytes.first().ok_or(AddressError::EmptyPayload)?;
        let header_type = header >> 4;
        let network_id = header & 0x0f;
        if Network::from_network_id(network_id).is_none() {
            return Err(AddressError::UnknownNetworkId(network_id));
        }

        let len_ok = match header_type {
            address_type::BASE_KEY_KEY
            | address_type::BASE_SCRIPT_KEY
            | address_type::BASE_KEY_SCRIPT
            | address_type::BASE_SCRIPT_SCRIPT => bytes.len() == BASE_ADDRESS_SIZE,
            // Pointer addresses append three variable-length integers.
            address_type::POINTER_KEY | address_type::POINTER_SCRIPT => {
                bytes.len() > ENTERPRISE_ADDRESS_SIZE
            }
            address_type::ENTERPRISE_KEY
            | address_type::ENTERPRISE_SCRIPT
            | address_type::REWARD_KEY
            | address_type::REWARD_SCRIPT => bytes.len() == ENTERPRISE_ADDRESS_SIZE,
            _ => return Err(AddressError::UnsupportedType(header_type)),
        };
        if !len_ok {
            return Err(AddressError::InvalidLength {
                header_type,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Raw address bytes as written into transaction outputs.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn network(&self) -> Network {
        if self.bytes[0] & 0x0f == Network::Mainnet.network_id() {
            Network::Mainnet
        } else {
            Network::Testnet
        }
    }

    /// Address type from the header's high nibble.
    pub fn header_type(&self) -> u8 {
        self.bytes[0] >> 4
    }

    pub fn is_reward(&self) -> bool {
        matches!(
            self.header_type(),
            address_type::REWARD_KEY | address_type::REWARD_SCRIPT
        )
    }
}

impl fmt::Display for CardanoAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = Hrp::parse(self.network().address_hrp()).map_err(|_| fmt::Error)?;
        let encoded = bech32::encode::<Bech32>(hrp, &self.bytes).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for CardanoAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl TryFrom<String> for CardanoAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_string(&value)
    }
}

impl From<CardanoAddress> for String {
    fn from(address: CardanoAddress) -> Self {
        address.to_string()
    }
}
