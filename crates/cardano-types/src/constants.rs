//! Cardano network constants and address header definitions.
//!
//! Reference: CIP-19 (Cardano addresses) and the Shelley ledger CDDL.

use serde::{Deserialize, Serialize};

// =============================================================================
// Network Types
// =============================================================================

/// Network type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Bech32 human-readable prefix for payment addresses.
    pub fn address_hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_ADDRESS_HRP,
            Network::Testnet => TESTNET_ADDRESS_HRP,
        }
    }

    /// Network id carried in the low nibble of the address header byte.
    pub fn network_id(&self) -> u8 {
        match self {
            Network::Mainnet => 1,
            Network::Testnet => 0,
        }
    }

    pub fn from_network_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Network::Mainnet),
            0 => Some(Network::Testnet),
            _ => None,
        }
    }

    pub fn from_address_hrp(hrp: &str) -> Option<Self> {
        match hrp {
            MAINNET_ADDRESS_HRP => Some(Network::Mainnet),
            TESTNET_ADDRESS_HRP => Some(Network::Testnet),
            _ => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

pub const MAINNET_ADDRESS_HRP: &str = "addr";
pub const TESTNET_ADDRESS_HRP: &str = "addr_test";

// =============================================================================
// Address Header
// =============================================================================

/// Shelley address header types (high nibble of the header byte).
pub mod address_type {
    pub const BASE_KEY_KEY: u8 = 0x0;
    pub const BASE_SCRIPT_KEY: u8 = 0x1;
    pub const BASE_KEY_SCRIPT: u8 = 0x2;
    pub const BASE_SCRIPT_SCRIPT: u8 = 0x3;
    pub const POINTER_KEY: u8 = 0x4;
    pub const POINTER_SCRIPT: u8 = 0x5;
    pub const ENTERPRISE_KEY: u8 = 0x6;
    pub const ENTERPRISE_SCRIPT: u8 = 0x7;
    pub const BYRON: u8 = 0x8;
    pub const REWARD_KEY: u8 = 0xe;
    pub const REWARD_SCRIPT: u8 = 0xf;
}

/// Size of a Blake2b-224 key or script hash.
pub const CREDENTIAL_HASH_SIZE: usize = 28;

/// Header byte plus payment and stake credentials.
pub const BASE_ADDRESS_SIZE: usize = 1 + 2 * CREDENTIAL_HASH_SIZE;

/// Header byte plus a single credential.
pub const ENTERPRISE_ADDRESS_SIZE: usize = 1 + CREDENTIAL_HASH_SIZE;

// =============================================================================
// Monetary Units
// =============================================================================

/// Lovelace per ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Size of a transaction id (Blake2b-256).
pub const TX_HASH_SIZE: usize = 32;

/// Size of an Ed25519 public key.
pub const PUBKEY_SIZE: usize = 32;

/// Size of an Ed25519 signature.
pub const SIGNATURE_SIZE: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_id_round_trip() {
        for network in [Network::Mainnet, Network::Testnet] {
            assert_eq!(Network::from_network_id(network.network_id()), Some(network));
            assert_eq!(Network::from_address_hrp(network.address_hrp()), Some(network));
        }
        assert_eq!(Network::from_network_id(7), None);
        assert_eq!(Network::from_address_hrp("stake"), None);
    }

    #[test]
    fn test_base_address_size() {
        assert_eq!(BASE_ADDRESS_SIZE, 57);
        assert_eq!(ENTERPRISE_ADDRESS_SIZE, 29);
    }
}
