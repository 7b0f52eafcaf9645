//! Core types and constants for the Cardano transaction engine.
//!
//! This crate provides the foundational types shared by the other crates:
//! network constants, bech32 address encoding/decoding, native token
//! identifiers, and the protocol fee parameters.

pub mod address;
pub mod constants;
pub mod params;
pub mod token;

pub use address::{AddressError, CardanoAddress};
pub use constants::Network;
pub use params::EpochParameters;
pub use token::{TokenBalances, TokenError, TokenId};
