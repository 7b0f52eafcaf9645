//! Cardano chain-state values and Blockfrost response parsing.
//!
//! The transport itself (HTTP, batching, throttling) lives elsewhere. This
//! crate turns Blockfrost-shaped JSON into the typed values the transaction
//! engine consumes.
//!
//! # Example
//!
//! ```ignore
//! use cardano_rpc::{parse_body, EpochParameters};
//!
//! let body = parse_body(r#"{"min_fee_a":44,"min_fee_b":155381,"coins_per_utxo_size":"4310"}"#)?;
//! let params = cardano_rpc::blockfrost::parse_epoch_parameters(&body)?;
//! assert_eq!(params.min_fee_coefficient, 44);
//! ```

pub mod error;
pub mod blockfrost;
pub mod types;

pub use cardano_types::EpochParameters;
pub use error::RpcError;
pub use types::{LatestBlock, UnspentOutput};

/// Parse a raw response body.
pub fn parse_body(body: &str) -> Result<serde_json::Value, RpcError> {
    Ok(serde_json::from_str(body)?)
}
