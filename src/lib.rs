//! Signing, canonical records and proof-of-work mining for a small
//! secp256k1 ledger.

pub mod utils;
pub mod error;
pub mod hash;
pub mod curve;
pub mod crypto;
pub mod transaction;
pub mod criterion;
pub mod block;
pub mod config;
pub mod miner;
pub mod payload;

#[cfg(feature = "worker")]
pub mod worker;
