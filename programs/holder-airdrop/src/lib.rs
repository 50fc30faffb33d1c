//! Randomized SPL token airdrop to NFT holders.
//!
//! The budget is split with a floor-guaranteed Dirichlet draw, remapped to
//! recipient addresses, and sent one transfer at a time with classified
//! retries.

pub mod config;
pub mod constants;
pub mod error;
pub mod holders;
pub mod ledger;
pub mod ops;
pub mod state;
pub mod utils;

pub use error::{AirdropError, Result};
