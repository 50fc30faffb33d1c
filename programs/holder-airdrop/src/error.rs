use thiserror::Error;

use crate::ledger::LedgerError;

/// Error codes for the airdrop pipeline.
#[derive(Debug, Error)]
pub enum AirdropError {
    #[error(
        "Minimum floor exceeds budget: {holders} holders x {min_floor} = {required} base units needed, budget is {budget}"
    )]
    BudgetExceeded {
        holders: usize,
        min_floor: u64,
        required: u128,
        budget: u64,
    },

    #[error("Invalid public key: {0}")]
    InvalidPubkey(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid address mapping: {0}")]
    InvalidMapping(String),

    #[error("No holders found")]
    NoHolders,

    #[error("Holder discovery failed: {0}")]
    HolderDiscovery(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Math overflow")]
    MathOverflow,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AirdropError {
    /// Errors raised before any ledger interaction because the inputs are unusable.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AirdropError::BudgetExceeded { .. }
                | AirdropError::InvalidPubkey(_)
                | AirdropError::InvalidConfig(_)
                | AirdropError::InvalidMapping(_)
                | AirdropError::NoHolders
        )
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, AirdropError::InvariantViolation(_))
    }
}

pub type Result<T, E = AirdropError> = std::result::Result<T, E>;
