//! Ledger client seam used by the dispatcher.

use anchor_lang::prelude::Pubkey;
use thiserror::Error;

pub mod rpc;
#[cfg(test)]
pub mod stub;

pub use rpc::RpcLedger;

/// Closed classification of ledger failures. The dispatcher's retry policy
/// switches on this, never on error text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerErrorKind {
    /// The referenced recent blockhash has expired.
    StaleReference,
    /// The endpoint throttled the request.
    RateLimited,
    /// The transaction was accepted but its outcome could not be established.
    /// It may have landed, so it is neither retried nor assumed absent.
    Unconfirmed,
    Other,
}

impl LedgerErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            LedgerErrorKind::StaleReference | LedgerErrorKind::RateLimited
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind:?}: {message}")]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Other, message)
    }
}

/// Result of a confirmed transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferReceipt {
    pub signature: String,
}

/// The three calls the dispatcher makes against the ledger. The sender and
/// its signing key live inside the implementation.
pub trait Ledger {
    /// Address paying for transfers and account creation.
    fn sender(&self) -> Pubkey;

    /// Whether `owner` already has a token account for `asset`.
    fn account_exists(&mut self, owner: &Pubkey, asset: &Pubkey) -> Result<bool, LedgerError>;

    /// Create `owner`'s token account for `asset`, paid by the sender.
    /// Returns the account address.
    fn create_account(&mut self, owner: &Pubkey, asset: &Pubkey) -> Result<Pubkey, LedgerError>;

    /// Transfer `amount` base units of `asset` from the sender to `to`.
    fn submit_transfer(
        &mut self,
        to: &Pubkey,
        asset: &Pubkey,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError>;
}

impl<L: Ledger + ?Sized> Ledger for &mut L {
    fn sender(&self) -> Pubkey {
        (**self).sender()
    }

    fn account_exists(&mut self, owner: &Pubkey, asset: &Pubkey) -> Result<bool, LedgerError> {
        (**self).account_exists(owner, asset)
    }

    fn create_account(&mut self, owner: &Pubkey, asset: &Pubkey) -> Result<Pubkey, LedgerError> {
        (**self).create_account(owner, asset)
    }

    fn submit_transfer(
        &mut self,
        to: &Pubkey,
        asset: &Pubkey,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        (**self).submit_transfer(to, asset, amount)
    }
}

/// Associated token account address: PDA(owner, token_program, mint) under
/// the associated token program.
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    let seeds: &[&[u8]] = &[
        owner.as_ref(),
        anchor_spl::token::ID.as_ref(),
        mint.as_ref(),
    ];
    let (ata, _) = Pubkey::find_program_address(seeds, &anchor_spl::associated_token::ID);
    ata
}
