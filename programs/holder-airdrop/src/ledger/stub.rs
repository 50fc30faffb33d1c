//! Scripted in-memory ledger for tests.

use std::collections::{HashMap, HashSet, VecDeque};

use anchor_lang::prelude::Pubkey;

use super::{associated_token_address, Ledger, LedgerError, LedgerErrorKind, TransferReceipt};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    AccountExists(Pubkey),
    CreateAccount(Pubkey),
    SubmitTransfer(Pubkey, u64),
}

#[derive(Default)]
pub struct StubLedger {
    pub sender: Pubkey,
    pub calls: Vec<LedgerCall>,
    pub existing_accounts: HashSet<Pubkey>,
    /// Failures returned, in order, by submissions to a recipient before it succeeds.
    pub submit_failures: HashMap<Pubkey, VecDeque<LedgerErrorKind>>,
    pub check_failures: HashMap<Pubkey, VecDeque<LedgerErrorKind>>,
    pub create_failures: HashMap<Pubkey, VecDeque<LedgerErrorKind>>,
    next_signature: u64,
}

impl StubLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_submissions(&mut self, to: Pubkey, kinds: impl IntoIterator<Item = LedgerErrorKind>) {
        self.submit_failures.entry(to).or_default().extend(kinds);
    }

    pub fn fail_checks(&mut self, owner: Pubkey, kinds: impl IntoIterator<Item = LedgerErrorKind>) {
        self.check_failures.entry(owner).or_default().extend(kinds);
    }

    pub fn fail_creates(&mut self, owner: Pubkey, kinds: impl IntoIterator<Item = LedgerErrorKind>) {
        self.create_failures.entry(owner).or_default().extend(kinds);
    }

    pub fn submissions(&self) -> Vec<(Pubkey, u64)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LedgerCall::SubmitTransfer(to, amount) => Some((*to, *amount)),
                _ => None,
            })
            .collect()
    }

    pub fn created(&self) -> Vec<Pubkey> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                LedgerCall::CreateAccount(owner) => Some(*owner),
                _ => None,
            })
            .collect()
    }
}

fn scripted(queue: Option<&mut VecDeque<LedgerErrorKind>>) -> Result<(), LedgerError> {
    match queue.and_then(|q| q.pop_front()) {
        Some(kind) => Err(LedgerError::new(kind, format!("scripted {kind:?}"))),
        None => Ok(()),
    }
}

impl Ledger for StubLedger {
    fn sender(&self) -> Pubkey {
        self.sender
    }

    fn account_exists(&mut self, owner: &Pubkey, _asset: &Pubkey) -> Result<bool, LedgerError> {
        self.calls.push(LedgerCall::AccountExists(*owner));
        scripted(self.check_failures.get_mut(owner))?;
        Ok(self.existing_accounts.contains(owner))
    }

    fn create_account(&mut self, owner: &Pubkey, asset: &Pubkey) -> Result<Pubkey, LedgerError> {
        self.calls.push(LedgerCall::CreateAccount(*owner));
        scripted(self.create_failures.get_mut(owner))?;
        self.existing_accounts.insert(*owner);
        Ok(associated_token_address(owner, asset))
    }

    fn submit_transfer(
        &mut self,
        to: &Pubkey,
        _asset: &Pubkey,
        amount: u64,
    ) -> Result<TransferReceipt, LedgerError> {
        self.calls.push(LedgerCall::SubmitTransfer(*to, amount));
        scripted(self.submit_failures.get_mut(to))?;
        self.next_signature += 1;
        Ok(TransferReceipt {
            signature: format!("sig-{}", self.next_signature),
        })
    }
}
