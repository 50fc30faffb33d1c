use anchor_lang::prelude::Pubkey;

/// A (source holder, final recipient, amount) triple ready for dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedTransfer {
    pub holder: Pubkey,
    pub recipient: Pubkey,
    /// Base units.
    pub amount: u64,
}

impl ResolvedTransfer {
    pub fn is_mapped(&self) -> bool {
        self.holder != self.recipient
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferState {
    Pending,
    AccountCheck,
    AccountCreate,
    Submitted,
    Retry,
    Confirmed,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Confirmed | TransferState::Failed)
    }
}

/// Per-transfer progress owned by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferRecord {
    pub holder: Pubkey,
    pub recipient: Pubkey,
    pub amount: u64,
    /// Submission attempts made so far.
    pub attempts: u32,
    pub state: TransferState,
    /// Set when the recipient's token account had to be created.
    pub account_created: bool,
    pub signature: Option<String>,
    pub last_error: Option<String>,
}

impl TransferRecord {
    pub fn new(transfer: &ResolvedTransfer) -> Self {
        Self {
            holder: transfer.holder,
            recipient: transfer.recipient,
            amount: transfer.amount,
            attempts: 0,
            state: TransferState::Pending,
            account_created: false,
            signature: None,
            last_error: None,
        }
    }

    pub(crate) fn fail(&mut self, reason: impl Into<String>) {
        self.state = TransferState::Failed;
        self.last_error = Some(reason.into());
    }
}

/// Outcome of one dispatch run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub records: Vec<TransferRecord>,
    pub success_count: usize,
    pub fail_count: usize,
    /// Base units confirmed on the ledger.
    pub total_sent: u64,
    /// Base units in accepted transfers whose outcome is unknown. Charged
    /// against the budget but not counted as sent.
    pub in_doubt: u64,
    pub dry_run: bool,
    /// Recipients whose token account would be created (dry-run account check only).
    pub missing_accounts: Vec<Pubkey>,
}
