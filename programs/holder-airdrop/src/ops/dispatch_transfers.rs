//! Sequential transfer execution with classified retries.
//!
//! Each transfer walks PENDING → ACCOUNT_CHECK → ACCOUNT_CREATE (if the
//! recipient has no token account) → SUBMITTED → CONFIRMED | RETRY | FAILED.
//! Transfers run one at a time in plan order; waits block the calling thread.

use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use tracing::{error, info, warn};

use crate::constants::{RATE_LIMIT_BACKOFF_STEP_SECS, STALE_REFERENCE_WAIT_SECS};
use crate::error::{AirdropError, Result};
use crate::ledger::{Ledger, LedgerError, LedgerErrorKind};
use crate::ops::guard;
use crate::state::{DispatchReport, ResolvedTransfer, TransferRecord, TransferState};
use crate::utils::address::short_address;
use crate::utils::amount::format_base;

/// Blocking wait used between transfers and before retries.
pub trait Pause {
    fn pause(&mut self, duration: Duration);
}

impl<P: Pause + ?Sized> Pause for &mut P {
    fn pause(&mut self, duration: Duration) {
        (**self).pause(duration)
    }
}

/// Sleeps the current thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Attempts per ledger call, shared by both transient failure kinds.
    pub max_retries: u32,
    /// Delay between consecutive transfers.
    pub tx_delay: Duration,
    pub dry_run: bool,
    /// In dry-run, still query whether each recipient's token account exists.
    pub dry_run_account_check: bool,
    pub decimals: u8,
    pub symbol: String,
}

/// Wait before retrying after a failure of `kind` on 1-based `attempt`, or
/// `None` when the failure is not retryable.
pub fn retry_wait(kind: LedgerErrorKind, attempt: u32) -> Option<Duration> {
    match kind {
        LedgerErrorKind::StaleReference => Some(Duration::from_secs(STALE_REFERENCE_WAIT_SECS)),
        LedgerErrorKind::RateLimited => Some(Duration::from_secs(
            RATE_LIMIT_BACKOFF_STEP_SECS.saturating_mul(attempt as u64),
        )),
        LedgerErrorKind::Unconfirmed | LedgerErrorKind::Other => None,
    }
}

/// Run `op` until it succeeds, fails permanently, or `max_retries` attempts
/// are used. The outer error is fatal and stops retrying immediately.
fn with_retries<T, P: Pause + ?Sized>(
    pause: &mut P,
    max_retries: u32,
    stage: &str,
    mut op: impl FnMut(u32) -> Result<Result<T, LedgerError>>,
) -> Result<Result<T, LedgerError>> {
    let max = max_retries.max(1);
    let mut attempt = 1;
    loop {
        let err = match op(attempt)? {
            Ok(value) => return Ok(Ok(value)),
            Err(err) => err,
        };
        let wait = match retry_wait(err.kind, attempt) {
            Some(wait) if attempt < max => wait,
            _ => return Ok(Err(err)),
        };
        warn!(
            "  {stage}: {:?} (attempt {attempt}/{max}), retrying in {}s...",
            err.kind,
            wait.as_secs()
        );
        pause.pause(wait);
        attempt += 1;
    }
}

/// Executes resolved transfers against a ledger. Owns the cumulative-sent
/// counter for the run.
pub struct Dispatcher<L: Ledger, P: Pause> {
    ledger: L,
    pause: P,
    asset: Pubkey,
    total_budget: u64,
    cumulative_sent: u64,
    /// Accepted but unconfirmed amounts; may have landed.
    in_doubt: u64,
    config: DispatchConfig,
}

impl<L: Ledger, P: Pause> Dispatcher<L, P> {
    pub fn new(ledger: L, pause: P, asset: Pubkey, total_budget: u64, config: DispatchConfig) -> Self {
        Self {
            ledger,
            pause,
            asset,
            total_budget,
            cumulative_sent: 0,
            in_doubt: 0,
            config,
        }
    }

    pub fn cumulative_sent(&self) -> u64 {
        self.cumulative_sent
    }

    pub fn in_doubt(&self) -> u64 {
        self.in_doubt
    }

    /// Amount the budget guard charges: confirmed plus in-doubt.
    fn committed(&self) -> Result<u64> {
        self.cumulative_sent
            .checked_add(self.in_doubt)
            .ok_or(AirdropError::MathOverflow)
    }

    pub fn total_budget(&self) -> u64 {
        self.total_budget
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    fn fmt(&self, amount: u64) -> String {
        format!("{} {}", format_base(amount, self.config.decimals), self.config.symbol)
    }

    /// Execute every transfer in order. A permanent failure is recorded and
    /// the run continues; an invariant violation aborts the rest of the run.
    pub fn dispatch(&mut self, transfers: &[ResolvedTransfer]) -> Result<DispatchReport> {
        let mut report = DispatchReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        if self.config.dry_run {
            self.preview(transfers, &mut report)?;
            return Ok(report);
        }

        info!("Sender address: {}", self.ledger.sender());
        let total = transfers.len();
        for (i, transfer) in transfers.iter().enumerate() {
            let mut record = TransferRecord::new(transfer);
            if transfer.is_mapped() {
                info!(
                    "[{:>3}/{total}] Sending {} to {} (on behalf of holder {}) ...",
                    i + 1,
                    self.fmt(transfer.amount),
                    transfer.recipient,
                    transfer.holder
                );
            } else {
                info!(
                    "[{:>3}/{total}] Sending {} to {} ...",
                    i + 1,
                    self.fmt(transfer.amount),
                    transfer.recipient
                );
            }

            if let Err(fatal) = self.execute(&mut record) {
                error!(
                    confirmed = report.success_count,
                    "aborting run: {fatal}; confirmed transfers are final"
                );
                report.records.push(record);
                return Err(fatal);
            }

            match record.state {
                TransferState::Confirmed => report.success_count += 1,
                _ => report.fail_count += 1,
            }
            report.total_sent = self.cumulative_sent;
            report.in_doubt = self.in_doubt;
            report.records.push(record);

            if i + 1 < total {
                self.pause.pause(self.config.tx_delay);
            }
        }

        info!("{}", "=".repeat(60));
        info!("Airdrop complete!");
        info!("  Success: {}", report.success_count);
        info!("  Failed : {}", report.fail_count);
        info!(
            "  Total sent: {} / {}",
            format_base(report.total_sent, self.config.decimals),
            self.fmt(self.total_budget)
        );
        if report.in_doubt > 0 {
            warn!(
                "  Unconfirmed: {} may have landed, check the signatures before rerunning",
                self.fmt(report.in_doubt)
            );
        }
        info!("{}", "=".repeat(60));
        Ok(report)
    }

    /// Drive one record to a terminal state. Only fatal errors are returned.
    fn execute(&mut self, record: &mut TransferRecord) -> Result<()> {
        guard::check_cumulative(self.committed()?, record.amount, self.total_budget)?;
        let max = self.config.max_retries;
        let asset = self.asset;
        let recipient = record.recipient;

        record.state = TransferState::AccountCheck;
        let exists = with_retries(&mut self.pause, max, "account check", |_| {
            Ok(self.ledger.account_exists(&recipient, &asset))
        })?;
        let exists = match exists {
            Ok(exists) => exists,
            Err(e) => {
                error!("  Failed: account check for {recipient}: {e}");
                record.fail(e.to_string());
                return Ok(());
            }
        };

        if !exists {
            record.state = TransferState::AccountCreate;
            info!("  Creating token account for {recipient}");
            let created = with_retries(&mut self.pause, max, "account create", |_| {
                Ok(self.ledger.create_account(&recipient, &asset))
            })?;
            if let Err(e) = created {
                error!("  Failed: account creation for {recipient}: {e}");
                record.fail(e.to_string());
                return Ok(());
            }
            record.account_created = true;
        }

        let (sent, budget) = (self.committed()?, self.total_budget);
        let submitted = with_retries(&mut self.pause, max, "transfer", |attempt| {
            guard::check_cumulative(sent, record.amount, budget)?;
            record.attempts = attempt;
            record.state = TransferState::Submitted;
            let res = self.ledger.submit_transfer(&recipient, &asset, record.amount);
            if matches!(&res, Err(e) if e.kind.is_transient()) {
                record.state = TransferState::Retry;
            }
            Ok(res)
        })?;

        match submitted {
            Ok(receipt) => {
                self.cumulative_sent = self
                    .cumulative_sent
                    .checked_add(record.amount)
                    .ok_or(AirdropError::MathOverflow)?;
                record.state = TransferState::Confirmed;
                info!(
                    "  TX: {}  (cumulative: {})",
                    receipt.signature,
                    self.fmt(self.cumulative_sent)
                );
                record.signature = Some(receipt.signature);
            }
            Err(e) if e.kind == LedgerErrorKind::Unconfirmed => {
                self.in_doubt = self
                    .in_doubt
                    .checked_add(record.amount)
                    .ok_or(AirdropError::MathOverflow)?;
                error!("  Outcome unknown, amount held against the budget: {e}");
                record.fail(format!("outcome unknown: {e}"));
            }
            Err(e) => {
                let reason = if e.kind.is_transient() {
                    format!("gave up after {} attempts: {e}", record.attempts)
                } else {
                    e.to_string()
                };
                error!("  Failed: {reason}");
                record.fail(reason);
            }
        }
        Ok(())
    }

    fn preview(&mut self, transfers: &[ResolvedTransfer], report: &mut DispatchReport) -> Result<()> {
        info!("[DRY RUN] No transactions will be sent.");
        let max = self.config.max_retries;
        let asset = self.asset;
        for transfer in transfers {
            let mut record = TransferRecord::new(transfer);
            if self.config.dry_run_account_check {
                record.state = TransferState::AccountCheck;
                let recipient = transfer.recipient;
                let exists = with_retries(&mut self.pause, max, "account check", |_| {
                    Ok(self.ledger.account_exists(&recipient, &asset))
                })?;
                match exists {
                    Ok(true) => {}
                    Ok(false) => {
                        info!("  would create token account for {}", short_address(&recipient));
                        report.missing_accounts.push(recipient);
                    }
                    Err(e) => warn!("  account check for {recipient} failed: {e}"),
                }
            }
            report.records.push(record);
        }
        Ok(())
    }
}
