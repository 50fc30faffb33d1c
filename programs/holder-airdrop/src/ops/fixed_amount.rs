//! Fixed-amount test mode: one fixed payout to every mapped destination,
//! used to verify an address mapping end to end. Ignores dry-run.

use std::collections::HashSet;

use anchor_lang::prelude::Pubkey;
use tracing::{info, warn};

use crate::constants::FIXED_AMOUNT_CEILING_UNITS;
use crate::error::{AirdropError, Result};
use crate::ledger::Ledger;
use crate::ops::dispatch_transfers::{DispatchConfig, Dispatcher, Pause};
use crate::state::{DispatchReport, RecipientMapping, ResolvedTransfer};
use crate::utils::amount::format_base;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedAmountPlan {
    pub transfers: Vec<ResolvedTransfer>,
    /// Mapping sources that are not current holders; skipped.
    pub stray_sources: Vec<Pubkey>,
}

impl FixedAmountPlan {
    pub fn total(&self) -> Result<u64> {
        self.transfers.iter().try_fold(0u64, |acc, t| {
            acc.checked_add(t.amount).ok_or(AirdropError::MathOverflow)
        })
    }
}

/// Largest accepted fixed amount, in base units.
pub fn fixed_amount_ceiling(decimals: u8) -> Result<u64> {
    10u64
        .checked_pow(decimals as u32)
        .and_then(|scale| scale.checked_mul(FIXED_AMOUNT_CEILING_UNITS))
        .ok_or(AirdropError::MathOverflow)
}

/// Select mapped holders (in holder order) and pair each mapped
/// destination with `amount`.
pub fn plan_fixed_amount(
    holders: &[Pubkey],
    mapping: &RecipientMapping,
    amount: u64,
    decimals: u8,
) -> Result<FixedAmountPlan> {
    if amount == 0 {
        return Err(AirdropError::InvalidConfig(
            "test amount must be positive".to_string(),
        ));
    }
    if amount > fixed_amount_ceiling(decimals)? {
        return Err(AirdropError::InvalidConfig(format!(
            "test amount {} is unreasonably large (ceiling {FIXED_AMOUNT_CEILING_UNITS})",
            format_base(amount, decimals)
        )));
    }
    if mapping.is_empty() {
        return Err(AirdropError::InvalidMapping(
            "address mapping is empty, nothing to test".to_string(),
        ));
    }

    let current: HashSet<&Pubkey> = holders.iter().collect();
    let stray_sources: Vec<Pubkey> = mapping
        .iter()
        .filter(|(source, _)| !current.contains(source))
        .map(|(source, _)| *source)
        .collect();
    if !stray_sources.is_empty() {
        warn!(
            sources = ?stray_sources.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "mapped addresses are not current holders (skipped)"
        );
    }

    let transfers: Vec<ResolvedTransfer> = holders
        .iter()
        .filter_map(|holder| {
            mapping.get(holder).map(|dest| ResolvedTransfer {
                holder: *holder,
                recipient: *dest,
                amount,
            })
        })
        .collect();
    if transfers.is_empty() {
        return Err(AirdropError::InvalidMapping(
            "no address mapping entries match current holders".to_string(),
        ));
    }

    Ok(FixedAmountPlan {
        transfers,
        stray_sources,
    })
}

/// Plan and send the fixed-amount test transfers. The dry-run setting in
/// `config` is overridden.
pub fn run_fixed_amount<L: Ledger, P: Pause>(
    holders: &[Pubkey],
    mapping: &RecipientMapping,
    amount: u64,
    asset: Pubkey,
    ledger: L,
    pause: P,
    mut config: DispatchConfig,
) -> Result<DispatchReport> {
    let plan = plan_fixed_amount(holders, mapping, amount, config.decimals)?;
    let total = plan.total()?;
    let decimals = config.decimals;
    let symbol = config.symbol.clone();

    info!("{}", "=".repeat(60));
    info!("TEST MODE: Address Mapping Verification");
    info!("{}", "=".repeat(60));
    if config.dry_run {
        info!("dry_run is IGNORED in test mode");
    }
    info!(
        "Test plan: {} mapped holder(s), {} {symbol} each, total = {} {symbol}",
        plan.transfers.len(),
        format_base(amount, decimals),
        format_base(total, decimals)
    );
    let n = plan.transfers.len();
    for (i, t) in plan.transfers.iter().enumerate() {
        info!(
            "  [{:>3}/{n}] {} -> {} : {} {symbol}",
            i + 1,
            t.holder,
            t.recipient,
            format_base(t.amount, decimals)
        );
    }

    config.dry_run = false;
    let mut dispatcher = Dispatcher::new(ledger, pause, asset, total, config);
    dispatcher.dispatch(&plan.transfers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::stub::StubLedger;
    use crate::ops::dispatch_transfers::ThreadPause;
    use crate::state::TransferState;
    use crate::utils::amount::units_to_base;
    use std::time::Duration;

    fn dry_config() -> DispatchConfig {
        DispatchConfig {
            max_retries: 3,
            tx_delay: Duration::ZERO,
            dry_run: true,
            dry_run_account_check: false,
            decimals: 6,
            symbol: "USDC".to_string(),
        }
    }

    #[test]
    fn sends_fixed_amount_to_each_mapped_holder_even_in_dry_run() {
        let h1 = Pubkey::new_unique();
        let h2 = Pubkey::new_unique();
        let h3 = Pubkey::new_unique();
        let d1 = Pubkey::new_unique();
        let d2 = Pubkey::new_unique();
        let mapping = RecipientMapping::from_pairs([(h1, d1), (h3, d2)]);
        let amount = units_to_base(0.01, 6).unwrap();

        let mut ledger = StubLedger::new();
        let report = run_fixed_amount(
            &[h1, h2, h3],
            &mapping,
            amount,
            Pubkey::new_unique(),
            &mut ledger,
            ThreadPause,
            dry_config(),
        )
        .unwrap();

        assert!(!report.dry_run);
        assert_eq!(report.success_count, 2);
        assert!(report.records.iter().all(|r| r.state == TransferState::Confirmed));
        assert_eq!(ledger.submissions(), vec![(d1, 10_000), (d2, 10_000)]);
    }

    #[test]
    fn strays_are_reported_and_skipped() {
        let holder = Pubkey::new_unique();
        let stray = Pubkey::new_unique();
        let mapping = RecipientMapping::from_pairs([
            (holder, Pubkey::new_unique()),
            (stray, Pubkey::new_unique()),
        ]);
        let plan = plan_fixed_amount(&[holder], &mapping, 1, 6).unwrap();
        assert_eq!(plan.transfers.len(), 1);
        assert_eq!(plan.stray_sources, vec![stray]);
    }

    #[test]
    fn amount_must_be_positive_and_bounded() {
        let holder = Pubkey::new_unique();
        let mapping = RecipientMapping::from_pairs([(holder, Pubkey::new_unique())]);
        assert!(plan_fixed_amount(&[holder], &mapping, 0, 6).is_err());
        let ceiling = fixed_amount_ceiling(6).unwrap();
        assert_eq!(ceiling, 1_000_000_000_000);
        assert!(plan_fixed_amount(&[holder], &mapping, ceiling, 6).is_ok());
        let err = plan_fixed_amount(&[holder], &mapping, ceiling + 1, 6).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn empty_mapping_or_no_match_is_a_configuration_error() {
        let holder = Pubkey::new_unique();
        let err = plan_fixed_amount(&[holder], &RecipientMapping::new(), 1, 6).unwrap_err();
        assert!(err.is_configuration());

        let mapping = RecipientMapping::from_pairs([(Pubkey::new_unique(), Pubkey::new_unique())]);
        let err = plan_fixed_amount(&[holder], &mapping, 1, 6).unwrap_err();
        assert!(err.is_configuration());
    }
}
