//! Full random airdrop: plan, resolve, display, dispatch.

use anchor_lang::prelude::Pubkey;
use tracing::info;

use crate::error::{AirdropError, Result};
use crate::ledger::Ledger;
use crate::ops::dispatch_transfers::{Dispatcher, Pause};
use crate::ops::guard;
use crate::ops::plan_allocation::{plan_allocation, PlanParams};
use crate::ops::resolve_recipients::{resolve_recipients, Resolution};
use crate::state::{AllocationPlan, DispatchReport, RecipientMapping, ResolvedTransfer};
use crate::utils::address::short_address;
use crate::utils::amount::format_base;
use crate::utils::simplex::RandomSource;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AirdropOutcome {
    pub plan: AllocationPlan,
    pub resolution: Resolution,
    pub plan_lines: Vec<String>,
    pub report: DispatchReport,
}

/// Operator-facing listing, one line per transfer.
pub fn plan_lines(transfers: &[ResolvedTransfer], decimals: u8, symbol: &str) -> Vec<String> {
    let n = transfers.len();
    transfers
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let amount = format_base(t.amount, decimals);
            if t.is_mapped() {
                format!(
                    "[{:>3}/{n}] {} (mapped -> {}) -> {amount} {symbol}",
                    i + 1,
                    short_address(&t.holder),
                    short_address(&t.recipient)
                )
            } else {
                format!("[{:>3}/{n}] {} -> {amount} {symbol}", i + 1, short_address(&t.holder))
            }
        })
        .collect()
}

/// Run the random airdrop for `holders` through `dispatcher`.
pub fn run_airdrop<R, L, P>(
    holders: &[Pubkey],
    mapping: &RecipientMapping,
    params: &PlanParams,
    rng: &mut R,
    dispatcher: &mut Dispatcher<L, P>,
) -> Result<AirdropOutcome>
where
    R: RandomSource + ?Sized,
    L: Ledger,
    P: Pause,
{
    if dispatcher.total_budget() != params.total_budget {
        return Err(AirdropError::InvalidConfig(format!(
            "dispatcher budget {} does not match plan budget {}",
            dispatcher.total_budget(),
            params.total_budget
        )));
    }
    guard::check_preflight(holders.len(), params.min_floor, params.total_budget)?;

    let plan = plan_allocation(holders, params, rng)?;
    guard::check_plan_total(plan.entries().iter().map(|a| a.amount), params.total_budget)?;

    let resolution = resolve_recipients(&plan, mapping);

    let decimals = dispatcher.config().decimals;
    let symbol = dispatcher.config().symbol.clone();
    let total = plan.total();
    info!(
        "Distribution plan ({} holders, total={} {symbol}):",
        plan.len(),
        // total <= budget, which is a u64
        format_base(total as u64, decimals)
    );
    if let (Some(min), Some(max)) = (plan.min_amount(), plan.max_amount()) {
        info!("  Min amount: {} {symbol}", format_base(min, decimals));
        info!("  Max amount: {} {symbol}", format_base(max, decimals));
        let avg = (total / plan.len() as u128) as u64;
        info!("  Avg amount: {} {symbol}", format_base(avg, decimals));
    }
    let lines = plan_lines(&resolution.transfers, decimals, &symbol);
    for line in &lines {
        info!("  {line}");
    }

    let report = dispatcher.dispatch(&resolution.transfers)?;
    Ok(AirdropOutcome {
        plan,
        resolution,
        plan_lines: lines,
        report,
    })
}
