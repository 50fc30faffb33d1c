//! Randomized, floor-guaranteed budget split.

use anchor_lang::prelude::Pubkey;
use tracing::debug;

use crate::error::{AirdropError, Result};
use crate::ops::guard;
use crate::state::{Allocation, AllocationPlan};
use crate::utils::simplex::{self, RandomSource, SimplexMethod};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanParams {
    /// Base units available to the whole run.
    pub total_budget: u64,
    /// Base units every holder receives at least.
    pub min_floor: u64,
    /// Dirichlet concentration. Below 1 skews toward a few large shares,
    /// above 1 pushes toward equal shares.
    pub alpha: f64,
}

/// Split `params.total_budget` across `holders`, in holder order.
pub fn plan_allocation<R: RandomSource + ?Sized>(
    holders: &[Pubkey],
    params: &PlanParams,
    rng: &mut R,
) -> Result<AllocationPlan> {
    let n = holders.len();
    if n == 0 {
        return Err(AirdropError::NoHolders);
    }
    if params.total_budget == 0 {
        return Err(AirdropError::InvalidConfig(
            "total budget must be positive".to_string(),
        ));
    }
    if !params.alpha.is_finite() || params.alpha <= 0.0 {
        return Err(AirdropError::InvalidConfig(format!(
            "distribution alpha must be > 0, got {}",
            params.alpha
        )));
    }
    guard::check_preflight(n, params.min_floor, params.total_budget)?;

    // n * m <= T was just checked, so this cannot underflow.
    let floors = params.min_floor * n as u64;
    let remaining = params.total_budget - floors;

    let method = SimplexMethod::for_alpha(params.alpha);
    let point = simplex::draw(n, params.alpha, method, rng);
    let shares = simplex::apportion(remaining, &point);
    debug!(?method, remaining, "simplex drawn");

    let mut entries = Vec::with_capacity(n);
    for (holder, share) in holders.iter().zip(shares) {
        let amount = params
            .min_floor
            .checked_add(share)
            .ok_or(AirdropError::MathOverflow)?;
        entries.push(Allocation {
            holder: *holder,
            amount,
        });
    }

    if entries.len() != n || entries.iter().any(|e| e.amount < params.min_floor) {
        return Err(AirdropError::InvariantViolation(
            "plan does not cover every holder at the floor".to_string(),
        ));
    }
    guard::check_plan_total(entries.iter().map(|e| e.amount), params.total_budget)?;

    Ok(AllocationPlan::new(entries, params.total_budget, params.min_floor))
}
