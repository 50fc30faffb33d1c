//! Safety checks shared by the planner and the dispatcher.

use anchor_lang::prelude::Pubkey;

use crate::error::{AirdropError, Result};
use crate::utils::address::parse_pubkey;

/// `holders * min_floor <= budget`, checked before any randomness is drawn.
pub fn check_preflight(holders: usize, min_floor: u64, budget: u64) -> Result<()> {
    let required = (holders as u128)
        .checked_mul(min_floor as u128)
        .ok_or(AirdropError::MathOverflow)?;
    if required > budget as u128 {
        return Err(AirdropError::BudgetExceeded {
            holders,
            min_floor,
            required,
            budget,
        });
    }
    Ok(())
}

/// The generated plan must not exceed the budget.
pub fn check_plan_total(amounts: impl IntoIterator<Item = u64>, budget: u64) -> Result<()> {
    let total: u128 = amounts.into_iter().map(|a| a as u128).sum();
    if total > budget as u128 {
        return Err(AirdropError::InvariantViolation(format!(
            "plan total {total} exceeds budget {budget}"
        )));
    }
    Ok(())
}

/// `cumulative_sent + next_amount <= budget` before a submission.
pub fn check_cumulative(cumulative_sent: u64, next_amount: u64, budget: u64) -> Result<()> {
    let after = cumulative_sent as u128 + next_amount as u128;
    if after > budget as u128 {
        return Err(AirdropError::InvariantViolation(format!(
            "sending {next_amount} would bring cumulative total to {after}, budget is {budget}"
        )));
    }
    Ok(())
}

/// A string is a well-formed ledger address.
pub fn check_address(raw: &str) -> Result<Pubkey> {
    parse_pubkey(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_allows_exact_fit() {
        assert!(check_preflight(3, 1, 3).is_ok());
        assert!(check_preflight(3, 0, 1).is_ok());
    }

    #[test]
    fn preflight_rejects_overcommitted_floor() {
        let err = check_preflight(4, 3, 10).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, AirdropError::BudgetExceeded { required: 12, .. }));
    }

    #[test]
    fn preflight_does_not_overflow() {
        assert!(check_preflight(usize::MAX, u64::MAX, u64::MAX).is_err());
    }

    #[test]
    fn plan_total_over_budget_is_an_invariant_violation() {
        assert!(check_plan_total([4, 3, 3], 10).is_ok());
        let err = check_plan_total([4, 4, 3], 10).unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[test]
    fn cumulative_check_rejects_overspend() {
        assert!(check_cumulative(7, 3, 10).is_ok());
        assert!(check_cumulative(10, 1, 10).unwrap_err().is_invariant_violation());
        assert!(check_cumulative(u64::MAX, u64::MAX, u64::MAX).is_err());
    }

    #[test]
    fn address_check_rejects_garbage() {
        assert!(check_address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").is_ok());
        assert!(check_address("hello world").is_err());
    }
}
