use anchor_lang::prelude::Pubkey;

/// One planned payout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub holder: Pubkey,
    /// Base units.
    pub amount: u64,
}

/// Ordered payouts for one run, in holder order. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AllocationPlan {
    entries: Vec<Allocation>,
    total_budget: u64,
    min_floor: u64,
}

impl AllocationPlan {
    pub(crate) fn new(entries: Vec<Allocation>, total_budget: u64, min_floor: u64) -> Self {
        Self {
            entries,
            total_budget,
            min_floor,
        }
    }

    pub fn entries(&self) -> &[Allocation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_budget(&self) -> u64 {
        self.total_budget
    }

    pub fn min_floor(&self) -> u64 {
        self.min_floor
    }

    /// Sum of all planned amounts, widened so it cannot overflow.
    pub fn total(&self) -> u128 {
        self.entries.iter().map(|a| a.amount as u128).sum()
    }

    pub fn min_amount(&self) -> Option<u64> {
        self.entries.iter().map(|a| a.amount).min()
    }

    pub fn max_amount(&self) -> Option<u64> {
        self.entries.iter().map(|a| a.amount).max()
    }
}
