use std::collections::BTreeMap;

use anchor_lang::prelude::Pubkey;
use tracing::{info, warn};

use crate::state::{AllocationPlan, RecipientMapping, ResolvedTransfer};

/// Several holders paying out to the same recipient. Each stays an
/// independent transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationCollision {
    pub destination: Pubkey,
    pub sources: Vec<Pubkey>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub transfers: Vec<ResolvedTransfer>,
    pub collisions: Vec<DestinationCollision>,
    pub mapped_count: usize,
}

/// Apply `mapping` to every planned payout, keeping plan order.
pub fn resolve_recipients(plan: &AllocationPlan, mapping: &RecipientMapping) -> Resolution {
    let mut transfers = Vec::with_capacity(plan.len());
    let mut by_destination: BTreeMap<Pubkey, Vec<Pubkey>> = BTreeMap::new();
    let mut mapped_count = 0usize;

    for allocation in plan.entries() {
        let holder = allocation.holder;
        let recipient = match mapping.get(&holder) {
            Some(dest) if *dest == holder => {
                warn!(%holder, "ignoring self-mapping");
                holder
            }
            Some(dest) => {
                mapped_count += 1;
                info!("  holder {holder} mapped to {dest}");
                *dest
            }
            None => holder,
        };
        by_destination.entry(recipient).or_default().push(holder);
        transfers.push(ResolvedTransfer {
            holder,
            recipient,
            amount: allocation.amount,
        });
    }

    let collisions: Vec<DestinationCollision> = by_destination
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(destination, sources)| DestinationCollision {
            destination,
            sources,
        })
        .collect();
    for c in &collisions {
        warn!(
            destination = %c.destination,
            sources = ?c.sources.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "multiple holders map to the same recipient"
        );
    }

    if !mapping.is_empty() {
        info!(
            "address mapping applied: {mapped_count} of {} holders remapped",
            plan.len()
        );
    }

    Resolution {
        transfers,
        collisions,
        mapped_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Allocation;

    fn plan_of(amounts: &[(Pubkey, u64)]) -> AllocationPlan {
        let entries = amounts
            .iter()
            .map(|(holder, amount)| Allocation {
                holder: *holder,
                amount: *amount,
            })
            .collect::<Vec<_>>();
        let total = amounts.iter().map(|(_, a)| a).sum();
        AllocationPlan::new(entries, total, 0)
    }

    #[test]
    fn unmapped_holders_pass_through() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let res = resolve_recipients(&plan_of(&[(a, 5), (b, 7)]), &RecipientMapping::new());
        assert_eq!(res.mapped_count, 0);
        assert!(res.collisions.is_empty());
        assert_eq!(res.transfers[0].recipient, a);
        assert_eq!(res.transfers[1].recipient, b);
        assert!(!res.transfers[1].is_mapped());
    }

    #[test]
    fn mapped_holder_is_substituted() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let dest = Pubkey::new_unique();
        let mapping = RecipientMapping::from_pairs([(b, dest)]);
        let res = resolve_recipients(&plan_of(&[(a, 5), (b, 7)]), &mapping);
        assert_eq!(res.mapped_count, 1);
        assert_eq!(res.transfers[1].holder, b);
        assert_eq!(res.transfers[1].recipient, dest);
        assert_eq!(res.transfers[1].amount, 7);
    }

    #[test]
    fn two_sources_one_destination_warns_once_and_keeps_both() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let c = Pubkey::new_unique();
        let dest = Pubkey::new_unique();
        let mapping = RecipientMapping::from_pairs([(a, dest), (b, dest)]);
        let res = resolve_recipients(&plan_of(&[(a, 1), (b, 2), (c, 3)]), &mapping);
        assert_eq!(res.transfers.len(), 3);
        assert_eq!(res.collisions.len(), 1);
        assert_eq!(res.collisions[0].destination, dest);
        assert_eq!(res.collisions[0].sources, vec![a, b]);
        let to_dest: Vec<u64> = res
            .transfers
            .iter()
            .filter(|t| t.recipient == dest)
            .map(|t| t.amount)
            .collect();
        assert_eq!(to_dest, vec![1, 2]);
    }

    #[test]
    fn mapping_onto_another_holder_is_a_collision() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let mapping = RecipientMapping::from_pairs([(a, b)]);
        let res = resolve_recipients(&plan_of(&[(a, 1), (b, 2)]), &mapping);
        assert_eq!(res.collisions.len(), 1);
        assert_eq!(res.collisions[0].sources, vec![a, b]);
    }

    #[test]
    fn self_mapping_is_ignored_without_error() {
        let a = Pubkey::new_unique();
        let mut mapping = RecipientMapping::new();
        mapping.insert_unchecked(a, a);
        let res = resolve_recipients(&plan_of(&[(a, 4)]), &mapping);
        assert_eq!(res.mapped_count, 0);
        assert_eq!(res.transfers[0].recipient, a);
    }
}
