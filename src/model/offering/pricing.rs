//! Derived cost computation over the offering catalog.
//!
//! Everything here is computed on demand from a shared-state snapshot and
//! never written back. Recurring totals are normalized to a monthly amount
//! and scaled by the requested cycle's month count; add-on groups never
//! contribute.

use serde::Serialize;

use crate::domain::{round2, BillingCycle};

use super::{
    Discount, DiscountKind, OfferingShared, OfferingView, PricingGroup, PricingGroupId, TierId,
};

/// Monthly amount resolved for a single pricing group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupCost {
    pub group: PricingGroupId,
    pub monthly_amount: f64,
    /// False when the group has no MONTHLY entry or its amount is zero.
    pub has_price: bool,
    /// True when a tier-specific override supplied the amount.
    pub tier_override: bool,
}

/// Recurring total across all regular (non-add-on) pricing groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecurringCost {
    pub cycle: BillingCycle,
    /// Months covered by one cycle; zero for ONE_TIME.
    pub months: u32,
    pub monthly_total: f64,
    pub cycle_total: f64,
    pub groups: Vec<GroupCost>,
    pub missing_price_groups: Vec<PricingGroupId>,
}

/// Setup price after one discount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectivePrice {
    pub list_amount: f64,
    pub effective_amount: f64,
    pub savings: f64,
    pub savings_percent: f64,
}

/// Resolves the monthly amount for one group. A tier-specific MONTHLY
/// override wins over the standalone MONTHLY price; presence decides,
/// so a zero-amount override still shadows the standalone row.
fn monthly_price(group: &PricingGroup, tier: Option<&TierId>) -> (f64, bool, bool) {
    if let Some(tier) = tier {
        if let Some(entry) = group
            .tier_prices
            .iter()
            .find(|entry| &entry.tier == tier && entry.cycle == BillingCycle::Monthly)
        {
            return (entry.amount, entry.amount != 0.0, true);
        }
    }
    match group
        .prices
        .iter()
        .find(|entry| entry.cycle == BillingCycle::Monthly)
    {
        Some(entry) => (entry.amount, entry.amount != 0.0, false),
        None => (0.0, false, false),
    }
}

/// Computes the recurring cost for a target cycle, optionally resolving
/// tier-specific overrides for `tier`.
pub fn recurring_cost(
    shared: &OfferingShared,
    cycle: BillingCycle,
    tier: Option<&TierId>,
) -> RecurringCost {
    let mut groups = Vec::new();
    let mut missing_price_groups = Vec::new();
    let mut monthly_total = 0.0;

    for group in shared.pricing_groups.iter().filter(|group| !group.add_on) {
        let (monthly_amount, has_price, tier_override) = monthly_price(group, tier);
        if !has_price {
            missing_price_groups.push(group.id.clone());
        }
        monthly_total += monthly_amount;
        groups.push(GroupCost {
            group: group.id.clone(),
            monthly_amount,
            has_price,
            tier_override,
        });
    }

    let monthly_total = round2(monthly_total);
    let months = cycle.recurring_months().unwrap_or(0);
    let cycle_total = round2(monthly_total * f64::from(months));

    RecurringCost {
        cycle,
        months,
        monthly_total,
        cycle_total,
        groups,
        missing_price_groups,
    }
}

/// Applies one discount to a setup amount. Percentage discounts multiply by
/// `1 - value / 100`, fixed discounts subtract `value`; the result is floored
/// at zero and rounded to two decimals.
pub fn effective_setup_price(list_amount: f64, discount: &Discount) -> EffectivePrice {
    let discounted = match discount.kind {
        DiscountKind::Percentage => list_amount * (1.0 - discount.value / 100.0),
        DiscountKind::Fixed => list_amount - discount.value,
    };
    let effective_amount = round2(discounted.max(0.0));
    let savings = round2(list_amount - effective_amount);
    let savings_percent = if list_amount > 0.0 {
        round2(savings / list_amount * 100.0)
    } else {
        0.0
    };

    EffectivePrice {
        list_amount,
        effective_amount,
        savings,
        savings_percent,
    }
}

/// Suggests a billing cycle when a strict majority of regular groups carry
/// an effective cycle different from the document's global one. Ties and
/// pluralities never trigger.
pub fn majority_cycle(shared: &OfferingShared) -> Option<BillingCycle> {
    let effective: Vec<BillingCycle> = shared
        .pricing_groups
        .iter()
        .filter(|group| !group.add_on)
        .map(|group| group.billing_cycle.unwrap_or(shared.billing_cycle))
        .collect();
    if effective.is_empty() {
        return None;
    }

    let candidates = [
        BillingCycle::Monthly,
        BillingCycle::Quarterly,
        BillingCycle::SemiAnnual,
        BillingCycle::Annual,
        BillingCycle::OneTime,
    ];
    for candidate in candidates {
        if candidate == shared.billing_cycle {
            continue;
        }
        let count = effective.iter().filter(|&&cycle| cycle == candidate).count();
        if count * 2 > effective.len() {
            return Some(candidate);
        }
    }
    None
}

/// Computes the cost projection a private view describes: the preview cycle
/// (falling back to the document cycle) with the selected tier's overrides.
pub fn preview_cost(shared: &OfferingShared, view: &OfferingView) -> RecurringCost {
    let cycle = view.preview_cycle.unwrap_or(shared.billing_cycle);
    recurring_cost(shared, cycle, view.selected_tier.as_ref())
}
