//! Offering document: the service/tier/pricing catalog.
//!
//! Entities live in keyed ordered collections inside the shared namespace.
//! Cross-entity references are soft: removing a referenced group detaches
//! the reference on dependents, while removing a tier that price rows still
//! point at is refused. The private namespace carries the caller's tier
//! selection and preview cycle for cost projections.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BillingCycle, Collection, DocKind, DocumentModel, DomainError, Keyed, Patch};
use crate::string_id;

mod pricing;

pub use pricing::*;

string_id! {
    /// Service identifier.
    ServiceId
}

string_id! {
    /// Service-group identifier.
    ServiceGroupId
}

string_id! {
    /// Option-group identifier.
    OptionGroupId
}

string_id! {
    /// Tier identifier.
    TierId
}

string_id! {
    /// Pricing-group identifier.
    PricingGroupId
}

string_id! {
    /// Discount identifier.
    DiscountId
}

/// A sellable service, optionally attached to an option group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_group: Option<OptionGroupId>,
}

impl Keyed for Service {
    type Key = ServiceId;

    fn key(&self) -> &ServiceId {
        &self.id
    }
}

/// A grouping of option groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceGroup {
    pub id: ServiceGroupId,
    pub name: String,
}

impl Keyed for ServiceGroup {
    type Key = ServiceGroupId;

    fn key(&self) -> &ServiceGroupId {
        &self.id
    }
}

/// A set of selectable options, optionally attached to a service group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub id: OptionGroupId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_group: Option<ServiceGroupId>,
}

impl Keyed for OptionGroup {
    type Key = OptionGroupId;

    fn key(&self) -> &OptionGroupId {
        &self.id
    }
}

/// A pricing tier customers can select.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub id: TierId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Keyed for Tier {
    type Key = TierId;

    fn key(&self) -> &TierId {
        &self.id
    }
}

/// A standalone price row on a pricing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEntry {
    pub cycle: BillingCycle,
    pub amount: f64,
}

/// A tier-specific override price row on a pricing group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierPriceEntry {
    pub tier: TierId,
    pub cycle: BillingCycle,
    pub amount: f64,
}

/// A priced line of the offering. Regular groups feed recurring totals;
/// add-on groups are excluded from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingGroup {
    pub id: PricingGroupId,
    pub name: String,
    #[serde(default)]
    pub add_on: bool,
    /// Group-level override of the document billing cycle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BillingCycle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<PriceEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tier_prices: Vec<TierPriceEntry>,
}

impl Keyed for PricingGroup {
    type Key = PricingGroupId;

    fn key(&self) -> &PricingGroupId {
        &self.id
    }
}

/// How a discount reduces a price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Multiply by `1 - value / 100`.
    Percentage,
    /// Subtract `value`.
    Fixed,
}

/// A discount applicable to setup pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub kind: DiscountKind,
    pub value: f64,
}

impl Keyed for Discount {
    type Key = DiscountId;

    fn key(&self) -> &DiscountId {
        &self.id
    }
}

/// Durable namespace of an offering document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferingShared {
    #[serde(default)]
    pub services: Collection<Service>,
    #[serde(default)]
    pub service_groups: Collection<ServiceGroup>,
    #[serde(default)]
    pub option_groups: Collection<OptionGroup>,
    #[serde(default)]
    pub tiers: Collection<Tier>,
    #[serde(default)]
    pub pricing_groups: Collection<PricingGroup>,
    #[serde(default)]
    pub discounts: Collection<Discount>,
    /// The document's current global billing cycle.
    #[serde(default)]
    pub billing_cycle: BillingCycle,
}

/// Transient per-caller view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferingView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tier: Option<TierId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_cycle: Option<BillingCycle>,
}

/// Shared-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferingAction {
    AddService {
        id: ServiceId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        option_group: Option<OptionGroupId>,
    },
    UpdateService {
        id: ServiceId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        description: Patch<String>,
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        option_group: Patch<OptionGroupId>,
    },
    RemoveService {
        id: ServiceId,
    },
    AddServiceGroup {
        id: ServiceGroupId,
        name: String,
    },
    RemoveServiceGroup {
        id: ServiceGroupId,
    },
    AddOptionGroup {
        id: OptionGroupId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        service_group: Option<ServiceGroupId>,
    },
    RemoveOptionGroup {
        id: OptionGroupId,
    },
    AddTier {
        id: TierId,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    UpdateTier {
        id: TierId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        description: Patch<String>,
    },
    RemoveTier {
        id: TierId,
    },
    AddPricingGroup {
        id: PricingGroupId,
        name: String,
        #[serde(default)]
        add_on: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        billing_cycle: Option<BillingCycle>,
    },
    UpdatePricingGroup {
        id: PricingGroupId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        add_on: Option<bool>,
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        billing_cycle: Patch<BillingCycle>,
    },
    RemovePricingGroup {
        id: PricingGroupId,
    },
    SetPrice {
        group: PricingGroupId,
        cycle: BillingCycle,
        amount: f64,
    },
    SetTierPrice {
        group: PricingGroupId,
        tier: TierId,
        cycle: BillingCycle,
        amount: f64,
    },
    AddDiscount {
        id: DiscountId,
        kind: DiscountKind,
        value: f64,
    },
    RemoveDiscount {
        id: DiscountId,
    },
    SetBillingCycle {
        cycle: BillingCycle,
    },
}

/// Private-scope actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferingViewAction {
    SelectTier {
        tier: TierId,
    },
    ClearTierSelection,
    SetPreviewCycle {
        #[serde(default)]
        cycle: Option<BillingCycle>,
    },
}

/// Domain errors for offering documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OfferingError {
    #[error("service not found: {id}")]
    ServiceNotFound { id: ServiceId },
    #[error("duplicate service: {id}")]
    DuplicateService { id: ServiceId },
    #[error("service group not found: {id}")]
    ServiceGroupNotFound { id: ServiceGroupId },
    #[error("duplicate service group: {id}")]
    DuplicateServiceGroup { id: ServiceGroupId },
    #[error("option group not found: {id}")]
    OptionGroupNotFound { id: OptionGroupId },
    #[error("duplicate option group: {id}")]
    DuplicateOptionGroup { id: OptionGroupId },
    #[error("tier not found: {id}")]
    TierNotFound { id: TierId },
    #[error("duplicate tier: {id}")]
    DuplicateTier { id: TierId },
    #[error("tier {tier} is referenced by pricing group {group}")]
    TierInUse { tier: TierId, group: PricingGroupId },
    #[error("pricing group not found: {id}")]
    PricingGroupNotFound { id: PricingGroupId },
    #[error("duplicate pricing group: {id}")]
    DuplicatePricingGroup { id: PricingGroupId },
    #[error("discount not found: {id}")]
    DiscountNotFound { id: DiscountId },
    #[error("duplicate discount: {id}")]
    DuplicateDiscount { id: DiscountId },
}

impl DomainError for OfferingError {
    fn code(&self) -> &'static str {
        match self {
            OfferingError::ServiceNotFound { .. } => "SERVICE_NOT_FOUND",
            OfferingError::DuplicateService { .. } => "DUPLICATE_SERVICE",
            OfferingError::ServiceGroupNotFound { .. } => "SERVICE_GROUP_NOT_FOUND",
            OfferingError::DuplicateServiceGroup { .. } => "DUPLICATE_SERVICE_GROUP",
            OfferingError::OptionGroupNotFound { .. } => "OPTION_GROUP_NOT_FOUND",
            OfferingError::DuplicateOptionGroup { .. } => "DUPLICATE_OPTION_GROUP",
            OfferingError::TierNotFound { .. } => "TIER_NOT_FOUND",
            OfferingError::DuplicateTier { .. } => "DUPLICATE_TIER",
            OfferingError::TierInUse { .. } => "TIER_IN_USE",
            OfferingError::PricingGroupNotFound { .. } => "PRICING_GROUP_NOT_FOUND",
            OfferingError::DuplicatePricingGroup { .. } => "DUPLICATE_PRICING_GROUP",
            OfferingError::DiscountNotFound { .. } => "DISCOUNT_NOT_FOUND",
            OfferingError::DuplicateDiscount { .. } => "DUPLICATE_DISCOUNT",
        }
    }
}

fn upsert_price(prices: &mut Vec<PriceEntry>, cycle: BillingCycle, amount: f64) {
    match prices.iter_mut().find(|entry| entry.cycle == cycle) {
        Some(entry) => entry.amount = amount,
        None => prices.push(PriceEntry { cycle, amount }),
    }
}

fn upsert_tier_price(
    entries: &mut Vec<TierPriceEntry>,
    tier: &TierId,
    cycle: BillingCycle,
    amount: f64,
) {
    match entries
        .iter_mut()
        .find(|entry| &entry.tier == tier && entry.cycle == cycle)
    {
        Some(entry) => entry.amount = amount,
        None => entries.push(TierPriceEntry {
            tier: tier.clone(),
            cycle,
            amount,
        }),
    }
}

/// Offering document model.
pub struct OfferingModel;

impl DocumentModel for OfferingModel {
    type Shared = OfferingShared;
    type Private = OfferingView;
    type SharedAction = OfferingAction;
    type PrivateAction = OfferingViewAction;
    type Error = OfferingError;

    const KIND: DocKind = DocKind::Offering;

    fn shared_action_types() -> &'static [&'static str] {
        &[
            "ADD_SERVICE",
            "UPDATE_SERVICE",
            "REMOVE_SERVICE",
            "ADD_SERVICE_GROUP",
            "REMOVE_SERVICE_GROUP",
            "ADD_OPTION_GROUP",
            "REMOVE_OPTION_GROUP",
            "ADD_TIER",
            "UPDATE_TIER",
            "REMOVE_TIER",
            "ADD_PRICING_GROUP",
            "UPDATE_PRICING_GROUP",
            "REMOVE_PRICING_GROUP",
            "SET_PRICE",
            "SET_TIER_PRICE",
            "ADD_DISCOUNT",
            "REMOVE_DISCOUNT",
            "SET_BILLING_CYCLE",
        ]
    }

    fn private_action_types() -> &'static [&'static str] {
        &["SELECT_TIER", "CLEAR_TIER_SELECTION", "SET_PREVIEW_CYCLE"]
    }

    fn apply_shared(
        state: &mut Self::Shared,
        action: &Self::SharedAction,
    ) -> Result<(), Self::Error> {
        match action {
            OfferingAction::AddService {
                id,
                name,
                description,
                option_group,
            } => {
                if let Some(group) = option_group {
                    if !state.option_groups.contains(group) {
                        return Err(OfferingError::OptionGroupNotFound { id: group.clone() });
                    }
                }
                state
                    .services
                    .insert(Service {
                        id: id.clone(),
                        name: name.clone(),
                        description: description.clone(),
                        option_group: option_group.clone(),
                    })
                    .map_err(|dup| OfferingError::DuplicateService { id: dup.id })
            }
            OfferingAction::UpdateService {
                id,
                name,
                description,
                option_group,
            } => {
                if let Patch::Set(group) = option_group {
                    if !state.option_groups.contains(group) {
                        return Err(OfferingError::OptionGroupNotFound { id: group.clone() });
                    }
                }
                let service = state
                    .services
                    .get_mut(id)
                    .ok_or_else(|| OfferingError::ServiceNotFound { id: id.clone() })?;
                if let Some(name) = name {
                    service.name = name.clone();
                }
                description.apply_to(&mut service.description);
                option_group.apply_to(&mut service.option_group);
                Ok(())
            }
            OfferingAction::RemoveService { id } => {
                state
                    .services
                    .remove(id)
                    .ok_or_else(|| OfferingError::ServiceNotFound { id: id.clone() })?;
                Ok(())
            }
            OfferingAction::AddServiceGroup { id, name } => state
                .service_groups
                .insert(ServiceGroup {
                    id: id.clone(),
                    name: name.clone(),
                })
                .map_err(|dup| OfferingError::DuplicateServiceGroup { id: dup.id }),
            OfferingAction::RemoveServiceGroup { id } => {
                state
                    .service_groups
                    .remove(id)
                    .ok_or_else(|| OfferingError::ServiceGroupNotFound { id: id.clone() })?;
                // Detach, never refuse: dependents keep existing unattached.
                for group in state.option_groups.values_mut() {
                    if group.service_group.as_ref() == Some(id) {
                        group.service_group = None;
                    }
                }
                Ok(())
            }
            OfferingAction::AddOptionGroup {
                id,
                name,
                service_group,
            } => {
                if let Some(parent) = service_group {
                    if !state.service_groups.contains(parent) {
                        return Err(OfferingError::ServiceGroupNotFound { id: parent.clone() });
                    }
                }
                state
                    .option_groups
                    .insert(OptionGroup {
                        id: id.clone(),
                        name: name.clone(),
                        service_group: service_group.clone(),
                    })
                    .map_err(|dup| OfferingError::DuplicateOptionGroup { id: dup.id })
            }
            OfferingAction::RemoveOptionGroup { id } => {
                state
                    .option_groups
                    .remove(id)
                    .ok_or_else(|| OfferingError::OptionGroupNotFound { id: id.clone() })?;
                for service in state.services.values_mut() {
                    if service.option_group.as_ref() == Some(id) {
                        service.option_group = None;
                    }
                }
                Ok(())
            }
            OfferingAction::AddTier {
                id,
                name,
                description,
            } => state
                .tiers
                .insert(Tier {
                    id: id.clone(),
                    name: name.clone(),
                    description: description.clone(),
                })
                .map_err(|dup| OfferingError::DuplicateTier { id: dup.id }),
            OfferingAction::UpdateTier {
                id,
                name,
                description,
            } => {
                let tier = state
                    .tiers
                    .get_mut(id)
                    .ok_or_else(|| OfferingError::TierNotFound { id: id.clone() })?;
                if let Some(name) = name {
                    tier.name = name.clone();
                }
                description.apply_to(&mut tier.description);
                Ok(())
            }
            OfferingAction::RemoveTier { id } => {
                if !state.tiers.contains(id) {
                    return Err(OfferingError::TierNotFound { id: id.clone() });
                }
                // Refuse, never detach: silently dropping override rows
                // would change computed totals.
                if let Some(group) = state
                    .pricing_groups
                    .iter()
                    .find(|group| group.tier_prices.iter().any(|entry| &entry.tier == id))
                {
                    return Err(OfferingError::TierInUse {
                        tier: id.clone(),
                        group: group.id.clone(),
                    });
                }
                state.tiers.remove(id);
                Ok(())
            }
            OfferingAction::AddPricingGroup {
                id,
                name,
                add_on,
                billing_cycle,
            } => state
                .pricing_groups
                .insert(PricingGroup {
                    id: id.clone(),
                    name: name.clone(),
                    add_on: *add_on,
                    billing_cycle: *billing_cycle,
                    prices: Vec::new(),
                    tier_prices: Vec::new(),
                })
                .map_err(|dup| OfferingError::DuplicatePricingGroup { id: dup.id }),
            OfferingAction::UpdatePricingGroup {
                id,
                name,
                add_on,
                billing_cycle,
            } => {
                let group = state
                    .pricing_groups
                    .get_mut(id)
                    .ok_or_else(|| OfferingError::PricingGroupNotFound { id: id.clone() })?;
                if let Some(name) = name {
                    group.name = name.clone();
                }
                if let Some(add_on) = add_on {
                    group.add_on = *add_on;
                }
                billing_cycle.apply_to(&mut group.billing_cycle);
                Ok(())
            }
            OfferingAction::RemovePricingGroup { id } => {
                state
                    .pricing_groups
                    .remove(id)
                    .ok_or_else(|| OfferingError::PricingGroupNotFound { id: id.clone() })?;
                Ok(())
            }
            OfferingAction::SetPrice {
                group,
                cycle,
                amount,
            } => {
                let pricing = state
                    .pricing_groups
                    .get_mut(group)
                    .ok_or_else(|| OfferingError::PricingGroupNotFound { id: group.clone() })?;
                upsert_price(&mut pricing.prices, *cycle, *amount);
                Ok(())
            }
            OfferingAction::SetTierPrice {
                group,
                tier,
                cycle,
                amount,
            } => {
                if !state.tiers.contains(tier) {
                    return Err(OfferingError::TierNotFound { id: tier.clone() });
                }
                let pricing = state
                    .pricing_groups
                    .get_mut(group)
                    .ok_or_else(|| OfferingError::PricingGroupNotFound { id: group.clone() })?;
                upsert_tier_price(&mut pricing.tier_prices, tier, *cycle, *amount);
                Ok(())
            }
            OfferingAction::AddDiscount { id, kind, value } => state
                .discounts
                .insert(Discount {
                    id: id.clone(),
                    kind: *kind,
                    value: *value,
                })
                .map_err(|dup| OfferingError::DuplicateDiscount { id: dup.id }),
            OfferingAction::RemoveDiscount { id } => {
                state
                    .discounts
                    .remove(id)
                    .ok_or_else(|| OfferingError::DiscountNotFound { id: id.clone() })?;
                Ok(())
            }
            OfferingAction::SetBillingCycle { cycle } => {
                state.billing_cycle = *cycle;
                Ok(())
            }
        }
    }

    fn apply_private(
        state: &mut Self::Private,
        action: &Self::PrivateAction,
    ) -> Result<(), Self::Error> {
        match action {
            OfferingViewAction::SelectTier { tier } => {
                state.selected_tier = Some(tier.clone());
                Ok(())
            }
            OfferingViewAction::ClearTierSelection => {
                state.selected_tier = None;
                Ok(())
            }
            OfferingViewAction::SetPreviewCycle { cycle } => {
                state.preview_cycle = *cycle;
                Ok(())
            }
        }
    }
}
