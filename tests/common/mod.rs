//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use document_engine::model::{ComplianceModel, OfferingModel, ProvisioningModel, WorkplanModel};
use document_engine::{ApplyOutcome, Document, DocumentId, DocumentModel, RawAction};

/// Fixed document ID for reproducible fixtures
pub fn test_document_id() -> DocumentId {
    DocumentId::from_uuid(Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap())
}

/// Fixed creation timestamp
pub fn test_created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

/// Deterministic timestamp n hours after the fixture epoch
pub fn hours_after(n: i64) -> DateTime<Utc> {
    test_created_at() + chrono::Duration::hours(n)
}

pub fn new_document<M: DocumentModel>() -> Document<M> {
    Document::new(test_document_id(), test_created_at())
}

/// Apply a shared action and panic unless it lands as applied
pub fn apply_shared<M: DocumentModel>(
    doc: &mut Document<M>,
    action_type: &str,
    payload: Value,
) -> u64 {
    let outcome = doc
        .apply(&RawAction::shared(action_type, payload))
        .unwrap_or_else(|violation| panic!("{action_type} failed the gate: {violation}"));
    match outcome {
        ApplyOutcome::Applied { index } => index,
        other => panic!("{action_type} was not applied: {other:?}"),
    }
}

/// Apply a private action and panic unless it lands as applied
pub fn apply_private<M: DocumentModel>(
    doc: &mut Document<M>,
    action_type: &str,
    payload: Value,
) -> u64 {
    let outcome = doc
        .apply(&RawAction::private(action_type, payload))
        .unwrap_or_else(|violation| panic!("{action_type} failed the gate: {violation}"));
    match outcome {
        ApplyOutcome::Applied { index } => index,
        other => panic!("{action_type} was not applied: {other:?}"),
    }
}

/// Apply a shared action expected to be rejected; returns the error code
pub fn apply_shared_rejected<M: DocumentModel>(
    doc: &mut Document<M>,
    action_type: &str,
    payload: Value,
) -> String {
    let outcome = doc
        .apply(&RawAction::shared(action_type, payload))
        .unwrap_or_else(|violation| panic!("{action_type} failed the gate: {violation}"));
    match outcome.error() {
        Some(error) => error.code.clone(),
        None => panic!("{action_type} was not rejected: {outcome:?}"),
    }
}

/// Offering fixture: gold/silver tiers and two regular pricing groups, with
/// a gold MONTHLY override on compute and a standalone MONTHLY on storage
pub fn catalog_document() -> Document<OfferingModel> {
    let mut doc = new_document::<OfferingModel>();
    apply_shared(&mut doc, "ADD_TIER", json!({ "id": "gold", "name": "Gold" }));
    apply_shared(&mut doc, "ADD_TIER", json!({ "id": "silver", "name": "Silver" }));
    apply_shared(
        &mut doc,
        "ADD_PRICING_GROUP",
        json!({ "id": "compute", "name": "Compute" }),
    );
    apply_shared(
        &mut doc,
        "ADD_PRICING_GROUP",
        json!({ "id": "storage", "name": "Storage" }),
    );
    apply_shared(
        &mut doc,
        "SET_TIER_PRICE",
        json!({ "group": "compute", "tier": "gold", "cycle": "MONTHLY", "amount": 50 }),
    );
    apply_shared(
        &mut doc,
        "SET_PRICE",
        json!({ "group": "storage", "cycle": "MONTHLY", "amount": 30 }),
    );
    doc
}

/// Provisioning fixture: one resource instance walked to ACTIVE
pub fn active_resource_document(id: &str) -> Document<ProvisioningModel> {
    let mut doc = new_document::<ProvisioningModel>();
    apply_shared(
        &mut doc,
        "ADD_INSTANCE",
        json!({ "target": "resource", "id": id, "label": "primary database" }),
    );
    apply_shared(
        &mut doc,
        "BEGIN_PROVISIONING",
        json!({ "target": "resource", "id": id, "at": hours_after(1) }),
    );
    apply_shared(
        &mut doc,
        "COMPLETE_PROVISIONING",
        json!({ "target": "resource", "id": id, "at": hours_after(2) }),
    );
    apply_shared(
        &mut doc,
        "ACTIVATE",
        json!({ "target": "resource", "id": id, "at": hours_after(3) }),
    );
    doc
}

/// Compliance fixture: two signers under a two-signature threshold
pub fn draft_agreement_document() -> Document<ComplianceModel> {
    let mut doc = new_document::<ComplianceModel>();
    apply_shared(
        &mut doc,
        "UPDATE_PROCESS_DETAILS",
        json!({ "title": "Service agreement", "required_signatures": 2 }),
    );
    apply_shared(&mut doc, "ADD_SIGNER", json!({ "id": "s-1", "name": "Ada" }));
    apply_shared(&mut doc, "ADD_SIGNER", json!({ "id": "s-2", "name": "Grace" }));
    doc
}

/// Workplan fixture: three steps with tasks on the first two
pub fn staffed_workplan_document() -> Document<WorkplanModel> {
    let mut doc = new_document::<WorkplanModel>();
    for (id, name) in [
        ("discovery", "Discovery"),
        ("build", "Build"),
        ("launch", "Launch"),
    ] {
        apply_shared(&mut doc, "ADD_STEP", json!({ "id": id, "name": name }));
    }
    apply_shared(
        &mut doc,
        "ADD_TASK",
        json!({ "id": "t-1", "step": "discovery", "name": "interview users" }),
    );
    apply_shared(
        &mut doc,
        "ADD_TASK",
        json!({ "id": "t-2", "step": "build", "name": "implement core" }),
    );
    apply_shared(
        &mut doc,
        "ADD_PREREQUISITE",
        json!({ "id": "p-1", "step": "build", "description": "designs approved" }),
    );
    doc
}
