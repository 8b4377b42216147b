//! Integration tests for the document engine
//!
//! Tests the full action path across every document model:
//! - Gate validation, dispatch, and log append
//! - Rollback on domain rejection
//! - Replay determinism and digest verification
//! - Derived pricing and SLA computation over live documents

mod common;

use serde_json::json;

use document_engine::digest::{document_digest, log_digest, state_digest};
use document_engine::engine::{replay, replay_prefix, verify_replay, ReplayError};
use document_engine::model::{
    amendment_chain, effective_events, effective_setup_price, majority_cycle, recurring_cost,
    sla_summary, AgreementStatus, ComplianceModel, DiscountId, EventId, InstanceId,
    LifecycleStatus, OfferingModel, SuspensionType, TierId, WorkplanModel,
};
use document_engine::{
    ApplyOutcome, BillingCycle, DocKind, Document, DocumentId, GateLimits, OperationLog, RawAction,
    SchemaViolation,
};

use common::*;

// ============================================================================
// Operation Log Semantics
// ============================================================================

#[test]
fn test_log_records_applied_and_rejected() {
    let mut doc = catalog_document();
    let before = doc.log().len();

    apply_shared(&mut doc, "ADD_TIER", json!({ "id": "bronze", "name": "Bronze" }));
    let code = apply_shared_rejected(&mut doc, "ADD_TIER", json!({ "id": "bronze", "name": "again" }));
    assert_eq!(code, "DUPLICATE_TIER");

    let log = doc.log();
    assert_eq!(log.len(), before + 2);
    // Indexes are contiguous from zero.
    for (position, entry) in log.iter().enumerate() {
        assert_eq!(entry.index, position as u64);
    }

    let rejected = log.last().unwrap();
    assert!(!rejected.is_applied());
    let error = rejected.error.as_ref().unwrap();
    assert_eq!(error.code, "DUPLICATE_TIER");
    assert!(error.message.contains("bronze"));

    let stats = log.stats();
    assert_eq!(stats.total, (before + 2) as u64);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.applied, stats.total - 1);
}

#[test]
fn test_gate_rejection_writes_no_entry() {
    let mut doc = catalog_document();
    let before = doc.log().len();

    // Malformed payload: ADD_TIER requires a name.
    let err = doc
        .apply(&RawAction::shared("ADD_TIER", json!({ "id": "bronze" })))
        .unwrap_err();
    assert!(matches!(err, SchemaViolation::Payload { .. }));

    // Shared action submitted under the private scope.
    let err = doc
        .apply(&RawAction::private("ADD_TIER", json!({ "id": "bronze", "name": "B" })))
        .unwrap_err();
    assert!(matches!(err, SchemaViolation::ScopeMismatch { .. }));

    // Unknown type: skipped, defined behavior, still no entry.
    let outcome = doc
        .apply(&RawAction::shared("NOT_AN_ACTION", json!({})))
        .unwrap();
    assert!(matches!(outcome, ApplyOutcome::Skipped { .. }));

    assert_eq!(doc.log().len(), before);
}

#[test]
fn test_payload_size_ceiling() {
    let mut doc = catalog_document();
    let limits = GateLimits {
        max_payload_bytes: Some(64),
    };
    let oversized = json!({ "id": "bronze", "name": "B".repeat(100) });

    let err = doc
        .apply_with_limits(&RawAction::shared("ADD_TIER", oversized), &limits)
        .unwrap_err();
    assert!(matches!(err, SchemaViolation::PayloadTooLarge { .. }));
    assert!(doc.shared().tiers.get(&TierId::from("bronze")).is_none());
}

#[test]
fn test_rejected_action_leaves_state_untouched() {
    let mut doc = catalog_document();
    let digest_before = state_digest(doc.shared()).unwrap();

    // Fails midway through validation: the tier exists, the group does not.
    let code = apply_shared_rejected(
        &mut doc,
        "SET_TIER_PRICE",
        json!({ "group": "ghost", "tier": "gold", "cycle": "MONTHLY", "amount": 10 }),
    );
    assert_eq!(code, "PRICING_GROUP_NOT_FOUND");
    assert_eq!(state_digest(doc.shared()).unwrap(), digest_before);
}

#[test]
fn test_context_carried_verbatim() {
    let mut doc = catalog_document();
    let context = json!({ "correlation_id": "req-42", "submitted_by": "billing-ui" });
    let action = RawAction::shared("ADD_TIER", json!({ "id": "bronze", "name": "Bronze" }))
        .with_context(context.clone());

    doc.apply(&action).unwrap();
    assert_eq!(doc.log().last().unwrap().context, Some(context));
}

// ============================================================================
// Typed Submission
// ============================================================================

#[test]
fn test_typed_actions_share_log_shape() {
    use document_engine::model::OfferingAction;
    use document_engine::ActionBody;

    let mut doc = new_document::<OfferingModel>();
    let outcome = doc
        .apply_typed(&ActionBody::Shared(OfferingAction::AddTier {
            id: TierId::from("gold"),
            name: "Gold".to_string(),
            description: None,
        }))
        .unwrap();
    assert!(outcome.is_applied());

    // The log entry records the wire form and replays like any raw entry.
    let entry = doc.log().last().unwrap();
    assert_eq!(entry.action_type, "ADD_TIER");
    assert_eq!(entry.payload, json!({ "id": "gold", "name": "Gold" }));

    let report = verify_replay(&doc).unwrap();
    assert!(report.matches_live);
}

// ============================================================================
// Replay Determinism
// ============================================================================

#[test]
fn test_replay_offering_walk() {
    let mut doc = catalog_document();
    apply_shared(&mut doc, "SET_BILLING_CYCLE", json!({ "cycle": "ANNUAL" }));
    apply_shared_rejected(&mut doc, "REMOVE_TIER", json!({ "id": "gold" }));
    apply_private(&mut doc, "SELECT_TIER", json!({ "tier": "gold" }));

    let report = verify_replay(&doc).unwrap();
    assert!(report.matches_live);
    assert_eq!(report.operations_rejected, 1);
    assert_eq!(
        report.operations_applied + report.operations_rejected,
        doc.log().len() as u64
    );

    let rebuilt = replay::<OfferingModel>(doc.header().clone(), doc.log()).unwrap();
    assert_eq!(rebuilt, doc);
}

#[test]
fn test_replay_provisioning_walk() {
    let mut doc = active_resource_document("db-1");
    apply_shared(
        &mut doc,
        "SUSPEND",
        json!({
            "target": "resource",
            "id": "db-1",
            "suspension_type": "NON_PAYMENT",
            "reason": "invoice overdue",
            "at": hours_after(10)
        }),
    );
    apply_shared_rejected(
        &mut doc,
        "RESUME_AFTER_MAINTENANCE",
        json!({ "target": "resource", "id": "db-1" }),
    );
    apply_shared(
        &mut doc,
        "RESUME_AFTER_PAYMENT",
        json!({ "target": "resource", "id": "db-1" }),
    );

    let report = verify_replay(&doc).unwrap();
    assert!(report.matches_live);
    assert_eq!(report.operations_rejected, 1);
}

#[test]
fn test_replay_compliance_walk() {
    let mut doc = draft_agreement_document();
    apply_shared(
        &mut doc,
        "RECORD_SIGNATURE",
        json!({ "signer": "s-1", "signed_at": hours_after(1) }),
    );
    apply_shared(
        &mut doc,
        "RECORD_SIGNATURE",
        json!({ "signer": "s-2", "signed_at": hours_after(2) }),
    );
    apply_shared(
        &mut doc,
        "ADD_COMPLIANCE_EVENT",
        json!({
            "id": "evt-1",
            "event_type": "audit",
            "description": "annual review",
            "occurred_at": hours_after(3),
            "sla_deadline_hours": 72
        }),
    );
    apply_shared(
        &mut doc,
        "AMEND_COMPLIANCE_EVENT",
        json!({
            "target": "evt-1",
            "id": "evt-2",
            "event_type": "audit",
            "description": "annual review (corrected)",
            "occurred_at": hours_after(4)
        }),
    );

    assert_eq!(doc.shared().agreement.status, AgreementStatus::Executed);
    let report = verify_replay(&doc).unwrap();
    assert!(report.matches_live);
    assert_eq!(report.operations_rejected, 0);
}

#[test]
fn test_replay_workplan_walk() {
    let mut doc = staffed_workplan_document();
    apply_shared(
        &mut doc,
        "REORDER_STEPS",
        json!({ "order": ["launch", "discovery", "build"] }),
    );
    apply_shared(&mut doc, "REMOVE_STEP", json!({ "id": "build" }));
    apply_shared_rejected(&mut doc, "REMOVE_TASK", json!({ "id": "t-2" }));

    let report = verify_replay(&doc).unwrap();
    assert!(report.matches_live);

    let rebuilt = replay::<WorkplanModel>(doc.header().clone(), doc.log()).unwrap();
    assert_eq!(rebuilt, doc);
}

#[test]
fn test_replay_prefix_matches_intermediate_state() {
    let mut doc = new_document::<WorkplanModel>();
    apply_shared(&mut doc, "ADD_STEP", json!({ "id": "a", "name": "A" }));
    apply_shared(&mut doc, "ADD_STEP", json!({ "id": "b", "name": "B" }));
    let midpoint = doc.log().len();
    let digest_at_midpoint = state_digest(doc.shared()).unwrap();

    apply_shared(&mut doc, "REMOVE_STEP", json!({ "id": "a" }));
    apply_shared(&mut doc, "ADD_STEP", json!({ "id": "c", "name": "C" }));

    let rebuilt =
        replay_prefix::<WorkplanModel>(doc.header().clone(), doc.log(), midpoint as u64).unwrap();
    assert_eq!(state_digest(rebuilt.shared()).unwrap(), digest_at_midpoint);
    assert_eq!(rebuilt.log().len(), midpoint);
}

#[test]
fn test_replay_detects_index_gap() {
    let log: OperationLog = serde_json::from_value(json!([
        {
            "index": 5,
            "scope": "shared",
            "type": "ADD_STEP",
            "payload": { "id": "a", "name": "A" },
            "recorded_at": "2026-01-01T00:00:00Z"
        }
    ]))
    .unwrap();
    let header = document_engine::domain::DocumentHeader::new(
        DocumentId::new(),
        DocKind::Workplan,
        test_created_at(),
    );

    let err = replay::<WorkplanModel>(header, &log).unwrap_err();
    assert!(matches!(err, ReplayError::IndexGap { expected: 0, actual: 5 }));
}

#[test]
fn test_replay_rejects_unknown_recorded_type() {
    let log: OperationLog = serde_json::from_value(json!([
        {
            "index": 0,
            "scope": "shared",
            "type": "RETIRED_ACTION",
            "payload": {},
            "recorded_at": "2026-01-01T00:00:00Z"
        }
    ]))
    .unwrap();
    let header = document_engine::domain::DocumentHeader::new(
        DocumentId::new(),
        DocKind::Workplan,
        test_created_at(),
    );

    let err = replay::<WorkplanModel>(header, &log).unwrap_err();
    assert!(matches!(err, ReplayError::CorruptEntry { index: 0, .. }));
}

// ============================================================================
// Digests & Persistence Boundary
// ============================================================================

#[test]
fn test_document_survives_serde_roundtrip() {
    let doc = catalog_document();
    let serialized = serde_json::to_string(&doc).unwrap();
    let restored: Document<OfferingModel> = serde_json::from_str(&serialized).unwrap();

    assert_eq!(restored, doc);
    assert_eq!(
        document_digest(&restored).unwrap(),
        document_digest(&doc).unwrap()
    );
}

#[test]
fn test_digests_track_state_and_log() {
    let mut doc = catalog_document();
    let doc_digest = document_digest(&doc).unwrap();
    let shared_digest = state_digest(doc.shared()).unwrap();
    let log_hash = log_digest(doc.log()).unwrap();

    // Private-scope change: shared digest holds, document digest moves.
    apply_private(&mut doc, "SELECT_TIER", json!({ "tier": "gold" }));
    assert_eq!(state_digest(doc.shared()).unwrap(), shared_digest);
    assert_ne!(document_digest(&doc).unwrap(), doc_digest);
    assert_ne!(log_digest(doc.log()).unwrap(), log_hash);
}

#[test]
fn test_private_namespace_isolated_from_shared() {
    let mut doc = new_document::<OfferingModel>();
    // Selection is a view cursor: it never consults the shared catalog,
    // so selecting an unknown tier is legal.
    apply_private(&mut doc, "SELECT_TIER", json!({ "tier": "nonexistent" }));
    assert_eq!(
        doc.private().selected_tier,
        Some(TierId::from("nonexistent"))
    );
    assert!(doc.shared().tiers.is_empty());
}

// ============================================================================
// Derived Computation Over Live Documents
// ============================================================================

#[test]
fn test_pricing_example_through_actions() {
    let doc = catalog_document();

    let gold = TierId::from("gold");
    let cost = recurring_cost(doc.shared(), BillingCycle::Annual, Some(&gold));
    assert_eq!(cost.monthly_total, 80.0);
    assert_eq!(cost.cycle_total, 960.0);
    assert!(cost.missing_price_groups.is_empty());

    // Without the tier, compute has no standalone MONTHLY price.
    let cost = recurring_cost(doc.shared(), BillingCycle::Annual, None);
    assert_eq!(cost.monthly_total, 30.0);
    assert_eq!(cost.missing_price_groups.len(), 1);
}

#[test]
fn test_discount_flow_through_actions() {
    let mut doc = catalog_document();
    apply_shared(
        &mut doc,
        "ADD_DISCOUNT",
        json!({ "id": "launch", "kind": "PERCENTAGE", "value": 33 }),
    );

    let discount = doc
        .shared()
        .discounts
        .get(&DiscountId::from("launch"))
        .unwrap();
    let price = effective_setup_price(100.0, discount);
    assert_eq!(price.effective_amount, 67.0);
    assert_eq!(price.savings, 33.0);
    assert_eq!(price.savings_percent, 33.0);
}

#[test]
fn test_majority_cycle_through_actions() {
    let mut doc = new_document::<OfferingModel>();
    for (id, cycle) in [("a", Some("ANNUAL")), ("b", Some("ANNUAL")), ("c", None)] {
        let mut payload = json!({ "id": id, "name": id });
        if let Some(cycle) = cycle {
            payload["billing_cycle"] = json!(cycle);
        }
        apply_shared(&mut doc, "ADD_PRICING_GROUP", payload);
    }

    assert_eq!(majority_cycle(doc.shared()), Some(BillingCycle::Annual));

    // Adopting the suggestion clears it.
    apply_shared(&mut doc, "SET_BILLING_CYCLE", json!({ "cycle": "ANNUAL" }));
    assert_eq!(majority_cycle(doc.shared()), None);
}

#[test]
fn test_suspension_resume_pairing() {
    let mut doc = active_resource_document("db-1");
    apply_shared(
        &mut doc,
        "SUSPEND",
        json!({
            "target": "resource",
            "id": "db-1",
            "suspension_type": "MAINTENANCE",
            "at": hours_after(5)
        }),
    );

    let code = apply_shared_rejected(
        &mut doc,
        "RESUME_AFTER_PAYMENT",
        json!({ "target": "resource", "id": "db-1" }),
    );
    assert_eq!(code, "INVALID_SUSPENSION_TYPE");

    apply_shared(
        &mut doc,
        "RESUME_AFTER_MAINTENANCE",
        json!({ "target": "resource", "id": "db-1" }),
    );
    let instance = doc
        .shared()
        .resources
        .get(&InstanceId::from("db-1"))
        .unwrap();
    assert_eq!(instance.lifecycle.status, LifecycleStatus::Active);
    assert_eq!(instance.lifecycle.suspension_type, None);
    assert_eq!(instance.lifecycle.suspended_at, None);
}

#[test]
fn test_terminated_instance_rejects_updates() {
    let mut doc = active_resource_document("db-1");
    apply_shared(
        &mut doc,
        "TERMINATE",
        json!({ "target": "resource", "id": "db-1", "reason": "decommissioned", "at": hours_after(20) }),
    );

    let code = apply_shared_rejected(
        &mut doc,
        "UPDATE_INSTANCE",
        json!({ "target": "resource", "id": "db-1", "label": "renamed" }),
    );
    assert_eq!(code, "INSTANCE_TERMINATED");

    let code = apply_shared_rejected(
        &mut doc,
        "TERMINATE",
        json!({ "target": "resource", "id": "db-1", "at": hours_after(21) }),
    );
    assert_eq!(code, "ALREADY_TERMINATED");
}

#[test]
fn test_terminated_agreement_guard_in_log() {
    let mut doc = draft_agreement_document();
    apply_shared(
        &mut doc,
        "TERMINATE_AGREEMENT",
        json!({ "reason": "superseded by new contract", "at": hours_after(5) }),
    );

    let code = apply_shared_rejected(&mut doc, "ADD_SIGNER", json!({ "id": "s-3", "name": "Linus" }));
    assert_eq!(code, "AGREEMENT_TERMINATED");

    // The rejection is part of the audit trail.
    let entry = doc.log().last().unwrap();
    assert_eq!(entry.action_type, "ADD_SIGNER");
    assert_eq!(entry.error.as_ref().unwrap().code, "AGREEMENT_TERMINATED");

    // Observations stay recordable.
    apply_shared(
        &mut doc,
        "ADD_COMPLIANCE_EVENT",
        json!({
            "id": "evt-1",
            "event_type": "audit",
            "description": "closeout audit",
            "occurred_at": hours_after(6)
        }),
    );
    assert_eq!(doc.shared().events.len(), 1);
}

#[test]
fn test_sla_flow_through_actions() {
    let mut doc = new_document::<ComplianceModel>();
    apply_shared(
        &mut doc,
        "ADD_COMPLIANCE_EVENT",
        json!({
            "id": "evt-1",
            "event_type": "incident",
            "description": "export request",
            "occurred_at": hours_after(0),
            "sla_deadline_hours": 24
        }),
    );
    apply_shared(
        &mut doc,
        "AMEND_COMPLIANCE_EVENT",
        json!({
            "target": "evt-1",
            "id": "evt-2",
            "event_type": "incident",
            "description": "export request (scoped)",
            "occurred_at": hours_after(1),
            "sla_deadline_hours": 24
        }),
    );
    apply_shared(&mut doc, "MARK_SLA_BREACHED", json!({ "id": "evt-1" }));

    let chain = amendment_chain(doc.shared(), &EventId::from("evt-1"));
    assert_eq!(chain, vec![EventId::from("evt-1"), EventId::from("evt-2")]);

    let effective: Vec<_> = effective_events(doc.shared())
        .into_iter()
        .map(|event| event.id.clone())
        .collect();
    assert_eq!(effective, vec![EventId::from("evt-2")]);

    // evt-2's deadline (hour 25) has passed unbreached; evt-1 is breached.
    let summary = sla_summary(doc.shared(), hours_after(48));
    assert_eq!(summary.total, 2);
    assert_eq!(summary.with_deadline, 2);
    assert_eq!(summary.breached, 1);
    assert_eq!(summary.overdue, 1);
}

#[test]
fn test_step_cascade_through_actions() {
    let mut doc = staffed_workplan_document();
    apply_shared(&mut doc, "REMOVE_STEP", json!({ "id": "build" }));

    // t-2 and p-1 hung off build; t-1 belongs to discovery.
    assert_eq!(doc.shared().tasks.len(), 1);
    assert!(doc.shared().prerequisites.is_empty());
    assert_eq!(doc.shared().steps.len(), 2);

    let report = verify_replay(&doc).unwrap();
    assert!(report.matches_live);
}

#[test]
fn test_suspension_type_wire_format() {
    // Suspension sub-types round-trip through the log as SCREAMING_SNAKE_CASE.
    let mut doc = active_resource_document("db-1");
    apply_shared(
        &mut doc,
        "SUSPEND",
        json!({
            "target": "resource",
            "id": "db-1",
            "suspension_type": "NON_PAYMENT",
            "at": hours_after(5)
        }),
    );
    let instance = doc
        .shared()
        .resources
        .get(&InstanceId::from("db-1"))
        .unwrap();
    assert_eq!(
        instance.lifecycle.suspension_type,
        Some(SuspensionType::NonPayment)
    );

    let serialized = serde_json::to_value(doc.shared()).unwrap();
    assert_eq!(
        serialized["resources"][0]["lifecycle"]["suspension_type"],
        json!("NON_PAYMENT")
    );
}
