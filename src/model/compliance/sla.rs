//! SLA deadline arithmetic and amendment-chain queries.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{ComplianceEvent, ComplianceShared, EventId};

/// Computes the deadline for an event: `occurred_at` plus wall-clock hours.
pub fn sla_deadline(occurred_at: DateTime<Utc>, hours: Option<u32>) -> Option<DateTime<Utc>> {
    hours.and_then(|hours| occurred_at.checked_add_signed(Duration::hours(i64::from(hours))))
}

/// Returns the full amendment chain containing `id`, oldest version first.
/// Unknown ids yield an empty chain. Traversal is bounded by the event count
/// so a malformed link set cannot loop.
pub fn amendment_chain(shared: &ComplianceShared, id: &EventId) -> Vec<EventId> {
    let events = &shared.events;
    if !events.contains(id) {
        return Vec::new();
    }
    let bound = events.len();

    let mut oldest = id.clone();
    for _ in 0..bound {
        match events.get(&oldest).and_then(|event| event.supersedes.clone()) {
            Some(prior) if events.contains(&prior) => oldest = prior,
            _ => break,
        }
    }

    let mut chain = vec![oldest.clone()];
    let mut cursor = oldest;
    for _ in 0..bound {
        match events.get(&cursor).and_then(|event| event.superseded_by.clone()) {
            Some(next) if events.contains(&next) => {
                chain.push(next.clone());
                cursor = next;
            }
            _ => break,
        }
    }
    chain
}

/// Events that have not been superseded, in collection order.
pub fn effective_events(shared: &ComplianceShared) -> Vec<&ComplianceEvent> {
    shared
        .events
        .iter()
        .filter(|event| event.superseded_by.is_none())
        .collect()
}

/// Aggregate SLA posture across all events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlaSummary {
    pub total: usize,
    pub with_deadline: usize,
    pub breached: usize,
    /// Deadline in the past and not yet marked breached.
    pub overdue: usize,
}

/// Counts events by SLA state as of `now`.
pub fn sla_summary(shared: &ComplianceShared, now: DateTime<Utc>) -> SlaSummary {
    let mut summary = SlaSummary::default();
    for event in shared.events.iter() {
        summary.total += 1;
        if event.sla_breached {
            summary.breached += 1;
        }
        if let Some(deadline) = event.sla_deadline_at {
            summary.with_deadline += 1;
            if deadline < now && !event.sla_breached {
                summary.overdue += 1;
            }
        }
    }
    summary
}
