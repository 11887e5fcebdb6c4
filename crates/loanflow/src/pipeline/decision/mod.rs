//! Decision stage: consumes `AssessmentCompleted`, maps the upstream status
//! onto a final decision, computes terms for approvals, publishes
//! `DecisionMade`, and writes the status back to intake with retries.

pub mod callback;
pub mod terms;


pub use callback::{CallbackError, HttpIntakeStatusClient, IntakeStatusClient, StatusUpdateRequest};
pub use terms::standard_terms;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use rust_decimal::Decimal;
use tracing::{error, info};

use super::bus::{EventConsumer, EventPublisher};
use super::domain::{AssessmentStatus, DecisionOutcome, LoanDecision, LoanTerms};
use super::events::{AssessmentCompleted, DecisionMade};
use super::retry::{with_retry, RetryPolicy};

/// Map the upstream assessment status onto a final decision. Closed match
/// with an explicit default arm: unknown or future statuses land in manual
/// review, never in a hard failure.
pub fn decide(event: &AssessmentCompleted) -> DecisionOutcome {
    match event.status {
        AssessmentStatus::Rejected => DecisionOutcome {
            decision: LoanDecision::Rejected,
            terms: None,
            reason: event.justification.clone(),
        },
        AssessmentStatus::PendingManualReview => {
            let mut reason = event.justification.clone();
            if !reason.is_empty() {
                reason.push(' ');
            }
            reason.push_str("Flagged for manual review by credit assessment.");
            DecisionOutcome {
                decision: LoanDecision::PendingManualReview,
                terms: None,
                reason,
            }
        }
        AssessmentStatus::Approved | AssessmentStatus::AdjustedConditions => {
            match approved_terms(event) {
                Some(terms) => {
                    let reason = if event.justification.is_empty() {
                        "Approved".to_string()
                    } else {
                        format!("{} Approved with standard terms.", event.justification)
                    };
                    DecisionOutcome {
                        decision: LoanDecision::Approved,
                        terms: Some(terms),
                        reason,
                    }
                }
                None => DecisionOutcome {
                    decision: LoanDecision::PendingManualReview,
                    terms: None,
                    reason: "Approved by credit assessment but terms are invalid or missing. \
                             Needs manual review."
                        .to_string(),
                },
            }
        }
        status => DecisionOutcome {
            decision: LoanDecision::PendingManualReview,
            terms: None,
            reason: format!(
                "Unknown or unexpected status from credit assessment: {status:?}. \
                 Sent for manual review."
            ),
        },
    }
}

/// Terms are computed only when the upstream limit and rate are usable:
/// a positive limit and a non-negative rate.
fn approved_terms(event: &AssessmentCompleted) -> Option<LoanTerms> {
    let limit = event.approved_limit?;
    let rate = event.interest_rate_applied?;
    if limit <= Decimal::ZERO || rate < Decimal::ZERO {
        return None;
    }
    Some(standard_terms(limit, rate))
}

/// Terminal consumer of the assessment topic. Publishing the decision event
/// and updating intake are deliberately not transactional: if every callback
/// retry fails, the decision lives in the event stream while the intake
/// record stays stale, and the failure counter flags the record for
/// reconciliation.
pub struct DecisionEngine<P, C> {
    events: Arc<P>,
    intake: Arc<C>,
    retry: RetryPolicy,
    callback_failures: AtomicU64,
}

impl<P, C> DecisionEngine<P, C>
where
    P: EventPublisher<DecisionMade>,
    C: IntakeStatusClient,
{
    pub fn new(events: Arc<P>, intake: Arc<C>, retry: RetryPolicy) -> Self {
        Self {
            events,
            intake,
            retry,
            callback_failures: AtomicU64::new(0),
        }
    }

    pub async fn process(&self, event: &AssessmentCompleted) {
        info!(
            application_id = %event.application_id,
            upstream_status = ?event.status,
            "processing loan decision"
        );

        let outcome = decide(event);
        counter!("loan_decisions_total", "decision" => outcome.decision.label()).increment(1);
        info!(
            application_id = %event.application_id,
            decision = outcome.decision.label(),
            reason = %outcome.reason,
            "loan decision made"
        );

        let decision_event = DecisionMade::from_outcome(event, &outcome);
        if let Err(err) = self.events.publish(decision_event).await {
            error!(
                application_id = %event.application_id,
                error = %err,
                "failed to publish decision made event"
            );
        }

        let request = StatusUpdateRequest::from_outcome(&outcome);
        let update = with_retry(&self.retry, "intake status update", || {
            self.intake.update_status(&event.application_id, &request)
        })
        .await;

        if let Err(err) = update {
            self.callback_failures.fetch_add(1, Ordering::Relaxed);
            counter!("loan_status_callback_failures_total").increment(1);
            error!(
                application_id = %event.application_id,
                error = %err,
                "CRITICAL: all retries to update intake status failed; the decision event is \
                 already published, the intake record requires manual reconciliation"
            );
        }
    }

    /// Number of applications whose status write-back exhausted all retries.
    pub fn callback_failure_count(&self) -> u64 {
        self.callback_failures.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl<P, C> EventConsumer<AssessmentCompleted> for DecisionEngine<P, C>
where
    P: EventPublisher<DecisionMade> + 'static,
    C: IntakeStatusClient + 'static,
{
    async fn handle(&self, event: AssessmentCompleted) {
        self.process(&event).await;
    }
}
