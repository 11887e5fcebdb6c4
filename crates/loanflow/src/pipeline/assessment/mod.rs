//! Credit assessment stage: consumes `ApplicationReceived`, fetches both
//! external scores (bureau via the cache-aside layer), runs the rule chain
//! and the matching risk tier policy, and publishes `AssessmentCompleted`.

pub mod rules;
pub mod tiering;

#[cfg(test)]
mod tests;

pub use rules::{RuleChain, RuleInputs, RuleViolation};
pub use tiering::{RiskTierPolicy, TierRegistry, TierRegistryError};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::bus::{EventConsumer, EventPublisher};
use super::domain::{AssessmentResult, AssessmentStatus, BureauScore};
use super::events::{ApplicationReceived, AssessmentCompleted};
use super::score::{FraudCheckRequest, ScoreCache, ScoreError, ScoreProvider};

/// Failure that aborts processing instead of producing an outcome.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    TierRegistry(#[from] TierRegistryError),
}

/// Orchestrates one assessment per intake event. The rule chain and tier
/// registry are built once at startup and passed in; the pipeline itself is
/// stateless across applications.
pub struct AssessmentPipeline<S, C, P> {
    rules: RuleChain,
    tiers: TierRegistry,
    scores: Arc<S>,
    cache: Arc<C>,
    cache_ttl: Duration,
    events: Arc<P>,
}

impl<S, C, P> AssessmentPipeline<S, C, P>
where
    S: ScoreProvider,
    C: ScoreCache,
    P: EventPublisher<AssessmentCompleted>,
{
    pub fn new(
        rules: RuleChain,
        tiers: TierRegistry,
        scores: Arc<S>,
        cache: Arc<C>,
        cache_ttl: Duration,
        events: Arc<P>,
    ) -> Self {
        Self {
            rules,
            tiers,
            scores,
            cache,
            cache_ttl,
            events,
        }
    }

    /// Assess a single application. Provider failures short-circuit into a
    /// FAILED completion event; only a tier misconfiguration aborts without
    /// an outcome.
    pub async fn assess(&self, event: &ApplicationReceived) -> Result<(), AssessmentError> {
        info!(application_id = %event.application_id, "starting credit assessment");

        let bureau = match self.bureau_score(&event.cpf).await {
            Ok(score) => score,
            Err(err) => {
                warn!(
                    application_id = %event.application_id,
                    cpf = %event.cpf,
                    error = %err,
                    "could not retrieve bureau score, assessment cannot proceed"
                );
                self.publish_failed(event, format!("Failed to retrieve bureau score: {err}"))
                    .await;
                return Ok(());
            }
        };

        let fraud_request = FraudCheckRequest::from_event(event);
        let fraud = match self.scores.fraud_check(&fraud_request).await {
            Ok(score) => score,
            Err(err) => {
                warn!(
                    application_id = %event.application_id,
                    error = %err,
                    "could not retrieve anti-fraud score, assessment cannot proceed"
                );
                self.publish_failed(event, format!("Failed to retrieve anti-fraud score: {err}"))
                    .await;
                return Ok(());
            }
        };

        let snapshot = event.snapshot();
        let mut result = AssessmentResult::seeded(
            event.application_id.clone(),
            event.cpf.clone(),
            bureau.score,
        );

        let inputs = RuleInputs {
            application: &snapshot,
            bureau: &bureau,
            fraud: &fraud,
        };
        if let Err(violation) = self.rules.evaluate(&inputs, &mut result) {
            warn!(
                application_id = %event.application_id,
                error = %violation,
                "assessment inputs violate the intake contract"
            );
            self.publish_failed(event, format!("Assessment input invalid: {violation}"))
                .await;
            return Ok(());
        }

        if result.status != AssessmentStatus::Rejected {
            self.tiers.apply(&snapshot, &bureau, &mut result)?;
        }

        info!(
            application_id = %event.application_id,
            status = ?result.status,
            justification = %result.justification,
            "credit assessment finished"
        );
        self.publish(AssessmentCompleted::from_result(&result, &bureau, &fraud))
            .await;
        Ok(())
    }

    /// Cache-aside bureau fetch. Cache errors degrade to a miss on read and
    /// are logged and ignored on write; the cache is never a correctness
    /// dependency.
    async fn bureau_score(&self, cpf: &str) -> Result<BureauScore, ScoreError> {
        match self.cache.get(cpf) {
            Ok(Some(cached)) => {
                info!(cpf, "bureau score served from cache");
                return Ok(cached);
            }
            Ok(None) => {}
            Err(err) => warn!(cpf, error = %err, "score cache read failed, falling through"),
        }

        let score = self.scores.bureau_score(cpf).await?;
        if let Err(err) = self.cache.put(cpf, &score, self.cache_ttl) {
            warn!(cpf, error = %err, "score cache write failed, continuing without caching");
        }
        Ok(score)
    }

    async fn publish_failed(&self, event: &ApplicationReceived, justification: String) {
        self.publish(AssessmentCompleted::failed(
            &event.application_id,
            &event.cpf,
            justification,
        ))
        .await;
    }

    async fn publish(&self, completed: AssessmentCompleted) {
        if let Err(err) = self.events.publish(completed).await {
            error!(error = %err, "failed to publish assessment completed event");
        }
    }
}

#[async_trait]
impl<S, C, P> EventConsumer<ApplicationReceived> for AssessmentPipeline<S, C, P>
where
    S: ScoreProvider + 'static,
    C: ScoreCache + 'static,
    P: EventPublisher<AssessmentCompleted> + 'static,
{
    async fn handle(&self, event: ApplicationReceived) {
        if let Err(error) = self.assess(&event).await {
            error!(
                application_id = %event.application_id,
                %error,
                "aborting assessment: risk tier registry is misconfigured"
            );
        }
    }
}
