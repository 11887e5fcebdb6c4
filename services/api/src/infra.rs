use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use rust_decimal_macros::dec;

use loanflow::config::PipelineConfig;
use loanflow::pipeline::assessment::{AssessmentPipeline, RuleChain, TierRegistry};
use loanflow::pipeline::bus::{EventConsumer, EventPublisher, PartitionedBus, PublishError};
use loanflow::pipeline::decision::{
    CallbackError, DecisionEngine, HttpIntakeStatusClient, IntakeStatusClient,
};
use loanflow::pipeline::domain::{
    AntiFraudScore, ApplicationId, BureauAssessment, BureauScore, FraudRecommendation,
    PaymentHistory,
};
use loanflow::pipeline::events::{ApplicationReceived, AssessmentCompleted, DecisionMade};
use loanflow::pipeline::intake::{
    AccountValidation, ApplicantChecks, CpfValidation, HttpApplicantChecks, IntakeService,
    LoanApplicationRecord, RestrictionCheck, SnapshotStore, StoreError, ValidationCallError,
};
use loanflow::pipeline::retry::RetryPolicy;
use loanflow::pipeline::score::{
    FraudCheckRequest, HttpScoreProvider, InMemoryScoreCache, ScoreError, ScoreProvider,
};
use loanflow::pipeline::StatusUpdateRequest;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Intake service wired against the HTTP score/validation providers; the
/// decision engine calls back over HTTP as it would across services.
pub(crate) type LiveIntakeService =
    IntakeService<InMemorySnapshotStore, PartitionedBus<ApplicationReceived>, HttpApplicantChecks>;

/// Intake service wired against deterministic in-process stubs for demos.
pub(crate) type DemoIntakeService =
    IntakeService<InMemorySnapshotStore, PartitionedBus<ApplicationReceived>, StubApplicantChecks>;

#[derive(Default)]
pub(crate) struct InMemorySnapshotStore {
    records: Mutex<HashMap<ApplicationId, LoanApplicationRecord>>,
}

impl SnapshotStore for InMemorySnapshotStore {
    fn insert(&self, record: LoanApplicationRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("store mutex poisoned");
        if records.contains_key(&record.application_id) {
            return Err(StoreError::Conflict);
        }
        records.insert(record.application_id.clone(), record);
        Ok(())
    }

    fn update(&self, record: LoanApplicationRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().expect("store mutex poisoned");
        if !records.contains_key(&record.application_id) {
            return Err(StoreError::NotFound);
        }
        records.insert(record.application_id.clone(), record);
        Ok(())
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, StoreError> {
        let records = self.records.lock().expect("store mutex poisoned");
        Ok(records.get(id).cloned())
    }
}

/// Terminal audit sink for the decision topic; contract/notification
/// services would subscribe here in a full deployment.
pub(crate) struct DecisionAuditLog;

#[async_trait]
impl EventConsumer<DecisionMade> for DecisionAuditLog {
    async fn handle(&self, event: DecisionMade) {
        info!(
            application_id = %event.application_id,
            decision = event.decision.label(),
            reason = %event.reason,
            "decision recorded"
        );
    }
}

/// Wire the full pipeline against the configured HTTP collaborators.
pub(crate) fn live_pipeline(
    config: &PipelineConfig,
    store: Arc<InMemorySnapshotStore>,
) -> Result<Arc<LiveIntakeService>, loanflow::error::AppError> {
    let http = reqwest::Client::new();
    let scores = Arc::new(HttpScoreProvider::new(
        http.clone(),
        config.score_provider_url.clone(),
    ));
    let checks = Arc::new(HttpApplicantChecks::new(
        http.clone(),
        config.validation_provider_url.clone(),
    ));
    let status_client = Arc::new(HttpIntakeStatusClient::new(
        http,
        config.intake_base_url.clone(),
    ));

    let intake = assemble(
        store,
        scores,
        checks,
        status_client,
        config.bureau_cache_ttl,
        config.callback_retry,
        config.event_partitions,
    )?;
    Ok(intake)
}

/// Wire the full pipeline against in-process stubs; the status callback
/// writes straight to the store.
pub(crate) fn demo_pipeline(
) -> Result<(Arc<DemoIntakeService>, Arc<InMemorySnapshotStore>), loanflow::error::AppError> {
    let store = Arc::new(InMemorySnapshotStore::default());
    let checks = Arc::new(StubApplicantChecks);
    let status_client = Arc::new(LocalStatusClient {
        intake: Arc::new(IntakeService::new(
            store.clone(),
            Arc::new(DroppedEvents),
            checks.clone(),
        )),
    });

    let intake = assemble(
        store.clone(),
        Arc::new(StubScoreProvider),
        checks,
        status_client,
        Duration::from_secs(60),
        RetryPolicy::new(3, Duration::from_millis(10), 2),
        2,
    )?;
    Ok((intake, store))
}

/// Shared assembly: decision bus -> decision engine -> assessment bus ->
/// assessment pipeline -> application bus -> intake service.
fn assemble<S, V, T>(
    store: Arc<InMemorySnapshotStore>,
    scores: Arc<S>,
    checks: Arc<V>,
    status_client: Arc<T>,
    cache_ttl: Duration,
    callback_retry: RetryPolicy,
    partitions: usize,
) -> Result<
    Arc<IntakeService<InMemorySnapshotStore, PartitionedBus<ApplicationReceived>, V>>,
    loanflow::error::AppError,
>
where
    S: ScoreProvider + 'static,
    V: ApplicantChecks + 'static,
    T: IntakeStatusClient + 'static,
{
    let decision_consumer: Arc<dyn EventConsumer<DecisionMade>> = Arc::new(DecisionAuditLog);
    let decision_bus = Arc::new(PartitionedBus::start(partitions, decision_consumer));
    let engine = Arc::new(DecisionEngine::new(
        decision_bus,
        status_client,
        callback_retry,
    ));
    let assessment_consumer: Arc<dyn EventConsumer<AssessmentCompleted>> = engine;
    let assessment_bus = Arc::new(PartitionedBus::start(partitions, assessment_consumer));

    let pipeline = Arc::new(AssessmentPipeline::new(
        RuleChain::standard(),
        TierRegistry::standard()?,
        scores,
        Arc::new(InMemoryScoreCache::default()),
        cache_ttl,
        assessment_bus,
    ));
    let application_consumer: Arc<dyn EventConsumer<ApplicationReceived>> = pipeline;
    let application_bus = Arc::new(PartitionedBus::start(partitions, application_consumer));

    Ok(Arc::new(IntakeService::new(store, application_bus, checks)))
}

/// Publisher for the callback-only intake instance, which never submits.
struct DroppedEvents;

#[async_trait]
impl EventPublisher<ApplicationReceived> for DroppedEvents {
    async fn publish(&self, _event: ApplicationReceived) -> Result<(), PublishError> {
        Ok(())
    }
}

/// Applies decisions directly to the store instead of calling back over
/// HTTP; used by the demo wiring.
pub(crate) struct LocalStatusClient {
    intake: Arc<DemoCallbackIntake>,
}

type DemoCallbackIntake = IntakeService<InMemorySnapshotStore, DroppedEvents, StubApplicantChecks>;

#[async_trait]
impl IntakeStatusClient for LocalStatusClient {
    async fn update_status(
        &self,
        application_id: &ApplicationId,
        request: &StatusUpdateRequest,
    ) -> Result<(), CallbackError> {
        self.intake
            .apply_decision(application_id, request)
            .map(|_| ())
            .map_err(|err| CallbackError::Transport(err.to_string()))
    }
}

/// Deterministic bureau/anti-fraud stub: the last three CPF digits become
/// the bureau score, and a CPF ending in 77 trips the anti-fraud check.
pub(crate) struct StubScoreProvider;

#[async_trait]
impl ScoreProvider for StubScoreProvider {
    async fn bureau_score(&self, cpf: &str) -> Result<BureauScore, ScoreError> {
        let score = trailing_digits(cpf, 3);
        Ok(BureauScore {
            cpf: cpf.to_string(),
            score,
            assessment: if score >= 700 {
                BureauAssessment::LowRisk
            } else if score > 500 {
                BureauAssessment::MediumRisk
            } else {
                BureauAssessment::HighRisk
            },
            has_restrictions: false,
            payment_history: PaymentHistory::Good,
            monthly_debts: dec!(0),
        })
    }

    async fn fraud_check(&self, request: &FraudCheckRequest) -> Result<AntiFraudScore, ScoreError> {
        let suspicious = request.cpf.ends_with("77");
        Ok(AntiFraudScore {
            application_id: request.application_id.clone(),
            fraud_score: if suspicious { 900 } else { 120 },
            recommendation: if suspicious {
                FraudRecommendation::Reject
            } else {
                FraudRecommendation::Accept
            },
        })
    }
}

/// Deterministic validation stub mirroring the sandbox conventions: CPFs
/// ending in 00 are irregular, in 9 have no active account, in 88 carry
/// internal restrictions.
pub(crate) struct StubApplicantChecks;

#[async_trait]
impl ApplicantChecks for StubApplicantChecks {
    async fn cpf_status(&self, cpf: &str) -> Result<CpfValidation, ValidationCallError> {
        let irregular = cpf.ends_with("00");
        Ok(CpfValidation {
            regular: !irregular,
            message: if irregular {
                "CPF has pending issues with the tax authority".to_string()
            } else {
                "CPF in good standing".to_string()
            },
        })
    }

    async fn account_active(&self, cpf: &str) -> Result<AccountValidation, ValidationCallError> {
        let inactive = cpf.ends_with('9');
        Ok(AccountValidation {
            active: !inactive,
            message: if inactive {
                "Customer has no active account".to_string()
            } else {
                "Active account".to_string()
            },
        })
    }

    async fn internal_restrictions(
        &self,
        cpf: &str,
    ) -> Result<RestrictionCheck, ValidationCallError> {
        let restricted = cpf.ends_with("88");
        Ok(RestrictionCheck {
            restricted,
            message: if restricted {
                "Customer has severe internal restrictions".to_string()
            } else {
                "No internal restrictions".to_string()
            },
        })
    }
}

fn trailing_digits(cpf: &str, count: usize) -> i32 {
    let digits: String = cpf
        .chars()
        .filter(|character| character.is_ascii_digit())
        .collect();
    let tail = if digits.len() > count {
        &digits[digits.len() - count..]
    } else {
        digits.as_str()
    };
    tail.parse().unwrap_or(0)
}
