//! Intake stage: local and concurrent external validation, the application
//! record store, publication of `ApplicationReceived`, and the status
//! write-back applied when the decision engine calls back.

pub mod validation;


pub use validation::{
    AccountValidation, ApplicantCheckOutcome, ApplicantChecks, CpfValidation, HttpApplicantChecks,
    RestrictionCheck, ValidationCallError,
};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::bus::{EventPublisher, PublishError};
use super::decision::StatusUpdateRequest;
use super::domain::{ApplicationId, IntakeSnapshot, LoanDecision, LoanStatus, Money, Rate};
use super::events::ApplicationReceived;
use validation::run_applicant_checks;

const MIN_APPLICANT_AGE: u32 = 18;
const MAX_APPLICANT_AGE: u32 = 75;
const MIN_MONTHLY_INCOME: Decimal = dec!(1200.00);

/// Submission payload accepted by intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplicationRequest {
    pub cpf: String,
    pub date_of_birth: NaiveDate,
    pub amount_requested: Money,
    pub number_of_installments: u32,
    pub monthly_income: Money,
}

/// Stored application record. The pipeline reads the snapshot projection;
/// only the decision write-back mutates status and terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplicationRecord {
    pub application_id: ApplicationId,
    pub cpf: String,
    pub date_of_birth: NaiveDate,
    pub amount_requested: Money,
    pub number_of_installments: u32,
    pub monthly_income: Money,
    pub status: LoanStatus,
    pub rejection_reason: Option<String>,
    pub amount_approved: Option<Money>,
    pub interest_rate: Option<Rate>,
    pub approved_installments: Option<u32>,
    pub installment_value: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanApplicationRecord {
    fn from_request(request: &LoanApplicationRequest) -> Self {
        let now = Utc::now();
        Self {
            application_id: ApplicationId(Uuid::new_v4().to_string()),
            cpf: request.cpf.clone(),
            date_of_birth: request.date_of_birth,
            amount_requested: request.amount_requested,
            number_of_installments: request.number_of_installments,
            monthly_income: request.monthly_income,
            status: LoanStatus::PendingAssessment,
            rejection_reason: None,
            amount_approved: None,
            interest_rate: None,
            approved_installments: None,
            installment_value: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn snapshot(&self) -> IntakeSnapshot {
        IntakeSnapshot {
            application_id: self.application_id.clone(),
            cpf: self.cpf.clone(),
            date_of_birth: self.date_of_birth,
            amount_requested: self.amount_requested,
            number_of_installments: self.number_of_installments,
            monthly_income: self.monthly_income,
        }
    }

    pub fn status_view(&self) -> ApplicationStatusView {
        ApplicationStatusView {
            application_id: self.application_id.clone(),
            status: self.status.label(),
            reason: self.rejection_reason.clone(),
            amount_approved: self.amount_approved,
            installment_value: self.installment_value,
        }
    }
}

/// Sanitized representation of an application's exposed status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatusView {
    pub application_id: ApplicationId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_approved: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_value: Option<Money>,
}

/// Storage abstraction so the intake service can be exercised in isolation.
pub trait SnapshotStore: Send + Sync {
    fn insert(&self, record: LoanApplicationRecord) -> Result<(), StoreError>;
    fn update(&self, record: LoanApplicationRecord) -> Result<(), StoreError>;
    fn fetch(&self, id: &ApplicationId) -> Result<Option<LoanApplicationRecord>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("application store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("application validation failed: {0}")]
    Validation(String),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to publish application received event")]
    EventPublishing(#[from] PublishError),
}

/// Front door of the pipeline: validates, stores, and announces new
/// applications, and later persists the decision the engine calls back with.
pub struct IntakeService<S, P, C> {
    store: Arc<S>,
    events: Arc<P>,
    checks: Arc<C>,
}

impl<S, P, C> IntakeService<S, P, C>
where
    S: SnapshotStore,
    P: EventPublisher<ApplicationReceived>,
    C: ApplicantChecks,
{
    pub fn new(store: Arc<S>, events: Arc<P>, checks: Arc<C>) -> Self {
        Self {
            store,
            events,
            checks,
        }
    }

    pub async fn submit(
        &self,
        request: LoanApplicationRequest,
    ) -> Result<LoanApplicationRecord, IntakeError> {
        self.submit_at(request, Utc::now().date_naive()).await
    }

    /// Submission with an explicit reference date for age computation.
    pub async fn submit_at(
        &self,
        request: LoanApplicationRequest,
        today: NaiveDate,
    ) -> Result<LoanApplicationRecord, IntakeError> {
        let mut validation_errors = local_validation(&request, today);

        let checks = run_applicant_checks(self.checks.as_ref(), &request.cpf).await;
        validation_errors.extend(checks.blocking_messages());

        if !validation_errors.is_empty() {
            info!(
                cpf = %request.cpf,
                errors = validation_errors.len(),
                "application rejected at intake validation"
            );
            return Err(IntakeError::Validation(validation_errors.join("; ")));
        }

        let record = LoanApplicationRecord::from_request(&request);
        self.store.insert(record.clone())?;
        info!(application_id = %record.application_id, "loan application stored");

        let event = ApplicationReceived::from_snapshot(&record.snapshot(), Utc::now());
        if let Err(publish_error) = self.events.publish(event).await {
            // Compensation: the record exists but the pipeline will never
            // hear about it, so mark it for operator attention.
            error!(
                application_id = %record.application_id,
                error = %publish_error,
                "failed to publish application received event, compensating record status"
            );
            let mut failed = record;
            failed.status = LoanStatus::EventPublishingFailed;
            failed.updated_at = Utc::now();
            if let Err(store_error) = self.store.update(failed) {
                error!(error = %store_error, "compensation update failed");
            }
            return Err(IntakeError::EventPublishing(publish_error));
        }

        Ok(record)
    }

    /// Persist the final decision the engine calls back with.
    pub fn apply_decision(
        &self,
        application_id: &ApplicationId,
        update: &StatusUpdateRequest,
    ) -> Result<LoanApplicationRecord, IntakeError> {
        let mut record = self
            .store
            .fetch(application_id)?
            .ok_or_else(|| IntakeError::NotFound(application_id.clone()))?;

        record.status = match update.status {
            LoanDecision::Approved => LoanStatus::Approved,
            LoanDecision::Rejected => LoanStatus::Rejected,
            LoanDecision::PendingManualReview => LoanStatus::PendingManualReview,
        };
        match update.status {
            LoanDecision::Rejected => record.rejection_reason = Some(update.reason.clone()),
            LoanDecision::Approved => {
                record.amount_approved = update.amount_approved;
                record.interest_rate = update.interest_rate;
                record.approved_installments = update.installments;
                record.installment_value = update.installment_value;
            }
            LoanDecision::PendingManualReview => {}
        }
        record.updated_at = Utc::now();

        self.store.update(record.clone())?;
        info!(
            %application_id,
            status = record.status.label(),
            "application status updated from decision"
        );
        Ok(record)
    }

    pub fn get(&self, application_id: &ApplicationId) -> Result<LoanApplicationRecord, IntakeError> {
        self.store
            .fetch(application_id)?
            .ok_or_else(|| IntakeError::NotFound(application_id.clone()))
    }
}

fn local_validation(request: &LoanApplicationRequest, today: NaiveDate) -> Vec<String> {
    let mut errors = Vec::new();

    let age = today.years_since(request.date_of_birth).unwrap_or(0);
    if !(MIN_APPLICANT_AGE..=MAX_APPLICANT_AGE).contains(&age) {
        errors.push(format!(
            "Applicant age must be between {MIN_APPLICANT_AGE} and {MAX_APPLICANT_AGE} (computed: {age})."
        ));
    }
    if request.monthly_income < MIN_MONTHLY_INCOME {
        errors.push(format!(
            "Monthly income below the minimum of {MIN_MONTHLY_INCOME}."
        ));
    }
    if request.amount_requested <= Decimal::ZERO {
        errors.push("Requested amount must be positive.".to_string());
    }
    if request.number_of_installments == 0 {
        errors.push("Installment count must be positive.".to_string());
    }

    errors
}
