use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::{
    AntiFraudScore, ApplicationId, AssessmentResult, AssessmentStatus, BureauScore,
    DecisionOutcome, IntakeSnapshot, LoanDecision, LoanTerms, Money, Rate,
};

/// Published by intake once an application has been validated and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReceived {
    pub application_id: ApplicationId,
    pub cpf: String,
    pub date_of_birth: chrono::NaiveDate,
    pub amount_requested: Money,
    pub number_of_installments: u32,
    pub monthly_income: Money,
    pub timestamp: DateTime<Utc>,
}

impl ApplicationReceived {
    pub fn from_snapshot(snapshot: &IntakeSnapshot, timestamp: DateTime<Utc>) -> Self {
        Self {
            application_id: snapshot.application_id.clone(),
            cpf: snapshot.cpf.clone(),
            date_of_birth: snapshot.date_of_birth,
            amount_requested: snapshot.amount_requested,
            number_of_installments: snapshot.number_of_installments,
            monthly_income: snapshot.monthly_income,
            timestamp,
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
}

/// Published by the assessment pipeline; carries both external scores so the
/// decision stage and auditors never re-fetch them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentCompleted {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub application_id: ApplicationId,
    pub cpf: String,
    pub status: AssessmentStatus,
    pub justification: String,
    pub credit_score_used: Option<i32>,
    pub anti_fraud_score_used: Option<i32>,
    pub approved_limit: Option<Money>,
    pub interest_rate_applied: Option<Rate>,
}

impl AssessmentCompleted {
    pub fn from_result(
        result: &AssessmentResult,
        bureau: &BureauScore,
        fraud: &AntiFraudScore,
    ) -> Self {
        Self {
            event_id: deterministic_event_id(&result.application_id, "assessment-completed"),
            timestamp: Utc::now(),
            application_id: result.application_id.clone(),
            cpf: result.cpf.clone(),
            status: result.status,
            justification: result.justification.clone(),
            credit_score_used: Some(bureau.score),
            anti_fraud_score_used: Some(fraud.fraud_score),
            approved_limit: result.recommended_limit,
            interest_rate_applied: result.recommended_interest_rate,
        }
    }

    /// Short-circuit event emitted when a score provider fails before the
    /// rule chain could run.
    pub fn failed(application_id: &ApplicationId, cpf: &str, justification: String) -> Self {
        Self {
            event_id: deterministic_event_id(application_id, "assessment-completed"),
            timestamp: Utc::now(),
            application_id: application_id.clone(),
            cpf: cpf.to_string(),
            status: AssessmentStatus::Failed,
            justification,
            credit_score_used: None,
            anti_fraud_score_used: None,
            approved_limit: None,
            interest_rate_applied: None,
        }
    }
}

/// Terminal event published by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionMade {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub application_id: ApplicationId,
    pub cpf: String,
    pub decision: LoanDecision,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<LoanTerms>,
}

impl DecisionMade {
    pub fn from_outcome(assessment: &AssessmentCompleted, outcome: &DecisionOutcome) -> Self {
        Self {
            event_id: deterministic_event_id(&assessment.application_id, "decision-made"),
            timestamp: Utc::now(),
            application_id: assessment.application_id.clone(),
            cpf: assessment.cpf.clone(),
            decision: outcome.decision,
            reason: outcome.reason.clone(),
            terms: outcome.terms.clone(),
        }
    }
}

/// Outbound event ids are a function of the application id and the stage, so
/// reprocessing a duplicate delivery yields the same id and downstream
/// consumers can de-duplicate on it.
fn deterministic_event_id(application_id: &ApplicationId, stage: &str) -> String {
    let name = format!("{}:{stage}", application_id.0);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
