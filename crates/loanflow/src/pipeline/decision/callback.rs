use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::pipeline::domain::{ApplicationId, DecisionOutcome, LoanDecision, Money, Rate};

#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("intake responded with status {0}")]
    UnexpectedStatus(u16),
    #[error("intake request failed: {0}")]
    Transport(String),
}

/// Body of `PUT /applications/{id}/status`, the synchronous write-back that
/// persists the final decision on the intake record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: LoanDecision,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_approved: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installment_value: Option<Money>,
}

impl StatusUpdateRequest {
    pub fn from_outcome(outcome: &DecisionOutcome) -> Self {
        let reason = match (&outcome.decision, &outcome.terms) {
            (LoanDecision::Approved, Some(terms)) => format!(
                "Approved. Amount: {}, Rate: {}, Installments: {}. {}",
                terms.approved_amount,
                terms.annual_interest_rate,
                terms.number_of_installments,
                outcome.reason
            ),
            _ => outcome.reason.clone(),
        };

        Self {
            status: outcome.decision,
            reason,
            amount_approved: outcome.terms.as_ref().map(|terms| terms.approved_amount),
            interest_rate: outcome
                .terms
                .as_ref()
                .map(|terms| terms.annual_interest_rate),
            installments: outcome
                .terms
                .as_ref()
                .map(|terms| terms.number_of_installments),
            installment_value: outcome.terms.as_ref().map(|terms| terms.installment_amount),
        }
    }
}

/// Seam over the intake status endpoint so the decision engine can be
/// exercised against in-memory intake doubles.
#[async_trait]
pub trait IntakeStatusClient: Send + Sync {
    async fn update_status(
        &self,
        application_id: &ApplicationId,
        request: &StatusUpdateRequest,
    ) -> Result<(), CallbackError>;
}

/// HTTP client for the intake status endpoint. Any non-2xx response or
/// transport error is a retryable failure for the caller's policy.
pub struct HttpIntakeStatusClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpIntakeStatusClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IntakeStatusClient for HttpIntakeStatusClient {
    async fn update_status(
        &self,
        application_id: &ApplicationId,
        request: &StatusUpdateRequest,
    ) -> Result<(), CallbackError> {
        let url = format!("{}/applications/{application_id}/status", self.base_url);
        let response = self
            .http
            .put(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| CallbackError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(CallbackError::UnexpectedStatus(response.status().as_u16()));
        }
        info!(%application_id, status = ?request.status, "intake status updated");
        Ok(())
    }
}
