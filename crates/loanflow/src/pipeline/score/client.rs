use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{info, warn};

use crate::pipeline::domain::{AntiFraudScore, BureauScore, Money};
use crate::pipeline::events::ApplicationReceived;

/// Failure modes of a score provider call. `NotFound` is a business signal
/// (the bureau has no record); the rest are transport-level.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("no bureau record for document {0}")]
    NotFound(String),
    #[error("score provider returned an empty or undecodable payload: {0}")]
    InvalidPayload(String),
    #[error("score provider request failed: {0}")]
    Transport(String),
}

/// Payload for the anti-fraud check, mirroring the intake event fields the
/// provider scores on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FraudCheckRequest {
    pub application_id: String,
    pub cpf: String,
    pub date_of_birth: chrono::NaiveDate,
    pub amount_requested: Money,
    pub number_of_installments: u32,
    pub monthly_income: Money,
}

impl FraudCheckRequest {
    pub fn from_event(event: &ApplicationReceived) -> Self {
        Self {
            application_id: event.application_id.0.clone(),
            cpf: event.cpf.clone(),
            date_of_birth: event.date_of_birth,
            amount_requested: event.amount_requested,
            number_of_installments: event.number_of_installments,
            monthly_income: event.monthly_income,
        }
    }
}

/// Seam over the bureau and anti-fraud providers so the assessment pipeline
/// can be exercised with in-memory doubles.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    async fn bureau_score(&self, cpf: &str) -> Result<BureauScore, ScoreError>;
    async fn fraud_check(&self, request: &FraudCheckRequest) -> Result<AntiFraudScore, ScoreError>;
}

/// HTTP client for the score providers: `GET /api/bureau/score/{cpf}` and
/// `POST /api/antifraud/check`.
pub struct HttpScoreProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpScoreProvider {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ScoreProvider for HttpScoreProvider {
    async fn bureau_score(&self, cpf: &str) -> Result<BureauScore, ScoreError> {
        let url = format!("{}/api/bureau/score/{cpf}", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| ScoreError::Transport(err.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!(cpf, "bureau has no score record");
            return Err(ScoreError::NotFound(cpf.to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|err| ScoreError::Transport(err.to_string()))?;

        let score: BureauScore = response
            .json()
            .await
            .map_err(|err| ScoreError::InvalidPayload(err.to_string()))?;
        info!(cpf, score = score.score, "fetched bureau score from provider");
        Ok(score)
    }

    async fn fraud_check(&self, request: &FraudCheckRequest) -> Result<AntiFraudScore, ScoreError> {
        let url = format!("{}/api/antifraud/check", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| ScoreError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| ScoreError::Transport(err.to_string()))?;

        let score: AntiFraudScore = response
            .json()
            .await
            .map_err(|err| ScoreError::InvalidPayload(err.to_string()))?;
        info!(
            application_id = %request.application_id,
            fraud_score = score.fraud_score,
            "fetched anti-fraud score from provider"
        );
        Ok(score)
    }
}
