use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum ValidationCallError {
    #[error("validation provider returned an undecodable payload: {0}")]
    InvalidPayload(String),
    #[error("validation provider request failed: {0}")]
    Transport(String),
}

/// Result of the CPF regularity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpfValidation {
    pub regular: bool,
    pub message: String,
}

/// Result of the active-account check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValidation {
    pub active: bool,
    pub message: String,
}

/// Result of the internal-restrictions check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictionCheck {
    pub restricted: bool,
    pub message: String,
}

/// The three external checks intake runs before accepting an application.
#[async_trait]
pub trait ApplicantChecks: Send + Sync {
    async fn cpf_status(&self, cpf: &str) -> Result<CpfValidation, ValidationCallError>;
    async fn account_active(&self, cpf: &str) -> Result<AccountValidation, ValidationCallError>;
    async fn internal_restrictions(
        &self,
        cpf: &str,
    ) -> Result<RestrictionCheck, ValidationCallError>;
}

/// Joined results of the three checks, each already degraded to a definite
/// answer: a failed call never propagates, it becomes the conservative
/// "blocked" result with the failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicantCheckOutcome {
    pub cpf: CpfValidation,
    pub account: AccountValidation,
    pub restrictions: RestrictionCheck,
}

impl ApplicantCheckOutcome {
    /// Messages for every check that blocks the application.
    pub fn blocking_messages(&self) -> Vec<String> {
        let mut messages = Vec::new();
        if !self.cpf.regular {
            messages.push(self.cpf.message.clone());
        }
        if !self.account.active {
            messages.push(self.account.message.clone());
        }
        if self.restrictions.restricted {
            messages.push(self.restrictions.message.clone());
        }
        messages
    }
}

/// Run the three checks concurrently and barrier-join them. There is no
/// cancellation: a check that errors degrades in place while the others
/// still complete.
pub async fn run_applicant_checks<C: ApplicantChecks + ?Sized>(
    checks: &C,
    cpf: &str,
) -> ApplicantCheckOutcome {
    let (cpf_result, account_result, restriction_result) = tokio::join!(
        checks.cpf_status(cpf),
        checks.account_active(cpf),
        checks.internal_restrictions(cpf),
    );

    let cpf_validation = cpf_result.unwrap_or_else(|err| {
        warn!(cpf, error = %err, "cpf validation degraded to blocked");
        CpfValidation {
            regular: false,
            message: format!("CPF validation unavailable: {err}"),
        }
    });
    let account = account_result.unwrap_or_else(|err| {
        warn!(cpf, error = %err, "account validation degraded to blocked");
        AccountValidation {
            active: false,
            message: format!("Account validation unavailable: {err}"),
        }
    });
    let restrictions = restriction_result.unwrap_or_else(|err| {
        warn!(cpf, error = %err, "restriction check degraded to blocked");
        RestrictionCheck {
            restricted: true,
            message: format!("Internal restriction check unavailable: {err}"),
        }
    });

    ApplicantCheckOutcome {
        cpf: cpf_validation,
        account,
        restrictions,
    }
}

/// HTTP client for the three validation providers:
/// `GET /api/cpf-validation/{cpf}`, `GET /api/account-validation/{cpf}`,
/// `GET /api/internal-restrictions/{cpf}`.
pub struct HttpApplicantChecks {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApplicantChecks {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ValidationCallError> {
        let url = format!("{}{path}", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|err| ValidationCallError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| ValidationCallError::Transport(err.to_string()))?
            .json()
            .await
            .map_err(|err| ValidationCallError::InvalidPayload(err.to_string()))
    }
}

#[async_trait]
impl ApplicantChecks for HttpApplicantChecks {
    async fn cpf_status(&self, cpf: &str) -> Result<CpfValidation, ValidationCallError> {
        self.get_json(&format!("/api/cpf-validation/{cpf}")).await
    }

    async fn account_active(&self, cpf: &str) -> Result<AccountValidation, ValidationCallError> {
        self.get_json(&format!("/api/account-validation/{cpf}")).await
    }

    async fn internal_restrictions(
        &self,
        cpf: &str,
    ) -> Result<RestrictionCheck, ValidationCallError> {
        self.get_json(&format!("/api/internal-restrictions/{cpf}"))
            .await
    }
}
