use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Monetary amount, kept in `Decimal` to avoid float drift in limits and
/// installment values.
pub type Money = Decimal;

/// Annual or monthly interest rate as a plain fraction (0.12 = 12%).
pub type Rate = Decimal;

/// Identifier wrapper for loan applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a loan application as tracked by the intake subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    PendingAssessment,
    Approved,
    Rejected,
    PendingManualReview,
    AdjustedConditions,
    EventPublishingFailed,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::PendingAssessment => "pending_assessment",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
            LoanStatus::PendingManualReview => "pending_manual_review",
            LoanStatus::AdjustedConditions => "adjusted_conditions",
            LoanStatus::EventPublishingFailed => "event_publishing_failed",
        }
    }
}

/// Outcome of the credit assessment stage, carried on `AssessmentCompleted`.
///
/// `Unknown` absorbs wire values introduced by newer producers; the decision
/// engine routes those to manual review rather than failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentStatus {
    Approved,
    AdjustedConditions,
    Rejected,
    PendingManualReview,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Final decision over an assessed application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanDecision {
    Approved,
    Rejected,
    PendingManualReview,
}

impl LoanDecision {
    pub const fn label(self) -> &'static str {
        match self {
            LoanDecision::Approved => "approved",
            LoanDecision::Rejected => "rejected",
            LoanDecision::PendingManualReview => "manual_review",
        }
    }
}

/// Categorical risk band reported by the bureau alongside the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BureauAssessment {
    LowRisk,
    MediumRisk,
    HighRisk,
}

/// Payment-history category reported by the bureau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentHistory {
    Excellent,
    Good,
    Fair,
    PoorOverdue60Days,
}

/// Categorical recommendation returned by the anti-fraud provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FraudRecommendation {
    Accept,
    ManualReview,
    Reject,
}

impl fmt::Display for FraudRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FraudRecommendation::Accept => "ACCEPT",
            FraudRecommendation::ManualReview => "MANUAL_REVIEW",
            FraudRecommendation::Reject => "REJECT",
        };
        f.write_str(text)
    }
}

/// Creditworthiness snapshot fetched from the bureau, cached per applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BureauScore {
    pub cpf: String,
    pub score: i32,
    pub assessment: BureauAssessment,
    pub has_restrictions: bool,
    pub payment_history: PaymentHistory,
    pub monthly_debts: Money,
}

/// Fraud-risk snapshot fetched per application; volatile, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiFraudScore {
    pub application_id: String,
    pub fraud_score: i32,
    pub recommendation: FraudRecommendation,
}

/// Read-only projection of a stored application consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeSnapshot {
    pub application_id: ApplicationId,
    pub cpf: String,
    pub date_of_birth: chrono::NaiveDate,
    pub amount_requested: Money,
    pub number_of_installments: u32,
    pub monthly_income: Money,
}

/// Mutable aggregate threaded through the rule chain and tier policies.
///
/// Starts as `Approved`; rules and policies may downgrade it and append to
/// the justification, never overwrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub application_id: ApplicationId,
    pub cpf: String,
    pub status: AssessmentStatus,
    pub justification: String,
    pub final_score: i32,
    pub recommended_limit: Option<Money>,
    pub recommended_interest_rate: Option<Rate>,
}

impl AssessmentResult {
    /// Fresh result seeded with the bureau score before the chain runs.
    pub fn seeded(application_id: ApplicationId, cpf: String, score: i32) -> Self {
        Self {
            application_id,
            cpf,
            status: AssessmentStatus::Approved,
            justification: String::new(),
            final_score: score,
            recommended_limit: None,
            recommended_interest_rate: None,
        }
    }

    /// Append-only justification trail; entries are separated by a space.
    pub fn append_justification(&mut self, text: &str) {
        if !self.justification.is_empty() {
            self.justification.push(' ');
        }
        self.justification.push_str(text);
    }

    /// Downgrade to `Rejected` and record why. A rejected result stays
    /// rejected; callers must not re-approve it.
    pub fn reject(&mut self, justification: &str) {
        self.status = AssessmentStatus::Rejected;
        self.append_justification(justification);
    }

    /// Zero out any recommended terms, used when a policy rejects outright.
    pub fn clear_terms(&mut self) {
        self.recommended_limit = Some(Decimal::ZERO);
        self.recommended_interest_rate = Some(Decimal::ZERO);
    }
}

/// Derived decision over an assessed application; never persisted by the
/// pipeline itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: LoanDecision,
    pub terms: Option<LoanTerms>,
    pub reason: String,
}

/// Final credit terms for an approved loan, recomputed deterministically from
/// the approved amount and rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanTerms {
    pub approved_amount: Money,
    pub annual_interest_rate: Rate,
    pub number_of_installments: u32,
    pub installment_amount: Money,
}

/// Money rounding used everywhere a limit or amount leaves the pipeline:
/// 2 decimal places, half-even, so recomputation never drifts by a cent.
pub fn round_money(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Rate rounding: 4 decimal places, half-even.
pub fn round_rate(value: Rate) -> Rate {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointNearestEven)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn justification_is_append_only() {
        let mut result =
            AssessmentResult::seeded(ApplicationId("app-1".into()), "12345678900".into(), 640);
        result.append_justification("Standard risk profile identified.");
        result.reject("Anti-fraud recommendation is rejection (score: 720).");

        assert_eq!(result.status, AssessmentStatus::Rejected);
        assert_eq!(
            result.justification,
            "Standard risk profile identified. Anti-fraud recommendation is rejection (score: 720)."
        );
    }

    #[test]
    fn money_rounds_half_even() {
        assert_eq!(round_money(dec!(10.125)), dec!(10.12));
        assert_eq!(round_money(dec!(10.135)), dec!(10.14));
        assert_eq!(round_rate(dec!(0.18)), dec!(0.1800));
    }

    #[test]
    fn unknown_assessment_status_deserializes() {
        let status: AssessmentStatus = serde_json::from_str("\"SOMETHING_NEW\"").expect("parses");
        assert_eq!(status, AssessmentStatus::Unknown);
    }
}
