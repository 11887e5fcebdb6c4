use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::info;

use crate::pipeline::domain::{
    AntiFraudScore, AssessmentResult, AssessmentStatus, BureauScore, FraudRecommendation,
    IntakeSnapshot, PaymentHistory,
};

const MIN_BUREAU_SCORE: i32 = 300;
const HIGH_FRAUD_SCORE_THRESHOLD: i32 = 700;
const MAX_DTI_STRICT: Decimal = dec!(0.30);
const MAX_DTI_FLEXIBLE: Decimal = dec!(0.40);

/// Everything a rule may inspect. Rules are pure: they read inputs and
/// return a rejection justification, or nothing.
pub struct RuleInputs<'a> {
    pub application: &'a IntakeSnapshot,
    pub bureau: &'a BureauScore,
    pub fraud: &'a AntiFraudScore,
}

/// Contract breach detected while evaluating a rule. Intake guarantees
/// positive denominators; a violation here is a validation error surfaced to
/// the caller, never an arithmetic fault.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    #[error("monthly income must be positive to compute debt-to-income")]
    NonPositiveIncome,
    #[error("installment count must be positive to compute debt-to-income")]
    ZeroInstallments,
}

type RuleFn = fn(&RuleInputs<'_>) -> Result<Option<String>, RuleViolation>;

struct AssessmentRule {
    name: &'static str,
    check: RuleFn,
}

/// Ordered list of pass/fail rules folded left-to-right with early exit.
/// The order is correctness-relevant configuration: cheaper, more decisive
/// rules run first.
pub struct RuleChain {
    rules: Vec<AssessmentRule>,
}

impl RuleChain {
    pub fn standard() -> Self {
        Self {
            rules: vec![
                AssessmentRule {
                    name: "bureau_score_floor",
                    check: bureau_score_floor,
                },
                AssessmentRule {
                    name: "payment_history",
                    check: payment_history,
                },
                AssessmentRule {
                    name: "debt_to_income",
                    check: debt_to_income,
                },
                AssessmentRule {
                    name: "anti_fraud",
                    check: anti_fraud,
                },
            ],
        }
    }

    /// Run the chain over `inputs`, downgrading `result` on the first
    /// rejection. Once rejected, no later rule runs, so the status is
    /// monotonic by construction.
    pub fn evaluate(
        &self,
        inputs: &RuleInputs<'_>,
        result: &mut AssessmentResult,
    ) -> Result<(), RuleViolation> {
        for rule in &self.rules {
            if result.status == AssessmentStatus::Rejected {
                break;
            }
            if let Some(justification) = (rule.check)(inputs)? {
                info!(
                    application_id = %result.application_id,
                    rule = rule.name,
                    %justification,
                    "assessment rule rejected application"
                );
                result.reject(&justification);
            }
        }
        Ok(())
    }
}

fn bureau_score_floor(inputs: &RuleInputs<'_>) -> Result<Option<String>, RuleViolation> {
    if inputs.bureau.score < MIN_BUREAU_SCORE {
        return Ok(Some(format!(
            "Credit score below the minimum (score: {}).",
            inputs.bureau.score
        )));
    }
    Ok(None)
}

fn payment_history(inputs: &RuleInputs<'_>) -> Result<Option<String>, RuleViolation> {
    if inputs.bureau.payment_history == PaymentHistory::PoorOverdue60Days {
        return Ok(Some(
            "Payment history shows balances overdue past 60 days.".to_string(),
        ));
    }
    Ok(None)
}

/// Debt-to-income: estimated new installment plus existing monthly debt over
/// monthly income, at 4 decimal places half-up. Both the hard (>0.40) and
/// soft (>0.30) bands reject.
fn debt_to_income(inputs: &RuleInputs<'_>) -> Result<Option<String>, RuleViolation> {
    let application = inputs.application;
    if application.number_of_installments == 0 {
        return Err(RuleViolation::ZeroInstallments);
    }
    if application.monthly_income <= Decimal::ZERO {
        return Err(RuleViolation::NonPositiveIncome);
    }

    let estimated_installment = (application.amount_requested
        / Decimal::from(application.number_of_installments))
    .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let total_monthly_debt = estimated_installment + inputs.bureau.monthly_debts;
    let dti = (total_monthly_debt / application.monthly_income)
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
    let dti_percent =
        (dti * dec!(100)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    if dti > MAX_DTI_FLEXIBLE {
        Ok(Some(format!(
            "Debt-to-income ratio ({dti_percent}%) above the allowed maximum."
        )))
    } else if dti > MAX_DTI_STRICT {
        Ok(Some(format!(
            "Debt-to-income ratio ({dti_percent}%) requires attention."
        )))
    } else {
        Ok(None)
    }
}

fn anti_fraud(inputs: &RuleInputs<'_>) -> Result<Option<String>, RuleViolation> {
    let fraud = inputs.fraud;
    if fraud.fraud_score >= HIGH_FRAUD_SCORE_THRESHOLD {
        return Ok(Some(format!(
            "Anti-fraud score ({}) indicates high fraud risk. Recommendation: {}.",
            fraud.fraud_score, fraud.recommendation
        )));
    }
    if fraud.recommendation == FraudRecommendation::Reject {
        return Ok(Some(format!(
            "Anti-fraud recommendation is rejection (score: {}).",
            fraud.fraud_score
        )));
    }
    Ok(None)
}
