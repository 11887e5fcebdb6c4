use super::common::*;
use crate::pipeline::assessment::rules::{RuleChain, RuleInputs, RuleViolation};
use crate::pipeline::domain::{
    AssessmentResult, AssessmentStatus, FraudRecommendation, PaymentHistory,
};
use rust_decimal_macros::dec;

fn fresh_result() -> AssessmentResult {
    AssessmentResult::seeded(
        crate::pipeline::domain::ApplicationId("app-1".to_string()),
        "12345678901".to_string(),
        640,
    )
}

fn evaluate(
    bureau: crate::pipeline::domain::BureauScore,
    fraud: crate::pipeline::domain::AntiFraudScore,
    amount: rust_decimal::Decimal,
    income: rust_decimal::Decimal,
) -> Result<AssessmentResult, RuleViolation> {
    let chain = RuleChain::standard();
    let application = snapshot(amount, income);
    let mut result = fresh_result();
    chain.evaluate(
        &RuleInputs {
            application: &application,
            bureau: &bureau,
            fraud: &fraud,
        },
        &mut result,
    )?;
    Ok(result)
}

#[test]
fn score_below_floor_rejects() {
    let result = evaluate(
        bureau(299),
        fraud(100, FraudRecommendation::Accept),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert!(result
        .justification
        .contains("Credit score below the minimum (score: 299)."));
}

#[test]
fn score_at_floor_passes() {
    let result = evaluate(
        bureau(300),
        fraud(100, FraudRecommendation::Accept),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Approved);
    assert!(result.justification.is_empty());
}

#[test]
fn severe_delinquency_rejects() {
    let mut delinquent = bureau(650);
    delinquent.payment_history = PaymentHistory::PoorOverdue60Days;

    let result = evaluate(
        delinquent,
        fraud(100, FraudRecommendation::Accept),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert!(result.justification.contains("overdue past 60 days"));
}

#[test]
fn hard_debt_to_income_rejects() {
    // 5000/12 = 416.67 estimated, plus 1500 existing debt over 3000 income:
    // dti = 0.6389 > 0.40.
    let mut indebted = bureau(650);
    indebted.monthly_debts = dec!(1500);

    let result = evaluate(
        indebted,
        fraud(100, FraudRecommendation::Accept),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert!(result
        .justification
        .contains("Debt-to-income ratio (63.89%) above the allowed maximum."));
}

#[test]
fn soft_debt_to_income_band_also_rejects() {
    // 416.67 + 600 = 1016.67 over 3000: dti = 0.3389, inside (0.30, 0.40].
    let mut indebted = bureau(650);
    indebted.monthly_debts = dec!(600);

    let result = evaluate(
        indebted,
        fraud(100, FraudRecommendation::Accept),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert!(result
        .justification
        .contains("Debt-to-income ratio (33.89%) requires attention."));
}

#[test]
fn comfortable_debt_to_income_passes() {
    let result = evaluate(
        bureau(650),
        fraud(100, FraudRecommendation::Accept),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Approved);
}

#[test]
fn high_fraud_score_rejects_before_recommendation_is_considered() {
    let result = evaluate(
        bureau(650),
        fraud(900, FraudRecommendation::Accept),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert!(result
        .justification
        .contains("Anti-fraud score (900) indicates high fraud risk."));
}

#[test]
fn reject_recommendation_rejects_even_with_low_fraud_score() {
    let result = evaluate(
        bureau(650),
        fraud(200, FraudRecommendation::Reject),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert!(result
        .justification
        .contains("Anti-fraud recommendation is rejection (score: 200)."));
}

#[test]
fn chain_short_circuits_after_first_rejection() {
    // Score floor and anti-fraud would both reject; only the first runs.
    let result = evaluate(
        bureau(100),
        fraud(900, FraudRecommendation::Reject),
        dec!(5000),
        dec!(3000),
    )
    .expect("chain runs");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert!(result.justification.contains("Credit score below the minimum"));
    assert!(!result.justification.contains("Anti-fraud"));
}

#[test]
fn already_rejected_result_is_left_untouched() {
    let chain = RuleChain::standard();
    let application = snapshot(dec!(5000), dec!(3000));
    let mut result = fresh_result();
    result.reject("Rejected upstream.");

    chain
        .evaluate(
            &RuleInputs {
                application: &application,
                bureau: &bureau(100),
                fraud: &fraud(900, FraudRecommendation::Reject),
            },
            &mut result,
        )
        .expect("chain runs");

    assert_eq!(result.justification, "Rejected upstream.");
}

#[test]
fn zero_income_is_a_validation_error_not_a_panic() {
    let violation = evaluate(
        bureau(650),
        fraud(100, FraudRecommendation::Accept),
        dec!(5000),
        dec!(0),
    )
    .expect_err("zero income violates the intake contract");

    assert_eq!(violation, RuleViolation::NonPositiveIncome);
}

#[test]
fn zero_installments_is_a_validation_error() {
    let chain = RuleChain::standard();
    let mut application = snapshot(dec!(5000), dec!(3000));
    application.number_of_installments = 0;
    let mut result = fresh_result();

    let violation = chain
        .evaluate(
            &RuleInputs {
                application: &application,
                bureau: &bureau(650),
                fraud: &fraud(100, FraudRecommendation::Accept),
            },
            &mut result,
        )
        .expect_err("zero installments violates the intake contract");

    assert_eq!(violation, RuleViolation::ZeroInstallments);
}
