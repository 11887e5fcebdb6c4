use super::common::*;
use crate::pipeline::assessment::tiering::{
    HighRiskTier, LowRiskTier, RiskTierPolicy, ScoreFloorTier, StandardRiskTier, TierRegistry,
    TierRegistryError,
};
use crate::pipeline::domain::{ApplicationId, AssessmentResult, AssessmentStatus};
use rust_decimal_macros::dec;

fn fresh_result(score: i32) -> AssessmentResult {
    AssessmentResult::seeded(
        ApplicationId("app-1".to_string()),
        "12345678901".to_string(),
        score,
    )
}

#[test]
fn standard_registry_partitions_the_score_range() {
    assert!(TierRegistry::standard().is_ok());
}

#[test]
fn exactly_one_policy_claims_every_score() {
    let policies: Vec<Box<dyn RiskTierPolicy>> = vec![
        Box::new(ScoreFloorTier),
        Box::new(HighRiskTier),
        Box::new(StandardRiskTier),
        Box::new(LowRiskTier),
    ];
    for score in 0..=999 {
        let claims = policies
            .iter()
            .filter(|policy| policy.applies_to(score))
            .count();
        assert_eq!(claims, 1, "score {score} claimed by {claims} policies");
    }
}

#[test]
fn band_boundaries_are_exact() {
    assert!(ScoreFloorTier.applies_to(299));
    assert!(!ScoreFloorTier.applies_to(300));
    assert!(HighRiskTier.applies_to(300));
    assert!(HighRiskTier.applies_to(500));
    assert!(!HighRiskTier.applies_to(501));
    assert!(StandardRiskTier.applies_to(501));
    assert!(StandardRiskTier.applies_to(699));
    assert!(!StandardRiskTier.applies_to(700));
    assert!(LowRiskTier.applies_to(700));
    assert!(LowRiskTier.applies_to(999));
}

struct BandPolicy {
    low: i32,
    high: i32,
}

impl RiskTierPolicy for BandPolicy {
    fn name(&self) -> &'static str {
        "band"
    }

    fn applies_to(&self, score: i32) -> bool {
        (self.low..=self.high).contains(&score)
    }

    fn assess(
        &self,
        _application: &crate::pipeline::domain::IntakeSnapshot,
        _bureau: &crate::pipeline::domain::BureauScore,
        _result: &mut AssessmentResult,
    ) {
    }
}

#[test]
fn registry_refuses_gaps() {
    let error = TierRegistry::from_policies(vec![
        Box::new(BandPolicy { low: 0, high: 499 }),
        Box::new(BandPolicy {
            low: 501,
            high: 999,
        }),
    ])
    .expect_err("gap at 500 must be rejected");

    assert_eq!(error, TierRegistryError::UncoveredScore { score: 500 });
}

#[test]
fn registry_refuses_overlaps() {
    let error = TierRegistry::from_policies(vec![
        Box::new(BandPolicy { low: 0, high: 500 }),
        Box::new(BandPolicy {
            low: 500,
            high: 999,
        }),
    ])
    .expect_err("overlap at 500 must be rejected");

    assert_eq!(error, TierRegistryError::OverlappingScore { score: 500 });
}

#[test]
fn low_risk_grants_requested_amount_under_income_limit() {
    // income 3000 * 4.5 = 13500, requested 5000, cap 5,000,000 -> 5000.
    let registry = TierRegistry::standard().expect("valid registry");
    let application = snapshot(dec!(5000), dec!(3000));
    let mut result = fresh_result(900);

    registry
        .apply(&application, &bureau(900), &mut result)
        .expect("tier applied");

    assert_eq!(result.status, AssessmentStatus::Approved);
    assert_eq!(result.recommended_limit, Some(dec!(5000.00)));
    assert_eq!(result.recommended_interest_rate, Some(dec!(0.0800)));
    assert!(result.justification.contains("Low risk profile identified."));
    assert!(!result.justification.contains("adjusted due to income or cap"));
}

#[test]
fn low_risk_cap_clamps_very_high_incomes() {
    let registry = TierRegistry::standard().expect("valid registry");
    let application = snapshot(dec!(10_000_000), dec!(2_000_000));
    let mut result = fresh_result(950);

    registry
        .apply(&application, &bureau(950), &mut result)
        .expect("tier applied");

    assert_eq!(result.recommended_limit, Some(dec!(5_000_000.00)));
    assert!(result
        .justification
        .contains("Recommended limit adjusted due to income or cap."));
}

#[test]
fn standard_risk_uses_standard_multiplier_and_rate() {
    // income 3000 * 2.5 = 7500, requested 5000 -> 5000 at 12%.
    let registry = TierRegistry::standard().expect("valid registry");
    let application = snapshot(dec!(5000), dec!(3000));
    let mut result = fresh_result(650);

    registry
        .apply(&application, &bureau(650), &mut result)
        .expect("tier applied");

    assert_eq!(result.status, AssessmentStatus::Approved);
    assert_eq!(result.recommended_limit, Some(dec!(5000.00)));
    assert_eq!(result.recommended_interest_rate, Some(dec!(0.1200)));
}

#[test]
fn high_risk_adjusts_conditions_and_caps_by_income() {
    // income 3000 * 1.5 = 4500 < requested 5000, still above the minimum
    // offer of 2500.
    let registry = TierRegistry::standard().expect("valid registry");
    let application = snapshot(dec!(5000), dec!(3000));
    let mut result = fresh_result(450);

    registry
        .apply(&application, &bureau(450), &mut result)
        .expect("tier applied");

    assert_eq!(result.status, AssessmentStatus::AdjustedConditions);
    assert_eq!(result.recommended_limit, Some(dec!(4500.00)));
    assert_eq!(result.recommended_interest_rate, Some(dec!(0.1800)));
    assert!(result
        .justification
        .contains("High risk profile identified, conditions adjusted."));
    assert!(result
        .justification
        .contains("Recommended limit significantly adjusted."));
}

#[test]
fn high_risk_rejects_when_offer_is_below_half_the_request() {
    // income 500 * 1.5 = 750 < 5000 * 0.5 = 2500 -> rejection with zeroed
    // terms even though the rule chain passed.
    let registry = TierRegistry::standard().expect("valid registry");
    let application = snapshot(dec!(5000), dec!(500));
    let mut result = fresh_result(450);

    registry
        .apply(&application, &bureau(450), &mut result)
        .expect("tier applied");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert_eq!(result.recommended_limit, Some(dec!(0)));
    assert_eq!(result.recommended_interest_rate, Some(dec!(0)));
    assert!(result
        .justification
        .contains("Calculated limit too low for a high risk profile."));
}

#[test]
fn score_floor_tier_rejects_with_zero_terms() {
    let registry = TierRegistry::standard().expect("valid registry");
    let application = snapshot(dec!(5000), dec!(3000));
    let mut result = fresh_result(150);

    registry
        .apply(&application, &bureau(150), &mut result)
        .expect("tier applied");

    assert_eq!(result.status, AssessmentStatus::Rejected);
    assert_eq!(result.recommended_limit, Some(dec!(0)));
    assert_eq!(result.recommended_interest_rate, Some(dec!(0)));
    assert!(result
        .justification
        .contains("Credit score too low (150). Automatic rejection."));
}
