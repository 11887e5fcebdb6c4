use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::pipeline::domain::{
    round_money, round_rate, AssessmentResult, AssessmentStatus, BureauScore, IntakeSnapshot,
};

/// Tier-specific limit/interest policy. Policies are registered in a fixed
/// order and selected first-match; their score bands must partition [0,999].
pub trait RiskTierPolicy: Send + Sync {
    fn name(&self) -> &'static str;
    fn applies_to(&self, score: i32) -> bool;
    fn assess(
        &self,
        application: &IntakeSnapshot,
        bureau: &BureauScore,
        result: &mut AssessmentResult,
    );
}

/// A tier misconfiguration is fatal: guessing a tier has financial impact,
/// so the registry refuses to start with gaps or overlaps.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TierRegistryError {
    #[error("no risk tier policy claims score {score}")]
    UncoveredScore { score: i32 },
    #[error("score {score} is claimed by more than one risk tier policy")]
    OverlappingScore { score: i32 },
}

pub struct TierRegistry {
    policies: Vec<Box<dyn RiskTierPolicy>>,
}

impl std::fmt::Debug for TierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierRegistry")
            .field(
                "policies",
                &self.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TierRegistry {
    /// The production tier set, in registration order.
    pub fn standard() -> Result<Self, TierRegistryError> {
        Self::from_policies(vec![
            Box::new(ScoreFloorTier),
            Box::new(HighRiskTier),
            Box::new(StandardRiskTier),
            Box::new(LowRiskTier),
        ])
    }

    /// Build a registry after verifying that every score in [0,999] is
    /// claimed by exactly one policy.
    pub fn from_policies(
        policies: Vec<Box<dyn RiskTierPolicy>>,
    ) -> Result<Self, TierRegistryError> {
        for score in 0..=999 {
            let claims = policies
                .iter()
                .filter(|policy| policy.applies_to(score))
                .count();
            match claims {
                0 => return Err(TierRegistryError::UncoveredScore { score }),
                1 => {}
                _ => return Err(TierRegistryError::OverlappingScore { score }),
            }
        }
        Ok(Self { policies })
    }

    /// Apply the first policy claiming the bureau score. The registry is
    /// verified at construction, so a miss here means a policy lied about
    /// its band; it is reported, never papered over with a default.
    pub fn apply(
        &self,
        application: &IntakeSnapshot,
        bureau: &BureauScore,
        result: &mut AssessmentResult,
    ) -> Result<(), TierRegistryError> {
        let policy = self
            .policies
            .iter()
            .find(|policy| policy.applies_to(bureau.score))
            .ok_or(TierRegistryError::UncoveredScore {
                score: bureau.score,
            })?;
        debug!(
            application_id = %result.application_id,
            policy = policy.name(),
            score = bureau.score,
            "selected risk tier policy"
        );
        policy.assess(application, bureau, result);
        Ok(())
    }
}

const HIGH_RISK_CAP: Decimal = dec!(1_000_000.00);
const STANDARD_CAP: Decimal = dec!(5_000_000.00);
const HIGH_RISK_INCOME_MULTIPLIER: Decimal = dec!(1.5);
const STANDARD_INCOME_MULTIPLIER: Decimal = dec!(2.5);
const LOW_RISK_INCOME_MULTIPLIER: Decimal = dec!(4.5);
const HIGH_RISK_RATE: Decimal = dec!(0.18);
const STANDARD_RATE: Decimal = dec!(0.12);
const LOW_RISK_RATE: Decimal = dec!(0.08);
const MIN_ACCEPTABLE_OFFER_RATIO: Decimal = dec!(0.5);

/// Scores under 300 are rejected outright with zeroed terms, independently of
/// any earlier chain outcome.
pub struct ScoreFloorTier;

impl RiskTierPolicy for ScoreFloorTier {
    fn name(&self) -> &'static str {
        "score_floor"
    }

    fn applies_to(&self, score: i32) -> bool {
        score < 300
    }

    fn assess(
        &self,
        _application: &IntakeSnapshot,
        bureau: &BureauScore,
        result: &mut AssessmentResult,
    ) {
        result.reject(&format!(
            "Credit score too low ({}). Automatic rejection.",
            bureau.score
        ));
        result.clear_terms();
    }
}

/// 300-500: tight income multiplier, 18% rate, and a minimum-offer check --
/// if the computed limit covers less than half the requested amount the
/// application is rejected with zeroed terms.
pub struct HighRiskTier;

impl RiskTierPolicy for HighRiskTier {
    fn name(&self) -> &'static str {
        "high_risk"
    }

    fn applies_to(&self, score: i32) -> bool {
        (300..=500).contains(&score)
    }

    fn assess(
        &self,
        application: &IntakeSnapshot,
        _bureau: &BureauScore,
        result: &mut AssessmentResult,
    ) {
        result.append_justification("High risk profile identified, conditions adjusted.");
        result.status = AssessmentStatus::AdjustedConditions;

        let income_based_limit = application.monthly_income * HIGH_RISK_INCOME_MULTIPLIER;
        let recommended_limit = income_based_limit
            .min(HIGH_RISK_CAP)
            .min(application.amount_requested);
        let minimum_offer = application.amount_requested * MIN_ACCEPTABLE_OFFER_RATIO;

        if recommended_limit < minimum_offer {
            result.reject("Calculated limit too low for a high risk profile.");
            result.clear_terms();
            return;
        }

        result.recommended_limit = Some(round_money(recommended_limit));
        result.recommended_interest_rate = Some(round_rate(HIGH_RISK_RATE));
        if recommended_limit < application.amount_requested {
            result.append_justification("Recommended limit significantly adjusted.");
        }
    }
}

/// 501-699: standard multiplier and 12% rate.
pub struct StandardRiskTier;

impl RiskTierPolicy for StandardRiskTier {
    fn name(&self) -> &'static str {
        "standard_risk"
    }

    fn applies_to(&self, score: i32) -> bool {
        (501..=699).contains(&score)
    }

    fn assess(
        &self,
        application: &IntakeSnapshot,
        _bureau: &BureauScore,
        result: &mut AssessmentResult,
    ) {
        result.append_justification("Standard risk profile identified.");

        let income_based_limit = application.monthly_income * STANDARD_INCOME_MULTIPLIER;
        let recommended_limit = income_based_limit
            .min(STANDARD_CAP)
            .min(application.amount_requested);

        result.recommended_limit = Some(round_money(recommended_limit));
        result.recommended_interest_rate = Some(round_rate(STANDARD_RATE));
        if recommended_limit < application.amount_requested {
            result.append_justification("Recommended limit adjusted due to income or cap.");
        }
    }
}

/// 700 and above: widest multiplier and the lowest rate.
pub struct LowRiskTier;

impl RiskTierPolicy for LowRiskTier {
    fn name(&self) -> &'static str {
        "low_risk"
    }

    fn applies_to(&self, score: i32) -> bool {
        score >= 700
    }

    fn assess(
        &self,
        application: &IntakeSnapshot,
        _bureau: &BureauScore,
        result: &mut AssessmentResult,
    ) {
        result.append_justification("Low risk profile identified.");

        let income_based_limit = application.monthly_income * LOW_RISK_INCOME_MULTIPLIER;
        let recommended_limit = income_based_limit
            .min(STANDARD_CAP)
            .min(application.amount_requested);

        result.recommended_limit = Some(round_money(recommended_limit));
        result.recommended_interest_rate = Some(round_rate(LOW_RISK_RATE));
        if recommended_limit < application.amount_requested {
            result.append_justification("Recommended limit adjusted due to income or cap.");
        }
    }
}
