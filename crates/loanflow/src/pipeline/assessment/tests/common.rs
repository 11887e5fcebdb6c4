use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::pipeline::bus::{EventPublisher, PublishError};
use crate::pipeline::domain::{
    AntiFraudScore, ApplicationId, BureauAssessment, BureauScore, FraudRecommendation,
    IntakeSnapshot, PaymentHistory,
};
use crate::pipeline::events::{ApplicationReceived, AssessmentCompleted};
use crate::pipeline::score::{
    CacheError, FraudCheckRequest, ScoreCache, ScoreError, ScoreProvider,
};

pub(super) fn received(cpf: &str, amount: Decimal, income: Decimal) -> ApplicationReceived {
    ApplicationReceived {
        application_id: ApplicationId(format!("app-{cpf}")),
        cpf: cpf.to_string(),
        date_of_birth: chrono::NaiveDate::from_ymd_opt(1990, 3, 14).expect("valid date"),
        amount_requested: amount,
        number_of_installments: 12,
        monthly_income: income,
        timestamp: Utc::now(),
    }
}

pub(super) fn snapshot(amount: Decimal, income: Decimal) -> IntakeSnapshot {
    received("12345678901", amount, income).snapshot()
}

pub(super) fn bureau(score: i32) -> BureauScore {
    BureauScore {
        cpf: "12345678901".to_string(),
        score,
        assessment: BureauAssessment::MediumRisk,
        has_restrictions: false,
        payment_history: PaymentHistory::Excellent,
        monthly_debts: dec!(0),
    }
}

pub(super) fn fraud(score: i32, recommendation: FraudRecommendation) -> AntiFraudScore {
    AntiFraudScore {
        application_id: "app-12345678901".to_string(),
        fraud_score: score,
        recommendation,
    }
}

/// Score provider double: `None` on either side simulates the corresponding
/// provider failure. Calls are counted so tests can assert on cache behavior
/// and short-circuits.
pub(super) struct StubScoreProvider {
    pub(super) bureau: Option<BureauScore>,
    pub(super) fraud: Option<AntiFraudScore>,
    pub(super) bureau_calls: AtomicU32,
    pub(super) fraud_calls: AtomicU32,
}

impl StubScoreProvider {
    pub(super) fn new(bureau: Option<BureauScore>, fraud: Option<AntiFraudScore>) -> Self {
        Self {
            bureau,
            fraud,
            bureau_calls: AtomicU32::new(0),
            fraud_calls: AtomicU32::new(0),
        }
    }

    pub(super) fn bureau_call_count(&self) -> u32 {
        self.bureau_calls.load(Ordering::SeqCst)
    }

    pub(super) fn fraud_call_count(&self) -> u32 {
        self.fraud_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreProvider for StubScoreProvider {
    async fn bureau_score(&self, cpf: &str) -> Result<BureauScore, ScoreError> {
        self.bureau_calls.fetch_add(1, Ordering::SeqCst);
        self.bureau
            .clone()
            .ok_or_else(|| ScoreError::NotFound(cpf.to_string()))
    }

    async fn fraud_check(&self, _request: &FraudCheckRequest) -> Result<AntiFraudScore, ScoreError> {
        self.fraud_calls.fetch_add(1, Ordering::SeqCst);
        self.fraud
            .clone()
            .ok_or_else(|| ScoreError::Transport("anti-fraud provider unavailable".to_string()))
    }
}

/// Cache double that is permanently unavailable.
pub(super) struct FailingCache;

impl ScoreCache for FailingCache {
    fn get(&self, _cpf: &str) -> Result<Option<BureauScore>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    fn put(
        &self,
        _cpf: &str,
        _score: &BureauScore,
        _ttl: std::time::Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingAssessmentPublisher {
    pub(super) events: Mutex<Vec<AssessmentCompleted>>,
}

impl RecordingAssessmentPublisher {
    pub(super) fn events(&self) -> Vec<AssessmentCompleted> {
        self.events.lock().expect("publisher mutex poisoned").clone()
    }
}

#[async_trait]
impl EventPublisher<AssessmentCompleted> for RecordingAssessmentPublisher {
    async fn publish(&self, event: AssessmentCompleted) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .push(event);
        Ok(())
    }
}
