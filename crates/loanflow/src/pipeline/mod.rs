//! The loan origination pipeline: intake, credit assessment, and decision,
//! wired together by partitioned, at-least-once event delivery.

pub mod assessment;
pub mod bus;
pub mod decision;
pub mod domain;
pub mod events;
pub mod intake;
pub mod retry;
pub mod score;

pub use assessment::{AssessmentPipeline, RuleChain, TierRegistry, TierRegistryError};
pub use bus::{EventConsumer, EventPublisher, PartitionedBus, Partitioned, PublishError};
pub use decision::{DecisionEngine, HttpIntakeStatusClient, IntakeStatusClient, StatusUpdateRequest};
pub use domain::{
    AntiFraudScore, ApplicationId, AssessmentResult, AssessmentStatus, BureauScore,
    DecisionOutcome, FraudRecommendation, IntakeSnapshot, LoanDecision, LoanStatus, LoanTerms,
    Money, PaymentHistory, Rate,
};
pub use events::{ApplicationReceived, AssessmentCompleted, DecisionMade};
pub use intake::{
    ApplicantChecks, ApplicationStatusView, HttpApplicantChecks, IntakeError, IntakeService,
    LoanApplicationRecord, LoanApplicationRequest, SnapshotStore, StoreError,
};
pub use retry::{with_retry, RetryPolicy};
pub use score::{HttpScoreProvider, InMemoryScoreCache, ScoreCache, ScoreProvider};
