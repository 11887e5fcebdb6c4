//! Event-driven loan origination core.
//!
//! The crate models loan origination as a chain of independently deployable
//! stages connected by asynchronous events: intake publishes
//! `ApplicationReceived`, the assessment pipeline consumes it and publishes
//! `AssessmentCompleted`, and the decision engine consumes that, publishes
//! `DecisionMade`, and calls back into intake to persist the final status.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod telemetry;
