//! External score providers (bureau and anti-fraud) and the cache-aside
//! layer in front of the bureau call.

pub mod cache;
pub mod client;

pub use cache::{CacheError, InMemoryScoreCache, ScoreCache};
pub use client::{FraudCheckRequest, HttpScoreProvider, ScoreError, ScoreProvider};
