use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::pipeline::domain::BureauScore;

/// Bureau scores are cached for this long; anti-fraud scores are considered
/// volatile and never cached.
pub const BUREAU_SCORE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("score cache unavailable: {0}")]
    Unavailable(String),
}

/// `get`/`set-with-ttl` seam over the score cache. The cache is best-effort:
/// callers treat any error as a miss and never fail a request on it.
pub trait ScoreCache: Send + Sync {
    fn get(&self, cpf: &str) -> Result<Option<BureauScore>, CacheError>;
    fn put(&self, cpf: &str, score: &BureauScore, ttl: Duration) -> Result<(), CacheError>;
}

struct CacheEntry {
    score: BureauScore,
    expires_at: Instant,
}

/// Process-local cache with lazy expiry. Concurrent writes for the same key
/// are last-write-wins, which is safe because scores are deterministic to
/// re-fetch.
#[derive(Default)]
pub struct InMemoryScoreCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ScoreCache for InMemoryScoreCache {
    fn get(&self, cpf: &str) -> Result<Option<BureauScore>, CacheError> {
        let mut entries = self.entries.lock().expect("score cache mutex poisoned");
        match entries.get(cpf) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(Some(entry.score.clone())),
            Some(_) => {
                entries.remove(cpf);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, cpf: &str, score: &BureauScore, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().expect("score cache mutex poisoned");
        entries.insert(
            cpf.to_string(),
            CacheEntry {
                score: score.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::{BureauAssessment, PaymentHistory};
    use rust_decimal_macros::dec;

    fn score(cpf: &str) -> BureauScore {
        BureauScore {
            cpf: cpf.to_string(),
            score: 810,
            assessment: BureauAssessment::LowRisk,
            has_restrictions: false,
            payment_history: PaymentHistory::Excellent,
            monthly_debts: dec!(0),
        }
    }

    #[test]
    fn returns_cached_value_before_ttl() {
        let cache = InMemoryScoreCache::default();
        cache
            .put("11122233344", &score("11122233344"), BUREAU_SCORE_TTL)
            .expect("put succeeds");

        let hit = cache.get("11122233344").expect("get succeeds");
        assert_eq!(hit.map(|cached| cached.score), Some(810));
    }

    #[test]
    fn expires_entries_lazily() {
        let cache = InMemoryScoreCache::default();
        cache
            .put("11122233344", &score("11122233344"), Duration::ZERO)
            .expect("put succeeds");

        assert!(cache.get("11122233344").expect("get succeeds").is_none());
    }

    #[test]
    fn last_write_wins_per_key() {
        let cache = InMemoryScoreCache::default();
        let mut newer = score("11122233344");
        cache
            .put("11122233344", &newer, BUREAU_SCORE_TTL)
            .expect("put succeeds");
        newer.score = 650;
        cache
            .put("11122233344", &newer, BUREAU_SCORE_TTL)
            .expect("put succeeds");

        let hit = cache.get("11122233344").expect("get succeeds");
        assert_eq!(hit.map(|cached| cached.score), Some(650));
    }
}
