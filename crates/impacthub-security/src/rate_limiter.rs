//! Rate Limiting
//!
//! Fixed-window per-(user, action) counters persisted in the data store.
//!
//! `check` and `record` are separate calls so the caller can perform the gated
//! action in between and only consume a slot when it succeeds. Two concurrent
//! requests can both pass `check` before either records; the limiter is a
//! moderation signal, not a security boundary, and that race is accepted.

use chrono::Duration;
use impacthub_core::{actions, ImpactError, ImpactResult, SharedClock};
use impacthub_storage::SharedStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Limit for one action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Maximum actions per window
    pub max_count: u32,
    /// Window length in hours
    pub window_hours: u32,
}

impl RateLimitRule {
    pub const fn new(max_count: u32, window_hours: u32) -> Self {
        Self {
            max_count,
            window_hours,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::hours(i64::from(self.window_hours))
    }
}

/// Rule table keyed by action name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateLimitConfig {
    rules: BTreeMap<String, RateLimitRule>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::empty()
            .with_rule(actions::VOTE, RateLimitRule::new(20, 24))
            .with_rule(actions::PROPOSAL, RateLimitRule::new(5, 24 * 30)) // 5 per month
            .with_rule(actions::DONATION, RateLimitRule::new(10, 24))
    }
}

impl RateLimitConfig {
    /// Table with no rules (nothing is limited)
    pub fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Add or replace a rule
    pub fn with_rule(mut self, action: impl Into<String>, rule: RateLimitRule) -> Self {
        self.rules.insert(action.into(), rule);
        self
    }

    pub fn rule(&self, action: &str) -> Option<&RateLimitRule> {
        self.rules.get(action)
    }

    /// Reject rules that could never admit an action
    pub fn validate(&self) -> ImpactResult<()> {
        for (action, rule) in &self.rules {
            if rule.window_hours == 0 {
                return Err(ImpactError::Config(format!(
                    "rate limit for {} has a zero-length window",
                    action
                )));
            }
        }
        Ok(())
    }
}

/// Store-backed windowed rate limiter
pub struct RateLimiter {
    store: SharedStore,
    config: RateLimitConfig,
    clock: SharedClock,
}

impl RateLimiter {
    pub fn new(store: SharedStore, config: RateLimitConfig, clock: SharedClock) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// Check if `user_id` may perform `action` now
    ///
    /// An expired window is reset here, before the caller records, so a stale
    /// window never blocks.
    pub async fn check(&self, user_id: &str, action: &str) -> ImpactResult<()> {
        let Some(rule) = self.config.rule(action) else {
            return Ok(());
        };

        let Some(row) = self.store.find_rate_limit(user_id, action).await? else {
            return Ok(());
        };

        let now = self.clock.now();
        if now - row.window_start >= rule.window() {
            tracing::debug!("Rate limit window expired for {}/{}, resetting", user_id, action);
            self.store.reset_rate_limit(user_id, action, now).await?;
            return Ok(());
        }

        if row.count >= rule.max_count {
            tracing::warn!(
                "Rate limit hit for {}/{}: {} of {}",
                user_id,
                action,
                row.count,
                rule.max_count
            );
            return Err(ImpactError::RateLimited(format!(
                "Rate limit exceeded for {}. Maximum {} per {} hours.",
                action, rule.max_count, rule.window_hours
            )));
        }

        Ok(())
    }

    /// Count one successful action
    pub async fn record(&self, user_id: &str, action: &str) -> ImpactResult<()> {
        if self.config.rule(action).is_none() {
            return Ok(());
        }
        let row = self
            .store
            .increment_rate_limit(user_id, action, self.clock.now())
            .await?;
        tracing::debug!("Recorded {} for {}: count {}", action, user_id, row.count);
        Ok(())
    }

    /// Slots left in the current window, `None` when the action is unlimited
    pub async fn remaining(&self, user_id: &str, action: &str) -> ImpactResult<Option<u32>> {
        let Some(rule) = self.config.rule(action) else {
            return Ok(None);
        };

        let used = match self.store.find_rate_limit(user_id, action).await? {
            Some(row) if self.clock.now() - row.window_start < rule.window() => row.count,
            _ => 0,
        };
        Ok(Some(rule.max_count.saturating_sub(used)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use impacthub_core::ManualClock;
    use impacthub_storage::MemoryStore;
    use std::sync::Arc;

    fn limiter(rule: RateLimitRule) -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        ));
        let config = RateLimitConfig::empty().with_rule("vote", rule);
        let limiter = RateLimiter::new(Arc::new(MemoryStore::new()), config, clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_default_rules() {
        let config = RateLimitConfig::default();
        assert_eq!(config.rule("vote"), Some(&RateLimitRule::new(20, 24)));
        assert_eq!(config.rule("proposal"), Some(&RateLimitRule::new(5, 720)));
        assert_eq!(config.rule("donation"), Some(&RateLimitRule::new(10, 24)));
        assert!(config.rule("comment").is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = RateLimitConfig::empty().with_rule("vote", RateLimitRule::new(1, 0));
        assert!(matches!(config.validate(), Err(ImpactError::Config(_))));
    }

    #[tokio::test]
    async fn test_boundary() {
        let (limiter, _clock) = limiter(RateLimitRule::new(3, 24));

        for _ in 0..3 {
            limiter.check("u1", "vote").await.unwrap();
            limiter.record("u1", "vote").await.unwrap();
        }

        let err = limiter.check("u1", "vote").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded for vote. Maximum 3 per 24 hours."
        );
        assert!(matches!(err, ImpactError::RateLimited(_)));
        assert_eq!(err.status_code(), 403);

        // Different user should work
        assert!(limiter.check("u2", "vote").await.is_ok());
    }

    #[tokio::test]
    async fn test_window_reset() {
        let (limiter, clock) = limiter(RateLimitRule::new(2, 24));

        limiter.record("u1", "vote").await.unwrap();
        limiter.record("u1", "vote").await.unwrap();
        assert!(limiter.check("u1", "vote").await.is_err());

        clock.advance(Duration::hours(23));
        assert!(limiter.check("u1", "vote").await.is_err());

        clock.advance(Duration::hours(1));
        assert!(limiter.check("u1", "vote").await.is_ok());
        assert_eq!(limiter.remaining("u1", "vote").await.unwrap(), Some(2));

        limiter.record("u1", "vote").await.unwrap();
        assert_eq!(limiter.remaining("u1", "vote").await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_unlisted_action_unlimited() {
        let (limiter, _clock) = limiter(RateLimitRule::new(1, 24));

        for _ in 0..5 {
            limiter.check("u1", "comment").await.unwrap();
            limiter.record("u1", "comment").await.unwrap();
        }
        assert_eq!(limiter.remaining("u1", "comment").await.unwrap(), None);
    }
}
