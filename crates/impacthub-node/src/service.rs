//! Engine wiring
//!
//! One [`ImpactHub`] owns the voting engine, rate limiter, anti-gaming
//! detector and reputation calculator over a shared store and clock, and is
//! the state behind every HTTP handler.

use crate::config::NodeConfig;
use crate::metrics::Metrics;
use impacthub_core::{ActivityFlag, EnforcementAction, ImpactResult, SharedClock};
use impacthub_security::{
    ActionMetadata, AntiGamingDetector, RateLimiter, ReputationCalculator,
};
use impacthub_storage::SharedStore;
use impacthub_voting::{VoteRequest, VoteResponse, VotingEngine};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Governance services sharing one store
pub struct ImpactHub {
    pub store: SharedStore,
    pub clock: SharedClock,
    pub rate_limiter: Arc<RateLimiter>,
    pub voting: VotingEngine,
    pub detector: AntiGamingDetector,
    pub reputation: ReputationCalculator,
    pub metrics: Option<Arc<Metrics>>,
}

impl ImpactHub {
    pub fn new(config: &NodeConfig, store: SharedStore, clock: SharedClock) -> anyhow::Result<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(
            store.clone(),
            config.rate_limits.clone(),
            clock.clone(),
        ));
        let voting = VotingEngine::new(
            store.clone(),
            rate_limiter.clone(),
            clock.clone(),
            config.voting.clone(),
        );
        let detector =
            AntiGamingDetector::new(store.clone(), clock.clone(), config.anti_gaming.clone());
        let reputation = ReputationCalculator::new(store.clone(), clock.clone());
        let metrics = if config.metrics.enabled {
            Some(Arc::new(Metrics::new()?))
        } else {
            None
        };

        Ok(Self {
            store,
            clock,
            rate_limiter,
            voting,
            detector,
            reputation,
            metrics,
        })
    }

    /// Cast a vote and count the outcome
    ///
    /// The stored reputation score is left alone; it only changes through an
    /// explicit refresh.
    pub async fn vote(&self, request: &VoteRequest) -> ImpactResult<VoteResponse> {
        let result = self
            .voting
            .cast_vote(&request.user_id, &request.proposal_id, request.vote_type)
            .await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_vote(&result);
        }

        Ok(result?.into())
    }

    /// Scan an action and return the raised flag, if any
    pub async fn check_activity(
        &self,
        user_id: &str,
        action: &str,
        metadata: &ActionMetadata,
    ) -> ImpactResult<Option<ActivityFlag>> {
        tracing::debug!("Scanning {} activity for {}", action, user_id);
        self.detector.scan(user_id, action, metadata).await
    }

    /// Consume raised flags until the detector is dropped
    pub fn spawn_enforcement_listener(&self) -> JoinHandle<()> {
        let mut events = self.detector.subscribe();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(flag) => {
                        if let Some(metrics) = &metrics {
                            metrics.observe_flag(flag.flag_type);
                        }
                        enforce(&flag);
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!("Enforcement listener lagged, {} flags skipped", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Route a flag to its enforcement action
fn enforce(flag: &ActivityFlag) {
    match flag.enforcement {
        EnforcementAction::None => {}
        EnforcementAction::NotifyModerator => {
            tracing::info!(
                user_id = %flag.user_id,
                flag_type = %flag.flag_type,
                "Moderator review requested"
            );
        }
        EnforcementAction::RequireReverification => {
            tracing::info!(
                user_id = %flag.user_id,
                flag_type = %flag.flag_type,
                "Identity reverification required"
            );
        }
        EnforcementAction::Suspend => {
            tracing::warn!(
                user_id = %flag.user_id,
                flag_type = %flag.flag_type,
                "Account suspension requested"
            );
        }
    }
}
