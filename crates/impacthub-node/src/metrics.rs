//! Prometheus metrics

use impacthub_core::{FlagType, ImpactResult};
use impacthub_voting::VoteOutcome;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters for the governance engines
pub struct Metrics {
    registry: Registry,
    votes_recorded: IntCounter,
    votes_updated: IntCounter,
    votes_unchanged: IntCounter,
    votes_rejected: IntCounterVec,
    flags_raised: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("impacthub".to_string()), None)?;

        let votes_recorded = IntCounter::new("votes_recorded_total", "First votes recorded")?;
        let votes_updated = IntCounter::new("votes_updated_total", "Votes changed to the other side")?;
        let votes_unchanged =
            IntCounter::new("votes_unchanged_total", "Votes re-submitted with the same type")?;
        let votes_rejected = IntCounterVec::new(
            Opts::new("votes_rejected_total", "Vote requests rejected"),
            &["status"],
        )?;
        let flags_raised = IntCounterVec::new(
            Opts::new("flags_raised_total", "Anti-gaming flags raised"),
            &["flag_type"],
        )?;

        registry.register(Box::new(votes_recorded.clone()))?;
        registry.register(Box::new(votes_updated.clone()))?;
        registry.register(Box::new(votes_unchanged.clone()))?;
        registry.register(Box::new(votes_rejected.clone()))?;
        registry.register(Box::new(flags_raised.clone()))?;

        Ok(Self {
            registry,
            votes_recorded,
            votes_updated,
            votes_unchanged,
            votes_rejected,
            flags_raised,
        })
    }

    /// Count the result of one vote request
    pub fn observe_vote(&self, result: &ImpactResult<VoteOutcome>) {
        match result {
            Ok(VoteOutcome::Recorded) => self.votes_recorded.inc(),
            Ok(VoteOutcome::Updated) => self.votes_updated.inc(),
            Ok(VoteOutcome::Unchanged) => self.votes_unchanged.inc(),
            Err(e) => {
                let status = e.status_code().to_string();
                self.votes_rejected
                    .with_label_values(&[status.as_str()])
                    .inc();
            }
        }
    }

    pub fn observe_flag(&self, flag_type: FlagType) {
        let label = flag_type.to_string();
        self.flags_raised.with_label_values(&[label.as_str()]).inc();
    }

    /// Text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
