//! Voting Engine
//!
//! Validation runs fail-fast in a fixed order. Writes are built as a
//! [`Transaction`] from the vote read just before it; if a concurrent writer
//! got there first the store aborts the batch and the engine re-reads and
//! rebuilds it.

use crate::{VoteOutcome, VoteResponse, VotingConfig};
use impacthub_core::{
    actions, ImpactError, ImpactResult, Proposal, ProposalStatus, ProposalSummary, SharedClock,
    VerificationLevel, Vote, VoteType, VoterSummary,
};
use impacthub_security::RateLimiter;
use impacthub_storage::{SharedStore, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Attempts before a contended vote gives up
pub const MAX_TX_ATTEMPTS: usize = 3;

/// Vote joined to its voter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteWithVoter {
    #[serde(flatten)]
    pub vote: Vote,
    pub user: Option<VoterSummary>,
}

/// Proposal with every vote cast on it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalVotes {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub votes: Vec<VoteWithVoter>,
}

/// Vote joined to its proposal
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteHistoryEntry {
    #[serde(flatten)]
    pub vote: Vote,
    pub proposal: Option<ProposalSummary>,
}

/// Store-backed voting engine
pub struct VotingEngine {
    store: SharedStore,
    rate_limiter: Arc<RateLimiter>,
    clock: SharedClock,
    config: VotingConfig,
}

impl VotingEngine {
    pub fn new(
        store: SharedStore,
        rate_limiter: Arc<RateLimiter>,
        clock: SharedClock,
        config: VotingConfig,
    ) -> Self {
        Self {
            store,
            rate_limiter,
            clock,
            config,
        }
    }

    /// Cast or change a vote
    pub async fn vote_on_proposal(
        &self,
        user_id: &str,
        proposal_id: &str,
        vote_type: VoteType,
    ) -> ImpactResult<VoteResponse> {
        self.cast_vote(user_id, proposal_id, vote_type)
            .await
            .map(VoteResponse::from)
    }

    /// Cast or change a vote, reporting what changed
    pub async fn cast_vote(
        &self,
        user_id: &str,
        proposal_id: &str,
        vote_type: VoteType,
    ) -> ImpactResult<VoteOutcome> {
        self.validate(user_id, proposal_id).await?;

        let outcome = self.apply(user_id, proposal_id, vote_type).await?;

        match outcome {
            VoteOutcome::Recorded => {
                // The vote is committed; a failed counter write must not report it as lost
                if let Err(e) = self.rate_limiter.record(user_id, actions::VOTE).await {
                    tracing::warn!("Failed to record vote rate limit for {}: {}", user_id, e);
                }
                tracing::info!("{} voted {} on {}", user_id, vote_type, proposal_id);
            }
            VoteOutcome::Updated => {
                tracing::info!("{} changed vote to {} on {}", user_id, vote_type, proposal_id);
            }
            VoteOutcome::Unchanged => {
                tracing::debug!("{} re-submitted {} on {}", user_id, vote_type, proposal_id);
            }
        }

        Ok(outcome)
    }

    async fn validate(&self, user_id: &str, proposal_id: &str) -> ImpactResult<()> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ImpactError::not_found("User not found"))?;

        if user.verification_level == VerificationLevel::Basic
            && user.reputation_score < self.config.min_basic_reputation
        {
            return Err(ImpactError::forbidden("Insufficient reputation to vote"));
        }

        self.rate_limiter.check(user_id, actions::VOTE).await?;

        let proposal = self
            .store
            .find_proposal(proposal_id)
            .await?
            .ok_or_else(|| ImpactError::not_found("Proposal not found"))?;

        if proposal.status != ProposalStatus::Active {
            return Err(ImpactError::bad_request("Proposal is not active for voting"));
        }

        let now = self.clock.now();
        if matches!(proposal.voting_start, Some(start) if now < start) {
            return Err(ImpactError::bad_request("Voting has not started yet"));
        }
        if matches!(proposal.voting_end, Some(end) if now > end) {
            return Err(ImpactError::bad_request("Voting has ended"));
        }

        Ok(())
    }

    /// Build and commit the write set, retrying on contention
    async fn apply(
        &self,
        user_id: &str,
        proposal_id: &str,
        vote_type: VoteType,
    ) -> ImpactResult<VoteOutcome> {
        let mut attempt = 1;
        loop {
            let now = self.clock.now();
            let (tx, outcome) = match self.store.find_vote(user_id, proposal_id).await? {
                None => (
                    Transaction::new()
                        .create_vote(Vote::new(user_id, proposal_id, vote_type, now))
                        .adjust_tally(proposal_id, vote_type, 1),
                    VoteOutcome::Recorded,
                ),
                Some(existing) if existing.vote_type == vote_type => {
                    return Ok(VoteOutcome::Unchanged);
                }
                Some(existing) => (
                    Transaction::new()
                        .adjust_tally(proposal_id, existing.vote_type, -1)
                        .set_vote_type(existing.id, existing.vote_type, vote_type, now)
                        .adjust_tally(proposal_id, vote_type, 1),
                    VoteOutcome::Updated,
                ),
            };

            match self.store.transaction(tx).await {
                Ok(()) => return Ok(outcome),
                Err(ImpactError::TransactionAborted(reason)) if attempt < MAX_TX_ATTEMPTS => {
                    tracing::debug!(
                        "Vote by {} on {} contended (attempt {}): {}",
                        user_id,
                        proposal_id,
                        attempt,
                        reason
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Proposal with votes and voter summaries; `None` if unknown
    pub async fn get_proposal_votes(&self, proposal_id: &str) -> ImpactResult<Option<ProposalVotes>> {
        let Some(proposal) = self.store.find_proposal(proposal_id).await? else {
            return Ok(None);
        };

        let votes = self.store.votes_for_proposal(proposal_id).await?;
        let mut joined = Vec::with_capacity(votes.len());
        for vote in votes {
            let user = self
                .store
                .find_user(&vote.user_id)
                .await?
                .map(|u| u.voter_summary());
            joined.push(VoteWithVoter { vote, user });
        }

        Ok(Some(ProposalVotes {
            proposal,
            votes: joined,
        }))
    }

    /// A user's votes, most recent first
    pub async fn get_user_voting_history(&self, user_id: &str) -> ImpactResult<Vec<VoteHistoryEntry>> {
        let mut votes = self.store.votes_by_user(user_id).await?;
        votes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut history = Vec::with_capacity(votes.len());
        for vote in votes {
            let proposal = self
                .store
                .find_proposal(&vote.proposal_id)
                .await?
                .map(|p| p.summary());
            history.push(VoteHistoryEntry { vote, proposal });
        }
        Ok(history)
    }
}
