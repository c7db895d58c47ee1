//! # ImpactHub Storage
//!
//! The data store consumed by the voting, anti-gaming and reputation engines.
//!
//! ## Storage Layout
//!
//! - `users` / `projects` / `proposals` - keyed by id
//! - `votes` - unique on (user_id, proposal_id)
//! - `rate_limits` - unique on (user_id, action)
//! - `donations` / `flags` - append-only logs
//!
//! Multi-row writes go through [`DataStore::transaction`], which applies a
//! [`Transaction`] atomically: either every operation lands or none does.
//! Proposal aggregates are only ever changed by signed deltas
//! ([`WriteOp::AdjustTally`]) evaluated inside the transaction, never by
//! writing back a value computed outside it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use impacthub_core::{
    ActivityFlag, Donation, ImpactResult, Project, Proposal, RateLimit, User, Vote, VoteType,
};
use std::sync::Arc;

pub mod memory;

pub use memory::MemoryStore;

/// Shared data store handle
pub type SharedStore = Arc<dyn DataStore>;

/// A single write inside an atomic batch
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Insert a vote; fails if (user, proposal) already has one
    CreateVote(Vote),
    /// Flip an existing vote's position; aborts unless it currently is `from`
    SetVoteType {
        vote_id: String,
        from: VoteType,
        to: VoteType,
        updated_at: DateTime<Utc>,
    },
    /// Add `delta` to one side's aggregate and to `total_votes`
    AdjustTally {
        proposal_id: String,
        vote_type: VoteType,
        delta: i64,
    },
}

/// Ordered batch of writes applied atomically
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
    ops: Vec<WriteOp>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_vote(mut self, vote: Vote) -> Self {
        self.ops.push(WriteOp::CreateVote(vote));
        self
    }

    pub fn set_vote_type(
        mut self,
        vote_id: impl Into<String>,
        from: VoteType,
        to: VoteType,
        updated_at: DateTime<Utc>,
    ) -> Self {
        self.ops.push(WriteOp::SetVoteType {
            vote_id: vote_id.into(),
            from,
            to,
            updated_at,
        });
        self
    }

    pub fn adjust_tally(
        mut self,
        proposal_id: impl Into<String>,
        vote_type: VoteType,
        delta: i64,
    ) -> Self {
        self.ops.push(WriteOp::AdjustTally {
            proposal_id: proposal_id.into(),
            vote_type,
            delta,
        });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Persistence interface for ImpactHub records
#[async_trait]
pub trait DataStore: Send + Sync {
    // === Users ===
    async fn find_user(&self, id: &str) -> ImpactResult<Option<User>>;

    async fn insert_user(&self, user: User) -> ImpactResult<()>;

    /// Persist a recomputed reputation score
    async fn update_reputation_score(&self, id: &str, score: u32) -> ImpactResult<()>;

    /// Users by reputation descending
    async fn top_users_by_reputation(&self, limit: usize) -> ImpactResult<Vec<User>>;

    /// Users with `reputation_score < below` created at or after `since`, newest first
    async fn recent_users_below_reputation(
        &self,
        below: u32,
        since: DateTime<Utc>,
        limit: usize,
    ) -> ImpactResult<Vec<User>>;

    // === Projects ===
    async fn find_project(&self, id: &str) -> ImpactResult<Option<Project>>;

    async fn insert_project(&self, project: Project) -> ImpactResult<()>;

    // === Proposals ===
    async fn find_proposal(&self, id: &str) -> ImpactResult<Option<Proposal>>;

    async fn insert_proposal(&self, proposal: Proposal) -> ImpactResult<()>;

    async fn proposals_by_author(&self, user_id: &str) -> ImpactResult<Vec<Proposal>>;

    // === Votes ===
    async fn find_vote(&self, user_id: &str, proposal_id: &str) -> ImpactResult<Option<Vote>>;

    async fn votes_for_proposal(&self, proposal_id: &str) -> ImpactResult<Vec<Vote>>;

    async fn votes_by_user(&self, user_id: &str) -> ImpactResult<Vec<Vote>>;

    // === Donations ===
    async fn insert_donation(&self, donation: Donation) -> ImpactResult<()>;

    async fn donations_by_user(&self, user_id: &str) -> ImpactResult<Vec<Donation>>;

    // === Rate Limits ===
    async fn find_rate_limit(&self, user_id: &str, action: &str)
        -> ImpactResult<Option<RateLimit>>;

    /// Zero the counter and restart the window at `window_start`
    async fn reset_rate_limit(
        &self,
        user_id: &str,
        action: &str,
        window_start: DateTime<Utc>,
    ) -> ImpactResult<()>;

    /// Upsert: create with count 1 at `now`, otherwise count += 1
    async fn increment_rate_limit(
        &self,
        user_id: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> ImpactResult<RateLimit>;

    // === Activity Flags ===
    async fn append_flag(&self, flag: ActivityFlag) -> ImpactResult<()>;

    /// Flags for a user, newest first
    async fn flags_for_user(&self, user_id: &str) -> ImpactResult<Vec<ActivityFlag>>;

    // === Atomic Writes ===
    /// Apply every op or none
    async fn transaction(&self, tx: Transaction) -> ImpactResult<()>;
}
