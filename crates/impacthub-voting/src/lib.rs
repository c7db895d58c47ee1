//! # ImpactHub Voting
//!
//! One vote per (user, proposal), changeable, with proposal aggregates that
//! always agree with the stored votes.
//!
//! ## Vote Flow
//!
//! ```text
//!   request ──▶ user? ──▶ reputation gate ──▶ rate limit ──▶ proposal?
//!                                                               │
//!              ┌────────────── status / window checks ◀─────────┘
//!              ▼
//!        existing vote? ── none ──────▶ create + tally(+1)      "recorded"
//!              │
//!              ├── same type ─────────▶ no writes                "already recorded"
//!              │
//!              └── other type ────────▶ tally(-1) + flip + tally(+1)  "updated"
//! ```
//!
//! Every write set is a single store transaction of deltas.

use impacthub_core::{ProposalId, UserId, VoteType};
use serde::{Deserialize, Serialize};

pub mod engine;

pub use engine::*;

/// Voting rules
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingConfig {
    /// BASIC users below this reputation may not vote
    #[serde(default = "default_min_basic_reputation")]
    pub min_basic_reputation: u32,
}

fn default_min_basic_reputation() -> u32 {
    30
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            min_basic_reputation: default_min_basic_reputation(),
        }
    }
}

/// Incoming vote
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub user_id: UserId,
    pub proposal_id: ProposalId,
    pub vote_type: VoteType,
}

/// What a successful vote changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoteOutcome {
    /// First vote on the proposal
    Recorded,
    /// Position flipped
    Updated,
    /// Same position re-submitted; nothing written
    Unchanged,
}

impl VoteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            VoteOutcome::Recorded => "Vote recorded successfully",
            VoteOutcome::Updated => "Vote updated successfully",
            VoteOutcome::Unchanged => "Vote already recorded",
        }
    }
}

/// Vote result body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        Self {
            success: true,
            message: outcome.message().to_string(),
        }
    }
}
