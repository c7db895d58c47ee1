//! Core type definitions for ImpactHub
//!
//! Persisted records and the enums that classify them. Field names serialize
//! as camelCase to match the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User identifier
pub type UserId = String;

/// Proposal identifier
pub type ProposalId = String;

/// Project identifier
pub type ProjectId = String;

/// Milliseconds in one day
const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// Well-known rate-limited action names
pub mod actions {
    pub const VOTE: &str = "vote";
    pub const PROPOSAL: &str = "proposal";
    pub const DONATION: &str = "donation";
}

/// Tiered identity-assurance status gating platform privileges
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationLevel {
    #[default]
    Basic,
    Verified,
    Premium,
}

impl fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationLevel::Basic => write!(f, "BASIC"),
            VerificationLevel::Verified => write!(f, "VERIFIED"),
            VerificationLevel::Premium => write!(f, "PREMIUM"),
        }
    }
}

/// Proposal lifecycle status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    #[default]
    Draft,
    PendingReview,
    Active,
    Passed,
    Rejected,
    Expired,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::Draft => "DRAFT",
            ProposalStatus::PendingReview => "PENDING_REVIEW",
            ProposalStatus::Active => "ACTIVE",
            ProposalStatus::Passed => "PASSED",
            ProposalStatus::Rejected => "REJECTED",
            ProposalStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", s)
    }
}

/// A vote's position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoteType {
    For,
    Against,
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteType::For => write!(f, "FOR"),
            VoteType::Against => write!(f, "AGAINST"),
        }
    }
}

/// Platform member
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub verification_level: VerificationLevel,
    /// Derived trust metric, 0-100
    pub reputation_score: u32,
    pub is_kyc_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a BASIC, non-KYC user with zero reputation
    pub fn new(id: impl Into<UserId>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            verification_level: VerificationLevel::Basic,
            reputation_score: 0,
            is_kyc_verified: false,
            created_at,
        }
    }

    pub fn with_verification(mut self, level: VerificationLevel) -> Self {
        self.verification_level = level;
        self
    }

    pub fn with_reputation(mut self, score: u32) -> Self {
        self.reputation_score = score;
        self
    }

    pub fn with_kyc(mut self, verified: bool) -> Self {
        self.is_kyc_verified = verified;
        self
    }

    /// Fractional account age in days at `now`
    pub fn age_in_days(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / MILLIS_PER_DAY
    }

    /// Minimal identity attached to a vote listing
    pub fn voter_summary(&self) -> VoterSummary {
        VoterSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            reputation_score: self.reputation_score,
            verification_level: self.verification_level,
        }
    }
}

/// Minimal voter identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterSummary {
    pub id: UserId,
    pub name: String,
    pub reputation_score: u32,
    pub verification_level: VerificationLevel,
}

/// Fundable project
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Community-submitted initiative
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub author_id: UserId,
    pub status: ProposalStatus,
    pub votes_for: u64,
    pub votes_against: u64,
    /// Always `votes_for + votes_against`
    pub total_votes: u64,
    pub voting_start: Option<DateTime<Utc>>,
    pub voting_end: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    /// Create a proposal with zeroed aggregates and no voting window
    pub fn new(
        id: impl Into<ProposalId>,
        title: impl Into<String>,
        author_id: impl Into<UserId>,
        status: ProposalStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author_id: author_id.into(),
            status,
            votes_for: 0,
            votes_against: 0,
            total_votes: 0,
            voting_start: None,
            voting_end: None,
            created_at,
        }
    }

    pub fn with_window(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.voting_start = start;
        self.voting_end = end;
        self
    }

    /// Check the aggregate invariant
    pub fn is_consistent(&self) -> bool {
        self.votes_for.checked_add(self.votes_against) == Some(self.total_votes)
    }

    pub fn summary(&self) -> ProposalSummary {
        ProposalSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
        }
    }
}

/// Proposal fields shown in a voting history
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    pub id: ProposalId,
    pub title: String,
    pub status: ProposalStatus,
}

/// One user's vote on one proposal
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub user_id: UserId,
    pub proposal_id: ProposalId,
    pub vote_type: VoteType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vote {
    /// Create a new vote with a fresh id
    pub fn new(
        user_id: impl Into<UserId>,
        proposal_id: impl Into<ProposalId>,
        vote_type: VoteType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            proposal_id: proposal_id.into(),
            vote_type,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Windowed action counter keyed by (user, action)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimit {
    pub user_id: UserId,
    pub action: String,
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Monetary contribution to a project
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: String,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

impl Donation {
    pub fn new(
        user_id: impl Into<UserId>,
        project_id: impl Into<ProjectId>,
        amount: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            project_id: project_id.into(),
            amount,
            created_at,
        }
    }
}

/// Anti-gaming heuristic that matched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagType {
    RapidFireActions,
    WashTrading,
    UnusualDonationPattern,
    VoteManipulation,
    NewAccountHighActivity,
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlagType::RapidFireActions => "RAPID_FIRE_ACTIONS",
            FlagType::WashTrading => "WASH_TRADING",
            FlagType::UnusualDonationPattern => "UNUSUAL_DONATION_PATTERN",
            FlagType::VoteManipulation => "VOTE_MANIPULATION",
            FlagType::NewAccountHighActivity => "NEW_ACCOUNT_HIGH_ACTIVITY",
        };
        write!(f, "{}", s)
    }
}

/// Moderation response chosen for a flag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementAction {
    /// Record only
    #[default]
    None,
    NotifyModerator,
    RequireReverification,
    Suspend,
}

/// Persisted anti-gaming finding (append-only)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFlag {
    pub id: String,
    pub user_id: UserId,
    pub flag_type: FlagType,
    /// Action that triggered the scan
    pub action: String,
    /// Heuristic-specific evidence
    pub details: serde_json::Value,
    pub enforcement: EnforcementAction,
    pub created_at: DateTime<Utc>,
}
