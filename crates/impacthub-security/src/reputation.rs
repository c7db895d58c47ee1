//! Reputation Scoring
//!
//! Derives a 0-100 trust score from verification level, donation history,
//! proposal success, participation and account age, and maps it to a level
//! and a cumulative set of benefits.

use chrono::{DateTime, Utc};
use impacthub_core::{
    ImpactError, ImpactResult, ProposalStatus, SharedClock, User, UserId, VerificationLevel,
    VoterSummary,
};
use impacthub_storage::SharedStore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reputation score (0-100)
pub type ReputationScore = u32;

/// Maximum reputation score
pub const MAX_REPUTATION: ReputationScore = 100;

/// Donation points cap
pub const MAX_DONATION_POINTS: f64 = 40.0;

/// Passed-proposal points cap
pub const MAX_PROJECT_POINTS: f64 = 30.0;

/// Voting participation points cap
pub const MAX_PARTICIPATION_POINTS: f64 = 20.0;

/// Account age points cap
pub const MAX_AGE_POINTS: f64 = 10.0;

/// Default leaderboard size
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Base points for a verification level
pub fn verification_points(level: VerificationLevel) -> f64 {
    match level {
        VerificationLevel::Basic => 10.0,
        VerificationLevel::Verified => 30.0,
        VerificationLevel::Premium => 50.0,
    }
}

/// Raw behavioural inputs to the score
#[derive(Clone, Debug, PartialEq)]
pub struct ReputationInputs {
    pub verification_level: VerificationLevel,
    pub total_donated: f64,
    pub passed_proposals: usize,
    pub vote_count: usize,
    pub age_in_days: f64,
}

impl ReputationInputs {
    /// Weighted, per-component capped, rounded and clamped score
    pub fn score(&self) -> ReputationScore {
        let donation = (self.total_donated / 1000.0).min(MAX_DONATION_POINTS);
        let projects = (self.passed_proposals as f64 * 5.0).min(MAX_PROJECT_POINTS);
        let participation = (self.vote_count as f64 * 0.5).min(MAX_PARTICIPATION_POINTS);
        let age = (self.age_in_days / 30.0).min(MAX_AGE_POINTS);

        let total = verification_points(self.verification_level)
            + donation
            + projects
            + participation
            + age;

        // NaN saturates to 0 on the cast
        total.round().clamp(0.0, f64::from(MAX_REPUTATION)) as ReputationScore
    }
}

/// Named reputation tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReputationLevel {
    Newcomer,
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Legendary,
}

impl ReputationLevel {
    pub fn from_score(score: ReputationScore) -> Self {
        match score {
            90.. => ReputationLevel::Legendary,
            80..=89 => ReputationLevel::Expert,
            70..=79 => ReputationLevel::Advanced,
            60..=69 => ReputationLevel::Intermediate,
            40..=59 => ReputationLevel::Beginner,
            _ => ReputationLevel::Newcomer,
        }
    }
}

impl fmt::Display for ReputationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReputationLevel::Newcomer => "NEWCOMER",
            ReputationLevel::Beginner => "BEGINNER",
            ReputationLevel::Intermediate => "INTERMEDIATE",
            ReputationLevel::Advanced => "ADVANCED",
            ReputationLevel::Expert => "EXPERT",
            ReputationLevel::Legendary => "LEGENDARY",
        };
        write!(f, "{}", s)
    }
}

/// Privilege unlocked by reputation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Benefit {
    #[serde(rename = "Can vote on proposals")]
    Vote,
    #[serde(rename = "Can create proposals")]
    CreateProposals,
    #[serde(rename = "Higher voting weight")]
    HigherVotingWeight,
    #[serde(rename = "Can moderate content")]
    Moderate,
    #[serde(rename = "Priority support")]
    PrioritySupport,
    #[serde(rename = "Governance participation")]
    Governance,
    #[serde(rename = "Early access to features")]
    EarlyAccess,
}

impl Benefit {
    /// Cumulative benefits for a score
    pub fn for_score(score: ReputationScore) -> Vec<Benefit> {
        let tiers: [(ReputationScore, &[Benefit]); 4] = [
            (30, &[Benefit::Vote]),
            (50, &[Benefit::CreateProposals, Benefit::HigherVotingWeight]),
            (70, &[Benefit::Moderate, Benefit::PrioritySupport]),
            (90, &[Benefit::Governance, Benefit::EarlyAccess]),
        ];

        tiers
            .iter()
            .filter(|(threshold, _)| score >= *threshold)
            .flat_map(|(_, benefits)| benefits.iter().copied())
            .collect()
    }
}

/// User summary with derived tier and benefits
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationProfile {
    pub id: UserId,
    pub name: String,
    pub reputation_score: ReputationScore,
    pub verification_level: VerificationLevel,
    pub is_kyc_verified: bool,
    pub created_at: DateTime<Utc>,
    pub reputation_level: ReputationLevel,
    pub benefits: Vec<Benefit>,
}

impl From<User> for ReputationProfile {
    fn from(user: User) -> Self {
        Self {
            reputation_level: ReputationLevel::from_score(user.reputation_score),
            benefits: Benefit::for_score(user.reputation_score),
            id: user.id,
            name: user.name,
            reputation_score: user.reputation_score,
            verification_level: user.verification_level,
            is_kyc_verified: user.is_kyc_verified,
            created_at: user.created_at,
        }
    }
}

/// Store-backed reputation calculator
pub struct ReputationCalculator {
    store: SharedStore,
    clock: SharedClock,
}

impl ReputationCalculator {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Gather the score inputs for a user
    async fn inputs(&self, user: &User) -> ImpactResult<ReputationInputs> {
        let (donations, votes, proposals) = futures::try_join!(
            self.store.donations_by_user(&user.id),
            self.store.votes_by_user(&user.id),
            self.store.proposals_by_author(&user.id),
        )?;

        Ok(ReputationInputs {
            verification_level: user.verification_level,
            total_donated: donations.iter().map(|d| d.amount).sum(),
            passed_proposals: proposals
                .iter()
                .filter(|p| p.status == ProposalStatus::Passed)
                .count(),
            vote_count: votes.len(),
            age_in_days: user.age_in_days(self.clock.now()),
        })
    }

    /// Compute the score; unknown users score 0
    pub async fn calculate_reputation_score(&self, user_id: &str) -> ImpactResult<ReputationScore> {
        match self.store.find_user(user_id).await? {
            Some(user) => Ok(self.inputs(&user).await?.score()),
            None => Ok(0),
        }
    }

    /// Recompute and persist the score
    pub async fn update_user_reputation(&self, user_id: &str) -> ImpactResult<ReputationScore> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ImpactError::not_found("User not found"))?;

        let score = self.inputs(&user).await?.score();
        self.store.update_reputation_score(user_id, score).await?;

        if score != user.reputation_score {
            tracing::info!(
                "Reputation for {}: {} -> {}",
                user_id,
                user.reputation_score,
                score
            );
        }
        Ok(score)
    }

    /// Profile with level and benefits
    pub async fn get_user_reputation(&self, user_id: &str) -> ImpactResult<Option<ReputationProfile>> {
        Ok(self
            .store
            .find_user(user_id)
            .await?
            .map(ReputationProfile::from))
    }

    /// Top users by score
    pub async fn get_reputation_leaderboard(&self, limit: usize) -> ImpactResult<Vec<VoterSummary>> {
        Ok(self
            .store
            .top_users_by_reputation(limit)
            .await?
            .iter()
            .map(User::voter_summary)
            .collect())
    }
}
