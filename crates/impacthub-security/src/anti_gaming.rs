//! Anti-Gaming Detection
//!
//! Heuristic scan of a user's recent activity for abuse patterns. A match is
//! persisted as an [`ActivityFlag`], handed to an [`EnforcementPolicy`] and
//! broadcast to subscribers. Matches are signals, never errors.

use chrono::{DateTime, Duration, Utc};
use impacthub_core::{
    actions, ActivityFlag, Donation, EnforcementAction, FlagType, ImpactResult, Proposal,
    SharedClock, User, VerificationLevel, Vote,
};
use impacthub_storage::SharedStore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Risk score ceiling
pub const MAX_RISK_SCORE: u32 = 100;

/// Reputation below which a user counts as low-trust
pub const LOW_REPUTATION_THRESHOLD: u32 = 30;

/// Default size of the suspicious-user listing
pub const DEFAULT_SUSPICIOUS_LIMIT: usize = 10;

const EVENT_CAPACITY: usize = 256;

/// Heuristic thresholds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AntiGamingConfig {
    #[serde(default = "default_rapid_fire_window_hours")]
    pub rapid_fire_window_hours: u32,
    #[serde(default = "default_rapid_fire_max_actions")]
    pub rapid_fire_max_actions: usize,
    /// Donation is unusual above this multiple of the user's historical total
    #[serde(default = "default_donation_multiplier")]
    pub donation_multiplier: f64,
    #[serde(default = "default_vote_window_hours")]
    pub vote_window_hours: u32,
    #[serde(default = "default_max_votes_per_window")]
    pub max_votes_per_window: usize,
    #[serde(default = "default_new_account_days")]
    pub new_account_days: f64,
    #[serde(default = "default_new_account_max_donations")]
    pub new_account_max_donations: usize,
    #[serde(default = "default_new_account_max_votes")]
    pub new_account_max_votes: usize,
}

fn default_rapid_fire_window_hours() -> u32 {
    1
}

fn default_rapid_fire_max_actions() -> usize {
    10
}

fn default_donation_multiplier() -> f64 {
    10.0
}

fn default_vote_window_hours() -> u32 {
    24
}

fn default_max_votes_per_window() -> usize {
    15
}

fn default_new_account_days() -> f64 {
    1.0
}

fn default_new_account_max_donations() -> usize {
    5
}

fn default_new_account_max_votes() -> usize {
    10
}

impl Default for AntiGamingConfig {
    fn default() -> Self {
        Self {
            rapid_fire_window_hours: default_rapid_fire_window_hours(),
            rapid_fire_max_actions: default_rapid_fire_max_actions(),
            donation_multiplier: default_donation_multiplier(),
            vote_window_hours: default_vote_window_hours(),
            max_votes_per_window: default_max_votes_per_window(),
            new_account_days: default_new_account_days(),
            new_account_max_donations: default_new_account_max_donations(),
            new_account_max_votes: default_new_account_max_votes(),
        }
    }
}

/// Context supplied with the action being scanned
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata {
    pub project_id: Option<String>,
    pub amount: Option<f64>,
}

impl ActionMetadata {
    pub fn donation(project_id: impl Into<String>, amount: f64) -> Self {
        Self {
            project_id: Some(project_id.into()),
            amount: Some(amount),
        }
    }
}

/// Chooses the moderation response for a raised flag
pub trait EnforcementPolicy: Send + Sync {
    fn decide(&self, flag_type: FlagType, user: &User) -> EnforcementAction;
}

/// Default escalation table
#[derive(Clone, Copy, Debug, Default)]
pub struct ModerationPolicy;

impl EnforcementPolicy for ModerationPolicy {
    fn decide(&self, flag_type: FlagType, user: &User) -> EnforcementAction {
        match flag_type {
            FlagType::WashTrading => EnforcementAction::Suspend,
            FlagType::UnusualDonationPattern if !user.is_kyc_verified => {
                EnforcementAction::RequireReverification
            }
            FlagType::NewAccountHighActivity => EnforcementAction::RequireReverification,
            _ => EnforcementAction::NotifyModerator,
        }
    }
}

/// Records flags without acting on them
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordOnlyPolicy;

impl EnforcementPolicy for RecordOnlyPolicy {
    fn decide(&self, _flag_type: FlagType, _user: &User) -> EnforcementAction {
        EnforcementAction::None
    }
}

/// Low-trust user with activity counts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousUser {
    #[serde(flatten)]
    pub user: User,
    pub donation_count: usize,
    pub vote_count: usize,
    pub flag_count: usize,
}

/// A user's activity loaded once per scan
struct Activity {
    donations: Vec<Donation>,
    votes: Vec<Vote>,
    proposals: Vec<Proposal>,
}

impl Activity {
    fn actions_since(&self, since: DateTime<Utc>) -> usize {
        self.donations.iter().filter(|d| d.created_at >= since).count()
            + self.votes.iter().filter(|v| v.created_at >= since).count()
            + self.proposals.iter().filter(|p| p.created_at >= since).count()
    }

    fn votes_since(&self, since: DateTime<Utc>) -> usize {
        self.votes.iter().filter(|v| v.created_at >= since).count()
    }

    fn total_donated(&self) -> f64 {
        self.donations.iter().map(|d| d.amount).sum()
    }
}

/// Store-backed heuristic detector
pub struct AntiGamingDetector {
    store: SharedStore,
    clock: SharedClock,
    config: AntiGamingConfig,
    policy: Arc<dyn EnforcementPolicy>,
    events: broadcast::Sender<ActivityFlag>,
}

impl AntiGamingDetector {
    pub fn new(store: SharedStore, clock: SharedClock, config: AntiGamingConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            clock,
            config,
            policy: Arc::new(ModerationPolicy),
            events,
        }
    }

    /// Replace the enforcement policy
    pub fn with_policy(mut self, policy: Arc<dyn EnforcementPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Stream of flags raised from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityFlag> {
        self.events.subscribe()
    }

    async fn load_activity(&self, user_id: &str) -> ImpactResult<Activity> {
        let (donations, votes, proposals) = futures::try_join!(
            self.store.donations_by_user(user_id),
            self.store.votes_by_user(user_id),
            self.store.proposals_by_author(user_id),
        )?;
        Ok(Activity {
            donations,
            votes,
            proposals,
        })
    }

    /// Run the heuristics in order and return the first match
    async fn evaluate(
        &self,
        user: &User,
        action: &str,
        metadata: &ActionMetadata,
    ) -> ImpactResult<Option<(FlagType, serde_json::Value)>> {
        let now = self.clock.now();
        let activity = self.load_activity(&user.id).await?;
        let cfg = &self.config;

        let window = Duration::hours(i64::from(cfg.rapid_fire_window_hours));
        let recent = activity.actions_since(now - window);
        if recent > cfg.rapid_fire_max_actions {
            return Ok(Some((
                FlagType::RapidFireActions,
                json!({ "recentActions": recent, "windowHours": cfg.rapid_fire_window_hours }),
            )));
        }

        if action == actions::DONATION {
            if let Some(project_id) = &metadata.project_id {
                if let Some(project) = self.store.find_project(project_id).await? {
                    if project.owner_id == user.id {
                        return Ok(Some((
                            FlagType::WashTrading,
                            json!({ "projectId": project.id }),
                        )));
                    }
                }
            }

            if let Some(amount) = metadata.amount {
                let total = activity.total_donated();
                if total > 0.0 && amount > total * cfg.donation_multiplier {
                    return Ok(Some((
                        FlagType::UnusualDonationPattern,
                        json!({ "amount": amount, "historicalTotal": total }),
                    )));
                }
            }
        }

        if action == actions::VOTE {
            let window = Duration::hours(i64::from(cfg.vote_window_hours));
            let votes = activity.votes_since(now - window);
            if votes > cfg.max_votes_per_window {
                return Ok(Some((
                    FlagType::VoteManipulation,
                    json!({ "recentVotes": votes, "windowHours": cfg.vote_window_hours }),
                )));
            }
        }

        let age = user.age_in_days(now);
        if age < cfg.new_account_days
            && (activity.donations.len() > cfg.new_account_max_donations
                || activity.votes.len() > cfg.new_account_max_votes)
        {
            return Ok(Some((
                FlagType::NewAccountHighActivity,
                json!({
                    "accountAgeDays": age,
                    "donations": activity.donations.len(),
                    "votes": activity.votes.len(),
                }),
            )));
        }

        Ok(None)
    }

    /// Scan one action; persists and returns the flag on a match
    pub async fn scan(
        &self,
        user_id: &str,
        action: &str,
        metadata: &ActionMetadata,
    ) -> ImpactResult<Option<ActivityFlag>> {
        let Some(user) = self.store.find_user(user_id).await? else {
            return Ok(None);
        };

        let Some((flag_type, details)) = self.evaluate(&user, action, metadata).await? else {
            return Ok(None);
        };

        let flag = ActivityFlag {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            flag_type,
            action: action.to_string(),
            details,
            enforcement: self.policy.decide(flag_type, &user),
            created_at: self.clock.now(),
        };

        self.store.append_flag(flag.clone()).await?;

        tracing::warn!(
            user_id = %flag.user_id,
            flag_type = %flag.flag_type,
            action = %flag.action,
            enforcement = ?flag.enforcement,
            "Suspicious activity detected"
        );

        // No subscribers is fine
        let _ = self.events.send(flag.clone());

        Ok(Some(flag))
    }

    /// True if the action matched a heuristic
    pub async fn detect_suspicious_activity(
        &self,
        user_id: &str,
        action: &str,
        metadata: &ActionMetadata,
    ) -> ImpactResult<bool> {
        Ok(self.scan(user_id, action, metadata).await?.is_some())
    }

    /// Additive 0-100 risk estimate; unknown users are maximal risk
    pub async fn get_user_risk_score(&self, user_id: &str) -> ImpactResult<u32> {
        let Some(user) = self.store.find_user(user_id).await? else {
            return Ok(MAX_RISK_SCORE);
        };

        let activity = self.load_activity(user_id).await?;
        let age = user.age_in_days(self.clock.now());
        let mut risk = 0u32;

        if age < 7.0 {
            risk += 30;
        } else if age < 30.0 {
            risk += 15;
        }

        if user.verification_level == VerificationLevel::Basic {
            risk += 20;
        }

        if !user.is_kyc_verified {
            risk += 25;
        }

        if age < 1.0 && (activity.donations.len() > 3 || activity.votes.len() > 5) {
            risk += 40;
        }

        if !activity.donations.is_empty() {
            let average = activity.total_donated() / activity.donations.len() as f64;
            if average > 10_000.0 {
                risk += 20;
            }
        }

        if user.reputation_score < LOW_REPUTATION_THRESHOLD {
            risk += 25;
        }

        Ok(risk.min(MAX_RISK_SCORE))
    }

    /// Low-reputation accounts created in the last week, newest first
    pub async fn get_suspicious_users(&self, limit: usize) -> ImpactResult<Vec<SuspiciousUser>> {
        let since = self.clock.now() - Duration::days(7);
        let users = self
            .store
            .recent_users_below_reputation(LOW_REPUTATION_THRESHOLD, since, limit)
            .await?;

        let mut out = Vec::with_capacity(users.len());
        for user in users {
            let (donations, votes, flags) = futures::try_join!(
                self.store.donations_by_user(&user.id),
                self.store.votes_by_user(&user.id),
                self.store.flags_for_user(&user.id),
            )?;
            out.push(SuspiciousUser {
                user,
                donation_count: donations.len(),
                vote_count: votes.len(),
                flag_count: flags.len(),
            });
        }
        Ok(out)
    }

    /// Persisted flags, newest first
    pub async fn get_user_flags(&self, user_id: &str) -> ImpactResult<Vec<ActivityFlag>> {
        self.store.flags_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use impacthub_core::{ManualClock, Project, ProposalStatus, VoteType};
    use impacthub_storage::{DataStore, MemoryStore, Transaction};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 15, 12, 0, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, AntiGamingDetector) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now()));
        let detector = AntiGamingDetector::new(store.clone(), clock, AntiGamingConfig::default());
        (store, detector)
    }

    async fn seed_user(store: &MemoryStore, id: &str, age: Duration) -> User {
        let user = User::new(id, id, now() - age);
        store.insert_user(user.clone()).await.unwrap();
        user
    }

    async fn cast_votes(store: &MemoryStore, user: &str, count: usize, at: DateTime<Utc>) {
        for i in 0..count {
            let pid = format!("{}-p{}", user, i);
            store
                .insert_proposal(Proposal::new(&pid, "t", "author", ProposalStatus::Active, at))
                .await
                .unwrap();
            store
                .transaction(
                    Transaction::new()
                        .create_vote(Vote::new(user, &pid, VoteType::For, at))
                        .adjust_tally(&pid, VoteType::For, 1),
                )
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: AntiGamingConfig =
            serde_json::from_str(r#"{ "max_votes_per_window": 5 }"#).unwrap();
        assert_eq!(cfg.max_votes_per_window, 5);
        assert_eq!(cfg.rapid_fire_max_actions, 10);
        assert_eq!(cfg.donation_multiplier, 10.0);
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let (_store, detector) = setup();
        let meta = ActionMetadata::default();
        assert!(!detector
            .detect_suspicious_activity("ghost", "vote", &meta)
            .await
            .unwrap());
        assert_eq!(detector.get_user_risk_score("ghost").await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_rapid_fire_actions() {
        let (store, detector) = setup();
        seed_user(&store, "u1", Duration::days(90)).await;
        let mut events = detector.subscribe();

        // 6 votes + 5 donations within the last hour
        cast_votes(&store, "u1", 6, now() - Duration::minutes(30)).await;
        for _ in 0..5 {
            store
                .insert_donation(Donation::new("u1", "proj", 10.0, now() - Duration::minutes(10)))
                .await
                .unwrap();
        }

        let flag = detector
            .scan("u1", "vote", &ActionMetadata::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flag.flag_type, FlagType::RapidFireActions);
        assert_eq!(flag.details["recentActions"], 11);
        assert_eq!(flag.enforcement, EnforcementAction::NotifyModerator);

        let flags = detector.get_user_flags("u1").await.unwrap();
        assert_eq!(flags.len(), 1);
        assert_eq!(events.recv().await.unwrap().id, flag.id);
    }

    #[tokio::test]
    async fn test_ten_recent_actions_is_fine() {
        let (store, detector) = setup();
        seed_user(&store, "u1", Duration::days(90)).await;
        cast_votes(&store, "u1", 10, now() - Duration::minutes(30)).await;

        assert!(!detector
            .detect_suspicious_activity("u1", "vote", &ActionMetadata::default())
            .await
            .unwrap());
        assert!(detector.get_user_flags("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wash_trading() {
        let (store, detector) = setup();
        seed_user(&store, "owner", Duration::days(90)).await;
        store
            .insert_project(Project {
                id: "proj".into(),
                title: "Clean Water".into(),
                owner_id: "owner".into(),
                created_at: now(),
            })
            .await
            .unwrap();

        let flag = detector
            .scan("owner", "donation", &ActionMetadata::donation("proj", 50.0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flag.flag_type, FlagType::WashTrading);
        assert_eq!(flag.enforcement, EnforcementAction::Suspend);

        // Same donation from someone else is fine
        seed_user(&store, "donor", Duration::days(90)).await;
        assert!(!detector
            .detect_suspicious_activity("donor", "donation", &ActionMetadata::donation("proj", 50.0))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_unusual_donation() {
        let (store, detector) = setup();
        seed_user(&store, "u1", Duration::days(90)).await;
        store
            .insert_donation(Donation::new("u1", "proj", 100.0, now() - Duration::days(20)))
            .await
            .unwrap();

        let meta = ActionMetadata::donation("proj", 1000.0);
        assert!(!detector.detect_suspicious_activity("u1", "donation", &meta).await.unwrap());

        let meta = ActionMetadata::donation("proj", 1000.01);
        let flag = detector.scan("u1", "donation", &meta).await.unwrap().unwrap();
        assert_eq!(flag.flag_type, FlagType::UnusualDonationPattern);
        assert_eq!(flag.enforcement, EnforcementAction::RequireReverification);

        // First donation has no history to compare against
        seed_user(&store, "u2", Duration::days(90)).await;
        let meta = ActionMetadata::donation("proj", 1_000_000.0);
        assert!(!detector.detect_suspicious_activity("u2", "donation", &meta).await.unwrap());
    }

    #[tokio::test]
    async fn test_vote_manipulation() {
        let (store, detector) = setup();
        seed_user(&store, "u1", Duration::days(90)).await;
        cast_votes(&store, "u1", 16, now() - Duration::hours(5)).await;

        // Only checked for votes
        assert!(!detector
            .detect_suspicious_activity("u1", "proposal", &ActionMetadata::default())
            .await
            .unwrap());

        let flag = detector
            .scan("u1", "vote", &ActionMetadata::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flag.flag_type, FlagType::VoteManipulation);
    }

    #[tokio::test]
    async fn test_new_account_high_activity() {
        let (store, detector) = setup();
        seed_user(&store, "fresh", Duration::hours(12)).await;
        cast_votes(&store, "fresh", 11, now() - Duration::hours(3)).await;

        let flag = detector
            .scan("fresh", "comment", &ActionMetadata::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flag.flag_type, FlagType::NewAccountHighActivity);
    }

    #[tokio::test]
    async fn test_record_only_policy() {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now()));
        let detector = AntiGamingDetector::new(store.clone(), clock, AntiGamingConfig::default())
            .with_policy(Arc::new(RecordOnlyPolicy));
        seed_user(&store, "u1", Duration::days(90)).await;
        cast_votes(&store, "u1", 16, now() - Duration::hours(5)).await;

        let flag = detector
            .scan("u1", "vote", &ActionMetadata::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flag.enforcement, EnforcementAction::None);
    }

    #[tokio::test]
    async fn test_risk_score() {
        let (store, detector) = setup();

        // New unverified account: 30 + 20 + 25 + 25 = 100
        seed_user(&store, "new", Duration::days(2)).await;
        assert_eq!(detector.get_user_risk_score("new").await.unwrap(), 100);

        // Established verified account: only the low-reputation penalty
        let user = User::new("vet", "vet", now() - Duration::days(365))
            .with_verification(VerificationLevel::Verified)
            .with_kyc(true);
        store.insert_user(user).await.unwrap();
        assert_eq!(detector.get_user_risk_score("vet").await.unwrap(), 25);

        // Two-week-old basic account with good reputation and KYC, big donor
        let user = User::new("whale", "whale", now() - Duration::days(14))
            .with_reputation(60)
            .with_kyc(true);
        store.insert_user(user).await.unwrap();
        store
            .insert_donation(Donation::new("whale", "proj", 50_000.0, now()))
            .await
            .unwrap();
        // 15 + 20 + 20
        assert_eq!(detector.get_user_risk_score("whale").await.unwrap(), 55);
    }

    #[tokio::test]
    async fn test_suspicious_users() {
        let (store, detector) = setup();
        seed_user(&store, "old", Duration::days(30)).await;
        seed_user(&store, "a", Duration::days(3)).await;
        seed_user(&store, "b", Duration::days(1)).await;
        store
            .insert_user(User::new("trusted", "t", now()).with_reputation(80))
            .await
            .unwrap();
        cast_votes(&store, "b", 2, now()).await;

        let users = detector.get_suspicious_users(10).await.unwrap();
        let ids: Vec<_> = users.iter().map(|s| s.user.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(users[0].vote_count, 2);

        assert_eq!(detector.get_suspicious_users(1).await.unwrap().len(), 1);
    }
}
