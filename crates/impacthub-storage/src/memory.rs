//! In-memory data store
//!
//! All tables sit behind one lock so a transaction observes and commits a
//! consistent snapshot. Writes are staged on copies and only swapped in once
//! every op has succeeded and every touched proposal still satisfies
//! `total_votes == votes_for + votes_against`.

use crate::{DataStore, Transaction, WriteOp};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use impacthub_core::{
    ActivityFlag, Donation, ImpactError, ImpactResult, Project, Proposal, ProposalId, RateLimit,
    User, UserId, Vote, VoteType,
};
use parking_lot::RwLock;
use std::collections::HashMap;

type VoteKey = (UserId, ProposalId);
type RateLimitKey = (UserId, String);

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    projects: HashMap<String, Project>,
    proposals: HashMap<ProposalId, Proposal>,
    votes: HashMap<VoteKey, Vote>,
    rate_limits: HashMap<RateLimitKey, RateLimit>,
    donations: Vec<Donation>,
    flags: Vec<ActivityFlag>,
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored votes
    pub fn vote_count(&self) -> usize {
        self.tables.read().votes.len()
    }
}

fn rate_key(user_id: &str, action: &str) -> RateLimitKey {
    (user_id.to_string(), action.to_string())
}

fn apply_delta(value: u64, delta: i64) -> Option<u64> {
    if delta >= 0 {
        value.checked_add(delta as u64)
    } else {
        value.checked_sub(delta.unsigned_abs())
    }
}

/// Staged copies of the rows a transaction touches
struct Staging<'a> {
    tables: &'a Tables,
    votes: HashMap<VoteKey, Vote>,
    proposals: HashMap<ProposalId, Proposal>,
}

impl<'a> Staging<'a> {
    fn new(tables: &'a Tables) -> Self {
        Self {
            tables,
            votes: HashMap::new(),
            proposals: HashMap::new(),
        }
    }

    fn vote_exists(&self, key: &VoteKey) -> bool {
        self.votes.contains_key(key) || self.tables.votes.contains_key(key)
    }

    fn vote_by_id(&mut self, vote_id: &str) -> Option<&mut Vote> {
        let key = self
            .votes
            .iter()
            .find(|(_, v)| v.id == vote_id)
            .map(|(k, _)| k.clone())
            .or_else(|| {
                self.tables
                    .votes
                    .iter()
                    .find(|(_, v)| v.id == vote_id)
                    .map(|(k, _)| k.clone())
            })?;

        if !self.votes.contains_key(&key) {
            let vote = self.tables.votes.get(&key)?.clone();
            self.votes.insert(key.clone(), vote);
        }
        self.votes.get_mut(&key)
    }

    fn proposal(&mut self, proposal_id: &str) -> Option<&mut Proposal> {
        if !self.proposals.contains_key(proposal_id) {
            let proposal = self.tables.proposals.get(proposal_id)?.clone();
            self.proposals.insert(proposal_id.to_string(), proposal);
        }
        self.proposals.get_mut(proposal_id)
    }

    fn apply(&mut self, op: WriteOp) -> ImpactResult<()> {
        match op {
            WriteOp::CreateVote(vote) => {
                if !self.tables.proposals.contains_key(&vote.proposal_id) {
                    return Err(ImpactError::TransactionAborted(format!(
                        "proposal {} does not exist",
                        vote.proposal_id
                    )));
                }
                let key = (vote.user_id.clone(), vote.proposal_id.clone());
                if self.vote_exists(&key) {
                    return Err(ImpactError::TransactionAborted(format!(
                        "user {} already voted on proposal {}",
                        vote.user_id, vote.proposal_id
                    )));
                }
                self.votes.insert(key, vote);
            }
            WriteOp::SetVoteType {
                vote_id,
                from,
                to,
                updated_at,
            } => {
                let vote = self.vote_by_id(&vote_id).ok_or_else(|| {
                    ImpactError::TransactionAborted(format!("vote {} does not exist", vote_id))
                })?;
                if vote.vote_type != from {
                    return Err(ImpactError::TransactionAborted(format!(
                        "vote {} is {} not {}",
                        vote_id, vote.vote_type, from
                    )));
                }
                vote.vote_type = to;
                vote.updated_at = updated_at;
            }
            WriteOp::AdjustTally {
                proposal_id,
                vote_type,
                delta,
            } => {
                let proposal = self.proposal(&proposal_id).ok_or_else(|| {
                    ImpactError::TransactionAborted(format!(
                        "proposal {} does not exist",
                        proposal_id
                    ))
                })?;
                let side = match vote_type {
                    VoteType::For => &mut proposal.votes_for,
                    VoteType::Against => &mut proposal.votes_against,
                };
                let underflow = || {
                    ImpactError::TransactionAborted(format!(
                        "vote count out of range on proposal {}",
                        proposal_id
                    ))
                };
                *side = apply_delta(*side, delta).ok_or_else(underflow)?;
                proposal.total_votes =
                    apply_delta(proposal.total_votes, delta).ok_or_else(underflow)?;
            }
        }
        Ok(())
    }

    fn finish(self) -> ImpactResult<(HashMap<VoteKey, Vote>, HashMap<ProposalId, Proposal>)> {
        if let Some(bad) = self.proposals.values().find(|p| !p.is_consistent()) {
            return Err(ImpactError::TransactionAborted(format!(
                "aggregate mismatch on proposal {}",
                bad.id
            )));
        }
        Ok((self.votes, self.proposals))
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn find_user(&self, id: &str) -> ImpactResult<Option<User>> {
        Ok(self.tables.read().users.get(id).cloned())
    }

    async fn insert_user(&self, user: User) -> ImpactResult<()> {
        self.tables.write().users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn update_reputation_score(&self, id: &str, score: u32) -> ImpactResult<()> {
        let mut tables = self.tables.write();
        let user = tables
            .users
            .get_mut(id)
            .ok_or_else(|| ImpactError::not_found("User not found"))?;
        user.reputation_score = score;
        Ok(())
    }

    async fn top_users_by_reputation(&self, limit: usize) -> ImpactResult<Vec<User>> {
        let tables = self.tables.read();
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| {
            b.reputation_score
                .cmp(&a.reputation_score)
                .then_with(|| a.id.cmp(&b.id))
        });
        users.truncate(limit);
        Ok(users)
    }

    async fn recent_users_below_reputation(
        &self,
        below: u32,
        since: DateTime<Utc>,
        limit: usize,
    ) -> ImpactResult<Vec<User>> {
        let tables = self.tables.read();
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.reputation_score < below && u.created_at >= since)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        users.truncate(limit);
        Ok(users)
    }

    async fn find_project(&self, id: &str) -> ImpactResult<Option<Project>> {
        Ok(self.tables.read().projects.get(id).cloned())
    }

    async fn insert_project(&self, project: Project) -> ImpactResult<()> {
        self.tables
            .write()
            .projects
            .insert(project.id.clone(), project);
        Ok(())
    }

    async fn find_proposal(&self, id: &str) -> ImpactResult<Option<Proposal>> {
        Ok(self.tables.read().proposals.get(id).cloned())
    }

    async fn insert_proposal(&self, proposal: Proposal) -> ImpactResult<()> {
        if !proposal.is_consistent() {
            return Err(ImpactError::bad_request(format!(
                "proposal {} has inconsistent vote counts",
                proposal.id
            )));
        }
        self.tables
            .write()
            .proposals
            .insert(proposal.id.clone(), proposal);
        Ok(())
    }

    async fn proposals_by_author(&self, user_id: &str) -> ImpactResult<Vec<Proposal>> {
        Ok(self
            .tables
            .read()
            .proposals
            .values()
            .filter(|p| p.author_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_vote(&self, user_id: &str, proposal_id: &str) -> ImpactResult<Option<Vote>> {
        let key = (user_id.to_string(), proposal_id.to_string());
        Ok(self.tables.read().votes.get(&key).cloned())
    }

    async fn votes_for_proposal(&self, proposal_id: &str) -> ImpactResult<Vec<Vote>> {
        Ok(self
            .tables
            .read()
            .votes
            .values()
            .filter(|v| v.proposal_id == proposal_id)
            .cloned()
            .collect())
    }

    async fn votes_by_user(&self, user_id: &str) -> ImpactResult<Vec<Vote>> {
        Ok(self
            .tables
            .read()
            .votes
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_donation(&self, donation: Donation) -> ImpactResult<()> {
        self.tables.write().donations.push(donation);
        Ok(())
    }

    async fn donations_by_user(&self, user_id: &str) -> ImpactResult<Vec<Donation>> {
        Ok(self
            .tables
            .read()
            .donations
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_rate_limit(
        &self,
        user_id: &str,
        action: &str,
    ) -> ImpactResult<Option<RateLimit>> {
        Ok(self
            .tables
            .read()
            .rate_limits
            .get(&rate_key(user_id, action))
            .cloned())
    }

    async fn reset_rate_limit(
        &self,
        user_id: &str,
        action: &str,
        window_start: DateTime<Utc>,
    ) -> ImpactResult<()> {
        let mut tables = self.tables.write();
        if let Some(row) = tables.rate_limits.get_mut(&rate_key(user_id, action)) {
            row.count = 0;
            row.window_start = window_start;
        }
        Ok(())
    }

    async fn increment_rate_limit(
        &self,
        user_id: &str,
        action: &str,
        now: DateTime<Utc>,
    ) -> ImpactResult<RateLimit> {
        let mut tables = self.tables.write();
        let row = tables
            .rate_limits
            .entry(rate_key(user_id, action))
            .and_modify(|row| row.count = row.count.saturating_add(1))
            .or_insert_with(|| RateLimit {
                user_id: user_id.to_string(),
                action: action.to_string(),
                count: 1,
                window_start: now,
            });
        Ok(row.clone())
    }

    async fn append_flag(&self, flag: ActivityFlag) -> ImpactResult<()> {
        self.tables.write().flags.push(flag);
        Ok(())
    }

    async fn flags_for_user(&self, user_id: &str) -> ImpactResult<Vec<ActivityFlag>> {
        let tables = self.tables.read();
        let mut flags: Vec<ActivityFlag> = tables
            .flags
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        flags.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(flags)
    }

    async fn transaction(&self, tx: Transaction) -> ImpactResult<()> {
        let mut tables = self.tables.write();

        let staged = {
            let mut staging = Staging::new(&tables);
            let mut result = Ok(());
            for op in tx.into_ops() {
                result = staging.apply(op);
                if result.is_err() {
                    break;
                }
            }
            result.and_then(|_| staging.finish())
        };

        match staged {
            Ok((votes, proposals)) => {
                tracing::debug!(
                    "Transaction committed: {} vote rows, {} proposal rows",
                    votes.len(),
                    proposals.len()
                );
                tables.votes.extend(votes);
                tables.proposals.extend(proposals);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Transaction rolled back: {}", e);
                Err(e)
            }
        }
    }
}
