//! Demo dataset for local runs

use chrono::{DateTime, Duration, Utc};
use impacthub_core::{
    Donation, ImpactResult, Project, Proposal, ProposalStatus, User, VerificationLevel,
};
use impacthub_storage::DataStore;

/// Populate an empty store with a small community
pub async fn seed(store: &dyn DataStore, now: DateTime<Utc>) -> ImpactResult<()> {
    let users = [
        User::new("user_123", "John Doe", now - Duration::days(400))
            .with_verification(VerificationLevel::Verified)
            .with_reputation(75)
            .with_kyc(true),
        User::new("user_456", "Amara Okafor", now - Duration::days(120))
            .with_verification(VerificationLevel::Premium)
            .with_reputation(88)
            .with_kyc(true),
        User::new("user_789", "Lena Fischer", now - Duration::days(45)).with_reputation(35),
        User::new("user_new", "Sam Newcomer", now - Duration::days(2)).with_reputation(10),
    ];
    for user in users {
        store.insert_user(user).await?;
    }

    let window = (Some(now - Duration::days(1)), Some(now + Duration::days(30)));
    let proposals = [
        Proposal::new("1", "Community Garden Initiative", "user_123", ProposalStatus::Active, now)
            .with_window(window.0, window.1),
        Proposal::new("2", "Digital Literacy Program", "user_123", ProposalStatus::Active, now)
            .with_window(window.0, window.1),
        Proposal::new(
            "3",
            "Mental Health Support Network",
            "user_123",
            ProposalStatus::Passed,
            now - Duration::days(60),
        ),
    ];
    for proposal in proposals {
        store.insert_proposal(proposal).await?;
    }

    store
        .insert_project(Project {
            id: "project_water".into(),
            title: "Clean Water Wells".into(),
            owner_id: "user_456".into(),
            created_at: now - Duration::days(90),
        })
        .await?;

    store
        .insert_donation(Donation::new("user_123", "project_water", 2500.0, now - Duration::days(10)))
        .await?;
    store
        .insert_donation(Donation::new("user_789", "project_water", 150.0, now - Duration::days(3)))
        .await?;

    tracing::info!("Seeded demo dataset");
    Ok(())
}
