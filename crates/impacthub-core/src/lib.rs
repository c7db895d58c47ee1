//! # ImpactHub Core
//!
//! Domain types shared by every ImpactHub crate.
//!
//! This crate provides the fundamental building blocks:
//! - `User` - A platform member with a verification level and reputation score
//! - `Proposal` - A community initiative subject to FOR/AGAINST voting
//! - `Vote` - One user's position on one proposal
//! - `RateLimit` - A windowed per-(user, action) counter
//! - `Donation` / `Project` - Funding records read by the scoring engines
//! - `ActivityFlag` - A persisted anti-gaming finding
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//!   │    Voting    │     │ Anti-Gaming  │     │  Reputation  │
//!   │    Engine    │     │   Detector   │     │  Calculator  │
//!   └──────┬───────┘     └──────┬───────┘     └──────┬───────┘
//!          │                    │                    │
//!          └────────────────────┼────────────────────┘
//!                               ▼
//!                     ┌───────────────────┐
//!                     │    Data Store     │
//!                     │ (impacthub-core   │
//!                     │  types, storage)  │
//!                     └───────────────────┘
//! ```

pub mod clock;
pub mod error;
pub mod types;

pub use clock::*;
pub use error::*;
pub use types::*;

