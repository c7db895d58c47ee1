//! # ImpactHub Security
//!
//! Abuse resistance and trust scoring for community governance.
//!
//! ## Components
//!
//! - **Rate Limiter**: Fixed-window per-action quotas
//! - **Anti-Gaming Detector**: Heuristic abuse detection with enforcement hooks
//! - **Reputation Calculator**: Behaviour-derived trust scores and benefits
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    IMPACTHUB SECURITY                     │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌──────────────────┐  ┌─────────────┐  │
//! │  │    Rate     │  │   Anti-Gaming    │  │ Reputation  │  │
//! │  │   Limiter   │  │    Detector      │  │ Calculator  │  │
//! │  └──────┬──────┘  └────────┬─────────┘  └──────┬──────┘  │
//! │         │                  │                    │         │
//! │         └──────────────────┼────────────────────┘         │
//! │                            ▼                              │
//! │                ┌───────────────────────┐                  │
//! │                │       DataStore       │                  │
//! │                └───────────────────────┘                  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod anti_gaming;
pub mod rate_limiter;
pub mod reputation;

pub use anti_gaming::*;
pub use rate_limiter::*;
pub use reputation::*;
