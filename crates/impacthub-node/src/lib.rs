//! # ImpactHub Node
//!
//! HTTP service hosting the voting, rate-limiting, anti-gaming and
//! reputation engines.

pub mod api;
pub mod config;
pub mod demo;
pub mod metrics;
pub mod node;
pub mod service;

pub use config::{LogFormat, NodeConfig};
pub use node::{ImpactHubNode, NodeState};
pub use service::ImpactHub;
