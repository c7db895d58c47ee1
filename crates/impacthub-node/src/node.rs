//! ImpactHub node
//!
//! Owns the store, wires the engines and serves the HTTP API until a
//! shutdown signal arrives.

use crate::api;
use crate::config::NodeConfig;
use crate::demo;
use crate::service::ImpactHub;

use impacthub_core::{SharedClock, SystemClock};
use impacthub_storage::{MemoryStore, SharedStore};
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

/// Node state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Node is starting up
    Starting,
    /// Serving requests
    Running,
    /// Draining connections
    Stopping,
    /// Node has stopped
    Stopped,
}

/// ImpactHub governance node
pub struct ImpactHubNode {
    config: NodeConfig,
    hub: Arc<ImpactHub>,
    state: Arc<RwLock<NodeState>>,
}

impl ImpactHubNode {
    /// Create a node over an in-memory store and the system clock
    pub fn new(config: NodeConfig) -> anyhow::Result<Self> {
        Self::with_parts(config, Arc::new(MemoryStore::new()), SystemClock::shared())
    }

    /// Create a node over a given store and clock
    pub fn with_parts(
        config: NodeConfig,
        store: SharedStore,
        clock: SharedClock,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let hub = Arc::new(ImpactHub::new(&config, store, clock)?);
        Ok(Self {
            config,
            hub,
            state: Arc::new(RwLock::new(NodeState::Starting)),
        })
    }

    pub fn state(&self) -> NodeState {
        self.state.read().clone()
    }

    pub fn hub(&self) -> Arc<ImpactHub> {
        self.hub.clone()
    }

    /// Load the demo community into the store
    pub async fn seed_demo(&self) -> anyhow::Result<()> {
        demo::seed(self.hub.store.as_ref(), self.hub.clock.now()).await?;
        Ok(())
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!("Starting ImpactHub node...");
        *self.state.write() = NodeState::Starting;

        let addr: SocketAddr = self.config.server.address.parse()?;
        let enforcement = self.hub.spawn_enforcement_listener();
        let app = api::router(self.hub.clone(), self.config.server.cors);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("ImpactHub API listening on {}", listener.local_addr()?);
        if self.config.metrics.enabled {
            tracing::info!("Metrics: http://{}/metrics", addr);
        }

        *self.state.write() = NodeState::Running;

        let state = self.state.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                wait_for_shutdown().await;
                tracing::info!("Shutdown signal received");
                *state.write() = NodeState::Stopping;
            })
            .await?;

        enforcement.abort();
        *self.state.write() = NodeState::Stopped;
        tracing::info!("ImpactHub node stopped");
        Ok(())
    }
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
