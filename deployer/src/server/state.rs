//! Server state

use std::sync::Arc;
use std::time::Instant;

use crate::app::state::AppState;
use crate::deploy::gateway::ProviderGateway;
use crate::deploy::providers::LocalProvider;
use crate::deploy::queue::JobQueue;
use crate::deploy::registry::ProviderRegistry;
use crate::store::DeploymentStore;

/// Server state shared across handlers
pub struct ServerState {
    pub store: Arc<dyn DeploymentStore>,
    pub queue: JobQueue,
    pub registry: ProviderRegistry,
    pub gateway: Arc<ProviderGateway>,
    pub local_provider: Arc<LocalProvider>,
    pub started_at: Instant,
}

impl ServerState {
    pub fn new(
        store: Arc<dyn DeploymentStore>,
        queue: JobQueue,
        registry: ProviderRegistry,
        gateway: Arc<ProviderGateway>,
        local_provider: Arc<LocalProvider>,
    ) -> Self {
        Self {
            store,
            queue,
            registry,
            gateway,
            local_provider,
            started_at: Instant::now(),
        }
    }

    pub fn from_app_state(app_state: &AppState) -> Self {
        Self {
            store: app_state.store.clone(),
            queue: app_state.queue.clone(),
            registry: app_state.registry.clone(),
            gateway: app_state.gateway.clone(),
            local_provider: app_state.local_provider.clone(),
            started_at: app_state.started_at,
        }
    }
}
