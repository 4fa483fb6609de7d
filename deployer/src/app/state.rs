//! Application state management

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::info;

use crate::app::options::{ProviderOptions, StorageOptions};
use crate::deploy::builder::{BuildExecutor, BuildOptions};
use crate::deploy::gateway::ProviderGateway;
use crate::deploy::git::GitCloner;
use crate::deploy::orchestrator::Orchestrator;
use crate::deploy::providers::{
    AmplifyProvider, DigitalOceanProvider, LocalProvider, NetlifyProvider, VercelProvider,
};
use crate::deploy::queue::JobQueue;
use crate::deploy::registry::ProviderRegistry;
use crate::deploy::selector::ProviderSelector;
use crate::errors::DeployError;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::StoreKind;
use crate::store::{DeploymentStore, FileStore, MemoryStore};

/// Main application state
pub struct AppState {
    /// Deployment records
    pub store: Arc<dyn DeploymentStore>,

    /// Provider catalog
    pub registry: ProviderRegistry,

    /// Provider dispatch
    pub gateway: Arc<ProviderGateway>,

    /// The local variant, for site administration
    pub local_provider: Arc<LocalProvider>,

    /// Job pipeline
    pub orchestrator: Arc<Orchestrator>,

    /// Request intake
    pub queue: JobQueue,

    /// Storage layout
    pub layout: StorageLayout,

    /// When the daemon started
    pub started_at: Instant,
}

impl AppState {
    /// Initialize application state, returning the receiving end of the job queue
    pub async fn init(
        storage: &StorageOptions,
        build: BuildOptions,
        clone_timeout: std::time::Duration,
        providers: ProviderOptions,
        queue_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<String>), DeployError> {
        info!("Initializing application state...");

        storage.layout.setup().await?;

        let store: Arc<dyn DeploymentStore> = match storage.store {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::File => Arc::new(FileStore::open(storage.layout.records_dir()).await?),
        };

        let registry = ProviderRegistry::builtin();
        let (gateway, local_provider) = build_gateway(providers);
        info!("Registered providers: {}", gateway.provider_names().join(", "));

        let orchestrator = Arc::new(
            Orchestrator::new(store.clone(), gateway.clone(), storage.layout.workspaces_dir())
                .with_cloner(Arc::new(GitCloner::new(clone_timeout)))
                .with_builder(Arc::new(BuildExecutor::new(build)))
                .with_selector(ProviderSelector::new(registry.clone())),
        );

        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let known_providers = registry.ids().into_iter().map(str::to_string).collect();
        let queue = JobQueue::new(store.clone(), sender, known_providers);

        let state = Self {
            store,
            registry,
            gateway,
            local_provider,
            orchestrator,
            queue,
            layout: storage.layout.clone(),
            started_at: Instant::now(),
        };

        Ok((state, receiver))
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), DeployError> {
        info!("Shutting down application state...");
        // Leftover workspaces belong to jobs that can no longer finish
        for name in self.layout.workspaces_dir().list_dir_names().await.unwrap_or_default() {
            let _ = self.layout.workspaces_dir().subdir(&name).delete().await;
        }
        Ok(())
    }
}

/// Register every provider variant, with the local one as fallback
pub fn build_gateway(providers: ProviderOptions) -> (Arc<ProviderGateway>, Arc<LocalProvider>) {
    let local = Arc::new(LocalProvider::new(providers.local));
    let gateway = ProviderGateway::new(local.clone())
        .with_provider(Arc::new(NetlifyProvider::new(providers.netlify)))
        .with_provider(Arc::new(VercelProvider::new(providers.vercel)))
        .with_provider(Arc::new(DigitalOceanProvider::new(providers.digitalocean)))
        .with_provider(Arc::new(AmplifyProvider::new(providers.aws_amplify)));
    (Arc::new(gateway), local)
}
