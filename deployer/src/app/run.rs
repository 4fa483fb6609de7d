//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::DeployError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::workers::deployer;

/// Run the deployment daemon until `shutdown_signal` resolves
pub async fn run(
    version: String,
    mut options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeployError> {
    info!("Initializing Deployify {}...", version);

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&mut options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start daemon: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    // Shutdown
    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &mut AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<AppState>, DeployError> {
    let (app_state, jobs) = AppState::init(
        &options.storage,
        options.build.clone(),
        options.clone_timeout,
        std::mem::take(&mut options.providers),
        options.queue_capacity,
    )
    .await?;
    let app_state = Arc::new(app_state);
    shutdown_manager.with_app_state(app_state.clone())?;

    init_deployer_worker(
        options.deployer.clone(),
        app_state.clone(),
        jobs,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )
    .await?;

    if options.enable_server {
        init_server(
            options,
            app_state.clone(),
            shutdown_manager,
            shutdown_tx.subscribe(),
        )
        .await?;
    }

    Ok(app_state)
}

async fn init_deployer_worker(
    options: deployer::Options,
    app_state: Arc<AppState>,
    jobs: mpsc::Receiver<String>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DeployError> {
    info!("Initializing deployer worker...");

    let orchestrator = app_state.orchestrator.clone();

    let deployer_handle = tokio::spawn(async move {
        deployer::run(
            &options,
            orchestrator,
            jobs,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_deployer_worker_handle(deployer_handle)?;
    Ok(())
}

async fn init_server(
    options: &AppOptions,
    app_state: Arc<AppState>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DeployError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::from_app_state(&app_state);

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    app_state: Option<Arc<AppState>>,
    server_handle: Option<JoinHandle<Result<(), DeployError>>>,
    deployer_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            app_state: None,
            server_handle: None,
            deployer_worker_handle: None,
        }
    }

    pub fn with_app_state(&mut self, state: Arc<AppState>) -> Result<(), DeployError> {
        if self.app_state.is_some() {
            return Err(DeployError::ShutdownError("app_state already set".to_string()));
        }
        self.app_state = Some(state);
        Ok(())
    }

    pub fn with_deployer_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), DeployError> {
        if self.deployer_worker_handle.is_some() {
            return Err(DeployError::ShutdownError("deployer_handle already set".to_string()));
        }
        self.deployer_worker_handle = Some(handle);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), DeployError>>,
    ) -> Result<(), DeployError> {
        if self.server_handle.is_some() {
            return Err(DeployError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), DeployError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), DeployError> {
        info!("Shutting down Deployify...");

        // 1. Server, so no new jobs are accepted
        if let Some(handle) = self.server_handle.take() {
            handle.await.map_err(|e| DeployError::ShutdownError(e.to_string()))??;
        }

        // 2. Deployer worker, draining in-flight jobs
        if let Some(handle) = self.deployer_worker_handle.take() {
            handle.await.map_err(|e| DeployError::ShutdownError(e.to_string()))?;
        }

        // 3. App state
        if let Some(app_state) = self.app_state.take() {
            app_state.shutdown().await?;
        }

        info!("Shutdown complete");
        Ok(())
    }
}
