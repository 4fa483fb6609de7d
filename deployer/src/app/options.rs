//! Application configuration options

use std::time::Duration;

use crate::deploy::builder::BuildOptions;
use crate::deploy::providers::{
    AmplifyConfig, DigitalOceanConfig, LocalConfig, NetlifyConfig, VercelConfig,
};
use crate::deploy::providers::amplify::DEFAULT_REGION;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::{Settings, StoreKind};
use crate::workers::deployer;

/// Main application options
#[derive(Debug)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage configuration
    pub storage: StorageOptions,

    /// Enable the HTTP server
    pub enable_server: bool,

    /// Server configuration
    pub server: ServerOptions,

    /// Deployer worker options
    pub deployer: deployer::Options,

    /// Ids buffered between the queue and the worker
    pub queue_capacity: usize,

    /// Build step options
    pub build: BuildOptions,

    /// Upper bound for a repository clone
    pub clone_timeout: Duration,

    /// Provider variant configuration
    pub providers: ProviderOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        let storage = StorageOptions::default();
        let server = ServerOptions::default();
        let providers = ProviderOptions {
            local: LocalConfig {
                static_dir: storage.layout.static_hosting_dir().path().to_path_buf(),
                base_url: format!("http://{}:{}/static", server.host, server.port),
            },
            ..Default::default()
        };
        Self {
            lifecycle: LifecycleOptions::default(),
            storage,
            enable_server: true,
            server,
            deployer: deployer::Options::default(),
            queue_capacity: 64,
            build: BuildOptions::default(),
            clone_timeout: Duration::from_secs(300),
            providers,
        }
    }
}

impl AppOptions {
    /// Build options from a settings document and the storage layout
    pub fn from_settings(settings: Settings, layout: StorageLayout) -> Self {
        let public_base_url = settings.server.public_base_url();
        let credentials = settings.providers.with_env_fallback();

        Self {
            lifecycle: LifecycleOptions::default(),
            storage: StorageOptions {
                layout: layout.clone(),
                store: settings.store,
            },
            enable_server: true,
            server: ServerOptions {
                host: settings.server.host.clone(),
                port: settings.server.port,
            },
            deployer: deployer::Options {
                max_concurrent_jobs: settings.worker.max_concurrent_jobs.max(1),
                job_timeout: Duration::from_secs(settings.worker.job_timeout_secs),
            },
            queue_capacity: 64,
            build: BuildOptions {
                install_dependencies: settings.build.install_dependencies,
                command_timeout: Duration::from_secs(settings.build.command_timeout_secs),
            },
            clone_timeout: Duration::from_secs(settings.build.clone_timeout_secs),
            providers: ProviderOptions {
                local: LocalConfig {
                    static_dir: layout.static_hosting_dir().path().to_path_buf(),
                    base_url: format!("{}/static", public_base_url),
                },
                netlify: NetlifyConfig {
                    access_token: credentials.netlify.access_token,
                },
                vercel: VercelConfig {
                    access_token: credentials.vercel.access_token,
                },
                digitalocean: DigitalOceanConfig {
                    access_token: credentials.digitalocean.access_token,
                },
                aws_amplify: AmplifyConfig {
                    access_key_id: credentials.aws_amplify.access_key_id,
                    secret_access_key: credentials.aws_amplify.secret_access_key,
                    region: credentials
                        .aws_amplify
                        .region
                        .unwrap_or_else(|| DEFAULT_REGION.to_string()),
                },
            },
        }
    }
}

/// Lifecycle options for the daemon
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(60),
        }
    }
}

/// Storage configuration options
#[derive(Debug, Clone, Default)]
pub struct StorageOptions {
    /// Storage layout paths
    pub layout: StorageLayout,

    /// Record store backend
    pub store: StoreKind,
}

/// Local HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Configuration handed to each provider variant
#[derive(Debug, Default)]
pub struct ProviderOptions {
    pub local: LocalConfig,
    pub netlify: NetlifyConfig,
    pub vercel: VercelConfig,
    pub digitalocean: DigitalOceanConfig,
    pub aws_amplify: AmplifyConfig,
}
