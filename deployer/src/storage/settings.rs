//! Settings file management

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::logs::LogLevel;

/// Daemon settings, read from `settings.json`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub log_json: bool,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Deployer worker configuration
    #[serde(default)]
    pub worker: WorkerSettings,

    /// Build step configuration
    #[serde(default)]
    pub build: BuildSettings,

    /// Record store backend
    #[serde(default)]
    pub store: StoreKind,

    /// Provider credentials
    #[serde(default)]
    pub providers: ProviderSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable URL of this server, used for locally hosted sites
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

impl ServerSettings {
    /// Public base URL, falling back to the bind address
    pub fn public_base_url(&self) -> String {
        match &self.public_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

/// Deployer worker settings
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_job_timeout_secs() -> u64 {
    30 * 60
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            job_timeout_secs: default_job_timeout_secs(),
        }
    }
}

/// Build step settings
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSettings {
    #[serde(default = "default_true")]
    pub install_dependencies: bool,

    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_clone_timeout_secs")]
    pub clone_timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_command_timeout_secs() -> u64 {
    15 * 60
}

fn default_clone_timeout_secs() -> u64 {
    5 * 60
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            install_dependencies: true,
            command_timeout_secs: default_command_timeout_secs(),
            clone_timeout_secs: default_clone_timeout_secs(),
        }
    }
}

/// Record store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    #[default]
    File,
}

/// Credentials per provider
#[derive(Debug, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub netlify: TokenCredentials,

    #[serde(default)]
    pub vercel: TokenCredentials,

    #[serde(default)]
    pub digitalocean: TokenCredentials,

    #[serde(default)]
    pub aws_amplify: AwsCredentials,
}

impl ProviderSettings {
    /// Fill unset credentials from the conventional environment variables
    pub fn with_env_fallback(mut self) -> Self {
        fill_from_env(&mut self.netlify.access_token, "NETLIFY_ACCESS_TOKEN");
        fill_from_env(&mut self.vercel.access_token, "VERCEL_ACCESS_TOKEN");
        fill_from_env(&mut self.digitalocean.access_token, "DIGITALOCEAN_ACCESS_TOKEN");
        fill_from_env(&mut self.aws_amplify.access_key_id, "AWS_ACCESS_KEY_ID");
        fill_from_env(&mut self.aws_amplify.secret_access_key, "AWS_SECRET_ACCESS_KEY");
        if self.aws_amplify.region.is_none() {
            self.aws_amplify.region = std::env::var("AWS_REGION").ok();
        }
        self
    }
}

/// A single access token
#[derive(Debug, Default, Deserialize)]
pub struct TokenCredentials {
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub access_token: Option<SecretString>,
}

/// AWS key pair and region
#[derive(Debug, Default, Deserialize)]
pub struct AwsCredentials {
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub access_key_id: Option<SecretString>,

    #[serde(default, deserialize_with = "deserialize_secret")]
    pub secret_access_key: Option<SecretString>,

    #[serde(default)]
    pub region: Option<String>,
}

fn fill_from_env(slot: &mut Option<SecretString>, var: &str) {
    if slot.is_none() {
        *slot = std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::from);
    }
}

/// Empty strings count as unset
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from))
}
