use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub audit: AuditSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
    /// Return the underlying cause in 500 bodies
    #[serde(default = "default_true")]
    pub expose_internal_errors: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
            expose_internal_errors: true,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_true() -> bool { true }

/// Which artifact store backend serves the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Http,
    Fs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_store_kind")]
    pub store: StoreKind,
    /// Base URL of the object store (http backend)
    pub endpoint: Option<String>,
    /// Root directory holding one subdirectory per bucket (fs backend)
    pub root: Option<String>,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_key")]
    pub key: String,
    pub auth_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            store: default_store_kind(),
            endpoint: None,
            root: None,
            bucket: default_bucket(),
            key: default_key(),
            auth_token: None,
            timeout_secs: None,
        }
    }
}

fn default_store_kind() -> StoreKind { StoreKind::Fs }
fn default_bucket() -> String { "text-classifier-model-bucket".to_string() }
fn default_key() -> String { "model/text_classifier.json".to_string() }

/// Which durable sink receives audit records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditBackend {
    Postgres,
    Redis,
    None,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditSettings {
    #[serde(default = "default_audit_backend")]
    pub backend: AuditBackend,
    #[serde(default = "default_table")]
    pub table: String,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub max_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub ttl_secs: Option<u64>,
    /// Spawn audit writes instead of awaiting them
    #[serde(default)]
    pub detached: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            backend: default_audit_backend(),
            table: default_table(),
            database_url: None,
            redis_url: None,
            max_connections: None,
            acquire_timeout_secs: None,
            ttl_secs: None,
            detached: false,
        }
    }
}

fn default_audit_backend() -> AuditBackend { AuditBackend::None }
fn default_table() -> String { "ClassificationLogsTable".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Environment variables (prefixed with CLASSIFIER__)
    /// 4. Deployment variables (MODEL_BUCKET, MODEL_KEY, LOG_TABLE_NAME, DATABASE_URL, REDIS_URL)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            // Local overrides for development
            .add_source(File::with_name("config/local").required(false))
            // e.g., CLASSIFIER__MODEL__BUCKET -> model.bucket
            .add_source(
                Environment::with_prefix("CLASSIFIER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_deployment_env(settings, |var| std::env::var(var).ok())?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    ///
    /// Deployment variables override the file just as they do for `load`.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::load_from_with(path, |var| std::env::var(var).ok())
    }

    fn load_from_with<P, F>(path: P, lookup: F) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("CLASSIFIER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_deployment_env(settings, lookup)?;

        settings.try_deserialize()
    }
}

/// Variable name and the config path it overrides
const DEPLOYMENT_VARS: [(&str, &str); 5] = [
    ("MODEL_BUCKET", "model.bucket"),
    ("MODEL_KEY", "model.key"),
    ("LOG_TABLE_NAME", "audit.table"),
    ("DATABASE_URL", "audit.database_url"),
    ("REDIS_URL", "audit.redis_url"),
];

/// Apply the plain deployment variables on top of the layered config
fn apply_deployment_env<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = Config::builder().add_source(settings);

    for (var, path) in DEPLOYMENT_VARS {
        if let Some(value) = lookup(var) {
            if !value.trim().is_empty() {
                builder = builder.set_override(path, value)?;
            }
        }
    }

    builder.build()
}
