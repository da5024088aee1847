//! Gateway configuration
//!
//! Read from the process environment (after loading `.env`), from a JSON
//! file, or built in code. Every source ends in [`GatewayConfig::validate`].

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use blueprint_agent::{CompletionOptions, PipelineConfig};

use crate::{GatewayError, Result, DEFAULT_HOST, DEFAULT_PORT};

/// Headroom the HTTP client gets beyond the pipeline's provider bound
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(GatewayError::InvalidConfig(format!(
                "APP_ENV must be development or production, got `{}`",
                other
            ))),
        }
    }
}

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Root for generated projects and archives
    pub output_dir: PathBuf,

    /// Completion provider settings
    pub provider: ProviderSettings,

    pub app_env: AppEnv,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            output_dir: PathBuf::from("./output"),
            provider: ProviderSettings::default(),
            app_env: AppEnv::Development,
        }
    }
}

/// Provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Never written back out by [`GatewayConfig::to_file`]
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub base_url: String,

    pub model: String,

    /// Request `json_object` responses from the provider
    pub force_json_mode: bool,

    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            force_json_mode: true,
            timeout_secs: 60,
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the output root
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(GatewayError::InvalidConfig(format!("failed to load .env: {}", e)));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or empty keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host;
        }
        if let Some(port) = get("PORT") {
            config.port = parse_number(&port, "PORT")?;
        }
        if let Some(dir) = get("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(env) = get("APP_ENV") {
            config.app_env = AppEnv::parse(&env)?;
        }

        let provider = &mut config.provider;
        provider.api_key = get("OPENAI_API_KEY");
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            provider.base_url = base_url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            provider.model = model;
        }
        if let Some(flag) = get("OPENAI_FORCE_JSON_MODE") {
            provider.force_json_mode = match flag.to_lowercase().as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(GatewayError::InvalidConfig(format!(
                        "OPENAI_FORCE_JSON_MODE must be true or false, got `{}`",
                        other
                    )))
                }
            };
        }
        if let Some(secs) = get("PROVIDER_TIMEOUT_SECS") {
            provider.timeout_secs = parse_number(&secs, "PROVIDER_TIMEOUT_SECS")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_env == AppEnv::Production && self.provider.api_key.is_none() {
            return Err(GatewayError::InvalidConfig(
                "OPENAI_API_KEY is required in production".to_string(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "provider timeout must be at least one second".to_string(),
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(GatewayError::InvalidConfig("provider model is empty".to_string()));
        }
        self.socket_addr()?;
        Ok(())
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            let addr = format!("{}:{}", self.host, self.port);
            GatewayError::InvalidConfig(format!("invalid listen address {}", addr))
        })
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.output_dir.join("projects")
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.output_dir.join("archives")
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider.timeout_secs)
    }

    /// Client-side request timeout. Outlasts [`Self::provider_timeout`] so the
    /// pipeline's own bound always fires first and reports a timeout.
    pub fn http_timeout(&self) -> Duration {
        self.provider_timeout() + HTTP_TIMEOUT_MARGIN
    }

    /// Settings for the generation pipeline
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            projects_root: self.projects_dir(),
            archives_root: self.archives_dir(),
            options: CompletionOptions::new(self.provider.model.clone())
                .with_structured_output(self.provider.force_json_mode),
            provider_timeout: self.provider_timeout(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| GatewayError::InvalidConfig(format!("{} must be a number, got `{}`", key, value)))
}
