use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

pub const DEFAULT_TOOL_READ_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_TOOL_WRITE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_REQUEST_TOTAL_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_PENDING_TTL_SECS: u64 = 300;
pub const DEFAULT_PAGINATION_MAX_LIMIT: u32 = 50;
pub const DEFAULT_RATE_GENERAL_PER_MIN: u32 = 100;
pub const DEFAULT_RATE_QUERY_PER_MIN: u32 = 10;
pub const DEFAULT_REVOCATION_SYNC_INTERVAL_SECS: u64 = 2;

/// Top-level Gateway configuration (`gatekeeper.toml` + `GATEKEEPER_*` env
/// overrides), covering every option in spec §6.6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub idp: IdpConfig,
    #[serde(default)]
    pub revocation: RevocationConfig,
    #[serde(default)]
    pub timeout: TimeoutConfig,
    #[serde(default)]
    pub rate: RateConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub pending: PendingConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub tool_servers: Vec<ToolServerEndpoint>,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdpConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationConfig {
    #[serde(default = "default_revocation_sync_interval")]
    pub sync_interval_secs: u64,
    #[serde(default = "bool_true")]
    pub fail_open: bool,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: DEFAULT_REVOCATION_SYNC_INTERVAL_SECS,
            fail_open: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_tool_read_timeout")]
    pub tool_read_secs: u64,
    #[serde(default = "default_tool_write_timeout")]
    pub tool_write_secs: u64,
    #[serde(default = "default_request_total_timeout")]
    pub request_total_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            tool_read_secs: DEFAULT_TOOL_READ_TIMEOUT_SECS,
            tool_write_secs: DEFAULT_TOOL_WRITE_TIMEOUT_SECS,
            request_total_secs: DEFAULT_REQUEST_TOTAL_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    #[serde(default = "default_rate_general")]
    pub general_per_min: u32,
    #[serde(default = "default_rate_query")]
    pub query_per_min: u32,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            general_per_min: DEFAULT_RATE_GENERAL_PER_MIN,
            query_per_min: DEFAULT_RATE_QUERY_PER_MIN,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_limit: DEFAULT_PAGINATION_MAX_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfig {
    #[serde(default = "default_pending_ttl")]
    pub ttl_secs: u64,
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_PENDING_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: String,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerEndpoint {
    /// Matches `ToolDescriptor::owner` once discovery completes.
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default)]
    pub origins: Vec<String>,
}

fn bool_true() -> bool {
    true
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_revocation_sync_interval() -> u64 {
    DEFAULT_REVOCATION_SYNC_INTERVAL_SECS
}
fn default_tool_read_timeout() -> u64 {
    DEFAULT_TOOL_READ_TIMEOUT_SECS
}
fn default_tool_write_timeout() -> u64 {
    DEFAULT_TOOL_WRITE_TIMEOUT_SECS
}
fn default_request_total_timeout() -> u64 {
    DEFAULT_REQUEST_TOTAL_TIMEOUT_SECS
}
fn default_max_limit() -> u32 {
    DEFAULT_PAGINATION_MAX_LIMIT
}
fn default_pending_ttl() -> u64 {
    DEFAULT_PENDING_TTL_SECS
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

impl GatewayConfig {
    /// Load from a TOML file with `GATEKEEPER_*` env var overrides, the
    /// same Figment merge order as the reference workspace's
    /// `SkynetConfig::load`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or("gatekeeper.toml");
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("GATEKEEPER_").split("_"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))
    }
}

/// Shared configuration for the four Tool Server binaries. Each binary
/// extends this with its own backend-specific section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_toolserver_port")]
    pub port: u16,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub unmasked_roles: Vec<String>,
}

fn default_toolserver_port() -> u16 {
    8081
}

impl ToolServerConfig {
    pub fn load(config_path: Option<&str>, env_prefix: &str) -> Result<Self> {
        let path = config_path.unwrap_or("toolserver.toml");
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed(env_prefix).split("_"))
            .extract()
            .map_err(|e| CoreError::Config(e.to_string()))
    }
}
