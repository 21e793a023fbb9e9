//! Server configuration, layered TOML + environment overrides. Shape mirrors
//! the teacher's `server/core/src/config.rs`: one section per external
//! collaborator plus an observability section, extended here with the
//! sections every §6 environment-variable group needs.

use std::net::SocketAddr;
use std::path::Path;

use config::{Config, ConfigError as BuilderError, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "MEMOS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] BuilderError),
    #[error("invalid socket address: {0}")]
    Addr(#[from] std::net::AddrParseError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub cache: CacheSection,
    pub vector_index: VectorIndexSection,
    pub search: SearchSection,
    pub agents: AgentsSection,
    pub scheduler: SchedulerSection,
    pub rollout: RolloutSection,
    pub cors: CorsSection,
    pub jwt: JwtSection,
    pub observability: ObservabilitySection,
}

impl ServerConfig {
    /// Loads configuration from `{dir}/default.toml`, an optional
    /// `{dir}/{env}.toml` override, and finally environment variables
    /// prefixed `MEMOS__` (double underscore as the section separator).
    pub fn load(dir: Option<&Path>, env_name: &str) -> Result<Self, ConfigError> {
        let dir = dir
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_CONFIG_DIR.to_string());

        let builder = Config::builder()
            .add_source(File::new(&format!("{dir}/default"), FileFormat::Toml).required(false))
            .add_source(
                File::new(&format!("{dir}/{env_name}"), FileFormat::Toml).required(false),
            )
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let config = builder.build()?;
        config.try_deserialize().map_err(ConfigError::from)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,
}

impl ServerSection {
    pub fn bind_address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

fn default_request_deadline_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    pub url: String,
    #[serde(default = "default_permission_cache_ttl")]
    pub permission_cache_ttl_seconds: u64,
    #[serde(default = "default_recommendation_cache_ttl")]
    pub recommendation_cache_ttl_seconds: u64,
    #[serde(default = "default_idempotency_lock_ttl")]
    pub idempotency_lock_ttl_seconds: u64,
}

fn default_permission_cache_ttl() -> u64 {
    30
}
fn default_recommendation_cache_ttl() -> u64 {
    24 * 3600
}
fn default_idempotency_lock_ttl() -> u64 {
    600
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorIndexSection {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSection {
    #[serde(default = "default_mode")]
    pub default_mode: String,
    #[serde(default)]
    pub temporal_decay_enabled: bool,
    #[serde(default = "default_feedback_rerank_enabled")]
    pub feedback_rerank_enabled: bool,
    #[serde(default = "default_pos_mult")]
    pub feedback_positive_multiplier: f64,
    #[serde(default = "default_neg_mult")]
    pub feedback_negative_multiplier: f64,
    #[serde(default)]
    pub activation: ActivationWeights,
}

fn default_mode() -> String {
    "balanced".to_string()
}
fn default_feedback_rerank_enabled() -> bool {
    true
}
fn default_pos_mult() -> f64 {
    1.15
}
fn default_neg_mult() -> f64 {
    0.5
}

/// Weights and scorer constants for the eight-component activation score
/// (§4.2). `weight_rel` through `weight_nbr` need not sum to exactly 1.0;
/// the final value is clamped to `[0, 1]` regardless.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivationWeights {
    #[serde(default = "default_weight_rel")]
    pub weight_rel: f64,
    #[serde(default = "default_weight_rec")]
    pub weight_rec: f64,
    #[serde(default = "default_weight_freq")]
    pub weight_freq: f64,
    #[serde(default = "default_weight_imp")]
    pub weight_imp: f64,
    #[serde(default = "default_weight_conf")]
    pub weight_conf: f64,
    #[serde(default = "default_weight_ctx")]
    pub weight_ctx: f64,
    #[serde(default = "default_weight_prov")]
    pub weight_prov: f64,
    #[serde(default = "default_weight_risk")]
    pub weight_risk: f64,
    #[serde(default = "default_weight_nbr")]
    pub weight_nbr: f64,
    #[serde(default = "default_recency_half_life_days")]
    pub recency_half_life_days: f64,
    #[serde(default = "default_freq_alpha")]
    pub freq_alpha: f64,
    #[serde(default = "default_provenance_beta")]
    pub provenance_beta: f64,
    #[serde(default = "default_contradicted_penalty")]
    pub contradicted_penalty: f64,
}

impl Default for ActivationWeights {
    fn default() -> Self {
        Self {
            weight_rel: default_weight_rel(),
            weight_rec: default_weight_rec(),
            weight_freq: default_weight_freq(),
            weight_imp: default_weight_imp(),
            weight_conf: default_weight_conf(),
            weight_ctx: default_weight_ctx(),
            weight_prov: default_weight_prov(),
            weight_risk: default_weight_risk(),
            weight_nbr: default_weight_nbr(),
            recency_half_life_days: default_recency_half_life_days(),
            freq_alpha: default_freq_alpha(),
            provenance_beta: default_provenance_beta(),
            contradicted_penalty: default_contradicted_penalty(),
        }
    }
}

fn default_weight_rel() -> f64 {
    0.30
}
fn default_weight_rec() -> f64 {
    0.15
}
fn default_weight_freq() -> f64 {
    0.10
}
fn default_weight_imp() -> f64 {
    0.10
}
fn default_weight_conf() -> f64 {
    0.15
}
fn default_weight_ctx() -> f64 {
    0.10
}
fn default_weight_prov() -> f64 {
    0.05
}
fn default_weight_risk() -> f64 {
    0.05
}
fn default_weight_nbr() -> f64 {
    0.0
}
fn default_recency_half_life_days() -> f64 {
    14.0
}
fn default_freq_alpha() -> f64 {
    0.2
}
fn default_provenance_beta() -> f64 {
    0.3
}
fn default_contradicted_penalty() -> f64 {
    0.4
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentsSection {
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_agent_cache_ttl")]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_system_task_user_id")]
    pub system_task_user_id: Option<String>,
    #[serde(default = "default_logseq_export_dir")]
    pub logseq_export_dir: String,
}

fn default_true() -> bool {
    true
}
fn default_agent_cache_ttl() -> u64 {
    3600
}
fn default_system_task_user_id() -> Option<String> {
    None
}
fn default_logseq_export_dir() -> String {
    "./logseq-export".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: i32,
    #[serde(default = "default_soft_timeout_floor_ms")]
    pub soft_timeout_floor_ms: u64,
}

fn default_max_attempts() -> i32 {
    3
}
fn default_soft_timeout_floor_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct RolloutSection {
    #[serde(default)]
    pub enterprise_enabled: bool,
    #[serde(default = "default_auto_rollback_threshold")]
    pub auto_rollback_error_threshold: f64,
    #[serde(default = "default_min_evaluations")]
    pub auto_rollback_min_evaluations: u64,
}

fn default_auto_rollback_threshold() -> f64 {
    0.1
}
fn default_min_evaluations() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsSection {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtSection {
    pub secret: String,
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_seconds: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_seconds: u64,
}

fn default_access_ttl() -> u64 {
    30 * 60
}
fn default_refresh_ttl() -> u64 {
    7 * 24 * 3600
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilitySection {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_section_builds_socket_addr() {
        let section = ServerSection {
            host: "127.0.0.1".into(),
            port: 8080,
            request_deadline_ms: 30_000,
        };
        assert_eq!(section.bind_address().unwrap().port(), 8080);
    }
}
