use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub instances: InstancesConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_3900")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3900,
            host: "127.0.0.1".into(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed for CORS. Use `["*"]` for permissive (NOT recommended).
    /// Defaults to localhost-only.
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: d_cors_origins(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Instances (session lifecycle policy)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstancesConfig {
    /// Maximum number of concurrently registered instances (free-tier cap).
    #[serde(default = "d_2")]
    pub max_free: usize,
    /// Seconds to wait after a disconnect before the automatic reconnect.
    #[serde(default = "d_5")]
    pub reconnect_delay_secs: u64,
    /// Country calling code prefixed onto bare local numbers.
    #[serde(default = "d_country_code")]
    pub country_code: String,
    /// Directory holding the durable instance registry (`instances.json`).
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
}

impl Default for InstancesConfig {
    fn default() -> Self {
        Self {
            max_free: 2,
            reconnect_delay_secs: 5,
            country_code: d_country_code(),
            state_path: d_state_path(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Webhook (inbound message forwarding)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Backend endpoint receiving forwarded inbound messages.
    /// An empty string disables forwarding.
    #[serde(default = "d_webhook_url")]
    pub url: String,
    #[serde(default = "d_10")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: d_webhook_url(),
            timeout_secs: 10,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bridge (session-automation sidecar)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the protocol-automation sidecar that actually drives the
    /// messaging platform (browser emulation, QR issuance, transport).
    #[serde(default = "d_bridge_url")]
    pub base_url: String,
    /// Timeout for one-shot bridge calls (send, resolve, start, stop).
    #[serde(default = "d_120")]
    pub request_timeout_secs: u64,
    /// Long-poll window for the event stream.
    #[serde(default = "d_25")]
    pub poll_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: d_bridge_url(),
            request_timeout_secs: 120,
            poll_timeout_secs: 25,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Config {
    /// Check the configuration for problems. Errors abort startup; warnings
    /// are logged and ignored.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.instances.max_free == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "instances.max_free must be at least 1".into(),
            });
        }
        if self.instances.country_code.is_empty()
            || !self.instances.country_code.chars().all(|c| c.is_ascii_digit())
        {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: format!(
                    "instances.country_code must be numeric, got {:?}",
                    self.instances.country_code
                ),
            });
        }
        if self.webhook.url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "webhook.url is empty — inbound forwarding disabled".into(),
            });
        }
        if self.bridge.base_url.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "bridge.base_url must point at the automation sidecar".into(),
            });
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Serde default helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn d_3900() -> u16 {
    3900
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_cors_origins() -> Vec<String> {
    vec!["http://localhost:*".into(), "http://127.0.0.1:*".into()]
}
fn d_2() -> usize {
    2
}
fn d_5() -> u64 {
    5
}
fn d_10() -> u64 {
    10
}
fn d_25() -> u64 {
    25
}
fn d_120() -> u64 {
    120
}
fn d_country_code() -> String {
    "55".into()
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}
fn d_webhook_url() -> String {
    "http://localhost:8080/whatsapp/webhook".into()
}
fn d_bridge_url() -> String {
    "http://127.0.0.1:3801".into()
}
