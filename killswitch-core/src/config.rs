use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{KillSwitchError, Result};

/// ```json
/// {"switchConfigVersion": "1", "switchPolicies": {"scpPolicy": {...}}}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchConfig {
    #[serde(default)]
    pub switch_config_version: String,
    pub switch_policies: SwitchPolicies,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchPolicies {
    /// Kept as raw text so the document reaches the provider byte for byte.
    pub scp_policy: Box<RawValue>,
}

impl SwitchConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| KillSwitchError::config(format!("invalid switch config: {}", e)))
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            KillSwitchError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn scp_policy(&self) -> &str {
        self.switch_policies.scp_policy.get()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicySource {
    File(PathBuf),
    SecretId(String),
}

impl Default for PolicySource {
    fn default() -> Self {
        Self::File(PathBuf::from("switch.conf"))
    }
}

impl PolicySource {
    pub async fn load(&self) -> Result<SwitchConfig> {
        match self {
            PolicySource::File(path) => {
                info!("Loading switch config from {:?}", path);
                SwitchConfig::load(path).await
            }
            PolicySource::SecretId(secret_id) => {
                info!("Loading switch config from secret {}", secret_id);
                let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
                let client = aws_sdk_secretsmanager::Client::new(&config);
                let output = client
                    .get_secret_value()
                    .secret_id(secret_id)
                    .send()
                    .await
                    .map_err(|e| {
                        KillSwitchError::config(format!(
                            "failed to read secret {}: {}",
                            secret_id,
                            DisplayErrorContext(e)
                        ))
                    })?;
                let content = output.secret_string().ok_or_else(|| {
                    KillSwitchError::config(format!("secret {} has no string value", secret_id))
                })?;
                SwitchConfig::from_json(content)
            }
        }
    }
}

/// Read from the TOML file named by `KILLSWITCH_SETTINGS`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub revoke_concurrency: usize,
    /// SDK attempts per provider call; 1 means no retries.
    pub max_attempts: u32,
    pub policy_source: PolicySource,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            revoke_concurrency: 1,
            max_attempts: 1,
            policy_source: PolicySource::default(),
        }
    }
}

impl Settings {
    pub const ENV_VAR: &'static str = "KILLSWITCH_SETTINGS";

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| KillSwitchError::config(format!("invalid settings: {}", e)))
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            KillSwitchError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub async fn from_env() -> Result<Self> {
        match std::env::var(Self::ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::load(path).await,
            _ => Ok(Self::default()),
        }
    }
}
