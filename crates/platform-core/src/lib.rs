use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppEnv {
    Local,
    Dev,
    Test,
    Prod,
}

impl AppEnv {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Test => "test",
            Self::Prod => "prod",
        }
    }
}

impl std::str::FromStr for AppEnv {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "dev" | "development" => Ok(Self::Dev),
            "test" => Ok(Self::Test),
            "prod" | "production" => Ok(Self::Prod),
            other => Err(ConfigError::InvalidEnv(other.to_string())),
        }
    }
}

/// Named rebate distribution strategy. Deliberately has no default: every
/// deployment states its policy in config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebatePolicyName {
    CascadingDifference,
    TopAgentOnly,
}

impl std::str::FromStr for RebatePolicyName {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cascading_difference" => Ok(Self::CascadingDifference),
            "top_agent_only" => Ok(Self::TopAgentOnly),
            other => Err(ConfigError::InvalidValue {
                key: "rebate.policy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub settlement: SettlementSection,
    pub rebate: RebateSection,
    pub observability: ObservabilitySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub env: AppEnv,
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSection {
    /// Period lock TTL; sized well above any expected settlement run.
    pub lock_ttl_secs: u64,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebateSection {
    pub policy: RebatePolicyName,
    pub agent_service_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySection {
    pub log_filter: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid APP_ENV value: {0}")]
    InvalidEnv(String),
    #[error("unable to locate config directory (expected config/default.toml)")]
    ConfigDirNotFound,
    #[error("missing required config value: {0}")]
    MissingValue(&'static str),
    #[error("invalid config value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("failed reading config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed parsing config file {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct PartialAppConfig {
    app: Option<PartialAppSection>,
    settlement: Option<PartialSettlementSection>,
    rebate: Option<PartialRebateSection>,
    observability: Option<PartialObservabilitySection>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialAppSection {
    service_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialSettlementSection {
    lock_ttl_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialRebateSection {
    policy: Option<RebatePolicyName>,
    agent_service_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialObservabilitySection {
    log_filter: Option<String>,
}

impl PartialAppConfig {
    fn merge(&mut self, other: PartialAppConfig) {
        if let Some(app) = other.app {
            let target = self.app.get_or_insert_with(PartialAppSection::default);
            if app.service_name.is_some() {
                target.service_name = app.service_name;
            }
        }
        if let Some(settlement) = other.settlement {
            let target = self
                .settlement
                .get_or_insert_with(PartialSettlementSection::default);
            if settlement.lock_ttl_secs.is_some() {
                target.lock_ttl_secs = settlement.lock_ttl_secs;
            }
            if settlement.poll_interval_secs.is_some() {
                target.poll_interval_secs = settlement.poll_interval_secs;
            }
        }
        if let Some(rebate) = other.rebate {
            let target = self.rebate.get_or_insert_with(PartialRebateSection::default);
            if rebate.policy.is_some() {
                target.policy = rebate.policy;
            }
            if rebate.agent_service_url.is_some() {
                target.agent_service_url = rebate.agent_service_url;
            }
        }
        if let Some(observability) = other.observability {
            let target = self
                .observability
                .get_or_insert_with(PartialObservabilitySection::default);
            if observability.log_filter.is_some() {
                target.log_filter = observability.log_filter;
            }
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let app_env = env::var("APP_ENV")
            .ok()
            .map(|value| value.parse())
            .transpose()?
            .unwrap_or(AppEnv::Local);
        let config_dir = resolve_config_dir()?;
        Self::load_from_dir_for_env(config_dir, app_env)
    }

    /// Merge `default.toml`, then `<env>.toml` when present, then env vars.
    pub fn load_from_dir_for_env(
        config_dir: impl AsRef<Path>,
        app_env: AppEnv,
    ) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let mut partial = read_partial(&config_dir.join("default.toml"))?;
        let env_file = config_dir.join(format!("{}.toml", app_env.as_str()));
        if env_file.exists() {
            partial.merge(read_partial(&env_file)?);
        }
        apply_env_overrides(&mut partial)?;
        Self::from_partial(partial, app_env)
    }

    fn from_partial(partial: PartialAppConfig, app_env: AppEnv) -> Result<Self, ConfigError> {
        let app = partial.app.unwrap_or_default();
        let settlement = partial.settlement.unwrap_or_default();
        let rebate = partial.rebate.unwrap_or_default();
        let observability = partial.observability.unwrap_or_default();
        Ok(Self {
            app: AppSection {
                env: app_env,
                service_name: app
                    .service_name
                    .unwrap_or_else(|| "settlement-server".to_string()),
            },
            settlement: SettlementSection {
                lock_ttl_secs: settlement.lock_ttl_secs.unwrap_or(300),
                poll_interval_secs: settlement.poll_interval_secs.unwrap_or(5),
            },
            rebate: RebateSection {
                policy: rebate
                    .policy
                    .ok_or(ConfigError::MissingValue("rebate.policy"))?,
                agent_service_url: rebate
                    .agent_service_url
                    .unwrap_or_else(|| "http://127.0.0.1:8080".to_string()),
            },
            observability: ObservabilitySection {
                log_filter: observability.log_filter.unwrap_or_else(|| "info".to_string()),
            },
        })
    }
}

fn apply_env_overrides(partial: &mut PartialAppConfig) -> Result<(), ConfigError> {
    if let Ok(service_name) = env::var("SETTLEMENT_SERVER__SERVICE_NAME") {
        partial
            .app
            .get_or_insert_with(PartialAppSection::default)
            .service_name = Some(service_name);
    }
    if let Ok(raw) = env::var("SETTLEMENT__LOCK_TTL_SECS") {
        let value = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "settlement.lock_ttl_secs".to_string(),
            value: raw.clone(),
        })?;
        partial
            .settlement
            .get_or_insert_with(PartialSettlementSection::default)
            .lock_ttl_secs = Some(value);
    }
    if let Ok(raw) = env::var("SETTLEMENT__POLL_INTERVAL_SECS") {
        let value = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "settlement.poll_interval_secs".to_string(),
            value: raw.clone(),
        })?;
        partial
            .settlement
            .get_or_insert_with(PartialSettlementSection::default)
            .poll_interval_secs = Some(value);
    }
    if let Ok(raw) = env::var("REBATE__POLICY") {
        partial
            .rebate
            .get_or_insert_with(PartialRebateSection::default)
            .policy = Some(raw.parse()?);
    }
    if let Ok(url) = env::var("REBATE__AGENT_SERVICE_URL") {
        partial
            .rebate
            .get_or_insert_with(PartialRebateSection::default)
            .agent_service_url = Some(url);
    }
    if let Ok(log_filter) = env::var("OBSERVABILITY__LOG_FILTER") {
        partial
            .observability
            .get_or_insert_with(PartialObservabilitySection::default)
            .log_filter = Some(log_filter);
    } else if let Ok(log_filter) = env::var("RUST_LOG") {
        partial
            .observability
            .get_or_insert_with(PartialObservabilitySection::default)
            .log_filter = Some(log_filter);
    }
    Ok(())
}

fn read_partial(path: &Path) -> Result<PartialAppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<PartialAppConfig>(&content).map_err(|source| ConfigError::ParseToml {
        path: path.display().to_string(),
        source,
    })
}

fn resolve_config_dir() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = env::var("LOTTERY_SETTLEMENT_CONFIG_DIR") {
        return Ok(PathBuf::from(path));
    }

    let mut current_dir = env::current_dir().map_err(|_| ConfigError::ConfigDirNotFound)?;
    loop {
        let candidate = current_dir.join("config");
        if candidate.join("default.toml").exists() {
            return Ok(candidate);
        }
        if !current_dir.pop() {
            break;
        }
    }

    Err(ConfigError::ConfigDirNotFound)
}
