//! Configuration for wardd

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use ward_keys::ToolFrontEnd;
use ward_ledger::Signer;
use ward_types::ValidatorId;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardConfig {
    /// Validator identity and manager credentials
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Key tool invocation
    #[serde(default)]
    pub key_tool: KeyToolConfig,

    /// Reconciliation cadence
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Ledger backend
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Validator identity
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Validator ad id on the ledger
    #[serde(default)]
    pub id: u64,

    /// Address of the validator manager, signs every transaction
    #[serde(default)]
    pub manager_address: String,

    /// Manager signing secret
    #[serde(default)]
    pub manager_secret: String,
}

impl fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("id", &self.id)
            .field("manager_address", &self.manager_address)
            .field("manager_secret", &"<redacted>")
            .finish()
    }
}

impl ValidatorConfig {
    pub fn validator_id(&self) -> ValidatorId {
        ValidatorId::new(self.id)
    }

    pub fn signer(&self) -> Signer {
        Signer::new(self.manager_address.clone(), self.manager_secret.clone())
    }
}

/// Key tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyToolConfig {
    /// `algokit` wraps `goal`; `goal` calls it directly
    #[serde(default)]
    pub front_end: ToolFrontEnd,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Target time between the starts of two cycles, in seconds
    #[serde(default = "default_poll_period")]
    pub poll_period_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_period_secs: default_poll_period(),
        }
    }
}

impl SchedulerConfig {
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.poll_period_secs)
    }
}

/// Ledger backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    /// In-memory ledger, optionally seeded from a fixture
    #[default]
    Memory,
}

/// Ledger configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(rename = "type", default)]
    pub kind: LedgerKind,

    /// JSON fixture seeding the in-memory ledger
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_poll_period() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command line values that take precedence over every other source
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub validator_id: Option<u64>,
    pub poll_period_secs: Option<u64>,
    pub goal_only: bool,
    pub log_level: Option<String>,
    pub json: bool,
}

impl WardConfig {
    /// Load configuration: defaults, then `path`, then `WARD_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, environment())
    }

    /// Load configuration with an explicit environment source
    pub fn load_with_env(path: Option<&Path>, env: config::Environment) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&WardConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder.add_source(env);

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Apply command line overrides
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(id) = overrides.validator_id {
            self.validator.id = id;
        }
        if let Some(secs) = overrides.poll_period_secs {
            self.scheduler.poll_period_secs = secs;
        }
        if overrides.goal_only {
            self.key_tool.front_end = ToolFrontEnd::Goal;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        if overrides.json {
            self.logging.json = true;
        }
    }

    /// Reject configurations the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validator.id == 0 {
            return Err(ConfigError::Invalid("validator.id must be set".to_string()));
        }
        if self.validator.manager_address.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "validator.manager_address must be set".to_string(),
            ));
        }
        if self.validator.manager_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "validator.manager_secret must be set".to_string(),
            ));
        }
        if self.scheduler.poll_period_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.poll_period_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// `WARD_VALIDATOR__ID=5` sets `validator.id`
fn environment() -> config::Environment {
    config::Environment::with_prefix("WARD")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let source = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        environment().source(Some(source))
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = WardConfig::load_with_env(None, env(&[])).unwrap();
        assert_eq!(config.validator.id, 0);
        assert_eq!(config.scheduler.poll_period(), Duration::from_secs(60));
        assert_eq!(config.key_tool.front_end, ToolFrontEnd::Algokit);
        assert_eq!(config.ledger.kind, LedgerKind::Memory);
        assert!(config.ledger.fixture.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_file_then_env_layering() {
        let file = toml_file(
            r#"
[validator]
id = 42
manager_address = "MANAGER"
manager_secret = "word word word"

[key_tool]
front_end = "goal"

[scheduler]
poll_period_secs = 30
"#,
        );

        let config = WardConfig::load_with_env(
            Some(file.path()),
            env(&[("WARD_SCHEDULER__POLL_PERIOD_SECS", "15")]),
        )
        .unwrap();

        assert_eq!(config.validator.id, 42);
        assert_eq!(config.validator.manager_address, "MANAGER");
        assert_eq!(config.key_tool.front_end, ToolFrontEnd::Goal);
        assert_eq!(config.scheduler.poll_period_secs, 15);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = WardConfig::load_with_env(Some(Path::new("/nonexistent/ward.toml")), env(&[]));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_overrides_win() {
        let mut config = WardConfig::default();
        config.apply(&Overrides {
            validator_id: Some(9),
            poll_period_secs: Some(5),
            goal_only: true,
            log_level: Some("debug".to_string()),
            json: true,
        });
        assert_eq!(config.validator.id, 9);
        assert_eq!(config.scheduler.poll_period_secs, 5);
        assert_eq!(config.key_tool.front_end, ToolFrontEnd::Goal);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_validation() {
        let mut config = WardConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.validator = ValidatorConfig {
            id: 1,
            manager_address: "MANAGER".to_string(),
            manager_secret: "secret".to_string(),
        };
        config.validate().unwrap();

        config.scheduler.poll_period_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.scheduler.poll_period_secs = 60;
        config.validator.manager_secret = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let validator = ValidatorConfig {
            id: 1,
            manager_address: "MANAGER".to_string(),
            manager_secret: "abandon abandon".to_string(),
        };
        let rendered = format!("{:?}", validator);
        assert!(!rendered.contains("abandon"));
    }
}
