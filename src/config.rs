//! Configuration for defectdesk.
//!
//! Settings are read from `defectdesk.toml` and layered in this order:
//! file, then environment (`.env` is loaded first), then CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [database]
//! path = "defects.db"
//! busy_timeout_ms = 5000
//!
//! [ai]
//! model = "claude-sonnet-4-20250514"
//! max_tokens = 2000
//! temperature = 0.3
//! history_context = 10
//!
//! [logging]
//! level = "info"
//! json = false
//! directory = "logs"
//!
//! [[teams]]
//! name = "Maintenance"
//! contact_email = "maintenance@plant.com"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::intake::models::TeamSeed;

pub const CONFIG_FILE: &str = "defectdesk.toml";

pub const ENV_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_DB_PATH: &str = "DEFECTDESK_DB_PATH";
pub const ENV_PORT: &str = "DEFECTDESK_PORT";
pub const ENV_MODEL: &str = "DEFECTDESK_MODEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// SQLite file, relative to the working directory
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// How long a writer waits for another process's lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("defects.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl DatabaseSection {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// AI classifier settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of recent resolutions included in the prompt
    #[serde(default = "default_history_context")]
    pub history_context: u32,
    /// Only ever taken from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_api_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_history_context() -> u32 {
    10
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            history_context: default_history_context(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Default filter directive; `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Write a daily-rotated log file here in addition to stderr
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            directory: None,
        }
    }
}

/// Root of `defectdesk.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefectDeskToml {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub teams: Vec<TeamSeed>,
}

impl DefectDeskToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse defectdesk.toml")
    }

    /// Load `defectdesk.toml` from `dir`, or defaults if it does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize defectdesk.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup. Blank values are
    /// treated as unset.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.ai.api_key = Some(key.trim().to_string());
        }
        if let Some(path) = get(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(port) = get(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid {} '{}'", ENV_PORT, port))?;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.ai.model = model.trim().to_string();
        }
        Ok(())
    }

    /// Teams to seed: the configured list, or the built-in defaults.
    pub fn team_seeds(&self) -> Vec<TeamSeed> {
        if self.teams.is_empty() {
            TeamSeed::defaults()
        } else {
            self.teams.clone()
        }
    }

    pub fn team_names(&self) -> Vec<String> {
        self.team_seeds().into_iter().map(|t| t.name).collect()
    }

    /// Validate the configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; an ephemeral port will be chosen".to_string());
        }
        if !(0.0..=1.0).contains(&self.ai.temperature) {
            warnings.push(format!(
                "ai.temperature {} is outside 0.0..=1.0",
                self.ai.temperature
            ));
        }
        if self.ai.max_tokens == 0 {
            warnings.push("ai.max_tokens is 0; classification will always fail".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for team in &self.teams {
            if team.name.trim().is_empty() {
                warnings.push("A [[teams]] entry has an empty name".to_string());
            } else if !seen.insert(team.name.to_lowercase()) {
                warnings.push(format!("Duplicate team '{}'", team.name));
            }
        }

        warnings
    }
}

/// Load `.env`, the config file and environment overrides.
///
/// An explicit `path` must exist; otherwise `defectdesk.toml` in the
/// working directory is used when present.
pub fn load_config(path: Option<&Path>) -> Result<DefectDeskToml> {
    let _ = dotenvy::dotenv();

    let mut config = match path {
        Some(p) => DefectDeskToml::load(p)?,
        None => DefectDeskToml::load_or_default(
            &std::env::current_dir().context("Failed to resolve working directory")?,
        )?,
    };
    config.apply_env_overrides()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_empty_yields_defaults() {
        let config = DefectDeskToml::parse("").unwrap();
        assert_eq!(config, DefectDeskToml::default());
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, PathBuf::from("defects.db"));
        assert_eq!(config.ai.max_tokens, 2000);
        assert_eq!(config.ai.history_context, 10);
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.team_names().len(), 5);
    }

    #[test]
    fn test_parse_sections() {
        let content = r#"
[server]
port = 9100

[database]
path = "/var/lib/defectdesk/plant.db"
busy_timeout_ms = 250

[ai]
model = "claude-haiku"
temperature = 0.0

[logging]
level = "debug"
json = true

[[teams]]
name = "Night Shift"
specialization = "Everything after 22:00"
"#;
        let config = DefectDeskToml::parse(content).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.busy_timeout(), Duration::from_millis(250));
        assert_eq!(config.ai.model, "claude-haiku");
        assert_eq!(config.ai.max_tokens, 2000);
        assert!(config.logging.json);
        assert_eq!(config.team_names(), ["Night Shift"]);
    }

    #[test]
    fn test_parse_rejects_bad_types() {
        assert!(DefectDeskToml::parse("[server]\nport = \"eighty\"").is_err());
    }

    #[test]
    fn test_api_key_never_read_from_file() {
        let config = DefectDeskToml::parse("[ai]\napi_key = \"sk-in-file\"").unwrap();
        assert!(config.ai.api_key.is_none());
    }

    #[test]
    fn test_env_overrides_apply() {
        let mut config = DefectDeskToml::default();
        config
            .apply_overrides_from(env(&[
                (ENV_API_KEY, "sk-test"),
                (ENV_DB_PATH, "/tmp/other.db"),
                (ENV_PORT, "9200"),
                (ENV_MODEL, "claude-opus"),
            ]))
            .unwrap();
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.server.port, 9200);
        assert_eq!(config.ai.model, "claude-opus");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = DefectDeskToml::default();
        config
            .apply_overrides_from(env(&[(ENV_API_KEY, "  "), (ENV_PORT, "")]))
            .unwrap();
        assert!(config.ai.api_key.is_none());
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_invalid_port_override_is_an_error() {
        let mut config = DefectDeskToml::default();
        let err = config
            .apply_overrides_from(env(&[(ENV_PORT, "http")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn test_load_or_default_and_save() {
        let dir = tempdir().unwrap();
        assert_eq!(
            DefectDeskToml::load_or_default(dir.path()).unwrap(),
            DefectDeskToml::default()
        );

        let mut config = DefectDeskToml::default();
        config.server.port = 8123;
        config.teams = TeamSeed::defaults();
        config.save(&dir.path().join(CONFIG_FILE)).unwrap();

        let loaded = DefectDeskToml::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.server.port, 8123);
        assert_eq!(loaded.teams, TeamSeed::defaults());
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let err = DefectDeskToml::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validate() {
        assert!(DefectDeskToml::default().validate().is_empty());

        let mut config = DefectDeskToml::default();
        config.ai.temperature = 1.5;
        config.teams = vec![
            TeamSeed {
                name: "Safety".into(),
                contact_email: None,
                contact_phone: None,
                specialization: None,
            },
            TeamSeed {
                name: "safety".into(),
                contact_email: None,
                contact_phone: None,
                specialization: None,
            },
        ];
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2, "{:?}", warnings);
        assert!(warnings.iter().any(|w| w.contains("temperature")));
        assert!(warnings.iter().any(|w| w.contains("Duplicate team")));
    }
}
