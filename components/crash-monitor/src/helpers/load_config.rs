// External crates
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Database location used when `LOG_DB` is unset or empty.
pub const DEFAULT_DB_PATH: &str = "./crash_monitor/db/crashes.sqlite3";

/// Discord REST base used when `DISCORD_API_BASE` is unset or empty.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api";

/// Environment keys as the `config` crate hands them over (lowercased).
#[derive(Debug, Deserialize)]
struct EnvConfig {
    #[serde(default)]
    discord_token: String,
    #[serde(default)]
    guild_id: String,
    #[serde(default)]
    incident_webhook: Option<String>,
    log_db: String,
    discord_api_base: String,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Bot token for the guild snapshot, empty when not configured.
    pub discord_token: String,
    /// Guild to snapshot, empty when not configured.
    pub guild_id: String,
    /// Incident webhook; `None` disables `webhook-send`.
    pub webhook_url: Option<String>,
    /// SQLite file holding the incident table.
    pub db_path: PathBuf,
    /// Base URL of the Discord REST API, without a trailing slash.
    pub api_base: String,
}

impl Config {
    /// Load configuration from an optional dotenv file overlaid by the process
    /// environment. A missing dotenv file is not an error.
    #[instrument(
        name = "config_loader",
        target = "helpers::load_config",
        level = "trace",
        skip_all
    )]
    pub fn load<P: AsRef<Path>>(env_path: P) -> Result<Self> {
        Self::load_with(env_path.as_ref(), process_env())
    }

    /// Same as [`Config::load`] with an explicit set of process variables,
    /// which always take precedence over dotenv entries.
    pub fn load_with(env_path: &Path, process_vars: HashMap<String, String>) -> Result<Self> {
        let mut vars = HashMap::new();

        if env_path.is_file() {
            tracing::trace!(
                configuration_file_path = %env_path.display(),
                "Loading dotenv configuration file"
            );

            let entries = match dotenvy::from_path_iter(env_path) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read dotenv file");
                    return Err(e)
                        .with_context(|| format!("Failed to read env file at {:?}", env_path));
                }
            };

            for entry in entries {
                let (key, value) = entry
                    .with_context(|| format!("Failed to parse env file at {:?}", env_path))?;
                vars.insert(key, value);
            }
        } else {
            tracing::debug!(
                configuration_file_path = %env_path.display(),
                "No dotenv file found, using process environment only"
            );
        }

        vars.extend(process_vars);
        Self::from_vars(vars)
    }

    /// Build a configuration from raw `KEY=value` pairs.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let raw: EnvConfig = config::Config::builder()
            .set_default("log_db", DEFAULT_DB_PATH)?
            .set_default("discord_api_base", DEFAULT_API_BASE)?
            .add_source(config::Environment::default().source(Some(vars)))
            .build()
            .context("Failed to assemble configuration sources")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        let db_path = non_empty(raw.log_db).unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let api_base = non_empty(raw.discord_api_base)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let cfg = Config {
            discord_token: raw.discord_token.trim().to_string(),
            guild_id: raw.guild_id.trim().to_string(),
            webhook_url: raw.incident_webhook.and_then(non_empty),
            db_path: PathBuf::from(db_path),
            api_base,
        };

        tracing::trace!(
            db_path = %cfg.db_path.display(),
            api_base = %cfg.api_base,
            webhook_configured = cfg.webhook_url.is_some(),
            discord_configured = cfg.has_discord_credentials(),
            "Configuration resolved"
        );

        Ok(cfg)
    }

    /// Whether both the bot token and guild id are present.
    pub fn has_discord_credentials(&self) -> bool {
        !self.discord_token.is_empty() && !self.guild_id.is_empty()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// Non-UTF-8 variables are skipped; none of ours can be non-UTF-8.
fn process_env() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = Config::from_vars(HashMap::new()).unwrap();

        assert_eq!(cfg.discord_token, "");
        assert_eq!(cfg.guild_id, "");
        assert_eq!(cfg.webhook_url, None);
        assert_eq!(cfg.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert!(!cfg.has_discord_credentials());
    }

    #[test]
    fn empty_values_fall_back_or_disable() {
        let cfg = Config::from_vars(vars(&[
            ("INCIDENT_WEBHOOK", ""),
            ("LOG_DB", "  "),
            ("DISCORD_API_BASE", ""),
        ]))
        .unwrap();

        assert_eq!(cfg.webhook_url, None);
        assert_eq!(cfg.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn api_base_drops_trailing_slash() {
        let cfg = Config::from_vars(vars(&[("DISCORD_API_BASE", "http://localhost:9000/api/")]))
            .unwrap();
        assert_eq!(cfg.api_base, "http://localhost:9000/api");
    }

    #[test]
    fn dotenv_file_is_read_and_process_env_wins() {
        let dir = TempDir::new().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(
            &env_path,
            "DISCORD_TOKEN=file-token\nGUILD_ID=111\nINCIDENT_WEBHOOK=https://hooks.example/abc\nLOG_DB=/tmp/from-file.sqlite3\n",
        )
        .unwrap();

        let cfg = Config::load_with(&env_path, vars(&[("GUILD_ID", "222")])).unwrap();

        assert_eq!(cfg.discord_token, "file-token");
        assert_eq!(cfg.guild_id, "222");
        assert_eq!(cfg.webhook_url.as_deref(), Some("https://hooks.example/abc"));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/from-file.sqlite3"));
        assert!(cfg.has_discord_credentials());
    }

    #[test]
    fn missing_dotenv_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load_with(&dir.path().join("absent.env"), vars(&[("GUILD_ID", "7")]))
            .unwrap();

        assert_eq!(cfg.guild_id, "7");
        assert_eq!(cfg.discord_token, "");
    }
}
