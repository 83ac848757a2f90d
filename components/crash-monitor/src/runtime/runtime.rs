// Local crates
use crate::{
    discord::{client::DiscordClient, models::WebhookPayload},
    helpers::load_config::Config,
    render::views::{self, MonitorReport},
    store::{
        incident_store::IncidentStore,
        models::{NewIncident, Severity},
    },
};

// External crates
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::instrument;

/// One user-facing action per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Log(NewIncident),
    Summary {
        days: i64,
    },
    Recent {
        limit: i64,
    },
    DiscordInfo,
    WebhookSend {
        severity: Severity,
        title: String,
        details: String,
    },
    Monitor {
        days: i64,
        limit: i64,
    },
    Validate,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Log(_) => "log",
            Action::Summary { .. } => "summary",
            Action::Recent { .. } => "recent",
            Action::DiscordInfo => "discord-info",
            Action::WebhookSend { .. } => "webhook-send",
            Action::Monitor { .. } => "monitor",
            Action::Validate => "validate",
        }
    }
}

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Dotenv file to read configuration from.
    pub config_path: PathBuf,
    /// Render read commands as JSON instead of tables.
    pub json: bool,
}

/// Crash Monitor runtime: load configuration, then execute `action` writing
/// to stdout.
#[instrument(
    name = "crash_monitor_runtime::run",
    target = "runtime::runtime",
    skip_all,
    fields(action = action.name()),
    level = "info"
)]
pub fn run(action: Action, options: &RunOptions) -> Result<()> {
    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "Failed to load configuration from {}",
            options.config_path.display()
        )
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&config, action, options.json, &mut out)
}

/// Execute `action` against the configured store and remote endpoints.
///
/// The store is opened for every action except `Validate` and is closed on
/// every path, including when the action itself fails. The action's error
/// takes precedence over a close error.
pub fn execute<W: Write>(config: &Config, action: Action, json: bool, out: &mut W) -> Result<()> {
    if action == Action::Validate {
        return views::render_config(out, config).context("Failed to write configuration");
    }

    let store = IncidentStore::open(&config.db_path).with_context(|| {
        format!(
            "Failed to open incident database at {}",
            config.db_path.display()
        )
    })?;
    tracing::debug!(db_path = %store.path().display(), "Incident store ready");

    let outcome = dispatch(&store, config, action, json, out);
    let closed = store
        .close()
        .context("Failed to close incident database");

    if let Err(e) = &outcome {
        tracing::error!(error = %format!("{e:#}"), "Command failed");
    }

    outcome.and(closed)
}

fn dispatch<W: Write>(
    store: &IncidentStore,
    config: &Config,
    action: Action,
    json: bool,
    out: &mut W,
) -> Result<()> {
    match action {
        Action::Log(incident) => {
            let id = store
                .log_incident(&incident)
                .context("Failed to record incident")?;
            let total = store.count().context("Failed to count incidents")?;
            views::render_success(out, &format!("Incident #{id} recorded ({total} total)."))?;
        }
        Action::Summary { days } => {
            let groups = store.summary(days).context("Failed to summarize incidents")?;
            if json {
                views::render_json(out, &groups)?;
            } else {
                views::render_summary(out, days, &groups)?;
            }
        }
        Action::Recent { limit } => {
            let incidents = store
                .list_recent(limit)
                .context("Failed to list recent incidents")?;
            if json {
                views::render_json(out, &incidents)?;
            } else {
                views::render_recent(out, &incidents)?;
            }
        }
        Action::DiscordInfo => {
            let client = DiscordClient::new(&config.api_base)?;
            let guild = client
                .fetch_guild_info(&config.discord_token, &config.guild_id)
                .context("Failed to fetch Discord guild info")?;
            if json {
                views::render_json(out, &guild)?;
            } else {
                views::render_guild(out, &guild)?;
            }
        }
        Action::WebhookSend {
            severity,
            title,
            details,
        } => match config.webhook_url.as_deref() {
            None => {
                tracing::warn!("Webhook send skipped, INCIDENT_WEBHOOK is not configured");
                views::render_warning(out, "Set INCIDENT_WEBHOOK to use webhook commands.")?;
            }
            Some(url) => {
                let payload = WebhookPayload::incident_alert(severity, &title, &details);
                DiscordClient::new(&config.api_base)?
                    .send_webhook(url, &payload)
                    .context("Failed to deliver webhook")?;
                views::render_success(out, "Webhook delivered successfully.")?;
            }
        },
        Action::Monitor { days, limit } => {
            let guild = if config.has_discord_credentials() {
                let client = DiscordClient::new(&config.api_base)?;
                Some(
                    client
                        .fetch_guild_info(&config.discord_token, &config.guild_id)
                        .context("Failed to fetch Discord guild info")?,
                )
            } else {
                tracing::warn!("Guild snapshot skipped, DISCORD_TOKEN or GUILD_ID is not set");
                None
            };

            let summary = store.summary(days).context("Failed to summarize incidents")?;
            let recent = store
                .list_recent(limit)
                .context("Failed to list recent incidents")?;

            if json {
                let report = MonitorReport {
                    guild,
                    summary_days: days,
                    summary,
                    recent,
                };
                views::render_json(out, &report)?;
            } else {
                if let Some(guild) = &guild {
                    views::render_guild(out, guild)?;
                    writeln!(out)?;
                }
                views::render_summary(out, days, &summary)?;
                writeln!(out)?;
                views::render_recent(out, &recent)?;
            }
        }
        Action::Validate => views::render_config(out, config)?,
    }

    Ok(())
}
