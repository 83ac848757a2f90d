use crate::runtime::runtime::{self, Action, RunOptions};
use crate::store::models::{NewIncident, Severity};
use anyhow::Result;
use clap::{Parser, Subcommand, builder::NonEmptyStringValueParser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "crash-monitor",
    long_about = "Crash Monitor records crash and bug incidents into a local SQLite log, summarizes them, and relays alerts to a Discord webhook.",
    about = "Local crash and bug incident log",
    version,
    term_width = 100,
    after_help = "\
    EXAMPLES:
        crash-monitor log --severity high --title \"Disk full\" --details \"sda1 at 100%\"
        crash-monitor summary --days 7
        crash-monitor --config ./prod.env monitor --days 1 --limit 5"
)]
struct Cli {
    /// Path to the .env file holding DISCORD_TOKEN, GUILD_ID, INCIDENT_WEBHOOK and LOG_DB
    #[arg(long, global = true, default_value = ".env")]
    config: PathBuf,

    /// Print read commands as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Record a crash or bug incident locally
    Log {
        #[arg(long, value_enum)]
        severity: Severity,
        #[arg(long, value_parser = NonEmptyStringValueParser::new())]
        title: String,
        #[arg(long, default_value = "")]
        details: String,
        #[arg(long, default_value = "general")]
        origin: String,
        /// Free-form metadata, stored verbatim
        #[arg(long, default_value = "")]
        metadata: String,
    },

    /// Show aggregated incidents for the past n days
    Summary {
        #[arg(long, default_value_t = 7, allow_negative_numbers = true)]
        days: i64,
    },

    /// Show the latest incidents
    Recent {
        #[arg(long, default_value_t = 10, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Fetch guild stats from Discord
    DiscordInfo,

    /// Test-send an incident to the configured webhook
    WebhookSend {
        #[arg(long, value_enum, default_value_t = Severity::Medium)]
        severity: Severity,
        #[arg(long, default_value = "Test incident")]
        title: String,
        #[arg(long, default_value = "Routine webhook test from crash monitor")]
        details: String,
    },

    /// Print guild info, incident summary, and recent log
    Monitor {
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        days: i64,
        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Validate and print the resolved configuration, secrets masked
    Validate,
}

impl From<Commands> for Action {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Log {
                severity,
                title,
                details,
                origin,
                metadata,
            } => Action::Log(NewIncident {
                severity,
                title,
                details: non_empty(details),
                origin: non_empty(origin),
                metadata: non_empty(metadata),
            }),
            Commands::Summary { days } => Action::Summary { days },
            Commands::Recent { limit } => Action::Recent { limit },
            Commands::DiscordInfo => Action::DiscordInfo,
            Commands::WebhookSend {
                severity,
                title,
                details,
            } => Action::WebhookSend {
                severity,
                title,
                details,
            },
            Commands::Monitor { days, limit } => Action::Monitor { days, limit },
            Commands::Validate => Action::Validate,
        }
    }
}

/// Entry function for CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let options = RunOptions {
        config_path: cli.config,
        json: cli.json,
    };

    runtime::run(cli.command.into(), &options)
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("crash-monitor").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_requires_severity_and_title() {
        assert!(Cli::try_parse_from(["crash-monitor", "log", "--title", "x"]).is_err());
        assert!(Cli::try_parse_from(["crash-monitor", "log", "--severity", "high"]).is_err());
        assert!(
            Cli::try_parse_from(["crash-monitor", "log", "--severity", "urgent", "--title", "x"])
                .is_err()
        );
    }

    #[test]
    fn log_rejects_an_empty_title() {
        let result =
            Cli::try_parse_from(["crash-monitor", "log", "--severity", "low", "--title", ""]);
        assert!(result.is_err());
    }

    #[test]
    fn log_defaults_map_to_new_incident() {
        let cli = parse(&["log", "--severity", "high", "--title", "Disk full"]);

        assert_eq!(cli.config, PathBuf::from(".env"));
        assert_eq!(
            Action::from(cli.command),
            Action::Log(NewIncident {
                severity: Severity::High,
                title: "Disk full".to_string(),
                details: None,
                origin: Some("general".to_string()),
                metadata: None,
            })
        );
    }

    #[test]
    fn read_command_defaults() {
        assert_eq!(
            Action::from(parse(&["summary"]).command),
            Action::Summary { days: 7 }
        );
        assert_eq!(
            Action::from(parse(&["recent"]).command),
            Action::Recent { limit: 10 }
        );
        assert_eq!(
            Action::from(parse(&["monitor"]).command),
            Action::Monitor { days: 1, limit: 5 }
        );
    }

    #[test]
    fn webhook_send_defaults() {
        assert_eq!(
            Action::from(parse(&["webhook-send"]).command),
            Action::WebhookSend {
                severity: Severity::Medium,
                title: "Test incident".to_string(),
                details: "Routine webhook test from crash monitor".to_string(),
            }
        );
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = parse(&["recent", "--limit", "3", "--json", "--config", "/etc/crash.env"]);

        assert!(cli.json);
        assert_eq!(cli.config, PathBuf::from("/etc/crash.env"));
        assert_eq!(Action::from(cli.command), Action::Recent { limit: 3 });
    }

    #[test]
    fn negative_limit_reaches_the_store() {
        let cli = parse(&["recent", "--limit", "-1"]);
        assert_eq!(Action::from(cli.command), Action::Recent { limit: -1 });
    }
}
