// Local crates
use crate::{
    discord::models::GuildInfo,
    helpers::load_config::Config,
    render::table::{Cell, Table, truncate},
    store::models::{Incident, Severity, SeverityCount},
};

// External crates
use owo_colors::{OwoColorize, Stream, Style};
use serde::Serialize;
use std::io::{self, Write};

const DETAILS_PREVIEW_CHARS: usize = 60;
const MISSING: &str = "-";

/// Everything `monitor` prints, for `--json` output.
#[derive(Debug, Serialize)]
pub struct MonitorReport {
    pub guild: Option<GuildInfo>,
    pub summary_days: i64,
    pub summary: Vec<SeverityCount>,
    pub recent: Vec<Incident>,
}

/// "Recent Incidents" table.
pub fn render_recent<W: Write>(out: &mut W, incidents: &[Incident]) -> io::Result<()> {
    let mut table = Table::new("Recent Incidents")
        .styled_column("Time", Style::new().cyan())
        .column("Severity")
        .column("Title")
        .styled_column("Origin", Style::new().magenta())
        .column("Details");

    for incident in incidents {
        table.add_row([
            Cell::from(incident.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
            severity_cell(&incident.severity),
            Cell::from(incident.title.as_str()),
            Cell::from(or_missing(incident.origin.as_deref())),
            Cell::from(truncate(
                or_missing(incident.details.as_deref()),
                DETAILS_PREVIEW_CHARS,
            )),
        ]);
    }

    table.render(out)
}

/// "Incident Summary (Nd)" table, most severe first.
pub fn render_summary<W: Write>(out: &mut W, days: i64, groups: &[SeverityCount]) -> io::Result<()> {
    if groups.is_empty() {
        return writeln!(out, "No incidents recorded within the requested range.");
    }

    let mut ordered: Vec<&SeverityCount> = groups.iter().collect();
    // Unknown severities sort after the known ones
    ordered.sort_by_key(|group| {
        std::cmp::Reverse(group.severity.parse::<Severity>().ok().map(|s| s as u8 + 1))
    });

    let mut table = Table::new(format!("Incident Summary ({days}d)"))
        .column("Severity")
        .right_aligned_column("Count");
    for group in ordered {
        table.add_row([severity_cell(&group.severity), Cell::from(group.total.to_string())]);
    }

    table.render(out)
}

/// "Discord Guild Snapshot" table.
pub fn render_guild<W: Write>(out: &mut W, guild: &GuildInfo) -> io::Result<()> {
    let count = |value: Option<u64>| value.map_or_else(|| MISSING.to_string(), |n| n.to_string());

    let mut table = Table::new("Discord Guild Snapshot")
        .column("Field")
        .column("Value");
    table.add_row(["Name".to_string(), non_blank(&guild.name)]);
    table.add_row(["Members".to_string(), count(guild.approximate_member_count)]);
    table.add_row(["Online".to_string(), count(guild.approximate_presence_count)]);
    table.add_row(["Guild ID".to_string(), non_blank(&guild.id)]);

    table.render(out)
}

/// Resolved configuration with secrets masked.
pub fn render_config<W: Write>(out: &mut W, config: &Config) -> io::Result<()> {
    let mut table = Table::new("Crash Monitor Configuration")
        .column("Setting")
        .column("Value");
    table.add_row(["Database".to_string(), config.db_path.display().to_string()]);
    table.add_row(["Discord API".to_string(), config.api_base.clone()]);
    table.add_row(["Guild ID".to_string(), or_unset(&config.guild_id).to_string()]);
    table.add_row(["Discord token".to_string(), mask(&config.discord_token)]);
    table.add_row([
        "Incident webhook".to_string(),
        config
            .webhook_url
            .as_deref()
            .map_or_else(|| "(unset)".to_string(), mask),
    ]);

    table.render(out)
}

/// Pretty JSON followed by a newline.
pub fn render_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

/// Green confirmation line.
pub fn render_success<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(
        out,
        "{}",
        message.if_supports_color(Stream::Stdout, |text| text.green().bold().to_string())
    )
}

/// Yellow warning line.
pub fn render_warning<W: Write>(out: &mut W, message: &str) -> io::Result<()> {
    writeln!(
        out,
        "{}",
        message.if_supports_color(Stream::Stdout, |text| text.yellow().bold().to_string())
    )
}

fn severity_cell(severity: &str) -> Cell {
    let style = match severity.parse::<Severity>() {
        Ok(Severity::Critical) => Style::new().red().bold(),
        Ok(Severity::High) => Style::new().red(),
        Ok(Severity::Medium) => Style::new().yellow(),
        Ok(Severity::Low) => Style::new().green(),
        Err(_) => Style::new(),
    };
    Cell::styled(severity, style)
}

fn or_missing(value: Option<&str>) -> &str {
    match value {
        Some(text) if !text.trim().is_empty() => text,
        _ => MISSING,
    }
}

fn non_blank(value: &str) -> String {
    or_missing(Some(value)).to_string()
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() { "(unset)" } else { value }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "(unset)".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}… (set)")
}
