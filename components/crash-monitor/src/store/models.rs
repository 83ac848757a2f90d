// External crates
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinal classification of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lowercase name, as persisted in the `severity` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("{other} is not a severity")),
        }
    }
}

/// Caller-supplied fields of an incident. The id and timestamp are assigned by
/// the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIncident {
    pub severity: Severity,
    pub title: String,
    pub details: Option<String>,
    pub origin: Option<String>,
    /// Opaque blob, stored verbatim.
    pub metadata: Option<String>,
}

/// A persisted incident row.
///
/// `severity` stays a plain string on the read side so rows written by other
/// tools with unexpected values still list and aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Incident {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub severity: String,
    pub title: String,
    pub details: Option<String>,
    pub origin: Option<String>,
    pub metadata: Option<String>,
}

/// One group of the windowed severity summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeverityCount {
    pub severity: String,
    pub total: u64,
}
