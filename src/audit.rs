use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::fixture::{FixtureStatus, RawFixture};
use crate::store::write_atomic;

/// Outcome of one source fetch, shown in the run summary and the audit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceReport {
    pub label: String,
    pub url: String,
    pub fetched: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub played: usize,
    pub upcoming: usize,
}

/// Everything this run reconciled, for downstream jobs that diff runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub generated_at: String,
    pub season: String,
    pub sources: Vec<SourceReport>,
    pub counts: BTreeMap<String, StatusCounts>,
    pub fixtures: Vec<RawFixture>,
}

impl AuditSnapshot {
    pub fn build(season: String, sources: Vec<SourceReport>, fixtures: Vec<RawFixture>) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            season,
            sources,
            counts: count_by_sport(&fixtures),
            fixtures,
        }
    }
}

pub fn count_by_sport(fixtures: &[RawFixture]) -> BTreeMap<String, StatusCounts> {
    let mut counts: BTreeMap<String, StatusCounts> = BTreeMap::new();
    for fixture in fixtures {
        let entry = counts.entry(fixture.sport.key().to_string()).or_default();
        match fixture.status() {
            FixtureStatus::Played => entry.played += 1,
            FixtureStatus::Upcoming => entry.upcoming += 1,
        }
    }
    counts
}

pub fn write_audit(path: &Path, snapshot: &AuditSnapshot) -> Result<()> {
    let mut json = serde_json::to_string_pretty(snapshot).context("serialize audit snapshot")?;
    json.push('\n');
    write_atomic(path, &json)
}
