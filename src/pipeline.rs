use anyhow::{Result, anyhow, bail};
use rayon::prelude::*;

use crate::audit::{AuditSnapshot, SourceReport, write_audit};
use crate::config::{PipelineConfig, VolleyballSources};
use crate::cross_merge::merge_sources;
use crate::dedup::{dedup_fixtures, same_day_collisions};
use crate::federation::fetch_federation;
use crate::fixture::{RawFixture, Sport};
use crate::league::fetch_league;
use crate::project::project_all;
use crate::reconcile::{MonthReconcile, reconcile_store};
use crate::season::SeasonCalendar;
use crate::store::{EventStore, PriorState, load_store, save_store};
use crate::verification::fetch_verification;

/// Primary and secondary rows for one volleyball sport. A failed source
/// contributes an empty list.
#[derive(Debug, Clone, PartialEq)]
pub struct SportFetch {
    pub sport: Sport,
    pub primary: Vec<RawFixture>,
    pub secondary: Vec<RawFixture>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchedSources {
    /// All phase pages concatenated, duplicates included.
    pub federation: Vec<RawFixture>,
    pub volleyball: Vec<SportFetch>,
    pub reports: Vec<SourceReport>,
}

impl FetchedSources {
    pub fn total(&self) -> usize {
        self.federation.len()
            + self
                .volleyball
                .iter()
                .map(|v| v.primary.len() + v.secondary.len())
                .sum::<usize>()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub fixtures: Vec<RawFixture>,
    pub after_dedup: usize,
    pub merged_added: usize,
    pub merged_promoted: usize,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
    pub fetched: usize,
    pub after_dedup: usize,
    pub after_merge: usize,
    pub projected: usize,
    pub dropped: Vec<String>,
    pub months: Vec<MonthReconcile>,
    pub events_written: usize,
    pub prior: PriorState,
    pub warnings: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Reconciled(RunSummary),
    /// No source returned a single fixture; the store was not touched.
    NothingToDo(RunSummary),
}

/// One scheduled run: fetch, dedup, merge, project, reconcile, write.
///
/// Only a federation failure is an error. Volleyball sources that fail are
/// reported in the summary and the run carries on without them.
pub fn run(config: &PipelineConfig) -> Result<RunOutcome> {
    let calendar = &config.calendar;
    let fetched = fetch_all(config)?;
    let mut summary = RunSummary {
        sources: fetched.reports.clone(),
        fetched: fetched.total(),
        dry_run: config.dry_run,
        ..RunSummary::default()
    };

    if summary.fetched == 0 {
        log::warn!("no fixtures retrieved from any source; nothing to do");
        return Ok(RunOutcome::NothingToDo(summary));
    }

    let assembled = assemble(fetched, calendar);
    summary.after_dedup = assembled.after_dedup;
    summary.after_merge = assembled.fixtures.len();
    summary.warnings = assembled.warnings.clone();

    let loaded = load_store(&config.store_path, calendar);
    if !config.dry_run && !loaded.prior.safe_to_overwrite() {
        bail!(
            "store {} is unreadable and could not be backed up; refusing to overwrite it",
            config.store_path.display()
        );
    }
    let mut store = loaded.store;
    summary.prior = loaded.prior;

    let folded = fold_into_store(&mut store, &assembled.fixtures, &config.tracked_team, calendar);
    summary.projected = folded.projected;
    summary.dropped = folded.dropped;
    summary.months = folded.months;
    summary.events_written = store.event_count();

    if config.dry_run {
        log::info!("dry run: not writing {}", config.store_path.display());
        return Ok(RunOutcome::Reconciled(summary));
    }

    save_store(&config.store_path, &store, calendar)?;
    log::info!(
        "wrote {} events to {}",
        summary.events_written,
        config.store_path.display()
    );

    if let Some(audit_path) = &config.audit_path {
        let snapshot =
            AuditSnapshot::build(calendar.label(), summary.sources.clone(), assembled.fixtures);
        match write_audit(audit_path, &snapshot) {
            Ok(()) => log::info!("wrote audit snapshot to {}", audit_path.display()),
            Err(err) => {
                log::warn!("audit snapshot not written: {err:#}");
                summary.warnings.push(format!("audit snapshot not written: {err:#}"));
            }
        }
    }

    Ok(RunOutcome::Reconciled(summary))
}

enum FetchJob<'a> {
    Federation(&'a [String]),
    League(&'a VolleyballSources),
    Verification(&'a VolleyballSources),
}

impl FetchJob<'_> {
    fn label(&self) -> String {
        match self {
            FetchJob::Federation(_) => format!("federation {}", Sport::FootballMen),
            FetchJob::League(sources) => format!("league {}", sources.sport),
            FetchJob::Verification(sources) => format!("verification {}", sources.sport),
        }
    }

    fn url(&self) -> String {
        match self {
            FetchJob::Federation(urls) => urls.join(" "),
            FetchJob::League(sources) => sources.primary_url.clone(),
            FetchJob::Verification(sources) => sources.secondary_url.clone(),
        }
    }

    fn fetch(&self, config: &PipelineConfig) -> Result<Vec<RawFixture>> {
        let team = Some(config.tracked_team.as_str());
        match self {
            FetchJob::Federation(urls) if urls.is_empty() => {
                Err(anyhow!("no federation phase urls configured"))
            }
            FetchJob::Federation(urls) => fetch_federation(urls, config.federation_filter.as_deref()),
            FetchJob::League(sources) => fetch_league(&sources.primary_url, sources.sport, team),
            FetchJob::Verification(sources) => {
                fetch_verification(&sources.secondary_url, sources.sport, team)
            }
        }
    }
}

/// Runs every source concurrently. Each job's outcome is recorded on its own;
/// one failure never cancels the others.
pub fn fetch_all(config: &PipelineConfig) -> Result<FetchedSources> {
    let mut jobs = vec![FetchJob::Federation(&config.federation_urls)];
    for sources in &config.volleyball {
        jobs.push(FetchJob::League(sources));
        jobs.push(FetchJob::Verification(sources));
    }

    let pool = build_fetch_pool(config.fetch_parallelism);
    let results: Vec<Result<Vec<RawFixture>>> =
        with_fetch_pool(&pool, || jobs.par_iter().map(|job| job.fetch(config)).collect());

    let mut out = FetchedSources {
        volleyball: config
            .volleyball
            .iter()
            .map(|sources| SportFetch {
                sport: sources.sport,
                primary: Vec::new(),
                secondary: Vec::new(),
            })
            .collect(),
        ..FetchedSources::default()
    };
    let mut federation_failure = None;
    for (job, result) in jobs.iter().zip(results) {
        let mut report = SourceReport {
            label: job.label(),
            url: job.url(),
            fetched: 0,
            error: None,
        };
        let fixtures = match result {
            Ok(fixtures) => fixtures,
            Err(err) => {
                report.error = Some(format!("{err:#}"));
                match job {
                    FetchJob::Federation(_) => federation_failure = Some(err),
                    _ => log::warn!("{} failed, continuing without it: {err:#}", report.label),
                }
                Vec::new()
            }
        };
        report.fetched = fixtures.len();
        out.reports.push(report);

        match job {
            FetchJob::Federation(_) => out.federation.extend(fixtures),
            FetchJob::League(sources) | FetchJob::Verification(sources) => {
                let entry = out.volleyball.iter_mut().find(|v| v.sport == sources.sport);
                match (entry, job) {
                    (Some(entry), FetchJob::League(_)) => entry.primary = fixtures,
                    (Some(entry), _) => entry.secondary = fixtures,
                    (None, _) => {}
                }
            }
        }
    }

    if let Some(err) = federation_failure {
        return Err(err.context("federation source failed"));
    }
    Ok(out)
}

/// Dedups the federation rows and cross-verifies each volleyball sport.
pub fn assemble(fetched: FetchedSources, calendar: &SeasonCalendar) -> Assembled {
    let mut out = Assembled::default();

    let federation = dedup_fixtures(fetched.federation);
    for (sport, date, pairings) in same_day_collisions(&federation, calendar) {
        let msg = format!(
            "{sport} has {} fixtures on {}/{}: {}",
            pairings.len(),
            date.day,
            date.month,
            pairings.join("; ")
        );
        log::warn!("data integrity: {msg}");
        out.warnings.push(msg);
    }
    out.after_dedup = federation.len();
    out.fixtures = federation;

    for SportFetch {
        sport,
        primary,
        secondary,
    } in fetched.volleyball
    {
        let merged = merge_sources(primary, secondary, calendar);
        log::info!(
            "{sport}: {} fixtures after merge ({} added from verification, {} results confirmed)",
            merged.fixtures.len(),
            merged.added,
            merged.promoted
        );
        if merged.disagreements > 0 {
            out.warnings.push(format!(
                "{sport}: {} results disagree between sources; primary kept",
                merged.disagreements
            ));
        }
        out.merged_added += merged.added;
        out.merged_promoted += merged.promoted;
        out.fixtures.extend(merged.fixtures);
    }

    out
}

#[derive(Debug, Clone, Default)]
pub struct Folded {
    pub projected: usize,
    pub dropped: Vec<String>,
    pub months: Vec<MonthReconcile>,
}

/// Projects fixtures for the tracked team and reconciles them into `store`.
pub fn fold_into_store(
    store: &mut EventStore,
    fixtures: &[RawFixture],
    tracked_team: &str,
    calendar: &SeasonCalendar,
) -> Folded {
    let projection = project_all(fixtures, tracked_team, calendar);
    let projected = projection.events.len();
    let report = reconcile_store(store, projection.events);
    log::info!(
        "reconciled: {} updated, {} added, {} kept from earlier runs",
        report.updated(),
        report.added(),
        report.kept()
    );
    Folded {
        projected,
        dropped: projection.dropped,
        months: report.months,
    }
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_fetch_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}
