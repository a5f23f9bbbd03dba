use std::process::ExitCode;

use fixture_sync::config::PipelineConfig;
use fixture_sync::pipeline::{self, RunOutcome, RunSummary};
use fixture_sync::store::PriorState;

fn main() -> ExitCode {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match PipelineConfig::from_env().and_then(|c| c.with_args(std::env::args().skip(1))) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("fixture sync: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(&config) {
        Ok(RunOutcome::Reconciled(summary)) => {
            if summary.dry_run {
                println!("Fixture sync dry run complete (store not written)");
            } else {
                println!("Fixture sync complete");
            }
            print_summary(&config, &summary);
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::NothingToDo(summary)) => {
            println!("Fixture sync: no fixtures retrieved, store left untouched");
            print_sources(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("fixture sync failed: {err:#}");
            eprintln!("fixture sync failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(config: &PipelineConfig, summary: &RunSummary) {
    println!("Store: {}", config.store_path.display());
    println!("Season: {}", config.calendar.label());
    match &summary.prior {
        PriorState::Missing => println!("Previous store: none, started empty"),
        PriorState::Loaded => {}
        PriorState::Corrupt { error, backup } => {
            println!("Previous store unreadable ({error}), started empty");
            if let Some(backup) = backup {
                println!("Backup: {}", backup.display());
            }
        }
    }
    print_sources(summary);
    println!(
        "Fixtures: {} fetched, {} after merge ({} federation after dedup)",
        summary.fetched, summary.after_merge, summary.after_dedup
    );
    println!(
        "Events: {} projected, {} dropped, {} in store",
        summary.projected,
        summary.dropped.len(),
        summary.events_written
    );
    for month in summary.months.iter().filter(|m| !m.untouched) {
        println!(
            " - {}: {} updated, {} added, {} kept, {} manual",
            month.month, month.updated, month.added, month.kept, month.manual
        );
    }
    if !summary.warnings.is_empty() {
        println!("Warnings: {}", summary.warnings.len());
        for warning in summary.warnings.iter().take(8) {
            println!(" - {warning}");
        }
    }
}

fn print_sources(summary: &RunSummary) {
    for source in &summary.sources {
        match &source.error {
            None => println!("Source {}: {} fixtures", source.label, source.fetched),
            Some(err) => println!("Source {}: FAILED ({err})", source.label),
        }
    }
}
