use std::collections::HashMap;

use crate::fixture::{RawFixture, Sport};
use crate::normalize::parse_fixture_date;
use crate::season::SeasonCalendar;

/// Cross-source identity: the tracked team plays at most once per sport per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub day: u32,
    pub month: u32,
    pub sport: Sport,
}

pub fn match_key(fixture: &RawFixture, calendar: &SeasonCalendar) -> Option<MatchKey> {
    let date = parse_fixture_date(&fixture.date, calendar)?;
    Some(MatchKey {
        day: date.day,
        month: date.month,
        sport: fixture.sport,
    })
}

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub fixtures: Vec<RawFixture>,
    /// Secondary-only matches appended.
    pub added: usize,
    /// Upcoming primary records given the secondary's result.
    pub promoted: usize,
    /// Secondary records with an unreadable date.
    pub ignored: usize,
    /// Both sources played, scores differ; primary kept.
    pub disagreements: usize,
}

/// Folds `secondary` into `primary`.
///
/// Secondary-only matches are appended. For a shared key a played secondary
/// record fills in an upcoming primary record; a played primary record is
/// never touched. Nothing is ever removed.
pub fn merge_sources(
    primary: Vec<RawFixture>,
    secondary: Vec<RawFixture>,
    calendar: &SeasonCalendar,
) -> MergeOutcome {
    let mut out = MergeOutcome {
        fixtures: primary,
        ..MergeOutcome::default()
    };

    let mut present: HashMap<MatchKey, usize> = HashMap::new();
    for (idx, fixture) in out.fixtures.iter().enumerate() {
        if let Some(key) = match_key(fixture, calendar) {
            present.entry(key).or_insert(idx);
        }
    }

    for candidate in secondary {
        let Some(key) = match_key(&candidate, calendar) else {
            log::warn!(
                "merge: ignoring secondary {} vs {} with unreadable date {:?}",
                candidate.home_team,
                candidate.away_team,
                candidate.date
            );
            out.ignored += 1;
            continue;
        };

        let Some(&idx) = present.get(&key) else {
            present.insert(key, out.fixtures.len());
            out.fixtures.push(candidate);
            out.added += 1;
            continue;
        };

        let existing = &mut out.fixtures[idx];
        if existing.is_played() {
            if candidate.is_played() && candidate.result != existing.result {
                log::warn!(
                    "merge: {} {}/{} primary has {} but secondary reports {}; keeping primary",
                    key.sport,
                    key.day,
                    key.month,
                    existing.score_or_time(),
                    candidate.score_or_time()
                );
                out.disagreements += 1;
            }
            continue;
        }
        if candidate.is_played() {
            existing.result = candidate.result;
            out.promoted += 1;
        }
    }

    out
}
