use std::collections::HashMap;

use crate::fixture::{RawFixture, Sport};
use crate::normalize::{FixtureDate, parse_fixture_date};
use crate::season::SeasonCalendar;

/// Identity of a row inside one source: the raw date string and both team
/// names, compared exactly.
pub fn dedup_key(fixture: &RawFixture) -> String {
    format!(
        "{}|{}|{}",
        fixture.date, fixture.home_team, fixture.away_team
    )
}

/// One record per `dedup_key`, a played record beating an upcoming one.
/// Output keeps the position of each key's first appearance.
pub fn dedup_fixtures(fixtures: Vec<RawFixture>) -> Vec<RawFixture> {
    let mut out: Vec<RawFixture> = Vec::with_capacity(fixtures.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for fixture in fixtures {
        let key = dedup_key(&fixture);
        match index.get(&key) {
            Some(&idx) => {
                if fixture.is_played() && !out[idx].is_played() {
                    out[idx] = fixture;
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(fixture);
            }
        }
    }

    out
}

/// Distinct fixtures that land on the same day for the same sport. A single
/// team cannot play twice a day, so each one is a data-integrity warning.
pub fn same_day_collisions(
    fixtures: &[RawFixture],
    calendar: &SeasonCalendar,
) -> Vec<(Sport, FixtureDate, Vec<String>)> {
    let mut by_day: HashMap<(Sport, FixtureDate), Vec<String>> = HashMap::new();
    for fixture in fixtures {
        let Some(date) = parse_fixture_date(&fixture.date, calendar) else {
            continue;
        };
        by_day
            .entry((fixture.sport, date))
            .or_default()
            .push(format!("{} vs {}", fixture.home_team, fixture.away_team));
    }

    let mut out: Vec<_> = by_day
        .into_iter()
        .filter(|(_, pairings)| pairings.len() > 1)
        .map(|((sport, date), pairings)| (sport, date, pairings))
        .collect();
    out.sort_by_key(|(sport, date, _)| (*sport, date.month, date.day));
    out
}
