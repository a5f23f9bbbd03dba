use crate::fixture::{Competition, RawFixture};
use crate::normalize::parse_fixture_date;
use crate::season::SeasonCalendar;
use crate::store::{COMPETITION_CUP, Event, Location, STATUS_PLAYED};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedEvent {
    pub month: &'static str,
    pub event: Event,
}

/// Maps a fixture onto the tracked team's calendar. `None` when the date
/// cannot be read.
pub fn project_fixture(
    fixture: &RawFixture,
    tracked_team: &str,
    calendar: &SeasonCalendar,
) -> Option<ProjectedEvent> {
    let date = parse_fixture_date(&fixture.date, calendar)?;
    let month = calendar.bucket_key(date.month)?;

    let at_home = fixture
        .home_team
        .to_uppercase()
        .contains(&tracked_team.trim().to_uppercase());
    let (location, opponent, opponent_logo) = if at_home {
        (Location::Home, &fixture.away_team, &fixture.away_logo)
    } else {
        (Location::Away, &fixture.home_team, &fixture.home_logo)
    };

    let time = fixture
        .match_time
        .clone()
        .or_else(|| fixture.result.time().map(str::to_string))
        .unwrap_or_default();

    let mut event = Event::new(date.day, fixture.sport.key());
    event.location = Some(location);
    event.opponent = Some(opponent.clone());
    event.time = Some(time);
    event.venue = fixture.venue.clone();
    event.logo = opponent_logo.clone();
    if let Some(score) = fixture.result.score() {
        event.status = Some(STATUS_PLAYED.to_string());
        event.score = Some(score.to_string());
        event.penalties = fixture.penalties.clone();
    }
    if fixture.competition == Some(Competition::Cup) {
        event.competition = Some(COMPETITION_CUP.to_string());
    }

    Some(ProjectedEvent { month, event })
}

#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub events: Vec<ProjectedEvent>,
    pub dropped: Vec<String>,
}

pub fn project_all(
    fixtures: &[RawFixture],
    tracked_team: &str,
    calendar: &SeasonCalendar,
) -> Projection {
    let mut out = Projection::default();
    for fixture in fixtures {
        match project_fixture(fixture, tracked_team, calendar) {
            Some(projected) => out.events.push(projected),
            None => {
                let msg = format!(
                    "{} {} vs {}: unreadable date {:?}",
                    fixture.sport, fixture.home_team, fixture.away_team, fixture.date
                );
                log::warn!("project: dropping {msg}");
                out.dropped.push(msg);
            }
        }
    }
    out
}
