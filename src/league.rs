use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::fixture::{FixtureResult, RawFixture, Sport, normalize_clock};
use crate::html::{element_text, first_attr, non_empty, selector};
use crate::http_client::fetch_html;
use crate::normalize::row_rejection;

static ROW: Lazy<Selector> = Lazy::new(|| selector("table.calendar tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img"));

const MIN_CELLS: usize = 5;

/// Primary league site: one `table.calendar`, columns
/// date | time | home | result | away | venue.
pub fn fetch_league(url: &str, sport: Sport, team_filter: Option<&str>) -> Result<Vec<RawFixture>> {
    let body = fetch_html(url).with_context(|| format!("{sport} league request failed"))?;
    let fixtures = parse_league_html(&body, sport, team_filter);
    log::info!("league {sport}: {} fixtures from {url}", fixtures.len());
    Ok(fixtures)
}

pub fn parse_league_html(html: &str, sport: Sport, team_filter: Option<&str>) -> Vec<RawFixture> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for row in doc.select(&ROW) {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        if cells.len() < MIN_CELLS {
            // header rows use <th>, spacer rows have a single colspan cell
            continue;
        }
        let Some(fixture) = parse_row(&cells, sport) else {
            continue;
        };
        if let Some(filter) = team_filter
            && !fixture.involves(filter)
        {
            continue;
        }
        out.push(fixture);
    }

    out
}

fn parse_row(cells: &[ElementRef<'_>], sport: Sport) -> Option<RawFixture> {
    let date = element_text(cells[0]);
    let time = element_text(cells[1]);
    let home = element_text(cells[2]);
    let result_cell = element_text(cells[3]);
    let away = element_text(cells[4]);

    if let Some(reason) = row_rejection(&home, &away) {
        log::warn!("league {sport}: skipping row ({reason}): {home:?} vs {away:?}");
        return None;
    }
    if date.is_empty() {
        log::warn!("league {sport}: skipping {home} vs {away}: no date");
        return None;
    }

    let match_time = normalize_clock(&time);
    let result = match FixtureResult::from_score_or_time(&result_cell) {
        FixtureResult::Upcoming { time: None } => FixtureResult::Upcoming {
            time: match_time.clone(),
        },
        other => other,
    };

    let mut fixture = RawFixture::new(sport, date, home, away, result);
    fixture.match_time = match_time;
    fixture.home_logo = first_attr(cells[2], &IMG, "src");
    fixture.away_logo = first_attr(cells[4], &IMG, "src");
    fixture.venue = cells.get(5).map(|c| element_text(*c)).and_then(non_empty);
    Some(fixture)
}
