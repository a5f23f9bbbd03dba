use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::fixture::{FixtureResult, RawFixture, Sport};
use crate::html::{element_text, first_attr, selector};
use crate::http_client::fetch_html;
use crate::normalize::row_rejection;

static ROW: Lazy<Selector> = Lazy::new(|| selector("table.results tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("td"));
static IMG: Lazy<Selector> = Lazy::new(|| selector("img"));

/// Secondary site used only to confirm results. Columns are
/// date (DD/MM) | home | score or time | away.
pub fn fetch_verification(
    url: &str,
    sport: Sport,
    team_filter: Option<&str>,
) -> Result<Vec<RawFixture>> {
    let body = fetch_html(url).with_context(|| format!("{sport} verification request failed"))?;
    let fixtures = parse_verification_html(&body, sport, team_filter);
    log::info!("verification {sport}: {} fixtures from {url}", fixtures.len());
    Ok(fixtures)
}

pub fn parse_verification_html(
    html: &str,
    sport: Sport,
    team_filter: Option<&str>,
) -> Vec<RawFixture> {
    let doc = Html::parse_document(html);

    doc.select(&ROW)
        .filter_map(|row| {
            let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
            if cells.len() < 4 {
                return None;
            }
            parse_row(&cells, sport)
        })
        .filter(|fixture| team_filter.is_none_or(|filter| fixture.involves(filter)))
        .collect()
}

fn parse_row(cells: &[ElementRef<'_>], sport: Sport) -> Option<RawFixture> {
    let date = element_text(cells[0]);
    let home = element_text(cells[1]);
    let middle = element_text(cells[2]);
    let away = element_text(cells[3]);

    if let Some(reason) = row_rejection(&home, &away) {
        log::warn!("verification {sport}: skipping row ({reason}): {home:?} vs {away:?}");
        return None;
    }
    if date.is_empty() {
        log::warn!("verification {sport}: skipping {home} vs {away}: no date");
        return None;
    }

    let result = FixtureResult::from_score_or_time(&middle);
    let mut fixture = RawFixture::new(sport, date, home, away, result);
    fixture.home_logo = first_attr(cells[1], &IMG, "src");
    fixture.away_logo = first_attr(cells[3], &IMG, "src");
    Some(fixture)
}
