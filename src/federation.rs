use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use rayon::prelude::*;
use scraper::{Html, Selector};

use crate::fixture::{
    Competition, FixtureResult, RawFixture, Sport, normalize_clock, parse_penalties,
};
use crate::html::{first_attr, first_text, selector};
use crate::http_client::fetch_html;
use crate::normalize::row_rejection;

static GAME: Lazy<Selector> = Lazy::new(|| selector("div.game"));
static DATE: Lazy<Selector> = Lazy::new(|| selector(".date"));
static TIME: Lazy<Selector> = Lazy::new(|| selector(".time"));
static STAGE: Lazy<Selector> = Lazy::new(|| selector(".stage"));
static HOME_NAME: Lazy<Selector> = Lazy::new(|| selector(".home .team-name"));
static AWAY_NAME: Lazy<Selector> = Lazy::new(|| selector(".away .team-name"));
static HOME_LOGO: Lazy<Selector> = Lazy::new(|| selector(".home img"));
static AWAY_LOGO: Lazy<Selector> = Lazy::new(|| selector(".away img"));
static SCORE: Lazy<Selector> = Lazy::new(|| selector(".score"));
static PENALTIES: Lazy<Selector> = Lazy::new(|| selector(".penalties"));
static VENUE: Lazy<Selector> = Lazy::new(|| selector(".venue"));

/// Fetches every competition-phase page concurrently and concatenates them in
/// page order. Phases may overlap; run the result through `dedup`.
///
/// Any page failing fails the whole fetch.
pub fn fetch_federation(phase_urls: &[String], team_filter: Option<&str>) -> Result<Vec<RawFixture>> {
    let pages: Vec<Result<Vec<RawFixture>>> = phase_urls
        .par_iter()
        .map(|url| fetch_phase(url, team_filter))
        .collect();

    let mut out = Vec::new();
    for page in pages {
        out.extend(page?);
    }
    Ok(out)
}

fn fetch_phase(url: &str, team_filter: Option<&str>) -> Result<Vec<RawFixture>> {
    let body = fetch_html(url).context("federation phase request failed")?;
    let fixtures = parse_federation_html(&body, team_filter);
    log::info!("federation: {} fixtures from {url}", fixtures.len());
    Ok(fixtures)
}

pub fn parse_federation_html(html: &str, team_filter: Option<&str>) -> Vec<RawFixture> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for game in doc.select(&GAME) {
        let home = first_text(game, &HOME_NAME).unwrap_or_default();
        let away = first_text(game, &AWAY_NAME).unwrap_or_default();
        if let Some(reason) = row_rejection(&home, &away) {
            log::warn!("federation: skipping row ({reason}): {home:?} vs {away:?}");
            continue;
        }
        let Some(date) = first_text(game, &DATE) else {
            log::warn!("federation: skipping {home} vs {away}: no date");
            continue;
        };

        let score_cell = first_text(game, &SCORE).unwrap_or_default();
        let result = FixtureResult::from_score_or_time(&score_cell);
        let mut fixture = RawFixture::new(Sport::FootballMen, date, home, away, result);
        fixture.home_logo = first_attr(game, &HOME_LOGO, "src");
        fixture.away_logo = first_attr(game, &AWAY_LOGO, "src");
        fixture.venue = first_text(game, &VENUE);
        fixture.match_time = first_text(game, &TIME).and_then(|t| normalize_clock(&t));
        fixture.competition = first_text(game, &STAGE).map(|s| Competition::from_stage_label(&s));
        if fixture.is_played() {
            fixture.penalties = first_text(game, &PENALTIES).and_then(|p| parse_penalties(&p));
        }

        if let Some(filter) = team_filter
            && !fixture.involves(filter)
        {
            continue;
        }
        out.push(fixture);
    }

    out
}
