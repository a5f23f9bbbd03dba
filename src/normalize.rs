use chrono::NaiveDate;

use crate::season::SeasonCalendar;

/// Text that sometimes gets picked up as a fixture row (table headers, round
/// separators). Compared against the whole folded cell, round numbers removed.
const HEADER_PHRASES: &[&str] = &[
    "jornada",
    "equipa visitada",
    "equipa visitante",
    "round",
    "data",
    "date",
    "equipa",
    "equipas",
    "team",
    "home",
    "away",
    "visitado",
    "visitante",
    "classificacao",
    "resultado",
    "result",
    "fase",
    "calendario",
];

const MIN_TEAM_NAME_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixtureDate {
    pub day: u32,
    pub month: u32,
}

/// Reads `"<day> <month name> <year>"`, `"DD/MM/YYYY"` or `"DD/MM"`.
///
/// Month names go through the calendar's localized table. A leading weekday
/// and Portuguese `"de"` fillers are tolerated. Impossible dates (`31/02`)
/// and anything else come back as `None`.
pub fn parse_fixture_date(raw: &str, calendar: &SeasonCalendar) -> Option<FixtureDate> {
    let cleaned = clean_text(raw);
    if cleaned.is_empty() {
        return None;
    }
    if cleaned.contains('/') {
        return parse_numeric_date(&cleaned, calendar);
    }
    parse_named_date(&cleaned, calendar)
}

fn parse_numeric_date(raw: &str, calendar: &SeasonCalendar) -> Option<FixtureDate> {
    // "17/10/2025 18:00" style cells carry a trailing time we ignore here.
    let date_part = raw.split_whitespace().next()?;
    let parts: Vec<&str> = date_part.split('/').collect();
    if !(2..=3).contains(&parts.len()) {
        return None;
    }
    if parts
        .iter()
        .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year = match parts.get(2) {
        Some(y) if y.len() == 4 => y.parse::<i32>().ok()?,
        Some(y) if y.len() == 2 => 2000 + y.parse::<i32>().ok()?,
        Some(_) => return None,
        None => calendar.year_for_month(month),
    };
    checked(day, month, year)
}

fn parse_named_date(raw: &str, calendar: &SeasonCalendar) -> Option<FixtureDate> {
    let tokens: Vec<String> = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(fold_ascii)
        .filter(|t| t != "de" && t != "of")
        .collect();

    // Skip a leading weekday ("sab", "saturday").
    let start = tokens.iter().position(|t| parse_day_token(t).is_some())?;
    let rest = &tokens[start..];
    if rest.len() != 3 {
        return None;
    }
    let day = parse_day_token(&rest[0])?;
    let month = calendar.month_from_name(&rest[1])?;
    if rest[2].len() != 4 {
        return None;
    }
    let year: i32 = rest[2].parse().ok()?;
    checked(day, month, year)
}

fn parse_day_token(token: &str) -> Option<u32> {
    let trimmed = token.trim_end_matches(['.', 'º', 'o']);
    if trimmed.is_empty() || trimmed.len() > 2 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

fn checked(day: u32, month: u32, year: i32) -> Option<FixtureDate> {
    NaiveDate::from_ymd_opt(year, month, day)?;
    Some(FixtureDate { day, month })
}

/// Comparison key for an opponent: upper-cased, whitespace collapsed, trailing
/// `"(F)"`/`"(Fem.)"`/`"(B)"` style marker removed. Not for display.
pub fn normalize_opponent(name: &str) -> String {
    let mut base = clean_text(name);
    while base.ends_with(')') {
        let Some(open) = base.rfind('(') else {
            break;
        };
        base = base[..open].trim_end().to_string();
    }
    base.to_uppercase()
}

/// Why a parsed row should not be accepted as a fixture, if it shouldn't.
pub fn row_rejection(home_team: &str, away_team: &str) -> Option<&'static str> {
    if home_team.chars().count() <= MIN_TEAM_NAME_CHARS {
        return Some("home team missing or too short");
    }
    if away_team.chars().count() <= MIN_TEAM_NAME_CHARS {
        return Some("away team missing or too short");
    }
    if is_header_phrase(home_team) || is_header_phrase(away_team) {
        return Some("section header row");
    }
    None
}

/// True for "Jornada", "Jornada 5", "2ª Jornada" but not for a club whose
/// name merely starts with a header word.
fn is_header_phrase(text: &str) -> bool {
    let folded = fold_ascii(text);
    let phrase = folded
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit() || c == 'ª' || c == 'º'))
        .collect::<Vec<_>>()
        .join(" ");
    HEADER_PHRASES.contains(&phrase.as_str())
}

/// Collapses whitespace (including non-breaking spaces) and trims.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase with Portuguese accents stripped.
pub fn fold_ascii(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
