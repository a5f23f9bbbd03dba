use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::fold_ascii;

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,3})\s*[-–x]\s*(\d{1,3})\s*$").expect("score regex"));
static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,2})\s*[:hH.]\s*(\d{2})\s*$").expect("clock regex"));
static EMBEDDED_SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,3})\s*[-–]\s*(\d{1,3})").expect("embedded score regex"));

const CUP_MARKERS: &[&str] = &["taca", "cup", "copa", "supertaca"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sport {
    #[serde(rename = "football-men")]
    FootballMen,
    #[serde(rename = "volleyball-men")]
    VolleyballMen,
    #[serde(rename = "volleyball-women")]
    VolleyballWomen,
}

impl Sport {
    pub const ALL: [Sport; 3] = [
        Sport::FootballMen,
        Sport::VolleyballMen,
        Sport::VolleyballWomen,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Sport::FootballMen => "football-men",
            Sport::VolleyballMen => "volleyball-men",
            Sport::VolleyballWomen => "volleyball-women",
        }
    }

    pub fn from_key(key: &str) -> Option<Sport> {
        Sport::ALL.into_iter().find(|s| s.key() == key.trim())
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixtureStatus {
    Played,
    Upcoming,
}

/// What the overloaded score/time column actually carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FixtureResult {
    Played {
        score: String,
    },
    Upcoming {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<String>,
    },
}

impl FixtureResult {
    /// Scores (`"2-1"`, `"3 - 1"`, `"3x0"`) mean played; anything else is
    /// upcoming, with a clock time kept when one can be read.
    pub fn from_score_or_time(raw: &str) -> Self {
        if let Some(score) = normalize_score(raw) {
            return FixtureResult::Played { score };
        }
        FixtureResult::Upcoming {
            time: normalize_clock(raw),
        }
    }

    pub fn upcoming() -> Self {
        FixtureResult::Upcoming { time: None }
    }

    pub fn status(&self) -> FixtureStatus {
        match self {
            FixtureResult::Played { .. } => FixtureStatus::Played,
            FixtureResult::Upcoming { .. } => FixtureStatus::Upcoming,
        }
    }

    pub fn is_played(&self) -> bool {
        matches!(self, FixtureResult::Played { .. })
    }

    pub fn score(&self) -> Option<&str> {
        match self {
            FixtureResult::Played { score } => Some(score),
            FixtureResult::Upcoming { .. } => None,
        }
    }

    pub fn time(&self) -> Option<&str> {
        match self {
            FixtureResult::Played { .. } => None,
            FixtureResult::Upcoming { time } => time.as_deref(),
        }
    }

    /// Wire view: the score when played, else the kickoff time (possibly empty).
    pub fn score_or_time(&self) -> String {
        match self {
            FixtureResult::Played { score } => score.clone(),
            FixtureResult::Upcoming { time } => time.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Competition {
    League,
    Cup,
}

impl Competition {
    pub fn from_stage_label(label: &str) -> Competition {
        let folded = fold_ascii(label);
        if CUP_MARKERS
            .iter()
            .any(|marker| folded.split(|c: char| !c.is_alphanumeric()).any(|w| w == *marker))
        {
            Competition::Cup
        } else {
            Competition::League
        }
    }
}

/// One match as a single source reported it, before projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFixture {
    pub sport: Sport,
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_logo: Option<String>,
    #[serde(flatten)]
    pub result: FixtureResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition: Option<Competition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalties: Option<String>,
}

impl RawFixture {
    pub fn new(
        sport: Sport,
        date: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
        result: FixtureResult,
    ) -> Self {
        Self {
            sport,
            date: date.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            home_logo: None,
            away_logo: None,
            result,
            venue: None,
            match_time: None,
            competition: None,
            penalties: None,
        }
    }

    pub fn status(&self) -> FixtureStatus {
        self.result.status()
    }

    pub fn is_played(&self) -> bool {
        self.result.is_played()
    }

    pub fn score_or_time(&self) -> String {
        self.result.score_or_time()
    }

    /// Case-insensitive substring match against either team.
    pub fn involves(&self, team: &str) -> bool {
        let needle = team.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.home_team.to_lowercase().contains(&needle)
            || self.away_team.to_lowercase().contains(&needle)
    }
}

pub fn normalize_score(raw: &str) -> Option<String> {
    let caps = SCORE_RE.captures(raw)?;
    Some(format!("{}-{}", &caps[1], &caps[2]))
}

pub fn normalize_clock(raw: &str) -> Option<String> {
    let caps = CLOCK_RE.captures(raw)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(format!("{hour:02}:{minute:02}"))
}

/// Pulls a shoot-out score out of annotations like `"(g.p. 4-3)"`.
pub fn parse_penalties(raw: &str) -> Option<String> {
    let caps = EMBEDDED_SCORE_RE.captures(raw)?;
    Some(format!("{}-{}", &caps[1], &caps[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_or_time_becomes_tagged_result() {
        assert_eq!(
            FixtureResult::from_score_or_time("2-1"),
            FixtureResult::Played {
                score: "2-1".to_string()
            }
        );
        assert_eq!(
            FixtureResult::from_score_or_time(" 3 - 1 "),
            FixtureResult::Played {
                score: "3-1".to_string()
            }
        );
        assert_eq!(
            FixtureResult::from_score_or_time("18h00"),
            FixtureResult::Upcoming {
                time: Some("18:00".to_string())
            }
        );
        assert_eq!(
            FixtureResult::from_score_or_time("Adiado"),
            FixtureResult::upcoming()
        );
        assert_eq!(FixtureResult::from_score_or_time(""), FixtureResult::upcoming());
    }

    #[test]
    fn clock_rejects_out_of_range() {
        assert_eq!(normalize_clock("9:30").as_deref(), Some("09:30"));
        assert_eq!(normalize_clock("25:00"), None);
        assert_eq!(normalize_clock("18:75"), None);
    }

    #[test]
    fn sport_keys_round_trip() {
        for sport in Sport::ALL {
            assert_eq!(Sport::from_key(sport.key()), Some(sport));
        }
        assert_eq!(Sport::from_key("meeting"), None);
    }

    #[test]
    fn cup_stage_is_detected() {
        assert_eq!(Competition::from_stage_label("Taça de Portugal - 2ª Eliminatória"), Competition::Cup);
        assert_eq!(Competition::from_stage_label("Campeonato - Jornada 4"), Competition::League);
        assert_eq!(parse_penalties("(g.p. 4-3)").as_deref(), Some("4-3"));
    }

    #[test]
    fn involves_is_case_insensitive() {
        let f = RawFixture::new(
            Sport::FootballMen,
            "5 October 2025",
            "Sporting Clube",
            "Rival FC",
            FixtureResult::upcoming(),
        );
        assert!(f.involves("sporting"));
        assert!(f.involves("RIVAL"));
        assert!(!f.involves("Benfica"));
    }
}
