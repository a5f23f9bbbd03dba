use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use crate::fixture::Sport;
use crate::season::SeasonCalendar;

const DEFAULT_STORE_PATH: &str = "data/fixtures.json";
const DEFAULT_TRACKED_TEAM: &str = "Sporting";
const DEFAULT_FETCH_PARALLELISM: usize = 6;

const DEFAULT_FEDERATION_PHASE1: &str =
    "https://resultados.federacao.example.org/competicao/senior-masculino/fase/1";
const DEFAULT_FEDERATION_PHASE2: &str =
    "https://resultados.federacao.example.org/competicao/senior-masculino/fase/2";
const DEFAULT_LEAGUE_MEN: &str = "https://liga-voleibol.example.org/calendario/masculino";
const DEFAULT_LEAGUE_WOMEN: &str = "https://liga-voleibol.example.org/calendario/feminino";
const DEFAULT_VERIFY_MEN: &str = "https://resultados-voleibol.example.net/seniores-masculinos";
const DEFAULT_VERIFY_WOMEN: &str = "https://resultados-voleibol.example.net/seniores-femininos";

/// Primary + verification endpoints for one volleyball sport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolleyballSources {
    pub sport: Sport,
    pub primary_url: String,
    pub secondary_url: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub store_path: PathBuf,
    pub audit_path: Option<PathBuf>,
    pub tracked_team: String,
    pub federation_filter: Option<String>,
    pub calendar: SeasonCalendar,
    pub federation_urls: Vec<String>,
    pub volleyball: Vec<VolleyballSources>,
    pub fetch_parallelism: usize,
    pub dry_run: bool,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let tracked_team = env_or("TRACKED_TEAM", DEFAULT_TRACKED_TEAM);
        let federation_filter = match std::env::var("FEDERATION_TEAM_FILTER") {
            Ok(raw) if raw.trim().is_empty() => None,
            Ok(raw) => Some(raw.trim().to_string()),
            Err(_) => Some(tracked_team.clone()),
        };
        let calendar = match std::env::var("SEASON_START_YEAR") {
            Ok(raw) if !raw.trim().is_empty() => SeasonCalendar::new(parse_year(&raw)?),
            _ => SeasonCalendar::current(),
        };

        Ok(Self {
            store_path: PathBuf::from(env_or("FIXTURES_STORE_PATH", DEFAULT_STORE_PATH)),
            audit_path: env_non_empty("FIXTURES_AUDIT_PATH").map(PathBuf::from),
            tracked_team,
            federation_filter,
            calendar,
            federation_urls: vec![
                env_or("FEDERATION_URL_PHASE1", DEFAULT_FEDERATION_PHASE1),
                env_or("FEDERATION_URL_PHASE2", DEFAULT_FEDERATION_PHASE2),
            ],
            volleyball: vec![
                VolleyballSources {
                    sport: Sport::VolleyballMen,
                    primary_url: env_or("LEAGUE_URL_VOLLEYBALL_MEN", DEFAULT_LEAGUE_MEN),
                    secondary_url: env_or("VERIFY_URL_VOLLEYBALL_MEN", DEFAULT_VERIFY_MEN),
                },
                VolleyballSources {
                    sport: Sport::VolleyballWomen,
                    primary_url: env_or("LEAGUE_URL_VOLLEYBALL_WOMEN", DEFAULT_LEAGUE_WOMEN),
                    secondary_url: env_or("VERIFY_URL_VOLLEYBALL_WOMEN", DEFAULT_VERIFY_WOMEN),
                },
            ],
            fetch_parallelism: fetch_parallelism(),
            dry_run: false,
        })
    }

    /// Applies `--store`, `--audit`, `--team`, `--season` and `--dry-run`.
    pub fn with_args<I, S>(mut self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let mut idx = 0;
        while idx < args.len() {
            let arg = args[idx].as_str();
            if arg == "--dry-run" {
                self.dry_run = true;
                idx += 1;
                continue;
            }
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (arg, None),
            };
            if !matches!(flag, "--store" | "--audit" | "--team" | "--season") {
                return Err(anyhow!("unknown argument {arg:?}"));
            }
            let value = match inline {
                Some(value) => value,
                None => {
                    idx += 1;
                    args.get(idx)
                        .cloned()
                        .with_context(|| format!("{flag} needs a value"))?
                }
            };
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(anyhow!("{flag} needs a value"));
            }
            match flag {
                "--store" => self.store_path = PathBuf::from(value),
                "--audit" => self.audit_path = Some(PathBuf::from(value)),
                "--team" => {
                    if self.federation_filter.as_deref() == Some(self.tracked_team.as_str()) {
                        self.federation_filter = Some(value.clone());
                    }
                    self.tracked_team = value;
                }
                "--season" => self.calendar = SeasonCalendar::new(parse_year(&value)?),
                _ => return Err(anyhow!("unknown argument {arg:?}")),
            }
            idx += 1;
        }
        Ok(self)
    }
}

fn parse_year(raw: &str) -> Result<i32> {
    let year: i32 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid season start year {raw:?}"))?;
    if !(2000..=2100).contains(&year) {
        return Err(anyhow!("season start year {year} out of range"));
    }
    Ok(year)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_non_empty(key).unwrap_or_else(|| default.to_string())
}

fn fetch_parallelism() -> usize {
    std::env::var("FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(DEFAULT_FETCH_PARALLELISM)
        .clamp(1, 16)
}
