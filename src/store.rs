use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::fixture::Sport;
use crate::season::SeasonCalendar;

const STORE_VERSION: u32 = 1;
pub const STATUS_PLAYED: &str = "played";
pub const COMPETITION_CUP: &str = "cup";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Location {
    Home,
    Away,
    /// Anything a human typed that is not home/away; kept verbatim.
    Other(String),
}

impl From<String> for Location {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "home" => Location::Home,
            "away" => Location::Away,
            _ => Location::Other(raw),
        }
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        match location {
            Location::Home => "home".to_string(),
            Location::Away => "away".to_string(),
            Location::Other(raw) => raw,
        }
    }
}

/// A scraped-sport calendar entry. Fields the pipeline does not produce are
/// carried in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub day: u32,
    pub sport: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalties: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    pub fn new(day: u32, sport: impl Into<String>) -> Self {
        Self {
            day,
            sport: sport.into(),
            location: None,
            opponent: None,
            time: None,
            venue: None,
            logo: None,
            status: None,
            score: None,
            competition: None,
            penalties: None,
            extra: Map::new(),
        }
    }

    pub fn scraped_sport(&self) -> Option<Sport> {
        Sport::from_key(&self.sport)
    }

    pub fn is_played(&self) -> bool {
        self.status.as_deref() == Some(STATUS_PLAYED)
    }
}

/// One entry of a month bucket as found on disk.
///
/// Only entries whose `sport` is scraped are typed. Everything else (meetings,
/// trips, or a scraped entry a human broke by hand) stays the exact JSON
/// object that was read.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StoredEvent {
    Scraped(Event),
    Manual(Map<String, Value>),
}

impl StoredEvent {
    pub fn from_map(map: Map<String, Value>) -> Self {
        let scraped = map
            .get("sport")
            .and_then(Value::as_str)
            .and_then(Sport::from_key)
            .is_some();
        if scraped {
            match serde_json::from_value::<Event>(Value::Object(map.clone())) {
                Ok(event) => return StoredEvent::Scraped(event),
                Err(err) => log::warn!("store: keeping malformed scraped entry as is: {err}"),
            }
        }
        StoredEvent::Manual(map)
    }

    pub fn day(&self) -> Option<u32> {
        match self {
            StoredEvent::Scraped(event) => Some(event.day),
            StoredEvent::Manual(map) => map
                .get("day")
                .and_then(Value::as_u64)
                .and_then(|d| u32::try_from(d).ok()),
        }
    }

    pub fn as_scraped(&self) -> Option<&Event> {
        match self {
            StoredEvent::Scraped(event) => Some(event),
            StoredEvent::Manual(_) => None,
        }
    }
}

impl From<Event> for StoredEvent {
    fn from(event: Event) -> Self {
        StoredEvent::Scraped(event)
    }
}

impl<'de> Deserialize<'de> for StoredEvent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(StoredEvent::from_map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthBucket {
    pub month: String,
    pub events: Vec<StoredEvent>,
}

/// Month name -> events, the twelve season buckets first in season order,
/// then any unrecognised keys found on disk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventStore {
    buckets: Vec<MonthBucket>,
}

impl EventStore {
    pub fn empty(calendar: &SeasonCalendar) -> Self {
        Self {
            buckets: calendar
                .months()
                .map(|m| MonthBucket {
                    month: m.key.to_string(),
                    events: Vec::new(),
                })
                .collect(),
        }
    }

    pub fn buckets(&self) -> &[MonthBucket] {
        &self.buckets
    }

    pub fn bucket(&self, month: &str) -> Option<&[StoredEvent]> {
        self.buckets
            .iter()
            .find(|b| b.month == month)
            .map(|b| b.events.as_slice())
    }

    pub fn bucket_mut(&mut self, month: &str) -> &mut Vec<StoredEvent> {
        let idx = match self.buckets.iter().position(|b| b.month == month) {
            Some(idx) => idx,
            None => {
                self.buckets.push(MonthBucket {
                    month: month.to_string(),
                    events: Vec::new(),
                });
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[idx].events
    }

    pub fn event_count(&self) -> usize {
        self.buckets.iter().map(|b| b.events.len()).sum()
    }

    pub fn from_json_map(map: Map<String, Value>, calendar: &SeasonCalendar) -> Result<Self> {
        let mut store = Self::empty(calendar);
        for (month, value) in map {
            let events: Vec<StoredEvent> = serde_json::from_value(value)
                .with_context(|| format!("invalid events for month {month:?}"))?;
            if !calendar.is_bucket_key(&month) {
                log::warn!("store: keeping unrecognised month key {month:?}");
            }
            *store.bucket_mut(&month) = events;
        }
        Ok(store)
    }

    pub fn to_json_map(&self) -> Result<Map<String, Value>> {
        let mut map = Map::new();
        for bucket in &self.buckets {
            let value = serde_json::to_value(&bucket.events)
                .with_context(|| format!("serialize events for {}", bucket.month))?;
            map.insert(bucket.month.clone(), value);
        }
        Ok(map)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    season: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<String>,
    events: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PriorState {
    #[default]
    Missing,
    Loaded,
    /// Unreadable; the original bytes were copied to `backup` when possible.
    Corrupt {
        error: String,
        backup: Option<PathBuf>,
    },
}

impl PriorState {
    /// False when an unreadable store exists on disk and no copy of it was
    /// made, so writing over it would lose it.
    pub fn safe_to_overwrite(&self) -> bool {
        !matches!(self, PriorState::Corrupt { backup: None, .. })
    }
}

#[derive(Debug, Clone)]
pub struct LoadedStore {
    pub store: EventStore,
    pub prior: PriorState,
}

/// Parses a store document. Accepts the wrapped `{"version", "events"}` form
/// and a bare month -> events object.
pub fn parse_store(raw: &str, calendar: &SeasonCalendar) -> Result<EventStore> {
    let root: Value = serde_json::from_str(raw.trim()).context("store is not valid json")?;
    let Value::Object(obj) = root else {
        return Err(anyhow!("store root is not an object"));
    };
    if obj.contains_key("events") {
        let file: StoreFile =
            serde_json::from_value(Value::Object(obj)).context("invalid store file")?;
        if file.version > STORE_VERSION {
            log::warn!("store: version {} is newer than {STORE_VERSION}", file.version);
        }
        return EventStore::from_json_map(file.events, calendar);
    }
    EventStore::from_json_map(obj, calendar)
}

/// Loads the previous run's store. Never fails: a missing file is an empty
/// store, an unreadable one is backed up byte for byte and replaced by an
/// empty store.
pub fn load_store(path: &Path, calendar: &SeasonCalendar) -> LoadedStore {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::info!("store: no previous store at {}", path.display());
            return LoadedStore {
                store: EventStore::empty(calendar),
                prior: PriorState::Missing,
            };
        }
        Err(err) => return corrupt(path, calendar, anyhow!(err).context("cannot read store"), None),
    };

    let parsed = std::str::from_utf8(&bytes)
        .context("store is not utf-8")
        .and_then(|raw| parse_store(raw, calendar));
    match parsed {
        Ok(store) => LoadedStore {
            store,
            prior: PriorState::Loaded,
        },
        Err(err) => {
            let backup = backup_corrupt(path, &bytes);
            corrupt(path, calendar, err, backup)
        }
    }
}

fn corrupt(
    path: &Path,
    calendar: &SeasonCalendar,
    err: anyhow::Error,
    backup: Option<PathBuf>,
) -> LoadedStore {
    match &backup {
        Some(copy) => log::warn!(
            "store: {} is unreadable ({err:#}); starting from empty state, original kept at {}",
            path.display(),
            copy.display()
        ),
        None => log::warn!(
            "store: {} is unreadable ({err:#}) and could not be backed up",
            path.display()
        ),
    }
    LoadedStore {
        store: EventStore::empty(calendar),
        prior: PriorState::Corrupt {
            error: format!("{err:#}"),
            backup,
        },
    }
}

fn backup_corrupt(path: &Path, bytes: &[u8]) -> Option<PathBuf> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let mut name = path.file_name()?.to_os_string();
    name.push(format!(".corrupt-{secs}"));
    let backup = path.with_file_name(name);
    fs::write(&backup, bytes).ok()?;
    Some(backup)
}

pub fn render_store(store: &EventStore, calendar: &SeasonCalendar) -> Result<String> {
    let file = StoreFile {
        version: STORE_VERSION,
        season: Some(calendar.label()),
        updated_at: Some(chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        events: store.to_json_map()?,
    };
    let mut json = serde_json::to_string_pretty(&file).context("serialize store")?;
    json.push('\n');
    Ok(json)
}

/// Writes the store pretty-printed through a temp file + rename.
pub fn save_store(path: &Path, store: &EventStore, calendar: &SeasonCalendar) -> Result<()> {
    let json = render_store(store, calendar)?;
    write_atomic(path, &json)
}

pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, contents).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual(raw: &str) -> Map<String, Value> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn manual_entries_survive_a_round_trip_exactly() {
        let cal = SeasonCalendar::new(2025);
        let raw = r#"{
            "version": 1,
            "events": {
                "october": [
                    {"day": 12, "sport": "meeting", "title": "General assembly", "location": "Clubhouse", "venue": null, "time": 2100},
                    {"day": 5, "sport": "football-men", "location": "home", "opponent": "Rival FC", "time": "15:00", "notes": {"bus": true}}
                ]
            }
        }"#;
        let store = parse_store(raw, &cal).unwrap();
        let october = store.bucket("october").unwrap();
        assert_eq!(october.len(), 2);
        assert_eq!(
            october[0],
            StoredEvent::Manual(manual(
                r#"{"day": 12, "sport": "meeting", "title": "General assembly", "location": "Clubhouse", "venue": null, "time": 2100}"#
            ))
        );
        let scraped = october[1].as_scraped().unwrap();
        assert_eq!(scraped.location, Some(Location::Home));
        assert_eq!(scraped.scraped_sport(), Some(Sport::FootballMen));

        let rendered = render_store(&store, &cal).unwrap();
        assert!(rendered.contains(r#""venue": null"#));
        assert!(rendered.contains(r#""time": 2100"#));
        let again = parse_store(&rendered, &cal).unwrap();
        assert_eq!(again, store);
    }

    #[test]
    fn hand_broken_scraped_entry_is_kept_verbatim() {
        let cal = SeasonCalendar::new(2025);
        let raw = r#"{"november": [
            {"day": 2, "sport": "football-men", "time": 1500, "opponent": "Rival FC"},
            {"day": 9, "sport": "volleyball-men", "location": "away", "opponent": "Leixões SC"}
        ]}"#;
        let store = parse_store(raw, &cal).unwrap();
        let november = store.bucket("november").unwrap();
        assert!(matches!(november[0], StoredEvent::Manual(_)));
        assert_eq!(november[0].day(), Some(2));
        assert!(november[1].as_scraped().is_some());
    }

    #[test]
    fn buckets_are_written_in_season_order() {
        let cal = SeasonCalendar::new(2025);
        let raw = r#"{"march": [], "september": [{"day": 1, "sport": "trip"}], "holidays": []}"#;
        let store = parse_store(raw, &cal).unwrap();
        let months: Vec<_> = store.buckets().iter().map(|b| b.month.as_str()).collect();
        assert_eq!(months.len(), 13);
        assert_eq!(months[0], "september");
        assert_eq!(months[11], "august");
        assert_eq!(months[12], "holidays");
        let keys: Vec<_> = store.to_json_map().unwrap().keys().cloned().collect();
        assert_eq!(keys[0], "september");
        assert_eq!(keys[12], "holidays");
    }

    #[test]
    fn rejects_non_object_documents() {
        let cal = SeasonCalendar::new(2025);
        assert!(parse_store("[]", &cal).is_err());
        assert!(parse_store("const events = {};", &cal).is_err());
        assert!(parse_store(r#"{"october": ["meeting"]}"#, &cal).is_err());
    }
}
