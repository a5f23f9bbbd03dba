use std::collections::{HashMap, HashSet};

use crate::fixture::Sport;
use crate::normalize::normalize_opponent;
use crate::project::ProjectedEvent;
use crate::store::{Event, EventStore, StoredEvent};

/// Identity of a scraped event inside a month bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub day: u32,
    pub sport: Sport,
    pub opponent: String,
}

pub fn event_key(event: &Event) -> Option<EventKey> {
    Some(EventKey {
        day: event.day,
        sport: event.scraped_sport()?,
        opponent: normalize_opponent(event.opponent.as_deref().unwrap_or_default()),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthReconcile {
    pub month: String,
    /// Entries kept as raw JSON (non-scraped sports), untouched.
    pub manual: usize,
    pub updated: usize,
    /// Scraped-sport events the current scrape no longer reports.
    pub kept: usize,
    pub added: usize,
    /// Fresh events sharing a key with an earlier fresh event.
    pub collisions: usize,
    /// Nothing fresh for a month that already had events: left as is.
    pub untouched: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub months: Vec<MonthReconcile>,
}

impl ReconcileReport {
    pub fn updated(&self) -> usize {
        self.months.iter().map(|m| m.updated).sum()
    }

    pub fn added(&self) -> usize {
        self.months.iter().map(|m| m.added).sum()
    }

    pub fn kept(&self) -> usize {
        self.months.iter().map(|m| m.kept).sum()
    }
}

/// Folds freshly projected events into `store`, month by month.
///
/// Months with no fresh events are left exactly as they were. Running it
/// twice with the same input leaves the store unchanged the second time.
pub fn reconcile_store(store: &mut EventStore, fresh: Vec<ProjectedEvent>) -> ReconcileReport {
    let mut by_month: HashMap<&'static str, Vec<Event>> = HashMap::new();
    for projected in fresh {
        by_month
            .entry(projected.month)
            .or_default()
            .push(projected.event);
    }

    let mut months: Vec<String> = store.buckets().iter().map(|b| b.month.clone()).collect();
    for month in by_month.keys() {
        if !months.iter().any(|m| m == month) {
            months.push(month.to_string());
        }
    }

    let mut report = ReconcileReport::default();
    for month in months {
        let fresh_events = by_month.remove(month.as_str()).unwrap_or_default();
        let bucket = store.bucket_mut(&month);
        if fresh_events.is_empty() {
            if !bucket.is_empty() {
                log::info!(
                    "reconcile: no fresh events for {month}; keeping {} stored events as is",
                    bucket.len()
                );
                report.months.push(MonthReconcile {
                    month,
                    untouched: true,
                    ..MonthReconcile::default()
                });
            }
            continue;
        }
        let mut stats = reconcile_month(bucket, fresh_events);
        stats.month = month;
        report.months.push(stats);
    }
    report
}

/// Reconciles one bucket in place and sorts it by day. Entries sharing a
/// day keep their stored order; new events go after them.
pub fn reconcile_month(bucket: &mut Vec<StoredEvent>, fresh: Vec<Event>) -> MonthReconcile {
    let mut stats = MonthReconcile::default();

    let mut lookup: HashMap<EventKey, usize> = HashMap::new();
    let mut fresh_keys: Vec<Option<EventKey>> = Vec::with_capacity(fresh.len());
    for (idx, event) in fresh.iter().enumerate() {
        let key = event_key(event);
        if let Some(key) = &key {
            if lookup.contains_key(key) {
                log::warn!(
                    "reconcile: duplicate fresh event {} day {} vs {}; keeping the first",
                    key.sport,
                    key.day,
                    key.opponent
                );
                stats.collisions += 1;
            } else {
                lookup.insert(key.clone(), idx);
            }
        }
        fresh_keys.push(key);
    }

    let mut consumed: HashSet<EventKey> = HashSet::new();
    for stored in bucket.iter_mut() {
        let StoredEvent::Scraped(existing) = stored else {
            stats.manual += 1;
            continue;
        };
        let matched = event_key(existing).and_then(|key| lookup.get(&key).map(|&idx| (key, idx)));
        match matched {
            Some((key, idx)) => {
                apply_update(existing, &fresh[idx]);
                consumed.insert(key);
                stats.updated += 1;
            }
            None => stats.kept += 1,
        }
    }

    for (event, key) in fresh.into_iter().zip(fresh_keys) {
        // projected events always carry a scraped sport
        let is_new = key.is_none_or(|key| consumed.insert(key));
        if is_new {
            bucket.push(StoredEvent::Scraped(event));
            stats.added += 1;
        }
    }

    bucket.sort_by_key(|e| e.day().unwrap_or(0));
    stats
}

/// Copies what a scrape is allowed to change onto a stored event. Results
/// are only ever added, never cleared.
fn apply_update(existing: &mut Event, fresh: &Event) {
    if fresh.location.is_some() {
        existing.location = fresh.location.clone();
    }
    if let Some(time) = fresh.time.as_deref()
        && !time.is_empty()
    {
        existing.time = Some(time.to_string());
    } else if existing.time.is_none() {
        existing.time = fresh.time.clone();
    }
    if fresh.is_played() {
        existing.status = fresh.status.clone();
        existing.score = fresh.score.clone();
        if fresh.penalties.is_some() {
            existing.penalties = fresh.penalties.clone();
        }
    }
    if fresh.venue.is_some() {
        existing.venue = fresh.venue.clone();
    }
    if fresh.logo.is_some() {
        existing.logo = fresh.logo.clone();
    }
    if fresh.competition.is_some() {
        existing.competition = fresh.competition.clone();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::store::Location;

    fn scraped(day: u32, opponent: &str) -> Event {
        let mut e = Event::new(day, "football-men");
        e.location = Some(Location::Home);
        e.opponent = Some(opponent.to_string());
        e.time = Some("15:00".to_string());
        e
    }

    fn meeting(day: u32) -> StoredEvent {
        let Value::Object(map) = json!({"day": day, "sport": "meeting", "title": "Board meeting"})
        else {
            unreachable!()
        };
        StoredEvent::Manual(map)
    }

    fn stored(event: Event) -> StoredEvent {
        StoredEvent::Scraped(event)
    }

    fn scraped_at(bucket: &[StoredEvent], idx: usize) -> &Event {
        bucket[idx].as_scraped().unwrap()
    }

    fn played(mut e: Event, score: &str) -> Event {
        e.status = Some("played".to_string());
        e.score = Some(score.to_string());
        e.time = Some(String::new());
        e
    }

    #[test]
    fn updates_scores_and_leaves_meetings_alone() {
        let mut bucket = vec![stored(scraped(5, "Rival FC")), meeting(12)];
        let fresh = vec![played(scraped(5, "RIVAL FC"), "3-0")];
        let stats = reconcile_month(&mut bucket, fresh);

        assert_eq!(bucket.len(), 2);
        let football = scraped_at(&bucket, 0);
        assert_eq!(football.score.as_deref(), Some("3-0"));
        assert_eq!(football.opponent.as_deref(), Some("Rival FC"));
        assert_eq!(football.time.as_deref(), Some("15:00"));
        assert_eq!(bucket[1], meeting(12));
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.manual, 1);
        assert_eq!(stats.added, 0);
    }

    #[test]
    fn stored_result_is_not_regressed() {
        let mut bucket = vec![stored(played(scraped(5, "Rival FC"), "2-2"))];
        reconcile_month(&mut bucket, vec![scraped(5, "Rival FC")]);
        assert_eq!(scraped_at(&bucket, 0).score.as_deref(), Some("2-2"));
        assert!(scraped_at(&bucket, 0).is_played());
    }

    #[test]
    fn unreported_scraped_events_stay_and_new_ones_are_added_sorted() {
        let mut bucket = vec![stored(scraped(20, "Old Opponent")), meeting(3)];
        let fresh = vec![scraped(27, "New Opponent"), scraped(6, "Another One")];
        let stats = reconcile_month(&mut bucket, fresh);
        let days: Vec<_> = bucket.iter().filter_map(StoredEvent::day).collect();
        assert_eq!(days, vec![3, 6, 20, 27]);
        assert_eq!(bucket[2], stored(scraped(20, "Old Opponent")));
        assert_eq!(stats.kept, 1);
        assert_eq!(stats.added, 2);
    }

    #[test]
    fn same_day_entries_keep_their_stored_order() {
        let mut bucket = vec![stored(scraped(5, "Rival FC")), meeting(5), meeting(2)];
        let fresh = vec![played(scraped(5, "Rival FC"), "1-1"), scraped(5, "Late Add")];
        reconcile_month(&mut bucket, fresh);

        assert_eq!(bucket.len(), 4);
        assert_eq!(bucket[0], meeting(2));
        assert_eq!(scraped_at(&bucket, 1).score.as_deref(), Some("1-1"));
        assert_eq!(bucket[2], meeting(5));
        assert_eq!(scraped_at(&bucket, 3).opponent.as_deref(), Some("Late Add"));
    }

    #[test]
    fn undated_manual_entry_is_counted_and_kept() {
        let Value::Object(note) = json!({"sport": "note", "text": "pick up kits"}) else {
            unreachable!()
        };
        let mut bucket = vec![StoredEvent::Manual(note.clone())];
        let stats = reconcile_month(&mut bucket, vec![scraped(9, "Rival FC")]);
        assert_eq!(stats.manual, 1);
        assert_eq!(bucket[0], StoredEvent::Manual(note));
    }

    #[test]
    fn division_marker_does_not_split_identity() {
        let mut existing = Event::new(8, "volleyball-women");
        existing.opponent = Some("Leixões SC".to_string());
        existing.extra.insert("tv".to_string(), Value::from("Canal 11"));
        let mut bucket = vec![stored(existing)];

        let mut fresh = Event::new(8, "volleyball-women");
        fresh.opponent = Some("Leixões SC (F)".to_string());
        fresh.venue = Some("Pavilhão".to_string());
        let stats = reconcile_month(&mut bucket, vec![fresh]);

        assert_eq!(stats.updated, 1);
        assert_eq!(bucket.len(), 1);
        let event = scraped_at(&bucket, 0);
        assert_eq!(event.venue.as_deref(), Some("Pavilhão"));
        assert_eq!(event.extra.get("tv"), Some(&Value::from("Canal 11")));
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut bucket = vec![stored(scraped(5, "Rival FC")), meeting(5), meeting(1)];
        let fresh = vec![
            played(scraped(5, "Rival FC"), "1-0"),
            scraped(19, "Third FC"),
            scraped(19, "Third FC"),
        ];
        let first = reconcile_month(&mut bucket, fresh.clone());
        assert_eq!(first.collisions, 1);
        let snapshot = bucket.clone();
        reconcile_month(&mut bucket, fresh);
        assert_eq!(bucket, snapshot);
    }

    #[test]
    fn empty_fresh_month_is_left_exactly_as_stored() {
        let cal = crate::season::SeasonCalendar::new(2025);
        let mut store = EventStore::empty(&cal);
        // deliberately unsorted; a no-op month must not even be re-sorted
        *store.bucket_mut("november") =
            vec![stored(scraped(20, "B Team")), stored(scraped(2, "A Team"))];
        let before = store.clone();

        let fresh = vec![ProjectedEvent {
            month: "october",
            event: scraped(5, "Rival FC"),
        }];
        let report = reconcile_store(&mut store, fresh);

        assert_eq!(store.bucket("november"), before.bucket("november"));
        assert_eq!(store.bucket("october").map(|b| b.len()), Some(1));
        let november = report.months.iter().find(|m| m.month == "november").unwrap();
        assert!(november.untouched);
        assert_eq!(report.added(), 1);
    }
}
