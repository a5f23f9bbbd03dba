use chrono::{Datelike, NaiveDate};

use crate::normalize::fold_ascii;

/// Month buckets in season order, September through August.
static SEASON_MONTHS: [(&str, u32); 12] = [
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
];

// Stored already folded (lowercase, no accents).
const MONTH_ALIASES: &[(&str, u32)] = &[
    ("january", 1),
    ("janeiro", 1),
    ("jan", 1),
    ("february", 2),
    ("fevereiro", 2),
    ("feb", 2),
    ("fev", 2),
    ("march", 3),
    ("marco", 3),
    ("mar", 3),
    ("april", 4),
    ("abril", 4),
    ("apr", 4),
    ("abr", 4),
    ("may", 5),
    ("maio", 5),
    ("mai", 5),
    ("june", 6),
    ("junho", 6),
    ("jun", 6),
    ("july", 7),
    ("julho", 7),
    ("jul", 7),
    ("august", 8),
    ("agosto", 8),
    ("aug", 8),
    ("ago", 8),
    ("september", 9),
    ("setembro", 9),
    ("sep", 9),
    ("sept", 9),
    ("set", 9),
    ("october", 10),
    ("outubro", 10),
    ("oct", 10),
    ("out", 10),
    ("november", 11),
    ("novembro", 11),
    ("nov", 11),
    ("december", 12),
    ("dezembro", 12),
    ("dec", 12),
    ("dez", 12),
];

const SEASON_START_MONTH: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonMonth {
    pub key: &'static str,
    pub number: u32,
    pub year: i32,
}

/// Month tables for one September..August season. Every component that needs
/// month names, month numbers or the year of a month takes one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonCalendar {
    start_year: i32,
}

impl SeasonCalendar {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Season that contains `date` (September onwards belongs to the season
    /// starting that year).
    pub fn containing(date: NaiveDate) -> Self {
        let year = if date.month() >= SEASON_START_MONTH {
            date.year()
        } else {
            date.year() - 1
        };
        Self::new(year)
    }

    pub fn current() -> Self {
        Self::containing(chrono::Local::now().date_naive())
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.start_year, self.start_year + 1)
    }

    pub fn months(&self) -> impl Iterator<Item = SeasonMonth> + '_ {
        SEASON_MONTHS.iter().map(|&(key, number)| SeasonMonth {
            key,
            number,
            year: self.year_for_month(number),
        })
    }

    pub fn year_for_month(&self, month: u32) -> i32 {
        if month >= SEASON_START_MONTH {
            self.start_year
        } else {
            self.start_year + 1
        }
    }

    pub fn bucket_key(&self, month: u32) -> Option<&'static str> {
        SEASON_MONTHS
            .iter()
            .find(|(_, number)| *number == month)
            .map(|(key, _)| *key)
    }

    pub fn is_bucket_key(&self, key: &str) -> bool {
        SEASON_MONTHS.iter().any(|(k, _)| *k == key)
    }

    /// Looks a localized month name up, ignoring case, accents and a trailing dot.
    pub fn month_from_name(&self, name: &str) -> Option<u32> {
        let folded = fold_ascii(name.trim().trim_end_matches('.'));
        if folded.is_empty() {
            return None;
        }
        MONTH_ALIASES
            .iter()
            .find(|(alias, _)| *alias == folded)
            .map(|(_, month)| *month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_run_september_to_august() {
        let cal = SeasonCalendar::new(2025);
        let months: Vec<_> = cal.months().collect();
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].key, "september");
        assert_eq!(months[0].year, 2025);
        assert_eq!(months[11].key, "august");
        assert_eq!(months[11].year, 2026);
        assert_eq!(cal.label(), "2025/2026");
    }

    #[test]
    fn containing_switches_in_september() {
        let aug = NaiveDate::from_ymd_opt(2026, 8, 31).unwrap();
        let sep = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert_eq!(SeasonCalendar::containing(aug).start_year(), 2025);
        assert_eq!(SeasonCalendar::containing(sep).start_year(), 2026);
    }

    #[test]
    fn month_names_are_localized_and_accent_insensitive() {
        let cal = SeasonCalendar::new(2025);
        assert_eq!(cal.month_from_name("Outubro"), Some(10));
        assert_eq!(cal.month_from_name("October"), Some(10));
        assert_eq!(cal.month_from_name("out."), Some(10));
        assert_eq!(cal.month_from_name("Março"), Some(3));
        assert_eq!(cal.month_from_name("FEV"), Some(2));
        assert_eq!(cal.month_from_name("Brumaire"), None);
    }
}
