//! Clock & Calendar: the only source of "now" for the core, and business-hours
//! / holiday classification.

use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveTime, Timelike};

use crate::types::{BusinessWindow, Timestamp, Weekday};

/// Supplies the current instant. Production code uses `SystemClock`; tests
/// substitute a fake advancing clock so scheduler and policy tests are
/// deterministic.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Real wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

/// A clock that returns a fixed instant until explicitly advanced. Used by
/// tests to exercise the Policy Engine and Lifecycle Scheduler deterministically.
#[derive(Debug)]
pub struct FixedClock {
    current: std::sync::Mutex<Timestamp>,
}

impl FixedClock {
    pub fn new(at: Timestamp) -> Self {
        Self { current: std::sync::Mutex::new(at) }
    }

    pub fn set(&self, at: Timestamp) {
        *self.current.lock().unwrap() = at;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.current.lock().unwrap();
        *guard = *guard + delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap()
    }
}

/// Classification of an instant against the business calendar.
#[derive(Debug, Clone, Copy)]
pub struct DayClassification {
    pub weekday: Weekday,
    pub local_time: NaiveTime,
    pub is_holiday: bool,
}

/// Holiday set (month, day pairs) and per-weekday open/close windows.
///
/// Defaults to the Brazilian federal calendar, matching the institution this
/// subsystem was modeled on; both are overridable via configuration
/// (`HOLIDAYS`, `BUSINESS_HOURS`).
#[derive(Debug, Clone)]
pub struct Calendar {
    holidays: HashSet<(u32, u32)>,
    hours: HashMap<Weekday, BusinessWindow>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self::brazilian_federal()
    }
}

impl Calendar {
    /// The default Brazilian federal holiday calendar and Mon-Fri 07:00-22:00,
    /// Sat 08:00-18:00, Sun-closed business hours.
    pub fn brazilian_federal() -> Self {
        let holidays = [
            (1, 1),   // New Year's Day
            (4, 21),  // Tiradentes
            (5, 1),   // Labor Day
            (9, 7),   // Independence Day
            (10, 12), // Our Lady of Aparecida
            (11, 2),  // All Souls' Day
            (11, 15), // Republic Proclamation Day
            (12, 25), // Christmas
        ]
        .into_iter()
        .collect();

        let mut hours = HashMap::new();
        let weekday_window = BusinessWindow {
            open: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
        };
        for day in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            hours.insert(day, weekday_window);
        }
        hours.insert(
            Weekday::Sat,
            BusinessWindow {
                open: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                close: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            },
        );
        // Sunday has no entry: closed all day.

        Self { holidays, hours }
    }

    pub fn with_holidays(mut self, holidays: HashSet<(u32, u32)>) -> Self {
        self.holidays = holidays;
        self
    }

    pub fn with_hours(mut self, hours: HashMap<Weekday, BusinessWindow>) -> Self {
        self.hours = hours;
        self
    }

    /// Builds a calendar from configuration-sourced strings, falling back to
    /// the Brazilian federal defaults for whichever side is `None`.
    ///
    /// `holidays` is a comma-separated list of `MM-DD` pairs, e.g.
    /// `"01-01,04-21"`. `business_hours` is a comma-separated list of
    /// `DAY:HH:MM-HH:MM` entries, e.g. `"MON:07:00-22:00,SAT:08:00-18:00"`;
    /// a day with no entry is closed all day. Malformed entries are skipped.
    pub fn from_config(holidays: Option<&str>, business_hours: Option<&str>) -> Self {
        let mut cal = Self::brazilian_federal();

        if let Some(raw) = holidays {
            let parsed: HashSet<(u32, u32)> = raw
                .split(',')
                .filter_map(|entry| {
                    let (m, d) = entry.trim().split_once('-')?;
                    Some((m.parse().ok()?, d.parse().ok()?))
                })
                .collect();
            if !parsed.is_empty() {
                cal = cal.with_holidays(parsed);
            }
        }

        if let Some(raw) = business_hours {
            let mut hours = HashMap::new();
            for entry in raw.split(',') {
                let entry = entry.trim();
                let Some((day, window)) = entry.split_once(':') else { continue };
                let Some((open, close)) = window.split_once('-') else { continue };
                let (Some(weekday), Some(open), Some(close)) =
                    (parse_weekday(day), parse_time(open), parse_time(close))
                else {
                    continue;
                };
                hours.insert(weekday, BusinessWindow { open, close });
            }
            if !hours.is_empty() {
                cal = cal.with_hours(hours);
            }
        }

        cal
    }

    pub fn classify(&self, instant: Timestamp) -> DayClassification {
        let weekday: Weekday = instant.weekday().into();
        let is_holiday = self.holidays.contains(&(instant.month(), instant.day()));
        let local_time = NaiveTime::from_hms_opt(instant.hour(), instant.minute(), instant.second())
            .unwrap_or_default();
        DayClassification { weekday, local_time, is_holiday }
    }

    pub fn window_for(&self, weekday: Weekday) -> Option<BusinessWindow> {
        self.hours.get(&weekday).copied()
    }

    /// True if `instant` falls within an open business window and is not a holiday.
    pub fn is_open(&self, instant: Timestamp) -> bool {
        let c = self.classify(instant);
        if c.is_holiday {
            return false;
        }
        match self.window_for(c.weekday) {
            Some(w) => c.local_time >= w.open && c.local_time < w.close,
            None => false,
        }
    }
}

fn parse_weekday(s: &str) -> Option<Weekday> {
    match s.to_ascii_uppercase().as_str() {
        "MON" => Some(Weekday::Mon),
        "TUE" => Some(Weekday::Tue),
        "WED" => Some(Weekday::Wed),
        "THU" => Some(Weekday::Thu),
        "FRI" => Some(Weekday::Fri),
        "SAT" => Some(Weekday::Sat),
        "SUN" => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn classifies_weekday_and_holiday() {
        let cal = Calendar::brazilian_federal();
        let new_years = chrono::Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let c = cal.classify(new_years);
        assert!(c.is_holiday);

        let tuesday = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let c = cal.classify(tuesday);
        assert_eq!(c.weekday, Weekday::Tue);
        assert!(!c.is_holiday);
    }

    #[test]
    fn sunday_is_closed_all_day() {
        let cal = Calendar::brazilian_federal();
        let sunday = chrono::Utc.with_ymd_and_hms(2025, 4, 13, 12, 0, 0).unwrap();
        assert!(!cal.is_open(sunday));
    }

    #[test]
    fn from_config_parses_holidays_and_hours() {
        let cal = Calendar::from_config(Some("01-01,12-25"), Some("MON:09:00-17:00"));

        let new_years = chrono::Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        assert!(cal.classify(new_years).is_holiday);

        let tiradentes = chrono::Utc.with_ymd_and_hms(2025, 4, 21, 10, 0, 0).unwrap();
        assert!(!cal.classify(tiradentes).is_holiday);

        let monday = chrono::Utc.with_ymd_and_hms(2025, 4, 14, 10, 0, 0).unwrap();
        assert!(cal.is_open(monday));
        let monday_evening = chrono::Utc.with_ymd_and_hms(2025, 4, 14, 20, 0, 0).unwrap();
        assert!(!cal.is_open(monday_evening));

        let tuesday = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        assert!(!cal.is_open(tuesday));
    }

    #[test]
    fn from_config_falls_back_to_defaults_when_none() {
        let cal = Calendar::from_config(None, None);
        let sunday = chrono::Utc.with_ymd_and_hms(2025, 4, 13, 12, 0, 0).unwrap();
        assert!(!cal.is_open(sunday));
    }

    #[test]
    fn fixed_clock_advances() {
        let start = chrono::Utc.with_ymd_and_hms(2025, 4, 15, 10, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(chrono::Duration::hours(2));
        assert_eq!(clock.now(), start + chrono::Duration::hours(2));
    }
}
