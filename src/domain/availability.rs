//! Recurring weekly availability of a trainer.
//!
//! One optional open window per weekday. Raw `"HH:MM-HH:MM"` strings are parsed
//! here once, at the boundary; the slot enumerator only sees checked windows.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};
use std::fmt;
use std::str::FromStr;

use super::errors::Rejection;

/// Weekdays in storage order (Monday = 0).
pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Open interval `[start, end)` within a single day. Always `start < end`.
///
/// An end of `None` is midnight at the close of the day, written `24:00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityWindow {
    start: NaiveTime,
    end: Option<NaiveTime>,
}

impl AvailabilityWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self {
            start,
            end: Some(end),
        })
    }

    /// Window from `start` to the end of the day.
    pub fn until_midnight(start: NaiveTime) -> Self {
        Self { start, end: None }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    /// `None` when the window runs to midnight.
    pub fn end(&self) -> Option<NaiveTime> {
        self.end
    }

    pub fn length(&self) -> Duration {
        match self.end {
            Some(end) => end.signed_duration_since(self.start),
            None => {
                let elapsed = i64::from(self.start.num_seconds_from_midnight());
                Duration::days(1) - Duration::seconds(elapsed)
            }
        }
    }
}

impl fmt::Display for AvailabilityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start.format("%H:%M"), end.format("%H:%M")),
            None => write!(f, "{}-24:00", self.start.format("%H:%M")),
        }
    }
}

impl FromStr for AvailabilityWindow {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Rejection::MalformedAvailability(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start = parse_time_of_day(start).ok_or_else(malformed)?;
        if is_end_of_day(end) {
            return Ok(Self::until_midnight(start));
        }
        let end = parse_time_of_day(end).ok_or_else(malformed)?;
        Self::new(start, end).ok_or_else(malformed)
    }
}

fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

fn is_end_of_day(raw: &str) -> bool {
    matches!(raw.trim(), "24:00" | "24:00:00")
}

/// Weekday → optional window. An absent weekday means unavailable all day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeeklyAvailability {
    days: [Option<AvailabilityWindow>; 7],
}

impl WeeklyAvailability {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, day: Weekday, window: AvailabilityWindow) -> Self {
        self.set(day, Some(window));
        self
    }

    pub fn set(&mut self, day: Weekday, window: Option<AvailabilityWindow>) {
        self.days[day.num_days_from_monday() as usize] = window;
    }

    pub fn window_for(&self, day: Weekday) -> Option<AvailabilityWindow> {
        self.days[day.num_days_from_monday() as usize]
    }

    /// Window that applies on a concrete calendar date.
    pub fn on(&self, date: NaiveDate) -> Option<AvailabilityWindow> {
        self.window_for(date.weekday())
    }

    /// Days that have a window, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = (Weekday, AvailabilityWindow)> + '_ {
        WEEK.iter()
            .zip(self.days.iter())
            .filter_map(|(day, w)| w.map(|w| (*day, w)))
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(Option::is_none)
    }

    /// Parse raw per-day strings leniently. Malformed entries leave that day
    /// unavailable and are returned so the caller can report them; empty
    /// strings simply mean "no availability".
    pub fn parse_lenient<I, S>(entries: I) -> (Self, Vec<(Weekday, Rejection)>)
    where
        I: IntoIterator<Item = (Weekday, S)>,
        S: AsRef<str>,
    {
        let mut availability = Self::new();
        let mut rejected = Vec::new();
        for (day, raw) in entries {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<AvailabilityWindow>() {
                Ok(window) => availability.set(day, Some(window)),
                Err(e) => rejected.push((day, e)),
            }
        }
        (availability, rejected)
    }
}

/// Parse a weekday name as stored by the roster (`"monday"`, `"Mon"`, ...).
pub fn parse_weekday(raw: &str) -> Option<Weekday> {
    raw.trim().parse::<Weekday>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_parse_window() {
        let w: AvailabilityWindow = "09:00-17:00".parse().unwrap();
        assert_eq!(w.start(), t(9, 0));
        assert_eq!(w.end(), Some(t(17, 0)));
        assert_eq!(w.to_string(), "09:00-17:00");

        let w: AvailabilityWindow = " 07:30:00 - 12:00 ".parse().unwrap();
        assert_eq!(w.start(), t(7, 30));
    }

    #[test]
    fn test_parse_window_until_midnight() {
        let w: AvailabilityWindow = "22:00-24:00".parse().unwrap();
        assert_eq!(w.start(), t(22, 0));
        assert_eq!(w.end(), None);
        assert_eq!(w.length(), Duration::hours(2));
        assert_eq!(w.to_string(), "22:00-24:00");
        assert_eq!(w.to_string().parse::<AvailabilityWindow>().unwrap(), w);

        let all_day: AvailabilityWindow = "00:00-24:00:00".parse().unwrap();
        assert_eq!(all_day.length(), Duration::days(1));
    }

    #[test]
    fn test_parse_window_malformed() {
        for raw in [
            "0900 1700",
            "09:00",
            "nine-five",
            "17:00-09:00",
            "10:00-10:00",
            "24:00-24:00",
            "22:00-25:00",
        ] {
            let err = raw.parse::<AvailabilityWindow>().unwrap_err();
            assert_eq!(err.code(), "malformed-availability", "{raw}");
        }
    }

    #[test]
    fn test_parse_lenient_drops_bad_days() {
        let (weekly, rejected) = WeeklyAvailability::parse_lenient([
            (Weekday::Mon, "09:00-11:00"),
            (Weekday::Tue, "broken"),
            (Weekday::Wed, ""),
        ]);
        assert_eq!(weekly.window_for(Weekday::Mon), Some("09:00-11:00".parse().unwrap()));
        assert_eq!(weekly.window_for(Weekday::Tue), None);
        assert_eq!(weekly.window_for(Weekday::Wed), None);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, Weekday::Tue);
        assert_eq!(weekly.iter().count(), 1);
    }

    #[test]
    fn test_on_date_uses_weekday() {
        let weekly = WeeklyAvailability::new().with(Weekday::Fri, "06:00-08:00".parse().unwrap());
        // 2024-05-10 is a Friday.
        let fri = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(weekly.on(fri).is_some());
        assert!(weekly.on(fri.succ_opt().unwrap()).is_none());
    }

    #[test]
    fn test_parse_weekday() {
        assert_eq!(parse_weekday("monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("Sun"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("someday"), None);
    }
}
