//! Calendar-aware time-reference units
//!
//! A time-reference unit is an interval counted from an origin epoch under a
//! named calendar, e.g. `hours since 1970-01-01 00:00:00` on the `gregorian`
//! calendar. This module parses such units, decomposes values into calendar
//! fields, and converts values between units while preserving the instant
//! they represent.
//!
//! Day arithmetic is done on a per-calendar day number counted from
//! `0001-01-01`. Gregorian-family calendars are treated proleptically, so
//! `gregorian`, `standard` and `proleptic_gregorian` are interchangeable.

use crate::errors::{CubeHelperError, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Supported CF calendars
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Calendar {
    /// `gregorian` / `standard`
    Gregorian,
    ProlepticGregorian,
    Julian,
    /// `noleap` / `365_day`
    NoLeap,
    /// `all_leap` / `366_day`
    AllLeap,
    /// `360_day`: twelve months of thirty days
    Day360,
}

impl Calendar {
    /// Canonical CF name of the calendar
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gregorian => "gregorian",
            Self::ProlepticGregorian => "proleptic_gregorian",
            Self::Julian => "julian",
            Self::NoLeap => "365_day",
            Self::AllLeap => "366_day",
            Self::Day360 => "360_day",
        }
    }

    #[must_use]
    pub const fn is_gregorian_family(self) -> bool {
        matches!(self, Self::Gregorian | Self::ProlepticGregorian)
    }

    /// Whether values on this calendar can be re-expressed on `other`
    #[must_use]
    pub fn is_compatible(self, other: Self) -> bool {
        self == other || (self.is_gregorian_family() && other.is_gregorian_family())
    }

    #[must_use]
    pub fn is_leap_year(self, year: i32) -> bool {
        match self {
            Self::Gregorian | Self::ProlepticGregorian => {
                (year.rem_euclid(4) == 0 && year.rem_euclid(100) != 0) || year.rem_euclid(400) == 0
            }
            Self::Julian => year.rem_euclid(4) == 0,
            Self::AllLeap => true,
            Self::NoLeap | Self::Day360 => false,
        }
    }

    #[must_use]
    pub fn days_in_month(self, year: i32, month: u32) -> u32 {
        if self == Self::Day360 {
            return 30;
        }
        match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 if self.is_leap_year(year) => 29,
            2 => 28,
            _ => 0,
        }
    }

    fn days_before_month(self, year: i32, month: u32) -> i64 {
        (1..month)
            .map(|m| i64::from(self.days_in_month(year, m)))
            .sum()
    }

    /// Days elapsed between `0001-01-01` and the given date on this calendar.
    ///
    /// Linear in `day`, so a day past the end of its month rolls forward.
    #[must_use]
    pub fn day_number(self, year: i32, month: u32, day: u32) -> i64 {
        let y = i64::from(year) - 1;
        let before_year = match self {
            Self::Gregorian | Self::ProlepticGregorian => {
                365 * y + y.div_euclid(4) - y.div_euclid(100) + y.div_euclid(400)
            }
            Self::Julian => 365 * y + y.div_euclid(4),
            Self::NoLeap => 365 * y,
            Self::AllLeap => 366 * y,
            Self::Day360 => 360 * y,
        };
        before_year + self.days_before_month(year, month) + i64::from(day) - 1
    }

    /// Inverse of [`Calendar::day_number`]
    pub fn date_from_day_number(self, days: i64) -> Result<(i32, u32, u32)> {
        let out_of_range = || CubeHelperError::InvalidUnit {
            unit: self.as_str().to_string(),
            reason: format!("day number {days} is out of range"),
        };

        let (year, mut day_of_year) = match self {
            Self::Gregorian | Self::ProlepticGregorian => {
                let date = i32::try_from(days + 1)
                    .ok()
                    .and_then(NaiveDate::from_num_days_from_ce_opt)
                    .ok_or_else(out_of_range)?;
                return Ok((date.year(), date.month(), date.day()));
            }
            Self::Julian => {
                let cycle = days.div_euclid(1461);
                let rem = days.rem_euclid(1461);
                let year_in_cycle = (rem / 365).min(3);
                (cycle * 4 + year_in_cycle + 1, rem - year_in_cycle * 365)
            }
            Self::NoLeap => (days.div_euclid(365) + 1, days.rem_euclid(365)),
            Self::AllLeap => (days.div_euclid(366) + 1, days.rem_euclid(366)),
            Self::Day360 => (days.div_euclid(360) + 1, days.rem_euclid(360)),
        };
        let year = i32::try_from(year).map_err(|_| out_of_range())?;

        let mut month = 1;
        loop {
            let len = i64::from(self.days_in_month(year, month));
            if day_of_year < len || month == 12 {
                break;
            }
            day_of_year -= len;
            month += 1;
        }
        // day_of_year < 31 here
        Ok((year, month, day_of_year as u32 + 1))
    }
}

impl FromStr for Calendar {
    type Err = CubeHelperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gregorian" | "standard" => Ok(Self::Gregorian),
            "proleptic_gregorian" => Ok(Self::ProlepticGregorian),
            "julian" => Ok(Self::Julian),
            "noleap" | "no_leap" | "365_day" => Ok(Self::NoLeap),
            "all_leap" | "366_day" => Ok(Self::AllLeap),
            "360_day" => Ok(Self::Day360),
            other => Err(CubeHelperError::InvalidUnit {
                unit: other.to_string(),
                reason: "unrecognised calendar".to_string(),
            }),
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interval a time-reference unit counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeInterval {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeInterval {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Minutes => "minutes",
            Self::Hours => "hours",
            Self::Days => "days",
        }
    }

    /// Length of one interval in seconds
    #[must_use]
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => SECONDS_PER_MINUTE,
            Self::Hours => SECONDS_PER_HOUR,
            Self::Days => SECONDS_PER_DAY,
        }
    }
}

impl FromStr for TimeInterval {
    type Err = CubeHelperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => Ok(Self::Seconds),
            "minutes" | "minute" | "mins" | "min" => Ok(Self::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Ok(Self::Hours),
            "days" | "day" | "d" => Ok(Self::Days),
            other => Err(CubeHelperError::InvalidUnit {
                unit: other.to_string(),
                reason: "unsupported time interval".to_string(),
            }),
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A date and time resolved to whole seconds on a given calendar.
///
/// Ordering compares the calendar fields chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub calendar: Calendar,
}

impl CalendarDateTime {
    /// Build a validated date-time
    pub fn new(
        calendar: Calendar,
        (year, month, day): (i32, u32, u32),
        (hour, minute, second): (u32, u32, u32),
    ) -> Result<Self> {
        let valid = (1..=12).contains(&month)
            && day >= 1
            && day <= calendar.days_in_month(year, month)
            && hour < 24
            && minute < 60
            && second < 60;
        if !valid {
            return Err(CubeHelperError::InvalidUnit {
                unit: format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ),
                reason: format!("not a valid date-time on the {calendar} calendar"),
            });
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            calendar,
        })
    }

    /// Midnight on the given date
    pub fn ymd(calendar: Calendar, year: i32, month: u32, day: u32) -> Result<Self> {
        Self::new(calendar, (year, month, day), (0, 0, 0))
    }

    fn day_number(&self) -> i64 {
        self.calendar.day_number(self.year, self.month, self.day)
    }

    /// Seconds since `0001-01-01 00:00:00` on this date-time's calendar
    fn seconds_since_day_zero(&self) -> i64 {
        self.day_number() * SECONDS_PER_DAY
            + i64::from(self.hour) * SECONDS_PER_HOUR
            + i64::from(self.minute) * SECONDS_PER_MINUTE
            + i64::from(self.second)
    }

    /// 1-based ordinal day within the year
    #[must_use]
    pub fn day_of_year(&self) -> u32 {
        let first = self.calendar.day_number(self.year, 1, 1);
        // bounded by the year length
        (self.day_number() - first + 1) as u32
    }

    /// 0 = Monday .. 6 = Sunday.
    ///
    /// Non-gregorian calendars continue the week cycle from 1970-01-01
    /// being a Thursday.
    #[must_use]
    pub fn weekday_number(&self) -> u32 {
        let since_epoch = self.day_number() - self.calendar.day_number(1970, 1, 1);
        (since_epoch + 3).rem_euclid(7) as u32
    }

    /// Hours since 1970-01-01 00:00:00 on the proleptic gregorian axis.
    ///
    /// Fields are carried over as-is, so 360-day dates such as February 30
    /// land on the following gregorian days.
    #[must_use]
    pub fn gregorian_hours_since_epoch(&self) -> f64 {
        let greg = Calendar::ProlepticGregorian;
        let days = greg.day_number(self.year, self.month, self.day) - greg.day_number(1970, 1, 1);
        let seconds = days * SECONDS_PER_DAY
            + i64::from(self.hour) * SECONDS_PER_HOUR
            + i64::from(self.minute) * SECONDS_PER_MINUTE
            + i64::from(self.second);
        seconds as f64 / SECONDS_PER_HOUR as f64
    }
}

impl fmt::Display for CalendarDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

/// `<interval> since <origin>` on a calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeUnit {
    pub interval: TimeInterval,
    pub origin: CalendarDateTime,
}

impl TimeUnit {
    #[must_use]
    pub const fn new(interval: TimeInterval, origin: CalendarDateTime) -> Self {
        Self { interval, origin }
    }

    /// `hours since 1970-01-01 00:00:00`, gregorian: the common comparison unit
    #[must_use]
    pub const fn epoch_hours() -> Self {
        Self {
            interval: TimeInterval::Hours,
            origin: CalendarDateTime {
                year: 1970,
                month: 1,
                day: 1,
                hour: 0,
                minute: 0,
                second: 0,
                calendar: Calendar::Gregorian,
            },
        }
    }

    /// Parse a CF unit string such as `days since 1990-1-1` with its calendar name
    pub fn parse(unit: &str, calendar: &str) -> Result<Self> {
        let invalid = |reason: &str| CubeHelperError::InvalidUnit {
            unit: unit.to_string(),
            reason: reason.to_string(),
        };

        let calendar: Calendar = calendar.parse()?;
        let (interval, origin) = unit
            .trim()
            .split_once(" since ")
            .ok_or_else(|| invalid("expected '<interval> since <origin>'"))?;
        let interval: TimeInterval = interval.parse()?;
        let origin = parse_origin(origin.trim(), calendar)
            .ok_or_else(|| invalid("unparseable origin date"))?;
        let origin = CalendarDateTime::new(
            calendar,
            (origin.0, origin.1, origin.2),
            (origin.3, origin.4, origin.5),
        )?;

        Ok(Self { interval, origin })
    }

    #[must_use]
    pub const fn calendar(&self) -> Calendar {
        self.origin.calendar
    }

    /// The unit string without calendar, e.g. `hours since 1970-01-01 00:00:00`
    #[must_use]
    pub fn origin_string(&self) -> String {
        format!("{} since {}", self.interval, self.origin)
    }

    #[must_use]
    pub fn is_convertible_to(&self, target: &Self) -> bool {
        self.calendar().is_compatible(target.calendar())
    }

    /// Decompose a value in this unit into calendar fields
    pub fn num2date(&self, value: f64) -> Result<CalendarDateTime> {
        if !value.is_finite() {
            return Err(CubeHelperError::InvalidUnit {
                unit: self.to_string(),
                reason: format!("cannot decode non-finite value {value}"),
            });
        }
        let total = self.origin.seconds_since_day_zero() as f64
            + value * self.interval.seconds() as f64;
        let total = total.round() as i64;
        let days = total.div_euclid(SECONDS_PER_DAY);
        let secs = total.rem_euclid(SECONDS_PER_DAY);

        let (year, month, day) = self.calendar().date_from_day_number(days)?;
        Ok(CalendarDateTime {
            year,
            month,
            day,
            hour: (secs / SECONDS_PER_HOUR) as u32,
            minute: (secs % SECONDS_PER_HOUR / SECONDS_PER_MINUTE) as u32,
            second: (secs % SECONDS_PER_MINUTE) as u32,
            calendar: self.calendar(),
        })
    }

    /// Encode calendar fields as a value in this unit
    pub fn date2num(&self, date: &CalendarDateTime) -> Result<f64> {
        if !date.calendar.is_compatible(self.calendar()) {
            return Err(CubeHelperError::IncompatibleCalendar {
                from: date.calendar.to_string(),
                to: self.to_string(),
                context: format!("date {date}"),
            });
        }
        let delta = date.seconds_since_day_zero() - self.origin.seconds_since_day_zero();
        Ok(delta as f64 / self.interval.seconds() as f64)
    }

    /// Re-express `value` in `target`, preserving the represented instant
    pub fn convert(&self, value: f64, target: &Self) -> Result<f64> {
        if !self.is_convertible_to(target) {
            return Err(CubeHelperError::IncompatibleCalendar {
                from: self.to_string(),
                to: target.to_string(),
                context: "unit conversion".to_string(),
            });
        }
        let offset = self.origin.seconds_since_day_zero() - target.origin.seconds_since_day_zero();
        Ok((value * self.interval.seconds() as f64 + offset as f64)
            / target.interval.seconds() as f64)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.origin_string(), self.calendar())
    }
}

type RawDateTime = (i32, u32, u32, u32, u32, u32);

/// Accepts `Y-M-D`, optionally followed by ` H:M[:S[.f]]` or `TH:M:S`,
/// and an optional trailing `UTC`, `Z` or `+00:00`.
fn parse_origin(origin: &str, calendar: Calendar) -> Option<RawDateTime> {
    let origin = origin
        .trim_end_matches("UTC")
        .trim_end_matches('Z')
        .trim_end_matches("+00:00")
        .trim();
    let (date, time) = match origin.split_once(|c: char| c == ' ' || c == 'T') {
        Some((date, time)) => (date, Some(time.trim())),
        None => (origin, None),
    };

    let mut date_parts = date.splitn(3, '-');
    let year = date_parts.next()?.parse::<i32>().ok()?;
    let month = date_parts.next()?.parse::<u32>().ok()?;
    let day = date_parts.next().map_or(Some(1), |d| d.parse::<u32>().ok())?;

    let (hour, minute, second) = match time {
        Some(time) if !time.is_empty() => {
            let mut time_parts = time.splitn(3, ':');
            let hour = time_parts.next()?.parse::<u32>().ok()?;
            let minute = time_parts.next().map_or(Some(0), |m| m.parse::<u32>().ok())?;
            let second = time_parts
                .next()
                .map_or(Some(0.0), |s| s.parse::<f64>().ok())?;
            (hour, minute, second.floor() as u32)
        }
        _ => (0, 0, 0),
    };

    if day > calendar.days_in_month(year, month) {
        return None;
    }
    Some((year, month, day, hour, minute, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(s: &str, cal: &str) -> TimeUnit {
        TimeUnit::parse(s, cal).unwrap()
    }

    #[test]
    fn parses_cf_units() {
        let u = unit("hours since 1970-01-01 00:00:00", "gregorian");
        assert_eq!(u.interval, TimeInterval::Hours);
        assert_eq!(u.origin_string(), "hours since 1970-01-01 00:00:00");
        assert_eq!(u, TimeUnit::epoch_hours());

        let u = unit("days since 1990-1-1", "standard");
        assert_eq!(u.origin.year, 1990);
        assert_eq!(u.calendar(), Calendar::Gregorian);

        let u = unit("seconds since 2000-01-01T12:30:00Z", "proleptic_gregorian");
        assert_eq!((u.origin.hour, u.origin.minute), (12, 30));
    }

    #[test]
    fn rejects_bad_units() {
        assert!(TimeUnit::parse("hours", "gregorian").is_err());
        assert!(TimeUnit::parse("fortnights since 1970-01-01", "gregorian").is_err());
        assert!(TimeUnit::parse("hours since 1970-01-01", "martian").is_err());
        assert!(TimeUnit::parse("days since 2001-02-29", "gregorian").is_err());
        assert!(TimeUnit::parse("days since 2001-02-30", "360_day").is_ok());
    }

    #[test]
    fn decomposes_gregorian_values() {
        let dt = TimeUnit::epoch_hours().num2date(394_200.0).unwrap();
        assert_eq!((dt.year, dt.month, dt.day, dt.hour), (2014, 12, 21, 0));
        assert_eq!(dt.day_of_year(), 355);
        assert_eq!(dt.weekday_number(), 6);

        let monday = TimeUnit::epoch_hours().num2date(394_224.0).unwrap();
        assert_eq!(monday.weekday_number(), 0);
    }

    #[test]
    fn converts_between_epochs_and_back() {
        let from = TimeUnit::epoch_hours();
        let to = unit("days since 1980-01-01 00:00:00", "gregorian");
        let value = 394_218.0;

        let converted = from.convert(value, &to).unwrap();
        let back = to.convert(converted, &from).unwrap();
        assert!((back - value).abs() < 1e-9);
        assert_eq!(
            from.num2date(value).unwrap(),
            to.num2date(converted).unwrap()
        );
    }

    #[test]
    fn refuses_incompatible_calendars() {
        let greg = TimeUnit::epoch_hours();
        let d360 = unit("hours since 1970-01-01", "360_day");
        assert!(matches!(
            greg.convert(1.0, &d360),
            Err(CubeHelperError::IncompatibleCalendar { .. })
        ));
        let proleptic = unit("hours since 1970-01-01", "proleptic_gregorian");
        assert_eq!(greg.convert(5.0, &proleptic).unwrap(), 5.0);
    }

    #[test]
    fn day_numbers_round_trip_on_every_calendar() {
        for cal in [
            Calendar::Gregorian,
            Calendar::Julian,
            Calendar::NoLeap,
            Calendar::AllLeap,
            Calendar::Day360,
        ] {
            for (y, m, d) in [(1, 1, 1), (1600, 2, 28), (2000, 12, 30), (2014, 6, 15)] {
                let n = cal.day_number(y, m, d);
                assert_eq!(cal.date_from_day_number(n).unwrap(), (y, m, d), "{cal}");
            }
        }
        assert_eq!(
            Calendar::Julian.date_from_day_number(Calendar::Julian.day_number(4, 12, 31)).unwrap(),
            (4, 12, 31)
        );
    }

    #[test]
    fn day_360_calendar_arithmetic() {
        let u = unit("days since 2000-01-01", "360_day");
        let dt = u.num2date(59.0).unwrap();
        assert_eq!((dt.month, dt.day), (2, 30));
        assert_eq!(u.num2date(360.0).unwrap().year, 2001);
        assert_eq!(u.date2num(&dt).unwrap(), 59.0);
    }
}
