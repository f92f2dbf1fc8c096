//! Calendar arithmetic behind the `registry.dates.*` vocabulary.
//!
//! Pure functions over `chrono::NaiveDate`; every entry point takes the
//! reference date explicitly so behavior is deterministic under test.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::{ErrorKind, ParseError};

/// Resolve one keyword from the fixed date vocabulary against `today`.
pub fn resolve_date_key(key: &str, today: NaiveDate) -> Result<NaiveDate, ParseError> {
    let resolved = match key {
        "today" => today,
        "tomorrow" => add_days(today, 1),
        "next_week" => add_weeks(today, 1),
        "next_month" => add_months(today, 1),
        "first_of_this_month" => beginning_of_month(today),
        "first_of_next_month" => beginning_of_month(add_months(today, 1)),
        // Legacy aliases kept for existing documents.
        "monday_of_this_week" => beginning_of_week(today),
        "fifteenth_of_this_month" => add_days(beginning_of_month(today), 14),
        other => {
            if let Some(weekday) = other.strip_prefix("next_").and_then(parse_weekday) {
                next_occurring(today, weekday)
            } else if let Some(weekday) = other.strip_prefix("this_week_").and_then(parse_weekday)
            {
                add_days(
                    beginning_of_week(today),
                    i64::from(weekday.num_days_from_monday()),
                )
            } else {
                return Err(unknown_date_key(key));
            }
        }
    };
    Ok(resolved)
}

/// The next strictly-future occurrence of `weekday`: if `today` already falls
/// on it, the result is a full week out, never `today` itself.
pub fn next_occurring(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let delta = (i64::from(weekday.num_days_from_monday())
        - i64::from(today.weekday().num_days_from_monday()))
    .rem_euclid(7);
    add_days(today, if delta == 0 { 7 } else { delta })
}

/// Monday of the week containing `today`; may lie in the past.
pub fn beginning_of_week(today: NaiveDate) -> NaiveDate {
    add_days(today, -i64::from(today.weekday().num_days_from_monday()))
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + chrono::Duration::days(days)
}

pub fn add_weeks(date: NaiveDate, weeks: i64) -> NaiveDate {
    add_days(date, weeks * 7)
}

/// Month arithmetic with day-of-month clamping: Jan 31 + 1 month is the last
/// valid day of February, not an overflow into March.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).expect("clamped day is always valid")
}

pub fn beginning_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).expect("first of month is always valid")
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .expect("month boundaries are always valid")
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

fn unknown_date_key(key: &str) -> ParseError {
    ParseError::new(
        ErrorKind::InvalidDateKey,
        format!("Unknown date key '{key}' in registry.dates.{key}."),
    )
    .with_suggestions([
        "Basic dates: today, tomorrow, next_week, next_month".to_string(),
        "Next weekdays: next_monday, next_tuesday, ..., next_sunday".to_string(),
        "This week: this_week_monday, this_week_tuesday, ..., this_week_sunday".to_string(),
        "Month dates: first_of_this_month, first_of_next_month".to_string(),
        "Legacy: monday_of_this_week, fifteenth_of_this_month".to_string(),
        "Example: registry.dates.next_friday".to_string(),
    ])
}
