//! Natural-language date and size expressions.
//!
//! Both parsers normalize to a single comparison against a timestamp or a
//! byte count. They never fail loudly: anything they do not fully recognize
//! yields `None`, which callers treat as "no constraint".
//!
//! Dates are compared as timestamps, so phrases about age are mirrored:
//! `< 7 days` (younger than a week) becomes `> now - 7d`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ast::{ComparisonOp, Constraint, DatePredicate, SizePredicate};

static OPERATOR_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(<=|>=|==|<|>|=)\s*(.+)$").unwrap());

/// `-30d`, `+7d`, `30d`, `2w`
static SHORTHAND_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])?(\d+)\s*([dwmy])$").unwrap());

/// `7 days`, `2 weeks`, `7d`
static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s*(h|hours?|d|days?|w|weeks?|m|months?|y|years?)$").unwrap()
});

/// `last 7 days`, `past month`
static LAST_N: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:last|past)\s+(?:(\d+)\s+)?(hours?|days?|weeks?|months?|years?)$").unwrap()
});

/// `since 2024`, `before march 2024`
static KEYWORD_POINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(since|after|before|until)\s+(.+)$").unwrap());

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([a-z]+)(?:\s+(\d{4}))?$").unwrap());

static SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(over|greater than|more than|larger than|under|less than|smaller than|below|at least|at most|>=|<=|>|<|=)\s*)?(\d+(?:\.\d+)?)\s*(b|bytes?|k|kb|m|mb|meg|g|gb|gig)?$",
    )
    .unwrap()
});

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Parse a date phrase against the current time
pub fn parse_date_expression(text: &str) -> Option<DatePredicate> {
    parse_date_expression_at(text, Utc::now())
}

/// Parse a date phrase against a fixed `now`
pub fn parse_date_expression_at(text: &str, now: DateTime<Utc>) -> Option<DatePredicate> {
    let text = text.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = OPERATOR_PREFIX.captures(&text) {
        let operator = ComparisonOp::from_symbol(&caps[1])?;
        let rest = caps[2].trim();
        if let Some(at) = parse_iso_timestamp(rest) {
            return Some(DatePredicate {
                operator,
                value: at,
            });
        }
        if let Some(start) = named_period_start(rest, now) {
            return Some(DatePredicate {
                operator,
                value: start,
            });
        }
        let span = parse_duration(rest)?;
        return Some(DatePredicate {
            operator: operator.invert(),
            value: now.checked_sub_signed(span)?,
        });
    }

    if let Some(caps) = SHORTHAND_OFFSET.captures(&text) {
        let amount: i64 = caps[2].parse().ok()?;
        let span = unit_duration(&caps[3], amount)?;
        let operator = match caps.get(1).map(|m| m.as_str()) {
            Some("+") => ComparisonOp::Lt,
            _ => ComparisonOp::Gt,
        };
        return Some(DatePredicate {
            operator,
            value: now.checked_sub_signed(span)?,
        });
    }

    if let Some(caps) = LAST_N.captures(&text) {
        let amount: i64 = match caps.get(1) {
            Some(n) => n.as_str().parse().ok()?,
            None => 1,
        };
        let span = unit_duration(&caps[2], amount)?;
        return Some(DatePredicate {
            operator: ComparisonOp::Gt,
            value: now.checked_sub_signed(span)?,
        });
    }

    if let Some(start) = named_period_start(&text, now) {
        return Some(DatePredicate {
            operator: ComparisonOp::Gte,
            value: start,
        });
    }

    let caps = KEYWORD_POINT.captures(&text)?;
    let operator = match &caps[1] {
        "since" => ComparisonOp::Gte,
        "after" => ComparisonOp::Gt,
        "before" => ComparisonOp::Lt,
        _ => ComparisonOp::Lte,
    };
    let value = parse_point(caps[2].trim(), now)?;
    Some(DatePredicate { operator, value })
}

/// Parse a size phrase
pub fn parse_size_expression(text: &str) -> Option<SizePredicate> {
    let text = text.trim().to_lowercase();
    let caps = SIZE.captures(&text)?;

    let operator = match caps.get(1).map(|m| m.as_str()) {
        None => ComparisonOp::Gte,
        Some("over" | "greater than" | "more than" | "larger than" | ">") => ComparisonOp::Gt,
        Some("under" | "less than" | "smaller than" | "below" | "<") => ComparisonOp::Lt,
        Some("at least" | ">=") => ComparisonOp::Gte,
        Some("at most" | "<=") => ComparisonOp::Lte,
        Some(_) => ComparisonOp::Eq,
    };

    let magnitude: f64 = caps[2].parse().ok()?;
    let multiplier: u64 = match caps.get(3).map(|m| m.as_str()) {
        None | Some("b" | "byte" | "bytes") => 1,
        Some("k" | "kb") => 1024,
        Some("m" | "mb" | "meg") => 1024 * 1024,
        Some(_) => 1024 * 1024 * 1024,
    };

    Some(SizePredicate {
        operator,
        bytes: (magnitude * multiplier as f64).floor() as u64,
    })
}

/// Date phrase as a fail-open constraint
pub fn date_constraint(text: &str) -> Constraint<DatePredicate> {
    Constraint::from_parsed(parse_date_expression(text))
}

/// Size phrase as a fail-open constraint
pub fn size_constraint(text: &str) -> Constraint<SizePredicate> {
    Constraint::from_parsed(parse_size_expression(text))
}

/// RFC 3339 timestamp, `YYYY-MM-DDTHH:MM:SS` (UTC) or a plain `YYYY-MM-DD`
pub fn parse_iso_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(start_of_day)
}

/// Whether `text` is a bare calendar date without a time part
pub fn is_date_only(text: &str) -> bool {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").is_ok()
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn parse_duration(text: &str) -> Option<Duration> {
    let caps = DURATION.captures(text)?;
    let amount: i64 = caps[1].parse().ok()?;
    unit_duration(&caps[2], amount)
}

/// Months count as 30 days, years as 365
fn unit_duration(unit: &str, amount: i64) -> Option<Duration> {
    let days = match unit.trim_end_matches('s') {
        "h" | "hour" => return Duration::try_hours(amount),
        "d" | "day" => amount,
        "w" | "week" => amount.checked_mul(7)?,
        "m" | "month" => amount.checked_mul(30)?,
        "y" | "year" => amount.checked_mul(365)?,
        _ => return None,
    };
    Duration::try_days(days)
}

fn named_period_start(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.date_naive();
    let date = match text {
        "today" => today,
        "yesterday" => today.pred_opt()?,
        "this week" => today.checked_sub_signed(Duration::days(
            today.weekday().num_days_from_monday() as i64,
        ))?,
        "this month" => today.with_day(1)?,
        "this year" => NaiveDate::from_ymd_opt(today.year(), 1, 1)?,
        _ => return None,
    };
    start_of_day(date)
}

/// A year, a month name with optional year, or an ISO date
fn parse_point(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if text.len() == 4 && text.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = text.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).and_then(start_of_day);
    }
    if let Some(at) = parse_iso_timestamp(text) {
        return Some(at);
    }

    let caps = MONTH_YEAR.captures(text)?;
    let month = month_number(&caps[1])?;
    let year = match caps.get(2) {
        Some(y) => y.as_str().parse().ok()?,
        None => now.year(),
    };
    NaiveDate::from_ymd_opt(year, month, 1).and_then(start_of_day)
}

/// `mar`, `march` and `sept` all resolve; fewer than three letters do not
fn month_number(word: &str) -> Option<u32> {
    if word.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|name| name.starts_with(word))
        .map(|idx| idx as u32 + 1)
}
