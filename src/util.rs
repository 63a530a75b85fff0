use chrono::{DateTime, Utc};

const MS_PER_MINUTE: i64 = 1000 * 60;
const MS_PER_DAY: i64 = MS_PER_MINUTE * 60 * 24;
const MS_PER_YEAR: i64 = MS_PER_DAY * 365;
const MS_PER_MONTH: i64 = MS_PER_YEAR / 12;

/// English relative time ("3 minutes ago", "yesterday", "last month").
///
/// Dates in the future count as now.
pub fn time_ago(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = (now - date).num_milliseconds().max(0);

    let minutes = elapsed / MS_PER_MINUTE;
    if minutes < 60 {
        return relative(minutes, "minute", "this minute", None);
    }

    let days = elapsed / MS_PER_DAY;
    if days < 30 {
        return relative(days, "day", "today", Some("yesterday"));
    }

    let months = elapsed / MS_PER_MONTH;
    if months < 12 {
        return relative(months, "month", "this month", Some("last month"));
    }

    let years = elapsed / MS_PER_YEAR;
    relative(years, "year", "this year", Some("last year"))
}

fn relative(amount: i64, unit: &str, zero: &str, one: Option<&str>) -> String {
    match (amount, one) {
        (0, _) => zero.to_string(),
        (1, Some(one)) => one.to_string(),
        (1, None) => format!("1 {} ago", unit),
        (n, _) => format!("{} {}s ago", n, unit),
    }
}

/// Parses a registry timestamp and describes it relative to now.
pub fn published_ago(created_at: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(created_at)
        .ok()
        .map(|date| time_ago(date.with_timezone(&Utc), Utc::now()))
}

/// Absolute URL of a page on the public site.
pub fn canonical_href(site_url: &str, path: &str) -> String {
    format!("{}{}", site_url, path)
}

/// Whether `version` starts with a semantic version
/// (`MAJOR.MINOR.PATCH`, optionally followed by `-pre` and `+build`).
///
/// Only the prefix is checked; anything after a valid version is accepted.
pub fn is_semantic_version(version: &str) -> bool {
    let mut rest = version;
    for i in 0..3 {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        if i < 2 {
            match rest.strip_prefix('.') {
                Some(r) => rest = r,
                None => return false,
            }
        }
    }
    true
}
