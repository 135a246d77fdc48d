//! Date normalization for feed timestamps.
//!
//! Feeds in the wild disagree on how to write a date. RSS nominally uses
//! RFC 822 (in practice RFC 1123 with a numeric or named zone, sometimes with
//! an unpadded day), Atom uses RFC 3339, and a long tail of feeds emit bare
//! ISO timestamps or plain dates. [`parse_date`] tries a fixed table of
//! formats in order and returns the first match as a UTC instant.
//!
//! An unparseable date is not an error: it yields `None`, which the merge
//! stage sorts as the oldest possible instant.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};

/// Zone designator style of an RFC 1123 timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// `-0700`
    Numeric,
    /// `MST`, `GMT`, ...
    Named,
}

/// One entry of the date format table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateFormat {
    /// `Mon, 02 Jan 2006 15:04:05 -0700` and friends. `padded_day` selects
    /// between the two-digit and the single-digit day-of-month form.
    Rfc1123 { zone: Zone, padded_day: bool },
    /// `2006-01-02T15:04:05Z07:00`, fractional seconds optional.
    Rfc3339,
    /// `2006-01-02T15:04:05Z`
    ZuluTimestamp,
    /// `2006-01-02`, taken as midnight UTC.
    DateOnly,
}

/// Formats tried by [`parse_date`], in priority order. Order matters: some
/// formats accept prefixes of others.
const DATE_FORMATS: [DateFormat; 7] = [
    DateFormat::Rfc1123 {
        zone: Zone::Numeric,
        padded_day: true,
    },
    DateFormat::Rfc1123 {
        zone: Zone::Named,
        padded_day: true,
    },
    DateFormat::Rfc3339,
    DateFormat::Rfc1123 {
        zone: Zone::Numeric,
        padded_day: false,
    },
    DateFormat::Rfc1123 {
        zone: Zone::Named,
        padded_day: false,
    },
    DateFormat::ZuluTimestamp,
    DateFormat::DateOnly,
];

/// Output layout for RSS `pubDate`: RFC 1123 with a numeric zone.
const RFC1123_NUMERIC: &str = "%a, %d %b %Y %H:%M:%S %z";

impl DateFormat {
    fn parse(self, text: &str) -> Option<DateTime<Utc>> {
        match self {
            DateFormat::Rfc1123 { zone, padded_day } => parse_rfc1123(text, zone, padded_day),
            DateFormat::Rfc3339 => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateFormat::ZuluTimestamp => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%SZ")
                .ok()
                .map(|naive| naive.and_utc()),
            DateFormat::DateOnly => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc()),
        }
    }
}

/// Parses a free-form feed date into a UTC instant.
///
/// Surrounding whitespace is ignored. Returns `None` for empty input or when
/// no entry of the format table matches; callers treat that as "no date",
/// never as a failure.
///
/// # Examples
///
/// ```
/// use combine_rss_feeds::feed::parse_date;
///
/// assert!(parse_date("Mon, 02 Jan 2006 15:04:05 +0000").is_some());
/// assert!(parse_date("2024-03-01T10:00:00Z").is_some());
/// assert!(parse_date("not-a-date").is_none());
/// assert!(parse_date("").is_none());
/// ```
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let parsed = DATE_FORMATS
        .iter()
        .find_map(|format| format.parse(text));
    if parsed.is_none() {
        tracing::debug!(date = %text, "Unrecognized date format, treating as absent");
    }
    parsed
}

/// Formats an instant as an RSS `pubDate` (`Mon, 02 Jan 2006 15:04:05 +0000`).
pub fn format_rfc1123(instant: &DateTime<Utc>) -> String {
    instant.format(RFC1123_NUMERIC).to_string()
}

fn parse_rfc1123(text: &str, zone: Zone, padded_day: bool) -> Option<DateTime<Utc>> {
    // The weekday must be well-formed but is not checked against the date;
    // plenty of feeds get it wrong.
    let (weekday, rest) = text.split_once(", ")?;
    if weekday.len() != 3 || weekday.parse::<Weekday>().is_err() {
        return None;
    }

    let day = rest.split(' ').next()?;
    let day_digits = if padded_day { 2 } else { 1 };
    if day.len() != day_digits {
        return None;
    }

    let (local, designator) = rest.rsplit_once(' ')?;
    let offset = match zone {
        Zone::Numeric => numeric_zone_offset(designator)?,
        Zone::Named if is_zone_abbreviation(designator) => FixedOffset::east_opt(0)?,
        Zone::Named => return None,
    };
    let naive = NaiveDateTime::parse_from_str(local, "%d %b %Y %H:%M:%S").ok()?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses a strict `+hhmm` / `-hhmm` designator. The colon form is rejected.
fn numeric_zone_offset(designator: &str) -> Option<FixedOffset> {
    let (sign, digits) = match designator.as_bytes().first()? {
        b'+' => (1, &designator[1..]),
        b'-' => (-1, &designator[1..]),
        _ => return None,
    };
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Named zones are accepted but carry no offset: `15:04:05 EST` is read as
/// `15:04:05Z`, the same as `GMT`.
fn is_zone_abbreviation(designator: &str) -> bool {
    designator == "Z"
        || designator == "UT"
        || ((3..=5).contains(&designator.len())
            && designator.chars().all(|c| c.is_ascii_alphabetic()))
}
