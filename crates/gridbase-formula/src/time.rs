//! Calendar and timezone utilities shared by coercion and the
//! date-time functions.
//!
//! Formula date-times are instants (UTC internally). A timezone enters
//! in exactly two places: interpreting a naive datetime string, and
//! rendering or decomposing an instant into calendar parts. Format
//! strings use day.js-style tokens (`YYYY-MM-DD HH:mm`), translated
//! here to chrono's strftime dialect.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, LocalResult, Months, NaiveDate, NaiveDateTime,
    Offset, TimeZone as _, Utc,
};
use chrono_tz::Tz;

// === Timezone resolution ===

/// Either a named IANA zone or a fixed UTC offset.
///
/// Accepted spellings:
/// - IANA names: "America/New_York", "Europe/Berlin", "UTC"
/// - fixed offsets: "+01:00", "-05:30", "02:00" (sign optional)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timezone {
    Iana(Tz),
    Fixed(FixedOffset),
}

impl Default for Timezone {
    fn default() -> Self {
        Timezone::Iana(Tz::UTC)
    }
}

impl Timezone {
    pub fn utc() -> Self {
        Self::default()
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(tz) = s.parse::<Tz>() {
            return Some(Timezone::Iana(tz));
        }
        parse_fixed_offset(s).map(Timezone::Fixed)
    }

    /// View an instant in this zone, as a fixed-offset datetime.
    pub fn to_fixed(&self, dt: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Timezone::Iana(tz) => {
                let local = dt.with_timezone(tz);
                let offset = local.offset().fix();
                local.with_timezone(&offset)
            }
            Timezone::Fixed(offset) => dt.with_timezone(offset),
        }
    }

    /// Interpret a naive local datetime in this zone. Ambiguous wall
    /// times take the earlier reading; times inside a forward gap are
    /// pushed one hour later.
    pub fn from_local(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Timezone::Iana(tz) => match tz.from_local_datetime(&naive) {
                LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earlier, _) => Some(earlier.with_timezone(&Utc)),
                LocalResult::None => tz
                    .from_local_datetime(&(naive + Duration::hours(1)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc)),
            },
            Timezone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

fn parse_fixed_offset(s: &str) -> Option<FixedOffset> {
    let (negative, rest) = if let Some(r) = s.strip_prefix('-') {
        (true, r)
    } else if let Some(r) = s.strip_prefix('+') {
        (false, r)
    } else {
        (false, s)
    };

    let (hours_str, minutes_str) = rest.split_once(':')?;
    let hours: i32 = hours_str.parse().ok()?;
    let minutes: i32 = minutes_str.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    let total_seconds = (hours * 3600 + minutes * 60) * if negative { -1 } else { 1 };
    FixedOffset::east_opt(total_seconds)
}

// === Datetime parsing ===

/// Parse a datetime string into an instant. Strings carrying their own
/// offset are absolute; naive forms are read as wall time in `tz`.
///
/// Accepted shapes:
/// - "2024-01-15T10:30:00.000Z", "2024-01-15T10:30:00+08:00"
/// - "2024-01-15T10:30:00", "2024-01-15 10:30", "2024/01/15 10:30:00"
/// - "2024-01-15", "2024/01/15", "2024-01", "2024"
pub fn parse_datetime(s: &str, tz: Timezone) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return tz.from_local(naive);
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return tz.from_local(date.and_hms_opt(0, 0, 0)?);
        }
    }

    // Year-month and bare-year shorthands
    if s.len() == 7 && s.as_bytes()[4] == b'-' {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d") {
            return tz.from_local(date.and_hms_opt(0, 0, 0)?);
        }
    }
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{}-01-01", s), "%Y-%m-%d") {
            return tz.from_local(date.and_hms_opt(0, 0, 0)?);
        }
    }

    None
}

// === Format token translation ===

/// Translate a day.js-style format string into chrono's strftime
/// dialect. Unknown characters pass through, `[...]` quotes literals.
pub fn translate_format(format: &str) -> String {
    // Longest token first within each letter family
    const TOKENS: &[(&str, &str)] = &[
        ("YYYY", "%Y"),
        ("YY", "%y"),
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        ("M", "%-m"),
        ("DD", "%d"),
        ("D", "%-d"),
        ("dddd", "%A"),
        ("ddd", "%a"),
        ("dd", "%a"),
        ("d", "%w"),
        ("HH", "%H"),
        ("H", "%-H"),
        ("hh", "%I"),
        ("h", "%-I"),
        ("mm", "%M"),
        ("m", "%-M"),
        ("ss", "%S"),
        ("s", "%-S"),
        ("SSS", "%3f"),
        ("ZZ", "%z"),
        ("Z", "%:z"),
        ("A", "%p"),
        ("a", "%P"),
        ("X", "%s"),
    ];

    let mut out = String::with_capacity(format.len() + 8);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            match after.find(']') {
                Some(end) => {
                    push_literal(&mut out, &after[..end]);
                    rest = &after[end + 1..];
                }
                None => {
                    push_literal(&mut out, after);
                    rest = "";
                }
            }
            continue;
        }

        for (token, replacement) in TOKENS {
            if rest.starts_with(token) {
                out.push_str(replacement);
                rest = &rest[token.len()..];
                continue 'outer;
            }
        }

        let c = match rest.chars().next() {
            Some(c) => c,
            None => break,
        };
        push_literal(&mut out, &rest[..c.len_utf8()]);
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}

// === Interval units ===

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
}

/// Parse an interval unit. Full names are case-insensitive; the
/// single-letter abbreviations are case-sensitive, so `M` is month
/// while `m` is minute.
pub fn parse_time_unit(s: &str) -> Option<TimeUnit> {
    match s {
        "y" => return Some(TimeUnit::Year),
        "Q" => return Some(TimeUnit::Quarter),
        "M" => return Some(TimeUnit::Month),
        "w" => return Some(TimeUnit::Week),
        "d" => return Some(TimeUnit::Day),
        "h" => return Some(TimeUnit::Hour),
        "m" => return Some(TimeUnit::Minute),
        "s" => return Some(TimeUnit::Second),
        "ms" => return Some(TimeUnit::Millisecond),
        _ => {}
    }

    match s.to_ascii_lowercase().as_str() {
        "year" | "years" => Some(TimeUnit::Year),
        "quarter" | "quarters" => Some(TimeUnit::Quarter),
        "month" | "months" => Some(TimeUnit::Month),
        "week" | "weeks" => Some(TimeUnit::Week),
        "day" | "days" => Some(TimeUnit::Day),
        "hour" | "hours" => Some(TimeUnit::Hour),
        "minute" | "minutes" => Some(TimeUnit::Minute),
        "second" | "seconds" => Some(TimeUnit::Second),
        "millisecond" | "milliseconds" => Some(TimeUnit::Millisecond),
        _ => None,
    }
}

// === Interval arithmetic ===

/// Shift an instant by a count of units. Calendar units (year down to
/// day) move wall time in `tz`, so adding a day across a DST change
/// keeps the clock reading; sub-day units are exact durations.
/// Month-family additions clamp to the end of shorter months.
pub fn add_interval(
    dt: DateTime<Utc>,
    amount: f64,
    unit: TimeUnit,
    tz: Timezone,
) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Hour | TimeUnit::Minute | TimeUnit::Second | TimeUnit::Millisecond => {
            let factor = match unit {
                TimeUnit::Hour => 3_600_000.0,
                TimeUnit::Minute => 60_000.0,
                TimeUnit::Second => 1_000.0,
                _ => 1.0,
            };
            let millis = (amount * factor).trunc();
            if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
                return None;
            }
            dt.checked_add_signed(Duration::milliseconds(millis as i64))
        }
        TimeUnit::Day | TimeUnit::Week => {
            let step = if unit == TimeUnit::Week { 7.0 } else { 1.0 };
            let days = (amount * step).round();
            if !days.is_finite() || days.abs() > i32::MAX as f64 {
                return None;
            }
            let local = tz.to_fixed(dt).naive_local();
            let shifted = local.checked_add_signed(Duration::days(days as i64))?;
            tz.from_local(shifted)
        }
        TimeUnit::Month | TimeUnit::Quarter | TimeUnit::Year => {
            let step = match unit {
                TimeUnit::Year => 12.0,
                TimeUnit::Quarter => 3.0,
                _ => 1.0,
            };
            let months = (amount * step).trunc();
            if !months.is_finite() || months.abs() > i32::MAX as f64 {
                return None;
            }
            let local = tz.to_fixed(dt).naive_local();
            let shifted = add_months_naive(local, months as i64)?;
            tz.from_local(shifted)
        }
    }
}

fn add_months_naive(naive: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let magnitude = months.unsigned_abs().min(u32::MAX as u64) as u32;
    if months >= 0 {
        naive.checked_add_months(Months::new(magnitude))
    } else {
        naive.checked_sub_months(Months::new(magnitude))
    }
}

/// Count whole units between two instants, truncating toward zero.
/// Positive when `a` is later than `b`.
pub fn diff_interval(a: DateTime<Utc>, b: DateTime<Utc>, unit: TimeUnit, tz: Timezone) -> f64 {
    let millis = (a.timestamp_millis() - b.timestamp_millis()) as f64;

    match unit {
        TimeUnit::Millisecond => millis,
        TimeUnit::Second => abs_floor(millis / 1_000.0),
        TimeUnit::Minute => abs_floor(millis / 60_000.0),
        TimeUnit::Hour => abs_floor(millis / 3_600_000.0),
        TimeUnit::Day | TimeUnit::Week => {
            // Wall-time difference so DST transitions do not shave a day
            let local_a = tz.to_fixed(a).naive_local();
            let local_b = tz.to_fixed(b).naive_local();
            let wall_millis = (local_a - local_b).num_milliseconds() as f64;
            let days = wall_millis / 86_400_000.0;
            match unit {
                TimeUnit::Week => abs_floor(days / 7.0),
                _ => abs_floor(days),
            }
        }
        TimeUnit::Month | TimeUnit::Quarter | TimeUnit::Year => {
            let months = month_diff(tz.to_fixed(a).naive_local(), tz.to_fixed(b).naive_local());
            match unit {
                TimeUnit::Year => abs_floor(months / 12.0),
                TimeUnit::Quarter => abs_floor(months / 3.0),
                _ => abs_floor(months),
            }
        }
    }
}

fn abs_floor(n: f64) -> f64 {
    if n < 0.0 {
        n.ceil()
    } else {
        n.floor()
    }
}

/// Fractional month count between two wall times, anchored at the
/// earlier-day side so partial months scale against the actual month
/// length. Positive when `a` is later than `b`.
fn month_diff(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    if a.day() < b.day() {
        return -month_diff(b, a);
    }

    let whole = ((b.year() - a.year()) * 12) as i64 + (b.month() as i64 - a.month() as i64);
    let anchor = add_months_naive(a, whole).unwrap_or(a);

    let b_millis = b.and_utc().timestamp_millis() as f64;
    let anchor_millis = anchor.and_utc().timestamp_millis() as f64;
    let before_anchor = b_millis - anchor_millis < 0.0;

    let anchor2 = add_months_naive(a, whole + if before_anchor { -1 } else { 1 }).unwrap_or(a);
    let anchor2_millis = anchor2.and_utc().timestamp_millis() as f64;
    let denominator = if before_anchor {
        anchor_millis - anchor2_millis
    } else {
        anchor2_millis - anchor_millis
    };

    let adjust = if denominator == 0.0 {
        0.0
    } else {
        (b_millis - anchor_millis) / denominator
    };

    let result = -(whole as f64 + adjust);
    if result == 0.0 {
        0.0
    } else {
        result
    }
}
