//! Date and time functions
//!
//! Arguments arrive as instants, strings or epoch milliseconds; every
//! function resolves them through [`datetime_arg`] and operates in the
//! call timezone. A null or unparseable date argument yields null.

use ahash::AHashSet;
use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone as _, Timelike, Utc, Weekday,
};

use gridbase_core::CellValue;

use crate::error::{FormulaError, FormulaResult};
use crate::functions::{number_arg, string_arg, FuncContext};
use crate::time::{
    add_interval, diff_interval, parse_datetime, parse_time_unit, translate_format, TimeUnit,
    Timezone,
};
use crate::value::TypedValue;

// Calendar walks longer than this yield null
const MAX_WORKDAY_SPAN: i64 = 1_000_000;

/// Resolve one argument to an instant: datetimes pass through, strings
/// are parsed in the call timezone, numbers read as epoch milliseconds.
fn datetime_arg(
    params: &[TypedValue],
    index: usize,
    ctx: &FuncContext<'_>,
) -> Option<DateTime<Utc>> {
    match params.get(index).map(|p| &p.value) {
        Some(CellValue::DateTime(dt)) => Some(*dt),
        Some(CellValue::String(s)) => parse_datetime(s, ctx.timezone),
        Some(CellValue::Number(n)) => epoch_millis(*n),
        _ => None,
    }
}

fn epoch_millis(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt(n.trunc() as i64).single()
}

fn unit_arg(params: &[TypedValue], index: usize, name: &str) -> FormulaResult<TimeUnit> {
    let raw = string_arg(params, index)
        .ok_or_else(|| FormulaError::param(name, "missing unit argument"))?;
    parse_time_unit(raw.trim())
        .ok_or_else(|| FormulaError::param(name, format!("unknown unit '{}'", raw.trim())))
}

fn datetime_result(dt: Option<DateTime<Utc>>) -> FormulaResult<CellValue> {
    Ok(match dt {
        Some(dt) => CellValue::DateTime(dt),
        None => CellValue::Null,
    })
}

/// Apply `f` to the argument's wall-time view in the call timezone
fn map_local(
    params: &[TypedValue],
    ctx: &FuncContext<'_>,
    f: impl FnOnce(NaiveDateTime) -> f64,
) -> FormulaResult<CellValue> {
    match datetime_arg(params, 0, ctx) {
        Some(dt) => Ok(CellValue::Number(f(ctx.timezone.to_fixed(dt).naive_local()))),
        None => Ok(CellValue::Null),
    }
}

/// TODAY - midnight of the current date in the call timezone
pub fn fn_today(_params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let date = ctx.timezone.to_fixed(ctx.now).date_naive();
    let midnight = date.and_hms_opt(0, 0, 0).and_then(|naive| ctx.timezone.from_local(naive));
    datetime_result(midnight)
}

/// NOW - the evaluation instant, shared by every call in one formula
pub fn fn_now(_params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    Ok(CellValue::DateTime(ctx.now))
}

/// TONOW - whole units between a date and the evaluation instant
pub fn fn_tonow(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let date = match datetime_arg(params, 0, ctx) {
        Some(d) => d,
        None => return Ok(CellValue::Null),
    };
    let unit = unit_arg(params, 1, "TONOW")?;
    Ok(CellValue::Number(
        diff_interval(ctx.now, date, unit, ctx.timezone).abs(),
    ))
}

/// FROMNOW - same magnitude as TONOW
pub fn fn_fromnow(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let date = match datetime_arg(params, 0, ctx) {
        Some(d) => d,
        None => return Ok(CellValue::Null),
    };
    let unit = unit_arg(params, 1, "FROMNOW")?;
    Ok(CellValue::Number(
        diff_interval(ctx.now, date, unit, ctx.timezone).abs(),
    ))
}

/// DATEADD - shift a date by a count of units
pub fn fn_dateadd(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let date = match datetime_arg(params, 0, ctx) {
        Some(d) => d,
        None => return Ok(CellValue::Null),
    };
    let amount = match number_arg(params, 1) {
        Some(n) => n,
        None => return Ok(CellValue::Null),
    };
    let unit = unit_arg(params, 2, "DATEADD")?;
    datetime_result(add_interval(date, amount, unit, ctx.timezone))
}

/// DATETIME_DIFF - whole units from the second date to the first,
/// truncated toward zero; the unit defaults to seconds
pub fn fn_datetime_diff(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let (a, b) = match (datetime_arg(params, 0, ctx), datetime_arg(params, 1, ctx)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(CellValue::Null),
    };
    let unit = if params.len() > 2 {
        unit_arg(params, 2, "DATETIME_DIFF")?
    } else {
        TimeUnit::Second
    };
    Ok(CellValue::Number(diff_interval(a, b, unit, ctx.timezone)))
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Comma-separated holiday list argument, as local dates
fn holiday_set(params: &[TypedValue], index: usize, ctx: &FuncContext<'_>) -> AHashSet<NaiveDate> {
    let mut holidays = AHashSet::new();
    if let Some(list) = string_arg(params, index) {
        for entry in list.split(',') {
            if let Some(dt) = parse_datetime(entry.trim(), ctx.timezone) {
                holidays.insert(ctx.timezone.to_fixed(dt).date_naive());
            }
        }
    }
    holidays
}

/// WORKDAY - the date a number of business days away, skipping
/// weekends and listed holidays. A holiday on the start date is
/// consumed up front by moving the walk origin one calendar day.
pub fn fn_workday(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let start = match datetime_arg(params, 0, ctx) {
        Some(d) => d,
        None => return Ok(CellValue::Null),
    };
    let days = match number_arg(params, 1) {
        Some(n) => n.trunc() as i64,
        None => return Ok(CellValue::Null),
    };
    if days.abs() > MAX_WORKDAY_SPAN {
        return Ok(CellValue::Null);
    }
    let holidays = holiday_set(params, 2, ctx);

    let local = ctx.timezone.to_fixed(start).naive_local();
    let direction = if days < 0 { -1 } else { 1 };
    let mut date = local.date();
    if holidays.contains(&date) {
        date += Duration::days(direction);
    }

    let mut remaining = days.unsigned_abs();
    while remaining > 0 {
        date += Duration::days(direction);
        if !is_weekend(date) && !holidays.contains(&date) {
            remaining -= 1;
        }
    }

    datetime_result(ctx.timezone.from_local(date.and_time(local.time())))
}

/// WORKDAY_DIFF - business days between two dates, counting both
/// endpoints; negative when the second date is earlier
pub fn fn_workday_diff(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let (a, b) = match (datetime_arg(params, 0, ctx), datetime_arg(params, 1, ctx)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(CellValue::Null),
    };
    let holidays = holiday_set(params, 2, ctx);

    let from = ctx.timezone.to_fixed(a).date_naive();
    let to = ctx.timezone.to_fixed(b).date_naive();
    let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
    if (hi - lo).num_days() > MAX_WORKDAY_SPAN {
        return Ok(CellValue::Null);
    }

    let mut count = 0i64;
    let mut date = lo;
    while date <= hi {
        if !is_weekend(date) && !holidays.contains(&date) {
            count += 1;
        }
        date += Duration::days(1);
    }
    let signed = if from <= to { count } else { -count };
    Ok(CellValue::Number(signed as f64))
}

/// DATETIME_FORMAT - render in the call timezone with day.js tokens;
/// the format defaults to `YYYY-MM-DD HH:mm`
pub fn fn_datetime_format(
    params: &[TypedValue],
    ctx: &FuncContext<'_>,
) -> FormulaResult<CellValue> {
    let date = match datetime_arg(params, 0, ctx) {
        Some(d) => d,
        None => return Ok(CellValue::Null),
    };
    let format = string_arg(params, 1).unwrap_or_else(|| "YYYY-MM-DD HH:mm".to_string());
    let local = ctx.timezone.to_fixed(date);
    Ok(CellValue::String(
        local.format(&translate_format(&format)).to_string(),
    ))
}

/// DATETIME_PARSE - read a string with day.js tokens, or any ISO-8601
/// shape when no format is given; numbers read as epoch milliseconds
pub fn fn_datetime_parse(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let parsed = match params.first().map(|p| &p.value) {
        Some(CellValue::DateTime(dt)) => Some(*dt),
        Some(CellValue::Number(n)) => epoch_millis(*n),
        Some(CellValue::String(s)) => match string_arg(params, 1) {
            Some(format) => parse_with_format(s, &format, ctx.timezone),
            None => parse_datetime(s, ctx.timezone),
        },
        _ => None,
    };
    datetime_result(parsed)
}

fn parse_with_format(s: &str, format: &str, tz: Timezone) -> Option<DateTime<Utc>> {
    let spec = translate_format(format);
    let s = s.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, &spec) {
        return tz.from_local(naive);
    }
    // Date-only formats leave the time to parse as midnight
    let date = NaiveDate::parse_from_str(s, &spec).ok()?;
    tz.from_local(date.and_hms_opt(0, 0, 0)?)
}

/// DATESTR - the local date as `YYYY-MM-DD`
pub fn fn_datestr(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match datetime_arg(params, 0, ctx) {
        Some(dt) => Ok(CellValue::String(
            ctx.timezone.to_fixed(dt).format("%Y-%m-%d").to_string(),
        )),
        None => Ok(CellValue::Null),
    }
}

/// TIMESTR - the local time as `HH:mm:ss`
pub fn fn_timestr(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match datetime_arg(params, 0, ctx) {
        Some(dt) => Ok(CellValue::String(
            ctx.timezone.to_fixed(dt).format("%H:%M:%S").to_string(),
        )),
        None => Ok(CellValue::Null),
    }
}

/// YEAR
pub fn fn_year(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_local(params, ctx, |local| local.year() as f64)
}

/// MONTH - 1 through 12
pub fn fn_month(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_local(params, ctx, |local| local.month() as f64)
}

/// DAY - day of the month
pub fn fn_day(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_local(params, ctx, |local| local.day() as f64)
}

/// HOUR - 0 through 23
pub fn fn_hour(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_local(params, ctx, |local| local.hour() as f64)
}

/// MINUTE
pub fn fn_minute(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_local(params, ctx, |local| local.minute() as f64)
}

/// SECOND
pub fn fn_second(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    map_local(params, ctx, |local| local.second() as f64)
}

/// Optional week-start argument: "Monday" selects Monday, anything
/// else keeps the Sunday default
fn week_start_arg(params: &[TypedValue], index: usize) -> Weekday {
    match string_arg(params, index) {
        Some(s) if s.trim().eq_ignore_ascii_case("monday") => Weekday::Mon,
        _ => Weekday::Sun,
    }
}

fn days_from_week_start(weekday: Weekday, start: Weekday) -> u32 {
    (weekday.num_days_from_sunday() + 7 - start.num_days_from_sunday()) % 7
}

/// WEEKNUM - week of the year, where the week containing January 1st
/// is week 1 and weeks start on Sunday unless the second argument says
/// Monday
pub fn fn_weeknum(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let start = week_start_arg(params, 1);
    map_local(params, ctx, |local| {
        let jan1 = NaiveDate::from_ymd_opt(local.year(), 1, 1);
        let offset = jan1.map_or(0, |d| days_from_week_start(d.weekday(), start));
        ((local.ordinal() - 1 + offset) / 7 + 1) as f64
    })
}

/// WEEKDAY - days since the start of the week, 0 through 6
pub fn fn_weekday(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let start = week_start_arg(params, 1);
    map_local(params, ctx, |local| {
        days_from_week_start(local.weekday(), start) as f64
    })
}

fn quarter(month: u32) -> u32 {
    (month - 1) / 3
}

fn week_anchor(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

fn same_in_unit(a: DateTime<Utc>, b: DateTime<Utc>, unit: TimeUnit, tz: Timezone) -> bool {
    let la = tz.to_fixed(a).naive_local();
    let lb = tz.to_fixed(b).naive_local();
    match unit {
        TimeUnit::Year => la.year() == lb.year(),
        TimeUnit::Quarter => la.year() == lb.year() && quarter(la.month()) == quarter(lb.month()),
        TimeUnit::Month => la.year() == lb.year() && la.month() == lb.month(),
        TimeUnit::Week => week_anchor(la.date()) == week_anchor(lb.date()),
        TimeUnit::Day => la.date() == lb.date(),
        TimeUnit::Hour => la.date() == lb.date() && la.hour() == lb.hour(),
        TimeUnit::Minute => {
            la.date() == lb.date() && la.hour() == lb.hour() && la.minute() == lb.minute()
        }
        TimeUnit::Second => la.with_nanosecond(0) == lb.with_nanosecond(0),
        TimeUnit::Millisecond => a == b,
    }
}

/// IS_SAME - equal instants, or equal at a unit granularity when the
/// third argument names one
pub fn fn_is_same(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    let (a, b) = match (datetime_arg(params, 0, ctx), datetime_arg(params, 1, ctx)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(CellValue::Null),
    };
    let unit = if params.len() > 2 {
        unit_arg(params, 2, "IS_SAME")?
    } else {
        TimeUnit::Millisecond
    };
    Ok(CellValue::Boolean(same_in_unit(a, b, unit, ctx.timezone)))
}

/// IS_BEFORE
pub fn fn_is_before(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match (datetime_arg(params, 0, ctx), datetime_arg(params, 1, ctx)) {
        (Some(a), Some(b)) => Ok(CellValue::Boolean(a < b)),
        _ => Ok(CellValue::Null),
    }
}

/// IS_AFTER
pub fn fn_is_after(params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match (datetime_arg(params, 0, ctx), datetime_arg(params, 1, ctx)) {
        (Some(a), Some(b)) => Ok(CellValue::Boolean(a > b)),
        _ => Ok(CellValue::Null),
    }
}

/// CREATED_TIME - null without a record or timestamp
pub fn fn_created_time(_params: &[TypedValue], ctx: &FuncContext<'_>) -> FormulaResult<CellValue> {
    match ctx.record.and_then(|r| r.created_time()) {
        Some(at) => Ok(CellValue::DateTime(at)),
        None => Ok(CellValue::Null),
    }
}

/// LAST_MODIFIED_TIME - null without a record or timestamp
pub fn fn_last_modified_time(
    _params: &[TypedValue],
    ctx: &FuncContext<'_>,
) -> FormulaResult<CellValue> {
    match ctx.record.and_then(|r| r.last_modified_time()) {
        Some(at) => Ok(CellValue::DateTime(at)),
        None => Ok(CellValue::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridbase_core::{CellValueType, Record};
    use pretty_assertions::assert_eq;

    fn ctx_at(now: &str, zone: &str) -> FuncContext<'static> {
        FuncContext {
            record: None,
            timezone: Timezone::parse(zone).unwrap(),
            now: now.parse().unwrap(),
        }
    }

    fn ctx() -> FuncContext<'static> {
        ctx_at("2024-03-15T17:30:00Z", "UTC")
    }

    fn text(s: &str) -> TypedValue {
        TypedValue::new(CellValue::String(s.into()), CellValueType::String)
    }

    fn num(n: f64) -> TypedValue {
        TypedValue::new(CellValue::Number(n), CellValueType::Number)
    }

    fn date_of(value: &CellValue, zone: &str) -> String {
        match value {
            CellValue::DateTime(dt) => Timezone::parse(zone)
                .unwrap()
                .to_fixed(*dt)
                .format("%Y-%m-%d")
                .to_string(),
            other => panic!("expected a datetime, got {other:?}"),
        }
    }

    #[test]
    fn test_today_is_local_midnight() {
        let ctx = ctx_at("2024-03-15T17:30:00Z", "America/New_York");
        let value = fn_today(&[], &ctx).unwrap();
        // 2024-03-15 00:00 in New York is 04:00 UTC under daylight time
        assert_eq!(
            value,
            CellValue::DateTime("2024-03-15T04:00:00Z".parse().unwrap())
        );
    }

    #[test]
    fn test_now_uses_shared_instant() {
        let ctx = ctx();
        assert_eq!(fn_now(&[], &ctx).unwrap(), CellValue::DateTime(ctx.now));
    }

    #[test]
    fn test_tonow_counts_whole_units() {
        let ctx = ctx_at("2024-03-15T00:00:00Z", "UTC");
        let params = vec![text("2024-03-10"), text("days")];
        assert_eq!(fn_tonow(&params, &ctx).unwrap(), CellValue::Number(5.0));
        // FROMNOW reports the same magnitude for future dates
        let params = vec![text("2024-03-20"), text("days")];
        assert_eq!(fn_fromnow(&params, &ctx).unwrap(), CellValue::Number(5.0));
    }

    #[test]
    fn test_dateadd_clamps_month_end() {
        let params = vec![text("2024-01-31"), num(1.0), text("month")];
        let value = fn_dateadd(&params, &ctx()).unwrap();
        assert_eq!(date_of(&value, "UTC"), "2024-02-29");
    }

    #[test]
    fn test_dateadd_rejects_unknown_unit() {
        let params = vec![text("2024-01-31"), num(1.0), text("fortnight")];
        let err = fn_dateadd(&params, &ctx()).unwrap_err();
        assert!(err.is_interceptable());
        assert!(err.to_string().contains("unknown unit"));
    }

    #[test]
    fn test_dateadd_null_date_is_null() {
        let params = vec![TypedValue::null(), num(1.0), text("day")];
        assert_eq!(fn_dateadd(&params, &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_datetime_diff_defaults_to_seconds() {
        let params = vec![text("2024-01-01T00:01:30Z"), text("2024-01-01T00:00:00Z")];
        assert_eq!(
            fn_datetime_diff(&params, &ctx()).unwrap(),
            CellValue::Number(90.0)
        );

        let params = vec![text("2024-03-15"), text("2024-01-10"), text("M")];
        assert_eq!(
            fn_datetime_diff(&params, &ctx()).unwrap(),
            CellValue::Number(2.0)
        );
    }

    #[test]
    fn test_workday_spans_weekends() {
        let params = vec![text("2023-09-08"), num(200.0)];
        let value = fn_workday(&params, &ctx()).unwrap();
        assert_eq!(date_of(&value, "UTC"), "2024-06-14");
    }

    #[test]
    fn test_workday_skips_holidays() {
        let params = vec![
            text("2023-09-08"),
            num(200.0),
            text("2024-01-22, 2024-01-23, 2024-01-24, 2024-01-25"),
        ];
        let value = fn_workday(&params, &ctx()).unwrap();
        assert_eq!(date_of(&value, "UTC"), "2024-06-20");
    }

    #[test]
    fn test_workday_start_holiday_moves_origin() {
        // Wednesday the 10th is a holiday, so the walk starts from the
        // 11th and the first counted day is Friday the 12th
        let params = vec![text("2024-01-10"), num(1.0), text("2024-01-10")];
        let value = fn_workday(&params, &ctx()).unwrap();
        assert_eq!(date_of(&value, "UTC"), "2024-01-12");
    }

    #[test]
    fn test_workday_diff_is_inclusive_and_signed() {
        let params = vec![text("2024-01-01"), text("2024-01-05")];
        assert_eq!(
            fn_workday_diff(&params, &ctx()).unwrap(),
            CellValue::Number(5.0)
        );

        let params = vec![text("2024-01-05"), text("2024-01-01")];
        assert_eq!(
            fn_workday_diff(&params, &ctx()).unwrap(),
            CellValue::Number(-5.0)
        );

        let params = vec![text("2024-01-01"), text("2024-01-05"), text("2024-01-03")];
        assert_eq!(
            fn_workday_diff(&params, &ctx()).unwrap(),
            CellValue::Number(4.0)
        );
    }

    #[test]
    fn test_datetime_format_default_and_custom() {
        let params = vec![text("2024-03-05T08:04:00Z")];
        assert_eq!(
            fn_datetime_format(&params, &ctx()).unwrap(),
            CellValue::String("2024-03-05 08:04".into())
        );

        let params = vec![text("2024-03-05T08:04:00Z"), text("D/M/YYYY")];
        assert_eq!(
            fn_datetime_format(&params, &ctx()).unwrap(),
            CellValue::String("5/3/2024".into())
        );
    }

    #[test]
    fn test_datetime_format_renders_in_zone() {
        let ctx = ctx_at("2024-03-15T17:30:00Z", "America/New_York");
        let params = vec![text("2024-01-01T02:30:00Z"), text("YYYY-MM-DD HH:mm")];
        assert_eq!(
            fn_datetime_format(&params, &ctx).unwrap(),
            CellValue::String("2023-12-31 21:30".into())
        );
    }

    #[test]
    fn test_datetime_parse_with_format() {
        let params = vec![text("31/01/2024"), text("DD/MM/YYYY")];
        assert_eq!(
            fn_datetime_parse(&params, &ctx()).unwrap(),
            CellValue::DateTime("2024-01-31T00:00:00Z".parse().unwrap())
        );

        let params = vec![text("2024-01-15 10:30"), text("YYYY-MM-DD HH:mm")];
        assert_eq!(
            fn_datetime_parse(&params, &ctx()).unwrap(),
            CellValue::DateTime("2024-01-15T10:30:00Z".parse().unwrap())
        );

        let params = vec![text("not a date"), text("DD/MM/YYYY")];
        assert_eq!(fn_datetime_parse(&params, &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_datestr_and_timestr() {
        let params = vec![text("2024-03-05T08:04:09Z")];
        assert_eq!(
            fn_datestr(&params, &ctx()).unwrap(),
            CellValue::String("2024-03-05".into())
        );
        assert_eq!(
            fn_timestr(&params, &ctx()).unwrap(),
            CellValue::String("08:04:09".into())
        );
    }

    #[test]
    fn test_components_use_call_timezone() {
        let ctx = ctx_at("2024-03-15T17:30:00Z", "America/New_York");
        let params = vec![text("2024-01-01T02:30:00Z")];
        assert_eq!(fn_year(&params, &ctx).unwrap(), CellValue::Number(2023.0));
        assert_eq!(fn_month(&params, &ctx).unwrap(), CellValue::Number(12.0));
        assert_eq!(fn_day(&params, &ctx).unwrap(), CellValue::Number(31.0));
        assert_eq!(fn_hour(&params, &ctx).unwrap(), CellValue::Number(21.0));
        assert_eq!(fn_minute(&params, &ctx).unwrap(), CellValue::Number(30.0));
        assert_eq!(fn_second(&params, &ctx).unwrap(), CellValue::Number(0.0));
    }

    #[test]
    fn test_weeknum_week_one_holds_january_first() {
        assert_eq!(
            fn_weeknum(&[text("2024-01-01")], &ctx()).unwrap(),
            CellValue::Number(1.0)
        );
        // The first Sunday opens week two
        assert_eq!(
            fn_weeknum(&[text("2024-01-07")], &ctx()).unwrap(),
            CellValue::Number(2.0)
        );
        // With Monday weeks, Sunday the 7th still belongs to week one
        assert_eq!(
            fn_weeknum(&[text("2024-01-07"), text("Monday")], &ctx()).unwrap(),
            CellValue::Number(1.0)
        );
    }

    #[test]
    fn test_weekday_counts_from_week_start() {
        // 2024-01-07 is a Sunday
        assert_eq!(
            fn_weekday(&[text("2024-01-07")], &ctx()).unwrap(),
            CellValue::Number(0.0)
        );
        assert_eq!(
            fn_weekday(&[text("2024-01-07"), text("Monday")], &ctx()).unwrap(),
            CellValue::Number(6.0)
        );
    }

    #[test]
    fn test_is_same_with_granularity() {
        let params = vec![
            text("2024-01-01T10:00:00Z"),
            text("2024-01-01T23:00:00Z"),
            text("day"),
        ];
        assert_eq!(
            fn_is_same(&params, &ctx()).unwrap(),
            CellValue::Boolean(true)
        );

        let params = vec![text("2024-01-01T10:00:00Z"), text("2024-01-01T23:00:00Z")];
        assert_eq!(
            fn_is_same(&params, &ctx()).unwrap(),
            CellValue::Boolean(false)
        );
    }

    #[test]
    fn test_is_before_and_after() {
        let params = vec![text("2024-01-01"), text("2024-06-01")];
        assert_eq!(
            fn_is_before(&params, &ctx()).unwrap(),
            CellValue::Boolean(true)
        );
        assert_eq!(
            fn_is_after(&params, &ctx()).unwrap(),
            CellValue::Boolean(false)
        );

        let params = vec![TypedValue::null(), text("2024-06-01")];
        assert_eq!(fn_is_before(&params, &ctx()).unwrap(), CellValue::Null);
    }

    #[test]
    fn test_record_timestamps() {
        let created: DateTime<Utc> = "2024-02-01T09:00:00Z".parse().unwrap();
        let record = Record::new("rec1").created_at(created);
        let ctx = FuncContext {
            record: Some(&record),
            timezone: Timezone::utc(),
            now: Utc::now(),
        };
        assert_eq!(
            fn_created_time(&[], &ctx).unwrap(),
            CellValue::DateTime(created)
        );
        assert_eq!(fn_last_modified_time(&[], &ctx).unwrap(), CellValue::Null);

        let bare = ctx_at("2024-03-15T17:30:00Z", "UTC");
        assert_eq!(fn_created_time(&[], &bare).unwrap(), CellValue::Null);
    }
}
