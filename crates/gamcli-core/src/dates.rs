//! Vendor date/datetime normalization and user date parsing
//!
//! Ad Manager DateTimes arrive as `{date: {year, month, day}, hour, ..}`
//! trees. Once normalized a date is always rendered `YYYY-MM-DD` for
//! display and epoch milliseconds for comparisons.

use chrono::{Datelike, Local, NaiveDate, TimeZone};
use serde_json::{json, Value};

use crate::normalize::{attr_i64, Fields};

/// Displayed in place of absent or unparseable dates.
pub const DASH: &str = "-";

fn date_part(value: &Value) -> Option<&Value> {
    match value.field("date") {
        Some(d) if d.is_object() => Some(d),
        // Some serializers flatten year/month/day onto the DateTime itself.
        _ if value.field("year").is_some() => Some(value),
        _ => None,
    }
}

fn ymd(value: &Value) -> Option<(i32, u32, u32)> {
    let d = date_part(value)?;
    let year = attr_i64(d, "year")?;
    let month = attr_i64(d, "month")?;
    let day = attr_i64(d, "day")?;
    Some((
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    ))
}

/// Format a vendor DateTime for display as zero-padded `YYYY-MM-DD`.
///
/// Absent values render as `"-"`; structurally surprising values fall back
/// to their string form truncated to 10 characters.
pub fn format_display(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return DASH.to_string();
    };
    if value.is_null() {
        return DASH.to_string();
    }

    if let Some((year, month, day)) = ymd(value) {
        return format!("{:04}-{:02}-{:02}", year, month, day);
    }

    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if raw.is_empty() {
        DASH.to_string()
    } else {
        raw.chars().take(10).collect()
    }
}

/// Convert a vendor DateTime to local-naive epoch milliseconds.
///
/// `hour` defaults to 0. Returns `None` on any structural or calendar
/// failure; never panics.
pub fn to_epoch_millis(value: &Value) -> Option<i64> {
    let (year, month, day) = ymd(value)?;
    let hour = match value.field("hour") {
        Some(Value::Null) | None => 0,
        Some(_) => u32::try_from(attr_i64(value, "hour")?).ok()?,
    };

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, 0, 0)?;
    let local = Local.from_local_datetime(&naive).single()?;
    Some(local.timestamp_millis())
}

/// Parse a user-supplied date string.
///
/// Accepts exactly 8 digits as `DDMMYYYY`, or a string whose fifth
/// character is `-` as `YYYY-MM-DD` (only the first 10 characters are
/// consulted). Invalid calendar values yield `None`.
pub fn parse_user_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();

    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let day: u32 = s[0..2].parse().ok()?;
        let month: u32 = s[2..4].parse().ok()?;
        let year: i32 = s[4..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if s.len() >= 10 && s.as_bytes().get(4) == Some(&b'-') {
        let head: String = s.chars().take(10).collect();
        let parts: Vec<&str> = head.split('-').collect();
        if parts.len() == 3 {
            let year: i32 = parts[0].parse().ok()?;
            let month: u32 = parts[1].parse().ok()?;
            let day: u32 = parts[2].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }
    }

    None
}

/// Build the vendor DateTime shape for a prospective line item boundary.
pub fn to_vendor_datetime(date: NaiveDate, hour: u32) -> Value {
    json!({
        "date": {
            "year": date.year(),
            "month": date.month(),
            "day": date.day(),
        },
        "hour": hour,
        "minute": 0,
        "second": 0,
        "timeZoneId": "America/New_York",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display_none_is_dash() {
        assert_eq!(format_display(None), "-");
        assert_eq!(format_display(Some(&Value::Null)), "-");
    }

    #[test]
    fn test_format_display_structured() {
        let dt = json!({"date": {"year": 2026, "month": 3, "day": 7}, "hour": 9});
        assert_eq!(format_display(Some(&dt)), "2026-03-07");
    }

    #[test]
    fn test_format_display_flattened_fields() {
        let dt = json!({"year": 2025, "month": 12, "day": 31});
        assert_eq!(format_display(Some(&dt)), "2025-12-31");
    }

    #[test]
    fn test_format_display_string_fallback_truncates() {
        let dt = json!("2026-03-07T12:00:00-05:00");
        assert_eq!(format_display(Some(&dt)), "2026-03-07");
    }

    #[test]
    fn test_format_display_stringified_numbers() {
        // SOAP leaves are strings; the accessor tolerates that.
        let dt = json!({"date": {"year": "2026", "month": "1", "day": "5"}});
        assert_eq!(format_display(Some(&dt)), "2026-01-05");
    }

    #[test]
    fn test_to_epoch_millis_hour_defaults_to_zero() {
        let with_hour = json!({"date": {"year": 2026, "month": 1, "day": 1}, "hour": 0});
        let without = json!({"date": {"year": 2026, "month": 1, "day": 1}});
        assert_eq!(to_epoch_millis(&with_hour), to_epoch_millis(&without));
        assert!(to_epoch_millis(&without).is_some());
    }

    #[test]
    fn test_to_epoch_millis_structural_failure() {
        assert_eq!(to_epoch_millis(&json!({})), None);
        assert_eq!(to_epoch_millis(&json!("2026-01-01")), None);
        assert_eq!(
            to_epoch_millis(&json!({"date": {"year": 2026, "month": 13, "day": 1}})),
            None
        );
    }

    #[test]
    fn test_parse_user_date_ddmmyyyy() {
        assert_eq!(
            parse_user_date("24022026"),
            NaiveDate::from_ymd_opt(2026, 2, 24)
        );
        // Invalid calendar values
        assert_eq!(parse_user_date("32012024"), None);
        assert_eq!(parse_user_date("00132024"), None);
    }

    #[test]
    fn test_parse_user_date_iso() {
        assert_eq!(
            parse_user_date("2026-02-24"),
            NaiveDate::from_ymd_opt(2026, 2, 24)
        );
        // Only the first 10 characters are consulted
        assert_eq!(
            parse_user_date("2026-02-24T10:00:00"),
            NaiveDate::from_ymd_opt(2026, 2, 24)
        );
        assert_eq!(parse_user_date("2026-13-01"), None);
    }

    #[test]
    fn test_parse_user_date_rejects_other_shapes() {
        assert_eq!(parse_user_date(""), None);
        assert_eq!(parse_user_date("24-02-2026"), None);
        assert_eq!(parse_user_date("2402202"), None);
        assert_eq!(parse_user_date("tomorrow"), None);
    }

    #[test]
    fn test_iso_round_trip() {
        for s in ["2026-01-01", "1999-12-31", "2024-02-29"] {
            let parsed = parse_user_date(s).unwrap();
            assert_eq!(parsed.format("%Y-%m-%d").to_string(), s);
        }
    }

    #[test]
    fn test_to_vendor_datetime_shape() {
        let v = to_vendor_datetime(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), 23);
        assert_eq!(v["date"]["year"], 2026);
        assert_eq!(v["hour"], 23);
        assert_eq!(v["timeZoneId"], "America/New_York");
    }
}
