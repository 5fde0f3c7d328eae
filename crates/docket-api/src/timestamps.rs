use chrono::{DateTime, Locale, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Parse a stored `created_at`. Rows written by the app are RFC 3339;
/// SQLite's own `datetime('now')` default has no zone and is taken as UTC.
pub fn parse_stored(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

/// Display form shown to users, e.g. `2026. okt. 18. 14:05:09`.
pub fn localized(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz)
        .format_localized("%Y. %b. %-d. %H:%M:%S", Locale::hu_HU)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_both_stored_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        assert_eq!(parse_stored("2026-03-01T09:30:00.000000Z"), expected);
        assert_eq!(parse_stored("2026-03-01 09:30:00"), expected);
        assert_eq!(parse_stored("garbage"), DateTime::<Utc>::default());
    }

    #[test]
    fn localizes_into_display_zone() {
        // Budapest is UTC+1 in winter and UTC+2 in summer.
        let winter = Utc.with_ymd_and_hms(2026, 1, 15, 8, 0, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2026, 7, 15, 8, 0, 0).unwrap();
        let tz: Tz = "Europe/Budapest".parse().unwrap();

        assert_eq!(localized(winter, tz), "2026. jan. 15. 09:00:00");
        assert_eq!(localized(summer, tz), "2026. júl. 15. 10:00:00");

        let autumn = Utc.with_ymd_and_hms(2026, 10, 18, 12, 5, 9).unwrap();
        assert_eq!(localized(autumn, tz), "2026. okt. 18. 14:05:09");
    }
}
