// Утилиты времени

use chrono::{DateTime, NaiveDateTime, Utc};

/// Текущее время UTC
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Текущее время в миллисекундах (Unix epoch)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Распарсить timestamp сервера (RFC 3339, либо naive datetime без зоны)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Некоторые бэкенды отдают naive datetime; трактуем как UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        let parsed = parse_timestamp("2024-05-01T10:30:00+07:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-05-01T03:30:00+00:00");
    }

    #[test]
    fn test_parse_naive_datetime() {
        assert!(parse_timestamp("2024-05-01T10:30:00").is_some());
        assert!(parse_timestamp("2024-05-01 10:30:00.123").is_some());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
