//! 날짜 필드를 가진 레코드.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

/// 집계 대상 레코드 trait.
///
/// 임대 계약, 결제, 정비 요청 등 날짜 필드를 가진 모든 레코드에 구현합니다.
/// 필드가 없거나 해석할 수 없으면 `None`을 반환해야 하며, 해당 레코드는 집계에서 빠집니다.
///
/// # Example
///
/// ```
/// use chrono::{DateTime, Utc};
/// use propdash_analytics::{parse_timestamp, TimeSeriesItem};
///
/// struct Payment {
///     paid_at: String,
/// }
///
/// impl TimeSeriesItem for Payment {
///     fn timestamp(&self) -> Option<DateTime<Utc>> {
///         parse_timestamp(&self.paid_at)
///     }
/// }
/// ```
pub trait TimeSeriesItem {
    /// 레코드의 기준 시각.
    fn timestamp(&self) -> Option<DateTime<Utc>>;
}

impl TimeSeriesItem for DateTime<Utc> {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        Some(*self)
    }
}

impl<T: TimeSeriesItem> TimeSeriesItem for &T {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        (**self).timestamp()
    }
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// 날짜 문자열을 UTC 시각으로 해석합니다.
///
/// 지원 형식:
/// - RFC 3339 (`2024-03-05T10:15:00+09:00`)
/// - `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (UTC로 간주)
/// - `YYYY-MM-DD` (UTC 자정)
/// - 정수 epoch 밀리초
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }

    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// JSON 레코드의 날짜 필드 접근자.
///
/// 문자열이면 [`parse_timestamp`]로, 정수면 epoch 밀리초로 해석합니다.
pub fn date_field(key: &str) -> impl Fn(&Value) -> Option<DateTime<Utc>> + '_ {
    move |record| match record.get(key)? {
        Value::String(raw) => parse_timestamp(raw),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
