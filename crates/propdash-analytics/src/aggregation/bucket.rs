//! 구간별 버킷 생성.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use propdash_core::TimeRange;
use serde::Serialize;
use tracing::warn;

use super::item::TimeSeriesItem;

/// 집계 옵션.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// true면 오래된 구간부터 (기본은 최신 구간부터)
    pub sort_ascending: bool,
    /// 구간 경계 계산에 쓰는 타임존 (기본 UTC)
    pub timezone: Tz,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            sort_ascending: false,
            timezone: Tz::UTC,
        }
    }
}

impl AggregateOptions {
    /// 오름차순 정렬 옵션.
    pub fn ascending() -> Self {
        Self {
            sort_ascending: true,
            ..Self::default()
        }
    }

    /// 타임존 지정.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }
}

/// 한 구간에 속한 레코드 묶음.
///
/// `start_date`/`end_date`는 구간의 명목 경계가 아니라
/// 버킷에 실제로 들어간 레코드 시각의 최소/최대값입니다.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedBucket<'a, T> {
    /// 구간 키 (예: `2024-03-05T10:00`)
    pub period: String,
    /// 레코드 수
    pub count: usize,
    /// 레코드 목록 (입력 순서 유지)
    pub data: Vec<&'a T>,
    /// 가장 이른 레코드 시각
    pub start_date: DateTime<Utc>,
    /// 가장 늦은 레코드 시각
    pub end_date: DateTime<Utc>,
}

/// [`TimeSeriesItem`] 구현체를 구간별로 묶습니다.
pub fn aggregate_by_time_range<'a, T: TimeSeriesItem>(
    items: &'a [T],
    range: TimeRange,
    options: &AggregateOptions,
) -> Vec<AggregatedBucket<'a, T>> {
    aggregate_by_time_range_with(items, range, options, T::timestamp)
}

/// 날짜 접근자를 직접 지정해 구간별로 묶습니다.
///
/// 접근자가 `None`을 돌려준 레코드는 건너뜁니다.
pub fn aggregate_by_time_range_with<'a, T, F>(
    items: &'a [T],
    range: TimeRange,
    options: &AggregateOptions,
    date_of: F,
) -> Vec<AggregatedBucket<'a, T>>
where
    F: Fn(&T) -> Option<DateTime<Utc>>,
{
    let tz = &options.timezone;
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<AggregatedBucket<'a, T>> = Vec::new();
    let mut skipped = 0usize;

    for item in items {
        let Some(ts) = date_of(item) else {
            skipped += 1;
            continue;
        };

        let key = range.period_key(ts, tz);
        match index.get(&key) {
            Some(&i) => {
                let bucket = &mut buckets[i];
                bucket.count += 1;
                bucket.data.push(item);
                bucket.start_date = bucket.start_date.min(ts);
                bucket.end_date = bucket.end_date.max(ts);
            }
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push(AggregatedBucket {
                    period: key,
                    count: 1,
                    data: vec![item],
                    start_date: ts,
                    end_date: ts,
                });
            }
        }
    }

    if skipped > 0 {
        warn!(
            skipped = skipped,
            total = items.len(),
            range = %range,
            "날짜를 해석할 수 없는 레코드를 집계에서 제외"
        );
    }

    if options.sort_ascending {
        buckets.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    } else {
        buckets.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::item::parse_timestamp;
    use chrono_tz::Asia::Seoul;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_hourly_buckets() {
        let items = vec![
            ts("2024-03-05T10:15:00Z"),
            ts("2024-03-05T10:45:00Z"),
            ts("2024-03-05T11:05:00Z"),
        ];

        let buckets = aggregate_by_time_range(&items, TimeRange::Hour, &AggregateOptions::default());

        assert_eq!(buckets.len(), 2);
        // 기본은 최신 구간부터
        assert_eq!(buckets[0].period, "2024-03-05T11:00");
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].period, "2024-03-05T10:00");
        assert_eq!(buckets[1].count, 2);
        assert_eq!(buckets[1].start_date, items[0]);
        assert_eq!(buckets[1].end_date, items[1]);
    }

    #[test]
    fn test_ascending_sort() {
        let items = vec![
            ts("2024-03-20T09:00:00Z"),
            ts("2024-01-02T09:00:00Z"),
            ts("2024-02-14T09:00:00Z"),
        ];

        let buckets = aggregate_by_time_range(&items, TimeRange::Month, &AggregateOptions::ascending());
        let periods: Vec<_> = buckets.iter().map(|b| b.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[test]
    fn test_missing_dates_are_skipped() {
        let records = vec![
            ("2024-03-05", 1),
            ("not a date", 2),
            ("", 3),
            ("2024-03-05 18:00:00", 4),
        ];

        let buckets = aggregate_by_time_range_with(
            &records,
            TimeRange::Day,
            &AggregateOptions::default(),
            |(date, _)| parse_timestamp(date),
        );

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].data[1].1, 4);
    }

    #[test]
    fn test_timezone_moves_period_boundary() {
        // UTC 15:30 = 서울 다음날 00:30
        let items = vec![ts("2024-03-05T14:30:00Z"), ts("2024-03-05T15:30:00Z")];

        let utc = aggregate_by_time_range(&items, TimeRange::Day, &AggregateOptions::default());
        assert_eq!(utc.len(), 1);

        let seoul = aggregate_by_time_range(
            &items,
            TimeRange::Day,
            &AggregateOptions::default().with_timezone(Seoul),
        );
        let periods: Vec<_> = seoul.iter().map(|b| b.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-03-06", "2024-03-05"]);
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<DateTime<Utc>> = Vec::new();
        assert!(aggregate_by_time_range(&items, TimeRange::Week, &AggregateOptions::default()).is_empty());
    }
}
