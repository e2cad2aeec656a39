//! 빈 구간 채우기.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use propdash_core::TimeRange;
use rust_decimal::Decimal;

use super::reduce::{PeriodCount, PeriodValue};

/// 구간 키를 가진 축약 결과.
pub trait PeriodEntry: Clone {
    /// 구간 키.
    fn period(&self) -> &str;

    /// 데이터가 없는 구간의 0 값.
    fn placeholder(period: String) -> Self;
}

impl PeriodEntry for PeriodCount {
    fn period(&self) -> &str {
        &self.period
    }

    fn placeholder(period: String) -> Self {
        PeriodCount { period, count: 0 }
    }
}

impl PeriodEntry for PeriodValue {
    fn period(&self) -> &str {
        &self.period
    }

    fn placeholder(period: String) -> Self {
        PeriodValue {
            period,
            count: 0,
            value: Decimal::ZERO,
        }
    }
}

/// `start`부터 `end`까지(양 끝 포함) 모든 구간을 오름차순으로 채웁니다.
///
/// 집계와 같은 내림/키 규칙을 사용하므로 `data`의 키와 그대로 맞물립니다.
/// 범위 밖의 항목은 결과에 포함되지 않습니다.
pub fn fill_missing_periods<P: PeriodEntry>(
    data: &[P],
    range: TimeRange,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timezone: Tz,
) -> Vec<P> {
    let existing: HashMap<&str, &P> = data.iter().map(|entry| (entry.period(), entry)).collect();

    range
        .periods_between(start, end, &timezone)
        .into_iter()
        .map(|(key, _)| match existing.get(key.as_str()) {
            Some(entry) => (*entry).clone(),
            None => P::placeholder(key),
        })
        .collect()
}
