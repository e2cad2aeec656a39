//! 버킷별 축약 (건수, 합계, 평균, 범주 분포).
//!
//! 모두 [`aggregate_by_time_range_with`]의 결과 위에서 버킷마다 다른 축약만 적용합니다.
//! 정렬 순서도 집계 옵션을 그대로 따릅니다. `_with` 변형은 날짜 접근자를 직접 받습니다.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use propdash_core::TimeRange;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bucket::{aggregate_by_time_range_with, AggregateOptions};
use super::item::TimeSeriesItem;

/// 범주 값이 없는 레코드가 묶이는 이름.
const UNKNOWN_CATEGORY: &str = "unknown";

/// 구간별 건수.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    pub period: String,
    pub count: usize,
}

/// 구간별 수치 (합계 또는 평균).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodValue {
    pub period: String,
    /// 구간의 레코드 수
    pub count: usize,
    pub value: Decimal,
}

/// 구간별 범주 분포.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodGroups {
    pub period: String,
    /// 구간의 레코드 수
    pub total: usize,
    /// 범주별 레코드 수
    pub groups: BTreeMap<String, usize>,
}

/// 구간별 레코드 수.
pub fn get_count_by_time_range<T: TimeSeriesItem>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
) -> Vec<PeriodCount> {
    get_count_by_time_range_with(items, range, options, T::timestamp)
}

/// 날짜 접근자를 지정한 구간별 레코드 수.
pub fn get_count_by_time_range_with<T, D>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
    date_of: D,
) -> Vec<PeriodCount>
where
    D: Fn(&T) -> Option<DateTime<Utc>>,
{
    aggregate_by_time_range_with(items, range, options, date_of)
        .into_iter()
        .map(|bucket| PeriodCount {
            period: bucket.period,
            count: bucket.count,
        })
        .collect()
}

/// 구간별 수치 합계.
///
/// 값이 `None`인 레코드는 합계에서 빠지지만 `count`에는 포함됩니다.
pub fn sum_by_time_range<T, F>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
    value_of: F,
) -> Vec<PeriodValue>
where
    T: TimeSeriesItem,
    F: Fn(&T) -> Option<Decimal>,
{
    sum_by_time_range_with(items, range, options, T::timestamp, value_of)
}

/// 날짜 접근자를 지정한 구간별 수치 합계.
pub fn sum_by_time_range_with<T, D, F>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
    date_of: D,
    value_of: F,
) -> Vec<PeriodValue>
where
    D: Fn(&T) -> Option<DateTime<Utc>>,
    F: Fn(&T) -> Option<Decimal>,
{
    aggregate_by_time_range_with(items, range, options, date_of)
        .into_iter()
        .map(|bucket| {
            let value = bucket
                .data
                .iter()
                .filter_map(|&item| value_of(item))
                .sum::<Decimal>();
            PeriodValue {
                period: bucket.period,
                count: bucket.count,
                value,
            }
        })
        .collect()
}

/// 구간별 수치 평균.
///
/// 값이 있는 레코드만 평균에 들어갑니다. 값이 하나도 없는 구간은 0입니다.
pub fn average_by_time_range<T, F>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
    value_of: F,
) -> Vec<PeriodValue>
where
    T: TimeSeriesItem,
    F: Fn(&T) -> Option<Decimal>,
{
    average_by_time_range_with(items, range, options, T::timestamp, value_of)
}

/// 날짜 접근자를 지정한 구간별 수치 평균.
pub fn average_by_time_range_with<T, D, F>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
    date_of: D,
    value_of: F,
) -> Vec<PeriodValue>
where
    D: Fn(&T) -> Option<DateTime<Utc>>,
    F: Fn(&T) -> Option<Decimal>,
{
    aggregate_by_time_range_with(items, range, options, date_of)
        .into_iter()
        .map(|bucket| {
            let values: Vec<Decimal> = bucket.data.iter().filter_map(|&item| value_of(item)).collect();
            let value = if values.is_empty() {
                Decimal::ZERO
            } else {
                values.iter().sum::<Decimal>() / Decimal::from(values.len())
            };
            PeriodValue {
                period: bucket.period,
                count: bucket.count,
                value,
            }
        })
        .collect()
}

/// 구간별 범주 분포.
///
/// 범주가 `None`이면 `"unknown"`으로 묶습니다.
pub fn group_by_field_in_time_range<T, F>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
    category_of: F,
) -> Vec<PeriodGroups>
where
    T: TimeSeriesItem,
    F: Fn(&T) -> Option<String>,
{
    group_by_field_in_time_range_with(items, range, options, T::timestamp, category_of)
}

/// 날짜 접근자를 지정한 구간별 범주 분포.
pub fn group_by_field_in_time_range_with<T, D, F>(
    items: &[T],
    range: TimeRange,
    options: &AggregateOptions,
    date_of: D,
    category_of: F,
) -> Vec<PeriodGroups>
where
    D: Fn(&T) -> Option<DateTime<Utc>>,
    F: Fn(&T) -> Option<String>,
{
    aggregate_by_time_range_with(items, range, options, date_of)
        .into_iter()
        .map(|bucket| {
            let mut groups = BTreeMap::new();
            for &item in &bucket.data {
                let category = category_of(item).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());
                *groups.entry(category).or_insert(0) += 1;
            }
            PeriodGroups {
                period: bucket.period,
                total: bucket.count,
                groups,
            }
        })
        .collect()
}
