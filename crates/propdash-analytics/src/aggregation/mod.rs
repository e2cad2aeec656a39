//! 시간 구간 집계.
//!
//! 모든 함수는 순수 함수입니다. 입력 레코드를 빌려 읽기만 하며,
//! 날짜가 없거나 해석할 수 없는 레코드는 건너뛰고 경고 로그만 남깁니다.

mod bucket;
mod fill;
mod item;
mod reduce;

pub use bucket::{aggregate_by_time_range, aggregate_by_time_range_with, AggregateOptions, AggregatedBucket};
pub use fill::{fill_missing_periods, PeriodEntry};
pub use item::{date_field, parse_timestamp, TimeSeriesItem};
pub use reduce::{
    average_by_time_range, average_by_time_range_with, get_count_by_time_range,
    get_count_by_time_range_with, group_by_field_in_time_range, group_by_field_in_time_range_with,
    sum_by_time_range, sum_by_time_range_with, PeriodCount, PeriodGroups, PeriodValue,
};
