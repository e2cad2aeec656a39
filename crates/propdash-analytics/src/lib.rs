//! 대시보드 차트용 시계열 분석.
//!
//! 이 crate는 다음을 제공합니다:
//! - 레코드를 시간/일/주/월 구간으로 묶는 집계 함수
//! - 구간별 건수, 합계, 평균, 범주별 분포
//! - 차트 X축 빈 구간 채우기
//! - 변동률/추세 헬퍼 (core 재노출)

pub mod aggregation;

pub use aggregation::{
    aggregate_by_time_range, aggregate_by_time_range_with, average_by_time_range,
    average_by_time_range_with, date_field, fill_missing_periods, get_count_by_time_range,
    get_count_by_time_range_with, group_by_field_in_time_range, group_by_field_in_time_range_with,
    parse_timestamp, sum_by_time_range, sum_by_time_range_with, AggregateOptions, AggregatedBucket,
    PeriodCount, PeriodEntry, PeriodGroups, PeriodValue, TimeSeriesItem,
};
pub use propdash_core::stats::{get_trend, percentage_change as get_percentage_change, Trend};
pub use propdash_core::TimeRange;
