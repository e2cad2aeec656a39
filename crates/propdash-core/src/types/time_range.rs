//! 집계용 시간 구간 정의.
//!
//! 레코드 타임스탬프를 시간/일/주/월 단위 기간으로 내림(truncate)하고,
//! 차트 X축에 쓰이는 기간 키 문자열을 생성합니다.
//! 모든 계산은 지정한 타임존의 현지 시각 기준입니다.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 집계 시간 구간.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    /// 시간별
    Hour,
    /// 일별
    Day,
    /// 주별 (ISO 주, 월요일 시작)
    Week,
    /// 월별
    Month,
}

impl TimeRange {
    /// 모든 구간 반환.
    pub fn all() -> [TimeRange; 4] {
        [
            TimeRange::Hour,
            TimeRange::Day,
            TimeRange::Week,
            TimeRange::Month,
        ]
    }

    /// 구간 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Hour => "hour",
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
        }
    }

    /// 현지 시각을 구간 시작으로 내림합니다.
    pub fn truncate_naive(&self, local: NaiveDateTime) -> NaiveDateTime {
        let date = local.date();
        let start_date = match self {
            TimeRange::Hour => {
                return midnight(date) + Duration::hours(i64::from(local.hour()));
            }
            TimeRange::Day => date,
            TimeRange::Week => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            TimeRange::Month => date.with_day(1).unwrap_or(date),
        };
        midnight(start_date)
    }

    /// 다음 구간의 시작 시각 (현지 시각).
    pub fn advance_naive(&self, period_start: NaiveDateTime) -> NaiveDateTime {
        match self {
            TimeRange::Hour => period_start + Duration::hours(1),
            TimeRange::Day => period_start + Duration::days(1),
            TimeRange::Week => period_start + Duration::weeks(1),
            TimeRange::Month => period_start
                .checked_add_months(Months::new(1))
                .unwrap_or(period_start + Duration::days(31)),
        }
    }

    /// 구간 시작 시각으로 키 문자열을 만듭니다.
    ///
    /// - hour: `2024-03-05T10:00`
    /// - day: `2024-03-05`
    /// - week: `2024-W10`
    /// - month: `2024-03`
    pub fn format_key(&self, period_start: NaiveDateTime) -> String {
        match self {
            TimeRange::Hour => period_start.format("%Y-%m-%dT%H:00").to_string(),
            TimeRange::Day => period_start.format("%Y-%m-%d").to_string(),
            TimeRange::Week => {
                let week = period_start.date().iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            TimeRange::Month => period_start.format("%Y-%m").to_string(),
        }
    }

    /// 타임스탬프가 속한 구간의 시작 시각 (UTC).
    pub fn period_start<Tz: TimeZone>(&self, ts: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
        let local = ts.with_timezone(tz).naive_local();
        resolve_local(tz, self.truncate_naive(local))
    }

    /// 타임스탬프가 속한 구간의 키.
    pub fn period_key<Tz: TimeZone>(&self, ts: DateTime<Utc>, tz: &Tz) -> String {
        let local = ts.with_timezone(tz).naive_local();
        self.format_key(self.truncate_naive(local))
    }

    /// `start`부터 `end`까지(양 끝 포함) 모든 구간의 (키, 시작 시각)을 반환합니다.
    ///
    /// `start > end`이면 빈 벡터를 반환합니다.
    pub fn periods_between<Tz: TimeZone>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tz: &Tz,
    ) -> Vec<(String, DateTime<Utc>)> {
        if start > end {
            return Vec::new();
        }

        let last = self.truncate_naive(end.with_timezone(tz).naive_local());
        let mut cursor = self.truncate_naive(start.with_timezone(tz).naive_local());
        let mut periods = Vec::new();

        while cursor <= last {
            periods.push((self.format_key(cursor), resolve_local(tz, cursor)));
            cursor = self.advance_naive(cursor);
        }

        periods
    }
}

/// 현지 시각을 UTC로 변환합니다.
///
/// DST 중복 구간은 이른 쪽을, 건너뛴 구간은 한 시간 뒤를 사용합니다.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => match tz.from_local_datetime(&(local + Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => Utc.from_utc_datetime(&local),
        },
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" | "1h" => Ok(TimeRange::Hour),
            "day" | "1d" => Ok(TimeRange::Day),
            "week" | "1w" => Ok(TimeRange::Week),
            "month" | "1mo" => Ok(TimeRange::Month),
            _ => Err(format!("Invalid time range: {}", s)),
        }
    }
}
