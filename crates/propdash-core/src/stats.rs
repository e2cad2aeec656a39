//! 변동률 및 추세 계산 헬퍼.
//!
//! KPI 카드의 증감 표시와 텔레메트리 스파크라인 추세 표시가 같은 규칙을 공유합니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// KPI 추세 판정의 기본 임계값 (%).
pub const DEFAULT_TREND_THRESHOLD: f64 = 5.0;

/// 추세 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// 상승
    Up,
    /// 하락
    Down,
    /// 유지
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

/// 이전 값 대비 변동률 (%).
///
/// 이전 값이 0이면 현재 값이 양수일 때 100, 그 외에는 0을 반환합니다.
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return if current > 0.0 { 100.0 } else { 0.0 };
    }

    (current - previous) / previous * 100.0
}

/// 변동률이 임계값(%)을 넘는지로 추세를 판정합니다.
pub fn get_trend(current: f64, previous: f64, threshold: f64) -> Trend {
    let change = percentage_change(current, previous);

    if change > threshold {
        Trend::Up
    } else if change < -threshold {
        Trend::Down
    } else {
        Trend::Stable
    }
}

/// 평균. 빈 슬라이스는 None.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
