//! KV 에러 로그.
//!
//! 데이터 계층에서 발생한 실패를 최신순으로 보관하는 고정 크기 로그입니다.
//! - 종류별(fetch/parse/validation/subscription) 카운터
//! - 최근 작업 윈도우 기반 에러율
//! - 기록 시 심각도에 맞는 tracing 이벤트 출력
//!
//! 전역 인스턴스는 없습니다. 생성한 핸들을 복제해서 주입합니다.

use chrono::{DateTime, Utc};
use propdash_core::ErrorLogConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{error, warn};
use uuid::Uuid;

/// 에러 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KvErrorKind {
    /// 상류 조회 실패
    Fetch,
    /// 레코드 해석 실패
    Parse,
    /// 레코드 검증 실패
    Validation,
    /// 실시간 구독 실패
    Subscription,
}

impl KvErrorKind {
    /// 모든 종류.
    pub fn all() -> [KvErrorKind; 4] {
        [
            KvErrorKind::Fetch,
            KvErrorKind::Parse,
            KvErrorKind::Validation,
            KvErrorKind::Subscription,
        ]
    }
}

impl std::fmt::Display for KvErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fetch => write!(f, "fetch"),
            Self::Parse => write!(f, "parse"),
            Self::Validation => write!(f, "validation"),
            Self::Subscription => write!(f, "subscription"),
        }
    }
}

/// 기록된 에러.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvError {
    /// 에러 ID
    pub id: Uuid,
    /// 종류
    pub kind: KvErrorKind,
    /// 메시지
    pub message: String,
    /// 발생 위치/대상 (예: `payments:overdue`)
    pub context: String,
    /// 발생 시각
    pub timestamp: DateTime<Utc>,
    /// 추가 정보
    pub details: Option<serde_json::Value>,
}

/// 에러 로그 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorLogStats {
    pub fetch: u64,
    pub parse: u64,
    pub validation: u64,
    pub subscription: u64,
    /// 누적 에러 수
    pub total: u64,
    /// 최근 윈도우 기준 에러율 (0.0 ~ 1.0)
    pub error_rate: f64,
    /// 마지막 에러 시각
    pub last_error_at: Option<DateTime<Utc>>,
}

struct ErrorLogInner {
    /// 최신순 에러 목록
    errors: VecDeque<KvError>,
    stats: ErrorLogStats,
    /// 최근 작업 결과 (true = 실패), 오래된 것이 앞
    window: VecDeque<bool>,
}

/// 에러 로그 핸들 (스레드 안전, 복제 시 상태 공유).
#[derive(Clone)]
pub struct ErrorLogger {
    inner: Arc<RwLock<ErrorLogInner>>,
    config: ErrorLogConfig,
}

impl ErrorLogger {
    /// 새 에러 로그 생성.
    pub fn new(config: ErrorLogConfig) -> Self {
        let config = ErrorLogConfig {
            max_errors: config.max_errors.max(1),
            rate_window: config.rate_window.max(1),
            ..config
        };

        Self {
            inner: Arc::new(RwLock::new(ErrorLogInner {
                errors: VecDeque::with_capacity(config.max_errors),
                stats: ErrorLogStats::default(),
                window: VecDeque::with_capacity(config.rate_window),
            })),
            config,
        }
    }

    /// 기본 설정으로 생성.
    pub fn with_defaults() -> Self {
        Self::new(ErrorLogConfig::default())
    }

    /// 설정 조회.
    pub fn config(&self) -> &ErrorLogConfig {
        &self.config
    }

    /// 에러를 기록하고 ID를 반환합니다.
    ///
    /// 한도를 넘으면 가장 오래된 에러가 조용히 빠집니다.
    /// 에러율 윈도우에는 실패한 작업 하나로 집계됩니다.
    pub fn log(
        &self,
        kind: KvErrorKind,
        message: impl Into<String>,
        context: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Uuid {
        let record = KvError {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            context: context.into(),
            timestamp: Utc::now(),
            details,
        };
        let id = record.id;

        match kind {
            KvErrorKind::Fetch | KvErrorKind::Subscription => {
                error!(
                    id = %id,
                    kind = %kind,
                    context = %record.context,
                    message = %record.message,
                    "[KV ERROR]"
                );
            }
            KvErrorKind::Parse | KvErrorKind::Validation => {
                warn!(
                    id = %id,
                    kind = %kind,
                    context = %record.context,
                    message = %record.message,
                    "[KV WARNING]"
                );
            }
        }

        let mut inner = self.write_inner();

        match kind {
            KvErrorKind::Fetch => inner.stats.fetch += 1,
            KvErrorKind::Parse => inner.stats.parse += 1,
            KvErrorKind::Validation => inner.stats.validation += 1,
            KvErrorKind::Subscription => inner.stats.subscription += 1,
        }
        inner.stats.total += 1;
        inner.stats.last_error_at = Some(record.timestamp);

        inner.errors.push_front(record);
        inner.errors.truncate(self.config.max_errors);

        self.push_outcome(&mut inner, true);

        id
    }

    /// 성공한 작업을 에러율 윈도우에 기록합니다.
    pub fn record_success(&self) {
        let mut inner = self.write_inner();
        self.push_outcome(&mut inner, false);
    }

    fn push_outcome(&self, inner: &mut ErrorLogInner, failed: bool) {
        if inner.window.len() >= self.config.rate_window {
            inner.window.pop_front();
        }
        inner.window.push_back(failed);
    }

    /// 전체 에러 (최신순).
    pub fn errors(&self) -> Vec<KvError> {
        self.read_inner().errors.iter().cloned().collect()
    }

    /// 최근 에러 `limit`개 (최신순).
    pub fn recent_errors(&self, limit: usize) -> Vec<KvError> {
        self.read_inner()
            .errors
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// 종류별 에러 (최신순).
    pub fn errors_by_kind(&self, kind: KvErrorKind) -> Vec<KvError> {
        self.read_inner()
            .errors
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }

    /// 해당 종류의 가장 최근 에러.
    pub fn last_error_of_kind(&self, kind: KvErrorKind) -> Option<KvError> {
        self.read_inner()
            .errors
            .iter()
            .find(|e| e.kind == kind)
            .cloned()
    }

    /// 통계 스냅샷.
    pub fn stats(&self) -> ErrorLogStats {
        let inner = self.read_inner();
        ErrorLogStats {
            error_rate: self.rate_of(&inner),
            ..inner.stats.clone()
        }
    }

    /// 최근 `rate_window`개 작업 중 실패 비율.
    ///
    /// 아직 관측되지 않은 작업은 성공으로 간주합니다.
    pub fn error_rate(&self) -> f64 {
        let inner = self.read_inner();
        self.rate_of(&inner)
    }

    fn rate_of(&self, inner: &ErrorLogInner) -> f64 {
        let failures = inner.window.iter().filter(|failed| **failed).count();
        failures as f64 / self.config.rate_window as f64
    }

    /// 에러율이 기준치를 넘는지 확인합니다.
    pub fn has_high_error_rate(&self) -> bool {
        self.error_rate() > self.config.high_error_rate_threshold
    }

    /// 목록, 카운터, 에러율 윈도우를 모두 초기화합니다.
    pub fn clear(&self) {
        let mut inner = self.write_inner();
        inner.errors.clear();
        inner.stats = ErrorLogStats::default();
        inner.window.clear();
    }

    /// `max_age`보다 오래된 에러를 목록에서 제거하고 제거 수를 반환합니다.
    ///
    /// 카운터와 에러율 윈도우는 유지됩니다.
    pub fn clear_older_than(&self, max_age: Duration) -> usize {
        let max_age = chrono::Duration::from_std(max_age)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let now = Utc::now();

        let mut inner = self.write_inner();
        let before = inner.errors.len();
        inner.errors.retain(|e| now - e.timestamp <= max_age);
        before - inner.errors.len()
    }

    /// 보관 중인 에러 수.
    pub fn len(&self) -> usize {
        self.read_inner().errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_inner().errors.is_empty()
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, ErrorLogInner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("ErrorLogger RwLock poisoned (read), recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, ErrorLogInner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("ErrorLogger RwLock poisoned (write), recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for ErrorLogger {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_is_newest_first_and_bounded() {
        let logger = ErrorLogger::with_defaults();

        for i in 0..101 {
            logger.log(KvErrorKind::Fetch, format!("timeout #{i}"), "dashboard_kpi:main", None);
        }

        let errors = logger.errors();
        assert_eq!(errors.len(), 100);
        assert_eq!(errors[0].message, "timeout #100");
        assert_eq!(errors[99].message, "timeout #1");

        let recent: Vec<_> = logger.recent_errors(2).into_iter().map(|e| e.message).collect();
        assert_eq!(recent, vec!["timeout #100", "timeout #99"]);

        // 카운터는 잘린 항목까지 누적
        let stats = logger.stats();
        assert_eq!(stats.fetch, 101);
        assert_eq!(stats.total, 101);
    }

    #[test]
    fn test_stats_by_kind() {
        let logger = ErrorLogger::with_defaults();
        logger.log(KvErrorKind::Parse, "bad date", "leases:expiring", None);
        logger.log(
            KvErrorKind::Validation,
            "negative rent",
            "payments:overdue",
            Some(json!({ "unit": "12B", "amount": -1200 })),
        );
        logger.log(KvErrorKind::Subscription, "channel closed", "realtime", None);

        let stats = logger.stats();
        assert_eq!(stats.fetch, 0);
        assert_eq!(stats.parse, 1);
        assert_eq!(stats.validation, 1);
        assert_eq!(stats.subscription, 1);
        assert_eq!(stats.total, 3);
        assert!(stats.last_error_at.is_some());

        let validation = logger.errors_by_kind(KvErrorKind::Validation);
        assert_eq!(validation.len(), 1);
        assert_eq!(validation[0].details.as_ref().unwrap()["unit"], "12B");

        assert_eq!(
            logger.last_error_of_kind(KvErrorKind::Subscription).unwrap().message,
            "channel closed"
        );
        assert!(logger.last_error_of_kind(KvErrorKind::Fetch).is_none());
    }

    #[test]
    fn test_error_rate_over_window() {
        let logger = ErrorLogger::new(ErrorLogConfig {
            rate_window: 10,
            ..ErrorLogConfig::default()
        });

        // 관측 전에는 0
        assert_eq!(logger.error_rate(), 0.0);

        logger.log(KvErrorKind::Fetch, "503", "occupancy:summary", None);
        assert!((logger.error_rate() - 0.1).abs() < 1e-9);
        assert!(!logger.has_high_error_rate());

        logger.log(KvErrorKind::Fetch, "503", "occupancy:summary", None);
        assert!(logger.has_high_error_rate());

        // 성공 10번이면 실패가 윈도우 밖으로 밀려남
        for _ in 0..10 {
            logger.record_success();
        }
        assert_eq!(logger.error_rate(), 0.0);
        assert_eq!(logger.stats().total, 2);
    }

    #[test]
    fn test_error_ids_are_unique() {
        let logger = ErrorLogger::with_defaults();
        let a = logger.log(KvErrorKind::Parse, "x", "a:1", None);
        let b = logger.log(KvErrorKind::Parse, "x", "a:1", None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_clear_resets_everything() {
        let logger = ErrorLogger::with_defaults();
        logger.log(KvErrorKind::Fetch, "down", "tenants:count", None);
        logger.clear();

        assert!(logger.is_empty());
        assert_eq!(logger.stats(), ErrorLogStats::default());
    }

    #[test]
    fn test_clear_older_than_keeps_counters() {
        let logger = ErrorLogger::with_defaults();
        logger.log(KvErrorKind::Fetch, "old", "a:1", None);
        logger.log(KvErrorKind::Fetch, "new", "a:1", None);

        {
            let mut inner = logger.write_inner();
            let last = inner.errors.len() - 1;
            inner.errors[last].timestamp = Utc::now() - chrono::Duration::hours(2);
        }

        assert_eq!(logger.clear_older_than(Duration::from_secs(3600)), 1);
        assert_eq!(logger.errors()[0].message, "new");
        assert_eq!(logger.len(), 1);
        assert_eq!(logger.stats().total, 2);
    }

    #[test]
    fn test_cloned_handle_shares_state() {
        let logger = ErrorLogger::with_defaults();
        let handle = logger.clone();
        handle.log(KvErrorKind::Subscription, "dropped", "realtime", None);
        assert_eq!(logger.len(), 1);
    }
}
