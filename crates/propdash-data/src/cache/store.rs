//! 인메모리 TTL 캐시.
//!
//! 대시보드 데이터 훅이 상류 조회 결과를 보관하는 저장소입니다.
//!
//! # 항목 수명
//!
//! ```text
//! Created ──> Valid (age <= ttl) ──> Stale (age > ttl) ──> Removed
//!                                      │
//!                      [ttl = Duration::MAX 읽기로 여전히 조회 가능]
//! ```
//!
//! 백그라운드 정리는 없습니다. 만료는 읽기 시점에만 판정되며,
//! 만료된 항목은 그 읽기에서 제거됩니다.
//!
//! # 용량 제거
//!
//! 가득 찬 상태에서 새 키를 넣으면 **가장 먼저 삽입된** 항목 하나를 제거합니다.
//! 최근 읽기 여부는 고려하지 않습니다. 기존 키 덮어쓰기는 삽입 위치를 유지합니다.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use propdash_core::CacheConfig;
use serde::{Deserialize, Serialize};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

/// 캐시 항목.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// 캐시 키
    pub key: String,
    /// 저장된 데이터
    pub data: V,
    /// 저장 시각 (표시용)
    pub timestamp: DateTime<Utc>,
    /// 저장 시각 (나이 계산용)
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    /// 저장 후 경과 시간.
    pub fn age(&self) -> Duration {
        self.inserted_at.elapsed()
    }

    fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() <= ttl
    }
}

/// 캐시 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// 적중 횟수
    pub hits: u64,
    /// 미스 횟수 (없음 + 만료)
    pub misses: u64,
    /// 쓰기 횟수
    pub writes: u64,
    /// 현재 항목 수
    pub size: usize,
    /// 적중률 (0.0 ~ 1.0)
    pub hit_rate: f64,
    /// 마지막 동기화 시각
    pub last_sync: Option<DateTime<Utc>>,
}

struct CacheInner<V> {
    /// 삽입 순서를 보존하는 항목 맵
    entries: IndexMap<String, CacheEntry<V>>,
    hits: u64,
    misses: u64,
    writes: u64,
    last_sync: Option<(Instant, DateTime<Utc>)>,
}

/// TTL/용량 제한 캐시.
///
/// 모든 작업은 짧은 잠금 안에서 끝나며 실패하지 않습니다.
/// 데이터가 없으면 `None`을 반환하고, 조회/재적재는 호출자 책임입니다.
pub struct CacheStore<V> {
    inner: RwLock<CacheInner<V>>,
    max_size: usize,
    default_ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    /// 새 캐시 생성. `max_size`는 최소 1로 보정합니다.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: IndexMap::with_capacity(max_size.min(1024)),
                hits: 0,
                misses: 0,
                writes: 0,
                last_sync: None,
            }),
            max_size: max_size.max(1),
            default_ttl,
        }
    }

    /// 설정에서 생성.
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_size, config.default_ttl())
    }

    /// 최대 항목 수.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// 기본 TTL.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // =========================================================================
    // 조회
    // =========================================================================

    /// 나이가 `ttl` 이하인 데이터를 반환합니다.
    ///
    /// 만료된 항목은 제거하고 `None`을 반환합니다. 적중/미스 카운터가 증가합니다.
    /// `ttl`에 `Duration::MAX`를 주면 만료 여부와 무관하게 읽습니다.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let mut inner = self.write_inner();

        let freshness = inner.entries.get(key).map(|entry| entry.is_fresh(ttl));
        let result = match freshness {
            Some(true) => inner.entries.get(key).map(|entry| entry.data.clone()),
            Some(false) => {
                inner.entries.shift_remove(key);
                debug!(cache_key = key, ttl_ms = ttl.as_millis() as u64, "만료된 캐시 항목 제거");
                None
            }
            None => None,
        };

        if result.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }

        result
    }

    /// 기본 TTL로 조회.
    pub fn get_fresh(&self, key: &str) -> Option<V> {
        self.get(key, self.default_ttl)
    }

    /// 만료 여부와 무관하게 조회 (상류 실패 시 fallback 용도).
    pub fn get_stale(&self, key: &str) -> Option<V> {
        self.get(key, Duration::MAX)
    }

    /// 적중/미스는 세지만 만료 항목을 지우지 않는 조회.
    ///
    /// 상류 갱신이 실패했을 때 만료된 값으로 응답할 수 있도록 항목을 남겨 둡니다.
    /// 항목은 다음 `set`으로 덮어써지거나 `get`/`clear` 계열에서 제거됩니다.
    pub fn lookup(&self, key: &str, ttl: Duration) -> Option<V> {
        let mut inner = self.write_inner();

        let result = inner
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(ttl))
            .map(|entry| entry.data.clone());

        if result.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }

        result
    }

    /// 데이터와 나이를 그대로 반환합니다. 카운터와 항목을 건드리지 않습니다.
    pub fn peek(&self, key: &str) -> Option<(V, Duration)> {
        self.read_inner()
            .entries
            .get(key)
            .map(|entry| (entry.data.clone(), entry.age()))
    }

    /// prefix로 시작하는 키 중 만료되지 않은 데이터를 삽입 순서대로 반환합니다.
    ///
    /// 스캔 중 만난 만료 항목은 제거합니다. 적중/미스 카운터는 변하지 않습니다.
    pub fn get_by_prefix(&self, prefix: &str, ttl: Duration) -> Vec<V> {
        let mut inner = self.write_inner();

        let values: Vec<V> = inner
            .entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_fresh(ttl))
            .map(|(_, entry)| entry.data.clone())
            .collect();

        let before = inner.entries.len();
        inner
            .entries
            .retain(|key, entry| !(key.starts_with(prefix) && !entry.is_fresh(ttl)));
        let purged = before - inner.entries.len();

        if purged > 0 {
            debug!(prefix = prefix, purged = purged, "prefix 스캔 중 만료 항목 제거");
        }

        values
    }

    /// 키가 존재하고 만료되지 않았는지 확인합니다.
    ///
    /// 카운터와 항목을 건드리지 않습니다.
    pub fn has(&self, key: &str, ttl: Duration) -> bool {
        self.read_inner()
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(ttl))
    }

    /// 항목의 나이. 없으면 `None`.
    pub fn get_age(&self, key: &str) -> Option<Duration> {
        self.read_inner().entries.get(key).map(CacheEntry::age)
    }

    /// 항목 저장 시각. 없으면 `None`.
    pub fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.read_inner().entries.get(key).map(|entry| entry.timestamp)
    }

    // =========================================================================
    // 쓰기 / 무효화
    // =========================================================================

    /// 값을 저장하거나 덮어씁니다.
    ///
    /// 가득 찬 상태에서 새 키면 가장 먼저 삽입된 항목 하나를 먼저 제거합니다.
    pub fn set(&self, key: impl Into<String>, data: V) {
        let key = key.into();
        let mut inner = self.write_inner();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
            if let Some((evicted, _)) = inner.entries.shift_remove_index(0) {
                debug!(evicted = %evicted, incoming = %key, "용량 초과로 가장 오래된 항목 제거");
            }
        }

        let inserted_at = Instant::now();
        let timestamp = Utc::now();
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                data,
                timestamp,
                inserted_at,
            },
        );
        inner.writes += 1;
        inner.last_sync = Some((inserted_at, timestamp));
    }

    /// 키 하나를 제거합니다. 제거했으면 true.
    pub fn remove(&self, key: &str) -> bool {
        self.write_inner().entries.shift_remove(key).is_some()
    }

    /// prefix로 시작하는 모든 키를 제거하고 제거 수를 반환합니다.
    ///
    /// 다른 곳에서 쓰기가 일어난 뒤의 캐시 무효화 수단입니다.
    pub fn clear_by_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.write_inner();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - inner.entries.len();

        debug!(prefix = prefix, removed = removed, "prefix 캐시 무효화");
        removed
    }

    /// 모든 항목을 제거하고 적중/미스 카운터를 초기화합니다.
    pub fn clear(&self) {
        let mut inner = self.write_inner();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    // =========================================================================
    // 통계 / 동기화
    // =========================================================================

    /// 통계 스냅샷.
    pub fn get_stats(&self) -> CacheStats {
        let inner = self.read_inner();
        let reads = inner.hits + inner.misses;
        let hit_rate = if reads == 0 {
            0.0
        } else {
            inner.hits as f64 / reads as f64
        };

        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            writes: inner.writes,
            size: inner.entries.len(),
            hit_rate,
            last_sync: inner.last_sync.map(|(_, at)| at),
        }
    }

    /// 동기화 시각을 현재로 기록합니다.
    pub fn mark_synced(&self) {
        self.write_inner().last_sync = Some((Instant::now(), Utc::now()));
    }

    /// 마지막 동기화 이후 경과 시간. 동기화한 적 없으면 `None`.
    pub fn time_since_sync(&self) -> Option<Duration> {
        self.read_inner().last_sync.map(|(at, _)| at.elapsed())
    }

    /// 현재 항목 수.
    pub fn len(&self) -> usize {
        self.read_inner().entries.len()
    }

    /// 비어 있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.read_inner().entries.is_empty()
    }

    /// 삽입 순서대로 키 목록.
    pub fn keys(&self) -> Vec<String> {
        self.read_inner().entries.keys().cloned().collect()
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, CacheInner<V>> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("CacheStore RwLock poisoned (read), recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, CacheInner<V>> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("CacheStore RwLock poisoned (write), recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(60);

    #[test]
    fn test_set_then_get_returns_data() {
        let cache = CacheStore::new(10, TTL);
        cache.set("dashboard_kpi:main", 42_u32);

        assert_eq!(cache.get("dashboard_kpi:main", TTL), Some(42));
        assert_eq!(cache.get("dashboard_kpi:missing", TTL), None);

        let stats = cache.get_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
        assert!(stats.last_sync.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_read_removes_entry() {
        let cache = CacheStore::new(10, TTL);
        cache.set("security_audit:login_attempts", "3 failed");

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(cache.get("security_audit:login_attempts", TTL), None);
        assert_eq!(cache.get_stats().misses, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundary_age_is_still_fresh() {
        let cache = CacheStore::new(10, TTL);
        cache.set("k:1", 1);

        tokio::time::advance(TTL).await;
        assert_eq!(cache.get("k:1", TTL), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_read_with_infinite_ttl() {
        let cache = CacheStore::new(10, TTL);
        cache.set("occupancy:summary", 0.93_f64);

        tokio::time::advance(Duration::from_secs(3600)).await;

        assert!(!cache.has("occupancy:summary", TTL));
        assert_eq!(cache.get_stale("occupancy:summary"), Some(0.93));
    }

    #[test]
    fn test_insertion_order_eviction() {
        let cache = CacheStore::new(3, TTL);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        // 읽기는 제거 순서에 영향 없음
        assert_eq!(cache.get("a", TTL), Some(1));

        cache.set("d", 4);
        assert_eq!(cache.keys(), vec!["b", "c", "d"]);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = CacheStore::new(2, TTL);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);

        assert_eq!(cache.keys(), vec!["a", "b"]);
        assert_eq!(cache.get("a", TTL), Some(10));

        // 덮어쓴 a가 여전히 가장 오래된 항목
        cache.set("c", 3);
        assert_eq!(cache.keys(), vec!["b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_by_prefix_purges_expired() {
        let cache = CacheStore::new(10, TTL);
        cache.set("leases:expiring", 1);
        tokio::time::advance(Duration::from_secs(90)).await;
        cache.set("leases:active", 2);
        cache.set("payments:overdue", 3);

        let values = cache.get_by_prefix("leases:", TTL);
        assert_eq!(values, vec![2]);
        assert_eq!(cache.keys(), vec!["leases:active", "payments:overdue"]);

        // prefix 스캔은 카운터를 건드리지 않음
        let stats = cache.get_stats();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn test_clear_by_prefix_only_matching() {
        let cache = CacheStore::new(10, TTL);
        cache.set("maintenance:open", 1);
        cache.set("maintenance:closed", 2);
        cache.set("maintenance_cost:q1", 3);
        cache.set("tenants:count", 4);

        assert_eq!(cache.clear_by_prefix("maintenance:"), 2);
        assert_eq!(cache.keys(), vec!["maintenance_cost:q1", "tenants:count"]);
    }

    #[test]
    fn test_clear_resets_counters() {
        let cache = CacheStore::new(10, TTL);
        cache.set("a", 1);
        cache.get("a", TTL);
        cache.get("b", TTL);

        cache.clear();

        let stats = cache.get_stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_keeps_expired_entry() {
        let cache = CacheStore::new(10, TTL);
        cache.set("occupancy:summary", 93);
        tokio::time::advance(Duration::from_secs(120)).await;

        assert_eq!(cache.lookup("occupancy:summary", TTL), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.peek("occupancy:summary"),
            Some((93, Duration::from_secs(120)))
        );

        // peek은 카운터를 건드리지 않음
        let stats = cache.get_stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);

        // 일반 조회는 여전히 만료 항목을 제거
        assert_eq!(cache.get("occupancy:summary", TTL), None);
        assert!(cache.is_empty());
        assert_eq!(cache.peek("occupancy:summary"), None);
    }

    #[test]
    fn test_lookup_counts_fresh_hit() {
        let cache = CacheStore::new(10, TTL);
        cache.set("a", 1);
        assert_eq!(cache.lookup("a", TTL), Some(1));
        assert_eq!(cache.get_stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_age_and_sync_tracking() {
        let cache: CacheStore<u8> = CacheStore::new(10, TTL);
        assert_eq!(cache.time_since_sync(), None);
        assert_eq!(cache.get_age("a"), None);
        assert_eq!(cache.get_timestamp("a"), None);

        let before = Utc::now();
        cache.set("a", 1);
        assert!(cache.get_timestamp("a").is_some_and(|ts| ts >= before));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get_age("a"), Some(Duration::from_secs(5)));
        assert_eq!(cache.time_since_sync(), Some(Duration::from_secs(5)));

        cache.mark_synced();
        assert_eq!(cache.time_since_sync(), Some(Duration::ZERO));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = CacheStore::new(0, TTL);
        cache.set("a", 1);
        cache.set("b", 2);
        assert_eq!(cache.max_size(), 1);
        assert_eq!(cache.keys(), vec!["b"]);
    }
}
