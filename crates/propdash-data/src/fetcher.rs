//! 캐시 기반 데이터 fetcher.
//!
//! 대시보드 데이터 훅이 사용하는 조회 경로입니다.
//!
//! 1. 신선한 캐시가 있으면 그대로 반환
//! 2. 같은 키의 상류 요청이 진행 중이면 그 결과를 기다림 (single-flight)
//! 3. 아니면 직접 상류를 호출하고 성공 시 캐시에 저장
//! 4. 상류 실패 시 에러 로그에 기록하고 만료된 캐시라도 있으면 반환

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use propdash_core::{cache_span, mean, AppConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, error, warn, Instrument};

use crate::cache::CacheStore;
use crate::error::{DataError, Result};
use crate::monitoring::ErrorLogger;

/// 지연 시간 평균에 쓰는 최근 상류 호출 수.
const LATENCY_WINDOW: usize = 20;

/// 데이터 출처.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchSource {
    /// 신선한 캐시
    Cache,
    /// 상류 조회 결과
    Upstream,
    /// 상류 실패 후 만료된 캐시
    Stale,
}

/// 조회 결과.
#[derive(Debug, Clone)]
pub struct Fetched<V> {
    pub data: V,
    pub source: FetchSource,
}

impl<V> Fetched<V> {
    /// 만료된 데이터인지 확인.
    pub fn is_stale(&self) -> bool {
        self.source == FetchSource::Stale
    }
}

/// fetcher 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchStats {
    /// 실제 상류 호출 수
    pub upstream_calls: u64,
    /// 진행 중 요청에 합류한 호출 수
    pub coalesced: u64,
    /// 만료 데이터로 응답한 횟수
    pub stale_served: u64,
    /// 최근 상류 호출 평균 지연 (ms)
    pub avg_latency_ms: f64,
    /// 마지막 상류 호출 지연 (ms)
    pub last_latency_ms: Option<f64>,
}

#[derive(Default)]
struct FetchCounters {
    upstream_calls: u64,
    coalesced: u64,
    stale_served: u64,
    latencies: VecDeque<f64>,
}

type FlightResult<V> = Result<Fetched<V>>;
type InFlightMap<V> = HashMap<String, broadcast::Sender<FlightResult<V>>>;

enum Flight<V> {
    Cached(V),
    Leader,
    Follower(broadcast::Receiver<FlightResult<V>>),
}

/// 캐시 + 에러 로그 + single-flight 조합.
pub struct CachedFetcher<V> {
    cache: Arc<CacheStore<V>>,
    errors: ErrorLogger,
    in_flight: Mutex<InFlightMap<V>>,
    counters: Mutex<FetchCounters>,
}

impl<V> CachedFetcher<V>
where
    V: Clone + Send + 'static,
{
    /// 새 fetcher 생성.
    pub fn new(cache: Arc<CacheStore<V>>, errors: ErrorLogger) -> Self {
        Self {
            cache,
            errors,
            in_flight: Mutex::new(HashMap::new()),
            counters: Mutex::new(FetchCounters::default()),
        }
    }

    /// 설정에서 캐시와 에러 로그를 함께 생성.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(CacheStore::from_config(&config.cache)),
            ErrorLogger::new(config.error_log.clone()),
        )
    }

    /// 캐시 조회.
    pub fn cache(&self) -> &Arc<CacheStore<V>> {
        &self.cache
    }

    /// 에러 로그 조회.
    pub fn errors(&self) -> &ErrorLogger {
        &self.errors
    }

    /// 키의 데이터를 조회합니다.
    ///
    /// `fetch_fn`은 이 호출이 상류 요청을 맡게 된 경우에만 실행됩니다.
    pub async fn fetch<F, Fut>(&self, key: &str, ttl: Duration, fetch_fn: F) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        // 만료 항목은 stale fallback을 위해 남겨 둠
        if let Some(data) = self.cache.lookup(key, ttl) {
            return Ok(Fetched {
                data,
                source: FetchSource::Cache,
            });
        }

        match self.join_flight(key, ttl) {
            Flight::Cached(data) => Ok(Fetched {
                data,
                source: FetchSource::Cache,
            }),
            Flight::Leader => self.lead(key, fetch_fn).await,
            Flight::Follower(mut rx) => {
                self.counters().coalesced += 1;
                debug!(cache_key = key, "진행 중인 상류 요청에 합류");

                match rx.recv().await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(cache_key = key, "상류 요청이 완료 전에 취소됨");
                        self.serve_stale(key)
                            .ok_or_else(|| DataError::Cancelled(key.to_string()))
                    }
                }
            }
        }
    }

    /// 기본 TTL로 조회.
    pub async fn fetch_fresh<F, Fut>(&self, key: &str, fetch_fn: F) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        self.fetch(key, self.cache.default_ttl(), fetch_fn).await
    }

    /// in-flight 맵에서 역할을 정합니다.
    fn join_flight(&self, key: &str, ttl: Duration) -> Flight<V> {
        let mut in_flight = self.in_flight_map();

        if let Some(sender) = in_flight.get(key) {
            return Flight::Follower(sender.subscribe());
        }
        // 첫 캐시 조회와 잠금 사이에 다른 리더가 끝났을 수 있음
        if let Some((data, age)) = self.cache.peek(key) {
            if age <= ttl {
                return Flight::Cached(data);
            }
        }

        let (tx, _) = broadcast::channel(1);
        in_flight.insert(key.to_string(), tx);
        Flight::Leader
    }

    async fn lead<F, Fut>(&self, key: &str, fetch_fn: F) -> Result<Fetched<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let guard = FlightGuard {
            in_flight: &self.in_flight,
            key,
            completed: false,
        };

        self.counters().upstream_calls += 1;
        let started = Instant::now();
        let outcome = fetch_fn()
            .instrument(cache_span!("upstream_fetch", key))
            .await;
        self.record_latency(started.elapsed());

        let result = match outcome {
            Ok(data) => {
                self.cache.set(key, data.clone());
                self.errors.record_success();
                Ok(Fetched {
                    data,
                    source: FetchSource::Upstream,
                })
            }
            Err(err) => {
                self.errors
                    .log(err.kind(), err.to_string(), key.to_string(), None);
                match self.serve_stale(key) {
                    Some(stale) => {
                        warn!(cache_key = key, error = %err, "상류 실패, 만료된 캐시로 응답");
                        Ok(stale)
                    }
                    None => Err(err),
                }
            }
        };

        guard.complete(&result);
        result
    }

    fn serve_stale(&self, key: &str) -> Option<Fetched<V>> {
        let (data, _) = self.cache.peek(key)?;
        self.counters().stale_served += 1;
        Some(Fetched {
            data,
            source: FetchSource::Stale,
        })
    }

    fn record_latency(&self, elapsed: Duration) {
        let mut counters = self.counters();
        if counters.latencies.len() >= LATENCY_WINDOW {
            counters.latencies.pop_front();
        }
        counters.latencies.push_back(elapsed.as_secs_f64() * 1000.0);
    }

    /// prefix로 시작하는 캐시를 무효화합니다.
    pub fn invalidate(&self, prefix: &str) -> usize {
        self.cache.clear_by_prefix(prefix)
    }

    /// 통계 스냅샷.
    pub fn fetch_stats(&self) -> FetchStats {
        let mut counters = self.counters();
        let avg_latency_ms = mean(counters.latencies.make_contiguous()).unwrap_or(0.0);

        FetchStats {
            upstream_calls: counters.upstream_calls,
            coalesced: counters.coalesced,
            stale_served: counters.stale_served,
            avg_latency_ms,
            last_latency_ms: counters.latencies.back().copied(),
        }
    }

    /// 현재 진행 중인 상류 요청 수.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight_map().len()
    }

    fn in_flight_map(&self) -> MutexGuard<'_, InFlightMap<V>> {
        lock_or_recover(&self.in_flight, "in_flight")
    }

    fn counters(&self) -> MutexGuard<'_, FetchCounters> {
        lock_or_recover(&self.counters, "counters")
    }
}

fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!(lock = name, "CachedFetcher Mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// 리더의 in-flight 등록을 해제합니다.
///
/// 완료 전에 drop되면(요청 취소) 송신자가 함께 사라져 대기 중인 follower가 깨어납니다.
struct FlightGuard<'a, V> {
    in_flight: &'a Mutex<InFlightMap<V>>,
    key: &'a str,
    completed: bool,
}

impl<V: Clone> FlightGuard<'_, V> {
    fn complete(mut self, result: &FlightResult<V>) {
        self.completed = true;
        let sender = lock_or_recover(self.in_flight, "in_flight").remove(self.key);
        if let Some(sender) = sender {
            // 대기자가 없으면 Err, 무시
            let _ = sender.send(result.clone());
        }
    }
}

impl<V> Drop for FlightGuard<'_, V> {
    fn drop(&mut self) {
        if !self.completed {
            lock_or_recover(self.in_flight, "in_flight").remove(self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(60);

    fn fetcher() -> CachedFetcher<u32> {
        CachedFetcher::new(
            Arc::new(CacheStore::new(100, TTL)),
            ErrorLogger::with_defaults(),
        )
    }

    #[tokio::test]
    async fn test_upstream_then_cache() {
        let fetcher = fetcher();

        let first = fetcher
            .fetch("dashboard_kpi:main", TTL, || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(first.data, 7);
        assert_eq!(first.source, FetchSource::Upstream);

        let second = fetcher
            .fetch("dashboard_kpi:main", TTL, || async { Ok(8) })
            .await
            .unwrap();
        assert_eq!(second.data, 7);
        assert_eq!(second.source, FetchSource::Cache);

        let stats = fetcher.fetch_stats();
        assert_eq!(stats.upstream_calls, 1);
        assert!(stats.last_latency_ms.is_some());
        assert_eq!(fetcher.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_fallback_on_upstream_failure() {
        let fetcher = fetcher();
        fetcher
            .fetch("occupancy:summary", TTL, || async { Ok(93) })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(120)).await;

        let result = fetcher
            .fetch("occupancy:summary", TTL, || async {
                Err(DataError::FetchError("503 Service Unavailable".into()))
            })
            .await
            .unwrap();

        assert_eq!(result.data, 93);
        assert!(result.is_stale());

        let errors = fetcher.errors().errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, crate::KvErrorKind::Fetch);
        assert_eq!(errors[0].context, "occupancy:summary");
        assert_eq!(fetcher.fetch_stats().stale_served, 1);

        // 요청 하나는 미스 하나로만 집계
        let cache_stats = fetcher.cache().get_stats();
        assert_eq!(cache_stats.hits, 0);
        assert_eq!(cache_stats.misses, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_survives_until_refreshed() {
        let fetcher = fetcher();
        fetcher
            .fetch("leases:expiring", TTL, || async { Ok(4) })
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(90)).await;

        for _ in 0..2 {
            let stale = fetcher
                .fetch("leases:expiring", TTL, || async {
                    Err(DataError::FetchError("timeout".into()))
                })
                .await
                .unwrap();
            assert_eq!(stale.source, FetchSource::Stale);
            assert_eq!(stale.data, 4);
        }
        assert_eq!(fetcher.cache().len(), 1);

        let refreshed = fetcher
            .fetch("leases:expiring", TTL, || async { Ok(6) })
            .await
            .unwrap();
        assert_eq!(refreshed.source, FetchSource::Upstream);
        assert_eq!(fetcher.cache().peek("leases:expiring"), Some((6, Duration::ZERO)));
        assert_eq!(fetcher.fetch_stats().stale_served, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_followers_get_stale_data() {
        let fetcher = Arc::new(fetcher());
        fetcher
            .fetch("maintenance:open", TTL, || async { Ok(1) })
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(90)).await;

        let leader = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                fetcher
                    .fetch("maintenance:open", TTL, || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(2)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let follower = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                fetcher
                    .fetch("maintenance:open", TTL, || async { Ok(3) })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();

        let result = follower.await.unwrap().unwrap();
        assert_eq!(result.source, FetchSource::Stale);
        assert_eq!(result.data, 1);
        assert_eq!(fetcher.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_without_stale_returns_error() {
        let fetcher = fetcher();
        let err = fetcher
            .fetch("tenants:count", TTL, || async {
                Err(DataError::ParseError("unexpected token".into()))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::ParseError(_)));
        assert_eq!(fetcher.errors().stats().parse, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_one_upstream_call() {
        let fetcher = Arc::new(fetcher());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let fetcher = fetcher.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                fetcher
                    .fetch("payments:overdue", TTL, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok(3)
                    })
                    .await
            }));
        }

        for handle in handles {
            let fetched = handle.await.unwrap().unwrap();
            assert_eq!(fetched.data, 3);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = fetcher.fetch_stats();
        assert_eq!(stats.upstream_calls, 1);
        assert_eq!(stats.coalesced, 4);

        // 합류한 요청도 미스 한 번씩만
        let cache_stats = fetcher.cache().get_stats();
        assert_eq!(cache_stats.hits, 0);
        assert_eq!(cache_stats.misses, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_leader_releases_followers() {
        let fetcher = Arc::new(fetcher());

        let leader = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                fetcher
                    .fetch("maintenance:open", TTL, || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fetcher.in_flight_count(), 1);

        let follower = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                fetcher
                    .fetch("maintenance:open", TTL, || async { Ok(2) })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();

        let result = follower.await.unwrap();
        assert!(matches!(result, Err(DataError::Cancelled(_))));
        assert_eq!(fetcher.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let fetcher = fetcher();
        fetcher
            .fetch("leases:active", TTL, || async { Ok(10) })
            .await
            .unwrap();

        assert_eq!(fetcher.invalidate("leases:"), 1);

        let refetched = fetcher
            .fetch("leases:active", TTL, || async { Ok(11) })
            .await
            .unwrap();
        assert_eq!(refetched.data, 11);
        assert_eq!(refetched.source, FetchSource::Upstream);
    }
}
