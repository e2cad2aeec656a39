//! 고정 크기 샘플 히스토리.

use std::collections::VecDeque;

use crate::metrics::TelemetryMetrics;

/// 최근 샘플 FIFO 링 버퍼.
///
/// 가득 찬 상태에서 추가하면 가장 오래된 샘플이 빠집니다.
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    samples: VecDeque<TelemetryMetrics>,
    capacity: usize,
}

impl MetricsHistory {
    /// 새 히스토리 생성. `capacity`는 최소 1로 보정합니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: TelemetryMetrics) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// 가장 최근 샘플.
    pub fn latest(&self) -> Option<&TelemetryMetrics> {
        self.samples.back()
    }

    /// 최근 샘플 바로 앞의 샘플.
    pub fn previous(&self) -> Option<&TelemetryMetrics> {
        self.samples.len().checked_sub(2).and_then(|i| self.samples.get(i))
    }

    /// 오래된 순으로 복사.
    pub fn to_vec(&self) -> Vec<TelemetryMetrics> {
        self.samples.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TelemetryMetrics> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::sample;

    #[test]
    fn test_fifo_drops_oldest() {
        let mut history = MetricsHistory::new(3);
        for latency in [100.0, 110.0, 120.0, 130.0] {
            history.push(sample(latency, 95.0, 0.5, true));
        }

        let latencies: Vec<_> = history.iter().map(|s| s.fetch_latency_ms).collect();
        assert_eq!(latencies, vec![110.0, 120.0, 130.0]);
        assert_eq!(history.latest().unwrap().fetch_latency_ms, 130.0);
        assert_eq!(history.previous().unwrap().fetch_latency_ms, 120.0);
    }

    #[test]
    fn test_previous_needs_two_samples() {
        let mut history = MetricsHistory::new(30);
        assert!(history.previous().is_none());
        history.push(sample(100.0, 95.0, 0.5, true));
        assert!(history.previous().is_none());
        assert!(history.latest().is_some());

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 30);
    }
}
