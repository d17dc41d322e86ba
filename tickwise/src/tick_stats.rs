//! Rolling statistics over reported tick durations.

use std::collections::VecDeque;
use std::time::Duration;

/// Target steps per second of the simulation loop.
pub const TARGET_TPS: f64 = 20.0;

/// Budget of a single step at the target rate.
pub const TICK_BUDGET_MS: f64 = 1000.0 / TARGET_TPS;

/// Aggregated tick duration statistics over the current window.
#[derive(Debug, Clone, PartialEq)]
pub struct TickStatistics {
    pub min_mspt: f64,
    pub max_mspt: f64,
    pub avg_mspt: f64,
    pub p95_mspt: f64, // 95th percentile
    pub sample_count: usize,
    /// Steps in the window that ran over [`TICK_BUDGET_MS`].
    pub overruns: usize,
}

impl TickStatistics {
    /// Steps per second the loop could sustain at the average duration, capped at the target.
    pub fn estimated_tps(&self) -> f64 {
        if self.avg_mspt <= TICK_BUDGET_MS {
            TARGET_TPS
        } else {
            1000.0 / self.avg_mspt
        }
    }
}

/// Keeps the most recent tick durations in a fixed-size window.
#[derive(Debug)]
pub struct TickStatsCollector {
    durations: VecDeque<Duration>,
    max_samples: usize,
}

impl TickStatsCollector {
    /// Creates a collector holding at most `max_samples` durations.
    pub fn new(max_samples: usize) -> Self {
        TickStatsCollector {
            durations: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Records one step. The oldest sample is dropped once the window is full.
    pub fn record(&mut self, duration: Duration) {
        if self.max_samples == 0 {
            return;
        }
        if self.durations.len() == self.max_samples {
            self.durations.pop_front();
        }
        self.durations.push_back(duration);
    }

    /// Returns `None` until at least one step has been recorded.
    pub fn statistics(&self) -> Option<TickStatistics> {
        if self.durations.is_empty() {
            return None;
        }

        let mut sorted_ms: Vec<f64> = self.durations.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        sorted_ms.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let sample_count = sorted_ms.len();
        let avg_mspt = sorted_ms.iter().sum::<f64>() / sample_count as f64;
        let min_mspt = *sorted_ms.first().unwrap_or(&0.0);
        let max_mspt = *sorted_ms.last().unwrap_or(&0.0);

        let p95_index = ((sample_count as f64 * 0.95).ceil() as usize)
            .saturating_sub(1)
            .min(sample_count - 1);
        let p95_mspt = sorted_ms.get(p95_index).copied().unwrap_or(max_mspt);

        Some(TickStatistics {
            min_mspt,
            max_mspt,
            avg_mspt,
            p95_mspt,
            sample_count,
            overruns: sorted_ms.iter().filter(|ms| **ms > TICK_BUDGET_MS).count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_drops_oldest() {
        let mut collector = TickStatsCollector::new(3);
        for ms in [16, 20, 18, 22] {
            collector.record(Duration::from_millis(ms));
        }
        assert_eq!(collector.durations.len(), 3);
        assert_eq!(collector.durations.front().unwrap().as_millis(), 20);
    }

    #[test]
    fn test_zero_window_records_nothing() {
        let mut collector = TickStatsCollector::new(0);
        collector.record(Duration::from_millis(16));
        assert!(collector.statistics().is_none());
    }

    #[test]
    fn test_statistics_over_window() {
        let mut collector = TickStatsCollector::new(10);
        for i in 1..=5 {
            collector.record(Duration::from_millis(i * 10));
        }
        let stats = collector.statistics().unwrap();
        assert_eq!(stats.sample_count, 5);
        assert_eq!(stats.min_mspt, 10.0);
        assert_eq!(stats.max_mspt, 50.0);
        assert_eq!(stats.avg_mspt, 30.0);
        // ceil(5 * 0.95) - 1 = 4
        assert_eq!(stats.p95_mspt, 50.0);
        assert_eq!(stats.overruns, 0);
        assert_eq!(stats.estimated_tps(), TARGET_TPS);
    }

    #[test]
    fn test_p95_with_twenty_samples() {
        let mut collector = TickStatsCollector::new(20);
        for i in 1..=20 {
            collector.record(Duration::from_millis(i));
        }
        // ceil(20 * 0.95) - 1 = 18 -> 19ms
        assert_eq!(collector.statistics().unwrap().p95_mspt, 19.0);
    }

    #[test]
    fn test_slow_ticks_lower_tps() {
        let mut collector = TickStatsCollector::new(4);
        collector.record(Duration::from_millis(100));
        collector.record(Duration::from_millis(100));
        let stats = collector.statistics().unwrap();
        assert_eq!(stats.overruns, 2);
        assert!((stats.estimated_tps() - 10.0).abs() < 1e-9);
    }
}
