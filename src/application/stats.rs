//! 統計情報管理モジュール
//!
//! 検出レート、推論レイテンシ、ローカル回復した推論エラー数などの
//! 統計を収集・出力します。

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 統計情報の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    /// フレームサンプリング時間
    Sample,
    /// 推論時間
    Inference,
    /// tick全体の所要時間
    Tick,
}

/// パーセンタイル統計値
#[derive(Debug, Clone)]
pub struct PercentileStats {
    pub p50: Duration,
    pub p95: Duration,
    pub p99: Duration,
    pub count: usize,
}

/// 統計情報コレクター
#[derive(Debug)]
pub struct StatsCollector {
    /// 検出レート計測用のtickタイムスタンプ
    tick_times: VecDeque<Instant>,
    /// 各処理段階の所要時間（最大1000サンプル保持）
    durations: std::collections::HashMap<StatKind, VecDeque<Duration>>,
    /// ローカル回復した推論エラー数（そのtickは「検出なし」扱い）
    recovered_inference_errors: u64,
    /// 最後の統計出力時刻
    last_report: Instant,
    /// 統計出力間隔
    report_interval: Duration,
}

impl StatsCollector {
    /// 新しいStatsCollectorを作成
    ///
    /// # Arguments
    /// * `report_interval` - 統計出力間隔（例: 10秒）
    pub fn new(report_interval: Duration) -> Self {
        Self {
            tick_times: VecDeque::new(),
            durations: std::collections::HashMap::new(),
            recovered_inference_errors: 0,
            last_report: Instant::now(),
            report_interval,
        }
    }

    /// レート計算の時間範囲（検出は約2FPSなので広めの窓）
    const RATE_WINDOW_SECS: u64 = 10;

    /// tick完了を記録（検出レート計測用）
    pub fn record_tick(&mut self) {
        let now = Instant::now();
        self.tick_times.push_back(now);

        let window = Duration::from_secs(Self::RATE_WINDOW_SECS);
        while let Some(&front) = self.tick_times.front() {
            if now.duration_since(front) > window {
                self.tick_times.pop_front();
            } else {
                break;
            }
        }
    }

    /// 最大サンプル保持数（パーセンタイル計算用）
    const MAX_DURATION_SAMPLES: usize = 1000;

    /// 処理時間を記録
    pub fn record_duration(&mut self, kind: StatKind, duration: Duration) {
        let queue = self.durations.entry(kind).or_default();
        queue.push_back(duration);

        if queue.len() > Self::MAX_DURATION_SAMPLES {
            queue.pop_front();
        }
    }

    /// ローカル回復した推論エラーをカウント
    pub fn record_recovered_inference_error(&mut self) {
        self.recovered_inference_errors += 1;
    }

    /// 回復済み推論エラー数を取得
    #[allow(dead_code)]
    pub fn recovered_inference_errors(&self) -> u64 {
        self.recovered_inference_errors
    }

    /// 現在の検出レート（ticks/sec）を計算
    pub fn current_rate(&self) -> f64 {
        if self.tick_times.is_empty() {
            return 0.0;
        }

        let count = self.tick_times.len() as f64;
        if let (Some(&first), Some(&last)) = (self.tick_times.front(), self.tick_times.back()) {
            let elapsed = last.duration_since(first).as_secs_f64();
            if elapsed > 0.0 {
                return count / elapsed;
            }
        }
        0.0
    }

    /// パーセンタイル統計を計算
    ///
    /// # Returns
    /// パーセンタイル統計値。データがない場合は None
    pub fn percentile_stats(&self, kind: StatKind) -> Option<PercentileStats> {
        let queue = self.durations.get(&kind)?;
        if queue.is_empty() {
            return None;
        }

        let mut sorted: Vec<Duration> = queue.iter().copied().collect();
        sorted.sort();

        let count = sorted.len();
        let p50 = sorted[count * 50 / 100];
        let p95 = sorted[count * 95 / 100];
        let p99 = sorted[count * 99 / 100];

        Some(PercentileStats {
            p50,
            p95,
            p99,
            count,
        })
    }

    /// 統計レポートを出力すべきか判定
    pub fn should_report(&self) -> bool {
        self.last_report.elapsed() >= self.report_interval
    }

    /// 統計レポートを出力してタイマーをリセット
    pub fn report_and_reset(&mut self) {
        tracing::info!("=== Detection Loop Statistics ===");
        tracing::info!("Rate: {:.2} ticks/sec", self.current_rate());

        for kind in [StatKind::Sample, StatKind::Inference, StatKind::Tick] {
            if let Some(stats) = self.percentile_stats(kind) {
                tracing::info!(
                    "{:?}: p50={:.2}ms, p95={:.2}ms, p99={:.2}ms (n={})",
                    kind,
                    stats.p50.as_secs_f64() * 1000.0,
                    stats.p95.as_secs_f64() * 1000.0,
                    stats.p99.as_secs_f64() * 1000.0,
                    stats.count
                );
            }
        }

        tracing::info!(
            "Recovered inference errors: {}",
            self.recovered_inference_errors
        );
        tracing::info!("=================================");

        self.last_report = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_calculation() {
        let mut stats = StatsCollector::new(Duration::from_secs(10));

        for _ in 0..4 {
            stats.record_tick();
            std::thread::sleep(Duration::from_millis(100));
        }

        let rate = stats.current_rate();
        assert!(
            rate > 5.0 && rate < 15.0,
            "Rate should be around 10, got {}",
            rate
        );
    }

    #[test]
    fn test_percentile_stats() {
        let mut stats = StatsCollector::new(Duration::from_secs(10));

        for i in 0..100 {
            stats.record_duration(StatKind::Inference, Duration::from_millis(i));
        }

        let percentile = stats.percentile_stats(StatKind::Inference).unwrap();
        assert_eq!(percentile.count, 100);
        assert!(percentile.p50.as_millis() >= 45 && percentile.p50.as_millis() <= 55);
        assert!(percentile.p95.as_millis() >= 90 && percentile.p95.as_millis() <= 99);
        assert_eq!(percentile.p99.as_millis(), 99);
    }

    #[test]
    fn test_recovered_inference_errors() {
        let mut stats = StatsCollector::new(Duration::from_secs(10));

        stats.record_recovered_inference_error();
        stats.record_recovered_inference_error();

        assert_eq!(stats.recovered_inference_errors(), 2);
    }

    #[test]
    fn test_should_report() {
        let stats = StatsCollector::new(Duration::from_millis(100));

        assert!(!stats.should_report());

        std::thread::sleep(Duration::from_millis(150));

        assert!(stats.should_report());
    }
}
