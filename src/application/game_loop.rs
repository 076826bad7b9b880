//! ゲームループ（ポーリングドライバ）
//!
//! 固定間隔のポーリングサイクルで サンプリング → 推論 → 安定化 →
//! 通知 を直列に実行します。推論呼び出しはこのループ構造により
//! 厳密に直列化され、前の呼び出しが解決するまで次のtickは始まらない。
//! モデルがポーリング間隔より遅くても推論リクエストが無制限に
//! キューイングされることはありません。
//!
//! 推論失敗はこのループ内で回復し、外へは伝播しません。
//! 失敗したtickは「検出なし」として扱われます。

use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::application::runtime_state::RuntimeState;
use crate::application::session::{GameSession, SessionEvent};
use crate::application::stats::{StatKind, StatsCollector};
use crate::domain::config::AppConfig;
use crate::domain::ports::{DetectorPort, NotifierPort, VideoStreamPort};
use crate::domain::types::UserCommand;
use crate::domain::vocabulary::Vocabulary;

/// ゲームループ実行コンテキスト
pub struct GameLoop<S, D, N>
where
    S: VideoStreamPort,
    D: DetectorPort,
    N: NotifierPort,
{
    stream: S,
    /// 取得フェーズのキャッシュと共有されるモデルハンドル
    detector: Arc<Mutex<D>>,
    notifier: N,
    session: GameSession,
    vocabulary: Vocabulary,
    state: RuntimeState,
    /// UIコラボレータからのユーザーコマンド
    commands: Receiver<UserCommand>,
    interval: std::time::Duration,
    stats: StatsCollector,
}

impl<S, D, N> GameLoop<S, D, N>
where
    S: VideoStreamPort,
    D: DetectorPort,
    N: NotifierPort,
{
    /// 新しいGameLoopを作成
    pub fn new(
        stream: S,
        detector: Arc<Mutex<D>>,
        notifier: N,
        config: &AppConfig,
        state: RuntimeState,
        commands: Receiver<UserCommand>,
    ) -> Self {
        Self {
            stream,
            detector,
            notifier,
            session: GameSession::new(&config.stabilizer, &config.session),
            vocabulary: config.vocabulary(),
            state,
            commands,
            interval: config.detection.interval(),
            stats: StatsCollector::new(config.pipeline.stats_interval()),
        }
    }

    /// 現在のセッションを取得
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// 通知コラボレータへの参照を取得
    #[allow(dead_code)]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// ループを実行する（ブロッキング）
    ///
    /// 各サイクルの先頭で停止指示と可視状態を確認する。停止は実行中の
    /// tickを強制中断せず、次サイクル先頭で観測されて抜ける。
    pub fn run(&mut self) {
        self.notifier.session_started();
        tracing::info!("Game loop started (interval: {:?})", self.interval);

        loop {
            if !self.state.is_detecting() || !self.state.is_visible() {
                break;
            }

            self.drain_commands();
            if !self.state.is_detecting() {
                break;
            }

            let tick_started = Instant::now();
            self.tick(tick_started);

            self.stats.record_tick();
            self.stats
                .record_duration(StatKind::Tick, tick_started.elapsed());
            if self.stats.should_report() {
                self.stats.report_and_reset();
            }

            #[cfg(feature = "tick-timing")]
            tracing::trace!("Tick completed in {:?}", tick_started.elapsed());

            self.sleep_remainder(tick_started);
        }

        tracing::info!("Game loop stopped (score: {})", self.session.score());
    }

    /// 1ポーリングサイクル分の処理
    fn tick(&mut self, tick_started: Instant) {
        let frame = match self.stream.sample_frame() {
            Ok(frame) => frame,
            Err(e) => {
                // サンプリング失敗はこのtickをスキップするだけで、
                // ロック状態には触れない
                tracing::debug!("Frame sampling failed, skipping tick: {}", e);
                return;
            }
        };
        self.stats
            .record_duration(StatKind::Sample, tick_started.elapsed());

        let inference_started = Instant::now();
        let detections = {
            let mut guard = self.detector.lock().unwrap();
            match guard.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    // 推論失敗 = このtickは「検出なし」。再試行はしない
                    tracing::debug!("Inference failed, treating as no detection: {}", e);
                    self.stats.record_recovered_inference_error();
                    Vec::new()
                }
            }
        };
        self.stats
            .record_duration(StatKind::Inference, inference_started.elapsed());

        let target = self.vocabulary.select_target(&detections).cloned();

        match &target {
            Some(detection) => {
                let name = self.vocabulary.display_name(&detection.label).to_string();
                self.notifier.show_detection(detection, &name);
            }
            None => self.notifier.clear_detection(),
        }

        match self.session.tick(target.as_ref()) {
            Some(SessionEvent::Found { label, announce }) => {
                let name = self.vocabulary.display_name(&label).to_string();
                tracing::info!("Object locked: {} (announce: {})", label, announce);
                self.notifier.object_found(&label, &name, announce);
            }
            Some(SessionEvent::Lost) => {
                tracing::info!("Object lost");
                self.notifier.object_lost();
            }
            None => {}
        }
    }

    /// 保留中のユーザーコマンドをすべて処理する
    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(UserCommand::Collect) => {
                    // Locked中のみ成功。それ以外はno-op
                    if let Some(result) = self.session.collect() {
                        tracing::info!(
                            "Collected: {} (+{} -> {})",
                            result.label,
                            result.points,
                            result.score
                        );
                        self.notifier.collected(result.score);
                    }
                }
                Ok(UserCommand::Stop) => {
                    self.state.stop_detecting();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    // UIコラボレータが消えたら検出を続ける意味がない
                    self.state.stop_detecting();
                    break;
                }
            }
        }
    }

    /// ポーリング間隔の残り時間だけスリープする
    fn sleep_remainder(&self, tick_started: Instant) {
        let elapsed = tick_started.elapsed();
        if elapsed < self.interval {
            std::thread::sleep(self.interval - elapsed);
        }
    }
}
