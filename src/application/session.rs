//! ゲームセッションコントローラ
//!
//! スコアとラウンド状態を所有し、安定化ステートマシンのイベントと
//! ユーザーの「片付けた」アクションに反応します。
//! 状態はすべてこのセッションオブジェクトに属し、プロセス全体の
//! シングルトンは存在しません。

use std::time::{Duration, Instant};

use crate::application::stabilizer::{Stabilizer, StabilizerEvent};
use crate::domain::config::{SessionConfig, StabilizerConfig};
use crate::domain::types::{Detection, LockState};

/// セッションが発行するイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// オブジェクト発見（ロックエピソードごとに1回）
    ///
    /// `announce`はクールダウンが許すときのみtrue。急速な再ロックが
    /// 音声通知を連発しないように、ロック/アンロックのサイクルから
    /// 独立したタイマーで判定する。
    Found { label: String, announce: bool },
    /// オブジェクト喪失
    Lost,
}

/// 回収アクションの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectResult {
    /// 回収されたオブジェクトのラベル
    pub label: String,
    /// 今回の加点
    pub points: u32,
    /// 加点後のスコア（UIと音声コラボレータの描画用）
    pub score: u32,
}

/// ゲームセッション
pub struct GameSession {
    /// スコア（非負、固定増分でのみ増加）
    score: u32,
    /// ロック状態の唯一の所有者
    stabilizer: Stabilizer,
    /// 回収1回あたりの加点
    reward_points: u32,
    /// 発見アナウンスのクールダウン
    announce_cooldown: Duration,
    /// 最後にアナウンスした時刻
    last_announced: Option<Instant>,
}

impl GameSession {
    /// 新しいセッションを作成（スコア0、Searching）
    pub fn new(stabilizer_config: &StabilizerConfig, session_config: &SessionConfig) -> Self {
        Self {
            score: 0,
            stabilizer: Stabilizer::new(stabilizer_config),
            reward_points: session_config.reward_points,
            announce_cooldown: session_config.announce_cooldown(),
            last_announced: None,
        }
    }

    /// 現在のスコアを取得
    pub fn score(&self) -> u32 {
        self.score
    }

    /// 現在のロック状態を取得
    #[allow(dead_code)]
    pub fn lock_state(&self) -> &LockState {
        self.stabilizer.state()
    }

    /// ロック確定中か
    #[allow(dead_code)]
    pub fn is_locked(&self) -> bool {
        self.stabilizer.is_locked()
    }

    /// 1tick分を処理する
    ///
    /// 安定化ステートマシンへ検出結果を流し、発生したイベントに
    /// アナウンス判定を付与して返す。
    pub fn tick(&mut self, detection: Option<&Detection>) -> Option<SessionEvent> {
        match self.stabilizer.tick(detection) {
            Some(StabilizerEvent::Found { label }) => {
                let announce = self
                    .last_announced
                    .map_or(true, |t| t.elapsed() >= self.announce_cooldown);
                if announce {
                    self.last_announced = Some(Instant::now());
                }
                Some(SessionEvent::Found { label, announce })
            }
            Some(StabilizerEvent::Lost) => Some(SessionEvent::Lost),
            None => None,
        }
    }

    /// 「片付けた」アクション
    ///
    /// Locked中のみ有効。Searching/Stabilizing中の呼び出しはエラーではなく
    /// no-op（UIコラボレータがボタンを隠す責務を持つが、コントローラ側でも
    /// 防御する）。成功時はスコアを固定増分で加点し、同じオブジェクトで
    /// 報酬を連取できないようにステートマシンをSearchingへ強制リセットする。
    pub fn collect(&mut self) -> Option<CollectResult> {
        let label = self.stabilizer.locked_label()?.to_string();

        self.score += self.reward_points;
        self.stabilizer.force_reset();

        Some(CollectResult {
            label,
            points: self.reward_points,
            score: self.score,
        })
    }
}
