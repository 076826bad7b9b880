//! 安定化ステートマシン
//!
//! フレームごとのノイズの多い検出結果を、チラつきのないロック/アンロック
//! イベント列へ変換します。単一フレームの誤検出・見落としが報酬UIを
//! トグルさせないためのヒステリシス。
//!
//! 非対称な減衰がポイント: ロック確定には持続的な連続検出が必要だが、
//! 喪失は1tickごとに1ずつしか減らない。これにより単一フレームの
//! ドロップアウトを吸収する。

use crate::domain::config::StabilizerConfig;
use crate::domain::types::{Detection, LockState};

/// ステートマシンが発行するイベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StabilizerEvent {
    /// ロック確定（ロックエピソードごとに1回だけ発行される）
    Found { label: String },
    /// ストリークが0まで減衰し探索に戻った
    Lost,
}

/// 安定化ステートマシン
///
/// ロック状態を排他的に所有する。変更経路は`tick`の遷移関数と、
/// 回収時の`force_reset`のみ。
#[derive(Debug)]
pub struct Stabilizer {
    state: LockState,
    /// ロック確定しきい値（ストリークがこれを超えたらLocked）
    lock_threshold: u32,
    /// ストリーク上限（Locked中のオーバーフロー防止）
    streak_cap: u32,
}

impl Stabilizer {
    /// 新しいステートマシンを作成（初期状態はSearching）
    pub fn new(config: &StabilizerConfig) -> Self {
        Self {
            state: LockState::Searching,
            lock_threshold: config.lock_threshold,
            streak_cap: config.streak_cap,
        }
    }

    /// 現在のロック状態を取得
    pub fn state(&self) -> &LockState {
        &self.state
    }

    /// ロック確定中か
    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// ロック中のラベルを取得
    pub fn locked_label(&self) -> Option<&str> {
        match &self.state {
            LockState::Locked { label, .. } => Some(label),
            _ => None,
        }
    }

    /// 1tick分の遷移を評価する
    ///
    /// # Arguments
    /// - `detection`: このtickの適格な対象検出（なければNone）
    ///
    /// # Returns
    /// 遷移がイベント境界を越えた場合のみ`Some`
    pub fn tick(&mut self, detection: Option<&Detection>) -> Option<StabilizerEvent> {
        let state = std::mem::replace(&mut self.state, LockState::Searching);

        let (next, event) = match (state, detection) {
            // 探索中、検出なし
            (LockState::Searching, None) => (LockState::Searching, None),

            // 探索中に適格検出 → 安定化開始
            (LockState::Searching, Some(d)) => (
                LockState::Stabilizing {
                    label: d.label.clone(),
                    streak: 1,
                },
                None,
            ),

            // 安定化中、同一ラベル → ストリーク加算、しきい値超えでロック確定
            (LockState::Stabilizing { label, streak }, Some(d)) if d.label == label => {
                let streak = streak + 1;
                if streak > self.lock_threshold {
                    let event = StabilizerEvent::Found {
                        label: label.clone(),
                    };
                    (LockState::Locked { label, streak }, Some(event))
                } else {
                    (LockState::Stabilizing { label, streak }, None)
                }
            }

            // 安定化中、別ラベル → ストリークは持ち越さず1から
            (LockState::Stabilizing { .. }, Some(d)) => (
                LockState::Stabilizing {
                    label: d.label.clone(),
                    streak: 1,
                },
                None,
            ),

            // ロック中、同一ラベル → 上限つきでストリークを押し上げる
            (LockState::Locked { label, streak }, Some(d)) if d.label == label => (
                LockState::Locked {
                    label,
                    streak: (streak + 1).min(self.streak_cap),
                },
                None,
            ),

            // ロック中、別ラベル → 無視ポリシー（状態もストリークも不変）
            // 喪失→再獲得と解釈する案もあるが、子どもがカメラを振り回す
            // 状況では無視の方が安定する。テストで明示的に固定している。
            (locked @ LockState::Locked { .. }, Some(_)) => (locked, None),

            // 検出なし → 1tickごとに1ずつ減衰、0でSearchingへ戻りLost発行
            (LockState::Stabilizing { label, streak }, None) => {
                let streak = streak.saturating_sub(1);
                if streak == 0 {
                    (LockState::Searching, Some(StabilizerEvent::Lost))
                } else {
                    (LockState::Stabilizing { label, streak }, None)
                }
            }
            (LockState::Locked { label, streak }, None) => {
                let streak = streak.saturating_sub(1);
                if streak == 0 {
                    (LockState::Searching, Some(StabilizerEvent::Lost))
                } else {
                    (LockState::Locked { label, streak }, None)
                }
            }
        };

        self.state = next;
        event
    }

    /// 明示的にSearchingへ戻す（回収アクション時）
    ///
    /// 同じオブジェクトで報酬を連取できないように、回収後は
    /// あらためて安定化し直す必要がある。
    pub fn force_reset(&mut self) {
        self.state = LockState::Searching;
    }
}
