/// コア型定義
///
/// Domain層の中心となるデータ構造。
/// すべての処理で共有される不変の型。

use std::time::Instant;

/// フレームピクセル座標の軸平行バウンディングボックス
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// 新しいバウンディングボックスを作成
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// 中心座標を取得
    #[allow(dead_code)]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// 面積を取得
    #[allow(dead_code)]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }
}

/// 1フレーム分のモデル出力
///
/// 1回のポーリングサイクル内で生成・消費される一時データ。
/// 永続化されることはない。
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// ラベル（固定語彙からの文字列識別子）
    pub label: String,
    /// 信頼度スコア [0, 1]
    pub score: f32,
    /// フレームピクセル座標のバウンディングボックス
    pub bbox: BoundingBox,
}

impl Detection {
    /// 新しい検出結果を作成
    pub fn new(label: impl Into<String>, score: f32, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            score,
            bbox,
        }
    }
}

/// サンプリングされたフレームデータ
#[derive(Debug, Clone)]
pub struct Frame {
    /// フレーム取得時刻
    pub timestamp: Instant,
    /// フレーム画像データ（RGBA形式、連続メモリ）
    pub data: Vec<u8>,
    /// 画像の幅
    pub width: u32,
    /// 画像の高さ
    pub height: u32,
}

impl Frame {
    /// 新しいフレームを作成
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            timestamp: Instant::now(),
            data,
            width,
            height,
        }
    }
}

/// 安定化ステートマシンのロック状態
///
/// Stabilizerが排他的に所有し、遷移関数のみが変更する。
/// `Locked`のみが報酬を請求できる状態。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// 探索中（初期状態、喪失時の終端状態）
    Searching,
    /// 安定化中（連続検出ストリークを蓄積中）
    Stabilizing { label: String, streak: u32 },
    /// ロック確定（報酬請求可能）
    Locked { label: String, streak: u32 },
}

impl LockState {
    /// ロック確定状態かどうか
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. })
    }

    /// 現在のストリーク値を取得（Searchingは0）
    #[allow(dead_code)]
    pub fn streak(&self) -> u32 {
        match self {
            LockState::Searching => 0,
            LockState::Stabilizing { streak, .. } | LockState::Locked { streak, .. } => *streak,
        }
    }

    /// 現在追跡中のラベルを取得
    #[allow(dead_code)]
    pub fn label(&self) -> Option<&str> {
        match self {
            LockState::Searching => None,
            LockState::Stabilizing { label, .. } | LockState::Locked { label, .. } => Some(label),
        }
    }
}

/// リソースハンドルのライフサイクル
///
/// カメラストリームとモデルの取得状況をAcquirerが追跡する。
/// `Ready`になるまでポーリングドライバは開始できない。
/// `Failed`はその取得試行の終端であり、外部UIへ通知される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePhase {
    /// 未取得
    Unacquired,
    /// 取得試行中（attempt番号つき）
    Acquiring { attempt: u32 },
    /// 取得完了
    Ready,
    /// 取得失敗（機械可読な理由タグつき）
    Failed { reason: String },
}

/// ユーザー操作コマンド（UIコラボレータからチャネル経由で届く）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    /// 「片付けた」アクション（Locked中のみ有効、それ以外はno-op）
    Collect,
    /// 検出の停止（ループは次サイクル先頭までに観測して抜ける）
    Stop,
}
