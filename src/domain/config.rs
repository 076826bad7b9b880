//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::vocabulary::Vocabulary;

/// カメラ制約の候補
///
/// 取得チェーンはこのランク付きリストを順に試行し、拒否されたときのみ
/// 次の候補へ進む。最初に成功したストリームが即座に採用される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum CameraConstraint {
    /// 背面カメラ・厳密一致
    RearExact,
    /// 背面カメラ・緩い一致
    RearLoose,
    /// 任意のカメラ
    Any,
}

/// アプリケーション設定のルート構造
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    /// カメラ取得設定
    pub camera: CameraConfig,
    /// モデル取得設定
    pub model: ModelConfig,
    /// 検出ポーリング設定
    pub detection: DetectionConfig,
    /// 安定化ステートマシン設定
    pub stabilizer: StabilizerConfig,
    /// ゲームセッション設定
    pub session: SessionConfig,
    /// パイプライン設定
    pub pipeline: PipelineConfig,
    /// ラベル → 表示名の変換表（未知ラベルは生の識別子にフォールバック）
    #[serde(default = "default_translations")]
    pub translations: HashMap<String, String>,
}

/// カメラ取得設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CameraConfig {
    /// 制約候補の優先順リスト
    ///
    /// 選択肢: "rear-exact", "rear-loose", "any"
    /// デフォルト: ["rear-exact", "rear-loose", "any"]
    #[serde(default = "default_camera_preferences")]
    pub preferences: Vec<CameraConstraint>,

    /// 寸法既知シグナルの待機期限（ミリ秒）
    ///
    /// 生ストリームが得られてもこの期限内に寸法が既知にならなければ
    /// 取得全体がCameraTimeoutで失敗する
    /// デフォルト: 5000ms
    pub ready_timeout_ms: u64,

    /// 寸法既知シグナルのポーリング間隔（ミリ秒）
    ///
    /// デフォルト: 50ms
    pub ready_poll_interval_ms: u64,
}

impl CameraConfig {
    /// デフォルトの寸法待機期限（ミリ秒）
    pub const DEFAULT_READY_TIMEOUT_MS: u64 = 5000;
    /// デフォルトのポーリング間隔（ミリ秒）
    pub const DEFAULT_READY_POLL_INTERVAL_MS: u64 = 50;

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

fn default_camera_preferences() -> Vec<CameraConstraint> {
    vec![
        CameraConstraint::RearExact,
        CameraConstraint::RearLoose,
        CameraConstraint::Any,
    ]
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            preferences: default_camera_preferences(),
            ready_timeout_ms: Self::DEFAULT_READY_TIMEOUT_MS,
            ready_poll_interval_ms: Self::DEFAULT_READY_POLL_INTERVAL_MS,
        }
    }
}

/// モデル取得設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ModelConfig {
    /// モデルロードのタイムアウト（ミリ秒）
    ///
    /// ロードとタイマーのfirst-settled-winsレース。タイムアウトしても
    /// 下位のロードはキャンセルされず、遅延完了はキャッシュ更新に使われる
    /// デフォルト: 10000ms
    pub load_timeout_ms: u64,
}

impl ModelConfig {
    /// デフォルトのロードタイムアウト（ミリ秒）
    pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 10000;

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: Self::DEFAULT_LOAD_TIMEOUT_MS,
        }
    }
}

/// 検出ポーリング設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DetectionConfig {
    /// ポーリング間隔（ミリ秒）
    ///
    /// 「フレーム取得 → 推論待ち → 更新 → 待機」の常に前進するループの
    /// 待機時間。バッテリー節約のため検出は約2FPSに抑える
    /// デフォルト: 500ms
    pub interval_ms: u64,

    /// 一律に適用される最小信頼度しきい値 [0, 1]
    ///
    /// デフォルト: 0.6
    pub min_confidence: f32,

    /// 対象ラベルの順序付きリスト（セッション中は不変）
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,
}

impl DetectionConfig {
    /// デフォルトのポーリング間隔（ミリ秒）
    pub const DEFAULT_INTERVAL_MS: u64 = 500;
    /// デフォルトの最小信頼度
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.6;

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_targets() -> Vec<String> {
    [
        "bottle",
        "cup",
        "wine glass",
        "bowl",
        "backpack",
        "handbag",
        "book",
        "teddy bear",
        "sports ball",
        "remote",
        "cell phone",
        "banana",
        "apple",
        "orange",
        "sandwich",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_ms: Self::DEFAULT_INTERVAL_MS,
            min_confidence: Self::DEFAULT_MIN_CONFIDENCE,
            targets: default_targets(),
        }
    }
}

/// 安定化ステートマシン設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StabilizerConfig {
    /// ロック確定に必要なストリークしきい値
    ///
    /// ストリークがこの値を超えたtickでLockedに遷移する
    /// デフォルト: 10
    pub lock_threshold: u32,

    /// ストリークの上限（Locked中のオーバーフロー防止）
    ///
    /// デフォルト: 20
    pub streak_cap: u32,
}

impl StabilizerConfig {
    /// デフォルトのロックしきい値
    pub const DEFAULT_LOCK_THRESHOLD: u32 = 10;
    /// デフォルトのストリーク上限
    pub const DEFAULT_STREAK_CAP: u32 = 20;
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            lock_threshold: Self::DEFAULT_LOCK_THRESHOLD,
            streak_cap: Self::DEFAULT_STREAK_CAP,
        }
    }
}

/// ゲームセッション設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SessionConfig {
    /// 回収1回あたりの加点（固定増分）
    ///
    /// デフォルト: 10
    pub reward_points: u32,

    /// 発見アナウンスのクールダウン（ミリ秒）
    ///
    /// ロック/アンロックのサイクルから独立したタイマー。急速な再ロックが
    /// 通知を連発しないようにする
    /// デフォルト: 5000ms
    pub announce_cooldown_ms: u64,
}

impl SessionConfig {
    /// デフォルトの加点
    pub const DEFAULT_REWARD_POINTS: u32 = 10;
    /// デフォルトのアナウンスクールダウン（ミリ秒）
    pub const DEFAULT_ANNOUNCE_COOLDOWN_MS: u64 = 5000;

    pub fn announce_cooldown(&self) -> Duration {
        Duration::from_millis(self.announce_cooldown_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reward_points: Self::DEFAULT_REWARD_POINTS,
            announce_cooldown_ms: Self::DEFAULT_ANNOUNCE_COOLDOWN_MS,
        }
    }
}

/// パイプライン設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    /// 統計情報の出力間隔（秒）
    pub stats_interval_sec: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stats_interval_sec: 10,
        }
    }
}

impl PipelineConfig {
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_sec)
    }
}

/// デフォルトの表示名変換表（ポーランド語）
fn default_translations() -> HashMap<String, String> {
    [
        ("bottle", "butelkę"),
        ("cup", "kubek"),
        ("wine glass", "kieliszek"),
        ("bowl", "miskę"),
        ("backpack", "plecak"),
        ("handbag", "torebkę"),
        ("book", "książkę"),
        ("teddy bear", "misia"),
        ("sports ball", "piłkę"),
        ("remote", "pilota"),
        ("cell phone", "telefon"),
        ("banana", "banana"),
        ("apple", "jabłko"),
        ("orange", "pomarańczę"),
        ("sandwich", "kanapkę"),
        ("laptop", "laptopa"),
        ("mouse", "myszkę"),
        ("keyboard", "klawiaturę"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

// serdeの`default = "default_translations"`はデシリアライズ時にしか
// 効かないため、Defaultは手書きで同じ辞書を供給する
// （config.toml不在時のフォールバック経路でも表示名が失われないように）
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            model: ModelConfig::default(),
            detection: DetectionConfig::default(),
            stabilizer: StabilizerConfig::default(),
            session: SessionConfig::default(),
            pipeline: PipelineConfig::default(),
            translations: default_translations(),
        }
    }
}

impl AppConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> DomainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| DomainError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// デフォルト設定をTOMLファイルに書き出す
    #[allow(dead_code)]
    pub fn write_default<P: AsRef<Path>>(path: P) -> DomainResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            DomainError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)
            .map_err(|e| DomainError::Configuration(format!("Failed to write config file: {}", e)))
    }

    /// 不変の語彙を構築（起動時に一度だけ）
    pub fn vocabulary(&self) -> Vocabulary {
        Vocabulary::new(
            self.detection.targets.clone(),
            self.detection.min_confidence,
            self.translations.clone(),
        )
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> DomainResult<()> {
        // カメラ取得の検証
        if self.camera.preferences.is_empty() {
            return Err(DomainError::Configuration(
                "Camera preference list must not be empty".to_string(),
            ));
        }
        if self.camera.ready_timeout_ms == 0 || self.camera.ready_poll_interval_ms == 0 {
            return Err(DomainError::Configuration(
                "Camera ready timeout and poll interval must be greater than 0".to_string(),
            ));
        }

        // モデル取得の検証
        if self.model.load_timeout_ms == 0 {
            return Err(DomainError::Configuration(
                "Model load timeout must be greater than 0".to_string(),
            ));
        }

        // 検出ポーリングの検証
        if self.detection.interval_ms == 0 {
            return Err(DomainError::Configuration(
                "Detection interval must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.min_confidence) {
            return Err(DomainError::Configuration(
                "Minimum confidence must be within [0, 1]".to_string(),
            ));
        }
        if self.detection.targets.is_empty() {
            return Err(DomainError::Configuration(
                "Target vocabulary must not be empty".to_string(),
            ));
        }

        // 安定化の検証
        if self.stabilizer.lock_threshold == 0 {
            return Err(DomainError::Configuration(
                "Lock threshold must be greater than 0".to_string(),
            ));
        }
        if self.stabilizer.streak_cap <= self.stabilizer.lock_threshold {
            return Err(DomainError::Configuration(
                "Streak cap must be greater than the lock threshold".to_string(),
            ));
        }

        // セッションの検証
        if self.session.reward_points == 0 {
            return Err(DomainError::Configuration(
                "Reward points must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
