//! シミュレーション検出器アダプタ
//!
//! 開発・デモ用の検出モデル実装。実モデルの代わりにtickごとの台本を
//! 再生する。台本は末尾まで再生すると先頭へ戻る。
//!
//! ロード側（SimModelLoader）は実モデルのロード遅延・ロード失敗を
//! 再現でき、取得チェーンのタイムアウトレースをそのまま通せる。

use std::time::Duration;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::ports::{DetectorPort, ModelLoaderPort};
use crate::domain::types::{BoundingBox, Detection, Frame};

/// 台本再生型の検出器
#[derive(Debug)]
pub struct SimDetector {
    /// tickごとの検出結果（循環再生）
    script: Vec<Vec<Detection>>,
    cursor: usize,
}

impl SimDetector {
    /// 台本を指定して作成
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// デモ用の台本を作成
    ///
    /// 空振り → cupの持続検出（ロック確定に十分な長さ） → 不在、を
    /// 繰り返す。1サイクルでロック確定とLostの両方が観測できる。
    pub fn demo() -> Self {
        let cup = Detection::new("cup", 0.85, BoundingBox::new(120.0, 80.0, 200.0, 180.0));
        let noise = Detection::new("person", 0.92, BoundingBox::new(0.0, 0.0, 640.0, 480.0));

        let mut script: Vec<Vec<Detection>> = Vec::new();
        script.extend(vec![vec![]; 3]);
        // 語彙外の検出だけのtickは「検出なし」と等価
        script.push(vec![noise.clone()]);
        // ロック確定（しきい値10を超える持続検出）＋ロック維持
        script.extend(vec![vec![noise, cup]; 14]);
        // 減衰しきってLost
        script.extend(vec![vec![]; 15]);

        Self::new(script)
    }
}

impl DetectorPort for SimDetector {
    fn detect(&mut self, _frame: &Frame) -> DomainResult<Vec<Detection>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }

        let detections = self.script[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.script.len();
        Ok(detections)
    }
}

/// シミュレーションモデルローダー
///
/// ネットワーク越しの重みダウンロードに相当する遅延を再現する。
pub struct SimModelLoader {
    detector: SimDetector,
    load_delay: Duration,
    fail: bool,
}

impl SimModelLoader {
    /// ローダーを作成
    pub fn new(detector: SimDetector, load_delay: Duration) -> Self {
        Self {
            detector,
            load_delay,
            fail: false,
        }
    }

    /// ロード失敗を再現する
    #[allow(dead_code)]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl ModelLoaderPort for SimModelLoader {
    type Model = SimDetector;

    fn load(self) -> DomainResult<SimDetector> {
        std::thread::sleep(self.load_delay);

        if self.fail {
            return Err(DomainError::ModelLoad {
                reason: "FetchError".to_string(),
            });
        }

        tracing::info!("SimModelLoader: model loaded");
        Ok(self.detector)
    }
}
