//! ターゲット語彙と表示名変換
//!
//! ゲームが関心を持つラベルの順序付き集合と、一律の最小信頼度しきい値。
//! 表示名の変換表は起動時に一度だけ構築される不変マップで、
//! 未知ラベルは生の識別子にフォールバックする（意図的な仕様）。

use std::collections::HashMap;

use crate::domain::types::Detection;

/// ターゲット語彙（セッション中は不変）
#[derive(Debug, Clone)]
pub struct Vocabulary {
    /// 対象ラベルの順序付き集合
    targets: Vec<String>,
    /// 一律に適用される最小信頼度しきい値
    min_confidence: f32,
    /// ラベル → 表示名の不変マップ
    translations: HashMap<String, String>,
}

impl Vocabulary {
    /// 新しい語彙を構築
    pub fn new(
        targets: Vec<String>,
        min_confidence: f32,
        translations: HashMap<String, String>,
    ) -> Self {
        Self {
            targets,
            min_confidence,
            translations,
        }
    }

    /// ラベルが対象語彙に含まれるか
    pub fn contains(&self, label: &str) -> bool {
        self.targets.iter().any(|t| t == label)
    }

    /// 最小信頼度しきい値を取得
    #[allow(dead_code)]
    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    /// 検出結果が適格（ラベルが語彙内 かつ 信頼度がしきい値超）か
    pub fn qualifies(&self, detection: &Detection) -> bool {
        detection.score > self.min_confidence && self.contains(&detection.label)
    }

    /// このtickの対象検出を選ぶ
    ///
    /// 検出器が返したランキング順のまま、フィルタ後の先頭を採用する。
    /// 信頼度での再ソートはしない（first-after-filter、文書化された
    /// ポリシー選択であり欠陥ではない）。
    pub fn select_target<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        detections.iter().find(|d| self.qualifies(d))
    }

    /// ラベルを表示名へ変換（未知ラベルは生の識別子のまま返す）
    pub fn display_name<'a>(&'a self, label: &'a str) -> &'a str {
        self.translations
            .get(label)
            .map(|s| s.as_str())
            .unwrap_or(label)
    }
}
