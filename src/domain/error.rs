/// エラー型定義
///
/// Domain層の統一エラー型。thiserrorを使用して型安全なエラー処理を提供します。
///
/// # 設計方針
/// - unwrap()の使用を禁止し、明示的なエラーハンドリングを強制
/// - 機械可読な理由タグ（プラットフォームのエラー名をそのまま保持）と
///   ユーザー向けメッセージを分離
/// - 回復可能性をエラー型で表現（Inferenceはローカル回復、それ以外は
///   取得失敗としてUIに再試行を促す）

use std::time::Duration;
use thiserror::Error;

/// プラットフォーム由来の生エラー
///
/// カメラ/モデルのアダプタが返す、下位APIのエラー名とメッセージ。
/// `name`は診断用にそのまま保持され、分類後もverbatimで運ばれる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    /// 機械可読なエラー名（例: "NotAllowedError", "OverconstrainedError"）
    pub name: String,
    /// 下位APIのメッセージ
    pub message: String,
}

impl PlatformError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Domain層の統一エラー型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// カメラAPIが存在しない環境
    #[error("camera API is not available on this platform")]
    CameraUnsupported,

    /// カメラ使用許可の拒否
    #[error("camera permission denied: {reason}")]
    CameraPermissionDenied { reason: String },

    /// カメラデバイスが見つからない
    #[error("camera device not found: {reason}")]
    CameraNotFound { reason: String },

    /// 制約を満たすカメラが存在しない
    #[error("camera constraint unsatisfiable: {reason}")]
    CameraConstraintUnsatisfiable { reason: String },

    /// ストリームは得られたが寸法既知シグナルが期限内に来なかった
    #[error("camera stream did not become ready within {timeout:?}")]
    CameraTimeout { timeout: Duration },

    /// 再生開始の失敗（ミュート再試行後も失敗）
    #[error("playback failed: {reason}")]
    Playback { reason: String },

    /// モデルロードがタイムアウト期限内に完了しなかった
    #[error("model did not load within {timeout:?}")]
    ModelTimeout { timeout: Duration },

    /// モデルロード自体の失敗（終端）
    #[error("model failed to load: {reason}")]
    ModelLoad { reason: String },

    /// 推論エラー（一時的、そのtickは「検出なし」として回復）
    #[error("inference failed: {reason}")]
    Inference { reason: String },

    /// フレームサンプリングの失敗（一時的）
    #[error("frame sampling failed: {reason}")]
    FrameSampling { reason: String },

    /// 設定関連のエラー
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DomainError {
    /// プラットフォームのカメラエラーを分類する
    ///
    /// エラー名はverbatimで`reason`に保持される。未知の名前は
    /// 制約不満として扱う（取得チェーンが次の候補へ進めるように）。
    pub fn from_camera_error(err: PlatformError) -> Self {
        match err.name.as_str() {
            "NotAllowedError" | "PermissionDeniedError" | "SecurityError" => {
                DomainError::CameraPermissionDenied { reason: err.name }
            }
            "NotFoundError" | "DevicesNotFoundError" => {
                DomainError::CameraNotFound { reason: err.name }
            }
            "NotSupportedError" => DomainError::CameraUnsupported,
            _ => DomainError::CameraConstraintUnsatisfiable { reason: err.name },
        }
    }

    /// 機械可読な理由タグを取得（診断・ResourcePhase::Failed用）
    pub fn reason_tag(&self) -> String {
        match self {
            DomainError::CameraUnsupported => "Unsupported".to_string(),
            DomainError::CameraPermissionDenied { reason }
            | DomainError::CameraNotFound { reason }
            | DomainError::CameraConstraintUnsatisfiable { reason }
            | DomainError::Playback { reason }
            | DomainError::ModelLoad { reason }
            | DomainError::Inference { reason }
            | DomainError::FrameSampling { reason } => reason.clone(),
            DomainError::CameraTimeout { .. } | DomainError::ModelTimeout { .. } => {
                "Timeout".to_string()
            }
            DomainError::Configuration(_) => "Configuration".to_string(),
        }
    }

    /// ユーザー向けメッセージ（理由タグとは別の表示用文字列）
    pub fn user_message(&self) -> String {
        match self {
            DomainError::CameraUnsupported => {
                "Twoja przeglądarka nie obsługuje kamery (lub brak HTTPS).".to_string()
            }
            DomainError::CameraPermissionDenied { reason }
            | DomainError::CameraNotFound { reason }
            | DomainError::CameraConstraintUnsatisfiable { reason } => {
                format!("Błąd kamery: {}.", reason)
            }
            DomainError::CameraTimeout { .. } | DomainError::Playback { .. } => {
                "Błąd kamery: nie udało się uruchomić obrazu.".to_string()
            }
            DomainError::ModelTimeout { .. } | DomainError::ModelLoad { .. } => {
                "Błąd ładowania AI. Spróbuj odświeżyć stronę.".to_string()
            }
            DomainError::Inference { .. } | DomainError::FrameSampling { .. } => {
                "Chwilowy problem z wykrywaniem.".to_string()
            }
            DomainError::Configuration(msg) => format!("Błąd konfiguracji: {}", msg),
        }
    }

    /// 取得系の失敗かどうか（UIに再試行を促すべきエラー）
    #[allow(dead_code)]
    pub fn is_acquisition_failure(&self) -> bool {
        !matches!(
            self,
            DomainError::Inference { .. } | DomainError::FrameSampling { .. }
        )
    }
}

/// Domain層の統一Result型
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_error_classification() {
        let denied = DomainError::from_camera_error(PlatformError::new(
            "NotAllowedError",
            "Permission denied by user",
        ));
        assert_eq!(
            denied,
            DomainError::CameraPermissionDenied {
                reason: "NotAllowedError".to_string()
            }
        );

        let overconstrained = DomainError::from_camera_error(PlatformError::new(
            "OverconstrainedError",
            "facingMode exact not satisfiable",
        ));
        assert_eq!(
            overconstrained,
            DomainError::CameraConstraintUnsatisfiable {
                reason: "OverconstrainedError".to_string()
            }
        );

        let not_found =
            DomainError::from_camera_error(PlatformError::new("NotFoundError", "no device"));
        assert_eq!(
            not_found,
            DomainError::CameraNotFound {
                reason: "NotFoundError".to_string()
            }
        );
    }

    #[test]
    fn test_reason_tag_preserved_verbatim() {
        let err = DomainError::from_camera_error(PlatformError::new(
            "PermissionDeniedError",
            "legacy name",
        ));
        // プラットフォームのエラー名がそのまま理由タグになる
        assert_eq!(err.reason_tag(), "PermissionDeniedError");
    }

    #[test]
    fn test_timeout_reason_tag() {
        let err = DomainError::ModelTimeout {
            timeout: Duration::from_secs(10),
        };
        assert_eq!(err.reason_tag(), "Timeout");
    }

    #[test]
    fn test_user_message_distinct_from_tag() {
        let err = DomainError::CameraPermissionDenied {
            reason: "NotAllowedError".to_string(),
        };
        assert_ne!(err.user_message(), err.reason_tag());
        assert!(err.user_message().contains("NotAllowedError"));
    }

    #[test]
    fn test_inference_is_not_acquisition_failure() {
        let err = DomainError::Inference {
            reason: "tensor shape mismatch".to_string(),
        };
        assert!(!err.is_acquisition_failure());
        assert!(DomainError::CameraUnsupported.is_acquisition_failure());
    }
}
