/// Port定義（Clean Architectureのインターフェース）
///
/// Domain層が外部コラボレータに依存するための抽象trait。
/// Infrastructure層がこれらを実装し、Application層がDIで注入する。
///
/// カメラ・検出モデル・UI/音声レイヤはすべて外部コラボレータであり、
/// このコアはtraitの契約のみに依存する。

use crate::domain::config::CameraConstraint;
use crate::domain::error::{DomainResult, PlatformError};
use crate::domain::types::{Detection, Frame};

/// カメラポート: カメラストリームの取得を抽象化
pub trait CameraPort {
    /// このポートが返すストリーム型
    type Stream: VideoStreamPort;

    /// カメラAPIがこの環境で利用可能か
    ///
    /// falseの場合、取得は即座に`CameraUnsupported`で失敗する。
    fn is_supported(&self) -> bool;

    /// 指定された制約でストリームを開く
    ///
    /// # Returns
    /// - `Ok(Stream)`: 生ストリームの取得成功（寸法既知とは限らない）
    /// - `Err(PlatformError)`: 拒否（エラー名は分類のためverbatimで保持）
    fn open(&mut self, constraint: CameraConstraint) -> Result<Self::Stream, PlatformError>;
}

/// ビデオストリームポート: フレームソースの契約
///
/// 検出器とレンダラが必要とする「寸法既知」「サンプリング可能」の
/// 2つの準備状態を公開する。
pub trait VideoStreamPort {
    /// ピクセル寸法（既知になるまでNone）
    ///
    /// 寸法未知のストリームは検出器にもレンダラにも使えないため、
    /// 取得側は既知になるまで待機ゲートをかける。
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// フレームをサンプリングできるだけのデータがあるか
    fn is_ready(&self) -> bool;

    /// 再生を開始する
    ///
    /// # Arguments
    /// - `muted`: 自動再生ポリシー回避のための強制ミュート
    fn play(&mut self, muted: bool) -> Result<(), PlatformError>;

    /// 現在のフレームをサンプリングする
    fn sample_frame(&mut self) -> DomainResult<Frame>;
}

/// 検出ポート: 単一フレーム推論の契約
///
/// 呼び出しは セッションごとに厳密に直列化される（前の呼び出しが
/// 解決するまで同一tickで再発行されない）。ポーリング間隔よりモデルが
/// 遅い場合の推論リクエストの無制限キューイングを防ぐため。
///
/// 推論失敗に再試行はない。失敗したtickは「検出なし」として扱われ、
/// ロック状態を変更しない。
pub trait DetectorPort: Send {
    /// フレームを推論し、モデルのランキング順で検出結果を返す
    fn detect(&mut self, frame: &Frame) -> DomainResult<Vec<Detection>>;
}

/// モデルローダーポート: 検出モデルの非同期ロードを抽象化
///
/// ロード自体が失敗またはハングしうる。タイムアウトレースで包むのは
/// Acquirer側の責務。
pub trait ModelLoaderPort: Send + 'static {
    /// ロード完了時に得られるモデル型
    type Model: DetectorPort + Send + 'static;

    /// モデルをロードする（ブロッキング、バックグラウンドスレッドで実行される）
    fn load(self) -> DomainResult<Self::Model>;
}

/// 通知ポート: UI/音声コラボレータへのイベント送出を抽象化
///
/// 音声の重複抑止（自分の発話に被せない）はコラボレータ側の責務として
/// 委譲される。コアは`announce`フラグでクールダウン判定のみ伝える。
pub trait NotifierPort: Send {
    /// セッション開始（挨拶フレーズの契機）
    fn session_started(&mut self);

    /// このtickで選ばれた検出結果の描画指示（バウンディングボックス＋表示名）
    fn show_detection(&mut self, detection: &Detection, display_name: &str);

    /// 検出なしtickのオーバーレイ消去指示
    fn clear_detection(&mut self);

    /// オブジェクト発見イベント（ロックエピソードごとに1回）
    ///
    /// # Arguments
    /// - `announce`: クールダウンが許すときのみtrue（音声通知の契機）
    fn object_found(&mut self, label: &str, display_name: &str, announce: bool);

    /// オブジェクト喪失イベント
    fn object_lost(&mut self);

    /// 回収成功イベント（新しいスコアを運ぶ）
    fn collected(&mut self, new_score: u32);
}
