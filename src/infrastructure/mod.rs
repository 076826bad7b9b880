//! Infrastructure層: 外部コラボレータの実装
//!
//! Domain層のPortトレイトを実装する。実機のカメラ・検出モデル・UIの
//! 代わりに、挙動を台本で制御できるシミュレーションアダプタを提供する。

pub mod console_notifier;
pub mod sim_camera;
pub mod sim_detector;
