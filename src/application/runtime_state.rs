//! ランタイム状態管理（Application層）
//!
//! 検出の有効/無効とアプリの可視状態を管理します。
//! `Arc<AtomicBool>`を使用したロックフリー設計により、
//! ゲームループは毎サイクル先頭で数CPUサイクルで状態を確認できます。

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// ランタイム状態（スレッド間で共有、ロックフリー）
///
/// 停止指示（`isDetecting = false`に相当）は、遅くともポーリングループの
/// 次サイクル先頭で観測される。実行中の推論呼び出しは強制中断されず、
/// 完了後にその結果が破棄される。
#[derive(Clone)]
pub struct RuntimeState {
    /// 検出が有効か
    detecting: Arc<AtomicBool>,
    /// アプリ（タブ）が可視か
    visible: Arc<AtomicBool>,
}

impl RuntimeState {
    /// 新しいRuntimeStateを作成（デフォルトで検出有効・可視）
    pub fn new() -> Self {
        Self {
            detecting: Arc::new(AtomicBool::new(true)),
            visible: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 検出が有効かどうかを確認（ロックフリー）
    #[inline]
    pub fn is_detecting(&self) -> bool {
        self.detecting.load(Ordering::Relaxed)
    }

    /// アプリが可視かどうかを確認（ロックフリー）
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }

    /// 検出を停止する
    pub fn stop_detecting(&self) {
        self.detecting.store(false, Ordering::Relaxed);
    }

    /// 検出を再開する
    #[allow(dead_code)]
    pub fn resume_detecting(&self) {
        self.detecting.store(true, Ordering::Relaxed);
    }

    /// 可視状態を設定する
    #[allow(dead_code)]
    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Relaxed);
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_state_stop_and_resume() {
        let state = RuntimeState::new();
        assert!(state.is_detecting());

        state.stop_detecting();
        assert!(!state.is_detecting());

        state.resume_detecting();
        assert!(state.is_detecting());
    }

    #[test]
    fn test_runtime_state_visibility() {
        let state = RuntimeState::new();
        assert!(state.is_visible());

        state.set_visible(false);
        assert!(!state.is_visible());
    }

    #[test]
    fn test_runtime_state_shared_between_clones() {
        let state = RuntimeState::new();
        let clone = state.clone();

        clone.stop_detecting();
        assert!(!state.is_detecting());
    }
}
