//! コンソール通知アダプタ
//!
//! UIオーバーレイと音声合成の代わりに標準出力へイベントを描画する。
//! 音声通知に相当する行は`announce`がtrueのときだけ出力される
//! （クールダウン判定はコアが行い、ここは従うだけ）。

use crate::domain::ports::NotifierPort;
use crate::domain::types::Detection;

/// コンソール通知アダプタ
pub struct ConsoleNotifier {
    /// 直前のtickでオーバーレイを描画したか（消去行の連発を防ぐ）
    overlay_visible: bool,
}

impl ConsoleNotifier {
    /// 新しいコンソール通知アダプタを作成
    pub fn new() -> Self {
        Self {
            overlay_visible: false,
        }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifierPort for ConsoleNotifier {
    fn session_started(&mut self) {
        println!("🔊 Cześć! Poszukajmy bałaganu do posprzątania. Rozejrzyj się!");
    }

    fn show_detection(&mut self, detection: &Detection, display_name: &str) {
        self.overlay_visible = true;
        println!(
            "👀 {} ({:.0}%) [x={:.0} y={:.0} w={:.0} h={:.0}]",
            display_name,
            detection.score * 100.0,
            detection.bbox.x,
            detection.bbox.y,
            detection.bbox.width,
            detection.bbox.height,
        );
    }

    fn clear_detection(&mut self) {
        if self.overlay_visible {
            self.overlay_visible = false;
            println!("   (nic nie widzę...)");
        }
    }

    fn object_found(&mut self, label: &str, display_name: &str, announce: bool) {
        println!("✨ Widzę {}! Posprzątaj to!", display_name);
        if announce {
            println!("🔊 O! Widzę {}. Szybko, zanieś na miejsce!", display_name);
        }
        tracing::info!(label, announce, "ConsoleNotifier: object found");
    }

    fn object_lost(&mut self) {
        println!("💨 Obiekt zniknął, szukamy dalej...");
    }

    fn collected(&mut self, new_score: u32) {
        println!("⭐ Punkty: {}", new_score);
        println!("🔊 Super! Dobra robota! Szukamy dalej!");
    }
}
