//! シミュレーションカメラアダプタ
//!
//! 開発・デモ用のカメラ実装。実デバイスの代わりに合成フレームを生成し、
//! 制約拒否・寸法遅延・自動再生ブロックといった実機で起きる挙動を
//! 再現できる。
//!
//! 実際のプラットフォームエラー名（NotAllowedError等）をverbatimで
//! 返すため、取得チェーンの分類ロジックをそのまま通せる。

use std::time::{Duration, Instant};

use crate::domain::config::CameraConstraint;
use crate::domain::error::{DomainError, DomainResult, PlatformError};
use crate::domain::ports::{CameraPort, VideoStreamPort};
use crate::domain::types::Frame;

/// シミュレーションカメラ
pub struct SimCamera {
    supported: bool,
    /// ストリームを許可する制約の集合（それ以外は拒否）
    grants: Vec<CameraConstraint>,
    /// 拒否時に返すプラットフォームエラー名
    rejection_name: String,
    /// 寸法既知シグナルまでの遅延
    dimensions_delay: Duration,
    /// ミュートなし再生をブロックする（自動再生ポリシーの再現）
    block_unmuted_play: bool,
    width: u32,
    height: u32,
}

impl SimCamera {
    /// デフォルトのシミュレーションカメラを作成
    ///
    /// 背面カメラ（厳密一致）のみ許可し、寸法は即座に既知になる。
    pub fn new() -> Self {
        Self {
            supported: true,
            grants: vec![CameraConstraint::RearExact],
            rejection_name: "OverconstrainedError".to_string(),
            dimensions_delay: Duration::ZERO,
            block_unmuted_play: false,
            width: 640,
            height: 480,
        }
    }

    /// 許可する制約を指定
    pub fn with_grants(mut self, grants: Vec<CameraConstraint>) -> Self {
        self.grants = grants;
        self
    }

    /// 拒否時のプラットフォームエラー名を指定
    pub fn with_rejection(mut self, name: impl Into<String>) -> Self {
        self.rejection_name = name.into();
        self
    }

    /// 寸法既知シグナルの遅延を指定
    pub fn with_dimensions_delay(mut self, delay: Duration) -> Self {
        self.dimensions_delay = delay;
        self
    }

    /// ミュートなし再生をブロックする
    pub fn with_autoplay_block(mut self) -> Self {
        self.block_unmuted_play = true;
        self
    }

    /// カメラAPI自体を利用不可にする
    #[allow(dead_code)]
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }
}

impl Default for SimCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraPort for SimCamera {
    type Stream = SimStream;

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn open(&mut self, constraint: CameraConstraint) -> Result<SimStream, PlatformError> {
        if !self.grants.contains(&constraint) {
            return Err(PlatformError::new(
                self.rejection_name.clone(),
                format!("constraint {:?} not satisfiable", constraint),
            ));
        }

        tracing::debug!(?constraint, "SimCamera: stream granted");
        Ok(SimStream {
            opened_at: Instant::now(),
            dimensions_delay: self.dimensions_delay,
            block_unmuted_play: self.block_unmuted_play,
            playing: false,
            muted: false,
            width: self.width,
            height: self.height,
            frame_counter: 0,
        })
    }
}

/// シミュレーションビデオストリーム
///
/// 単色の合成フレームを生成する。フレームごとに先頭バイトを変えて
/// 呼び出しごとの差分を作る。
#[derive(Debug)]
pub struct SimStream {
    opened_at: Instant,
    dimensions_delay: Duration,
    block_unmuted_play: bool,
    playing: bool,
    muted: bool,
    width: u32,
    height: u32,
    frame_counter: u64,
}

impl SimStream {
    /// ミュート状態で再生中か
    #[allow(dead_code)]
    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

impl VideoStreamPort for SimStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        if self.opened_at.elapsed() >= self.dimensions_delay {
            Some((self.width, self.height))
        } else {
            None
        }
    }

    fn is_ready(&self) -> bool {
        self.playing && self.dimensions().is_some()
    }

    fn play(&mut self, muted: bool) -> Result<(), PlatformError> {
        if self.block_unmuted_play && !muted {
            return Err(PlatformError::new(
                "NotAllowedError",
                "play() failed because the user didn't interact with the document first",
            ));
        }
        self.playing = true;
        self.muted = muted;
        tracing::debug!(muted, "SimStream: playback started");
        Ok(())
    }

    fn sample_frame(&mut self) -> DomainResult<Frame> {
        if !self.is_ready() {
            return Err(DomainError::FrameSampling {
                reason: "stream not ready".to_string(),
            });
        }

        self.frame_counter += 1;
        let mut data = vec![0x80u8; (self.width * self.height * 4) as usize];
        data[0] = (self.frame_counter & 0xFF) as u8;

        Ok(Frame::new(data, self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_camera_grants_configured_constraint() {
        let mut camera = SimCamera::new().with_grants(vec![CameraConstraint::Any]);

        assert!(camera.open(CameraConstraint::RearExact).is_err());
        assert!(camera.open(CameraConstraint::Any).is_ok());
    }

    #[test]
    fn test_sim_camera_rejection_preserves_error_name() {
        let mut camera = SimCamera::new()
            .with_grants(vec![])
            .with_rejection("NotAllowedError");

        let err = camera.open(CameraConstraint::Any).unwrap_err();
        assert_eq!(err.name, "NotAllowedError");
    }

    #[test]
    fn test_sim_stream_requires_play_before_sampling() {
        let mut camera = SimCamera::new();
        let mut stream = camera.open(CameraConstraint::RearExact).unwrap();

        assert!(stream.sample_frame().is_err());

        stream.play(false).unwrap();
        let frame = stream.sample_frame().unwrap();
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
    }

    #[test]
    fn test_autoplay_block_allows_muted_playback() {
        let mut camera = SimCamera::new().with_autoplay_block();
        let mut stream = camera.open(CameraConstraint::RearExact).unwrap();

        assert!(stream.play(false).is_err());
        assert!(stream.play(true).is_ok());
        assert!(stream.is_muted());
    }

    #[test]
    fn test_dimensions_delay() {
        let mut camera =
            SimCamera::new().with_dimensions_delay(Duration::from_millis(30));
        let stream = camera.open(CameraConstraint::RearExact).unwrap();

        assert!(stream.dimensions().is_none());
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(stream.dimensions(), Some((640, 480)));
    }
}
