mod application;
mod domain;
mod infrastructure;
mod logging;

use crate::application::acquisition::{CameraAcquirer, ModelAcquisition};
use crate::application::game_loop::GameLoop;
use crate::application::runtime_state::RuntimeState;
use crate::domain::config::AppConfig;
use crate::domain::types::UserCommand;
use crate::infrastructure::console_notifier::ConsoleNotifier;
use crate::infrastructure::sim_camera::SimCamera;
use crate::infrastructure::sim_detector::{SimDetector, SimModelLoader};
use crate::logging::init_logging;
use std::path::PathBuf;
use std::time::Duration;

fn main() {
    // ログシステムの初期化（非同期ファイル出力）
    let log_dir = PathBuf::from("logs");
    let _guard = init_logging("info", false, Some(log_dir));
    // 注意: _guardはmain終了まで保持する必要がある（Dropでログスレッドが終了）

    tracing::info!("TidyQuest starting...");

    match run() {
        Ok(_) => {
            tracing::info!("TidyQuest terminated gracefully.");
        }
        Err(e) => {
            tracing::error!("Fatal error: {:?}", e);
            // 取得失敗はユーザー向けメッセージも出す
            if let Some(domain_err) = e.downcast_ref::<domain::error::DomainError>() {
                eprintln!("{}", domain_err.user_message());
            }
            std::process::exit(1);
        }
    }
}

/// アプリケーションのメイン処理
fn run() -> anyhow::Result<()> {
    // 設定ファイルの読み込み（存在しない場合はデフォルト設定を使用）
    let config = match AppConfig::from_file("config.toml") {
        Ok(config) => {
            tracing::info!("Loaded configuration from config.toml");
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load config.toml: {:?}, using defaults", e);
            AppConfig::default()
        }
    };

    config.validate()?;

    tracing::info!("Configuration validated successfully");
    tracing::info!(
        "Detection: interval={}ms, min_confidence={}, targets={}",
        config.detection.interval_ms,
        config.detection.min_confidence,
        config.detection.targets.len()
    );
    tracing::info!(
        "Stabilizer: lock_threshold={}, streak_cap={}",
        config.stabilizer.lock_threshold,
        config.stabilizer.streak_cap
    );

    // モデルロードをバックグラウンドで即座に開始する。
    // カメラの許可待ちとロード時間を重ねるため、カメラ取得より先に蹴る
    tracing::info!("Starting model load in background...");
    let loader = SimModelLoader::new(SimDetector::demo(), Duration::from_millis(300));
    let mut model_acquisition = ModelAcquisition::start(loader);

    // カメラストリームの取得（制約フォールバック＋準備ゲート）
    tracing::info!("Acquiring camera stream...");
    let mut camera = SimCamera::new().with_grants(vec![
        config
            .camera
            .preferences
            .last()
            .copied()
            .unwrap_or(crate::domain::config::CameraConstraint::Any),
    ]);
    let mut camera_acquirer = CameraAcquirer::new(&config.camera);
    let stream = camera_acquirer.acquire(&mut camera, &config.camera.preferences)?;

    // モデルハンドルの取得（タイムアウトレース）
    tracing::info!("Waiting for model...");
    let detector = model_acquisition.acquire(config.model.load_timeout())?;

    // ユーザーコマンドチャネル（UIコラボレータの代わりのデモドライバ）
    let (command_tx, command_rx) = crossbeam_channel::unbounded::<UserCommand>();
    let state = RuntimeState::new();

    // デモドライバ: ロック確定が見込まれる頃にCollectを送り、
    // しばらく遊んだら停止する
    let interval = config.detection.interval();
    std::thread::spawn(move || {
        std::thread::sleep(interval * 22);
        let _ = command_tx.send(UserCommand::Collect);

        std::thread::sleep(interval * 40);
        let _ = command_tx.send(UserCommand::Stop);
    });

    tracing::info!("Starting game loop...");
    let mut game_loop = GameLoop::new(
        stream,
        detector,
        ConsoleNotifier::new(),
        &config,
        state,
        command_rx,
    );
    game_loop.run();

    println!("Koniec gry! Punkty: {}", game_loop.session().score());
    Ok(())
}
