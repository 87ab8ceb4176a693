//! # pandora-app
//!
//! Pandora 관리 클라이언트 바이너리 진입점.
//! DI 조립, CLI 명령 처리, 세션/연결 라이프사이클 실행.

mod lifecycle;
mod notifier;
mod wiring;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pandora_core::config_manager::ConfigManager;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;
use crate::notifier::LoggingNotifier;
use crate::wiring::App;

/// 로그인 비밀번호 환경변수 (`--password` 미지정 시)
const ENV_PASSWORD: &str = "PANDORA_PASSWORD";

/// Pandora 관리 클라이언트
///
/// 백엔드 탐색, 연결 상태 확인, 인증 세션 관리
#[derive(Parser, Debug)]
#[command(name = "pandora")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 저장소 디렉토리 (기본: 플랫폼 데이터 디렉토리)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 백엔드 연결과 세션 상태를 확인하고 JSON으로 출력
    Status,
    /// 수동 백엔드 URL 관리
    Backend {
        #[command(subcommand)]
        action: BackendAction,
    },
    /// 비상 우회 모드 켜기/끄기 (보안 경계 아님)
    Emergency {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// 자격증명으로 로그인하고 사용자 정보 출력
    Login {
        #[arg(long, short = 'u')]
        username: String,
        /// 생략하면 PANDORA_PASSWORD 환경변수 사용
        #[arg(long, short = 'p')]
        password: Option<String>,
    },
    /// 세션 복구 후 타이머와 상태 폴링을 종료 신호까지 실행
    Run,
}

#[derive(Subcommand, Debug)]
enum BackendAction {
    /// 수동 URL 지정 (자동 탐색보다 우선)
    Set { url: String },
    /// 수동 URL 해제
    Clear,
    /// 현재 설정과 후보 목록 출력
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Toggle {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "pandora={lvl},pandora_app={lvl},pandora_core={lvl},pandora_storage={lvl},pandora_network={lvl},pandora_session={lvl}",
        lvl = args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    let config_manager = match args.config.clone() {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    let config = config_manager.get();
    let data_dir = match args.data_dir.clone() {
        Some(dir) => dir,
        None => ConfigManager::data_dir()?,
    };
    info!(
        "설정: {}, 저장소: {}",
        config_manager.config_path().display(),
        data_dir.display()
    );

    let app = App::build(&config, &data_dir, Arc::new(LoggingNotifier))?;

    match args.command {
        Command::Status => status(&app).await,
        Command::Backend { action } => backend(&app, action),
        Command::Emergency { state } => {
            app.gate.set_emergency_mode(matches!(state, Toggle::On))?;
            println!(
                "비상 모드: {}",
                if app.gate.emergency_mode() { "켜짐" } else { "꺼짐" }
            );
            Ok(())
        }
        Command::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => std::env::var(ENV_PASSWORD)
                    .map_err(|_| anyhow!("--password 또는 {ENV_PASSWORD} 가 필요합니다"))?,
            };
            login(&app, &username, &password).await
        }
        Command::Run => run(app).await,
    }
}

async fn status(app: &App) -> Result<()> {
    app.indicator.poll(true).await;
    if app.prober.last_status().is_some_and(|s| s.connected) {
        app.session.initialize().await;
    }
    let view = app.indicator.view();
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn backend(app: &App, action: BackendAction) -> Result<()> {
    match action {
        BackendAction::Set { url } => {
            app.locator.set_manual_url(Some(&url))?;
            println!("수동 백엔드 URL: {}", app.locator.manual_url().unwrap_or_default());
        }
        BackendAction::Clear => {
            app.locator.set_manual_url(None)?;
            println!("수동 백엔드 URL 해제됨");
        }
        BackendAction::Show => {
            let summary = serde_json::json!({
                "manual_url": app.locator.manual_url(),
                "last_valid": app.locator.last_valid(),
                "cleared_url": app.locator.cleared_url(),
                "candidates": app.locator.candidates(),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}

async fn login(app: &App, username: &str, password: &str) -> Result<()> {
    let status = app.prober.check(true).await;
    if !status.connected {
        return Err(anyhow!("백엔드 연결 실패: {}", status.message));
    }
    app.session.initialize().await;
    let user = app.session.login(username, password).await?;
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

async fn run(app: App) -> Result<()> {
    let lifecycle = LifecycleManager::new();

    // 부팅 순서: 백엔드 결정 → 연결 확인 → 세션 복구
    let status = app.prober.check(true).await;
    if status.connected {
        info!("{}", status.message);
    } else {
        warn!("{}", status.message);
    }
    let session = app.session.initialize().await;
    info!("세션 복구 결과: {}", session.phase());

    let timers = tokio::spawn(app.lifecycle.clone().run(lifecycle.subscribe()));
    let poller = tokio::spawn({
        let indicator = app.indicator.clone();
        let shutdown_rx = lifecycle.subscribe();
        async move { indicator.run(shutdown_rx).await }
    });
    let banner = tokio::spawn({
        let mut view_rx = app.indicator.subscribe();
        let mut shutdown_rx = lifecycle.subscribe();
        async move {
            let mut last = String::new();
            loop {
                tokio::select! {
                    changed = view_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let banner = view_rx.borrow_and_update().banner.clone();
                        if banner != last {
                            info!("[상태] {banner}");
                            last = banner;
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        }
    });

    lifecycle.wait_for_signal().await?;

    for (name, handle) in [("세션 타이머", timers), ("상태 폴링", poller), ("상태 로그", banner)] {
        if let Err(e) = handle.await {
            warn!("{name} 태스크 종료 실패: {e}");
        }
    }
    info!("Pandora 클라이언트 종료");
    Ok(())
}
