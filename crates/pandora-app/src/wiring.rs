//! 의존성 조립.
//!
//! 설정 하나로 저장소 → 프로브 → 탐색기 → 연결 확인기 → 인증 클라이언트 →
//! 세션 저장소 → 타이머/게이트/상태 표시 순서로 만든다.

use anyhow::{Context, Result};
use pandora_core::config::AppConfig;
use pandora_core::ports::kv_store::KeyValueStore;
use pandora_core::ports::notifier::SessionNotifier;
use pandora_network::connectivity::ConnectivityProber;
use pandora_network::http_client::HttpAuthApi;
use pandora_network::locator::BackendLocator;
use pandora_network::probe::HttpBackendProbe;
use pandora_session::lifecycle::SessionLifecycleManager;
use pandora_session::route_gate::RouteGate;
use pandora_session::status_indicator::StatusIndicator;
use pandora_session::store::AuthSessionStore;
use pandora_storage::JsonFileStore;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 조립된 클라이언트 구성요소
pub struct App {
    pub locator: Arc<BackendLocator>,
    pub prober: Arc<ConnectivityProber>,
    pub session: Arc<AuthSessionStore>,
    pub lifecycle: Arc<SessionLifecycleManager>,
    pub gate: RouteGate,
    pub indicator: Arc<StatusIndicator>,
}

impl App {
    /// `data_dir`의 저장소 파일을 열고 모든 구성요소 생성
    pub fn build(
        config: &AppConfig,
        data_dir: &Path,
        notifier: Arc<dyn SessionNotifier>,
    ) -> Result<Self> {
        let kv: Arc<dyn KeyValueStore> = Arc::new(
            JsonFileStore::open_in(data_dir)
                .with_context(|| format!("저장소 열기 실패: {}", data_dir.display()))?,
        );

        let probe = Arc::new(HttpBackendProbe::new(
            &config.server.debug_path,
            config.timeouts.probe(),
        )?);
        let locator = Arc::new(BackendLocator::new(&config.server, kv.clone(), probe.clone()));
        let prober = Arc::new(ConnectivityProber::new(
            locator.clone(),
            probe,
            config.connectivity.throttle_window(),
        ));

        let api = Arc::new(HttpAuthApi::new(
            locator.clone(),
            &config.server,
            config.timeouts.clone(),
        )?);
        let session = Arc::new(AuthSessionStore::new(api, &config.session, &config.auth));
        let lifecycle = Arc::new(SessionLifecycleManager::new(
            session.clone(),
            notifier,
            config.session.clone(),
        ));
        let gate = RouteGate::new(kv, config.server.login_route.clone());
        let indicator = Arc::new(StatusIndicator::new(
            prober.clone(),
            session.clone(),
            config.connectivity.backoff(),
            config.connectivity.healthy_poll(),
        ));

        info!(
            "구성 완료: 후보 {}개, 수동 URL {:?}",
            locator.candidates().len(),
            locator.manual_url()
        );

        Ok(Self {
            locator,
            prober,
            session,
            lifecycle,
            gate,
            indicator,
        })
    }
}
