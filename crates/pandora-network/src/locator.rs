//! 백엔드 기본 URL 결정.
//!
//! 결정 순서:
//! 1. 수동 지정 URL: 프로브 없이 그대로 사용, 모든 탐색보다 우선
//! 2. 마지막으로 응답했던 URL: 다시 프로브해서 살아 있으면 사용
//! 3. 고정 후보 목록: 로컬 호스트면 포트 목록, 원격이면 same-origin → `api.` → `backend.`
//!
//! 후보는 순서대로 한 번씩만 프로브하며 재시도하지 않는다. 재결정 여부는 호출자가 정한다.
//! 사용자가 해제한 수동 URL은 다음 수동 지정 전까지 2, 3단계에서 건너뛴다.

use pandora_core::config::ServerConfig;
use pandora_core::error::CoreError;
use pandora_core::models::backend::{BackendEndpoint, EndpointSource};
use pandora_core::ports::kv_store::{keys, KeyValueStore};
use pandora_core::ports::probe::BackendProbe;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// 백엔드 탐색기
pub struct BackendLocator {
    store: Arc<dyn KeyValueStore>,
    probe: Arc<dyn BackendProbe>,
    candidates: Vec<String>,
    current: RwLock<Option<BackendEndpoint>>,
}

impl BackendLocator {
    /// 새 탐색기 생성: 후보 목록은 생성 시 한 번 계산
    pub fn new(
        config: &ServerConfig,
        store: Arc<dyn KeyValueStore>,
        probe: Arc<dyn BackendProbe>,
    ) -> Self {
        Self {
            store,
            probe,
            candidates: candidate_urls(config),
            current: RwLock::new(None),
        }
    }

    /// 자동 탐색 후보 (순서 유지)
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// 마지막으로 결정된 엔드포인트 (메모리)
    pub fn current(&self) -> Option<BackendEndpoint> {
        self.current.read().clone()
    }

    /// 메모리 결정 결과 폐기: 다음 호출에서 다시 결정
    pub fn invalidate(&self) {
        if self.current.write().take().is_some() {
            debug!("백엔드 결정 결과 폐기");
        }
    }

    /// 결정된 엔드포인트가 있으면 그대로, 없으면 `resolve()`
    pub async fn current_or_resolve(&self) -> Result<BackendEndpoint, CoreError> {
        if let Some(endpoint) = self.current() {
            return Ok(endpoint);
        }
        self.resolve().await
    }

    /// 수동 지정 URL
    pub fn manual_url(&self) -> Option<String> {
        match self.store.get(keys::MANUAL_BACKEND_URL) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!("수동 백엔드 URL 읽기 실패: {e}");
                None
            }
        }
    }

    /// 수동 URL 지정/해제
    ///
    /// 해제된 값은 자동 탐색 후보나 마지막 유효 URL과 같더라도 다시 결정되지 않는다.
    /// 새 수동 URL을 지정하면 이 제외가 풀린다.
    pub fn set_manual_url(&self, url: Option<&str>) -> Result<(), CoreError> {
        match url {
            Some(raw) => {
                let normalized = normalize_base_url(raw)?;
                self.store.set(keys::MANUAL_BACKEND_URL, &normalized)?;
                self.store.remove(keys::CLEARED_BACKEND_URL)?;
                info!("수동 백엔드 URL 설정: {normalized}");
            }
            None => {
                if let Some(cleared) = self.manual_url() {
                    self.store.remove(keys::MANUAL_BACKEND_URL)?;
                    self.store.set(keys::CLEARED_BACKEND_URL, &cleared)?;
                    if self.last_valid().is_some_and(|last| last.url == cleared) {
                        self.store.remove(keys::LAST_VALID_BACKEND)?;
                    }
                    info!("수동 백엔드 URL 해제: {cleared}");
                }
            }
        }
        self.invalidate();
        Ok(())
    }

    /// 해제되어 자동 탐색에서 제외된 URL
    pub fn cleared_url(&self) -> Option<String> {
        match self.store.get(keys::CLEARED_BACKEND_URL) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!("해제된 백엔드 URL 읽기 실패: {e}");
                None
            }
        }
    }

    /// 마지막으로 응답했던 엔드포인트
    pub fn last_valid(&self) -> Option<BackendEndpoint> {
        let raw = match self.store.get(keys::LAST_VALID_BACKEND) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("마지막 유효 백엔드 읽기 실패: {e}");
                return None;
            }
        };
        match serde_json::from_str::<BackendEndpoint>(&raw) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!("마지막 유효 백엔드 형식 오류, 무시: {e}");
                None
            }
        }
    }

    /// 마지막 유효 URL 삭제
    pub fn clear_last_valid(&self) -> Result<(), CoreError> {
        self.store.remove(keys::LAST_VALID_BACKEND)
    }

    /// 백엔드 결정
    pub async fn resolve(&self) -> Result<BackendEndpoint, CoreError> {
        if let Some(url) = self.manual_url() {
            let endpoint = BackendEndpoint::new(&url, EndpointSource::Manual);
            debug!("수동 백엔드 사용: {}", endpoint.url);
            return Ok(self.remember(endpoint));
        }

        let cleared = self.cleared_url();
        let mut tried: Vec<String> = Vec::new();

        if let Some(cached) = self
            .last_valid()
            .filter(|c| cleared.as_deref() != Some(c.url.as_str()))
        {
            if self.probe.probe(&cached.url).await.is_alive() {
                debug!("마지막 유효 백엔드 응답: {}", cached.url);
                let endpoint = BackendEndpoint {
                    source: EndpointSource::Cached,
                    ..cached
                };
                return Ok(self.remember(endpoint));
            }
            debug!("마지막 유효 백엔드 무응답: {}", cached.url);
            tried.push(cached.url);
        }

        for candidate in &self.candidates {
            if tried.contains(candidate) {
                continue;
            }
            if cleared.as_deref() == Some(candidate.as_str()) {
                debug!("해제된 수동 URL 건너뜀: {candidate}");
                continue;
            }
            if self.probe.probe(candidate).await.is_alive() {
                let endpoint = BackendEndpoint::new(candidate, EndpointSource::Auto);
                info!("백엔드 자동 발견: {}", endpoint.url);
                self.store_last_valid(&endpoint);
                return Ok(self.remember(endpoint));
            }
            tried.push(candidate.clone());
        }

        warn!("응답하는 백엔드 없음 (후보 {}개)", tried.len());
        Err(CoreError::BackendUnavailable(format!(
            "후보 {}개 모두 응답 없음: {}",
            tried.len(),
            tried.join(", ")
        )))
    }

    fn remember(&self, endpoint: BackendEndpoint) -> BackendEndpoint {
        *self.current.write() = Some(endpoint.clone());
        endpoint
    }

    fn store_last_valid(&self, endpoint: &BackendEndpoint) {
        // 수동 지정이 있으면 자동 발견 결과로 덮지 않는다
        if self.manual_url().is_some() {
            return;
        }
        let result = serde_json::to_string(endpoint)
            .map_err(CoreError::from)
            .and_then(|json| self.store.set(keys::LAST_VALID_BACKEND, &json));
        if let Err(e) = result {
            warn!("마지막 유효 백엔드 저장 실패: {e}");
        }
    }
}

/// 사용자 입력 URL 검증 및 정규화 (http/https만 허용, 끝 슬래시 제거)
pub fn normalize_base_url(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed).map_err(|e| CoreError::Validation {
        field: "backend_url".to_string(),
        message: format!("URL 파싱 실패: {e}"),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(CoreError::Validation {
            field: "backend_url".to_string(),
            message: format!("http(s) URL이 아님: {trimmed}"),
        });
    }

    Ok(trimmed.trim_end_matches('/').to_string())
}

fn is_local_host(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0" | "[::1]" | "::1")
        || host.ends_with(".localhost")
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn push_unique(out: &mut Vec<String>, url: String) {
    if !out.contains(&url) {
        out.push(url);
    }
}

/// 자동 탐색 후보 URL 생성
///
/// 환경별 `backend_url`이 있으면 맨 앞에 둔다. `app_origin`을 해석할 수 없으면
/// 그것만 후보가 된다.
pub fn candidate_urls(config: &ServerConfig) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    if let Some(preferred) = config.backend_url.as_deref() {
        match normalize_base_url(preferred) {
            Ok(url) => push_unique(&mut out, url),
            Err(e) => warn!("환경 백엔드 URL 무시: {e}"),
        }
    }

    let origin = match Url::parse(&config.app_origin) {
        Ok(origin) => origin,
        Err(e) => {
            warn!("app_origin 해석 실패 ({}): {e}", config.app_origin);
            return out;
        }
    };
    let Some(host) = origin.host_str() else {
        return out;
    };

    let scheme = origin.scheme();
    let prefix = normalize_prefix(&config.api_prefix);

    if is_local_host(host) {
        for port in &config.candidate_ports {
            push_unique(&mut out, format!("{scheme}://{host}:{port}{prefix}"));
        }
    } else {
        let port = origin.port().map(|p| format!(":{p}")).unwrap_or_default();
        let bare_host = host.strip_prefix("www.").unwrap_or(host);

        push_unique(&mut out, format!("{scheme}://{host}{port}{prefix}"));
        for sub in &config.candidate_subdomains {
            push_unique(&mut out, format!("{scheme}://{sub}.{bare_host}{port}{prefix}"));
        }
    }

    out
}
