//! # pandora-network
//!
//! REST 백엔드와의 HTTP 통신 어댑터.
//!
//! - [`probe`] — 디버그 경로 생존 확인 (`BackendProbe` 구현)
//! - [`locator`] — 백엔드 기본 URL 결정 (수동 > 마지막 유효 > 후보 프로브)
//! - [`connectivity`] — 스로틀된 연결 상태 확인 및 브로드캐스트
//! - [`http_client`] — 인증 REST 클라이언트 (`AuthApi` 구현)
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! let probe = Arc::new(HttpBackendProbe::new(&config.server.debug_path, config.timeouts.probe())?);
//! let locator = Arc::new(BackendLocator::new(&config.server, store, probe.clone()));
//! let prober = ConnectivityProber::new(locator.clone(), probe, config.connectivity.throttle_window());
//! let status = prober.check(false).await;
//! ```

pub mod connectivity;
pub mod http_client;
pub mod locator;
pub mod probe;

use pandora_core::error::CoreError;
use std::time::Duration;

/// reqwest 에러를 코어 에러로 매핑: 타임아웃은 인증 실패가 아닌 네트워크 실패
pub(crate) fn map_transport_error(e: reqwest::Error, timeout: Duration, context: &str) -> CoreError {
    if e.is_timeout() {
        CoreError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        CoreError::Network(format!("{context}: {e}"))
    }
}
