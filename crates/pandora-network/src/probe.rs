//! 디버그 경로 생존 확인.
//!
//! `BackendProbe` 포트 구현. 2xx와 401/403은 모두 "서버 프로세스 생존"으로 본다.

use async_trait::async_trait;
use pandora_core::error::CoreError;
use pandora_core::ports::probe::{BackendProbe, ProbeFailure, ProbeOutcome};
use std::time::Duration;
use tracing::debug;

/// reqwest 기반 프로브
pub struct HttpBackendProbe {
    client: reqwest::Client,
    debug_path: String,
}

impl HttpBackendProbe {
    /// 새 프로브 생성
    pub fn new(debug_path: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            debug_path: normalize_path(debug_path),
        })
    }

    fn url_for(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.debug_path)
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

/// 전송 에러 분류
fn classify(e: &reqwest::Error) -> ProbeFailure {
    if e.is_timeout() {
        ProbeFailure::Timeout
    } else if e.is_connect() {
        ProbeFailure::Refused
    } else {
        ProbeFailure::Other
    }
}

#[async_trait]
impl BackendProbe for HttpBackendProbe {
    async fn probe(&self, base_url: &str) -> ProbeOutcome {
        let url = self.url_for(base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => {
                let outcome = ProbeOutcome::from_status(resp.status().as_u16());
                debug!("프로브 {url}: {outcome:?}");
                outcome
            }
            Err(e) => {
                let failure = classify(&e);
                debug!("프로브 실패 {url}: {failure:?} ({e})");
                ProbeOutcome::Unreachable {
                    failure,
                    message: e.to_string(),
                }
            }
        }
    }
}
