//! 백엔드 엔드포인트 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 엔드포인트 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointSource {
    /// 사용자가 직접 지정한 URL (모든 탐색보다 우선)
    Manual,
    /// 후보 프로브로 자동 발견
    Auto,
    /// 이전에 응답했던 마지막 유효 URL
    Cached,
}

impl std::fmt::Display for EndpointSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointSource::Manual => write!(f, "manual"),
            EndpointSource::Auto => write!(f, "auto"),
            EndpointSource::Cached => write!(f, "cached"),
        }
    }
}

/// REST 백엔드 기본 URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendEndpoint {
    /// 기본 URL (끝 슬래시 없음)
    pub url: String,
    /// 출처
    pub source: EndpointSource,
    /// 발견 시각
    pub discovered_at: DateTime<Utc>,
}

impl BackendEndpoint {
    /// 현재 시각으로 엔드포인트 생성
    pub fn new(url: &str, source: EndpointSource) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            source,
            discovered_at: Utc::now(),
        }
    }

    /// 기본 URL에 경로를 붙인 전체 URL
    pub fn join(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.url, path)
        } else {
            format!("{}/{}", self.url, path)
        }
    }
}
