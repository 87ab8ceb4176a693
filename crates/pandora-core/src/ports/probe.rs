//! 백엔드 생존 확인 포트.
//!
//! 구현: `pandora-network::probe::HttpBackendProbe`

use async_trait::async_trait;

/// 도달 실패 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// 연결 거부 (프로세스 없음)
    Refused,
    /// 타임아웃
    Timeout,
    /// 그 외 네트워크 실패 (DNS, TLS 등)
    Other,
}

/// 디버그 경로 프로브 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 서버 프로세스 생존 (2xx 또는 401/403)
    Alive {
        /// HTTP 상태 코드
        status: u16,
    },
    /// 응답은 왔으나 살아 있는 백엔드로 인정할 수 없는 상태 코드
    Rejected {
        /// HTTP 상태 코드
        status: u16,
    },
    /// 도달 불가
    Unreachable {
        /// 실패 종류
        failure: ProbeFailure,
        /// 원본 에러 메시지
        message: String,
    },
}

impl ProbeOutcome {
    /// 상태 코드로 분류: 2xx, 401, 403이면 생존
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) || status == 401 || status == 403 {
            ProbeOutcome::Alive { status }
        } else {
            ProbeOutcome::Rejected { status }
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self, ProbeOutcome::Alive { .. })
    }
}

/// 백엔드 기본 URL 하나에 대한 경량 생존 확인
#[async_trait]
pub trait BackendProbe: Send + Sync {
    /// `base_url`의 디버그 경로를 한 번 요청
    async fn probe(&self, base_url: &str) -> ProbeOutcome;
}
