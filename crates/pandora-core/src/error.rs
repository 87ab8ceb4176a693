//! Pandora 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 타입을 그대로 반환하거나 `#[from] CoreError`로 래핑한다.
//! [`CoreError::class`]로 네트워크/인증/인가 분류를 얻을 수 있다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 네트워크 에러 (연결 거부, DNS 실패 등)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 요청 타임아웃: 인증 실패가 아닌 네트워크 실패로 취급
    #[error("요청 타임아웃: {timeout_ms}ms 초과")]
    Timeout {
        /// 초과된 타임아웃 시간 (밀리초)
        timeout_ms: u64,
    },

    /// 인증 실패 (자격증명 오류, 세션 만료/무효)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 인가 실패 (인증은 되었으나 역할 부족)
    #[error("권한 부족: 필요 역할 {required:?}, 현재 역할 {actual:?}")]
    Authorization {
        /// 라우트가 요구하는 역할 목록
        required: Vec<String>,
        /// 사용자의 현재 역할
        actual: Option<String>,
    },

    /// 응답하는 백엔드 후보가 하나도 없음
    #[error("백엔드를 찾을 수 없음: {0}")]
    BackendUnavailable(String),

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 로컬 키-값 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 호출자에게 노출되는 에러 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// 일시적 실패: 백오프 재시도 가능
    Network,
    /// 자격증명 거부: 사용자 입력 없이 재시도 불가
    Authentication,
    /// 역할 부족: 별도 리다이렉트 사유로 노출
    Authorization,
    /// 그 외 (설정, 직렬화, 내부 에러)
    Other,
}

impl CoreError {
    /// 에러 분류
    pub fn class(&self) -> ErrorClass {
        match self {
            CoreError::Network(_)
            | CoreError::Timeout { .. }
            | CoreError::BackendUnavailable(_)
            | CoreError::ServiceUnavailable(_)
            | CoreError::RateLimit { .. } => ErrorClass::Network,
            CoreError::Auth(_) => ErrorClass::Authentication,
            CoreError::Authorization { .. } => ErrorClass::Authorization,
            _ => ErrorClass::Other,
        }
    }

    /// 재시도해도 안전한 일시적 에러인지
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Network
    }

    /// 401 계열: 세션 강등 사유가 되는 에러인지
    pub fn is_auth_rejection(&self) -> bool {
        self.class() == ErrorClass::Authentication
    }
}
