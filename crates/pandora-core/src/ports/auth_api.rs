//! 인증 REST API 포트.
//!
//! 구현: `pandora-network::http_client::HttpAuthApi` (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::session::UserProfile;

/// 로그인/갱신 응답에서 얻는 만료 힌트
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenGrant {
    /// 세션 만료까지 남은 시간 (초), 서버가 알려준 경우
    pub expires_in_secs: Option<i64>,
}

/// 백엔드 인증 엔드포인트
///
/// 401/403은 `CoreError::Auth`, 타임아웃/연결 실패는 `CoreError::Timeout`/`CoreError::Network`로 반환해야 한다.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login/`: 자격증명 교환
    async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, CoreError>;

    /// `POST /auth/verify/`: 현재 세션 유효성
    async fn verify(&self) -> Result<(), CoreError>;

    /// `POST /auth/refresh/`: 조용한 토큰 갱신
    async fn refresh(&self) -> Result<TokenGrant, CoreError>;

    /// `POST /auth/logout/`: best-effort 로그아웃 통지
    async fn logout(&self) -> Result<(), CoreError>;

    /// 프로필 조회
    async fn fetch_profile(&self) -> Result<UserProfile, CoreError>;
}
