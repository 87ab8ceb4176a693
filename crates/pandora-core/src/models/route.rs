//! 라우트 게이트 판정 모델.

use serde::{Deserialize, Serialize};

/// 탐색 대상
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// 요청 경로 (쿼리 포함 가능)
    pub path: String,
    /// 요구 역할 (비어 있으면 인증만 필요)
    #[serde(default)]
    pub required_roles: Vec<String>,
}

impl RouteRequest {
    /// 인증만 요구하는 라우트
    pub fn protected(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            required_roles: Vec::new(),
        }
    }

    /// 역할 요구 추가
    pub fn requiring(mut self, role: impl Into<String>) -> Self {
        self.required_roles.push(role.into());
        self
    }
}

/// 로그인 리다이렉트 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// 로그인되지 않음
    Unauthenticated,
    /// 로그인되었으나 역할 부족
    Unauthorized,
    /// 세션 검증 자체가 실패
    AuthenticationError,
}

impl RedirectReason {
    /// 쿼리 파라미터에 쓰이는 사유 코드
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectReason::Unauthenticated => "unauthenticated",
            RedirectReason::Unauthorized => "unauthorized",
            RedirectReason::AuthenticationError => "authentication_error",
        }
    }

    /// 로그인 화면에 표시할 메시지
    pub fn message(&self) -> &'static str {
        match self {
            RedirectReason::Unauthenticated => "로그인이 필요합니다",
            RedirectReason::Unauthorized => "이 페이지에 접근할 권한이 없습니다",
            RedirectReason::AuthenticationError => "인증 확인 중 오류가 발생했습니다",
        }
    }
}

impl std::fmt::Display for RedirectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 라우트 게이트 판정 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteDecision {
    /// 보호된 콘텐츠 렌더링
    Render,
    /// 세션 확인 중: 로딩 표시
    Loading,
    /// 로그인으로 리다이렉트
    Redirect {
        /// 리다이렉트 사유
        reason: RedirectReason,
        /// 로그인 후 돌아갈 원래 경로
        return_to: String,
        /// 쿼리를 포함한 로그인 URL
        location: String,
    },
}

impl RouteDecision {
    pub fn is_render(&self) -> bool {
        matches!(self, RouteDecision::Render)
    }

    /// 리다이렉트 사유 (리다이렉트가 아니면 None)
    pub fn redirect_reason(&self) -> Option<RedirectReason> {
        match self {
            RouteDecision::Redirect { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
