//! 라우트 게이트.
//!
//! 탐색마다 [`RouteDecision`]을 계산한다. 판정 순서:
//! 비상 모드 → 로그인 라우트 → 세션 확인 중 → 검증 에러 → 미인증 → 역할 부족 → 렌더.
//!
//! 비상 모드는 저장소 플래그로 켜는 운영용 탈출구이며 보안 경계가 아니다.
//! 실제 권한 검사는 항상 백엔드가 수행한다.

use pandora_core::error::CoreError;
use pandora_core::models::route::{RedirectReason, RouteDecision, RouteRequest};
use pandora_core::models::session::{AuthSession, SessionPhase};
use pandora_core::ports::kv_store::{keys, KeyValueStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// 라우트 게이트
pub struct RouteGate {
    store: Arc<dyn KeyValueStore>,
    login_route: String,
}

impl RouteGate {
    pub fn new(store: Arc<dyn KeyValueStore>, login_route: impl Into<String>) -> Self {
        Self {
            store,
            login_route: login_route.into(),
        }
    }

    /// 로그인 라우트 경로
    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// 비상 우회 플래그가 켜져 있는지
    ///
    /// 비어 있지 않고 `false`/`0`이 아닌 값이면 켜진 것으로 본다.
    /// 저장소를 읽지 못하면 꺼진 것으로 본다.
    pub fn emergency_mode(&self) -> bool {
        match self.store.get(keys::EMERGENCY_MODE) {
            Ok(Some(value)) => {
                let value = value.trim();
                !value.is_empty()
                    && !value.eq_ignore_ascii_case("false")
                    && value != "0"
            }
            Ok(None) => false,
            Err(e) => {
                warn!("비상 모드 플래그 읽기 실패: {e}");
                false
            }
        }
    }

    /// 비상 우회 플래그 설정/해제
    pub fn set_emergency_mode(&self, enabled: bool) -> Result<(), CoreError> {
        if enabled {
            warn!("비상 모드 활성화: 모든 라우트가 인증 없이 렌더링됨");
            self.store.set(keys::EMERGENCY_MODE, "true")
        } else {
            self.store.remove(keys::EMERGENCY_MODE)
        }
    }

    /// 라우트 판정
    pub fn decide(&self, route: &RouteRequest, session: &AuthSession) -> RouteDecision {
        if self.emergency_mode() {
            warn!("비상 모드로 인증 검사 우회: {}", route.path);
            return RouteDecision::Render;
        }
        if self.is_login_route(&route.path) {
            return RouteDecision::Render;
        }

        let reason = match session.phase() {
            SessionPhase::Uninitialized | SessionPhase::Checking => {
                return RouteDecision::Loading;
            }
            SessionPhase::Error => RedirectReason::AuthenticationError,
            _ if !session.is_authenticated() => RedirectReason::Unauthenticated,
            _ if !session.has_any_role(route.required_roles.as_slice()) => RedirectReason::Unauthorized,
            _ => return RouteDecision::Render,
        };

        debug!("라우트 리다이렉트: {} ({reason})", route.path);
        RouteDecision::Redirect {
            reason,
            return_to: route.path.clone(),
            location: self.login_location(reason, &route.path),
        }
    }

    /// 판정을 에러 값으로 변환
    ///
    /// 렌더가 아니면 실패한다. 역할 부족은 [`CoreError::Authorization`].
    pub fn authorize(&self, route: &RouteRequest, session: &AuthSession) -> Result<(), CoreError> {
        match self.decide(route, session) {
            RouteDecision::Render => Ok(()),
            RouteDecision::Loading => Err(CoreError::Auth("세션 확인 중".to_string())),
            RouteDecision::Redirect { reason, .. } => match reason {
                RedirectReason::Unauthorized => Err(CoreError::Authorization {
                    required: route.required_roles.clone(),
                    actual: session.user().map(|u| u.role.clone()),
                }),
                other => Err(CoreError::Auth(other.message().to_string())),
            },
        }
    }

    /// 사유와 복귀 경로를 쿼리로 붙인 로그인 URL
    pub fn login_location(&self, reason: RedirectReason, return_to: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("reason", reason.as_str())
            .append_pair("next", return_to)
            .finish();
        format!("{}?{query}", self.login_route)
    }

    fn is_login_route(&self, path: &str) -> bool {
        let path = path.split(['?', '#']).next().unwrap_or(path);
        path.trim_end_matches('/') == self.login_route.trim_end_matches('/')
    }
}
