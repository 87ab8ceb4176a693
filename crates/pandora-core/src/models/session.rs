//! 인증 세션 모델.
//!
//! `AuthSession`은 생성자를 통해서만 만들어지며
//! `is_authenticated() == user().is_some()` 불변식을 유지한다.

use serde::{Deserialize, Serialize};

/// 백엔드 프로필 엔드포인트가 반환하는 사용자 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// 사용자 ID (숫자 ID도 문자열로 정규화)
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// 표시 이름
    #[serde(default, alias = "username")]
    pub name: String,
    /// 이메일
    #[serde(default)]
    pub email: String,
    /// 역할 (예: "admin", "editor")
    #[serde(default)]
    pub role: String,
}

impl UserProfile {
    /// 역할 일치 여부 (대소문자/공백 무시)
    pub fn has_role(&self, role: &str) -> bool {
        self.role.trim().eq_ignore_ascii_case(role.trim())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "사용자 ID 형식 오류: {other}"
        ))),
    }
}

/// 세션 상태 머신 단계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// 부팅 직후
    #[default]
    Uninitialized,
    /// 세션 검증 중
    Checking,
    /// 인증됨
    Authenticated,
    /// 인증되지 않음
    Unauthenticated,
    /// 검증 자체가 실패함 (네트워크 등)
    Error,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionPhase::Uninitialized => "uninitialized",
            SessionPhase::Checking => "checking",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Unauthenticated => "unauthenticated",
            SessionPhase::Error => "error",
        };
        f.write_str(s)
    }
}

/// 클라이언트 측 인증 세션
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    phase: SessionPhase,
    user: Option<UserProfile>,
    is_loading: bool,
    error: Option<String>,
}

impl AuthSession {
    /// 부팅 직후 상태
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// 세션 검증 중
    pub fn checking() -> Self {
        Self {
            phase: SessionPhase::Checking,
            user: None,
            is_loading: true,
            error: None,
        }
    }

    /// 인증 완료
    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            phase: SessionPhase::Authenticated,
            user: Some(user),
            is_loading: false,
            error: None,
        }
    }

    /// 미인증 (로그아웃, 세션 만료)
    pub fn unauthenticated(error: Option<String>) -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            user: None,
            is_loading: false,
            error,
        }
    }

    /// 검증 실패 (네트워크 등)
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            phase: SessionPhase::Error,
            user: None,
            is_loading: false,
            error: Some(error.into()),
        }
    }

    /// 단계/사용자는 유지하고 로딩 플래그만 변경
    pub fn with_loading(mut self, is_loading: bool) -> Self {
        self.is_loading = is_loading;
        self
    }

    /// 단계/사용자는 유지하고 에러만 변경
    pub fn with_error(mut self, error: Option<String>) -> Self {
        self.error = error;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// 현재 사용자가 역할을 가졌는지 (미인증이면 false)
    pub fn has_role(&self, role: &str) -> bool {
        self.user.as_ref().is_some_and(|u| u.has_role(role))
    }

    /// 역할 목록 중 하나라도 가졌는지 (빈 목록이면 인증 여부만 확인)
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        match &self.user {
            None => false,
            Some(_) if roles.is_empty() => true,
            Some(user) => roles.iter().any(|r| user.has_role(r.as_ref())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> UserProfile {
        UserProfile {
            id: "42".to_string(),
            name: "Luis".to_string(),
            email: "luis@pandora.test".to_string(),
            role: "editor".to_string(),
        }
    }

    #[test]
    fn authenticated_iff_user_present() {
        assert!(!AuthSession::uninitialized().is_authenticated());
        assert!(!AuthSession::checking().is_authenticated());
        assert!(!AuthSession::failed("timeout").is_authenticated());

        let session = AuthSession::authenticated(editor());
        assert!(session.is_authenticated());
        assert_eq!(session.phase(), SessionPhase::Authenticated);

        let session = session.with_error(Some("로그인 실패".to_string()));
        assert!(session.is_authenticated());
        assert_eq!(session.error(), Some("로그인 실패"));
    }

    #[test]
    fn role_predicates() {
        let session = AuthSession::authenticated(editor());
        assert!(session.has_role("editor"));
        assert!(session.has_role(" Editor "));
        assert!(!session.has_role("admin"));
        assert!(session.has_any_role(&["admin", "editor"]));
        assert!(!session.has_any_role(&["admin"]));

        let anonymous = AuthSession::unauthenticated(None);
        assert!(!anonymous.has_role("editor"));
        assert!(!anonymous.has_any_role::<&str>(&[]));
    }

    #[test]
    fn profile_accepts_numeric_id_and_username() {
        let json = r#"{"id": 12, "username": "marta", "email": "m@x.test", "role": "admin"}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.id, "12");
        assert_eq!(profile.name, "marta");
        assert!(profile.has_role("admin"));
    }
}
