//! # pandora-core
//!
//! Pandora 관리 클라이언트의 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 백엔드 엔드포인트, 연결 상태, 인증 세션, 라우트 판정
//! - [`ports`] — Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`config`] — 애플리케이션 설정 구조체
//! - [`config_manager`] — 설정 파일 관리 (로드/저장)
//! - [`throttle`] — 프로브/갱신/검증 경로가 공유하는 최소 간격 제한기

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
pub mod throttle;

#[cfg(test)]
mod tests {
    use crate::models::session::{AuthSession, UserProfile};

    #[test]
    fn config_defaults() {
        let config = crate::config::AppConfig::default();
        assert_eq!(config.connectivity.throttle_window_ms, 30_000);
        assert_eq!(config.session.refresh_interval_ms, 30 * 60 * 1_000);
        assert_eq!(config.session.min_refresh_interval_ms, 60_000);
        assert_eq!(config.server.candidate_ports, vec![8000, 3000, 8080]);
        assert!(config.auth.auto_login.is_none());
    }

    #[test]
    fn session_serde_roundtrip_keeps_invariant() {
        let session = AuthSession::authenticated(UserProfile {
            id: "7".to_string(),
            name: "Ana Torres".to_string(),
            email: "ana@pandora.test".to_string(),
            role: "admin".to_string(),
        });

        let json = serde_json::to_string(&session).unwrap();
        let restored: AuthSession = serde_json::from_str(&json).unwrap();

        assert!(restored.is_authenticated());
        assert_eq!(restored.user().map(|u| u.id.as_str()), Some("7"));
    }
}
