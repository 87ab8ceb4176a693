//! # pandora-session
//!
//! 클라이언트 측 인증 세션 라이프사이클.
//!
//! - [`store`] — 인증 세션 상태 머신 (부팅 검증, 로그인, 로그아웃, 갱신, 역할 확인)
//! - [`lifecycle`] — 인증 상태에 묶인 갱신/만료 알림/활동 디바운스 타이머
//! - [`route_gate`] — 탐색마다 렌더/로딩/리다이렉트 판정
//! - [`status_indicator`] — 연결/인증 상태 표시와 재폴링 백오프

pub mod lifecycle;
pub mod route_gate;
pub mod status_indicator;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
