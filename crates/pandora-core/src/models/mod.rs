//! 도메인 모델.
//!
//! 모든 구조체는 serde Serialize/Deserialize를 지원한다.

pub mod backend;
pub mod connection;
pub mod route;
pub mod session;
