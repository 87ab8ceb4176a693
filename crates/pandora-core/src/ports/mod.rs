//! 포트 인터페이스 (trait).
//!
//! Hexagonal Architecture의 포트 레이어.
//! 어댑터 crate가 이 trait들을 구현하며, `pandora-app`에서 `Arc<dyn T>`로 와이어링한다.
//! 테스트는 같은 trait의 가짜 구현으로 격리된 인스턴스를 만든다.

pub mod auth_api;
pub mod kv_store;
pub mod notifier;
pub mod probe;
