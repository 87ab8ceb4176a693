//! # pandora-storage
//!
//! `KeyValueStore` 포트 구현.
//!
//! - [`file_store::JsonFileStore`] — 데이터 디렉토리의 JSON 파일 (영속)
//! - [`memory::MemoryStore`] — 프로세스 수명 동안만 유지 (테스트, 오프라인 실행)

pub mod file_store;
pub mod memory;

pub use file_store::JsonFileStore;
pub use memory::MemoryStore;
