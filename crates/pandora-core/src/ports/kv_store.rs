//! 영속 키-값 저장소 포트.
//!
//! 구현: `pandora-storage` crate (JSON 파일, 인메모리)

use crate::error::CoreError;

/// 저장소 키: 값은 불투명한 문자열이며 형식 보장은 없다
pub mod keys {
    /// 수동 지정 백엔드 URL
    pub const MANUAL_BACKEND_URL: &str = "pandora.backend.manual_url";
    /// 마지막으로 응답했던 백엔드 (BackendEndpoint JSON)
    pub const LAST_VALID_BACKEND: &str = "pandora.backend.last_valid";
    /// 마지막으로 해제된 수동 URL (자동 탐색에서 제외)
    pub const CLEARED_BACKEND_URL: &str = "pandora.backend.cleared_url";
    /// 비상 모드 플래그 (라우트 게이트 우회)
    pub const EMERGENCY_MODE: &str = "pandora.emergency_mode";
}

/// 클라이언트 측 영속 키-값 저장소
pub trait KeyValueStore: Send + Sync {
    /// 값 조회 (없으면 None)
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    /// 값 저장 (기존 값 덮어쓰기)
    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// 값 삭제 (없어도 성공)
    fn remove(&self, key: &str) -> Result<(), CoreError>;

    /// 키 존재 여부
    fn contains(&self, key: &str) -> Result<bool, CoreError> {
        Ok(self.get(key)?.is_some())
    }
}
