//! 세션 만료 알림 포트.
//!
//! 구현: `pandora-app`의 로그 기반 알림, 테스트용 기록 알림

use async_trait::async_trait;
use std::time::Duration;

/// 세션 만료 임박 알림 표시/해제
#[async_trait]
pub trait SessionNotifier: Send + Sync {
    /// "세션 만료 임박" 알림 표시
    async fn session_expiring(&self, remaining: Option<Duration>);

    /// 알림 해제 (활동으로 세션이 갱신됨)
    async fn session_warning_dismissed(&self);
}
