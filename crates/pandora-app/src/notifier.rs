//! 로그 기반 세션 만료 알림.

use async_trait::async_trait;
use pandora_core::ports::notifier::SessionNotifier;
use std::time::Duration;
use tracing::{info, warn};

/// 알림을 로그로 남긴다 (헤드리스 실행용)
pub struct LoggingNotifier;

#[async_trait]
impl SessionNotifier for LoggingNotifier {
    async fn session_expiring(&self, remaining: Option<Duration>) {
        match remaining {
            Some(left) => warn!(
                "세션이 곧 만료됩니다 (약 {}분 남음). 활동하면 연장됩니다",
                left.as_secs() / 60
            ),
            None => warn!("세션이 곧 만료됩니다. 활동하면 연장됩니다"),
        }
    }

    async fn session_warning_dismissed(&self) {
        info!("세션 연장됨, 만료 알림 해제");
    }
}
