//! 연결 상태 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 백엔드 연결 확인 결과 (메모리 전용, 영속화하지 않음)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// 연결 여부
    pub connected: bool,
    /// 사람이 읽을 수 있는 진단 메시지
    pub message: String,
    /// 확인 시각
    pub checked_at: DateTime<Utc>,
    /// 부가 정보 (URL, HTTP 상태 등)
    pub details: Option<serde_json::Value>,
}

impl ConnectionStatus {
    /// 연결 성공 상태
    pub fn connected(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            connected: true,
            message: message.into(),
            checked_at: Utc::now(),
            details,
        }
    }

    /// 연결 실패 상태
    pub fn disconnected(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            connected: false,
            message: message.into(),
            checked_at: Utc::now(),
            details,
        }
    }
}

/// 재폴링 백오프 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryState {
    /// 연속 실패 후 재시도 횟수
    pub attempt: u32,
    /// 다음 재시도까지 대기 시간
    #[serde(with = "duration_ms")]
    pub next_delay: Duration,
}

impl RetryState {
    /// 초기 상태 `{0, first_delay}`
    pub fn reset(first_delay: Duration) -> Self {
        Self {
            attempt: 0,
            next_delay: first_delay,
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
