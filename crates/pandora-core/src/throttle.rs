//! 최소 간격 제한기.
//!
//! 연결 프로브, 토큰 갱신, 세션 검증이 같은 방식으로 "최근에 했으면 건너뛴다"를
//! 판단하도록 공유한다. `tokio::time::Instant` 기반이라 테스트에서
//! `tokio::time::pause()`로 시계를 조작할 수 있다.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// 마지막 허용 시각으로부터 `min_interval`이 지나야 다음 요청을 허용
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    /// 새 제한기 생성 (첫 요청은 항상 허용)
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// 최소 간격
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 허용되면 현재 시각을 기록하고 true
    pub fn try_acquire(&self) -> bool {
        let mut last = self.last.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// 간격과 무관하게 현재 시각 기록 (강제 실행)
    pub fn mark(&self) {
        *self.last.lock() = Some(Instant::now());
    }

    /// 지금 요청하면 허용되는지 (기록하지 않음)
    pub fn is_ready(&self) -> bool {
        self.remaining().is_zero()
    }

    /// 다음 허용까지 남은 시간
    pub fn remaining(&self) -> Duration {
        match *self.last.lock() {
            Some(prev) => self.min_interval.saturating_sub(prev.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// 마지막 허용 시각
    pub fn last(&self) -> Option<Instant> {
        *self.last.lock()
    }

    /// 기록 초기화 (다음 요청 즉시 허용)
    pub fn reset(&self) {
        *self.last.lock() = None;
    }
}
