//! 연결/인증 상태 표시.
//!
//! 연결 확인기와 세션 저장소를 읽기만 한다. 연결 실패가 이어지면 고정 백오프
//! 수열(2초, 5초, 10초, 30초, 60초)로 재폴링하고, 한 번이라도 성공하면 처음으로 돌아간다.

use crate::store::AuthSessionStore;
use pandora_core::models::connection::{ConnectionStatus, RetryState};
use pandora_core::models::session::{AuthSession, SessionPhase};
use pandora_network::connectivity::ConnectivityProber;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tracing::{debug, info};

/// 고정 수열 백오프
#[derive(Debug, Clone)]
pub struct Backoff {
    sequence: Vec<Duration>,
    state: RetryState,
}

impl Backoff {
    /// 빈 수열이면 1초 고정
    pub fn new(sequence: Vec<Duration>) -> Self {
        let sequence = if sequence.is_empty() {
            vec![Duration::from_secs(1)]
        } else {
            sequence
        };
        let state = RetryState::reset(sequence[0]);
        Self { sequence, state }
    }

    /// 실패 기록 후 이번 대기 시간 반환
    pub fn record_failure(&mut self) -> Duration {
        let delay = self.state.next_delay;
        self.state.attempt = self.state.attempt.saturating_add(1);
        let idx = (self.state.attempt as usize).min(self.sequence.len() - 1);
        self.state.next_delay = self.sequence[idx];
        delay
    }

    pub fn reset(&mut self) {
        self.state = RetryState::reset(self.sequence[0]);
    }

    pub fn state(&self) -> RetryState {
        self.state
    }
}

/// 상태 표시용 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    /// 마지막 연결 확인 결과 (아직 확인 전이면 None)
    pub connection: Option<ConnectionStatus>,
    pub session: AuthSession,
    pub retry: RetryState,
    /// 다음 폴링까지 대기 시간 (밀리초)
    pub next_poll_ms: u64,
    /// 한 줄 요약
    pub banner: String,
}

/// 상태 표시기
pub struct StatusIndicator {
    prober: Arc<ConnectivityProber>,
    session: Arc<AuthSessionStore>,
    backoff: Mutex<Backoff>,
    healthy_poll: Duration,
    next_poll: Mutex<Duration>,
    view_tx: watch::Sender<StatusView>,
    retry_notify: Notify,
}

impl StatusIndicator {
    pub fn new(
        prober: Arc<ConnectivityProber>,
        session: Arc<AuthSessionStore>,
        backoff: Vec<Duration>,
        healthy_poll: Duration,
    ) -> Self {
        let backoff = Backoff::new(backoff);
        let initial = StatusView {
            connection: prober.last_status(),
            session: session.snapshot(),
            retry: backoff.state(),
            next_poll_ms: 0,
            banner: String::new(),
        };
        let (view_tx, _) = watch::channel(initial);
        let indicator = Self {
            prober,
            session,
            backoff: Mutex::new(backoff),
            healthy_poll,
            next_poll: Mutex::new(Duration::ZERO),
            view_tx,
            retry_notify: Notify::new(),
        };
        indicator.publish();
        indicator
    }

    /// 현재 스냅샷
    ///
    /// 마지막 발행 이후 세션이 바뀌었어도 지금 값으로 다시 만든다.
    pub fn view(&self) -> StatusView {
        self.snapshot()
    }

    /// 스냅샷 변경 수신기
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.view_tx.subscribe()
    }

    /// 연결 확인 1회 후 다음 폴링까지 대기 시간 반환
    pub async fn poll(&self, force: bool) -> Duration {
        let status = self.prober.check(force).await;
        self.apply(&status)
    }

    /// 수동 재시도: 백오프 초기화 후 강제 확인
    pub async fn retry(&self) -> ConnectionStatus {
        info!("연결 수동 재시도");
        self.backoff.lock().reset();
        let status = self.prober.check(true).await;
        self.apply(&status);
        self.retry_notify.notify_one();
        status
    }

    /// 종료 신호까지 재폴링 루프
    ///
    /// 직전 확인이 실패였으면 스로틀 윈도우를 무시하고 강제 확인한다.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut session_rx = self.session.subscribe();
        let mut force = false;

        'poll: loop {
            let delay = self.poll(force).await;
            force = !self.is_online();

            // 세션 변경으로 깨어나도 재폴링 시각은 그대로
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);

            loop {
                tokio::select! {
                    () = &mut sleep => break,
                    _ = self.retry_notify.notified() => {
                        // retry()가 이미 확인했으므로 새 대기 시간만 반영
                        let delay = *self.next_poll.lock();
                        sleep.as_mut().reset(Instant::now() + delay);
                        force = !self.is_online();
                    }
                    changed = session_rx.changed() => {
                        if changed.is_err() {
                            break 'poll;
                        }
                        self.publish();
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break 'poll;
                        }
                    }
                }
            }
        }
        info!("상태 표시 루프 종료");
    }

    fn is_online(&self) -> bool {
        self.view_tx
            .borrow()
            .connection
            .as_ref()
            .is_some_and(|c| c.connected)
    }

    fn apply(&self, status: &ConnectionStatus) -> Duration {
        let delay = {
            let mut backoff = self.backoff.lock();
            if status.connected {
                backoff.reset();
                self.healthy_poll
            } else {
                backoff.record_failure()
            }
        };
        *self.next_poll.lock() = delay;
        if !status.connected {
            debug!("다음 연결 재시도까지 {}초", delay.as_secs());
        }
        self.publish();
        delay
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.snapshot());
    }

    fn snapshot(&self) -> StatusView {
        let connection = self.prober.last_status();
        let session = self.session.snapshot();
        let next_poll = *self.next_poll.lock();
        let banner = banner(connection.as_ref(), &session, next_poll);
        StatusView {
            connection,
            session,
            retry: self.backoff.lock().state(),
            next_poll_ms: next_poll.as_millis() as u64,
            banner,
        }
    }
}

fn banner(connection: Option<&ConnectionStatus>, session: &AuthSession, next_poll: Duration) -> String {
    let Some(connection) = connection else {
        return "서버 연결 확인 중...".to_string();
    };
    if !connection.connected {
        return format!(
            "{} ({}초 후 재시도)",
            connection.message,
            next_poll.as_secs()
        );
    }
    match (session.phase(), session.user()) {
        (_, Some(user)) => format!("서버 연결됨 · {} ({})", user.name, user.role),
        (SessionPhase::Error, _) => format!(
            "서버 연결됨 · 인증 확인 실패: {}",
            session.error().unwrap_or("알 수 없는 오류")
        ),
        (SessionPhase::Uninitialized | SessionPhase::Checking, _) => {
            "서버 연결됨 · 세션 확인 중".to_string()
        }
        _ => "서버 연결됨 · 로그인 필요".to_string(),
    }
}
