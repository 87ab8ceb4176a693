//! 세션 타이머 라이프사이클.
//!
//! 인증된 세션 하나에 타이머 묶음 하나를 소유한다.
//! - 갱신 타이머: 30분 주기, 첫 실행만 5~20초 무작위 지연 추가
//! - 만료 경고 타이머: 무장 4분 후 한 번 "세션 만료 임박" 알림
//! - 활동 디바운스: 경고 표시 중 사용자 활동이 5초 잠잠해지면 강제 갱신 후 경고 해제
//!
//! Authenticated를 벗어나면 새 주기를 시작하기 전에 모든 타이머를 중단한다.

use crate::store::{AuthSessionStore, RefreshOutcome};
use chrono::Utc;
use pandora_core::config::SessionConfig;
use pandora_core::models::session::AuthSession;
use pandora_core::ports::notifier::SessionNotifier;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// 무장된 타이머 묶음: 드롭되면 모든 태스크 중단
struct SessionTimers {
    epoch: u64,
    refresh: JoinHandle<()>,
    expiry: JoinHandle<()>,
    activity_tx: mpsc::UnboundedSender<()>,
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.refresh.abort();
        self.expiry.abort();
    }
}

/// 세션 타이머 관리자
pub struct SessionLifecycleManager {
    store: Arc<AuthSessionStore>,
    notifier: Arc<dyn SessionNotifier>,
    config: SessionConfig,
    timers: Mutex<Option<SessionTimers>>,
    warning_visible: Arc<AtomicBool>,
}

impl SessionLifecycleManager {
    pub fn new(
        store: Arc<AuthSessionStore>,
        notifier: Arc<dyn SessionNotifier>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            config,
            timers: Mutex::new(None),
            warning_visible: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 세션에 맞춰 타이머 무장
    ///
    /// 기존 타이머는 항상 먼저 해제한다. 인증되지 않은 세션이면 무장하지 않고 false.
    pub fn arm(&self, session: &AuthSession) -> bool {
        self.disarm();
        if !session.is_authenticated() {
            return false;
        }

        let (jitter_min, jitter_max) = self.config.refresh_jitter_range();
        let jitter = Duration::from_millis(
            rand::rng().random_range(jitter_min.as_millis() as u64..=jitter_max.as_millis() as u64),
        );
        let interval = self.config.refresh_interval();

        let (activity_tx, activity_rx) = mpsc::unbounded_channel();
        let refresh = tokio::spawn(refresh_loop(self.store.clone(), interval, jitter));
        let expiry = tokio::spawn(expiry_watch(
            self.store.clone(),
            self.notifier.clone(),
            self.warning_visible.clone(),
            self.config.expiry_warning_after(),
            self.config.activity_debounce(),
            activity_rx,
        ));

        let epoch = self.store.session_epoch();
        *self.timers.lock() = Some(SessionTimers {
            epoch,
            refresh,
            expiry,
            activity_tx,
        });
        info!(
            "세션 타이머 무장: 갱신 {}초 (+지터 {}ms), 만료 경고 {}초 후",
            interval.as_secs(),
            jitter.as_millis(),
            self.config.expiry_warning_after().as_secs()
        );
        true
    }

    /// 모든 타이머 해제
    pub fn disarm(&self) {
        self.take_timers();
    }

    /// 타이머를 걷어내고 경고가 떠 있었는지 반환
    fn take_timers(&self) -> bool {
        let timers = self.timers.lock().take();
        let was_visible = self.warning_visible.swap(false, Ordering::SeqCst);
        if let Some(timers) = timers {
            debug!("세션 타이머 해제 (epoch {})", timers.epoch);
        }
        was_visible
    }

    /// 타이머가 무장되어 있는지
    pub fn is_armed(&self) -> bool {
        self.timers.lock().is_some()
    }

    /// 만료 경고가 표시 중인지
    pub fn warning_visible(&self) -> bool {
        self.warning_visible.load(Ordering::SeqCst)
    }

    /// 사용자 활동 신호
    ///
    /// 경고가 표시 중일 때만 디바운스 대상이 된다.
    pub fn record_activity(&self) {
        if !self.warning_visible() {
            return;
        }
        if let Some(timers) = self.timers.lock().as_ref() {
            let _ = timers.activity_tx.send(());
        }
    }

    /// 세션 상태를 따라 타이머를 무장/해제하는 루프
    ///
    /// 새로 Authenticated에 진입하면(epoch 변경) 새 주기를 무장하고,
    /// 인증을 잃으면 즉시 해제한다. 종료 신호를 받으면 해제 후 반환.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let mut session_rx = self.store.subscribe();
        let initial = session_rx.borrow_and_update().clone();
        self.sync(&initial).await;

        loop {
            tokio::select! {
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let session = session_rx.borrow_and_update().clone();
                    self.sync(&session).await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        if self.take_timers() {
            self.notifier.session_warning_dismissed().await;
        }
        info!("세션 타이머 루프 종료");
    }

    async fn sync(&self, session: &AuthSession) {
        if session.is_authenticated() {
            let epoch = self.store.session_epoch();
            let armed_epoch = self.timers.lock().as_ref().map(|t| t.epoch);
            if armed_epoch != Some(epoch) {
                self.arm(session);
            }
        } else if self.is_armed() {
            if self.take_timers() {
                self.notifier.session_warning_dismissed().await;
            }
            info!("인증 해제로 세션 타이머 중단 ({})", session.phase());
        }
    }
}

async fn refresh_loop(store: Arc<AuthSessionStore>, interval: Duration, jitter: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval + jitter, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match store.refresh(false).await {
            RefreshOutcome::NotAuthenticated | RefreshOutcome::Expired => {
                debug!("세션이 더 이상 유효하지 않아 갱신 타이머 종료");
                break;
            }
            outcome => debug!("주기 갱신 결과: {outcome:?}"),
        }
    }
}

async fn expiry_watch(
    store: Arc<AuthSessionStore>,
    notifier: Arc<dyn SessionNotifier>,
    warning_visible: Arc<AtomicBool>,
    warning_after: Duration,
    debounce: Duration,
    mut activity_rx: mpsc::UnboundedReceiver<()>,
) {
    tokio::time::sleep(warning_after).await;
    if !store.is_authenticated() {
        return;
    }
    // 경고 이전 활동은 무시
    while activity_rx.try_recv().is_ok() {}

    let remaining = store
        .expires_at()
        .and_then(|at| (at - Utc::now()).to_std().ok());
    warning_visible.store(true, Ordering::SeqCst);
    info!("세션 만료 임박 알림 표시");
    notifier.session_expiring(remaining).await;

    if activity_rx.recv().await.is_none() {
        return;
    }
    // 활동이 debounce 동안 잠잠해질 때까지 대기
    loop {
        match tokio::time::timeout(debounce, activity_rx.recv()).await {
            Ok(Some(())) => continue,
            Ok(None) => return,
            Err(_) => break,
        }
    }

    let outcome = store.refresh(true).await;
    debug!("활동 감지 후 강제 갱신: {outcome:?}");
    warning_visible.store(false, Ordering::SeqCst);
    notifier.session_warning_dismissed().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{profile, FakeAuthApi, RecordingNotifier, PASSWORD};
    use pandora_core::config::AuthConfig;

    struct Fixture {
        api: Arc<FakeAuthApi>,
        store: Arc<AuthSessionStore>,
        notifier: Arc<RecordingNotifier>,
        manager: Arc<SessionLifecycleManager>,
    }

    async fn fixture(api: FakeAuthApi) -> Fixture {
        fixture_with(api, SessionConfig::default()).await
    }

    async fn fixture_with(api: FakeAuthApi, config: SessionConfig) -> Fixture {
        let api = Arc::new(api);
        let store = Arc::new(AuthSessionStore::new(
            api.clone(),
            &config,
            &AuthConfig::default(),
        ));
        store.initialize().await;
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = Arc::new(SessionLifecycleManager::new(
            store.clone(),
            notifier.clone(),
            config,
        ));
        Fixture {
            api,
            store,
            notifier,
            manager,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn arm_requires_authenticated_session() {
        let f = fixture(FakeAuthApi::new(profile("1", "admin"))).await;
        assert!(!f.manager.arm(&f.store.snapshot()));
        assert!(!f.manager.is_armed());

        f.store.login("user-1", PASSWORD).await.unwrap();
        assert!(f.manager.arm(&f.store.snapshot()));
        assert!(f.manager.is_armed());

        f.manager.disarm();
        assert!(!f.manager.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_timer_fires_after_interval_and_jitter() {
        let f = fixture(FakeAuthApi::new(profile("1", "admin")).with_session()).await;
        f.manager.arm(&f.store.snapshot());

        tokio::time::sleep(Duration::from_secs(30 * 60)).await;
        assert_eq!(f.api.refresh_calls(), 0);

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert_eq!(f.api.refresh_calls(), 1);

        tokio::time::sleep(Duration::from_secs(30 * 60)).await;
        assert_eq!(f.api.refresh_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_refresh_interval_still_ticks() {
        let config = SessionConfig {
            refresh_interval_ms: 0,
            refresh_jitter_min_ms: 0,
            refresh_jitter_max_ms: 0,
            min_refresh_interval_ms: 0,
            ..SessionConfig::default()
        };
        let f = fixture_with(FakeAuthApi::new(profile("1", "admin")).with_session(), config).await;
        assert!(f.manager.arm(&f.store.snapshot()));

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(f.api.refresh_calls(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(f.api.refresh_calls(), 2);
        assert!(f.manager.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn warning_then_activity_refreshes_and_dismisses() {
        let f = fixture(FakeAuthApi::new(profile("1", "admin")).with_session()).await;
        f.manager.arm(&f.store.snapshot());

        // 경고 이전 활동은 무시
        f.manager.record_activity();
        tokio::time::sleep(Duration::from_secs(241)).await;
        assert_eq!(f.notifier.shown(), 1);
        assert!(f.manager.warning_visible());

        f.manager.record_activity();
        tokio::time::sleep(Duration::from_secs(3)).await;
        f.manager.record_activity();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(f.api.refresh_calls(), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(f.api.refresh_calls(), 1);
        assert_eq!(f.notifier.dismissed(), 1);
        assert!(!f.manager.warning_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_tears_down_on_logout_and_rearms_on_login() {
        let f = fixture(FakeAuthApi::new(profile("1", "admin")).with_session()).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(f.manager.clone().run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(f.manager.is_armed());

        f.store.logout().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!f.manager.is_armed());

        // 해제 후에는 어떤 타이머도 발화하지 않음
        tokio::time::sleep(Duration::from_secs(2 * 60 * 60)).await;
        assert_eq!(f.api.refresh_calls(), 0);
        assert_eq!(f.notifier.shown(), 0);

        f.store.login("user-1", PASSWORD).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(f.manager.is_armed());

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(!f.manager.is_armed());
    }
}
