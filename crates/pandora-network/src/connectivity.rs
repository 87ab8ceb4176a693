//! 연결 상태 확인.
//!
//! 결정된 백엔드에 경량 디버그 요청을 보내고 결과를 스로틀 윈도우 동안 캐시한다.
//! 비강제 확인은 윈도우 안에서 네트워크를 타지 않는다.
//! 확인 결과는 watch 채널로 브로드캐스트되며 실패는 항상
//! `ConnectionStatus { connected: false, .. }`로 돌아온다.

use pandora_core::models::connection::ConnectionStatus;
use pandora_core::ports::probe::{BackendProbe, ProbeFailure, ProbeOutcome};
use pandora_core::throttle::Throttle;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::locator::BackendLocator;

/// 연결 확인기
pub struct ConnectivityProber {
    locator: Arc<BackendLocator>,
    probe: Arc<dyn BackendProbe>,
    throttle: Throttle,
    /// 마지막 결과. 프로브 중에는 잠겨 있어 동시 호출자가 같은 결과를 기다린다
    cached: Mutex<Option<ConnectionStatus>>,
    /// 상태 변경 브로드캐스트
    status_tx: watch::Sender<Option<ConnectionStatus>>,
    /// 연속 실패 횟수
    failure_count: AtomicU64,
    /// 실제로 수행한 확인 횟수
    probe_count: AtomicU64,
}

impl ConnectivityProber {
    /// 새 연결 확인기 생성
    pub fn new(
        locator: Arc<BackendLocator>,
        probe: Arc<dyn BackendProbe>,
        throttle_window: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(None);
        Self {
            locator,
            probe,
            throttle: Throttle::new(throttle_window),
            cached: Mutex::new(None),
            status_tx,
            failure_count: AtomicU64::new(0),
            probe_count: AtomicU64::new(0),
        }
    }

    /// 연결 확인
    ///
    /// `force`가 false이고 직전 결과가 스로틀 윈도우 안이면 캐시를 그대로 반환한다.
    /// 타임스탬프는 네트워크 호출 전에 갱신된다.
    pub async fn check(&self, force: bool) -> ConnectionStatus {
        let mut cached = self.cached.lock().await;

        let acquired = self.throttle.try_acquire();
        if !force && !acquired {
            if let Some(status) = cached.as_ref() {
                debug!(
                    "연결 확인 캐시 사용 (남은 {}ms)",
                    self.throttle.remaining().as_millis()
                );
                return status.clone();
            }
        }
        if !acquired {
            self.throttle.mark();
        }

        self.probe_count.fetch_add(1, Ordering::Relaxed);
        let status = self.probe_backend().await;
        self.record(&status);

        *cached = Some(status.clone());
        status
    }

    /// 마지막 확인 결과 (네트워크 없음)
    pub fn last_status(&self) -> Option<ConnectionStatus> {
        self.status_tx.borrow().clone()
    }

    /// 상태 변경 수신기 생성
    pub fn subscribe(&self) -> watch::Receiver<Option<ConnectionStatus>> {
        self.status_tx.subscribe()
    }

    /// 연속 실패 횟수
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// 연결 상태 통계
    pub fn stats(&self) -> ConnectivityStats {
        let last = self.last_status();
        ConnectivityStats {
            is_online: last.as_ref().is_some_and(|s| s.connected),
            failure_count: self.failure_count(),
            probe_count: self.probe_count.load(Ordering::Relaxed),
            backend_url: self.locator.current().map(|e| e.url),
            last_checked_at: last.map(|s| s.checked_at),
        }
    }

    async fn probe_backend(&self) -> ConnectionStatus {
        let endpoint = match self.locator.current_or_resolve().await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                return ConnectionStatus::disconnected(
                    "백엔드 서버를 찾을 수 없습니다. 서버가 실행 중인지 확인하세요",
                    Some(json!({
                        "error": e.to_string(),
                        "candidates": self.locator.candidates(),
                    })),
                );
            }
        };

        let outcome = self.probe.probe(&endpoint.url).await;
        let details = |extra: serde_json::Value| {
            let mut base = json!({
                "url": endpoint.url,
                "source": endpoint.source,
            });
            if let (Some(obj), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
                obj.extend(extra.clone());
            }
            Some(base)
        };

        match outcome {
            ProbeOutcome::Alive { status } => ConnectionStatus::connected(
                format!("서버 연결됨 ({})", endpoint.url),
                details(json!({ "status": status })),
            ),
            ProbeOutcome::Rejected { status } => {
                self.locator.invalidate();
                ConnectionStatus::disconnected(
                    format!("서버가 예상치 못한 응답을 반환했습니다 (HTTP {status})"),
                    details(json!({ "status": status })),
                )
            }
            ProbeOutcome::Unreachable { failure, message } => {
                self.locator.invalidate();
                let text = match failure {
                    ProbeFailure::Refused => "서버 연결이 거부되었습니다",
                    ProbeFailure::Timeout => "서버 응답 시간이 초과되었습니다",
                    ProbeFailure::Other => "네트워크 오류로 서버에 연결할 수 없습니다",
                };
                ConnectionStatus::disconnected(
                    format!("{text} ({})", endpoint.url),
                    details(json!({ "error": message })),
                )
            }
        }
    }

    fn record(&self, status: &ConnectionStatus) {
        let was_online = self.last_status().is_some_and(|s| s.connected);

        if status.connected {
            self.failure_count.store(0, Ordering::Relaxed);
            if !was_online {
                info!("서버 연결 확인됨: {}", status.message);
            }
        } else {
            let count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
            if was_online || count == 1 {
                warn!("서버 연결 실패: {}", status.message);
            } else {
                debug!("서버 연결 실패 (연속 {count}회)");
            }
        }

        self.status_tx.send_replace(Some(status.clone()));
    }
}

/// 연결 상태 통계
#[derive(Debug, Clone)]
pub struct ConnectivityStats {
    /// 마지막 확인 기준 온라인 여부
    pub is_online: bool,
    /// 연속 실패 횟수
    pub failure_count: u64,
    /// 실제 확인 횟수 (캐시 반환 제외)
    pub probe_count: u64,
    /// 현재 결정된 백엔드
    pub backend_url: Option<String>,
    /// 마지막 확인 시각
    pub last_checked_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pandora_core::config::ServerConfig;
    use pandora_core::ports::kv_store::KeyValueStore;
    use pandora_storage::MemoryStore;
    use parking_lot::Mutex as SyncMutex;

    /// 호출 횟수를 세고 지정된 결과를 돌려주는 프로브
    struct CountingProbe {
        outcome: SyncMutex<ProbeOutcome>,
        calls: AtomicU64,
        delay: Duration,
    }

    impl CountingProbe {
        fn new(outcome: ProbeOutcome) -> Self {
            Self {
                outcome: SyncMutex::new(outcome),
                calls: AtomicU64::new(0),
                delay: Duration::ZERO,
            }
        }

        fn set(&self, outcome: ProbeOutcome) {
            *self.outcome.lock() = outcome;
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackendProbe for CountingProbe {
        async fn probe(&self, _base_url: &str) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.outcome.lock().clone()
        }
    }

    fn refused() -> ProbeOutcome {
        ProbeOutcome::Unreachable {
            failure: ProbeFailure::Refused,
            message: "connection refused".to_string(),
        }
    }

    /// 수동 URL을 지정해 결정 단계에서는 프로브가 일어나지 않게 한다
    fn prober_with_manual(probe: Arc<CountingProbe>) -> ConnectivityProber {
        let store = Arc::new(MemoryStore::new());
        let locator = Arc::new(BackendLocator::new(
            &ServerConfig::default(),
            store,
            probe.clone(),
        ));
        locator
            .set_manual_url(Some("http://localhost:8000/api"))
            .unwrap();
        ConnectivityProber::new(locator, probe, Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn non_forced_checks_within_window_hit_network_once() {
        let probe = Arc::new(CountingProbe::new(ProbeOutcome::Alive { status: 200 }));
        let prober = prober_with_manual(probe.clone());

        let first = prober.check(false).await;
        assert!(first.connected);

        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(5)).await;
            assert_eq!(prober.check(false).await, first);
        }
        assert_eq!(probe.calls(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        let later = prober.check(false).await;
        assert_eq!(probe.calls(), 2);
        assert!(later.checked_at >= first.checked_at);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_check_bypasses_cache() {
        let probe = Arc::new(CountingProbe::new(ProbeOutcome::Alive { status: 403 }));
        let prober = prober_with_manual(probe.clone());

        assert!(prober.check(false).await.connected);
        probe.set(refused());

        assert!(prober.check(false).await.connected);
        let forced = prober.check(true).await;
        assert!(!forced.connected);
        assert!(forced.message.contains("거부"));
        assert_eq!(probe.calls(), 2);
        assert_eq!(prober.failure_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_burst_shares_one_probe() {
        let probe = Arc::new(CountingProbe {
            delay: Duration::from_millis(500),
            ..CountingProbe::new(ProbeOutcome::Alive { status: 200 })
        });
        let prober = Arc::new(prober_with_manual(probe.clone()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let prober = prober.clone();
                tokio::spawn(async move { prober.check(false).await })
            })
            .collect();

        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }
        assert_eq!(probe.calls(), 1);
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_backend_reports_disconnected() {
        let probe = Arc::new(CountingProbe::new(refused()));
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let locator = Arc::new(BackendLocator::new(
            &ServerConfig::default(),
            store,
            probe.clone(),
        ));
        let prober = ConnectivityProber::new(locator, probe.clone(), Duration::from_secs(30));

        let status = prober.check(false).await;
        assert!(!status.connected);
        assert!(status.message.contains("찾을 수 없습니다"));
        let details = status.details.unwrap();
        assert_eq!(details["candidates"].as_array().unwrap().len(), 3);
        // 후보 3개만 시도하고 추가 프로브는 없음
        assert_eq!(probe.calls(), 3);
        assert!(!prober.stats().is_online);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_see_transitions() {
        let probe = Arc::new(CountingProbe::new(ProbeOutcome::Alive { status: 200 }));
        let prober = prober_with_manual(probe.clone());
        let mut rx = prober.subscribe();
        assert!(rx.borrow().is_none());

        prober.check(true).await;
        rx.changed().await.unwrap();
        assert!(rx.borrow().as_ref().unwrap().connected);

        probe.set(ProbeOutcome::Rejected { status: 502 });
        prober.check(true).await;
        rx.changed().await.unwrap();
        let status = rx.borrow().clone().unwrap();
        assert!(!status.connected);
        assert!(status.message.contains("502"));
        assert_eq!(prober.stats().probe_count, 2);
    }
}
