//! 단위 테스트용 가짜 포트 구현.

use async_trait::async_trait;
use pandora_core::error::CoreError;
use pandora_core::models::session::UserProfile;
use pandora_core::ports::auth_api::{AuthApi, TokenGrant};
use pandora_core::ports::notifier::SessionNotifier;
use pandora_core::ports::probe::{BackendProbe, ProbeFailure, ProbeOutcome};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const PASSWORD: &str = "secreto";

pub(crate) fn profile(id: &str, role: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: format!("user-{id}"),
        email: format!("{id}@pandora.test"),
        role: role.to_string(),
    }
}

/// 쿠키 세션을 흉내 내는 백엔드
///
/// 로그인 성공 시 세션이 유효해지고, 로그아웃/만료 시 무효가 된다.
/// `offline`이면 모든 호출이 타임아웃으로 실패한다.
pub(crate) struct FakeAuthApi {
    pub user: UserProfile,
    pub session_valid: AtomicBool,
    pub offline: AtomicBool,
    pub logout_fails: AtomicBool,
    pub refresh_delay: Duration,
    pub logins: AtomicUsize,
    pub verifies: AtomicUsize,
    pub refreshes: AtomicUsize,
    pub logouts: AtomicUsize,
    pub profiles: AtomicUsize,
}

impl FakeAuthApi {
    pub fn new(user: UserProfile) -> Self {
        Self {
            user,
            session_valid: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            logout_fails: AtomicBool::new(false),
            refresh_delay: Duration::ZERO,
            logins: AtomicUsize::new(0),
            verifies: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
            profiles: AtomicUsize::new(0),
        }
    }

    /// 이미 유효한 세션 쿠키가 있는 상태
    pub fn with_session(self) -> Self {
        self.session_valid.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn expire_session(&self) {
        self.session_valid.store(false, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Timeout { timeout_ms: 5_000 });
        }
        if !self.session_valid.load(Ordering::SeqCst) {
            return Err(CoreError::Auth("인증 실패 (401 Unauthorized)".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, CoreError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Timeout { timeout_ms: 15_000 });
        }
        if username != self.user.name || password != PASSWORD {
            return Err(CoreError::Auth("로그인 실패 (400): 잘못된 자격증명".to_string()));
        }
        self.session_valid.store(true, Ordering::SeqCst);
        Ok(TokenGrant {
            expires_in_secs: Some(1_800),
        })
    }

    async fn verify(&self) -> Result<(), CoreError> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        self.gate()
    }

    async fn refresh(&self) -> Result<TokenGrant, CoreError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        // 요청 도착 시점의 쿠키로 판정하고 응답만 늦게 보낸다
        let verdict = self.gate();
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        verdict?;
        Ok(TokenGrant {
            expires_in_secs: Some(1_800),
        })
    }

    async fn logout(&self) -> Result<(), CoreError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.session_valid.store(false, Ordering::SeqCst);
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(CoreError::Network("connection reset".to_string()));
        }
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<UserProfile, CoreError> {
        self.profiles.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        Ok(self.user.clone())
    }
}

/// 표시/해제 횟수를 세는 알림
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub shown: AtomicUsize,
    pub dismissed: AtomicUsize,
}

impl RecordingNotifier {
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn dismissed(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionNotifier for RecordingNotifier {
    async fn session_expiring(&self, _remaining: Option<Duration>) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    async fn session_warning_dismissed(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

/// 켜고 끌 수 있는 백엔드 프로브
#[derive(Default)]
pub(crate) struct SwitchProbe {
    pub alive: AtomicBool,
    pub calls: AtomicUsize,
}

impl SwitchProbe {
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendProbe for SwitchProbe {
    async fn probe(&self, _base_url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.alive.load(Ordering::SeqCst) {
            ProbeOutcome::Alive { status: 200 }
        } else {
            ProbeOutcome::Unreachable {
                failure: ProbeFailure::Refused,
                message: "connection refused".to_string(),
            }
        }
    }
}
