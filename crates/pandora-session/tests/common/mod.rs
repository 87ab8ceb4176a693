//! 통합 테스트 공용 가짜 구현.

#![allow(dead_code)]

use async_trait::async_trait;
use pandora_core::error::CoreError;
use pandora_core::models::session::UserProfile;
use pandora_core::ports::auth_api::{AuthApi, TokenGrant};
use pandora_core::ports::notifier::SessionNotifier;
use pandora_core::ports::probe::{BackendProbe, ProbeFailure, ProbeOutcome};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const PASSWORD: &str = "pa55word";

pub fn user(id: &str, role: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        name: format!("{role}-{id}"),
        email: format!("{role}@example.com"),
        role: role.to_string(),
    }
}

/// 쿠키 세션 백엔드 흉내
pub struct FakeBackend {
    user: UserProfile,
    session_valid: AtomicBool,
    pub logout_fails: AtomicBool,
    pub offline: AtomicBool,
    refreshes: AtomicUsize,
    verifies: AtomicUsize,
}

impl FakeBackend {
    pub fn new(user: UserProfile) -> Self {
        Self {
            user,
            session_valid: AtomicBool::new(false),
            logout_fails: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
            verifies: AtomicUsize::new(0),
        }
    }

    pub fn username(&self) -> &str {
        &self.user.name
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn verifies(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }

    fn gate(&self) -> Result<(), CoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::Network("connection refused".to_string()));
        }
        if self.session_valid.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CoreError::Auth("401 Unauthorized".to_string()))
        }
    }
}

#[async_trait]
impl AuthApi for FakeBackend {
    async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, CoreError> {
        if username != self.user.name || password != PASSWORD {
            return Err(CoreError::Auth("로그인 실패 (401)".to_string()));
        }
        self.session_valid.store(true, Ordering::SeqCst);
        Ok(TokenGrant {
            expires_in_secs: Some(3_600),
        })
    }

    async fn verify(&self) -> Result<(), CoreError> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        self.gate()
    }

    async fn refresh(&self) -> Result<TokenGrant, CoreError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        Ok(TokenGrant::default())
    }

    async fn logout(&self) -> Result<(), CoreError> {
        self.session_valid.store(false, Ordering::SeqCst);
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(CoreError::ServiceUnavailable("logout 503".to_string()));
        }
        Ok(())
    }

    async fn fetch_profile(&self) -> Result<UserProfile, CoreError> {
        self.gate()?;
        Ok(self.user.clone())
    }
}

/// 지정한 URL만 살아 있는 프로브
#[derive(Default)]
pub struct HostProbe {
    alive: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl HostProbe {
    pub fn alive(urls: &[&str]) -> Self {
        Self {
            alive: Mutex::new(urls.iter().map(|u| u.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BackendProbe for HostProbe {
    async fn probe(&self, base_url: &str) -> ProbeOutcome {
        self.calls.lock().push(base_url.to_string());
        if self.alive.lock().contains(base_url) {
            ProbeOutcome::Alive { status: 401 }
        } else {
            ProbeOutcome::Unreachable {
                failure: ProbeFailure::Refused,
                message: format!("{base_url}: connection refused"),
            }
        }
    }
}

/// 알림 횟수 기록
#[derive(Default)]
pub struct CountingNotifier {
    pub shown: AtomicUsize,
    pub dismissed: AtomicUsize,
}

#[async_trait]
impl SessionNotifier for CountingNotifier {
    async fn session_expiring(&self, _remaining: Option<Duration>) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    async fn session_warning_dismissed(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}
