//! 인증 세션 상태 머신.
//!
//! `Uninitialized → Checking → {Authenticated, Unauthenticated, Error}`
//!
//! 상태는 이 저장소만 변경하며 소비자는 [`AuthSessionStore::subscribe`]로 받은
//! 값에서 UI 상태를 다시 계산한다. 공개 메서드는 panic 없이 결과 값으로 실패를 돌려준다.
//!
//! 갱신 정책: 401 계열 응답만 세션을 강등한다. 네트워크 실패(타임아웃, 연결 거부, 5xx)는
//! 세션이 아직 유효하다고 보고 유지한다. 불안정한 네트워크에서 로그아웃이 튀지 않게
//! 하기 위한 가용성 우선 정책이다.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use pandora_core::config::{AuthConfig, Credentials, SessionConfig};
use pandora_core::error::CoreError;
use pandora_core::models::session::{AuthSession, SessionPhase, UserProfile};
use pandora_core::ports::auth_api::{AuthApi, TokenGrant};
use pandora_core::throttle::Throttle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, warn};

/// 세션 만료 시 표시 메시지
const SESSION_EXPIRED: &str = "세션이 만료되었습니다. 다시 로그인하세요";

/// 토큰 갱신 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 갱신 성공
    Renewed,
    /// 네트워크 실패: 세션은 유지
    Deferred,
    /// 401 계열: 세션 강등됨
    Expired,
    /// 인증되지 않은 상태라 시도하지 않음
    NotAuthenticated,
}

impl RefreshOutcome {
    /// 갱신 후 세션을 유효하다고 볼 수 있는지
    pub fn is_valid(&self) -> bool {
        matches!(self, RefreshOutcome::Renewed | RefreshOutcome::Deferred)
    }
}

/// 캐시된 세션 검증 결과
#[derive(Debug, Clone, PartialEq, Eq)]
enum Verification {
    Valid,
    Rejected(String),
    Unreachable(String),
}

/// 인증 세션 저장소
pub struct AuthSessionStore {
    api: Arc<dyn AuthApi>,
    auto_login: Option<Credentials>,
    state_tx: watch::Sender<AuthSession>,
    /// Authenticated 진입 횟수: 같은 사용자의 재로그인도 구분
    epoch: AtomicU64,
    expires_at: Mutex<Option<DateTime<Utc>>>,

    verify_gate: AsyncMutex<()>,
    verify_throttle: Throttle,
    last_verification: Mutex<Option<Verification>>,

    refresh_gate: AsyncMutex<()>,
    refresh_throttle: Throttle,
    last_refresh: Mutex<Option<RefreshOutcome>>,
}

impl AuthSessionStore {
    /// 새 저장소 생성 (Uninitialized)
    pub fn new(api: Arc<dyn AuthApi>, session: &SessionConfig, auth: &AuthConfig) -> Self {
        let (state_tx, _) = watch::channel(AuthSession::uninitialized());
        Self {
            api,
            auto_login: auth.auto_login.clone(),
            state_tx,
            epoch: AtomicU64::new(0),
            expires_at: Mutex::new(None),
            verify_gate: AsyncMutex::new(()),
            verify_throttle: Throttle::new(session.verify_cache()),
            last_verification: Mutex::new(None),
            refresh_gate: AsyncMutex::new(()),
            refresh_throttle: Throttle::new(session.min_refresh_interval()),
            last_refresh: Mutex::new(None),
        }
    }

    /// 현재 세션 (복제본)
    pub fn snapshot(&self) -> AuthSession {
        self.state_tx.borrow().clone()
    }

    /// 세션 변경 수신기
    pub fn subscribe(&self) -> watch::Receiver<AuthSession> {
        self.state_tx.subscribe()
    }

    /// Authenticated 진입 번호 (0이면 한 번도 인증되지 않음)
    pub fn session_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// 서버가 알려준 만료 예상 시각
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        *self.expires_at.lock()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state_tx.borrow().is_authenticated()
    }

    /// 현재 사용자가 역할을 가졌는지 (미인증이면 false)
    pub fn has_role(&self, role: &str) -> bool {
        self.state_tx.borrow().has_role(role)
    }

    /// 역할 목록 중 하나라도 가졌는지
    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.state_tx.borrow().has_any_role(roles)
    }

    /// 부팅 시 세션 복구
    ///
    /// 검증 → 프로필 조회 → Authenticated 순서로 진행한다. 세션이 무효하면
    /// 설정된 자동 로그인을 시도하고, 네트워크 실패면 Error 상태가 된다.
    pub async fn initialize(&self) -> AuthSession {
        self.set(AuthSession::checking());

        match self.verify(true).await {
            Verification::Valid => match self.api.fetch_profile().await {
                Ok(user) => {
                    self.enter_authenticated(user, None);
                    return self.snapshot();
                }
                Err(e) if e.is_auth_rejection() => {
                    debug!("프로필 조회 거부, 세션 무효로 간주: {e}");
                }
                Err(e) => {
                    self.set(AuthSession::failed(format!("사용자 정보 조회 실패: {e}")));
                    return self.snapshot();
                }
            },
            Verification::Rejected(reason) => {
                debug!("저장된 세션 무효: {reason}");
            }
            Verification::Unreachable(reason) => {
                self.set(AuthSession::failed(format!("세션 확인 실패: {reason}")));
                return self.snapshot();
            }
        }

        match self.auto_login.clone() {
            Some(creds) => match self.authenticate(&creds.username, &creds.password).await {
                Ok((user, grant)) => {
                    info!("자동 로그인 성공: {}", user.id);
                    self.enter_authenticated(user, Some(grant));
                }
                Err(e) => {
                    warn!("자동 로그인 실패: {e}");
                    self.set(AuthSession::unauthenticated(Some(format!(
                        "자동 로그인 실패: {e}"
                    ))));
                }
            },
            None => {
                self.set(AuthSession::unauthenticated(Some(
                    "로그인이 필요합니다".to_string(),
                )));
            }
        }

        self.snapshot()
    }

    /// 자격증명 로그인
    ///
    /// 실패하면 이전 상태를 유지하고 `error`만 설정한다.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<UserProfile, CoreError> {
        let prior = self.snapshot();
        self.set(prior.clone().with_loading(true).with_error(None));

        match self.authenticate(identifier, secret).await {
            Ok((user, grant)) => {
                info!("로그인 성공: {}", user.id);
                self.enter_authenticated(user.clone(), Some(grant));
                Ok(user)
            }
            Err(e) => {
                warn!("로그인 실패: {e}");
                self.set(
                    prior
                        .with_loading(false)
                        .with_error(Some(format!("로그인 실패: {e}"))),
                );
                Err(e)
            }
        }
    }

    /// 로그아웃
    ///
    /// 로컬 정리를 먼저 끝낸 뒤 백엔드에 통지한다. 통지 실패는 무시한다.
    pub async fn logout(&self) {
        self.clear_caches();
        self.set(AuthSession::unauthenticated(None));

        if let Err(e) = self.api.logout().await {
            warn!("로그아웃 통지 실패 (로컬 세션은 정리됨): {e}");
        }
        info!("로그아웃 완료");
    }

    /// 조용한 토큰 갱신
    ///
    /// 비강제 호출은 최소 간격 안에서 직전 결과를 그대로 돌려준다.
    /// 동시에 들어온 호출은 하나의 네트워크 요청을 공유한다.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let _gate = self.refresh_gate.lock().await;

        if !self.is_authenticated() {
            return RefreshOutcome::NotAuthenticated;
        }
        let epoch = self.session_epoch();

        let acquired = self.refresh_throttle.try_acquire();
        if !force && !acquired {
            if let Some(previous) = *self.last_refresh.lock() {
                debug!(
                    "토큰 갱신 스로틀 (남은 {}초)",
                    self.refresh_throttle.remaining().as_secs()
                );
                return previous;
            }
        }
        if !acquired {
            self.refresh_throttle.mark();
        }

        let outcome = match self.api.refresh().await {
            Ok(grant) => {
                if self.is_current(epoch) {
                    self.record_grant(Some(grant));
                }
                debug!("토큰 갱신 성공");
                RefreshOutcome::Renewed
            }
            Err(e) if e.is_auth_rejection() => {
                if self.is_current(epoch) {
                    warn!("토큰 갱신 거부, 세션 종료: {e}");
                    self.clear_caches();
                    self.set(AuthSession::unauthenticated(Some(SESSION_EXPIRED.to_string())));
                }
                RefreshOutcome::Expired
            }
            Err(e) => {
                warn!("토큰 갱신 실패, 세션 유지: {e}");
                RefreshOutcome::Deferred
            }
        };

        // 갱신 도중 로그아웃/재로그인되었으면 결과를 캐시하지 않는다
        if self.is_current(epoch) {
            *self.last_refresh.lock() = Some(outcome);
        }
        outcome
    }

    /// 세션 재확인
    ///
    /// 검증 결과는 캐시 윈도우 동안 재사용되므로 실패한 검증이 곧바로 다시
    /// 검증을 부르는 루프가 생기지 않는다. 미인증 상태에서 유효한 세션이 확인되면
    /// 프로필을 받아 Authenticated로 전환한다.
    pub async fn check_session(&self, force: bool) -> bool {
        let epoch = self.session_epoch();
        match self.verify(force).await {
            Verification::Valid => {
                if self.is_authenticated() {
                    return true;
                }
                match self.api.fetch_profile().await {
                    Ok(user) => {
                        self.enter_authenticated(user, None);
                        true
                    }
                    Err(e) => {
                        debug!("세션 확인 후 프로필 조회 실패: {e}");
                        false
                    }
                }
            }
            Verification::Rejected(reason) => {
                if self.is_current(epoch) {
                    warn!("세션 검증 거부, 세션 종료: {reason}");
                    self.clear_caches();
                    self.set(AuthSession::unauthenticated(Some(SESSION_EXPIRED.to_string())));
                }
                false
            }
            Verification::Unreachable(reason) => {
                debug!("세션 검증 불가, 현재 상태 유지: {reason}");
                self.is_authenticated()
            }
        }
    }

    async fn verify(&self, force: bool) -> Verification {
        let _gate = self.verify_gate.lock().await;

        let acquired = self.verify_throttle.try_acquire();
        if !force && !acquired {
            if let Some(cached) = self.last_verification.lock().clone() {
                debug!("세션 검증 캐시 사용");
                return cached;
            }
        }
        if !acquired {
            self.verify_throttle.mark();
        }

        let verification = match self.api.verify().await {
            Ok(()) => Verification::Valid,
            Err(e) if e.is_auth_rejection() => Verification::Rejected(e.to_string()),
            Err(e) => Verification::Unreachable(e.to_string()),
        };
        *self.last_verification.lock() = Some(verification.clone());
        verification
    }

    async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<(UserProfile, TokenGrant), CoreError> {
        let grant = self.api.login(identifier, secret).await?;
        let user = self.api.fetch_profile().await?;
        Ok((user, grant))
    }

    fn enter_authenticated(&self, user: UserProfile, grant: Option<TokenGrant>) {
        self.record_grant(grant);
        // 방금 검증/발급된 세션이므로 바로 다시 검증/갱신하지 않는다
        *self.last_verification.lock() = Some(Verification::Valid);
        self.verify_throttle.mark();
        *self.last_refresh.lock() = Some(RefreshOutcome::Renewed);
        self.refresh_throttle.mark();

        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.set(AuthSession::authenticated(user));
    }

    fn record_grant(&self, grant: Option<TokenGrant>) {
        if let Some(secs) = grant.and_then(|g| g.expires_in_secs) {
            *self.expires_at.lock() = Some(Utc::now() + ChronoDuration::seconds(secs));
        }
    }

    fn clear_caches(&self) {
        *self.expires_at.lock() = None;
        *self.last_verification.lock() = None;
        self.verify_throttle.reset();
        *self.last_refresh.lock() = None;
        self.refresh_throttle.reset();
    }

    /// 요청 시작 시점의 세션이 아직 살아 있는지
    ///
    /// 로그아웃은 epoch를 바꾸지 않으므로 인증 여부도 함께 본다.
    fn is_current(&self, epoch: u64) -> bool {
        self.session_epoch() == epoch && self.is_authenticated()
    }

    fn set(&self, session: AuthSession) {
        let previous = self.state_tx.send_replace(session);
        let current = self.state_tx.borrow();
        if previous.phase() != current.phase() {
            info!("세션 상태: {} → {}", previous.phase(), current.phase());
        }
        if current.phase() == SessionPhase::Error {
            if let Some(err) = current.error() {
                warn!("세션 에러: {err}");
            }
        }
    }
}
