//! 애플리케이션 설정 구조체.
//!
//! 백엔드 탐색 후보, 호출별 타임아웃, 연결 확인 주기, 세션 타이머 설정을 정의한다.
//! 모든 섹션은 `#[serde(default)]`이므로 일부만 적힌 설정 파일도 로드된다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 백엔드 탐색 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 호출 종류별 타임아웃
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// 연결 확인 설정
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
    /// 세션 타이머 설정
    #[serde(default)]
    pub session: SessionConfig,
    /// 인증 설정
    #[serde(default)]
    pub auth: AuthConfig,
}

// ============================================================
// 백엔드 탐색 설정
// ============================================================

/// 백엔드 탐색 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 클라이언트가 서비스되는 origin (후보 URL 생성 기준)
    #[serde(default = "default_app_origin")]
    pub app_origin: String,
    /// 환경별 기본 백엔드 URL (dev/prod). 자동 후보보다 먼저 프로브한다
    #[serde(default)]
    pub backend_url: Option<String>,
    /// REST API 경로 접두사
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// 로컬 호스트일 때 시도할 포트 (순서 유지)
    #[serde(default = "default_candidate_ports")]
    pub candidate_ports: Vec<u16>,
    /// 원격 호스트일 때 시도할 서브도메인 (same-origin 다음)
    #[serde(default = "default_candidate_subdomains")]
    pub candidate_subdomains: Vec<String>,
    /// 생존 확인용 경량 경로
    #[serde(default = "default_debug_path")]
    pub debug_path: String,
    /// 사용자 프로필 경로
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
    /// 클라이언트 로그인 라우트 (리다이렉트 대상)
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

fn default_app_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_candidate_ports() -> Vec<u16> {
    vec![8000, 3000, 8080]
}

fn default_candidate_subdomains() -> Vec<String> {
    vec!["api".to_string(), "backend".to_string()]
}

fn default_debug_path() -> String {
    "/auth/debug/".to_string()
}

fn default_profile_path() -> String {
    "/users/me/".to_string()
}

fn default_login_route() -> String {
    "/login".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            app_origin: default_app_origin(),
            backend_url: None,
            api_prefix: default_api_prefix(),
            candidate_ports: default_candidate_ports(),
            candidate_subdomains: default_candidate_subdomains(),
            debug_path: default_debug_path(),
            profile_path: default_profile_path(),
            login_route: default_login_route(),
        }
    }
}

// ============================================================
// 타임아웃 설정
// ============================================================

/// 호출 종류별 타임아웃 (밀리초). 타임아웃은 네트워크 실패로 취급된다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub probe_ms: u64,
    pub verify_ms: u64,
    pub refresh_ms: u64,
    pub logout_ms: u64,
    pub profile_ms: u64,
    pub login_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_ms: 2_500,
            verify_ms: 5_000,
            refresh_ms: 10_000,
            logout_ms: 5_000,
            profile_ms: 10_000,
            login_ms: 15_000,
        }
    }
}

impl TimeoutConfig {
    pub fn probe(&self) -> Duration {
        Duration::from_millis(self.probe_ms)
    }

    pub fn verify(&self) -> Duration {
        Duration::from_millis(self.verify_ms)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    pub fn logout(&self) -> Duration {
        Duration::from_millis(self.logout_ms)
    }

    pub fn profile(&self) -> Duration {
        Duration::from_millis(self.profile_ms)
    }

    pub fn login(&self) -> Duration {
        Duration::from_millis(self.login_ms)
    }
}

// ============================================================
// 연결 확인 설정
// ============================================================

/// 연결 확인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// 비강제 확인 결과 캐시 유지 시간
    pub throttle_window_ms: u64,
    /// 실패 시 재폴링 백오프 순서 (마지막 값에서 멈춤)
    pub backoff_ms: Vec<u64>,
    /// 연결 정상일 때 재확인 주기
    pub healthy_poll_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            throttle_window_ms: 30_000,
            backoff_ms: vec![2_000, 5_000, 10_000, 30_000, 60_000],
            healthy_poll_ms: 30_000,
        }
    }
}

impl ConnectivityConfig {
    pub fn throttle_window(&self) -> Duration {
        Duration::from_millis(self.throttle_window_ms)
    }

    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }

    pub fn healthy_poll(&self) -> Duration {
        Duration::from_millis(self.healthy_poll_ms)
    }
}

// ============================================================
// 세션 타이머 설정
// ============================================================

/// 세션 타이머 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 주기적 토큰 갱신 간격
    pub refresh_interval_ms: u64,
    /// 첫 갱신에 더하는 무작위 지연 하한
    pub refresh_jitter_min_ms: u64,
    /// 첫 갱신에 더하는 무작위 지연 상한
    pub refresh_jitter_max_ms: u64,
    /// 세션 시작 후 만료 임박 알림까지
    pub expiry_warning_after_ms: u64,
    /// 알림 중 사용자 활동 디바운스
    pub activity_debounce_ms: u64,
    /// 비강제 갱신 사이 최소 간격
    pub min_refresh_interval_ms: u64,
    /// 세션 검증 결과 캐시 유지 시간
    pub verify_cache_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 30 * 60 * 1_000,
            refresh_jitter_min_ms: 5_000,
            refresh_jitter_max_ms: 20_000,
            expiry_warning_after_ms: 4 * 60 * 1_000,
            activity_debounce_ms: 5_000,
            min_refresh_interval_ms: 60_000,
            verify_cache_ms: 30_000,
        }
    }
}

/// 주기적 갱신 간격 하한 (0이면 타이머를 만들 수 없음)
const MIN_REFRESH_INTERVAL_MS: u64 = 1_000;

impl SessionConfig {
    /// 갱신 간격 (1초 미만은 1초로 올림)
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(MIN_REFRESH_INTERVAL_MS))
    }

    /// 지터 범위 (min > max로 잘못 설정되면 min으로 고정)
    pub fn refresh_jitter_range(&self) -> (Duration, Duration) {
        let min = self.refresh_jitter_min_ms;
        let max = self.refresh_jitter_max_ms.max(min);
        (Duration::from_millis(min), Duration::from_millis(max))
    }

    pub fn expiry_warning_after(&self) -> Duration {
        Duration::from_millis(self.expiry_warning_after_ms)
    }

    pub fn activity_debounce(&self) -> Duration {
        Duration::from_millis(self.activity_debounce_ms)
    }

    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.min_refresh_interval_ms)
    }

    pub fn verify_cache(&self) -> Duration {
        Duration::from_millis(self.verify_cache_ms)
    }
}

// ============================================================
// 인증 설정
// ============================================================

/// 부팅 시 세션 복구 실패 후 시도할 자동 로그인 자격증명
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// 인증 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 자동 로그인 (없으면 미인증 상태로 시작)
    #[serde(default)]
    pub auto_login: Option<Credentials>,
}
