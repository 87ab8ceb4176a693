//! 인증 REST 클라이언트.
//!
//! `AuthApi` 포트 구현. 요청마다 [`BackendLocator`]에서 기본 URL을 얻는다.
//! 세션은 쿠키(reqwest cookie store)로 유지되며, 서버가 토큰을 돌려주면
//! Bearer 헤더도 함께 보낸다.

use async_trait::async_trait;
use pandora_core::config::{ServerConfig, TimeoutConfig};
use pandora_core::error::CoreError;
use pandora_core::models::session::UserProfile;
use pandora_core::ports::auth_api::{AuthApi, TokenGrant};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::locator::BackendLocator;
use crate::map_transport_error;

/// 서버 응답: 로그인/리프레시 (쿠키 세션이면 본문이 비어 있을 수 있음)
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default, alias = "access_token", alias = "token")]
    access: Option<String>,
    #[serde(default, alias = "refresh_token")]
    refresh: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// 보관 중인 토큰
#[derive(Debug, Clone, Default)]
struct TokenState {
    access: Option<String>,
    refresh: Option<String>,
}

/// reqwest 기반 인증 API 클라이언트
pub struct HttpAuthApi {
    client: reqwest::Client,
    locator: Arc<BackendLocator>,
    timeouts: TimeoutConfig,
    profile_path: String,
    tokens: RwLock<TokenState>,
}

impl HttpAuthApi {
    /// 새 클라이언트 생성
    pub fn new(
        locator: Arc<BackendLocator>,
        server: &ServerConfig,
        timeouts: TimeoutConfig,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            locator,
            timeouts,
            profile_path: server.profile_path.clone(),
            tokens: RwLock::new(TokenState::default()),
        })
    }

    /// 현재 Bearer 토큰 보유 여부
    pub async fn has_token(&self) -> bool {
        self.tokens.read().await.access.is_some()
    }

    async fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        timeout: Duration,
    ) -> Result<reqwest::RequestBuilder, CoreError> {
        let endpoint = self.locator.current_or_resolve().await?;
        let url = endpoint.join(path);
        let mut req = self.client.request(method, &url).timeout(timeout);
        if let Some(token) = self.tokens.read().await.access.as_deref() {
            req = req.bearer_auth(token);
        }
        Ok(req)
    }

    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        timeout: Duration,
        context: &str,
    ) -> Result<reqwest::Response, CoreError> {
        req.send().await.map_err(|e| {
            if e.is_connect() {
                // 백엔드가 내려갔거나 바뀌었을 수 있으므로 다음 호출에서 다시 결정
                self.locator.invalidate();
            }
            map_transport_error(e, timeout, context)
        })
    }

    async fn store_tokens(&self, body: &str) -> TokenGrant {
        let parsed: TokenResponse = if body.trim().is_empty() {
            TokenResponse::default()
        } else {
            serde_json::from_str(body).unwrap_or_else(|e| {
                debug!("토큰 응답이 JSON이 아님, 쿠키 세션으로 간주: {e}");
                TokenResponse::default()
            })
        };

        let mut tokens = self.tokens.write().await;
        if parsed.access.is_some() {
            tokens.access = parsed.access;
        }
        if parsed.refresh.is_some() {
            tokens.refresh = parsed.refresh;
        }

        TokenGrant {
            expires_in_secs: parsed.expires_in,
        }
    }
}

/// 응답 상태 코드 확인 및 에러 매핑
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let text = resp.text().await.unwrap_or_else(|e| {
        warn!("응답 본문 읽기 실패: {e}");
        String::new()
    });

    match status.as_u16() {
        401 | 403 => Err(CoreError::Auth(format!("인증 실패 ({status}): {text}"))),
        429 => Err(CoreError::RateLimit {
            retry_after_secs: 60,
        }),
        503 => Err(CoreError::ServiceUnavailable(text)),
        _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, CoreError> {
        let timeout = self.timeouts.login();
        let body = serde_json::json!({
            "username": username,
            "password": password,
        });
        let req = self
            .request(reqwest::Method::POST, "/auth/login/", timeout)
            .await?
            .json(&body);
        let resp = self.send(req, timeout, "로그인 요청 실패").await?;

        // 로그인은 200 이외 모두 인증 실패
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!("로그인 실패 ({status}): {text}")));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| map_transport_error(e, timeout, "로그인 응답 읽기 실패"))?;
        let grant = self.store_tokens(&text).await;
        debug!("로그인 성공: {username}");
        Ok(grant)
    }

    async fn verify(&self) -> Result<(), CoreError> {
        let timeout = self.timeouts.verify();
        let req = self
            .request(reqwest::Method::POST, "/auth/verify/", timeout)
            .await?;
        let resp = self.send(req, timeout, "세션 검증 요청 실패").await?;
        check_response(resp).await?;
        Ok(())
    }

    async fn refresh(&self) -> Result<TokenGrant, CoreError> {
        let timeout = self.timeouts.refresh();
        let mut req = self
            .request(reqwest::Method::POST, "/auth/refresh/", timeout)
            .await?;
        if let Some(refresh) = self.tokens.read().await.refresh.clone() {
            req = req.json(&serde_json::json!({ "refresh": refresh }));
        }
        let resp = self.send(req, timeout, "토큰 갱신 요청 실패").await?;
        let resp = check_response(resp).await?;

        let text = resp
            .text()
            .await
            .map_err(|e| map_transport_error(e, timeout, "갱신 응답 읽기 실패"))?;
        let grant = self.store_tokens(&text).await;
        debug!("토큰 갱신 성공, 만료 힌트: {:?}초", grant.expires_in_secs);
        Ok(grant)
    }

    async fn logout(&self) -> Result<(), CoreError> {
        let timeout = self.timeouts.logout();
        let result: Result<(), CoreError> = async {
            let req = self
                .request(reqwest::Method::POST, "/auth/logout/", timeout)
                .await?;
            let resp = self.send(req, timeout, "로그아웃 요청 실패").await?;
            check_response(resp).await.map(|_| ())
        }
        .await;

        // 서버 응답과 무관하게 로컬 토큰은 폐기
        *self.tokens.write().await = TokenState::default();
        result
    }

    async fn fetch_profile(&self) -> Result<UserProfile, CoreError> {
        let timeout = self.timeouts.profile();
        let req = self
            .request(reqwest::Method::GET, &self.profile_path, timeout)
            .await?;
        let resp = self.send(req, timeout, "프로필 요청 실패").await?;
        let resp = check_response(resp).await?;

        resp.json::<UserProfile>()
            .await
            .map_err(|e| CoreError::Internal(format!("프로필 응답 파싱 실패: {e}")))
    }
}
