//! Source Transport - 원격 소스 I/O 경계
//!
//! 코어는 이 trait만 알고, HTTP 구현은 뒤에 숨깁니다. 테스트는 인메모리
//! 구현으로 대체합니다.
//!
//! 404는 에러가 아니라 "이 소스에는 없음"입니다. HTTP 404와 소스가 본문으로
//! 돌려주는 `{"404": "Not found"}` 리터럴 둘 다 `Ok(None)`으로 매핑됩니다.

use async_trait::async_trait;
use plugforge_foundation::{Error, Result};
use reqwest::StatusCode;
use std::time::Duration;

/// 요청 타임아웃
///
/// 느린 소스 하나가 워커 전체를 잡아두지 않도록 모든 fetch를 제한합니다.
/// 타임아웃은 해당 소스의 soft error로 처리되어 다음 소스로 넘어갑니다.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 원격 소스에서 디스크립터/원문을 가져오는 경계
#[async_trait]
pub trait SourceTransport: Send + Sync {
    /// JSON 문서 조회. 404 상응 응답은 `Ok(None)`.
    async fn fetch_json(&self, url: &str) -> Result<Option<serde_json::Value>>;

    /// 텍스트 문서 조회 (플러그인 소스 원문, 버전 문자열)
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

// ============================================================================
// HttpTransport - reqwest 구현
// ============================================================================

/// reqwest 기반 HTTP 전송
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("PlugForge")
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

#[async_trait]
impl SourceTransport for HttpTransport {
    async fn fetch_json(&self, url: &str) -> Result<Option<serde_json::Value>> {
        let response = self.get(url).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        // 소스가 본문으로 돌려주는 not-found 리터럴
        if value.get("404").is_some() {
            return Ok(None);
        }

        Ok(Some(value))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;

        if !response.status().is_success() {
            return Err(Error::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}
