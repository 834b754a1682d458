//! Error types for PlugForge
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// PlugForge 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 메타데이터 해석 관련
    // ========================================================================
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Transport error: {0}")]
    Transport(String),

    // ========================================================================
    // 트랜잭션 관련
    // ========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 해석(resolve) 단계에서 다음 소스로 넘어갈 수 있는 에러인지 확인
    ///
    /// Transport 실패와 NotFound/InvalidDescriptor는 소스 단위로 복구 가능하고,
    /// 나머지는 현재 트랜잭션을 중단시킵니다.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::NotFound(_) | Error::InvalidDescriptor(_)
        )
    }

    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidDescriptor(_) | Error::Validation(_)
        )
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
