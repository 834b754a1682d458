//! # plugforge-foundation
//!
//! Foundation layer for PlugForge:
//! - Error: 중앙 에러 타입 (`Error`, `Result`)
//! - Config: 영속 설정 (`Settings` - 소스 목록, RequiredSet)
//! - Storage: JSON 파일 저장소 (`JsonStore`)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{Settings, SETTINGS_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
