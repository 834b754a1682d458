//! Config - 설정 관리
//!
//! - `settings.rs` - Settings (소스 목록, RequiredSet, 디버그 플래그)

mod settings;

pub use settings::{Settings, SETTINGS_FILE};
