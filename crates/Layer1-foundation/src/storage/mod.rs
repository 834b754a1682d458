//! Storage module for PlugForge
//!
//! - `json`: JSON - 설정/캐시 파일 저장 및 로드

mod json;

pub use json::JsonStore;
