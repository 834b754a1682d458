//! Settings - PlugForge 영속 설정
//!
//! 관리자가 선언한 "설치되어야 하는 플러그인 집합"(RequiredSet)과
//! 소스 우선순위 목록을 담는 단일 JSON 파일입니다. 커밋 액션을 통해서만
//! RequiredSet이 변경됩니다.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 설정 파일명
pub const SETTINGS_FILE: &str = "settings.json";

fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_source_list() -> Vec<String> {
    vec!["https://plugins.plugforge.dev".to_string()]
}

/// PlugForge 설정
///
/// `require`는 정규화된 플러그인 이름(선택적으로 `category/name`)에서
/// 고정 버전("*" = 최신)으로의 매핑입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// 스키마 버전 (마이그레이션용)
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// 소스 URL 목록 (우선순위 순)
    #[serde(default = "default_source_list")]
    pub source_list: Vec<String>,

    /// 디버그 로깅 여부
    #[serde(default)]
    pub debug: bool,

    /// RequiredSet: 이름 -> 고정 버전
    #[serde(default)]
    pub require: BTreeMap<String, String>,

    /// 개발용 RequiredSet (배포 대상에서 제외)
    #[serde(default)]
    pub require_dev: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            source_list: default_source_list(),
            debug: false,
            require: BTreeMap::new(),
            require_dev: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 저장소에서 로드, 파일이 없으면 기본값을 기록 후 반환
    pub fn load_or_init(store: &JsonStore) -> Result<Self> {
        if let Some(settings) = store.load_optional::<Settings>(SETTINGS_FILE)? {
            return Ok(settings);
        }

        let settings = Settings::default();
        settings.save(store)?;
        Ok(settings)
    }

    /// 저장소에 기록
    pub fn save(&self, store: &JsonStore) -> Result<()> {
        store.save(SETTINGS_FILE, self)
    }

    // ========================================================================
    // 소스 목록
    // ========================================================================

    /// 소스 토글: 없으면 추가(true), 있으면 제거(false)
    pub fn toggle_source(&mut self, url: &str) -> bool {
        if let Some(pos) = self.source_list.iter().position(|s| s == url) {
            self.source_list.remove(pos);
            false
        } else {
            self.source_list.push(url.to_string());
            true
        }
    }

    // ========================================================================
    // RequiredSet
    // ========================================================================

    pub fn is_required(&self, name: &str) -> bool {
        self.require.contains_key(name)
    }
}
