//! Plugin Store - 디스크립터 영속 캐시
//!
//! 플러그인 이름별로 마지막으로 해석된 디스크립터를 단일 JSON 파일에
//! 보관합니다. 해석 성공 시마다 갱신되고, EndCommit 시점에 영속화됩니다.

use crate::descriptor::Descriptor;
use chrono::{DateTime, Duration, Utc};
use plugforge_foundation::{JsonStore, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// 캐시 파일명
pub const STORE_FILE: &str = "store.json";

// ============================================================================
// StoreEntry - 캐시 항목
// ============================================================================

/// 플러그인 하나의 마지막 해석 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEntry {
    /// 플러그인 이름 (카테고리 없이)
    pub name: String,

    /// 디스크립터 전문
    pub data: Descriptor,

    /// 해석 당시 버전
    pub version: String,

    /// 마지막 해석 시각
    pub last_checked: DateTime<Utc>,
}

// ============================================================================
// PluginStore - 캐시 저장소
// ============================================================================

/// 디스크립터 영속 캐시
///
/// 워커 스레드만 접근하므로 잠금 없이 소유됩니다.
pub struct PluginStore {
    backing: JsonStore,
    entries: BTreeMap<String, StoreEntry>,
}

impl PluginStore {
    /// 파일에서 열기 (없거나 손상되면 빈 캐시)
    pub fn open(backing: JsonStore) -> Self {
        let entries: BTreeMap<String, StoreEntry> = backing.load_or_default(STORE_FILE);
        if !entries.is_empty() {
            debug!("Loaded {} cached plugin descriptors", entries.len());
        }
        Self { backing, entries }
    }

    /// 이름으로 조회 (신선도 무시)
    pub fn get(&self, name: &str) -> Option<&StoreEntry> {
        self.entries.get(name)
    }

    /// 신선한 항목만 조회
    ///
    /// `last_checked`가 `max_age`보다 오래된 항목은 네트워크 재해석 대상으로
    /// 간주하고 None을 반환합니다.
    pub fn fresh(&self, name: &str, max_age: Duration) -> Option<&StoreEntry> {
        self.entries
            .get(name)
            .filter(|entry| Utc::now() - entry.last_checked <= max_age)
    }

    /// 해석 성공한 디스크립터로 항목 생성/갱신
    pub fn put(&mut self, descriptor: &Descriptor) {
        let entry = StoreEntry {
            name: descriptor.name.clone(),
            version: descriptor.version.clone(),
            data: descriptor.clone(),
            last_checked: Utc::now(),
        };
        self.entries.insert(descriptor.name.clone(), entry);
    }

    /// 디스크에 영속화
    pub fn persist(&self) -> Result<()> {
        self.backing.save(STORE_FILE, &self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// 테스트
// ============================================================================
