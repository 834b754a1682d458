//! Plugin Descriptor - 원격 플러그인 메타데이터
//!
//! 소스가 제공하는 JSON 레코드를 강타입으로 모델링합니다.
//! `name`/`version`/`ext`/`src`/`plugin` 중 하나라도 없으면 해당 디스크립터는
//! 무효이며, 구조화된 필드를 읽기 전에 파싱 단계에서 거부됩니다.

use plugforge_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Descriptor - 플러그인 디스크립터
// ============================================================================

/// 원격 소스가 기술하는 설치 가능한 플러그인 하나
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// 플러그인 이름 (카테고리 없이)
    pub name: String,

    /// 버전 문자열
    pub version: String,

    /// 소스 파일 확장자 (예: "cs")
    pub ext: String,

    /// 소스 원문 URL
    pub src: String,

    /// 해석된 카테고리 (소스 응답에 없으면 해석 시점에 태깅)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// 플러그인 상세 메타데이터
    pub plugin: PluginMeta,
}

/// `plugin` 하위 오브젝트
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// 의존성: 이름 -> 버전 제약 ("*" = 최신)
    #[serde(default)]
    pub require: BTreeMap<String, String>,

    /// 권고 의존성 (설치하지 않고 안내만)
    #[serde(default)]
    pub suggest: BTreeMap<String, String>,
}

impl Descriptor {
    /// JSON 값에서 디스크립터 파싱
    ///
    /// 필수 필드가 빠진 경우 `Error::InvalidDescriptor`가 되며, 호출자는
    /// 해당 소스를 "없음"으로 취급하고 다음 소스로 넘어갑니다.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value::<Descriptor>(value)
            .map_err(|e| Error::InvalidDescriptor(e.to_string()))
    }

    /// 카테고리가 있으면 `category/name`, 없으면 `name`
    pub fn qualified_name(&self) -> String {
        match &self.category {
            Some(category) => format!("{}/{}", category, self.name),
            None => self.name.clone(),
        }
    }

    /// 소스 URL (JSON 이스케이프로 끼어든 역슬래시 제거)
    pub fn src_url(&self) -> String {
        self.src.replace('\\', "")
    }

    /// 버전 시그니처: `name-version`
    ///
    /// 의존성 검증기가 동일 플러그인의 서로 다른 버전 요구를 탐지할 때 사용.
    pub fn signature(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

// ============================================================================
// 정규화된 이름 처리
// ============================================================================

/// `category/name` 형태의 정규화된 이름을 분해
///
/// `/`가 없으면 카테고리는 None이고 모든 카테고리를 순서대로 시도합니다.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.split_once('/') {
        Some((category, bare)) if !category.is_empty() => (Some(category), bare),
        _ => (None, name),
    }
}

// ============================================================================
// 테스트
// ============================================================================
