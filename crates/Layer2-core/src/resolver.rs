//! Metadata Resolver - 소스 우선순위 해석
//!
//! 캐시 계층(트랜잭션 캐시 -> 영속 스토어 -> 네트워크)을 순서대로 거쳐
//! 디스크립터를 해석합니다. 네트워크 단계는 설정된 소스 목록을 순서대로,
//! 각 소스 안에서는 카테고리를 순서대로 시도하며 첫 번째 유효한 응답이
//! 이깁니다.
//!
//! 소스 하나의 실패(타임아웃, HTTP 에러, 무효 디스크립터)는 경고만 남기고
//! 다음 후보로 넘어갑니다. 모든 후보가 소진되면 NotFound입니다.

use crate::descriptor::{split_qualified, Descriptor};
use crate::store::PluginStore;
use crate::transaction::Transaction;
use crate::transport::SourceTransport;
use chrono::Duration;
use plugforge_foundation::{Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// URL 빌더
// ============================================================================

/// 디스크립터 URL: `{source}/p/{category}/{name}[/{version}].json`
///
/// `version == "*"`는 최신을 의미하고 버전 세그먼트를 생략합니다.
pub fn descriptor_url(source: &str, category: &str, name: &str, version: &str) -> String {
    let source = source.trim_end_matches('/');
    if version == "*" {
        format!("{source}/p/{category}/{name}.json")
    } else {
        format!("{source}/p/{category}/{name}/{version}.json")
    }
}

/// 검색 URL: `{source}/s/search.json?terms={terms}`
pub fn search_url(source: &str, terms: &str) -> String {
    let source = source.trim_end_matches('/');
    format!("{source}/s/search.json?terms={}", urlencoding::encode(terms))
}

/// 최신 버전 문자열 URL: `{source}/v/{category}/{name}`
pub fn version_url(source: &str, category: &str, name: &str) -> String {
    let source = source.trim_end_matches('/');
    format!("{source}/v/{category}/{name}")
}

// ============================================================================
// MetadataResolver
// ============================================================================

/// 디스크립터 해석기
pub struct MetadataResolver {
    transport: Arc<dyn SourceTransport>,
    categories: Vec<String>,
    store_ttl: Duration,
}

impl MetadataResolver {
    pub fn new(
        transport: Arc<dyn SourceTransport>,
        categories: Vec<String>,
        store_ttl: Duration,
    ) -> Self {
        Self {
            transport,
            categories,
            store_ttl,
        }
    }

    /// 이름(선택적으로 `category/name`)과 버전 제약으로 디스크립터 해석
    ///
    /// 성공 시 영속 스토어와 트랜잭션 캐시를 모두 갱신합니다.
    ///
    /// 스토어 fast path는 무조건적이지 않습니다: 항목은 `store_ttl` 안에서만
    /// 재사용되고, 버전이 고정된 요청은 다른 버전으로 기록된 항목을 건너뛰고
    /// 네트워크로 갑니다. 이전 구현은 버전을 무시하고 이름만으로 항상 스토어를
    /// 우선했지만, 그러면 고정 설치가 오래된 디스크립터를 받게 됩니다.
    pub async fn resolve(
        &self,
        sources: &[String],
        store: &mut PluginStore,
        txn: &mut Transaction,
        name: &str,
        version: &str,
    ) -> Result<Descriptor> {
        let (category, bare_name) = split_qualified(name);
        let cache_key = format!("{bare_name}@{version}");

        if let Some(descriptor) = txn.cached(&cache_key) {
            return Ok(descriptor.clone());
        }

        // 버전이 고정된 요청은 스토어 항목이 그 버전일 때만 재사용 가능
        if let Some(entry) = store.fresh(bare_name, self.store_ttl) {
            if version == "*" || entry.version == version {
                debug!(name = bare_name, "Descriptor served from store");
                let descriptor = entry.data.clone();
                txn.cache(cache_key, descriptor.clone());
                return Ok(descriptor);
            }
        }

        self.resolve_network(sources, store, txn, category, bare_name, version)
            .await
    }

    /// 캐시 계층을 건너뛰고 네트워크에서 직접 해석
    ///
    /// 드리프트 검사용. 성공하면 스토어/트랜잭션 캐시는 똑같이 갱신됩니다.
    pub async fn resolve_fresh(
        &self,
        sources: &[String],
        store: &mut PluginStore,
        txn: &mut Transaction,
        name: &str,
        version: &str,
    ) -> Result<Descriptor> {
        let (category, bare_name) = split_qualified(name);
        self.resolve_network(sources, store, txn, category, bare_name, version)
            .await
    }

    async fn resolve_network(
        &self,
        sources: &[String],
        store: &mut PluginStore,
        txn: &mut Transaction,
        category: Option<&str>,
        name: &str,
        version: &str,
    ) -> Result<Descriptor> {
        // 정규화된 이름은 카테고리를 하나로 고정
        let categories: Vec<&str> = match category {
            Some(category) => vec![category],
            None => self.categories.iter().map(String::as_str).collect(),
        };

        for source in sources {
            for category in &categories {
                let url = descriptor_url(source, category, name, version);

                let value = match self.transport.fetch_json(&url).await {
                    Ok(Some(value)) => value,
                    Ok(None) => {
                        debug!(%url, "Descriptor not present at source");
                        continue;
                    }
                    Err(e) => {
                        warn!(%url, error = %e, "Source unreachable, trying next");
                        continue;
                    }
                };

                let mut descriptor = match Descriptor::from_value(value) {
                    Ok(descriptor) => descriptor,
                    Err(e) => {
                        warn!(%url, error = %e, "Source returned invalid descriptor");
                        continue;
                    }
                };

                // 응답에 카테고리가 없으면 해석에 쓰인 카테고리로 태깅
                descriptor.category.get_or_insert_with(|| category.to_string());

                store.put(&descriptor);
                txn.cache(format!("{name}@{version}"), descriptor.clone());
                return Ok(descriptor);
            }
        }

        Err(Error::NotFound(name.to_string()))
    }
}

// ============================================================================
// 테스트
// ============================================================================
