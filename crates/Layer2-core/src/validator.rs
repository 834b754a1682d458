//! Dependency Validator - 재귀 의존성 검증
//!
//! 설치/업데이트/명시적 validate 전에 RequiredSet(그리고 후보 디스크립터)의
//! 의존성 그래프 전체가 해석 가능하고 버전 충돌이 없는지 확인합니다.
//!
//! 검증기는 방문한 플러그인 이름과 `name-version` 시그니처를 추적합니다.
//! 같은 시그니처의 재방문은 무해하고(다이아몬드 의존성), 같은 이름이 다른
//! 시그니처로 나타나면 충돌입니다. 검증 실패는 트랜잭션 에러로 기록되어
//! 트랜잭션 전체를 무효화합니다.

use crate::descriptor::Descriptor;
use crate::resolver::MetadataResolver;
use crate::store::PluginStore;
use crate::transaction::Transaction;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// 검증 1회분의 방문 상태
///
/// 트랜잭션마다 새로 만들어 사용합니다. 재사용하면 이전 검증의 시그니처가
/// 남아 충돌을 놓칠 수 있습니다.
#[derive(Default)]
pub struct DependencyValidator {
    seen_names: HashSet<String>,
    seen_signatures: HashSet<String>,
}

impl DependencyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `require` 전체(+선택적 설치 후보)를 검증
    ///
    /// 새 에러가 하나도 기록되지 않았으면 true. 발견된 문제는 전부
    /// `txn`에 기록됩니다.
    pub async fn passes(
        &mut self,
        resolver: &MetadataResolver,
        sources: &[String],
        store: &mut PluginStore,
        txn: &mut Transaction,
        require: &BTreeMap<String, String>,
        candidate: Option<&Descriptor>,
    ) -> bool {
        let errors_before = txn.errors().len();

        self.check_in_all(resolver, sources, store, txn, require)
            .await;
        if let Some(descriptor) = candidate {
            self.check_in(resolver, sources, store, txn, descriptor)
                .await;
        }

        txn.errors().len() == errors_before
    }

    // check_in과 상호 재귀이므로 future를 boxing해서 순환을 끊는다
    fn check_in_all<'a>(
        &'a mut self,
        resolver: &'a MetadataResolver,
        sources: &'a [String],
        store: &'a mut PluginStore,
        txn: &'a mut Transaction,
        require: &'a BTreeMap<String, String>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            for (name, version) in require {
                match resolver.resolve(sources, store, txn, name, version).await {
                    Ok(descriptor) => {
                        self.check_in(resolver, sources, store, txn, &descriptor)
                            .await;
                    }
                    Err(e) => {
                        debug!(name, error = %e, "Dependency failed to resolve");
                        txn.error(format!("{name} does not exist or invalid"));
                    }
                }
            }
        })
    }

    async fn check_in(
        &mut self,
        resolver: &MetadataResolver,
        sources: &[String],
        store: &mut PluginStore,
        txn: &mut Transaction,
        descriptor: &Descriptor,
    ) {
        let signature = descriptor.signature();

        // 같은 버전의 재방문은 이미 검증된 경로
        if self.seen_signatures.contains(&signature) {
            return;
        }
        if self.seen_names.contains(&descriptor.name) {
            txn.error(format!(
                "Cannot resolve multiple versions of same plugin: {}",
                descriptor.name
            ));
            return;
        }

        self.seen_names.insert(descriptor.name.clone());
        self.seen_signatures.insert(signature);

        self.check_in_all(resolver, sources, store, txn, &descriptor.plugin.require)
            .await;
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{descriptor_value, FakeTransport};
    use chrono::Duration;
    use plugforge_foundation::JsonStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        resolver: MetadataResolver,
        store: PluginStore,
        sources: Vec<String>,
        _temp: TempDir,
    }

    fn fixture(transport: FakeTransport) -> Fixture {
        let temp = TempDir::new().unwrap();
        Fixture {
            resolver: MetadataResolver::new(
                Arc::new(transport),
                vec!["rust".into()],
                Duration::minutes(60),
            ),
            store: PluginStore::open(JsonStore::new(temp.path())),
            sources: vec!["http://a".into()],
            _temp: temp,
        }
    }

    fn require(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_valid_chain_passes() {
        let mut transport = FakeTransport::default();
        transport.add_json(
            "http://a/p/rust/top.json",
            descriptor_value("top", "1.0", &[("mid", "*")]),
        );
        transport.add_json(
            "http://a/p/rust/mid.json",
            descriptor_value("mid", "1.0", &[("base", "*")]),
        );
        transport.add_json(
            "http://a/p/rust/base.json",
            descriptor_value("base", "1.0", &[]),
        );

        let mut fx = fixture(transport);
        let mut txn = Transaction::new();
        let mut validator = DependencyValidator::new();

        let ok = validator
            .passes(
                &fx.resolver,
                &fx.sources,
                &mut fx.store,
                &mut txn,
                &require(&[("top", "*")]),
                None,
            )
            .await;

        assert!(ok);
        assert!(txn.is_valid());
    }

    #[tokio::test]
    async fn test_missing_dependency_records_exact_error() {
        let mut transport = FakeTransport::default();
        transport.add_json(
            "http://a/p/rust/top.json",
            descriptor_value("top", "1.0", &[("ghost", "*")]),
        );

        let mut fx = fixture(transport);
        let mut txn = Transaction::new();
        let mut validator = DependencyValidator::new();

        let ok = validator
            .passes(
                &fx.resolver,
                &fx.sources,
                &mut fx.store,
                &mut txn,
                &require(&[("top", "*")]),
                None,
            )
            .await;

        assert!(!ok);
        assert!(!txn.is_valid());
        assert_eq!(txn.errors(), &["ghost does not exist or invalid".to_string()]);
    }

    #[tokio::test]
    async fn test_version_conflict_records_exact_error() {
        let mut transport = FakeTransport::default();
        transport.add_json(
            "http://a/p/rust/left.json",
            descriptor_value("left", "1.0", &[("shared", "1.0")]),
        );
        transport.add_json(
            "http://a/p/rust/right.json",
            descriptor_value("right", "1.0", &[("shared", "2.0")]),
        );
        transport.add_json(
            "http://a/p/rust/shared/1.0.json",
            descriptor_value("shared", "1.0", &[]),
        );
        transport.add_json(
            "http://a/p/rust/shared/2.0.json",
            descriptor_value("shared", "2.0", &[]),
        );

        let mut fx = fixture(transport);
        let mut txn = Transaction::new();
        let mut validator = DependencyValidator::new();

        let ok = validator
            .passes(
                &fx.resolver,
                &fx.sources,
                &mut fx.store,
                &mut txn,
                &require(&[("left", "*"), ("right", "*")]),
                None,
            )
            .await;

        assert!(!ok);
        assert_eq!(
            txn.errors(),
            &["Cannot resolve multiple versions of same plugin: shared".to_string()]
        );
    }

    #[tokio::test]
    async fn test_diamond_same_version_is_fine() {
        let mut transport = FakeTransport::default();
        transport.add_json(
            "http://a/p/rust/left.json",
            descriptor_value("left", "1.0", &[("shared", "1.0")]),
        );
        transport.add_json(
            "http://a/p/rust/right.json",
            descriptor_value("right", "1.0", &[("shared", "1.0")]),
        );
        transport.add_json(
            "http://a/p/rust/shared/1.0.json",
            descriptor_value("shared", "1.0", &[]),
        );

        let mut fx = fixture(transport);
        let mut txn = Transaction::new();
        let mut validator = DependencyValidator::new();

        let ok = validator
            .passes(
                &fx.resolver,
                &fx.sources,
                &mut fx.store,
                &mut txn,
                &require(&[("left", "*"), ("right", "*")]),
                None,
            )
            .await;

        assert!(ok);
        assert!(txn.is_valid());
    }

    #[tokio::test]
    async fn test_candidate_conflicts_with_required_set() {
        let mut transport = FakeTransport::default();
        transport.add_json(
            "http://a/p/rust/shared/1.0.json",
            descriptor_value("shared", "1.0", &[]),
        );

        let mut fx = fixture(transport);
        let mut txn = Transaction::new();
        let mut validator = DependencyValidator::new();

        let candidate = Descriptor::from_value(descriptor_value("shared", "2.0", &[])).unwrap();
        let ok = validator
            .passes(
                &fx.resolver,
                &fx.sources,
                &mut fx.store,
                &mut txn,
                &require(&[("shared", "1.0")]),
                Some(&candidate),
            )
            .await;

        assert!(!ok);
        assert_eq!(
            txn.errors(),
            &["Cannot resolve multiple versions of same plugin: shared".to_string()]
        );
    }
}
