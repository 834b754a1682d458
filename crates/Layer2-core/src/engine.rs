//! Package Engine - 설치/업데이트/제거/검증 오케스트레이션
//!
//! 엔진은 워커 태스크가 단독 소유합니다. 모든 커맨드가 큐로 직렬화되므로
//! 내부 상태(설정, 영속 스토어)에 잠금이 없습니다.
//!
//! 변경 작업은 모두 트랜잭션 안에서 수행됩니다: 작업은 `CommitAction`을
//! 버퍼링만 하고, `end_commit`이 트랜잭션이 유효할 때만 전부 적용합니다.

use crate::descriptor::{split_qualified, Descriptor};
use crate::host::PluginHost;
use crate::resolver::{version_url, MetadataResolver};
use crate::store::PluginStore;
use crate::transaction::{CommitAction, Transaction};
use crate::transport::SourceTransport;
use crate::validator::DependencyValidator;
use crate::version;
use chrono::Duration;
use plugforge_foundation::{JsonStore, Result, Settings};
use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// EngineConfig - 구성
// ============================================================================

/// 엔진 구성 (설정 파일과 달리 호스트 환경이 구성 시점에 고정)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 플러그인 파일이 설치되는 디렉토리
    pub plugin_dir: PathBuf,

    /// 카테고리 시도 순서 (정규화되지 않은 이름일 때)
    pub categories: Vec<String>,

    /// 영속 스토어 항목의 신선도 윈도우 (분)
    pub store_ttl_minutes: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            categories: vec!["rust".to_string(), "universal".to_string()],
            store_ttl_minutes: 60,
        }
    }
}

// ============================================================================
// 작업 결과
// ============================================================================

/// 변경 작업 하나의 결과
///
/// `Queued`만 새 커밋 액션을 버퍼링했음을 뜻합니다. 나머지는 아무것도
/// 바꾸지 않았거나(Already*) 작업이 성립하지 않은 경우입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpReport {
    /// 커밋 액션이 버퍼링됨
    Queued,
    /// 같은 버전이 이미 설치되어 있음 (Require만 갱신될 수 있음)
    AlreadyInstalled,
    /// 업데이트 불필요
    AlreadyCurrent,
    /// 설치되어 있지 않음
    NotInstalled,
    /// 어떤 소스에서도 해석 불가
    NotFound,
    /// 검증 실패 또는 다운로드 실패로 트랜잭션 무효화
    Invalid,
}

/// 설치본과 소스 사이의 드리프트 판정
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftReport {
    /// 버전/내용 모두 일치
    Current,
    /// 버전 불일치
    VersionMismatch { local: String, remote: String },
    /// 버전은 같지만 소스 내용이 다름
    SourceMismatch,
    /// 소스에서 더 이상 해석되지 않음
    NoUpgradePath,
    /// 로드되어 있지 않음
    NotInstalled,
}

// ============================================================================
// PackageEngine
// ============================================================================

pub struct PackageEngine {
    settings: Settings,
    config_store: JsonStore,
    store: PluginStore,
    resolver: MetadataResolver,
    transport: Arc<dyn SourceTransport>,
    host: Arc<dyn PluginHost>,
    config: EngineConfig,
}

impl PackageEngine {
    pub fn new(
        config_store: JsonStore,
        transport: Arc<dyn SourceTransport>,
        host: Arc<dyn PluginHost>,
        config: EngineConfig,
    ) -> Result<Self> {
        let settings = Settings::load_or_init(&config_store)?;
        let store = PluginStore::open(config_store.clone());
        let resolver = MetadataResolver::new(
            transport.clone(),
            config.categories.clone(),
            Duration::minutes(config.store_ttl_minutes),
        );

        Ok(Self {
            settings,
            config_store,
            store,
            resolver,
            transport,
            host,
            config,
        })
    }

    /// 플러그인 디렉토리 준비
    pub async fn initialize(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.config.plugin_dir).await?;
        info!(
            plugin_dir = %self.config.plugin_dir.display(),
            sources = self.settings.source_list.len(),
            required = self.settings.require.len(),
            "Package engine ready"
        );
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ========================================================================
    // 트랜잭션 경계
    // ========================================================================

    /// 새 트랜잭션 시작 (낙관적으로 유효 상태)
    pub fn begin_commit(&self) -> Transaction {
        Transaction::new()
    }

    /// 트랜잭션 종료
    ///
    /// 무효하면 기록된 에러를 로그로 남기고 아무것도 적용하지 않습니다.
    /// 유효하면 버퍼링된 액션을 순서대로 적용하고 설정/스토어를 영속화합니다.
    /// 해석 과정에서 갱신된 스토어는 양쪽 경로 모두에서 영속화됩니다.
    pub async fn end_commit(&mut self, txn: Transaction) -> Result<bool> {
        let (valid, errors, actions) = txn.take_actions();

        if !valid {
            for error in &errors {
                warn!("Transaction error: {error}");
            }
            self.store.persist()?;
            return Ok(false);
        }

        let mut settings_dirty = false;
        for action in actions {
            match action {
                CommitAction::Write {
                    name,
                    path,
                    version,
                    payload,
                } => {
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                    tokio::fs::write(&path, payload).await?;
                    info!(name, version, path = %path.display(), "Installed plugin file");
                }
                CommitAction::Delete { name, path } => {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => debug!(name, path = %path.display(), "Deleted plugin file"),
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                CommitAction::Require { name, version } => {
                    if !self.settings.require.contains_key(&name) {
                        self.settings.require.insert(name, version);
                        settings_dirty = true;
                    }
                }
                CommitAction::Remove { name } => {
                    if self.settings.require.remove(&name).is_some() {
                        settings_dirty = true;
                    }
                }
            }
        }

        if settings_dirty {
            self.settings.save(&self.config_store)?;
        }
        self.store.persist()?;
        Ok(true)
    }

    // ========================================================================
    // 설치
    // ========================================================================

    /// 플러그인과 필수 의존성을 설치 (deps-first)
    pub async fn install(
        &mut self,
        txn: &mut Transaction,
        name: &str,
        version: &str,
    ) -> Result<OpReport> {
        self.install_inner(txn, name.to_string(), version.to_string())
            .await
    }

    // 의존성 재귀이므로 future를 boxing
    fn install_inner<'a>(
        &'a mut self,
        txn: &'a mut Transaction,
        name: String,
        version: String,
    ) -> Pin<Box<dyn Future<Output = Result<OpReport>> + Send + 'a>> {
        Box::pin(async move {
            let descriptor = match self.resolve(txn, &name, &version).await {
                Ok(descriptor) => descriptor,
                Err(e) if e.is_recoverable() => {
                    warn!(name, error = %e, "No plugin found");
                    return Ok(OpReport::NotFound);
                }
                Err(e) => return Err(e),
            };

            // 의존성 먼저
            for (dep_name, dep_version) in descriptor.plugin.require.clone() {
                if !txn.is_valid() {
                    break;
                }
                let report = self.install_inner(txn, dep_name.clone(), dep_version).await?;
                if report == OpReport::NotFound {
                    txn.error(format!("{dep_name} does not exist or invalid"));
                }
            }

            for (suggested, suggested_version) in &descriptor.plugin.suggest {
                info!(
                    plugin = name,
                    suggested, version = %suggested_version,
                    "Plugin suggests an optional dependency"
                );
            }

            let mut validator = DependencyValidator::new();
            let required = self.settings.require.clone();
            let ok = validator
                .passes(
                    &self.resolver,
                    &self.settings.source_list,
                    &mut self.store,
                    txn,
                    &required,
                    Some(&descriptor),
                )
                .await;
            if !ok {
                return Ok(OpReport::Invalid);
            }

            if !self.settings.is_required(&name) {
                txn.push(CommitAction::Require {
                    name: name.clone(),
                    version: version.clone(),
                });
            }

            if self.installed_version(&descriptor.name).as_deref() == Some(&descriptor.version) {
                debug!(name, version = %descriptor.version, "Already installed");
                return Ok(OpReport::AlreadyInstalled);
            }

            let payload = match self.transport.fetch_text(&descriptor.src_url()).await {
                Ok(payload) => payload,
                Err(e) => {
                    txn.error(format!("Failed to download {}: {e}", descriptor.name));
                    return Ok(OpReport::Invalid);
                }
            };

            txn.push(CommitAction::Write {
                name: descriptor.name.clone(),
                path: self.plugin_path(&descriptor),
                version: descriptor.version.clone(),
                payload,
            });
            Ok(OpReport::Queued)
        })
    }

    // ========================================================================
    // 업데이트
    // ========================================================================

    /// 설치된 플러그인을 업데이트 (미설치면 설치로 위임)
    ///
    /// `version`이 None이면 최신("*")으로 해석합니다.
    pub async fn update(
        &mut self,
        txn: &mut Transaction,
        name: &str,
        version: Option<&str>,
    ) -> Result<OpReport> {
        self.update_inner(txn, name.to_string(), version.map(String::from))
            .await
    }

    fn update_inner<'a>(
        &'a mut self,
        txn: &'a mut Transaction,
        name: String,
        version: Option<String>,
    ) -> Pin<Box<dyn Future<Output = Result<OpReport>> + Send + 'a>> {
        Box::pin(async move {
            let (_, bare_name) = split_qualified(&name);
            let bare_name = bare_name.to_string();
            let requested = version.unwrap_or_else(|| "*".to_string());

            if !self.host.is_loaded(&bare_name) {
                return self.install_inner(txn, name, requested).await;
            }

            let descriptor = match self.resolve(txn, &name, &requested).await {
                Ok(descriptor) => descriptor,
                Err(e) if e.is_recoverable() => {
                    warn!(name, error = %e, "No plugin found");
                    return Ok(OpReport::NotFound);
                }
                Err(e) => return Err(e),
            };

            for (dep_name, _) in descriptor.plugin.require.clone() {
                if !txn.is_valid() {
                    break;
                }
                self.update_inner(txn, dep_name, None).await?;
            }

            let mut validator = DependencyValidator::new();
            let required = self.settings.require.clone();
            let ok = validator
                .passes(
                    &self.resolver,
                    &self.settings.source_list,
                    &mut self.store,
                    txn,
                    &required,
                    Some(&descriptor),
                )
                .await;
            if !ok {
                return Ok(OpReport::Invalid);
            }

            if self.installed_version(&bare_name).as_deref() == Some(&descriptor.version) {
                debug!(name, version = %descriptor.version, "Already up to date");
                return Ok(OpReport::AlreadyCurrent);
            }

            let payload = match self.transport.fetch_text(&descriptor.src_url()).await {
                Ok(payload) => payload,
                Err(e) => {
                    txn.error(format!("Failed to download {}: {e}", descriptor.name));
                    return Ok(OpReport::Invalid);
                }
            };

            let path = self.plugin_path(&descriptor);
            txn.push(CommitAction::Delete {
                name: descriptor.name.clone(),
                path: path.clone(),
            });
            txn.push(CommitAction::Write {
                name: descriptor.name.clone(),
                path,
                version: descriptor.version.clone(),
                payload,
            });
            Ok(OpReport::Queued)
        })
    }

    // ========================================================================
    // 제거
    // ========================================================================

    /// 플러그인 제거 (의존 플러그인은 건드리지 않음)
    ///
    /// RequiredSet에서는 항상 빠지지만, 파일 삭제는 그 플러그인이 실제로
    /// 로드되어 있고 트랜잭션에 선행 에러가 없을 때만 버퍼링됩니다.
    pub async fn remove(&mut self, txn: &mut Transaction, name: &str) -> Result<OpReport> {
        let descriptor = match self.resolve(txn, name, "*").await {
            Ok(descriptor) => descriptor,
            Err(e) if e.is_recoverable() => {
                txn.error(format!("No plugin found {name}"));
                return Ok(OpReport::NotFound);
            }
            Err(e) => return Err(e),
        };

        let path = self.plugin_path(&descriptor);
        if !path.exists() {
            txn.error(format!("Not installed {name}"));
            return Ok(OpReport::NotInstalled);
        }

        txn.push(CommitAction::Remove {
            name: name.to_string(),
        });
        if self.host.is_loaded(&descriptor.name) && txn.is_valid() {
            txn.push(CommitAction::Delete {
                name: descriptor.name.clone(),
                path,
            });
        }
        Ok(OpReport::Queued)
    }

    // ========================================================================
    // 검증 / 조회
    // ========================================================================

    /// RequiredSet 전체의 의존성 그래프 검증
    pub async fn validate(&mut self, txn: &mut Transaction) -> bool {
        let mut validator = DependencyValidator::new();
        let required = self.settings.require.clone();
        validator
            .passes(
                &self.resolver,
                &self.settings.source_list,
                &mut self.store,
                txn,
                &required,
                None,
            )
            .await
    }

    /// 소스 검색 (첫 번째로 결과를 돌려준 소스가 이김)
    pub async fn search(&mut self, terms: &str) -> Result<Vec<String>> {
        for source in &self.settings.source_list {
            let url = crate::resolver::search_url(source, terms);
            let value = match self.transport.fetch_json(&url).await {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(e) => {
                    warn!(%url, error = %e, "Search source unreachable");
                    continue;
                }
            };

            let names = parse_search_results(&value);
            if !names.is_empty() {
                return Ok(names);
            }
        }
        Ok(Vec::new())
    }

    /// 디스크립터 조회 (사용자 노출용)
    pub async fn info(&mut self, txn: &mut Transaction, name: &str) -> Result<Option<Descriptor>> {
        match self.resolve(txn, name, "*").await {
            Ok(descriptor) => Ok(Some(descriptor)),
            Err(e) if e.is_recoverable() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 설치본과 소스 사이의 드리프트 검사
    pub async fn check(&mut self, txn: &mut Transaction, name: &str) -> Result<DriftReport> {
        let (category, bare_name) = split_qualified(name);
        let bare_name = bare_name.to_string();

        if !self.host.is_loaded(&bare_name) {
            return Ok(DriftReport::NotInstalled);
        }
        let local_version = self.installed_version(&bare_name);

        // 싼 버전 프로브: 디스크립터 전체 없이 버전 문자열만
        if let Some(local) = &local_version {
            if let Some(remote) = self.probe_remote_version(category, &bare_name).await {
                if *local != remote {
                    return Ok(self.version_mismatch(&bare_name, local, remote));
                }
            }
        }

        let descriptor = match self
            .resolver
            .resolve_fresh(
                &self.settings.source_list,
                &mut self.store,
                txn,
                name,
                "*",
            )
            .await
        {
            Ok(descriptor) => descriptor,
            Err(e) if e.is_recoverable() => return Ok(DriftReport::NoUpgradePath),
            Err(e) => return Err(e),
        };

        if let Some(local) = &local_version {
            if *local != descriptor.version {
                return Ok(self.version_mismatch(&bare_name, local, descriptor.version));
            }
        }

        let remote_source = match self.transport.fetch_text(&descriptor.src_url()).await {
            Ok(remote_source) => remote_source,
            Err(e) => {
                warn!(name, error = %e, "Could not fetch source for drift check");
                return Ok(DriftReport::NoUpgradePath);
            }
        };

        let path = self.plugin_path(&descriptor);
        let local_source = match tokio::fs::read_to_string(&path).await {
            Ok(local_source) => local_source,
            Err(_) => return Ok(DriftReport::NotInstalled),
        };

        if source_digest(&remote_source) != source_digest(&local_source) {
            Ok(DriftReport::SourceMismatch)
        } else {
            Ok(DriftReport::Current)
        }
    }

    /// RequiredSet 전체의 드리프트 상태
    pub async fn status(&mut self, txn: &mut Transaction) -> Result<Vec<(String, DriftReport)>> {
        let names: Vec<String> = self.settings.require.keys().cloned().collect();
        let mut reports = Vec::with_capacity(names.len());
        for name in names {
            let report = self.check(txn, &name).await?;
            reports.push((name, report));
        }
        Ok(reports)
    }

    /// 로드돼 있지만 RequiredSet에 없는 플러그인을 등록
    pub async fn sync(&mut self, txn: &mut Transaction) -> Result<usize> {
        let mut added = 0;
        for plugin in self.host.loaded_plugins() {
            if plugin.core || self.settings.is_required(&plugin.name) {
                continue;
            }
            match self.resolve(txn, &plugin.name, "*").await {
                Ok(_) => {
                    txn.push(CommitAction::Require {
                        name: plugin.name,
                        version: "*".to_string(),
                    });
                    added += 1;
                }
                Err(e) => {
                    debug!(name = plugin.name, error = %e, "Loaded plugin not known to any source");
                }
            }
        }
        Ok(added)
    }

    // ========================================================================
    // 설정 변경 (트랜잭션 밖에서 즉시 영속화)
    // ========================================================================

    /// 소스 토글. 추가되었으면 true, 제거되었으면 false.
    pub fn toggle_source(&mut self, url: &str) -> Result<bool> {
        let enabled = self.settings.toggle_source(url);
        self.settings.save(&self.config_store)?;
        Ok(enabled)
    }

    /// 디버그 플래그 설정/토글. 새 값을 반환.
    pub fn set_debug(&mut self, enabled: Option<bool>) -> Result<bool> {
        self.settings.debug = enabled.unwrap_or(!self.settings.debug);
        self.settings.save(&self.config_store)?;
        Ok(self.settings.debug)
    }

    // ========================================================================
    // 내부 헬퍼
    // ========================================================================

    async fn resolve(
        &mut self,
        txn: &mut Transaction,
        name: &str,
        version: &str,
    ) -> Result<Descriptor> {
        self.resolver
            .resolve(
                &self.settings.source_list,
                &mut self.store,
                txn,
                name,
                version,
            )
            .await
    }

    async fn probe_remote_version(
        &self,
        category: Option<&str>,
        name: &str,
    ) -> Option<String> {
        let categories: Vec<&str> = match category {
            Some(category) => vec![category],
            None => self.config.categories.iter().map(String::as_str).collect(),
        };

        for source in &self.settings.source_list {
            for category in &categories {
                let url = version_url(source, category, name);
                if let Ok(text) = self.transport.fetch_text(&url).await {
                    let remote = text.trim();
                    if !remote.is_empty() {
                        return Some(remote.to_string());
                    }
                }
            }
        }
        None
    }

    fn version_mismatch(&self, name: &str, local: &str, remote: String) -> DriftReport {
        if version::is_newer(local, &remote) {
            debug!(name, local, remote, "Upgrade available");
        } else {
            debug!(name, local, remote, "Installed version is ahead of source");
        }
        DriftReport::VersionMismatch {
            local: local.to_string(),
            remote,
        }
    }

    fn plugin_path(&self, descriptor: &Descriptor) -> PathBuf {
        self.config
            .plugin_dir
            .join(format!("{}.{}", descriptor.name, descriptor.ext))
    }

    /// 호스트가 버전을 보고하면 그것을, 아니면 스토어의 마지막 해석 버전
    fn installed_version(&self, name: &str) -> Option<String> {
        if let Some(version) = self.host.loaded_version(name) {
            return Some(version);
        }
        if self.host.is_loaded(name) {
            return self.store.get(name).map(|entry| entry.version.clone());
        }
        None
    }
}

/// 소스 원문 비교용 다이제스트
fn source_digest(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// 검색 응답 파싱
///
/// 소스마다 형태가 조금씩 다릅니다: 문자열 배열, `{name, ...}` 오브젝트
/// 배열, 혹은 `{"plugins": [...]}` 래퍼 모두 허용합니다.
fn parse_search_results(value: &serde_json::Value) -> Vec<String> {
    let items = match value {
        serde_json::Value::Array(items) => items.as_slice(),
        serde_json::Value::Object(map) => match map.get("plugins") {
            Some(serde_json::Value::Array(items)) => items.as_slice(),
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item {
            serde_json::Value::String(name) => Some(name.clone()),
            serde_json::Value::Object(map) => map
                .get("name")
                .and_then(|name| name.as_str())
                .map(String::from),
            _ => None,
        })
        .collect()
}

// ============================================================================
// 테스트
// ============================================================================
