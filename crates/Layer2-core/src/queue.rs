//! Command Queue - 단일 워커 FIFO
//!
//! 모든 커맨드는 unbounded 채널로 워커 태스크 하나에 직렬화됩니다.
//! 엔진은 워커가 소유하므로 커맨드 처리 중 어떤 잠금도 필요 없습니다.
//!
//! 종료는 큐 핸들을 전부 drop하는 것으로 신호합니다. 채널이 닫히면 워커는
//! 남은 커맨드를 전부 소진한 뒤 엔진을 돌려주고 끝납니다.

use crate::engine::{DriftReport, OpReport, PackageEngine};
use crate::transaction::Transaction;
use plugforge_foundation::{Error, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

// ============================================================================
// Command
// ============================================================================

/// 워커가 처리하는 커맨드
#[derive(Debug, Clone)]
pub enum Command {
    Install { name: String, version: String },

    /// 빈 목록이면 RequiredSet 전체. `version`은 모든 대상에 적용되는
    /// 고정 버전이며 None이면 최신.
    Update {
        names: Vec<String>,
        version: Option<String>,
    },

    Remove { names: Vec<String> },

    Validate,

    Search { terms: String },

    /// RequiredSet 전체의 드리프트 점검
    Status,

    Check { names: Vec<String> },

    /// 로드됐지만 등록 안 된 플러그인을 RequiredSet에 편입
    Sync,

    Info { name: String },

    /// None이면 소스 목록 출력, Some이면 토글
    Source { url: Option<String> },

    /// None이면 토글
    Debug { enabled: Option<bool> },
}

// ============================================================================
// CommandQueue / CommandWorker
// ============================================================================

/// 커맨드 제출 핸들 (여러 곳에서 clone 가능)
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<Command>,
}

impl CommandQueue {
    /// 커맨드 제출. 워커가 이미 종료됐으면 false.
    pub fn enqueue(&self, command: Command) -> bool {
        debug!(?command, "Command queued");
        self.tx.send(command).is_ok()
    }
}

/// 워커 태스크 핸들
pub struct CommandWorker {
    task: JoinHandle<PackageEngine>,
}

impl CommandWorker {
    /// 워커가 큐를 소진하고 종료할 때까지 대기, 엔진 반환
    pub async fn join(self) -> Result<PackageEngine> {
        self.task
            .await
            .map_err(|e| Error::Internal(format!("command worker panicked: {e}")))
    }
}

/// 워커 기동
pub fn spawn(engine: PackageEngine) -> (CommandQueue, CommandWorker) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let mut engine = engine;
        while let Some(command) = rx.recv().await {
            run_command(&mut engine, command).await;
        }
        debug!("Command queue drained, worker exiting");
        engine
    });

    (CommandQueue { tx }, CommandWorker { task })
}

// ============================================================================
// 커맨드 실행
// ============================================================================

/// 커맨드 하나를 실행. 실패는 로그로만 보고하고 워커는 계속 돈다.
async fn run_command(engine: &mut PackageEngine, command: Command) {
    match command {
        Command::Install { name, version } => {
            let mut txn = engine.begin_commit();
            match engine.install(&mut txn, &name, &version).await {
                Ok(report) => report_op(&name, &report),
                Err(e) => txn.error(format!("Install failed for {name}: {e}")),
            }
            finish(engine, txn, "install").await;
        }

        Command::Update { names, version } => {
            let names = if names.is_empty() {
                engine.settings().require.keys().cloned().collect()
            } else {
                names
            };

            let mut txn = engine.begin_commit();
            for name in names {
                if !txn.is_valid() {
                    break;
                }
                match engine.update(&mut txn, &name, version.as_deref()).await {
                    Ok(report) => report_op(&name, &report),
                    Err(e) => txn.error(format!("Update failed for {name}: {e}")),
                }
            }
            finish(engine, txn, "update").await;
        }

        Command::Remove { names } => {
            let mut txn = engine.begin_commit();
            for name in names {
                if !txn.is_valid() {
                    break;
                }
                match engine.remove(&mut txn, &name).await {
                    Ok(report) => report_op(&name, &report),
                    Err(e) => txn.error(format!("Remove failed for {name}: {e}")),
                }
            }
            finish(engine, txn, "remove").await;
        }

        Command::Validate => {
            let mut txn = engine.begin_commit();
            if engine.validate(&mut txn).await {
                info!("Validation success!");
            } else {
                warn!("Validation failed");
            }
            finish(engine, txn, "validate").await;
        }

        Command::Search { terms } => match engine.search(&terms).await {
            Ok(names) => {
                info!("Found ({})", names.len());
                for name in names {
                    info!("  {name}");
                }
            }
            Err(e) => error!(error = %e, "Search failed"),
        },

        Command::Status => {
            let mut txn = engine.begin_commit();
            match engine.status(&mut txn).await {
                Ok(reports) => {
                    for (name, report) in reports {
                        report_drift(&name, &report);
                    }
                }
                Err(e) => error!(error = %e, "Status failed"),
            }
            finish(engine, txn, "status").await;
        }

        Command::Check { names } => {
            let mut txn = engine.begin_commit();
            for name in names {
                match engine.check(&mut txn, &name).await {
                    Ok(report) => report_drift(&name, &report),
                    Err(e) => error!(name, error = %e, "Check failed"),
                }
            }
            finish(engine, txn, "check").await;
        }

        Command::Sync => {
            let mut txn = engine.begin_commit();
            match engine.sync(&mut txn).await {
                Ok(added) => info!("Registered {added} loaded plugins"),
                Err(e) => error!(error = %e, "Sync failed"),
            }
            finish(engine, txn, "sync").await;
        }

        Command::Info { name } => {
            let mut txn = engine.begin_commit();
            match engine.info(&mut txn, &name).await {
                Ok(Some(descriptor)) => {
                    info!(
                        name = descriptor.qualified_name(),
                        version = descriptor.version,
                        author = descriptor.plugin.author.as_deref().unwrap_or("unknown"),
                        requires = descriptor.plugin.require.len(),
                        "{}",
                        descriptor
                            .plugin
                            .description
                            .as_deref()
                            .unwrap_or("(no description)")
                    );
                }
                Ok(None) => warn!("No plugin found {name}"),
                Err(e) => error!(name, error = %e, "Info failed"),
            }
            finish(engine, txn, "info").await;
        }

        Command::Source { url } => match url {
            Some(url) => match engine.toggle_source(&url) {
                Ok(true) => info!("Source added: {url}"),
                Ok(false) => info!("Source removed: {url}"),
                Err(e) => error!(error = %e, "Source toggle failed"),
            },
            None => {
                for source in &engine.settings().source_list {
                    info!("Source: {source}");
                }
            }
        },

        Command::Debug { enabled } => match engine.set_debug(enabled) {
            Ok(enabled) => info!("Debug {}", if enabled { "enabled" } else { "disabled" }),
            Err(e) => error!(error = %e, "Debug toggle failed"),
        },
    }
}

async fn finish(engine: &mut PackageEngine, txn: Transaction, op: &str) {
    match engine.end_commit(txn).await {
        Ok(true) => debug!("{op} committed"),
        Ok(false) => warn!("{op} rolled back"),
        Err(e) => error!(error = %e, "{op} failed to apply"),
    }
}

fn report_op(name: &str, report: &OpReport) {
    match report {
        OpReport::Queued => info!("{name} queued"),
        OpReport::AlreadyInstalled => info!("Already installed {name}"),
        OpReport::AlreadyCurrent => info!("{name} is up to date"),
        OpReport::NotInstalled => warn!("Not installed {name}"),
        OpReport::NotFound => warn!("No plugin found {name}"),
        OpReport::Invalid => warn!("{name} failed validation"),
    }
}

fn report_drift(name: &str, report: &DriftReport) {
    match report {
        DriftReport::Current => info!("{name}: up to date"),
        DriftReport::VersionMismatch { local, remote } => {
            warn!("{name}: version {local} installed, {remote} available")
        }
        DriftReport::SourceMismatch => warn!("{name}: local file differs from source"),
        DriftReport::NoUpgradePath => warn!("{name}: no longer resolvable from any source"),
        DriftReport::NotInstalled => warn!("{name}: not installed"),
    }
}

// ============================================================================
// 테스트
// ============================================================================
