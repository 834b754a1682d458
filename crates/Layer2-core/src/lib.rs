//! PlugForge Core - 플러그인 패키지 엔진
//!
//! 원격 소스에서 플러그인 디스크립터를 해석하고, 의존성 그래프를 검증하고,
//! 설치/업데이트/제거를 all-or-nothing 트랜잭션으로 적용하는 핵심 레이어.
//!
//! 구성:
//! - `descriptor`: 소스가 제공하는 플러그인 메타데이터 모델
//! - `version`: 버전 문자열 비교 인코딩
//! - `transport`: 원격 소스 I/O 경계 (HTTP 구현 포함)
//! - `store`: 디스크립터 영속 캐시
//! - `resolver`: 소스 우선순위 해석
//! - `validator`: 재귀 의존성 검증
//! - `transaction` / `engine`: 커밋 로그와 오케스트레이션
//! - `host`: 플러그인 로드 상태 조회 경계
//! - `queue`: 단일 워커 FIFO 커맨드 큐

pub mod descriptor;
pub mod engine;
pub mod host;
pub mod queue;
pub mod resolver;
pub mod store;
pub mod transaction;
pub mod transport;
pub mod validator;
pub mod version;

#[cfg(test)]
pub(crate) mod testutil;

// ============================================================================
// Re-exports
// ============================================================================

pub use descriptor::{split_qualified, Descriptor, PluginMeta};
pub use engine::{DriftReport, EngineConfig, OpReport, PackageEngine};
pub use host::{DirHost, LoadedPlugin, PluginHost};
pub use queue::{Command, CommandQueue, CommandWorker};
pub use resolver::MetadataResolver;
pub use store::{PluginStore, StoreEntry, STORE_FILE};
pub use transaction::{CommitAction, Transaction};
pub use transport::{HttpTransport, SourceTransport, REQUEST_TIMEOUT};
pub use validator::DependencyValidator;
