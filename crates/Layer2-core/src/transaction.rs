//! Transaction - 커밋 로그와 트랜잭션 컨텍스트
//!
//! 트랜잭션 동안 제안된 변경(파일 쓰기/삭제, RequiredSet 추가/제거)은
//! `CommitAction` 시퀀스로 버퍼링되고, EndCommit에서 전부 적용되거나
//! 전부 버려집니다. 에러가 하나라도 기록되면 그 트랜잭션은 남은 기간 동안
//! 무효입니다.
//!
//! 트랜잭션은 재진입하지 않습니다. 커맨드 큐가 모든 커맨드를 직렬화하므로
//! 엔진 인스턴스 하나에 동시에 열린 트랜잭션은 항상 하나뿐입니다.

use crate::descriptor::Descriptor;
use std::collections::HashMap;
use std::path::PathBuf;

// ============================================================================
// CommitAction - 버퍼링되는 변경
// ============================================================================

/// 커밋 시점에 적용될 변경 하나
#[derive(Debug, Clone, PartialEq)]
pub enum CommitAction {
    /// `path`에 `payload`를 덮어쓰기
    Write {
        name: String,
        path: PathBuf,
        version: String,
        payload: String,
    },

    /// `path` 삭제 (같은 배치의 선행 Delete로 이미 지워졌어도 에러 아님)
    Delete { name: String, path: PathBuf },

    /// RequiredSet에 `name -> version` 추가 (이미 있으면 무시)
    Require { name: String, version: String },

    /// RequiredSet에서 `name` 제거 (없으면 무시)
    Remove { name: String },
}

impl CommitAction {
    /// 로깅용 짧은 이름
    pub fn kind(&self) -> &'static str {
        match self {
            CommitAction::Write { .. } => "write",
            CommitAction::Delete { .. } => "delete",
            CommitAction::Require { .. } => "require",
            CommitAction::Remove { .. } => "remove",
        }
    }
}

// ============================================================================
// Transaction - 트랜잭션 컨텍스트
// ============================================================================

/// BeginCommit으로 생성되고 EndCommit이 소비하는 트랜잭션 컨텍스트
///
/// 재귀 호출 경로에 명시적으로 전달됩니다. 호출자는 재귀 작업을 더 하기 전에
/// `is_valid()`를 확인해야 합니다.
#[derive(Debug)]
pub struct Transaction {
    valid: bool,
    errors: Vec<String>,
    cache: HashMap<String, Descriptor>,
    actions: Vec<CommitAction>,
}

impl Transaction {
    pub(crate) fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            cache: HashMap::new(),
            actions: Vec::new(),
        }
    }

    /// 트랜잭션이 아직 유효한지
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// 에러 기록 - 유효성이 영구히 false로 전환
    pub fn error(&mut self, msg: impl Into<String>) {
        self.valid = false;
        self.errors.push(msg.into());
    }

    /// 지금까지 기록된 에러
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// 액션 버퍼링 (순서 보존)
    pub fn push(&mut self, action: CommitAction) {
        self.actions.push(action);
    }

    /// 버퍼링된 액션 조회
    pub fn actions(&self) -> &[CommitAction] {
        &self.actions
    }

    pub(crate) fn take_actions(self) -> (bool, Vec<String>, Vec<CommitAction>) {
        (self.valid, self.errors, self.actions)
    }

    // ========================================================================
    // 트랜잭션 단위 디스크립터 캐시
    // ========================================================================

    pub(crate) fn cached(&self, key: &str) -> Option<&Descriptor> {
        self.cache.get(key)
    }

    pub(crate) fn cache(&mut self, key: String, descriptor: Descriptor) {
        self.cache.insert(key, descriptor);
    }
}

// ============================================================================
// 테스트
// ============================================================================
