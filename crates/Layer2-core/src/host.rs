//! Plugin Host - 로드 상태 조회 경계
//!
//! 엔진은 "어떤 플러그인이 지금 로드되어 있는가"를 직접 알지 못하고
//! 이 trait으로 조회합니다. 런타임 호스트가 없는 환경(CLI)에서는 플러그인
//! 디렉토리의 파일 존재로 근사하는 `DirHost`를 씁니다.

use std::path::{Path, PathBuf};

/// 현재 로드된 플러그인 하나
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    pub name: String,

    /// 호스트가 버전을 보고하지 않으면 None
    pub version: Option<String>,

    /// 코어/내장 플러그인 여부 (sync 대상에서 제외)
    pub core: bool,
}

/// 플러그인 로드 상태 조회
pub trait PluginHost: Send + Sync {
    fn is_loaded(&self, name: &str) -> bool;

    fn loaded_version(&self, name: &str) -> Option<String>;

    fn loaded_plugins(&self) -> Vec<LoadedPlugin>;
}

// ============================================================================
// DirHost - 디렉토리 스캔 구현
// ============================================================================

/// 플러그인 디렉토리의 파일 존재를 로드 상태로 취급
///
/// 버전은 알 수 없으므로 항상 None을 보고합니다. 엔진은 그 경우 영속
/// 스토어의 마지막 해석 버전으로 보완합니다.
pub struct DirHost {
    plugin_dir: PathBuf,
}

impl DirHost {
    pub fn new(plugin_dir: impl AsRef<Path>) -> Self {
        Self {
            plugin_dir: plugin_dir.as_ref().to_path_buf(),
        }
    }

    fn stem_exists(&self, name: &str) -> bool {
        let entries = match std::fs::read_dir(&self.plugin_dir) {
            Ok(entries) => entries,
            Err(_) => return false,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.file_stem().and_then(|s| s.to_str()) == Some(name) {
                return true;
            }
        }
        false
    }
}

impl PluginHost for DirHost {
    fn is_loaded(&self, name: &str) -> bool {
        self.stem_exists(name)
    }

    fn loaded_version(&self, _name: &str) -> Option<String> {
        None
    }

    fn loaded_plugins(&self) -> Vec<LoadedPlugin> {
        let entries = match std::fs::read_dir(&self.plugin_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut plugins = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                plugins.push(LoadedPlugin {
                    name: stem.to_string(),
                    version: None,
                    core: false,
                });
            }
        }
        plugins.sort_by(|a, b| a.name.cmp(&b.name));
        plugins
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dir_host_scans_file_stems() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("epic.cs"), "// source").unwrap();
        std::fs::write(temp.path().join("base.cs"), "// source").unwrap();
        std::fs::create_dir(temp.path().join("subdir")).unwrap();

        let host = DirHost::new(temp.path());
        assert!(host.is_loaded("epic"));
        assert!(!host.is_loaded("ghost"));
        assert_eq!(host.loaded_version("epic"), None);

        let names: Vec<_> = host.loaded_plugins().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["base".to_string(), "epic".to_string()]);
    }

    #[test]
    fn test_dir_host_missing_dir_is_empty() {
        let host = DirHost::new("/nonexistent/plugforge-test");
        assert!(!host.is_loaded("epic"));
        assert!(host.loaded_plugins().is_empty());
    }
}
