//! 테스트 전용 페이크 구현

use crate::host::{LoadedPlugin, PluginHost};
use crate::transport::SourceTransport;
use async_trait::async_trait;
use plugforge_foundation::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

// ============================================================================
// FakeTransport
// ============================================================================

/// 인메모리 소스. 등록되지 않은 JSON URL은 404, 텍스트 URL은 전송 에러.
#[derive(Default, Clone)]
pub(crate) struct FakeTransport {
    json: HashMap<String, serde_json::Value>,
    text: HashMap<String, String>,
    unreachable: HashSet<String>,
    hits: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    pub fn add_json(&mut self, url: &str, value: serde_json::Value) {
        self.json.insert(url.to_string(), value);
    }

    pub fn add_text(&mut self, url: &str, body: &str) {
        self.text.insert(url.to_string(), body.to_string());
    }

    pub fn fail(&mut self, url: &str) {
        self.unreachable.insert(url.to_string());
    }

    pub fn hit_count(&self) -> usize {
        self.hits.lock().unwrap().len()
    }

    fn record(&self, url: &str) {
        self.hits.lock().unwrap().push(url.to_string());
    }
}

#[async_trait]
impl SourceTransport for FakeTransport {
    async fn fetch_json(&self, url: &str) -> Result<Option<serde_json::Value>> {
        self.record(url);
        if self.unreachable.contains(url) {
            return Err(Error::Transport(format!("connection refused: {url}")));
        }
        Ok(self.json.get(url).cloned())
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.record(url);
        if self.unreachable.contains(url) {
            return Err(Error::Transport(format!("connection refused: {url}")));
        }
        self.text
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("HTTP 404 from {url}")))
    }
}

// ============================================================================
// FakeHost
// ============================================================================

/// 명시적으로 등록한 플러그인만 로드된 것으로 보고
#[derive(Default)]
pub(crate) struct FakeHost {
    loaded: Vec<LoadedPlugin>,
}

impl FakeHost {
    pub fn load(&mut self, name: &str, version: Option<&str>) {
        self.loaded.push(LoadedPlugin {
            name: name.to_string(),
            version: version.map(String::from),
            core: false,
        });
    }

    pub fn load_core(&mut self, name: &str) {
        self.loaded.push(LoadedPlugin {
            name: name.to_string(),
            version: None,
            core: true,
        });
    }
}

impl PluginHost for FakeHost {
    fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|p| p.name == name)
    }

    fn loaded_version(&self, name: &str) -> Option<String> {
        self.loaded
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.version.clone())
    }

    fn loaded_plugins(&self) -> Vec<LoadedPlugin> {
        self.loaded.clone()
    }
}

// ============================================================================
// 디스크립터 빌더
// ============================================================================

/// 소스 응답 형태의 디스크립터 JSON
pub(crate) fn descriptor_value(
    name: &str,
    version: &str,
    require: &[(&str, &str)],
) -> serde_json::Value {
    let require: serde_json::Map<String, serde_json::Value> = require
        .iter()
        .map(|(n, v)| (n.to_string(), serde_json::Value::String(v.to_string())))
        .collect();

    serde_json::json!({
        "name": name,
        "version": version,
        "ext": "cs",
        "src": format!("http://x/{name}.cs"),
        "plugin": {
            "require": require
        }
    })
}
