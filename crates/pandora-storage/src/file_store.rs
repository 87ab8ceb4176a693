//! JSON 파일 기반 키-값 저장소.
//!
//! 전체 맵을 메모리에 두고 변경마다 임시 파일에 쓴 뒤 rename한다.
//! 파일이 깨져 있으면 빈 저장소로 시작하고 경고를 남긴다.

use pandora_core::error::CoreError;
use pandora_core::ports::kv_store::KeyValueStore;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 저장소 파일 이름
pub const STORE_FILE_NAME: &str = "client-storage.json";

/// JSON 파일 저장소
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// 디렉토리 안의 기본 파일로 열기
    pub fn open_in(dir: &Path) -> Result<Self, CoreError> {
        Self::open(dir.join(STORE_FILE_NAME))
    }

    /// 지정된 파일로 열기 (없으면 빈 저장소)
    pub fn open(path: PathBuf) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    CoreError::Storage(format!(
                        "저장소 디렉토리 생성 실패: {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("저장소 파일 손상, 빈 상태로 시작: {}: {e}", path.display());
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };

        debug!("키-값 저장소 열기: {} ({}개 항목)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// 저장소 파일 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| {
            CoreError::Storage(format!("저장소 쓰기 실패: {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            CoreError::Storage(format!("저장소 교체 실패: {}: {e}", self.path.display()))
        })?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock();
        if entries.get(key).map(String::as_str) == Some(value) {
            return Ok(());
        }
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}
