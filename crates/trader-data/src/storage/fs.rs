//! 파일시스템 저장소.
//!
//! 블롭 키는 루트 디렉토리 기준 상대 경로로 사용됩니다. 쓰기는 임시 파일에
//! 먼저 기록한 뒤 rename 하므로 읽는 쪽은 반쯤 쓰인 파일을 보지 않습니다.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;
use trader_core::{BacktestRecord, BlobStore, RecordStore, StoreError};

use crate::keys::{normalize_key, sanitize_segment};

// ==================== FsBlobStore ====================

/// 디렉토리 기반 블롭 저장소.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 키 → 파일 경로. 루트 밖을 가리키는 키는 거부.
    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let key = normalize_key(key);
        let relative = Path::new(&key);
        let escapes = key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StoreError::Io(format!("허용되지 않는 블롭 키: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        write_atomic(&path, &bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "블롭 저장");
        Ok(())
    }

    fn public_url(&self, key: &str) -> Option<String> {
        self.path_for(key)
            .ok()
            .map(|p| format!("file://{}", p.display()))
    }
}

// ==================== FsRecordStore ====================

/// `{root}/{id}.json` 형태의 레코드 저장소.
#[derive(Debug, Clone)]
pub struct FsRecordStore {
    root: PathBuf,
}

impl FsRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize_segment(id)))
    }
}

#[async_trait]
impl RecordStore for FsRecordStore {
    async fn get(&self, id: &str) -> Result<Option<BacktestRecord>, StoreError> {
        let path = self.path_for(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn put(&self, record: &BacktestRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.path_for(&record.id), &bytes).await
    }
}

/// 임시 파일 기록 후 rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| StoreError::Io(format!("잘못된 경로: {}", path.display())))?;
    // 같은 키에 대한 동시 쓰기끼리 임시 파일이 겹치지 않도록 쓰기마다 고유 이름
    let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
