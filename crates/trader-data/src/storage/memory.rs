//! 인메모리 저장소 (테스트 및 단일 프로세스 실행용).
//!
//! 내부적으로 `RwLock`을 사용하여 다중 읽기 / 단일 쓰기를 보장합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use trader_core::{BacktestRecord, BlobStore, RecordStore, StoreError};

// ==================== InMemoryBlobStore ====================

/// 인메모리 블롭 저장소.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 키 목록 (정렬).
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.blobs.write().await.insert(key.to_string(), bytes);
        Ok(())
    }

    fn public_url(&self, key: &str) -> Option<String> {
        Some(format!("memory://{key}"))
    }
}

// ==================== InMemoryRecordStore ====================

/// 인메모리 레코드 저장소.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, BacktestRecord>>,
    writes: RwLock<usize>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 누적 `put` 호출 수.
    pub async fn write_count(&self) -> usize {
        *self.writes.read().await
    }

    /// 저장된 레코드 전체 (id 순).
    pub async fn all(&self) -> Vec<BacktestRecord> {
        let mut records: Vec<BacktestRecord> =
            self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, id: &str) -> Result<Option<BacktestRecord>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn put(&self, record: &BacktestRecord) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(record.id.clone(), record.clone());
        *self.writes.write().await += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blob_roundtrip_and_missing_key() {
        let store = InMemoryBlobStore::new();
        assert!(store.get("a").await.unwrap().is_none());
        store.put("a", b"xyz".to_vec()).await.unwrap();
        assert_eq!(store.get("a").await.unwrap().unwrap(), b"xyz");
        assert_eq!(store.keys().await, vec!["a".to_string()]);
        assert_eq!(store.public_url("a").as_deref(), Some("memory://a"));
    }
}
