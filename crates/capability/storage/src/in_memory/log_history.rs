//! 采样历史内存实现

use crate::error::StorageError;
use crate::models::LogHistoryRecord;
use crate::traits::LogHistoryStore;
use std::sync::RwLock;

/// 采样历史内存存储
pub struct InMemoryLogHistoryStore {
    rows: RwLock<Vec<LogHistoryRecord>>,
}

impl InMemoryLogHistoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// 当前行数（测试用）。
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryLogHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LogHistoryStore for InMemoryLogHistoryStore {
    async fn insert_batch(&self, rows: &[LogHistoryRecord]) -> Result<usize, StorageError> {
        let mut store = self
            .rows
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        store.extend(rows.iter().cloned());
        Ok(rows.len())
    }

    async fn find_in_range(
        &self,
        machine_id: i64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<LogHistoryRecord>, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut selected: Vec<LogHistoryRecord> = rows
            .iter()
            .filter(|row| {
                row.machine_id == machine_id && row.ts_ms >= from_ms && row.ts_ms <= to_ms
            })
            .cloned()
            .collect();
        selected.sort_by_key(|row| row.ts_ms);
        Ok(selected)
    }
}
