//! 日结汇总内存实现

use crate::error::StorageError;
use crate::models::DailySummaryRecord;
use crate::traits::DailySummaryStore;
use std::collections::HashMap;
use std::sync::RwLock;

/// 日结汇总内存存储
///
/// 以 `(machine_id, date_ms)` 为键，重复写入覆盖旧行。
pub struct InMemoryDailySummaryStore {
    rows: RwLock<HashMap<(i64, i64), DailySummaryRecord>>,
}

impl InMemoryDailySummaryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
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

impl Default for InMemoryDailySummaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DailySummaryStore for InMemoryDailySummaryStore {
    async fn upsert_daily_summary(
        &self,
        record: &DailySummaryRecord,
    ) -> Result<(), StorageError> {
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        rows.insert((record.machine_id, record.date_ms), record.clone());
        Ok(())
    }

    async fn find_daily_summary(
        &self,
        machine_id: i64,
        date_ms: i64,
    ) -> Result<Option<DailySummaryRecord>, StorageError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(rows.get(&(machine_id, date_ms)).cloned())
    }
}
