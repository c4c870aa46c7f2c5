//! 工况日志内存实现

use crate::error::StorageError;
use crate::models::{ConditionRecord, NewConditionRecord};
use crate::traits::ConditionStore;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

/// 工况日志内存存储
pub struct InMemoryConditionStore {
    records: RwLock<Vec<ConditionRecord>>,
    next_id: AtomicI64,
}

impl InMemoryConditionStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// 当前记录总数（测试用）。
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryConditionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConditionStore for InMemoryConditionStore {
    async fn insert_condition(
        &self,
        record: NewConditionRecord,
    ) -> Result<ConditionRecord, StorageError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = ConditionRecord {
            id,
            machine_id: record.machine_id,
            ts_ms: record.ts_ms,
            condition: record.condition,
            kwh: record.kwh,
            last_ts_ms: record.last_ts_ms,
            last_condition: record.last_condition,
            last_kwh: record.last_kwh,
        };
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        records.push(record.clone());
        Ok(record)
    }

    async fn find_latest_condition(
        &self,
        machine_id: i64,
    ) -> Result<Option<ConditionRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let latest = records
            .iter()
            .filter(|record| record.machine_id == machine_id)
            .max_by_key(|record| (record.ts_ms, record.id))
            .cloned();
        Ok(latest)
    }

    async fn find_conditions_in_range(
        &self,
        machine_id: i64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<ConditionRecord>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut selected: Vec<ConditionRecord> = records
            .iter()
            .filter(|record| {
                record.machine_id == machine_id
                    && record.ts_ms >= from_ms
                    && record.ts_ms <= to_ms
            })
            .cloned()
            .collect();
        selected.sort_by_key(|record| (record.ts_ms, record.id));
        Ok(selected)
    }
}
