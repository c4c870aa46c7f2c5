//! 工况转换记录
//!
//! append-only 工况日志的写入口：变化检测、5 秒去重保护、
//! `last_*` 字段镜像前一条记录；真实转换同时落一条采样历史作为
//! 隐式测量锚点。

use domain::{Condition, MachineReading};
use fleet_storage::{
    decimal_string, ConditionStore, LogHistoryRecord, LogHistoryStore, NewConditionRecord,
    StorageError,
};
use std::sync::Arc;
use tracing::{debug, info};

/// 同工况重复写入的去重窗口
const DEDUP_WINDOW_MS: i64 = 5_000;

/// 工况记录器
pub struct ConditionRecorder {
    conditions: Arc<dyn ConditionStore>,
    log_history: Arc<dyn LogHistoryStore>,
}

impl ConditionRecorder {
    pub fn new(conditions: Arc<dyn ConditionStore>, log_history: Arc<dyn LogHistoryStore>) -> Self {
        Self {
            conditions,
            log_history,
        }
    }

    /// 记录机台工况；返回是否实际写入了一行。
    ///
    /// `force_snapshot` 为 true 时即使工况未变化也写入（心跳行，
    /// 供日结使用）；`skip_log_history` 为 true 时不落采样历史
    /// （快照任务已批量写过）。
    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        machine_id: i64,
        condition: Condition,
        kwh: Option<f64>,
        ts_ms: i64,
        reading: Option<&MachineReading>,
        force_snapshot: bool,
        skip_log_history: bool,
    ) -> Result<bool, StorageError> {
        let existing = self.conditions.find_latest_condition(machine_id).await?;
        let changed = match &existing {
            Some(existing) => existing.condition != condition,
            None => true,
        };

        if !changed && !force_snapshot {
            return Ok(false);
        }

        // 轮询循环与快照任务可能在同一时刻各写一行同工况记录
        if let Some(existing) = &existing {
            if existing.condition == condition && ts_ms - existing.ts_ms < DEDUP_WINDOW_MS {
                debug!(machine_id, %condition, "duplicate condition within dedup window, skipped");
                return Ok(false);
            }
        }

        let record = NewConditionRecord {
            machine_id,
            ts_ms,
            condition,
            kwh: decimal_string(kwh.unwrap_or(0.0)),
            last_ts_ms: existing.as_ref().map(|record| record.ts_ms),
            last_condition: existing.as_ref().map(|record| record.condition),
            last_kwh: existing.as_ref().map(|record| record.kwh.clone()),
        };
        self.conditions.insert_condition(record).await?;

        if changed {
            info!(
                machine_id,
                from = %existing.as_ref().map(|record| record.condition.as_str()).unwrap_or("-"),
                to = %condition,
                "condition transition"
            );
            // 工况变化即为隐式测量锚点
            if !skip_log_history {
                if let Some(reading) = reading {
                    self.log_history
                        .insert_batch(&[LogHistoryRecord::from_reading(reading)])
                        .await?;
                }
            }
        }

        Ok(true)
    }
}
