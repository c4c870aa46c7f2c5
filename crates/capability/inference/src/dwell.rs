//! 保温时长判定
//!
//! 判定“温度连续 ≥ 300 且已持续 ≥ 1 小时”。当前温度达标时回溯
//! 最近 90 分钟的采样历史找出仍然活跃的高温段起点；窗口内没有
//! 任何达标样本时回退到最近一条已持久化的工况——生产或待机说明
//! 此前已满足保温条件，短暂的数据断档或重启不得让机台退回升温。

use domain::Condition;
use fleet_storage::{ConditionStore, LogHistoryStore, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// 高温阈值（°C）
const TEMP_THRESHOLD: f64 = 300.0;
/// 连续保温时长要求
const DWELL_MS: i64 = 60 * 60 * 1000;
/// 采样历史回溯窗口
const LOOKBACK_MS: i64 = 90 * 60 * 1000;

#[derive(Debug, Clone, Copy, Default)]
struct DwellEntry {
    /// 当前活跃高温段的起点
    heating_up_since: Option<i64>,
    /// 最近一次回溯时刻
    last_fetch: i64,
}

/// 保温判定器
///
/// 缓存为读穿式：每次相关查询都重新回溯并覆盖缓存，调用方不会
/// 读到超过一个周期的旧值。
pub struct DwellTracker {
    log_history: Arc<dyn LogHistoryStore>,
    conditions: Arc<dyn ConditionStore>,
    entries: Mutex<HashMap<i64, DwellEntry>>,
}

impl DwellTracker {
    pub fn new(log_history: Arc<dyn LogHistoryStore>, conditions: Arc<dyn ConditionStore>) -> Self {
        Self {
            log_history,
            conditions,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 启动时为每台机台执行一次同样的回溯，预热缓存。
    pub async fn warm_up(&self, machine_ids: &[i64], now_ms: i64) {
        for &machine_id in machine_ids {
            if let Err(error) = self.refresh(machine_id, now_ms).await {
                warn!(machine_id, %error, "dwell warm-up failed");
            }
        }
    }

    /// 判定机台当前是否满足保温条件。
    pub async fn evaluate(
        &self,
        machine_id: i64,
        temperature: Option<f64>,
        now_ms: i64,
    ) -> Result<bool, StorageError> {
        let temperature = temperature.unwrap_or(0.0);
        if temperature < TEMP_THRESHOLD {
            let mut entries = self.entries.lock().await;
            let entry = entries.entry(machine_id).or_default();
            entry.heating_up_since = None;
            entry.last_fetch = now_ms;
            return Ok(false);
        }

        match self.refresh(machine_id, now_ms).await? {
            Some(since) => Ok(now_ms - since >= DWELL_MS),
            None => self.fallback_from_condition(machine_id).await,
        }
    }

    /// 回溯采样历史，更新并返回活跃高温段起点。
    ///
    /// 没有温度值的样本不参与判定：空列不能打断一个活跃高温段。
    async fn refresh(&self, machine_id: i64, now_ms: i64) -> Result<Option<i64>, StorageError> {
        let rows = self
            .log_history
            .find_in_range(machine_id, now_ms - LOOKBACK_MS, now_ms)
            .await?;

        let mut since: Option<i64> = None;
        for row in &rows {
            let Some(temperature) = row
                .temperature
                .as_deref()
                .and_then(|value| value.parse::<f64>().ok())
            else {
                continue;
            };
            if temperature >= TEMP_THRESHOLD {
                if since.is_none() {
                    since = Some(row.ts_ms);
                }
            } else {
                since = None;
            }
        }

        debug!(machine_id, heating_up_since = ?since, "dwell window refreshed");
        let mut entries = self.entries.lock().await;
        entries.insert(
            machine_id,
            DwellEntry {
                heating_up_since: since,
                last_fetch: now_ms,
            },
        );
        Ok(since)
    }

    async fn fallback_from_condition(&self, machine_id: i64) -> Result<bool, StorageError> {
        let latest = self.conditions.find_latest_condition(machine_id).await?;
        Ok(matches!(
            latest.map(|record| record.condition),
            Some(Condition::MachineProduction) | Some(Condition::Iddle)
        ))
    }

    /// 缓存的高温段起点（诊断与测试用）。
    pub async fn heating_up_since(&self, machine_id: i64) -> Option<i64> {
        let entries = self.entries.lock().await;
        entries
            .get(&machine_id)
            .and_then(|entry| entry.heating_up_since)
    }
}
