//! 存储接口 Trait 定义
//!
//! 定义工作进程用到的全部持久化操作：
//! - MachineStore：机台配置（只读）
//! - GeneralConfigStore：全局运行配置（只读）
//! - ConditionStore：工况转换日志
//! - LogHistoryStore：原始采样历史
//! - DailySummaryStore：日结汇总
//!
//! 设计原则：
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发
//! - 时间区间查询一律闭区间、按时间升序返回

use crate::error::StorageError;
use crate::models::{
    ConditionRecord, DailySummaryRecord, GeneralConfig, LogHistoryRecord, NewConditionRecord,
};
use async_trait::async_trait;
use domain::MachineConfig;

/// 机台配置存储接口（工作进程只读，每周期重新读取）。
#[async_trait]
pub trait MachineStore: Send + Sync {
    /// 列出启用的机台及其嵌套传感器与参数映射
    async fn list_enabled_machines(&self) -> Result<Vec<MachineConfig>, StorageError>;
}

/// 全局运行配置存储接口。
#[async_trait]
pub trait GeneralConfigStore: Send + Sync {
    /// 读取全局配置；配置行缺失时返回 None
    async fn get_general_config(&self) -> Result<Option<GeneralConfig>, StorageError>;
}

/// 工况转换日志存储接口（append-only）。
#[async_trait]
pub trait ConditionStore: Send + Sync {
    /// 追加一条工况记录，返回带 id 的完整记录
    async fn insert_condition(
        &self,
        record: NewConditionRecord,
    ) -> Result<ConditionRecord, StorageError>;

    /// 机台最近一条工况记录
    async fn find_latest_condition(
        &self,
        machine_id: i64,
    ) -> Result<Option<ConditionRecord>, StorageError>;

    /// 机台在 `[from_ms, to_ms]` 内的工况记录，按时间升序
    async fn find_conditions_in_range(
        &self,
        machine_id: i64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<ConditionRecord>, StorageError>;
}

/// 原始采样历史存储接口（append-only）。
#[async_trait]
pub trait LogHistoryStore: Send + Sync {
    /// 单次批量追加（Postgres 侧为单事务）
    async fn insert_batch(&self, rows: &[LogHistoryRecord]) -> Result<usize, StorageError>;

    /// 机台在 `[from_ms, to_ms]` 内的采样记录，按时间升序
    async fn find_in_range(
        &self,
        machine_id: i64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<LogHistoryRecord>, StorageError>;
}

/// 日结汇总存储接口。
#[async_trait]
pub trait DailySummaryStore: Send + Sync {
    /// 按 `(machine_id, date)` 幂等写入；重跑覆盖
    async fn upsert_daily_summary(&self, record: &DailySummaryRecord)
        -> Result<(), StorageError>;

    /// 查询某机台某日的汇总
    async fn find_daily_summary(
        &self,
        machine_id: i64,
        date_ms: i64,
    ) -> Result<Option<DailySummaryRecord>, StorageError>;
}
