//! 追踪初始化与工作进程计数器。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::{fmt, EnvFilter};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub cycles_completed: u64,
    pub sensor_read_success: u64,
    pub sensor_read_failure: u64,
    pub gateway_failures: u64,
    pub condition_writes: u64,
    pub snapshots_written: u64,
    pub rollups_completed: u64,
    pub persistence_failures: u64,
}

/// 工作进程计数器。
pub struct WorkerMetrics {
    cycles_completed: AtomicU64,
    sensor_read_success: AtomicU64,
    sensor_read_failure: AtomicU64,
    gateway_failures: AtomicU64,
    condition_writes: AtomicU64,
    snapshots_written: AtomicU64,
    rollups_completed: AtomicU64,
    persistence_failures: AtomicU64,
}

impl WorkerMetrics {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            sensor_read_success: AtomicU64::new(0),
            sensor_read_failure: AtomicU64::new(0),
            gateway_failures: AtomicU64::new(0),
            condition_writes: AtomicU64::new(0),
            snapshots_written: AtomicU64::new(0),
            rollups_completed: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            sensor_read_success: self.sensor_read_success.load(Ordering::Relaxed),
            sensor_read_failure: self.sensor_read_failure.load(Ordering::Relaxed),
            gateway_failures: self.gateway_failures.load(Ordering::Relaxed),
            condition_writes: self.condition_writes.load(Ordering::Relaxed),
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
            rollups_completed: self.rollups_completed.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for WorkerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<WorkerMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static WorkerMetrics {
    METRICS.get_or_init(WorkerMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成采集周期追踪 ID。
pub fn new_cycle_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录完成的采集周期数。
pub fn record_cycle_completed() {
    metrics().cycles_completed.fetch_add(1, Ordering::Relaxed);
}

/// 记录传感器读取成功次数。
pub fn record_read_success() {
    metrics().sensor_read_success.fetch_add(1, Ordering::Relaxed);
}

/// 记录传感器读取失败次数（重试耗尽）。
pub fn record_read_failure() {
    metrics().sensor_read_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录网关不可达次数。
pub fn record_gateway_failure() {
    metrics().gateway_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录工况行写入次数。
pub fn record_condition_write() {
    metrics().condition_writes.fetch_add(1, Ordering::Relaxed);
}

/// 记录快照写入次数。
pub fn record_snapshot_written() {
    metrics().snapshots_written.fetch_add(1, Ordering::Relaxed);
}

/// 记录完成的日结次数。
pub fn record_rollup_completed() {
    metrics().rollups_completed.fetch_add(1, Ordering::Relaxed);
}

/// 记录持久化失败次数。
pub fn record_persistence_failure() {
    metrics().persistence_failures.fetch_add(1, Ordering::Relaxed);
}
