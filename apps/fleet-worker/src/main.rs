//! 机台数据采集与工况推断工作进程。
//!
//! 接线顺序：环境变量 → 运行配置 → 日志 → Postgres 存储 →
//! 授权校验器 → 网关连接池 / 保温判定 / 工况记录 / 日结计算 →
//! 轮询调度器。SIGINT / SIGTERM 触发优雅退出：停循环与定时任务、
//! 断开全部网关连接后以 0 退出。

use fleet_config::WorkerConfig;
use fleet_inference::{ConditionRecorder, DwellTracker};
use fleet_license::LicenseValidator;
use fleet_poller::{PollScheduler, SchedulerTiming};
use fleet_protocol::GatewayPool;
use fleet_rollup::DailyCalculator;
use fleet_storage::{
    connect_pool, ConditionStore, DailySummaryStore, GeneralConfigStore, LogHistoryStore,
    MachineStore, PgConditionStore, PgDailySummaryStore, PgGeneralConfigStore, PgLogHistoryStore,
    PgMachineStore,
};
use fleet_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;
    init_tracing();

    let pool = connect_pool(&config.database_url).await?;
    let machines: Arc<dyn MachineStore> = Arc::new(PgMachineStore::new(pool.clone()));
    let general_config: Arc<dyn GeneralConfigStore> =
        Arc::new(PgGeneralConfigStore::new(pool.clone()));
    let conditions: Arc<dyn ConditionStore> = Arc::new(PgConditionStore::new(pool.clone()));
    let log_history: Arc<dyn LogHistoryStore> = Arc::new(PgLogHistoryStore::new(pool.clone()));
    let summaries: Arc<dyn DailySummaryStore> = Arc::new(PgDailySummaryStore::new(pool));

    let license = Arc::new(LicenseValidator::new(
        &config.license_secret_key,
        &config.license_iv,
    ));
    let gateway_pool = Arc::new(GatewayPool::new());
    let dwell = Arc::new(DwellTracker::new(log_history.clone(), conditions.clone()));
    let recorder = Arc::new(ConditionRecorder::new(
        conditions.clone(),
        log_history.clone(),
    ));
    let calculator = Arc::new(DailyCalculator::new(
        machines.clone(),
        conditions,
        summaries,
    ));

    let timing = SchedulerTiming {
        retry_delay: Duration::from_secs(config.retry_delay_seconds),
        sensor_spacing: Duration::from_millis(config.sensor_spacing_ms),
        cycle_yield: Duration::from_millis(config.cycle_yield_ms),
        freq_watch_interval: Duration::from_secs(config.freq_watch_seconds),
        sensor_max_retries: config.sensor_max_retries,
    };

    let cancel = CancellationToken::new();
    let scheduler = Arc::new(PollScheduler::new(
        gateway_pool.clone(),
        machines,
        general_config,
        log_history,
        dwell,
        recorder,
        calculator,
        license,
        timing,
        cancel.clone(),
    ));

    let scheduler_handle = tokio::spawn(scheduler.run());

    wait_for_shutdown().await;
    info!("shutdown signal received");
    cancel.cancel();
    let _ = scheduler_handle.await;
    gateway_pool.close_all().await;
    info!("worker stopped");
    Ok(())
}

/// 等待 SIGINT / SIGTERM。
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(error) => warn!(%error, "failed to install SIGTERM handler"),
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}
