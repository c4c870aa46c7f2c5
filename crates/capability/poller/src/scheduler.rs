//! 轮询调度器
//!
//! 主循环：授权校验 → 枚举机台 → 按网关分组 → 跨网关并行采集
//! （网关内串行）→ 聚合 → 工况判定与落库 → 缓存本周期读数。
//! 快照任务按 `*/log_freq` 强制写心跳工况行；日结任务每日 01:00
//! （本地时区）回放前一天；频率监视器定期（默认 60 秒）重读
//! `log_freq`，变化时通过 watch 通道让快照任务重建计划。
//!
//! 瞬时错误从不终止进程：网关失败跳过该网关，持久化失败记日志后
//! 进入下一周期，授权失败暂停 5 秒重试。

use crate::cron::CronSchedule;
use crate::grouper::group_tasks;
use domain::{
    aggregate_readings, now_epoch_ms, GatewayGroup, MachineReading, SensorReading,
};
use fleet_inference::{classify, ConditionRecorder, DwellTracker};
use fleet_license::LicenseValidator;
use fleet_protocol::{read_sensor_with_retry, GatewayPool, SENSOR_MAX_RETRIES};
use fleet_rollup::{previous_local_day, DailyCalculator};
use fleet_storage::{
    GeneralConfigStore, LogHistoryRecord, LogHistoryStore, MachineStore, StorageError,
};
use fleet_telemetry as telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// 默认快照频率（分钟）
const DEFAULT_LOG_FREQ_MINUTES: u32 = 15;
/// 日结触发时刻（本地时区）
const DAILY_HOUR: u32 = 1;

/// 调度节奏参数。
///
/// 默认值即服务的既有节奏；对应的环境变量只在慢网关或压测现场
/// 才需要调整。
#[derive(Debug, Clone)]
pub struct SchedulerTiming {
    /// 授权/配置异常时的重试间隔
    pub retry_delay: Duration,
    /// 组内相邻传感器读取间隔
    pub sensor_spacing: Duration,
    /// 周期间让出间隔
    pub cycle_yield: Duration,
    /// 快照频率重读间隔
    pub freq_watch_interval: Duration,
    /// 整传感器读取重试次数
    pub sensor_max_retries: u32,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            sensor_spacing: Duration::from_millis(50),
            cycle_yield: Duration::from_millis(100),
            freq_watch_interval: Duration::from_secs(60),
            sensor_max_retries: SENSOR_MAX_RETRIES,
        }
    }
}

/// 轮询调度器
pub struct PollScheduler {
    pool: Arc<GatewayPool>,
    machines: Arc<dyn MachineStore>,
    general_config: Arc<dyn GeneralConfigStore>,
    log_history: Arc<dyn LogHistoryStore>,
    dwell: Arc<DwellTracker>,
    recorder: Arc<ConditionRecorder>,
    calculator: Arc<DailyCalculator>,
    license: Arc<LicenseValidator>,
    timing: SchedulerTiming,
    latest_readings: RwLock<Vec<SensorReading>>,
    cancel: CancellationToken,
}

impl PollScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: Arc<GatewayPool>,
        machines: Arc<dyn MachineStore>,
        general_config: Arc<dyn GeneralConfigStore>,
        log_history: Arc<dyn LogHistoryStore>,
        dwell: Arc<DwellTracker>,
        recorder: Arc<ConditionRecorder>,
        calculator: Arc<DailyCalculator>,
        license: Arc<LicenseValidator>,
        timing: SchedulerTiming,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pool,
            machines,
            general_config,
            log_history,
            dwell,
            recorder,
            calculator,
            license,
            timing,
            latest_readings: RwLock::new(Vec::new()),
            cancel,
        }
    }

    /// 启动调度器；返回时全部子任务均已退出。
    pub async fn run(self: Arc<Self>) {
        let log_freq = match self.general_config.get_general_config().await {
            Ok(Some(config)) => config.log_freq_minutes.max(1),
            Ok(None) => {
                warn!("general config missing, using default log frequency");
                DEFAULT_LOG_FREQ_MINUTES
            }
            Err(error) => {
                warn!(%error, "failed to read general config, using default log frequency");
                DEFAULT_LOG_FREQ_MINUTES
            }
        };

        // 预热保温缓存
        match self.machines.list_enabled_machines().await {
            Ok(machines) => {
                let machine_ids: Vec<i64> = machines.iter().map(|machine| machine.id).collect();
                self.dwell.warm_up(&machine_ids, now_epoch_ms()).await;
            }
            Err(error) => warn!(%error, "failed to list machines for dwell warm-up"),
        }

        let (freq_tx, freq_rx) = watch::channel(log_freq);

        let snapshot_handle = {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.snapshot_loop(freq_rx).await })
        };
        let daily_handle = {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.daily_loop().await })
        };
        let watcher_handle = {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.frequency_watcher(freq_tx).await })
        };

        self.cycle_loop().await;

        let _ = tokio::join!(snapshot_handle, daily_handle, watcher_handle);
        info!("scheduler stopped");
    }

    /// 采集主循环。
    async fn cycle_loop(&self) {
        info!("polling loop started");
        while !self.cancel.is_cancelled() {
            let cycle_id = telemetry::new_cycle_id();
            self.run_cycle()
                .instrument(info_span!("cycle", cycle_id = %cycle_id))
                .await;
            tokio::select! {
                _ = tokio::time::sleep(self.timing.cycle_yield) => {}
                _ = self.cancel.cancelled() => {}
            }
        }
        info!("polling loop stopped");
    }

    async fn run_cycle(&self) {
        let config = match self.general_config.get_general_config().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                warn!("general config missing, retrying");
                self.pause().await;
                return;
            }
            Err(error) => {
                error!(%error, "failed to load general config");
                telemetry::record_persistence_failure();
                self.pause().await;
                return;
            }
        };

        let machines = match self.machines.list_enabled_machines().await {
            Ok(machines) if machines.is_empty() => {
                warn!("no enabled machines, retrying");
                self.pause().await;
                return;
            }
            Ok(machines) => machines,
            Err(error) => {
                error!(%error, "failed to list machines");
                telemetry::record_persistence_failure();
                self.pause().await;
                return;
            }
        };

        // 授权可能随配置更新而恢复有效，失败只暂停不退出
        if let Err(error) = self.license.validate(&config.license_key, machines.len()) {
            warn!(%error, "license validation failed, retrying");
            self.pause().await;
            return;
        }

        let groups = group_tasks(&machines);
        let readings = self.poll_groups(groups).await;
        let aggregated = aggregate_readings(&readings);

        for machine in &aggregated {
            self.classify_and_record(machine).await;
        }

        *self.latest_readings.write().await = readings;
        telemetry::record_cycle_completed();
    }

    /// 跨网关扇出；每组一个任务，互不取消（all-settled 语义）。
    async fn poll_groups(&self, groups: Vec<GatewayGroup>) -> Vec<SensorReading> {
        let mut join_set = JoinSet::new();
        for group in groups {
            let pool = self.pool.clone();
            let sensor_spacing = self.timing.sensor_spacing;
            let max_retries = self.timing.sensor_max_retries;
            join_set.spawn(async move {
                poll_gateway_group(pool, group, sensor_spacing, max_retries).await
            });
        }

        let mut readings = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(mut group_readings) => readings.append(&mut group_readings),
                Err(error) => error!(%error, "gateway group task failed"),
            }
        }
        readings
    }

    async fn classify_and_record(&self, machine: &MachineReading) {
        let hot = match self
            .dwell
            .evaluate(machine.machine_id, machine.temperature, machine.ts_ms)
            .await
        {
            Ok(hot) => hot,
            Err(error) => {
                error!(machine_id = machine.machine_id, %error, "dwell evaluation failed");
                telemetry::record_persistence_failure();
                return;
            }
        };
        let condition = classify(machine, hot);
        debug!(machine_id = machine.machine_id, %condition, hot, "cycle classification");

        match self
            .recorder
            .record(
                machine.machine_id,
                condition,
                machine.kwh,
                machine.ts_ms,
                Some(machine),
                false,
                false,
            )
            .await
        {
            Ok(true) => telemetry::record_condition_write(),
            Ok(false) => {}
            Err(error) => {
                error!(machine_id = machine.machine_id, %error, "condition record failed");
                telemetry::record_persistence_failure();
            }
        }
    }

    /// 快照任务：按 `*/log_freq` 触发，频率变化时重建计划。
    async fn snapshot_loop(&self, mut freq_rx: watch::Receiver<u32>) {
        loop {
            let log_freq = *freq_rx.borrow();
            let schedule = CronSchedule::every_minutes(log_freq);
            let now_ms = now_epoch_ms();
            let delay = Duration::from_millis(schedule.next_after(now_ms).saturating_sub(now_ms) as u64);

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                changed = freq_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    info!(log_freq = *freq_rx.borrow(), "snapshot schedule rebuilt");
                }
                _ = tokio::time::sleep(delay) => {
                    let readings = self.latest_readings.read().await.clone();
                    if let Err(error) = write_snapshot(
                        self.log_history.as_ref(),
                        &self.dwell,
                        &self.recorder,
                        &readings,
                        now_epoch_ms(),
                    )
                    .await
                    {
                        error!(%error, "snapshot write failed");
                        telemetry::record_persistence_failure();
                    }
                }
            }
        }
        info!("snapshot task stopped");
    }

    /// 日结任务：每日 01:00（本地时区）处理前一天。
    async fn daily_loop(&self) {
        let schedule = CronSchedule::daily_at(DAILY_HOUR, 0);
        loop {
            let now_ms = now_epoch_ms();
            let delay = Duration::from_millis(schedule.next_after(now_ms).saturating_sub(now_ms) as u64);

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {
                    let date = previous_local_day(now_epoch_ms());
                    info!(%date, "daily rollup started");
                    match self.calculator.run_for_date(date).await {
                        Ok(()) => telemetry::record_rollup_completed(),
                        Err(error) => {
                            error!(%error, "daily rollup failed");
                            telemetry::record_persistence_failure();
                        }
                    }
                }
            }
        }
        info!("daily rollup task stopped");
    }

    /// 频率监视器：定期重读 `log_freq`，变化时通知快照任务。
    /// 日结计划从不重配。
    async fn frequency_watcher(&self, freq_tx: watch::Sender<u32>) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.timing.freq_watch_interval) => {
                    match self.general_config.get_general_config().await {
                        Ok(Some(config)) => {
                            let log_freq = config.log_freq_minutes.max(1);
                            let current = *freq_tx.borrow();
                            if log_freq != current {
                                info!(old = current, new = log_freq, "log frequency changed");
                                let _ = freq_tx.send(log_freq);
                            }
                        }
                        Ok(None) => warn!("general config missing"),
                        Err(error) => warn!(%error, "failed to re-read general config"),
                    }
                }
            }
        }
        info!("frequency watcher stopped");
    }

    async fn pause(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.timing.retry_delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}

/// 单网关组的串行读取。
///
/// 获取失败时整组返回失败读数；全组读取失败视为网关故障并标记
/// 断开，周期内其余网关不受影响。
async fn poll_gateway_group(
    pool: Arc<GatewayPool>,
    group: GatewayGroup,
    sensor_spacing: Duration,
    max_retries: u32,
) -> Vec<SensorReading> {
    let client = match pool.acquire(&group.endpoint).await {
        Ok(client) => client,
        Err(error) => {
            warn!(gateway = %group.endpoint, %error, "gateway unavailable, skipping group");
            telemetry::record_gateway_failure();
            let ts_ms = now_epoch_ms();
            return group
                .tasks
                .iter()
                .map(|task| SensorReading::failed(task, ts_ms, error.to_string()))
                .collect();
        }
    };

    let mut guard = client.lock().await;
    let mut readings = Vec::with_capacity(group.tasks.len());
    for (index, task) in group.tasks.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(sensor_spacing).await;
        }
        let reading = read_sensor_with_retry(&mut guard, task, max_retries).await;
        if reading.success {
            telemetry::record_read_success();
        } else {
            telemetry::record_read_failure();
        }
        readings.push(reading);
    }
    drop(guard);

    if readings.iter().all(|reading| !reading.success) {
        pool.mark_disconnected(&group.endpoint).await;
        telemetry::record_gateway_failure();
    }
    readings
}

/// 强制快照：批量落采样历史，并为每台机台写心跳工况行。
///
/// 心跳行保证每个快照间隔至少存在一条工况记录，为日结提供时间
/// 锚点；`skip_log_history` 避免与批量写重复。缓存为空时跳过。
pub async fn write_snapshot(
    log_history: &dyn LogHistoryStore,
    dwell: &DwellTracker,
    recorder: &ConditionRecorder,
    readings: &[SensorReading],
    ts_ms: i64,
) -> Result<(), StorageError> {
    if readings.is_empty() {
        info!("no cached readings, skipping snapshot");
        return Ok(());
    }

    let aggregated: Vec<MachineReading> = aggregate_readings(readings)
        .into_iter()
        .map(|mut machine| {
            // 快照以触发时刻为准
            machine.ts_ms = ts_ms;
            machine
        })
        .collect();

    let rows: Vec<LogHistoryRecord> = aggregated.iter().map(LogHistoryRecord::from_reading).collect();
    log_history.insert_batch(&rows).await?;

    for machine in &aggregated {
        let hot = match dwell.evaluate(machine.machine_id, machine.temperature, ts_ms).await {
            Ok(hot) => hot,
            Err(error) => {
                error!(machine_id = machine.machine_id, %error, "dwell evaluation failed in snapshot");
                continue;
            }
        };
        let condition = classify(machine, hot);
        if let Err(error) = recorder
            .record(machine.machine_id, condition, machine.kwh, ts_ms, Some(machine), true, true)
            .await
        {
            error!(machine_id = machine.machine_id, %error, "snapshot condition record failed");
        }
    }

    telemetry::record_snapshot_written();
    info!(machines = aggregated.len(), "snapshot written");
    Ok(())
}
