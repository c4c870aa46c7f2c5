//! 轮询调度
//!
//! 长驻采集驱动：把机台配置展开为按网关分组的任务，跨网关并行、
//! 网关内串行地读取传感器，聚合判定工况并落库。快照定时任务、
//! 日结定时任务与频率监视器作为独立协程运行。

pub mod cron;
pub mod grouper;
pub mod scheduler;

pub use cron::{CronError, CronSchedule};
pub use grouper::group_tasks;
pub use scheduler::{write_snapshot, PollScheduler, SchedulerTiming};
