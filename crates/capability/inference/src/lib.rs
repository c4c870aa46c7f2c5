//! 工况推断
//!
//! 由聚合读数推导机台工况：纯分类函数、保温时长判定与带去重
//! 保护的工况转换记录。

pub mod classifier;
pub mod dwell;
pub mod recorder;

pub use classifier::classify;
pub use dwell::DwellTracker;
pub use recorder::ConditionRecorder;
