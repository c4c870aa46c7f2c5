//! PostgreSQL 存储实现
//!
//! 使用 sqlx 参数化查询；时间戳经 `to_timestamp(ms / 1000.0)` 写入，
//! 以 `(extract(epoch from ts) * 1000)::bigint` 读回毫秒。

mod condition;
mod daily_summary;
mod general_config;
mod log_history;
mod machine;

pub use condition::PgConditionStore;
pub use daily_summary::PgDailySummaryStore;
pub use general_config::PgGeneralConfigStore;
pub use log_history::PgLogHistoryStore;
pub use machine::PgMachineStore;

use domain::Condition;
use tracing::warn;

/// 解析持久化的工况名；未知值按 UNKNOWN 处理，保证读路径总是可用。
pub(crate) fn condition_from_str(value: &str) -> Condition {
    Condition::parse(value).unwrap_or_else(|| {
        warn!(value, "unknown condition tag in storage");
        Condition::Unknown
    })
}
