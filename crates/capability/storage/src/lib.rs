//! 持久化端口
//!
//! 工作进程与数据库之间的抽象层：
//!
//! 1. **接口抽象层** (`traits.rs`)：机台配置、工况日志、采样历史、
//!    日结汇总的异步 Trait 接口
//! 2. **数据模型层** (`models.rs`)：持久化记录结构与定点字符串转换
//! 3. **错误处理层** (`error.rs`)：统一的存储错误类型
//! 4. **连接管理层** (`connection.rs`)：Postgres 连接池管理
//! 5. **实现层**：
//!    - `in_memory/`：内存实现（测试与本地演示）
//!    - `postgres/`：PostgreSQL 实现（生产环境）
//!
//! 约定：
//! - 时间戳一律为毫秒级 epoch（i64），数据库侧存 timestamptz
//! - `condition_log` 与 `log_history` 只追加，从不更新或删除
//! - `daily_summary` 按 `(machine_id, date)` 幂等 upsert

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;

pub use in_memory::{
    InMemoryConditionStore, InMemoryDailySummaryStore, InMemoryLogHistoryStore,
    InMemoryMachineStore,
};
pub use postgres::{
    PgConditionStore, PgDailySummaryStore, PgGeneralConfigStore, PgLogHistoryStore, PgMachineStore,
};
