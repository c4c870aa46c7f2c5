//! Postgres 连接池初始化
//!
//! 工作进程的全部持久化共用一个连接池。并发访问方只有采集周期、
//! 快照任务、日结任务与频率监视器，8 个连接已经富余。

use crate::error::StorageError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// 连接池上限
const MAX_CONNECTIONS: u32 = 8;

/// 按连接串建立 Postgres 连接池。
pub async fn connect_pool(database_url: &str) -> Result<PgPool, StorageError> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;
    Ok(pool)
}
