//! 全局运行配置 Postgres 实现

use crate::error::StorageError;
use crate::models::GeneralConfig;
use crate::traits::GeneralConfigStore;
use sqlx::{PgPool, Row};

pub struct PgGeneralConfigStore {
    pub pool: PgPool,
}

impl PgGeneralConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GeneralConfigStore for PgGeneralConfigStore {
    async fn get_general_config(&self) -> Result<Option<GeneralConfig>, StorageError> {
        let row = sqlx::query(
            "select log_freq_minutes, license_key from general_config order by id limit 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let log_freq_minutes: i32 = row.try_get("log_freq_minutes")?;
        Ok(Some(GeneralConfig {
            log_freq_minutes: log_freq_minutes.max(1) as u32,
            license_key: row.try_get("license_key")?,
        }))
    }
}
