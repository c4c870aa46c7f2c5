//! 日结汇总 Postgres 实现

use crate::error::StorageError;
use crate::models::DailySummaryRecord;
use crate::traits::DailySummaryStore;
use sqlx::{PgPool, Row};

pub struct PgDailySummaryStore {
    pub pool: PgPool,
}

impl PgDailySummaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl DailySummaryStore for PgDailySummaryStore {
    async fn upsert_daily_summary(
        &self,
        record: &DailySummaryRecord,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "insert into daily_summary \
             (machine_id, date, total_hours, total_kwh, \
              heating_up_hours, heating_up_kwh, iddle_hours, iddle_kwh, \
              production_hours, production_kwh, is_one_block) \
             values ($1, to_timestamp($2 / 1000.0), $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             on conflict (machine_id, date) do update set \
             total_hours = excluded.total_hours, \
             total_kwh = excluded.total_kwh, \
             heating_up_hours = excluded.heating_up_hours, \
             heating_up_kwh = excluded.heating_up_kwh, \
             iddle_hours = excluded.iddle_hours, \
             iddle_kwh = excluded.iddle_kwh, \
             production_hours = excluded.production_hours, \
             production_kwh = excluded.production_kwh, \
             is_one_block = excluded.is_one_block",
        )
        .bind(record.machine_id)
        .bind(record.date_ms as f64)
        .bind(record.total_hours)
        .bind(record.total_kwh)
        .bind(record.heating_up_hours)
        .bind(record.heating_up_kwh)
        .bind(record.iddle_hours)
        .bind(record.iddle_kwh)
        .bind(record.production_hours)
        .bind(record.production_kwh)
        .bind(record.is_one_block)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_daily_summary(
        &self,
        machine_id: i64,
        date_ms: i64,
    ) -> Result<Option<DailySummaryRecord>, StorageError> {
        let row = sqlx::query(
            "select machine_id, \
             (extract(epoch from date) * 1000)::bigint as date_ms, \
             total_hours, total_kwh, \
             heating_up_hours, heating_up_kwh, iddle_hours, iddle_kwh, \
             production_hours, production_kwh, is_one_block \
             from daily_summary \
             where machine_id = $1 and date = to_timestamp($2 / 1000.0)",
        )
        .bind(machine_id)
        .bind(date_ms as f64)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(DailySummaryRecord {
            machine_id: row.try_get("machine_id")?,
            date_ms: row.try_get("date_ms")?,
            total_hours: row.try_get("total_hours")?,
            total_kwh: row.try_get("total_kwh")?,
            heating_up_hours: row.try_get("heating_up_hours")?,
            heating_up_kwh: row.try_get("heating_up_kwh")?,
            iddle_hours: row.try_get("iddle_hours")?,
            iddle_kwh: row.try_get("iddle_kwh")?,
            production_hours: row.try_get("production_hours")?,
            production_kwh: row.try_get("production_kwh")?,
            is_one_block: row.try_get("is_one_block")?,
        }))
    }
}
