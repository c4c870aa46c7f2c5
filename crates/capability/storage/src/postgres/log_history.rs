//! 采样历史 Postgres 实现

use crate::error::StorageError;
use crate::models::LogHistoryRecord;
use crate::traits::LogHistoryStore;
use sqlx::{PgPool, Row};

pub struct PgLogHistoryStore {
    pub pool: PgPool,
}

impl PgLogHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl LogHistoryStore for PgLogHistoryStore {
    async fn insert_batch(&self, rows: &[LogHistoryRecord]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                "insert into log_history \
                 (machine_id, ts, on_contact, alarm_contact, temperature, kwh, capstan_speed) \
                 values ($1, to_timestamp($2 / 1000.0), $3, $4, $5, $6, $7)",
            )
            .bind(row.machine_id)
            .bind(row.ts_ms as f64)
            .bind(row.on_contact)
            .bind(row.alarm_contact)
            .bind(&row.temperature)
            .bind(&row.kwh)
            .bind(&row.capstan_speed)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len())
    }

    async fn find_in_range(
        &self,
        machine_id: i64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<LogHistoryRecord>, StorageError> {
        let rows = sqlx::query(
            "select machine_id, \
             (extract(epoch from ts) * 1000)::bigint as ts_ms, \
             on_contact, alarm_contact, temperature, kwh, capstan_speed \
             from log_history \
             where machine_id = $1 \
             and ts >= to_timestamp($2 / 1000.0) \
             and ts <= to_timestamp($3 / 1000.0) \
             order by ts asc",
        )
        .bind(machine_id)
        .bind(from_ms as f64)
        .bind(to_ms as f64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(LogHistoryRecord {
                machine_id: row.try_get("machine_id")?,
                ts_ms: row.try_get("ts_ms")?,
                on_contact: row.try_get("on_contact")?,
                alarm_contact: row.try_get("alarm_contact")?,
                temperature: row.try_get("temperature")?,
                kwh: row.try_get("kwh")?,
                capstan_speed: row.try_get("capstan_speed")?,
            });
        }
        Ok(records)
    }
}
