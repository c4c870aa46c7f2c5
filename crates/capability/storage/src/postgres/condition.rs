//! 工况日志 Postgres 实现

use super::condition_from_str;
use crate::error::StorageError;
use crate::models::{ConditionRecord, NewConditionRecord};
use crate::traits::ConditionStore;
use sqlx::{PgPool, Row};

pub struct PgConditionStore {
    pub pool: PgPool,
}

impl PgConditionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<ConditionRecord, StorageError> {
    let condition: String = row.try_get("condition")?;
    let last_condition: Option<String> = row.try_get("last_condition")?;
    Ok(ConditionRecord {
        id: row.try_get("id")?,
        machine_id: row.try_get("machine_id")?,
        ts_ms: row.try_get("ts_ms")?,
        condition: condition_from_str(&condition),
        kwh: row.try_get("kwh")?,
        last_ts_ms: row.try_get("last_ts_ms")?,
        last_condition: last_condition.as_deref().map(condition_from_str),
        last_kwh: row.try_get("last_kwh")?,
    })
}

#[async_trait::async_trait]
impl ConditionStore for PgConditionStore {
    async fn insert_condition(
        &self,
        record: NewConditionRecord,
    ) -> Result<ConditionRecord, StorageError> {
        let row = sqlx::query(
            "insert into condition_log \
             (machine_id, ts, condition, kwh, last_ts, last_condition, last_kwh) \
             values ($1, to_timestamp($2 / 1000.0), $3, $4, to_timestamp($5 / 1000.0), $6, $7) \
             returning id",
        )
        .bind(record.machine_id)
        .bind(record.ts_ms as f64)
        .bind(record.condition.as_str())
        .bind(&record.kwh)
        .bind(record.last_ts_ms.map(|ts_ms| ts_ms as f64))
        .bind(record.last_condition.map(|condition| condition.as_str()))
        .bind(&record.last_kwh)
        .fetch_one(&self.pool)
        .await?;

        Ok(ConditionRecord {
            id: row.try_get("id")?,
            machine_id: record.machine_id,
            ts_ms: record.ts_ms,
            condition: record.condition,
            kwh: record.kwh,
            last_ts_ms: record.last_ts_ms,
            last_condition: record.last_condition,
            last_kwh: record.last_kwh,
        })
    }

    async fn find_latest_condition(
        &self,
        machine_id: i64,
    ) -> Result<Option<ConditionRecord>, StorageError> {
        let row = sqlx::query(
            "select id, machine_id, \
             (extract(epoch from ts) * 1000)::bigint as ts_ms, \
             condition, kwh, \
             (extract(epoch from last_ts) * 1000)::bigint as last_ts_ms, \
             last_condition, last_kwh \
             from condition_log \
             where machine_id = $1 \
             order by ts desc, id desc \
             limit 1",
        )
        .bind(machine_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_conditions_in_range(
        &self,
        machine_id: i64,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<ConditionRecord>, StorageError> {
        let rows = sqlx::query(
            "select id, machine_id, \
             (extract(epoch from ts) * 1000)::bigint as ts_ms, \
             condition, kwh, \
             (extract(epoch from last_ts) * 1000)::bigint as last_ts_ms, \
             last_condition, last_kwh \
             from condition_log \
             where machine_id = $1 \
             and ts >= to_timestamp($2 / 1000.0) \
             and ts <= to_timestamp($3 / 1000.0) \
             order by ts asc, id asc",
        )
        .bind(machine_id)
        .bind(from_ms as f64)
        .bind(to_ms as f64)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(record_from_row(row)?);
        }
        Ok(records)
    }
}
