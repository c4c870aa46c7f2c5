//! 机台配置 Postgres 实现
//!
//! 三次查询（机台、传感器、参数映射）后在内存组装嵌套配置。
//! 角色或编码标签非法的行跳过并告警，不让单行脏数据拖垮整个周期。

use crate::error::StorageError;
use crate::traits::MachineStore;
use domain::{
    GatewayEndpoint, MachineConfig, ParameterMapping, RegisterEncoding, SensorConfig, SensorRole,
};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tracing::warn;

pub struct PgMachineStore {
    pub pool: PgPool,
}

impl PgMachineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MachineStore for PgMachineStore {
    async fn list_enabled_machines(&self) -> Result<Vec<MachineConfig>, StorageError> {
        let machine_rows = sqlx::query(
            "select id, name, power_meter_id from machine where enabled = true order by id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut machines: Vec<MachineConfig> = Vec::with_capacity(machine_rows.len());
        for row in machine_rows {
            machines.push(MachineConfig {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                enabled: true,
                power_meter_id: row.try_get("power_meter_id")?,
                sensors: HashMap::new(),
            });
        }
        if machines.is_empty() {
            return Ok(machines);
        }

        let machine_ids: Vec<i64> = machines.iter().map(|machine| machine.id).collect();
        let sensor_rows = sqlx::query(
            "select id, machine_id, role, slave_id, gateway_ip, gateway_port \
             from machine_sensor \
             where machine_id = any($1) \
             order by machine_id, id",
        )
        .bind(&machine_ids)
        .fetch_all(&self.pool)
        .await?;

        // sensor_id -> (machine_id, role, 半成品配置)
        let mut sensors: Vec<(i64, i64, SensorRole, SensorConfig)> = Vec::new();
        for row in sensor_rows {
            let sensor_id: i64 = row.try_get("id")?;
            let machine_id: i64 = row.try_get("machine_id")?;
            let role_tag: String = row.try_get("role")?;
            let Some(role) = SensorRole::parse(&role_tag) else {
                warn!(machine_id, role = %role_tag, "skipping sensor with unknown role");
                continue;
            };
            let slave_id: i16 = row.try_get("slave_id")?;
            let gateway_ip: String = row.try_get("gateway_ip")?;
            let gateway_port: i32 = row.try_get("gateway_port")?;
            sensors.push((
                sensor_id,
                machine_id,
                role,
                SensorConfig {
                    slave_id: slave_id as u8,
                    gateway: GatewayEndpoint::new(gateway_ip, gateway_port as u16),
                    params: Vec::new(),
                },
            ));
        }

        if !sensors.is_empty() {
            let sensor_ids: Vec<i64> = sensors.iter().map(|(id, ..)| *id).collect();
            let param_rows = sqlx::query(
                "select sensor_id, name, save, address, length, formula, encoding \
                 from sensor_parameter \
                 where sensor_id = any($1) \
                 order by sensor_id, position, id",
            )
            .bind(&sensor_ids)
            .fetch_all(&self.pool)
            .await?;

            let mut params_by_sensor: HashMap<i64, Vec<ParameterMapping>> = HashMap::new();
            for row in param_rows {
                let sensor_id: i64 = row.try_get("sensor_id")?;
                let name: String = row.try_get("name")?;
                let encoding_tag: String = row.try_get("encoding")?;
                let Some(encoding) = RegisterEncoding::parse(&encoding_tag) else {
                    warn!(sensor_id, param = %name, encoding = %encoding_tag, "skipping parameter with unsupported encoding");
                    continue;
                };
                let address: i32 = row.try_get("address")?;
                let length: i32 = row.try_get("length")?;
                params_by_sensor.entry(sensor_id).or_default().push(ParameterMapping {
                    name,
                    save: row.try_get("save")?,
                    address: address as u16,
                    length: length.max(1) as u16,
                    formula: row.try_get("formula")?,
                    encoding,
                });
            }

            for (sensor_id, _, _, sensor) in sensors.iter_mut() {
                if let Some(params) = params_by_sensor.remove(sensor_id) {
                    sensor.params = params;
                }
            }
        }

        let by_machine: HashMap<i64, usize> = machines
            .iter()
            .enumerate()
            .map(|(index, machine)| (machine.id, index))
            .collect();
        for (_, machine_id, role, sensor) in sensors {
            if let Some(&index) = by_machine.get(&machine_id) {
                machines[index].sensors.insert(role, sensor);
            }
        }

        Ok(machines)
    }
}
