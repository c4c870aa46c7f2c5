//! 采集读数类型与机台级聚合。

use crate::{SensorRole, SensorTask};
use std::collections::HashMap;

/// 单个传感器一次采集的结果。
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub machine_id: i64,
    pub machine_name: String,
    pub role: SensorRole,
    pub ts_ms: i64,
    /// 参数名 -> 已缩放数值
    pub values: HashMap<String, f64>,
    pub success: bool,
    pub error: Option<String>,
}

impl SensorReading {
    /// 成功读数（至少采到一个参数）。
    pub fn ok(task: &SensorTask, ts_ms: i64, values: HashMap<String, f64>) -> Self {
        Self {
            machine_id: task.machine_id,
            machine_name: task.machine_name.clone(),
            role: task.role,
            ts_ms,
            values,
            success: true,
            error: None,
        }
    }

    /// 失败读数，`error` 携带最后一次错误。
    pub fn failed(task: &SensorTask, ts_ms: i64, error: impl Into<String>) -> Self {
        Self {
            machine_id: task.machine_id,
            machine_name: task.machine_name.clone(),
            role: task.role,
            ts_ms,
            values: HashMap::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// 机台在单个采集周期的聚合读数。
///
/// 值域是封闭键集 `{kwh, temperature, on_contact, alarm_contact,
/// capstan_speed}`；缺失的参数保持 None，由下游按 0 处理。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineReading {
    pub machine_id: i64,
    pub machine_name: String,
    pub ts_ms: i64,
    pub kwh: Option<f64>,
    pub temperature: Option<f64>,
    pub on_contact: Option<f64>,
    pub alarm_contact: Option<f64>,
    pub capstan_speed: Option<f64>,
}

impl MachineReading {
    fn apply_value(&mut self, key: &str, value: f64) {
        match key {
            "kwh" => self.kwh = Some(value),
            "temperature" => self.temperature = Some(value),
            "on_contact" => self.on_contact = Some(value),
            "alarm_contact" => self.alarm_contact = Some(value),
            // 历史配置存在 capstand_speed 拼写，读取时一并接受
            "capstan_speed" | "capstand_speed" => self.capstan_speed = Some(value),
            _ => {}
        }
    }
}

/// 将一个周期的传感器读数聚合为机台读数。
///
/// 按机台出现顺序分组；值表按参数名合并（后写覆盖），仅成功读数
/// 参与；机台时间戳取第一条成功读数的时间戳。五个传感器全部失败
/// 的机台不产出聚合读数——没有数据不等于关机。
pub fn aggregate_readings(readings: &[SensorReading]) -> Vec<MachineReading> {
    let mut order: Vec<i64> = Vec::new();
    let mut merged: HashMap<i64, MachineReading> = HashMap::new();

    for reading in readings.iter().filter(|reading| reading.success) {
        let entry = merged.entry(reading.machine_id).or_insert_with(|| {
            order.push(reading.machine_id);
            MachineReading {
                machine_id: reading.machine_id,
                machine_name: reading.machine_name.clone(),
                ts_ms: reading.ts_ms,
                ..MachineReading::default()
            }
        });
        for (key, value) in &reading.values {
            entry.apply_value(key, *value);
        }
    }

    order
        .into_iter()
        .filter_map(|machine_id| merged.remove(&machine_id))
        .collect()
}
