//! 存储层数据模型
//!
//! 下游消费方期望模拟量为定点字符串，接点量为整数；转换函数
//! 集中在此处。

use domain::{Condition, MachineReading};

/// 全局运行配置（`general_config` 表单行）。
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralConfig {
    /// 快照频率（分钟）
    pub log_freq_minutes: u32,
    /// 加密授权串
    pub license_key: String,
}

/// 工况转换记录（append-only）。
///
/// `last_*` 字段镜像前一条记录；机台最新一条记录即其当前工况。
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionRecord {
    pub id: i64,
    pub machine_id: i64,
    pub ts_ms: i64,
    pub condition: Condition,
    /// 累计电量（定点字符串）
    pub kwh: String,
    pub last_ts_ms: Option<i64>,
    pub last_condition: Option<Condition>,
    pub last_kwh: Option<String>,
}

/// 待插入的工况记录（id 由存储层分配）。
#[derive(Debug, Clone, PartialEq)]
pub struct NewConditionRecord {
    pub machine_id: i64,
    pub ts_ms: i64,
    pub condition: Condition,
    pub kwh: String,
    pub last_ts_ms: Option<i64>,
    pub last_condition: Option<Condition>,
    pub last_kwh: Option<String>,
}

/// 原始采样历史记录（append-only）。
#[derive(Debug, Clone, PartialEq)]
pub struct LogHistoryRecord {
    pub machine_id: i64,
    pub ts_ms: i64,
    pub on_contact: Option<i32>,
    pub alarm_contact: Option<i32>,
    pub temperature: Option<String>,
    pub kwh: Option<String>,
    pub capstan_speed: Option<String>,
}

impl LogHistoryRecord {
    /// 由机台聚合读数构造：接点量四舍五入为整数，模拟量转定点字符串。
    pub fn from_reading(reading: &MachineReading) -> Self {
        Self {
            machine_id: reading.machine_id,
            ts_ms: reading.ts_ms,
            on_contact: reading.on_contact.map(|value| value.round() as i32),
            alarm_contact: reading.alarm_contact.map(|value| value.round() as i32),
            temperature: reading.temperature.map(decimal_string),
            kwh: reading.kwh.map(decimal_string),
            capstan_speed: reading.capstan_speed.map(decimal_string),
        }
    }
}

/// 日结汇总（每机台每日一行，幂等 upsert）。
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummaryRecord {
    pub machine_id: i64,
    /// 本地日历日在 UTC 的零点（毫秒 epoch）
    pub date_ms: i64,
    pub total_hours: f64,
    pub total_kwh: f64,
    pub heating_up_hours: f64,
    pub heating_up_kwh: f64,
    pub iddle_hours: f64,
    pub iddle_kwh: f64,
    pub production_hours: f64,
    pub production_kwh: f64,
    pub is_one_block: bool,
}

/// 模拟量定点字符串（三位小数）。
pub fn decimal_string(value: f64) -> String {
    format!("{:.3}", value)
}
