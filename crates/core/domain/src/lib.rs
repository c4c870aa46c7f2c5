//! 核心领域类型
//!
//! 机台、传感器、网关等配置实体与每周期派生的采集任务类型。
//! 所有时间戳均为毫秒级 epoch（i64）。

pub mod condition;
pub mod reading;

pub use condition::Condition;
pub use reading::{aggregate_readings, MachineReading, SensorReading};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Modbus TCP 网关端点。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GatewayEndpoint {
    pub ip: String,
    pub port: u16,
}

impl GatewayEndpoint {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// 端点唯一键（`ip:port`），也是连接池的键。
    pub fn key(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for GatewayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// 寄存器数值编码
///
/// 寄存器序列先按大端字序拼为字节缓冲，再按编码在偏移 0 处读取。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterEncoding {
    Float32Be,
    Float32Le,
    Int16Be,
    Int16Le,
    Uint16Be,
    Uint16Le,
    Int32Be,
    Int32Le,
    Uint32Be,
    Uint32Le,
}

impl RegisterEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterEncoding::Float32Be => "float32_be",
            RegisterEncoding::Float32Le => "float32_le",
            RegisterEncoding::Int16Be => "int16_be",
            RegisterEncoding::Int16Le => "int16_le",
            RegisterEncoding::Uint16Be => "uint16_be",
            RegisterEncoding::Uint16Le => "uint16_le",
            RegisterEncoding::Int32Be => "int32_be",
            RegisterEncoding::Int32Le => "int32_le",
            RegisterEncoding::Uint32Be => "uint32_be",
            RegisterEncoding::Uint32Le => "uint32_le",
        }
    }

    /// 解析持久化的编码标签；未知标签返回 None。
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "float32_be" => Some(RegisterEncoding::Float32Be),
            "float32_le" => Some(RegisterEncoding::Float32Le),
            "int16_be" => Some(RegisterEncoding::Int16Be),
            "int16_le" => Some(RegisterEncoding::Int16Le),
            "uint16_be" => Some(RegisterEncoding::Uint16Be),
            "uint16_le" => Some(RegisterEncoding::Uint16Le),
            "int32_be" => Some(RegisterEncoding::Int32Be),
            "int32_le" => Some(RegisterEncoding::Int32Le),
            "uint32_be" => Some(RegisterEncoding::Uint32Be),
            "uint32_le" => Some(RegisterEncoding::Uint32Le),
            _ => None,
        }
    }
}

/// 传感器参数映射
///
/// `length` 以 16 位寄存器计数，读回的字节缓冲为 `2 × length` 字节。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterMapping {
    /// 参数名（即读数值表的键）
    pub name: String,
    /// 是否采集该参数
    pub save: bool,
    /// 寄存器起始地址
    pub address: u16,
    /// 寄存器数量
    pub length: u16,
    /// 缩放系数（解析值乘以该系数）
    pub formula: f64,
    /// 数值编码
    pub encoding: RegisterEncoding,
}

/// 传感器角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorRole {
    PowerMeter,
    Temperature,
    OnContact,
    AlarmContact,
    CapstanSpeed,
}

impl SensorRole {
    /// 规范角色顺序；分组与读取都按此顺序展开。
    pub const ALL: [SensorRole; 5] = [
        SensorRole::PowerMeter,
        SensorRole::Temperature,
        SensorRole::OnContact,
        SensorRole::AlarmContact,
        SensorRole::CapstanSpeed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorRole::PowerMeter => "power_meter",
            SensorRole::Temperature => "temperature",
            SensorRole::OnContact => "on_contact",
            SensorRole::AlarmContact => "alarm_contact",
            SensorRole::CapstanSpeed => "capstan_speed",
        }
    }

    /// 解析持久化的角色名；未知角色返回 None。
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "power_meter" => Some(SensorRole::PowerMeter),
            "temperature" => Some(SensorRole::Temperature),
            "on_contact" => Some(SensorRole::OnContact),
            "alarm_contact" => Some(SensorRole::AlarmContact),
            "capstan_speed" => Some(SensorRole::CapstanSpeed),
            _ => None,
        }
    }
}

impl fmt::Display for SensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 传感器配置：一个网关之后的一个 Modbus 从站。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub slave_id: u8,
    pub gateway: GatewayEndpoint,
    pub params: Vec<ParameterMapping>,
}

/// 机台配置
///
/// 启用的机台应当五个角色齐备；缺角色的机台仍会采集其余角色。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub id: i64,
    pub name: String,
    pub enabled: bool,
    pub power_meter_id: i64,
    pub sensors: HashMap<SensorRole, SensorConfig>,
}

/// 每周期派生的单传感器采集任务。
#[derive(Debug, Clone)]
pub struct SensorTask {
    pub machine_id: i64,
    pub machine_name: String,
    pub role: SensorRole,
    pub slave_id: u8,
    pub params: Vec<ParameterMapping>,
}

/// 按网关端点分组的采集任务。
#[derive(Debug, Clone)]
pub struct GatewayGroup {
    pub endpoint: GatewayEndpoint,
    pub tasks: Vec<SensorTask>,
}

/// 获取当前时间戳（毫秒）
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_key_concatenates_ip_and_port() {
        let endpoint = GatewayEndpoint::new("192.168.1.10", 502);
        assert_eq!(endpoint.key(), "192.168.1.10:502");
    }

    #[test]
    fn register_encoding_round_trips_through_tags() {
        let encodings = [
            RegisterEncoding::Float32Be,
            RegisterEncoding::Float32Le,
            RegisterEncoding::Int16Be,
            RegisterEncoding::Int16Le,
            RegisterEncoding::Uint16Be,
            RegisterEncoding::Uint16Le,
            RegisterEncoding::Int32Be,
            RegisterEncoding::Int32Le,
            RegisterEncoding::Uint32Be,
            RegisterEncoding::Uint32Le,
        ];
        for encoding in encodings {
            assert_eq!(RegisterEncoding::parse(encoding.as_str()), Some(encoding));
        }
        assert_eq!(RegisterEncoding::parse("float64_be"), None);
    }

    #[test]
    fn sensor_role_round_trips_and_keeps_order() {
        for role in SensorRole::ALL {
            assert_eq!(SensorRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(SensorRole::ALL[0], SensorRole::PowerMeter);
        assert_eq!(SensorRole::ALL[4], SensorRole::CapstanSpeed);
    }
}
