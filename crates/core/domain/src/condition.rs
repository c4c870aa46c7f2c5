//! 机台工况枚举。

use std::fmt;

/// 机台工况
///
/// 字符串形式与历史数据保持一致（`MachineOFF`、`UNKNOWN` 的大小写是
/// 既有约定，不可更改）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    MachineOff,
    HeatingUp,
    Iddle,
    MachineProduction,
    Unknown,
}

impl Condition {
    /// 持久化字符串形式。
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::MachineOff => "MachineOFF",
            Condition::HeatingUp => "HeatingUp",
            Condition::Iddle => "Iddle",
            Condition::MachineProduction => "MachineProduction",
            Condition::Unknown => "UNKNOWN",
        }
    }

    /// 解析持久化的工况名；未知值返回 None。
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "MachineOFF" => Some(Condition::MachineOff),
            "HeatingUp" => Some(Condition::HeatingUp),
            "Iddle" => Some(Condition::Iddle),
            "MachineProduction" => Some(Condition::MachineProduction),
            "UNKNOWN" => Some(Condition::Unknown),
            _ => None,
        }
    }

}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
