//! 工况分类
//!
//! 纯函数：同一 `(读数, 保温)` 输入恒得同一工况。缺失数值按 0
//! 处理，接点量四舍五入到整数后比较。

use domain::{Condition, MachineReading};

fn contact(value: Option<f64>) -> i64 {
    value.unwrap_or(0.0).round() as i64
}

/// 依优先级表判定工况。
pub fn classify(reading: &MachineReading, hot: bool) -> Condition {
    let on = contact(reading.on_contact);
    let alarm = contact(reading.alarm_contact);
    let capstan = contact(reading.capstan_speed);

    if on == 0 {
        return Condition::MachineOff;
    }
    if on == 1 && !hot {
        return Condition::HeatingUp;
    }
    if on == 1 && hot && alarm == 0 {
        return Condition::Iddle;
    }
    if on == 1 && hot && alarm == 1 && capstan == 1 {
        return Condition::MachineProduction;
    }
    if on == 1 && hot && alarm == 1 && capstan == 0 {
        return Condition::Iddle;
    }
    Condition::Unknown
}
