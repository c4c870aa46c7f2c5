//! 传感器读取
//!
//! 在单个网关客户端上顺序读取一个传感器的全部参数。设置从站号
//! 会改变客户端状态，同一客户端上的读取必须串行。

use crate::error::ProtocolError;
use crate::pool::GatewayClient;
use crate::registers::{parse_value, words_to_bytes};
use domain::{now_epoch_ms, ParameterMapping, SensorReading, SensorTask};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{debug, warn};

/// 单次 Modbus 请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// 整传感器读取的重试次数上限
pub const SENSOR_MAX_RETRIES: u32 = 3;

/// 读取一个传感器的全部待采参数。
///
/// 单参数失败只记日志不中断；至少采到一个参数即视为成功。
pub async fn read_sensor(client: &mut GatewayClient, task: &SensorTask, ts_ms: i64) -> SensorReading {
    client.ctx.set_slave(Slave(task.slave_id));

    let mut values = HashMap::new();
    let mut last_error: Option<String> = None;

    for param in task.params.iter().filter(|param| param.save) {
        match read_parameter(&mut client.ctx, param).await {
            Ok(value) => {
                values.insert(param.name.clone(), value * param.formula);
            }
            Err(error) => {
                warn!(
                    machine_id = task.machine_id,
                    role = %task.role,
                    param = %param.name,
                    address = param.address,
                    %error,
                    "parameter read failed"
                );
                last_error = Some(error.to_string());
            }
        }
    }

    if values.is_empty() {
        let error = last_error.unwrap_or_else(|| "no parameters collected".to_string());
        SensorReading::failed(task, ts_ms, error)
    } else {
        SensorReading::ok(task, ts_ms, values)
    }
}

/// 整传感器重试读取，线性退避（第 n 次失败后暂停 n 秒）。
///
/// 重试耗尽返回 `success = false` 的读数而非错误。
pub async fn read_sensor_with_retry(
    client: &mut GatewayClient,
    task: &SensorTask,
    max_retries: u32,
) -> SensorReading {
    let max_retries = max_retries.max(1);
    let mut attempt = 1;
    loop {
        let reading = read_sensor(client, task, now_epoch_ms()).await;
        if reading.success || attempt >= max_retries {
            return reading;
        }
        debug!(
            machine_id = task.machine_id,
            role = %task.role,
            attempt,
            "sensor read failed, retrying"
        );
        tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
        attempt += 1;
    }
}

/// 读保持寄存器（功能码 03）并按声明编码解析。
async fn read_parameter(ctx: &mut Context, param: &ParameterMapping) -> Result<f64, ProtocolError> {
    let words = timeout(
        REQUEST_TIMEOUT,
        ctx.read_holding_registers(param.address, param.length),
    )
    .await
    .map_err(|_| ProtocolError::Timeout(format!("read {}@{}", param.name, param.address)))?
    .map_err(|error| ProtocolError::Modbus(error.to_string()))?
    .map_err(|exception| ProtocolError::Modbus(format!("exception: {:?}", exception)))?;

    let buf = words_to_bytes(&words);
    parse_value(&buf, param.encoding)
}
