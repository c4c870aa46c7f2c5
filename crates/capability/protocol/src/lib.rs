//! Modbus TCP 采集层
//!
//! 按网关端点池化 TCP 客户端，在单个客户端上顺序读取传感器
//! 参数并按声明编码解析为数值。

pub mod error;
pub mod pool;
pub mod reader;
pub mod registers;

pub use error::ProtocolError;
pub use pool::{GatewayClient, GatewayPool};
pub use reader::{read_sensor, read_sensor_with_retry, SENSOR_MAX_RETRIES};
pub use registers::{encode_value, parse_value, words_to_bytes};
