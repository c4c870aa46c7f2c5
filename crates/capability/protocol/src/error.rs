//! 采集层错误类型定义

/// 采集通信错误
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// 网关不可达（连接重试耗尽）
    #[error("gateway unreachable: {0}")]
    GatewayUnreachable(String),

    /// IO 错误
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Modbus 错误（含从站异常码）
    #[error("modbus error: {0}")]
    Modbus(String),

    /// 请求超时
    #[error("timeout: {0}")]
    Timeout(String),

    /// 数据解析错误
    #[error("data parse error: {0}")]
    DataParse(String),
}
