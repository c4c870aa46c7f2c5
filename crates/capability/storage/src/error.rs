//! 存储层统一错误
//!
//! 各存储实现把底层失败（SQL 执行、连接、锁中毒）折叠为单一的
//! 消息型错误。调用方只需要区分成功与失败——采集循环对任何持久化
//! 错误的处理都一样：记日志、计数、进入下一周期。

#[derive(Debug)]
pub struct StorageError {
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        Self::new(err.to_string())
    }
}
