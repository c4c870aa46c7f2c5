//! 工作进程运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 工作进程运行配置。
///
/// 授权密钥与 IV 的环境变量名是既有部署约定，不可更改。节奏类
/// 参数均有默认值，只在慢网关或压测现场才需要调整。
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub license_secret_key: String,
    pub license_iv: String,
    /// 周期间让出间隔（毫秒）
    pub cycle_yield_ms: u64,
    /// 组内相邻传感器读取间隔（毫秒）
    pub sensor_spacing_ms: u64,
    /// 授权/配置异常时的重试间隔（秒）
    pub retry_delay_seconds: u64,
    /// 快照频率重读间隔（秒）
    pub freq_watch_seconds: u64,
    /// 整传感器读取重试次数
    pub sensor_max_retries: u32,
}

impl WorkerConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = read_required("DATABASE_URL")?;
        let license_secret_key = read_key_material("LICENSE_SECRET_KEY")?;
        let license_iv = read_key_material("LICENSE_IV")?;
        let cycle_yield_ms = read_u64_with_default("FLEET_CYCLE_YIELD_MS", 100)?;
        let sensor_spacing_ms = read_u64_with_default("FLEET_SENSOR_SPACING_MS", 50)?;
        let retry_delay_seconds = read_u64_with_default("FLEET_RETRY_DELAY_SECONDS", 5)?;
        let freq_watch_seconds = read_u64_with_default("FLEET_FREQ_WATCH_SECONDS", 60)?;
        let sensor_max_retries = read_u32_with_default("FLEET_SENSOR_MAX_RETRIES", 3)?;

        Ok(Self {
            database_url,
            license_secret_key,
            license_iv,
            cycle_yield_ms,
            sensor_spacing_ms,
            retry_delay_seconds,
            freq_watch_seconds,
            sensor_max_retries,
        })
    }
}

fn read_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

/// 读取 AES 密钥材料（至多 16 字节，不足部分由授权模块补零）。
fn read_key_material(key: &str) -> Result<String, ConfigError> {
    let value = read_required(key)?;
    if value.len() > 16 {
        return Err(ConfigError::Invalid(
            key.to_string(),
            "longer than 16 bytes".to_string(),
        ));
    }
    Ok(value)
}

/// 读取 u64 类型环境变量；未设置时取默认值。
fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 读取 u32 类型环境变量；未设置时取默认值。
fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}
