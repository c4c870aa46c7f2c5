//! Modbus TCP 网关连接池
//!
//! 每个网关端点（`ip:port`）至多保留一个活动客户端。客户端失效后
//! 由 `mark_disconnected` 标记，下次 `acquire` 时重建连接。客户端
//! 持有可变的从站号状态，网关内读取必须经由客户端锁串行进行。

use crate::error::ProtocolError;
use domain::GatewayEndpoint;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_modbus::client::Context;
use tokio_modbus::prelude::*;
use tracing::{info, warn};

/// 连接尝试次数上限
const CONNECT_ATTEMPTS: u32 = 5;
/// 连接重试间隔
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// 池化的网关客户端。
pub struct GatewayClient {
    pub(crate) ctx: Context,
    connected: bool,
}

impl GatewayClient {
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// 网关连接池。
pub struct GatewayPool {
    clients: Mutex<HashMap<String, Arc<Mutex<GatewayClient>>>>,
}

impl GatewayPool {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// 获取端点对应的客户端；无缓存或已断开时重建连接。
    pub async fn acquire(
        &self,
        endpoint: &GatewayEndpoint,
    ) -> Result<Arc<Mutex<GatewayClient>>, ProtocolError> {
        let key = endpoint.key();
        let existing = { self.clients.lock().await.get(&key).cloned() };
        if let Some(client) = existing {
            if client.lock().await.connected {
                return Ok(client);
            }
        }

        let ctx = connect_with_retry(endpoint).await?;
        let client = Arc::new(Mutex::new(GatewayClient {
            ctx,
            connected: true,
        }));
        self.clients.lock().await.insert(key, client.clone());
        Ok(client)
    }

    /// 标记端点故障；下次 `acquire` 将重连。
    pub async fn mark_disconnected(&self, endpoint: &GatewayEndpoint) {
        let existing = { self.clients.lock().await.get(&endpoint.key()).cloned() };
        if let Some(client) = existing {
            client.lock().await.connected = false;
            warn!(gateway = %endpoint, "gateway marked disconnected");
        }
    }

    /// 关停时优雅断开全部客户端。
    pub async fn close_all(&self) {
        let drained: Vec<(String, Arc<Mutex<GatewayClient>>)> =
            self.clients.lock().await.drain().collect();
        for (key, client) in drained {
            let mut guard = client.lock().await;
            guard.connected = false;
            if let Err(error) = guard.ctx.disconnect().await {
                warn!(gateway = %key, %error, "failed to disconnect gateway client");
            } else {
                info!(gateway = %key, "gateway client closed");
            }
        }
    }
}

impl Default for GatewayPool {
    fn default() -> Self {
        Self::new()
    }
}

/// 带重试的 TCP 连接；重试耗尽返回 `GatewayUnreachable`。
async fn connect_with_retry(endpoint: &GatewayEndpoint) -> Result<Context, ProtocolError> {
    let addr: SocketAddr = endpoint.key().parse().map_err(|error| {
        ProtocolError::GatewayUnreachable(format!("invalid address {}: {}", endpoint, error))
    })?;

    let mut last_error = String::new();
    for attempt in 1..=CONNECT_ATTEMPTS {
        match tcp::connect(addr).await {
            Ok(ctx) => {
                info!(gateway = %endpoint, attempt, "connected to modbus gateway");
                return Ok(ctx);
            }
            Err(error) => {
                warn!(gateway = %endpoint, attempt, %error, "modbus gateway connect failed");
                last_error = error.to_string();
            }
        }
        if attempt < CONNECT_ATTEMPTS {
            tokio::time::sleep(CONNECT_RETRY_DELAY).await;
        }
    }

    Err(ProtocolError::GatewayUnreachable(format!(
        "{}: {}",
        endpoint, last_error
    )))
}
