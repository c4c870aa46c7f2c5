//! 机台配置内存实现
//!
//! 同时承担机台列表与全局配置两个只读接口，测试通过
//! 辅助方法注入配置。

use crate::error::StorageError;
use crate::models::GeneralConfig;
use crate::traits::{GeneralConfigStore, MachineStore};
use domain::MachineConfig;
use std::sync::RwLock;

/// 机台配置内存存储
pub struct InMemoryMachineStore {
    machines: RwLock<Vec<MachineConfig>>,
    general: RwLock<Option<GeneralConfig>>,
}

impl InMemoryMachineStore {
    pub fn new() -> Self {
        Self {
            machines: RwLock::new(Vec::new()),
            general: RwLock::new(None),
        }
    }

    /// 注入一台机台配置（测试用）。
    pub fn push_machine(&self, machine: MachineConfig) {
        if let Ok(mut machines) = self.machines.write() {
            machines.push(machine);
        }
    }

    /// 设置全局配置（测试用）。
    pub fn set_general_config(&self, config: GeneralConfig) {
        if let Ok(mut general) = self.general.write() {
            *general = Some(config);
        }
    }
}

impl Default for InMemoryMachineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MachineStore for InMemoryMachineStore {
    async fn list_enabled_machines(&self) -> Result<Vec<MachineConfig>, StorageError> {
        let machines = self
            .machines
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(machines
            .iter()
            .filter(|machine| machine.enabled)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl GeneralConfigStore for InMemoryMachineStore {
    async fn get_general_config(&self) -> Result<Option<GeneralConfig>, StorageError> {
        let general = self
            .general
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(general.clone())
    }
}
