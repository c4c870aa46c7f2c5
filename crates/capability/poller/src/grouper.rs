//! 采集任务分组
//!
//! 纯函数：每台启用机台按规范角色顺序展开为五个传感器任务，
//! 再按网关端点折叠成组。组内顺序为机台发现顺序 × 角色顺序。

use domain::{GatewayGroup, MachineConfig, SensorRole, SensorTask};
use std::collections::HashMap;
use tracing::warn;

/// 将机台配置折叠为按网关端点分组的任务表。
pub fn group_tasks(machines: &[MachineConfig]) -> Vec<GatewayGroup> {
    let mut groups: Vec<GatewayGroup> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for machine in machines.iter().filter(|machine| machine.enabled) {
        for role in SensorRole::ALL {
            let Some(sensor) = machine.sensors.get(&role) else {
                warn!(machine_id = machine.id, %role, "enabled machine missing sensor role");
                continue;
            };
            let task = SensorTask {
                machine_id: machine.id,
                machine_name: machine.name.clone(),
                role,
                slave_id: sensor.slave_id,
                params: sensor.params.clone(),
            };
            let key = sensor.gateway.key();
            match index_by_key.get(&key) {
                Some(&index) => groups[index].tasks.push(task),
                None => {
                    index_by_key.insert(key, groups.len());
                    groups.push(GatewayGroup {
                        endpoint: sensor.gateway.clone(),
                        tasks: vec![task],
                    });
                }
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{GatewayEndpoint, SensorConfig};

    fn machine(id: i64, enabled: bool, gateway_of: impl Fn(SensorRole) -> GatewayEndpoint) -> MachineConfig {
        let mut sensors = HashMap::new();
        for role in SensorRole::ALL {
            sensors.insert(
                role,
                SensorConfig {
                    slave_id: id as u8,
                    gateway: gateway_of(role),
                    params: Vec::new(),
                },
            );
        }
        MachineConfig {
            id,
            name: format!("machine-{}", id),
            enabled,
            power_meter_id: id,
            sensors,
        }
    }

    #[test]
    fn every_enabled_machine_contributes_five_tasks() {
        let gateway = GatewayEndpoint::new("10.0.0.1", 502);
        let machines = vec![
            machine(1, true, |_| gateway.clone()),
            machine(2, true, |_| gateway.clone()),
            machine(3, false, |_| gateway.clone()),
        ];
        let groups = group_tasks(&machines);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].tasks.len(), 10);
    }

    #[test]
    fn tasks_split_across_distinct_endpoints() {
        let power_gateway = GatewayEndpoint::new("10.0.0.1", 502);
        let other_gateway = GatewayEndpoint::new("10.0.0.2", 502);
        let machines = vec![machine(1, true, |role| {
            if role == SensorRole::PowerMeter {
                power_gateway.clone()
            } else {
                other_gateway.clone()
            }
        })];
        let groups = group_tasks(&machines);
        assert_eq!(groups.len(), 2);
        let total: usize = groups.iter().map(|group| group.tasks.len()).sum();
        assert_eq!(total, 5);
        assert_eq!(groups[0].endpoint, power_gateway);
        assert_eq!(groups[0].tasks.len(), 1);
        assert_eq!(groups[1].tasks.len(), 4);
    }

    #[test]
    fn group_order_follows_machine_then_role_order() {
        let gateway = GatewayEndpoint::new("10.0.0.1", 502);
        let machines = vec![
            machine(7, true, |_| gateway.clone()),
            machine(3, true, |_| gateway.clone()),
        ];
        let groups = group_tasks(&machines);
        let ids: Vec<i64> = groups[0].tasks.iter().map(|task| task.machine_id).collect();
        assert_eq!(ids, vec![7, 7, 7, 7, 7, 3, 3, 3, 3, 3]);
        assert_eq!(groups[0].tasks[0].role, SensorRole::PowerMeter);
        assert_eq!(groups[0].tasks[4].role, SensorRole::CapstanSpeed);
    }
}
