//! 日结计算
//!
//! 工时：相邻记录间的时长归属前一条记录的工况；首条记录若带
//! `last_ts` 则从 `last_ts` 起算（补上当日首个快照之前的时段），
//! 末条记录不贡献时长；关机与未知工况不计。
//!
//! 电量：电表读数是累计值。对每个目标工况找出连续运行段，段电量
//! 为段边界记录（运行段后第一条异工况记录，段到当日末尾时取段内
//! 末条）的读数减去段首记录的 `last_kwh`——`last_kwh` 覆盖了上一
//! 快照到段起点之间累积的电量，正是该段实际消耗。

use crate::clock::{date_ms_utc_midnight, day_window};
use chrono::NaiveDate;
use domain::{Condition, MachineConfig};
use fleet_storage::{
    ConditionRecord, ConditionStore, DailySummaryRecord, DailySummaryStore, MachineStore,
    StorageError,
};
use std::sync::Arc;
use tracing::{error, info};

const HOUR_MS: f64 = 3_600_000.0;

/// 各工况的工时与电量合计。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DayTotals {
    pub heating_up_hours: f64,
    pub iddle_hours: f64,
    pub production_hours: f64,
    pub heating_up_kwh: f64,
    pub iddle_kwh: f64,
    pub production_kwh: f64,
}

impl DayTotals {
    pub fn total_hours(&self) -> f64 {
        self.heating_up_hours + self.iddle_hours + self.production_hours
    }

    pub fn total_kwh(&self) -> f64 {
        self.heating_up_kwh + self.iddle_kwh + self.production_kwh
    }

    /// 共享电表拆分：电量减半，工时不变。
    fn halve_kwh(&mut self) {
        self.heating_up_kwh /= 2.0;
        self.iddle_kwh /= 2.0;
        self.production_kwh /= 2.0;
    }
}

/// 按当日工况记录（升序）计算工时与电量合计。
pub fn compute_totals(records: &[ConditionRecord]) -> DayTotals {
    let mut totals = DayTotals::default();
    attribute_hours(records, &mut totals);
    for condition in [
        Condition::HeatingUp,
        Condition::Iddle,
        Condition::MachineProduction,
    ] {
        attribute_energy(records, condition, &mut totals);
    }
    totals
}

fn attribute_hours(records: &[ConditionRecord], totals: &mut DayTotals) {
    for i in 0..records.len().saturating_sub(1) {
        let current = &records[i];
        let next = &records[i + 1];
        let start_ms = if i == 0 {
            current.last_ts_ms.unwrap_or(current.ts_ms)
        } else {
            current.ts_ms
        };
        let hours = (next.ts_ms - start_ms).max(0) as f64 / HOUR_MS;
        match current.condition {
            Condition::HeatingUp => totals.heating_up_hours += hours,
            Condition::Iddle => totals.iddle_hours += hours,
            Condition::MachineProduction => totals.production_hours += hours,
            Condition::MachineOff | Condition::Unknown => {}
        }
    }
}

fn attribute_energy(records: &[ConditionRecord], target: Condition, totals: &mut DayTotals) {
    let mut i = 0;
    while i < records.len() {
        if records[i].condition != target {
            i += 1;
            continue;
        }
        let start = &records[i];
        let mut end = i;
        while end + 1 < records.len() && records[end + 1].condition == target {
            end += 1;
        }
        // 段边界：运行段后的第一条记录；段到当日末尾时取段内末条
        let boundary = records.get(end + 1).unwrap_or(&records[end]);
        let baseline = start
            .last_kwh
            .as_deref()
            .map(parse_kwh)
            .unwrap_or_else(|| parse_kwh(&start.kwh));
        let energy = parse_kwh(&boundary.kwh) - baseline;
        match target {
            Condition::HeatingUp => totals.heating_up_kwh += energy,
            Condition::Iddle => totals.iddle_kwh += energy,
            Condition::MachineProduction => totals.production_kwh += energy,
            Condition::MachineOff | Condition::Unknown => {}
        }
        i = end + 1;
    }
}

fn parse_kwh(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}

/// 日结计算器
pub struct DailyCalculator {
    machines: Arc<dyn MachineStore>,
    conditions: Arc<dyn ConditionStore>,
    summaries: Arc<dyn DailySummaryStore>,
}

impl DailyCalculator {
    pub fn new(
        machines: Arc<dyn MachineStore>,
        conditions: Arc<dyn ConditionStore>,
        summaries: Arc<dyn DailySummaryStore>,
    ) -> Self {
        Self {
            machines,
            conditions,
            summaries,
        }
    }

    /// 汇总指定本地日历日的全部启用机台。
    ///
    /// 单台失败只记日志，不影响其余机台。
    pub async fn run_for_date(&self, date: NaiveDate) -> Result<(), StorageError> {
        let machines = self.machines.list_enabled_machines().await?;
        let (from_ms, to_ms) = day_window(date);
        let date_ms = date_ms_utc_midnight(date);

        for machine in &machines {
            if let Err(err) = self
                .rollup_machine(machine, &machines, from_ms, to_ms, date_ms)
                .await
            {
                error!(machine_id = machine.id, error = %err, "daily rollup failed for machine");
            }
        }
        info!(%date, machines = machines.len(), "daily rollup finished");
        Ok(())
    }

    async fn rollup_machine(
        &self,
        machine: &MachineConfig,
        all_machines: &[MachineConfig],
        from_ms: i64,
        to_ms: i64,
        date_ms: i64,
    ) -> Result<(), StorageError> {
        let records = self
            .conditions
            .find_conditions_in_range(machine.id, from_ms, to_ms)
            .await?;
        let mut totals = compute_totals(&records);

        // 共享电表：同一电表上的另一台机台当日有生产记录，则两块
        // 拆分电量；工时从不拆分。
        let mut is_one_block = true;
        if totals.production_hours > 0.0
            && self
                .other_block_in_production(machine, all_machines, from_ms, to_ms)
                .await?
        {
            is_one_block = false;
            totals.halve_kwh();
        }

        let record = DailySummaryRecord {
            machine_id: machine.id,
            date_ms,
            total_hours: totals.total_hours(),
            total_kwh: totals.total_kwh(),
            heating_up_hours: totals.heating_up_hours,
            heating_up_kwh: totals.heating_up_kwh,
            iddle_hours: totals.iddle_hours,
            iddle_kwh: totals.iddle_kwh,
            production_hours: totals.production_hours,
            production_kwh: totals.production_kwh,
            is_one_block,
        };
        self.summaries.upsert_daily_summary(&record).await?;
        info!(
            machine_id = machine.id,
            total_hours = record.total_hours,
            total_kwh = record.total_kwh,
            is_one_block,
            "daily summary written"
        );
        Ok(())
    }

    async fn other_block_in_production(
        &self,
        machine: &MachineConfig,
        all_machines: &[MachineConfig],
        from_ms: i64,
        to_ms: i64,
    ) -> Result<bool, StorageError> {
        for other in all_machines
            .iter()
            .filter(|other| other.id != machine.id && other.power_meter_id == machine.power_meter_id)
        {
            let records = self
                .conditions
                .find_conditions_in_range(other.id, from_ms, to_ms)
                .await?;
            if records
                .iter()
                .any(|record| record.condition == Condition::MachineProduction)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        ts_ms: i64,
        condition: Condition,
        kwh: &str,
        last_ts_ms: Option<i64>,
        last_kwh: Option<&str>,
    ) -> ConditionRecord {
        ConditionRecord {
            id: ts_ms,
            machine_id: 1,
            ts_ms,
            condition,
            kwh: kwh.to_string(),
            last_ts_ms,
            last_condition: None,
            last_kwh: last_kwh.map(|value| value.to_string()),
        }
    }

    const H: i64 = 3_600_000;

    #[test]
    fn empty_day_yields_zero_totals() {
        let totals = compute_totals(&[]);
        assert_eq!(totals, DayTotals::default());
    }

    #[test]
    fn single_record_contributes_nothing() {
        let records = vec![record(10 * H, Condition::MachineProduction, "100.000", None, None)];
        let totals = compute_totals(&records);
        assert_eq!(totals.total_hours(), 0.0);
        // 单条记录自成一段且边界即自身：电量基线取自身读数，为 0
        assert_eq!(totals.total_kwh(), 0.0);
    }

    #[test]
    fn hours_and_energy_follow_the_reference_day() {
        // 10:00 生产 kwh=100(last=98)，12:00 待机 kwh=110(last=110)，
        // 14:00 生产 kwh=115(last=115)，16:00 生产 kwh=125(last=115)
        let records = vec![
            record(10 * H, Condition::MachineProduction, "100.000", None, Some("98.000")),
            record(12 * H, Condition::Iddle, "110.000", Some(10 * H), Some("110.000")),
            record(14 * H, Condition::MachineProduction, "115.000", Some(12 * H), Some("115.000")),
            record(16 * H, Condition::MachineProduction, "125.000", Some(14 * H), Some("115.000")),
        ];
        let totals = compute_totals(&records);
        assert_eq!(totals.production_hours, 4.0);
        assert_eq!(totals.iddle_hours, 2.0);
        assert_eq!(totals.total_hours(), 6.0);
        assert_eq!(totals.production_kwh, 22.0);
        assert_eq!(totals.iddle_kwh, 5.0);
        assert_eq!(totals.total_kwh(), 27.0);
    }

    #[test]
    fn first_record_lead_in_uses_last_ts() {
        let records = vec![
            record(10 * H, Condition::Iddle, "10.000", Some(9 * H), Some("9.000")),
            record(12 * H, Condition::MachineOff, "10.000", Some(10 * H), Some("10.000")),
        ];
        let totals = compute_totals(&records);
        // 09:00（last_ts）到 12:00 归属待机
        assert_eq!(totals.iddle_hours, 3.0);
    }

    #[test]
    fn off_and_unknown_are_excluded_from_hours() {
        let records = vec![
            record(8 * H, Condition::MachineOff, "10.000", None, None),
            record(10 * H, Condition::Unknown, "10.000", Some(8 * H), Some("10.000")),
            record(12 * H, Condition::HeatingUp, "11.000", Some(10 * H), Some("10.000")),
            record(13 * H, Condition::MachineOff, "12.000", Some(12 * H), Some("11.000")),
        ];
        let totals = compute_totals(&records);
        assert_eq!(totals.heating_up_hours, 1.0);
        assert_eq!(totals.total_hours(), 1.0);
    }

    #[test]
    fn conservation_holds_for_any_two_plus_record_day() {
        let records = vec![
            record(6 * H, Condition::HeatingUp, "50.000", None, Some("49.000")),
            record(8 * H, Condition::Iddle, "55.000", Some(6 * H), Some("55.000")),
            record(9 * H, Condition::MachineProduction, "57.000", Some(8 * H), Some("57.000")),
            record(15 * H, Condition::MachineOff, "80.000", Some(9 * H), Some("80.000")),
        ];
        let totals = compute_totals(&records);
        let sum_hours =
            totals.heating_up_hours + totals.iddle_hours + totals.production_hours;
        let sum_kwh = totals.heating_up_kwh + totals.iddle_kwh + totals.production_kwh;
        assert_eq!(totals.total_hours(), sum_hours);
        assert_eq!(totals.total_kwh(), sum_kwh);
        assert_eq!(totals.total_hours(), 9.0);
    }
}
