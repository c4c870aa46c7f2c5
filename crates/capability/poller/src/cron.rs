//! 极简 cron 表达式求值
//!
//! 只覆盖本服务需要的两类五段表达式：`*/N * * * *`（快照）与
//! `M H * * *`（日结）。日、月、星期字段必须为 `*`。按服务器
//! 本地时区（UTC+7）的墙钟求值。

use chrono::{TimeZone, Timelike, Utc};
use fleet_rollup::local_offset;

const MINUTE_MS: i64 = 60_000;

/// cron 表达式解析错误。
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CronError {
    #[error("invalid cron expression: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Any,
    Step(u32),
    Exact(u32),
}

impl Field {
    fn matches(&self, value: u32) -> bool {
        match self {
            Field::Any => true,
            Field::Step(step) => value % step == 0,
            Field::Exact(exact) => value == *exact,
        }
    }
}

/// 五段 cron 计划（仅分钟与小时可变）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CronSchedule {
    minute: Field,
    hour: Field,
}

impl CronSchedule {
    /// 解析五段表达式。
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 || parts[2] != "*" || parts[3] != "*" || parts[4] != "*" {
            return Err(CronError::Invalid(expr.to_string()));
        }
        let minute = parse_field(parts[0], 59).ok_or_else(|| CronError::Invalid(expr.to_string()))?;
        let hour = parse_field(parts[1], 23).ok_or_else(|| CronError::Invalid(expr.to_string()))?;
        Ok(Self { minute, hour })
    }

    /// 每 N 分钟触发（`*/N * * * *`）。
    pub fn every_minutes(n: u32) -> Self {
        Self {
            minute: Field::Step(n.clamp(1, 59)),
            hour: Field::Any,
        }
    }

    /// 每日定点触发（`M H * * *`）。
    pub fn daily_at(hour: u32, minute: u32) -> Self {
        Self {
            minute: Field::Exact(minute.min(59)),
            hour: Field::Exact(hour.min(23)),
        }
    }

    /// 严格晚于 `now_ms` 的下一次触发时刻（毫秒 epoch）。
    ///
    /// 对齐到下一个整分钟后逐分钟扫描；可变字段只有分钟与小时，
    /// 一天多一点的扫描窗口内必然命中。
    pub fn next_after(&self, now_ms: i64) -> i64 {
        let mut candidate = (now_ms.div_euclid(MINUTE_MS) + 1) * MINUTE_MS;
        for _ in 0..=(24 * 60) {
            if self.matches_ms(candidate) {
                return candidate;
            }
            candidate += MINUTE_MS;
        }
        candidate
    }

    fn matches_ms(&self, ts_ms: i64) -> bool {
        let Some(instant) = Utc.timestamp_millis_opt(ts_ms).single() else {
            return false;
        };
        let local = instant.with_timezone(&local_offset());
        self.minute.matches(local.minute()) && self.hour.matches(local.hour())
    }
}

fn parse_field(part: &str, max: u32) -> Option<Field> {
    if part == "*" {
        return Some(Field::Any);
    }
    if let Some(step) = part.strip_prefix("*/") {
        let step = step.parse::<u32>().ok()?;
        if step == 0 || step > max {
            return None;
        }
        return Some(Field::Step(step));
    }
    let exact = part.parse::<u32>().ok()?;
    if exact > max {
        return None;
    }
    Some(Field::Exact(exact))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: i64 = 60_000;
    const HOUR: i64 = 60 * MIN;

    #[test]
    fn parses_snapshot_and_daily_shapes() {
        assert_eq!(
            CronSchedule::parse("*/15 * * * *"),
            Ok(CronSchedule::every_minutes(15))
        );
        assert_eq!(
            CronSchedule::parse("0 1 * * *"),
            Ok(CronSchedule::daily_at(1, 0))
        );
    }

    #[test]
    fn rejects_unsupported_expressions() {
        assert!(CronSchedule::parse("*/15 * 1 * *").is_err());
        assert!(CronSchedule::parse("*/0 * * * *").is_err());
        assert!(CronSchedule::parse("61 * * * *").is_err());
        assert!(CronSchedule::parse("* * * *").is_err());
    }

    #[test]
    fn step_schedule_fires_on_minute_multiples() {
        let schedule = CronSchedule::every_minutes(15);
        // epoch 零点是整刻，从 00:07 起下一次是 00:15
        let now = 7 * MIN + 30_000;
        assert_eq!(schedule.next_after(now), 15 * MIN);
        // 恰在整刻上时取严格之后的下一刻
        assert_eq!(schedule.next_after(15 * MIN), 30 * MIN);
    }

    #[test]
    fn daily_schedule_respects_utc_plus_seven() {
        let schedule = CronSchedule::daily_at(1, 0);
        // 本地 01:00 = UTC 前一日 18:00；epoch 日零点（本地 07:00）之后
        // 的下一次触发在 UTC 18:00
        let next = schedule.next_after(0);
        assert_eq!(next, 18 * HOUR);
        // 触发后再求值，得到次日同一时刻
        assert_eq!(schedule.next_after(next), next + 24 * HOUR);
    }

    #[test]
    fn every_minute_schedule_advances_one_minute() {
        let schedule = CronSchedule::every_minutes(1);
        assert_eq!(schedule.next_after(90_000), 2 * MIN);
    }
}
