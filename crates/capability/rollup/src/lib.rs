//! 日结汇总
//!
//! 每日回放前一天（本地时区 UTC+7）的工况记录，按工况累计运行
//! 工时与电量，并对共享电表的机台按块拆分电量，幂等写入
//! `daily_summary`。

pub mod calculator;
pub mod clock;

pub use calculator::{compute_totals, DailyCalculator, DayTotals};
pub use clock::{date_ms_utc_midnight, day_window, local_offset, previous_local_day};
