use domain::{Condition, MachineReading};
use fleet_inference::ConditionRecorder;
use fleet_storage::{ConditionStore, InMemoryConditionStore, InMemoryLogHistoryStore};
use std::sync::Arc;

fn reading(machine_id: i64, ts_ms: i64) -> MachineReading {
    MachineReading {
        machine_id,
        machine_name: format!("machine-{}", machine_id),
        ts_ms,
        kwh: Some(100.0),
        temperature: Some(310.0),
        on_contact: Some(1.0),
        alarm_contact: Some(1.0),
        capstan_speed: Some(1.0),
    }
}

fn recorder() -> (
    ConditionRecorder,
    Arc<InMemoryConditionStore>,
    Arc<InMemoryLogHistoryStore>,
) {
    let conditions = Arc::new(InMemoryConditionStore::new());
    let log_history = Arc::new(InMemoryLogHistoryStore::new());
    let recorder = ConditionRecorder::new(conditions.clone(), log_history.clone());
    (recorder, conditions, log_history)
}

#[tokio::test]
async fn first_record_is_always_written() {
    let (recorder, conditions, log_history) = recorder();
    let written = recorder
        .record(
            1,
            Condition::HeatingUp,
            Some(10.0),
            1_000,
            Some(&reading(1, 1_000)),
            false,
            false,
        )
        .await
        .expect("record");
    assert!(written);
    assert_eq!(conditions.len(), 1);
    // 工况变化同时落一条采样历史
    assert_eq!(log_history.len(), 1);
}

#[tokio::test]
async fn unchanged_condition_is_not_rewritten() {
    let (recorder, conditions, _) = recorder();
    recorder
        .record(1, Condition::Iddle, Some(10.0), 1_000, None, false, false)
        .await
        .expect("record");
    let written = recorder
        .record(1, Condition::Iddle, Some(10.5), 60_000, None, false, false)
        .await
        .expect("record");
    assert!(!written);
    assert_eq!(conditions.len(), 1);
}

#[tokio::test]
async fn dedup_guard_drops_same_condition_within_five_seconds() {
    let (recorder, conditions, _) = recorder();
    recorder
        .record(1, Condition::Iddle, Some(10.0), 10_000, None, false, false)
        .await
        .expect("record");
    // 即便强制快照，5 秒内的同工况行也会被丢弃
    let written = recorder
        .record(1, Condition::Iddle, Some(10.0), 14_500, None, true, true)
        .await
        .expect("record");
    assert!(!written);
    assert_eq!(conditions.len(), 1);

    let written = recorder
        .record(1, Condition::Iddle, Some(10.2), 15_001, None, true, true)
        .await
        .expect("record");
    assert!(written);
    assert_eq!(conditions.len(), 2);
}

#[tokio::test]
async fn transition_mirrors_previous_record_in_last_fields() {
    let (recorder, conditions, _) = recorder();
    recorder
        .record(1, Condition::HeatingUp, Some(98.0), 1_000, None, false, false)
        .await
        .expect("record");
    recorder
        .record(
            1,
            Condition::MachineProduction,
            Some(100.0),
            3_600_000,
            None,
            false,
            false,
        )
        .await
        .expect("record");

    let latest = conditions
        .find_latest_condition(1)
        .await
        .expect("latest")
        .expect("some");
    assert_eq!(latest.condition, Condition::MachineProduction);
    assert_eq!(latest.kwh, "100.000");
    assert_eq!(latest.last_ts_ms, Some(1_000));
    assert_eq!(latest.last_condition, Some(Condition::HeatingUp));
    assert_eq!(latest.last_kwh.as_deref(), Some("98.000"));
}

#[tokio::test]
async fn forced_snapshot_writes_heartbeat_without_log_history() {
    let (recorder, conditions, log_history) = recorder();
    recorder
        .record(
            1,
            Condition::MachineProduction,
            Some(100.0),
            1_000,
            Some(&reading(1, 1_000)),
            false,
            false,
        )
        .await
        .expect("record");
    assert_eq!(log_history.len(), 1);

    // 快照：工况未变也写心跳行，但不再落采样历史
    let written = recorder
        .record(
            1,
            Condition::MachineProduction,
            Some(101.0),
            901_000,
            Some(&reading(1, 901_000)),
            true,
            true,
        )
        .await
        .expect("record");
    assert!(written);
    assert_eq!(conditions.len(), 2);
    assert_eq!(log_history.len(), 1);
}
