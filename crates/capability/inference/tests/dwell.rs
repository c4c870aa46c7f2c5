use domain::Condition;
use fleet_inference::DwellTracker;
use fleet_storage::{
    ConditionStore, InMemoryConditionStore, InMemoryLogHistoryStore, LogHistoryRecord,
    LogHistoryStore, NewConditionRecord,
};
use std::sync::Arc;

const HOUR_MS: i64 = 60 * 60 * 1000;

fn sample(machine_id: i64, ts_ms: i64, temperature: Option<f64>) -> LogHistoryRecord {
    LogHistoryRecord {
        machine_id,
        ts_ms,
        on_contact: Some(1),
        alarm_contact: None,
        temperature: temperature.map(|value| format!("{:.3}", value)),
        kwh: None,
        capstan_speed: None,
    }
}

fn tracker() -> (
    DwellTracker,
    Arc<InMemoryLogHistoryStore>,
    Arc<InMemoryConditionStore>,
) {
    let log_history = Arc::new(InMemoryLogHistoryStore::new());
    let conditions = Arc::new(InMemoryConditionStore::new());
    let tracker = DwellTracker::new(log_history.clone(), conditions.clone());
    (tracker, log_history, conditions)
}

#[tokio::test]
async fn cold_temperature_clears_and_returns_false() {
    let (tracker, log_history, _) = tracker();
    let now = 10 * HOUR_MS;
    log_history
        .insert_batch(&[sample(1, now - HOUR_MS, Some(320.0))])
        .await
        .expect("insert");

    assert!(!tracker.evaluate(1, Some(250.0), now).await.expect("evaluate"));
    assert_eq!(tracker.heating_up_since(1).await, None);
}

#[tokio::test]
async fn hot_for_over_an_hour_satisfies_dwell() {
    let (tracker, log_history, _) = tracker();
    let now = 10 * HOUR_MS;
    let rows = vec![
        sample(1, now - 80 * 60 * 1000, Some(305.0)),
        sample(1, now - 65 * 60 * 1000, Some(312.0)),
        sample(1, now - 30 * 60 * 1000, Some(318.0)),
    ];
    log_history.insert_batch(&rows).await.expect("insert");

    assert!(tracker.evaluate(1, Some(315.0), now).await.expect("evaluate"));
    assert_eq!(tracker.heating_up_since(1).await, Some(now - 80 * 60 * 1000));
}

#[tokio::test]
async fn dip_below_threshold_restarts_the_segment() {
    let (tracker, log_history, _) = tracker();
    let now = 10 * HOUR_MS;
    let rows = vec![
        sample(1, now - 85 * 60 * 1000, Some(310.0)),
        // 中途跌破 300，高温段重新起算
        sample(1, now - 50 * 60 * 1000, Some(280.0)),
        sample(1, now - 40 * 60 * 1000, Some(305.0)),
    ];
    log_history.insert_batch(&rows).await.expect("insert");

    assert!(!tracker.evaluate(1, Some(310.0), now).await.expect("evaluate"));
    assert_eq!(tracker.heating_up_since(1).await, Some(now - 40 * 60 * 1000));
}

#[tokio::test]
async fn null_temperature_rows_do_not_break_the_segment() {
    let (tracker, log_history, _) = tracker();
    let now = 10 * HOUR_MS;
    let rows = vec![
        sample(1, now - 70 * 60 * 1000, Some(305.0)),
        sample(1, now - 45 * 60 * 1000, None),
        sample(1, now - 20 * 60 * 1000, Some(308.0)),
    ];
    log_history.insert_batch(&rows).await.expect("insert");

    assert!(tracker.evaluate(1, Some(310.0), now).await.expect("evaluate"));
    assert_eq!(tracker.heating_up_since(1).await, Some(now - 70 * 60 * 1000));
}

#[tokio::test]
async fn empty_window_falls_back_to_last_persisted_condition() {
    let (tracker, _, conditions) = tracker();
    let now = 10 * HOUR_MS;
    conditions
        .insert_condition(NewConditionRecord {
            machine_id: 1,
            ts_ms: now - 3 * HOUR_MS,
            condition: Condition::MachineProduction,
            kwh: "100.000".to_string(),
            last_ts_ms: None,
            last_condition: None,
            last_kwh: None,
        })
        .await
        .expect("insert");

    // 窗口内没有任何样本，但此前已在生产：不得回退为升温
    assert!(tracker.evaluate(1, Some(320.0), now).await.expect("evaluate"));
}

#[tokio::test]
async fn empty_window_with_heating_history_stays_false() {
    let (tracker, _, conditions) = tracker();
    let now = 10 * HOUR_MS;
    conditions
        .insert_condition(NewConditionRecord {
            machine_id: 1,
            ts_ms: now - 3 * HOUR_MS,
            condition: Condition::HeatingUp,
            kwh: "10.000".to_string(),
            last_ts_ms: None,
            last_condition: None,
            last_kwh: None,
        })
        .await
        .expect("insert");

    assert!(!tracker.evaluate(1, Some(320.0), now).await.expect("evaluate"));
}

#[tokio::test]
async fn warm_up_primes_the_cache() {
    let (tracker, log_history, _) = tracker();
    let now = 10 * HOUR_MS;
    log_history
        .insert_batch(&[sample(1, now - 70 * 60 * 1000, Some(310.0))])
        .await
        .expect("insert");

    tracker.warm_up(&[1, 2], now).await;
    assert_eq!(tracker.heating_up_since(1).await, Some(now - 70 * 60 * 1000));
    assert_eq!(tracker.heating_up_since(2).await, None);
}

#[tokio::test]
async fn segment_start_is_monotonic_while_hot() {
    let (tracker, log_history, _) = tracker();
    let start = 10 * HOUR_MS;
    log_history
        .insert_batch(&[sample(1, start, Some(310.0))])
        .await
        .expect("insert");

    let mut previous_since = None;
    for step in 1..=4 {
        let now = start + step * 15 * 60 * 1000;
        log_history
            .insert_batch(&[sample(1, now, Some(310.0))])
            .await
            .expect("insert");
        tracker.evaluate(1, Some(310.0), now).await.expect("evaluate");
        let since = tracker.heating_up_since(1).await.expect("cached");
        if let Some(previous) = previous_since {
            assert!(since >= previous, "heating_up_since must not move backwards");
        }
        previous_since = Some(since);
    }
}
