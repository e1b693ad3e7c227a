mod common;

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use riskscope::{
    forecast, summarize, EventBus, Field, ForecastTrend, HistoryRecord, HistoryRecordId,
    InMemoryHistoryStore, NewHistoryRecord, ParameterVector, PredictionResult, SimulationEngine,
    SimulationEvent, SimulatorConfig, TrendDirection, TrendOutcome, TrendTracker,
};

use common::{approx, init_tracing, ScriptedOracle};

fn record(p: f64, t: i64) -> HistoryRecord {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(t);
    let prediction = PredictionResult::from_probability(p, 0.5).unwrap();
    NewHistoryRecord::from_prediction(&prediction, &ParameterVector::default(), at)
        .with_id(HistoryRecordId::new())
}

#[test]
fn summarize_requires_two_records() {
    assert!(summarize::<HistoryRecord>(&[]).is_insufficient());
    assert!(summarize(&[record(0.3, 0)]).is_insufficient());

    let summary = summarize(&[record(0.3, 0), record(0.5, 1)]).computed().unwrap();
    assert_eq!(summary.direction, TrendDirection::Increased);
    assert!(approx(summary.magnitude, 20.0));
}

#[test]
fn forecast_extrapolates_fitted_line() {
    let records = [record(0.2, 0), record(0.3, 1), record(0.4, 2)];
    let TrendOutcome::Computed(f) = forecast(&records, 1) else {
        panic!("expected a computed forecast");
    };
    assert!(approx(f.slope, 0.1));
    assert!(approx(f.horizon_probability, 0.5));
    assert_eq!(f.trend, ForecastTrend::Increasing);

    assert!(forecast(&records[..2], 1).is_insufficient());
}

#[tokio::test(start_paused = true)]
async fn saved_assessments_drive_history_trend() {
    init_tracing();
    let oracle = ScriptedOracle::instant();
    let store = Arc::new(InMemoryHistoryStore::new());
    let bus = EventBus::default();
    let config = SimulatorConfig {
        forecast_horizon_steps: 1,
        ..SimulatorConfig::default()
    };
    let engine =
        SimulationEngine::with_event_bus(oracle, store.clone(), config, bus.clone()).unwrap();
    let tracker = TrendTracker::from_config(store.clone(), bus.clone(), &config);
    let events = bus.subscribe();

    engine.initialize(ParameterVector::default()).await.unwrap();
    for age in [50.0, 55.0, 60.0] {
        engine.set_field(Field::Age, age).unwrap();
        engine.flush().await;
        engine.commit_to_history().await.unwrap();
    }

    // Saves may share a timestamp; listing and trend sorting are stable.
    let snapshot = tracker.refresh().await.unwrap();
    assert_eq!(snapshot.records.len(), 3);

    let summary = snapshot.summary.computed().unwrap();
    assert_eq!(summary.direction, TrendDirection::Increased);
    assert!(approx(summary.magnitude, 10.0));

    let forecast = snapshot.forecast.computed().unwrap();
    assert_eq!(forecast.trend, ForecastTrend::Increasing);
    assert!(approx(forecast.horizon_probability, 0.65));

    let history_events: Vec<_> = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, SimulationEvent::HistoryChanged { .. }))
        .collect();
    assert_eq!(history_events.len(), 1);

    let id = snapshot.records[0].id;
    let snapshot = tracker.delete(id).await.unwrap();
    assert_eq!(snapshot.records.len(), 2);
    assert!(snapshot.forecast.is_insufficient());
}
