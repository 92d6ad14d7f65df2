//! End-to-end engine behavior against in-memory collaborators
//!
//! Uses the manual clock to exercise the staleness path without sleeping,
//! and the static gateway so every run is deterministic and offline.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Once};
use std::time::Duration;
use tickflow_core::{
    BasicInfo, Error, ExecutionStatus, Fundamentals, Kline, ManualClock, Quote, Report,
};
use tickflow_engine::{EngineConfig, ExecutionEngine, TOTAL_STEPS};
use tickflow_market::{MarketDataGateway, StaticGateway, SymbolData};
use tickflow_store::{
    ExecutionStore, MemoryExecutionStore, MemoryReportStore, ReportStore, StoreError,
};
use tokio::sync::Notify;

const USER: &str = "user-1";
const CONTACT: &str = "user-1@example.com";

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn moutai_gateway() -> StaticGateway {
    StaticGateway::new().with_symbol(
        "600519.SS",
        SymbolData::synthetic(
            "Kweichow Moutai",
            "Beverages",
            1500.0,
            1.0,
            20,
            Fundamentals {
                roe: 28.0,
                pe: 18.0,
                pb: 2.0,
                revenue_growth: 15.0,
            },
        ),
    )
}

struct Harness {
    engine: ExecutionEngine,
    store: Arc<MemoryExecutionStore>,
    reports: Arc<MemoryReportStore>,
    clock: Arc<ManualClock>,
}

fn harness(gateway: StaticGateway) -> Harness {
    init_tracing();
    let store = Arc::new(MemoryExecutionStore::new());
    let reports = Arc::new(MemoryReportStore::new());
    let clock = Arc::new(ManualClock::starting_at(Utc::now()));
    let engine = ExecutionEngine::new(store.clone(), reports.clone(), Arc::new(gateway))
        .with_clock(clock.clone());
    Harness {
        engine,
        store,
        reports,
        clock,
    }
}

async fn start(harness: &Harness, symbol: &str, market: &str) -> String {
    harness
        .engine
        .start(USER, CONTACT, symbol, market)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_start_creates_running_task_at_step_zero() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    let snapshot = h.engine.get(&id, USER).await.unwrap();
    assert_eq!(snapshot.status, ExecutionStatus::Running);
    assert_eq!(snapshot.step, 0);
    assert_eq!(snapshot.total_steps, TOTAL_STEPS);
    assert_eq!(snapshot.progress, 0);
    assert_eq!(snapshot.logs.len(), 1);
    assert!(snapshot.result.is_none());
    assert!(snapshot.stopped_reason.is_none());
}

#[tokio::test]
async fn test_each_tick_advances_exactly_one_step() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    for expected in 1..=TOTAL_STEPS {
        let snapshot = h.engine.tick(&id, USER).await.unwrap();
        assert_eq!(snapshot.step, expected);
    }
}

#[tokio::test]
async fn test_full_run_completes_with_report() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    let mut last = h.engine.get(&id, USER).await.unwrap();
    for _ in 0..TOTAL_STEPS {
        last = h.engine.tick(&id, USER).await.unwrap();
    }

    assert_eq!(last.status, ExecutionStatus::Completed);
    assert_eq!(last.step, TOTAL_STEPS);
    assert_eq!(last.progress, 100);
    // creation line plus one line per stage
    assert!(last.logs.len() >= 1 + TOTAL_STEPS as usize);

    let result = last.result.expect("completed task carries a result");
    // bullish drift plus strong fundamentals lands in the bullish band
    assert_eq!(result.recommendation, "bullish-leaning");
    assert_eq!(result.confidence_score, 78);
    assert_eq!(result.risk_level, "medium");

    let report = h
        .reports
        .get(&result.report_id)
        .await
        .unwrap()
        .expect("report persisted");
    assert_eq!(report.execution_id, id);
    assert_eq!(report.symbol, "600519");
    assert!(report.snapshot.quotes.is_some());
    assert!(report.snapshot.decision.is_some());
}

#[tokio::test]
async fn test_tick_on_completed_task_is_a_noop() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;
    for _ in 0..TOTAL_STEPS {
        h.engine.tick(&id, USER).await.unwrap();
    }

    let before = h.engine.get(&id, USER).await.unwrap();
    let after = h.engine.tick(&id, USER).await.unwrap();
    assert_eq!(after.status, ExecutionStatus::Completed);
    assert_eq!(after.step, before.step);
    assert_eq!(after.logs.len(), before.logs.len());
    assert_eq!(after.updated_at, before.updated_at);
}

/// Gateway that parks the first basic-info fetch until released, so a
/// test can hold one tick mid-stage while a second arrives
struct GatedGateway {
    inner: StaticGateway,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl MarketDataGateway for GatedGateway {
    async fn get_basic(&self, symbol: &str) -> tickflow_market::Result<Option<BasicInfo>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.get_basic(symbol).await
    }

    async fn get_recent_quotes(
        &self,
        symbol: &str,
        limit: usize,
    ) -> tickflow_market::Result<Vec<Quote>> {
        self.inner.get_recent_quotes(symbol, limit).await
    }

    async fn get_fundamentals(
        &self,
        symbol: &str,
    ) -> tickflow_market::Result<Option<Fundamentals>> {
        self.inner.get_fundamentals(symbol).await
    }

    async fn get_kline_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> tickflow_market::Result<Vec<Kline>> {
        self.inner.get_kline_history(symbol, limit).await
    }
}

#[tokio::test]
async fn test_racing_ticks_advance_one_step_total() {
    init_tracing();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let gateway = GatedGateway {
        inner: moutai_gateway(),
        entered: entered.clone(),
        release: release.clone(),
    };
    let engine = Arc::new(ExecutionEngine::new(
        Arc::new(MemoryExecutionStore::new()),
        Arc::new(MemoryReportStore::new()),
        Arc::new(gateway),
    ));

    let id = engine.start(USER, CONTACT, "600519", "domestic").await.unwrap();

    let winner = tokio::spawn({
        let engine = engine.clone();
        let id = id.clone();
        async move { engine.tick(&id, USER).await }
    });

    // wait until the first tick is inside the stage, then race a second one
    entered.notified().await;
    let loser = engine.tick(&id, USER).await.unwrap();
    assert_eq!(loser.status, ExecutionStatus::Running);
    assert_eq!(loser.step, 0);

    release.notify_one();
    let won = winner.await.unwrap().unwrap();
    assert_eq!(won.step, 1);

    // exactly one advancement and one stage log
    let snapshot = engine.get(&id, USER).await.unwrap();
    assert_eq!(snapshot.step, 1);
    assert_eq!(snapshot.logs.len(), 2);
}

#[tokio::test]
async fn test_stale_task_demotes_on_tick() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;
    h.engine.tick(&id, USER).await.unwrap();

    h.clock.advance(chrono::Duration::seconds(151));
    let snapshot = h.engine.tick(&id, USER).await.unwrap();

    assert_eq!(snapshot.status, ExecutionStatus::Stopped);
    // demotion never advances the pipeline
    assert_eq!(snapshot.step, 1);
    let reason = snapshot.stopped_reason.expect("stopped tasks carry a reason");
    assert!(!reason.is_empty());
}

#[tokio::test]
async fn test_stale_task_demotes_on_get() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    h.clock.advance(chrono::Duration::seconds(151));
    let snapshot = h.engine.get(&id, USER).await.unwrap();

    assert_eq!(snapshot.status, ExecutionStatus::Stopped);
    assert_eq!(snapshot.step, 0);
    assert!(snapshot.stopped_reason.is_some());
}

#[tokio::test]
async fn test_lease_boundary_is_exclusive() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    // exactly at the timeout the lease still holds
    h.clock.advance(chrono::Duration::seconds(150));
    let snapshot = h.engine.tick(&id, USER).await.unwrap();
    assert_eq!(snapshot.status, ExecutionStatus::Running);
    assert_eq!(snapshot.step, 1);
}

#[tokio::test]
async fn test_ticking_renews_the_lease() {
    let h = harness(moutai_gateway());
    let config = EngineConfig::builder()
        .stale_timeout(Duration::from_secs(10))
        .build()
        .unwrap();
    let engine = ExecutionEngine::new(
        h.store.clone(),
        h.reports.clone(),
        Arc::new(moutai_gateway()),
    )
    .with_clock(h.clock.clone())
    .with_config(config);

    let id = engine.start(USER, CONTACT, "600519", "domestic").await.unwrap();
    for _ in 0..TOTAL_STEPS {
        h.clock.advance(chrono::Duration::seconds(8));
        engine.tick(&id, USER).await.unwrap();
    }

    // 48 simulated seconds elapsed, but no single gap crossed the timeout
    let snapshot = engine.get(&id, USER).await.unwrap();
    assert_eq!(snapshot.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_cancel_fresh_task() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    let canceled = h.engine.cancel(&id, USER).await.unwrap();
    assert_eq!(canceled, id);

    let snapshot = h.engine.get(&id, USER).await.unwrap();
    assert_eq!(snapshot.status, ExecutionStatus::Canceled);
    assert_eq!(snapshot.step, 0);
    assert!(snapshot.result.is_none());
}

#[tokio::test]
async fn test_cancel_terminal_task_is_invalid_state() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;
    h.engine.cancel(&id, USER).await.unwrap();

    let err = h.engine.cancel(&id, USER).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert!(err.to_string().contains("canceled"));
}

#[tokio::test]
async fn test_tick_after_cancel_is_a_noop() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;
    h.engine.cancel(&id, USER).await.unwrap();

    let snapshot = h.engine.tick(&id, USER).await.unwrap();
    assert_eq!(snapshot.status, ExecutionStatus::Canceled);
    assert_eq!(snapshot.step, 0);
}

#[tokio::test]
async fn test_cancel_all_stops_only_callers_running_tasks() {
    let h = harness(moutai_gateway());
    let a = start(&h, "600519", "domestic").await;
    let b = start(&h, "AAPL", "us").await;
    let done = start(&h, "0700", "hk").await;
    for _ in 0..TOTAL_STEPS {
        h.engine.tick(&done, USER).await.unwrap();
    }
    let other = h
        .engine
        .start("user-2", "user-2@example.com", "MSFT", "us")
        .await
        .unwrap();

    let stopped = h.engine.cancel_all(USER).await.unwrap();
    assert_eq!(stopped, 2);

    for id in [&a, &b] {
        let snapshot = h.engine.get(id, USER).await.unwrap();
        assert_eq!(snapshot.status, ExecutionStatus::Canceled);
    }
    let untouched = h.engine.get(&other, "user-2").await.unwrap();
    assert_eq!(untouched.status, ExecutionStatus::Running);
}

#[tokio::test]
async fn test_delete_removes_the_record() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    h.engine.delete(&id, USER).await.unwrap();
    let err = h.engine.get(&id, USER).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_start_rejects_bad_input() {
    let h = harness(moutai_gateway());

    let err = h.engine.start(USER, CONTACT, "  ", "us").await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let err = h
        .engine
        .start(USER, CONTACT, "600519", "mars")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[tokio::test]
async fn test_foreign_caller_sees_not_found() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;

    assert!(matches!(
        h.engine.get(&id, "intruder").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        h.engine.tick(&id, "intruder").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        h.engine.cancel(&id, "intruder").await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        h.engine.delete(&id, "intruder").await.unwrap_err(),
        Error::NotFound(_)
    ));

    // the owner still sees an untouched task
    let snapshot = h.engine.get(&id, USER).await.unwrap();
    assert_eq!(snapshot.status, ExecutionStatus::Running);
    assert_eq!(snapshot.step, 0);
}

/// Report store whose writes always fail, for the fatal storage path
struct FailingReportStore;

#[async_trait]
impl ReportStore for FailingReportStore {
    async fn save(&self, _report: Report) -> tickflow_store::Result<String> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    async fn get(&self, _id: &str) -> tickflow_store::Result<Option<Report>> {
        Ok(None)
    }

    async fn list_for_user(
        &self,
        _user_id: &str,
        _limit: usize,
    ) -> tickflow_store::Result<Vec<Report>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_report_write_failure_fails_the_task() {
    init_tracing();
    let store = Arc::new(MemoryExecutionStore::new());
    let engine = ExecutionEngine::new(
        store.clone(),
        Arc::new(FailingReportStore),
        Arc::new(moutai_gateway()),
    );
    let id = engine.start(USER, CONTACT, "600519", "domestic").await.unwrap();

    // every stage up to publish succeeds
    for _ in 0..TOTAL_STEPS - 1 {
        engine.tick(&id, USER).await.unwrap();
    }

    let err = engine.tick(&id, USER).await.unwrap_err();
    assert!(matches!(err, Error::StorageFailure(_)));

    let stored = store.get(&id).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Failed);
    // the failing stage never counts as advanced
    assert_eq!(stored.step, TOTAL_STEPS - 1);
    assert!(stored.result.is_none());

    let last = stored.logs.last().unwrap();
    assert!(last.text.contains("publish failed"));
    assert!(last.text.contains("storage backend error"));

    // failed is terminal; another tick is a no-op
    let snapshot = engine.tick(&id, USER).await.unwrap();
    assert_eq!(snapshot.status, ExecutionStatus::Failed);
    assert_eq!(snapshot.step, TOTAL_STEPS - 1);
}

#[tokio::test]
async fn test_degraded_gateway_still_completes() {
    // a gateway that knows nothing answers "no data" on every endpoint
    let h = harness(StaticGateway::new());
    let id = start(&h, "600519", "domestic").await;

    let mut last = h.engine.get(&id, USER).await.unwrap();
    for _ in 0..TOTAL_STEPS {
        last = h.engine.tick(&id, USER).await.unwrap();
    }

    assert_eq!(last.status, ExecutionStatus::Completed);
    assert!(
        last.logs
            .iter()
            .any(|l| l.text.contains("unavailable, proceeding with defaults"))
    );

    // neutral signals land in the hold band
    let result = last.result.unwrap();
    assert_eq!(result.recommendation, "hold/observe");
    assert_eq!(result.confidence_score, 70);
}

#[tokio::test]
async fn test_list_is_newest_first_and_self_heals() {
    let h = harness(moutai_gateway());
    let first = start(&h, "600519", "domestic").await;
    h.clock.advance(chrono::Duration::seconds(5));
    let second = start(&h, "AAPL", "us").await;

    let listed = h.engine.list(USER, 10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second);
    assert_eq!(listed[1].id, first);

    // both leases lapse; listing demotes them in place
    h.clock.advance(chrono::Duration::seconds(151));
    let listed = h.engine.list(USER, 10).await.unwrap();
    assert!(
        listed
            .iter()
            .all(|s| s.status == ExecutionStatus::Stopped)
    );

    // the demotion is persisted, not cosmetic
    let stored = h.store.get(&first).await.unwrap().unwrap();
    assert_eq!(stored.status, ExecutionStatus::Stopped);
}

#[tokio::test]
async fn test_list_respects_limit() {
    let h = harness(moutai_gateway());
    for _ in 0..3 {
        start(&h, "600519", "domestic").await;
    }

    let listed = h.engine.list(USER, 2).await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn test_snapshot_serialization_hides_owner() {
    let h = harness(moutai_gateway());
    let id = start(&h, "600519", "domestic").await;
    let snapshot = h.engine.get(&id, USER).await.unwrap();

    let json = serde_json::to_value(&snapshot).unwrap();
    assert!(json.get("user_id").is_none());
    assert!(json.get("contact").is_none());
    assert_eq!(json["status"], "running");
    assert_eq!(json["market"], "domestic");
}
