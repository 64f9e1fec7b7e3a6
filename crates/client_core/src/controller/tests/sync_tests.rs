use super::*;

use shared::{domain::SyncJobStatus, error::PortalError, protocol::SyncStarted};

use crate::{
    page::PageState,
    test_support::{drain, failed, finished, korean, running, sink, Call, ScriptedApi},
};

fn controller(api: Arc<ScriptedApi>, sink: PageEventSink, count_display: bool) -> SyncController {
    SyncController::new(api, sink, korean(), SyncTiming::default(), count_display)
}

fn page() -> PageState {
    PageState::new().with_sync_button(korean()).with_sync_count()
}

fn button_labels(events: &[PageEvent]) -> Vec<(bool, String)> {
    events
        .iter()
        .filter_map(|e| match e {
            PageEvent::SyncButtonChanged { enabled, label } => Some((*enabled, label.clone())),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn full_sync_reports_progress_then_reloads() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(1), Some(4), 10))));
    api.push_status(Ok(ApiOutcome::Ok(finished(40))));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, true);
    let form = FilterForm::new().with_field("region", "6110000");

    let started = tokio::time::Instant::now();
    let outcome = sync.run(form.clone()).await;
    assert_eq!(outcome, SyncOutcome::Completed { fetched: 40 });
    assert_eq!(sync.phase(), SyncPhase::Completed);

    let events = drain(&mut rx);
    assert_eq!(
        button_labels(&events),
        vec![
            (false, "동기화 중...".to_string()),
            (false, "동기화 중... 25%".to_string()),
            (false, "40건 완료!".to_string()),
        ]
    );
    assert_eq!(events.last(), Some(&PageEvent::ReloadRequested));

    let mut page = page();
    page.apply_all(&events);
    assert_eq!(page.sync_count.as_deref(), Some("10"));
    assert!(page.reload_requested);
    assert!(page.alerts.is_empty());

    assert_eq!(api.calls()[0], Call::StartSync(form));
    // one poll interval plus the reload delay
    assert_eq!(started.elapsed(), Duration::from_millis(3_000));
}

#[tokio::test(start_paused = true)]
async fn reload_follows_completion_label_after_delay() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(finished(7))));
    let (sink, mut rx) = sink();
    let sync = Arc::new(controller(api.clone(), sink, false));

    let handle = sync.spawn(FilterForm::new());
    tokio::time::sleep(Duration::from_millis(999)).await;
    let early = drain(&mut rx);
    assert_eq!(
        button_labels(&early).last(),
        Some(&(false, "7건 완료!".to_string()))
    );
    assert!(!early.contains(&PageEvent::ReloadRequested));

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(drain(&mut rx), vec![PageEvent::ReloadRequested]);
    assert_eq!(
        handle.await.expect("join"),
        SyncOutcome::Completed { fetched: 7 }
    );
}

#[tokio::test(start_paused = true)]
async fn polls_are_spaced_after_each_response_and_never_overlap() {
    let api = ScriptedApi::new()
        .with_status_latency(Duration::from_millis(300))
        .into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    for page in 1..=3 {
        api.push_status(Ok(ApiOutcome::Ok(running(Some(page), Some(4), page * 10))));
    }
    api.push_status(Ok(ApiOutcome::Ok(finished(40))));
    let (sink, _rx) = sink();
    let sync = controller(api.clone(), sink, true);

    sync.run(FilterForm::new()).await;

    assert_eq!(api.status_requests(), 4);
    assert_eq!(api.max_status_in_flight(), 1);

    let timed = api.timed_calls();
    let resolved: Vec<_> = timed
        .iter()
        .filter(|(_, c)| *c == Call::StatusResolved)
        .map(|(at, _)| *at)
        .collect();
    let requested: Vec<_> = timed
        .iter()
        .filter(|(_, c)| *c == Call::StatusRequested)
        .map(|(at, _)| *at)
        .collect();
    for (prev_resolved, next_request) in resolved.iter().zip(requested.iter().skip(1)) {
        assert_eq!(
            next_request.duration_since(*prev_resolved),
            Duration::from_millis(2_000)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn rejected_start_alerts_and_never_polls() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Failed("locked".into())));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, true);

    let outcome = sync.run(FilterForm::new()).await;
    assert_eq!(
        outcome,
        SyncOutcome::Rejected {
            message: "locked".into()
        }
    );
    assert_eq!(sync.phase(), SyncPhase::Idle);
    assert_eq!(api.status_requests(), 0);

    let mut page = page();
    page.apply_all(&drain(&mut rx));
    assert_eq!(page.alerts, vec!["locked".to_string()]);
    let button = page.sync_button.expect("button");
    assert!(button.enabled);
    assert_eq!(button.label, "동기화");
}

#[tokio::test(start_paused = true)]
async fn start_transport_failure_re_enables_button() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Err(PortalError::transport(
        shared::protocol::SYNC_START_PATH,
        "connection refused",
    )));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, true);

    let outcome = sync.run(FilterForm::new()).await;
    assert!(matches!(outcome, SyncOutcome::Failed { .. }), "{outcome:?}");
    assert_eq!(api.status_requests(), 0);

    let mut page = page();
    page.apply_all(&drain(&mut rx));
    assert_eq!(page.alerts.len(), 1);
    assert!(page.alerts[0].contains("connection refused"));
    assert!(page.sync_button.expect("button").enabled);
}

#[tokio::test(start_paused = true)]
async fn job_error_alerts_with_prefix() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(1), Some(2), 5))));
    api.push_status(Ok(ApiOutcome::Ok(failed(5, "upstream timeout"))));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, true);

    let outcome = sync.run(FilterForm::new()).await;
    assert_eq!(
        outcome,
        SyncOutcome::Failed {
            message: "upstream timeout".into()
        }
    );
    assert_eq!(sync.phase(), SyncPhase::Idle);

    let mut page = page();
    page.apply_all(&drain(&mut rx));
    assert_eq!(page.alerts, vec!["동기화 오류: upstream timeout".to_string()]);
    let button = page.sync_button.expect("button");
    assert!(button.enabled);
    assert_eq!(button.label, "동기화");
    assert!(!page.reload_requested);
}

#[tokio::test(start_paused = true)]
async fn transport_failure_while_polling_ends_sync() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(1), Some(3), 1))));
    api.push_status(Err(PortalError::Status {
        endpoint: shared::protocol::SYNC_STATUS_PATH.into(),
        status: 502,
    }));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(2), Some(3), 2))));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, true);

    let outcome = sync.run(FilterForm::new()).await;
    assert!(matches!(outcome, SyncOutcome::Failed { .. }), "{outcome:?}");
    assert_eq!(api.status_requests(), 2);

    let mut page = page();
    page.apply_all(&drain(&mut rx));
    assert_eq!(page.alerts.len(), 1);
    assert!(page.alerts[0].starts_with("동기화 오류: "));
    assert!(page.sync_button.expect("button").enabled);
}

#[tokio::test(start_paused = true)]
async fn missing_total_pages_reports_zero_percent() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(3), None, 12))));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(3), Some(0), 12))));
    api.push_status(Ok(ApiOutcome::Ok(finished(12))));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, false);

    sync.run(FilterForm::new()).await;

    let events = drain(&mut rx);
    let labels = button_labels(&events);
    assert_eq!(labels[1].1, "동기화 중... 0%");
    assert_eq!(labels[2].1, "동기화 중... 0%");
    assert!(!events
        .iter()
        .any(|e| matches!(e, PageEvent::SyncCountChanged { .. })));
}

#[tokio::test(start_paused = true)]
async fn cancel_between_polls_stops_the_loop() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    for page in 1..=10 {
        api.push_status(Ok(ApiOutcome::Ok(running(Some(page), Some(10), page))));
    }
    let (sink, mut rx) = sink();
    let sync = Arc::new(controller(api.clone(), sink, true));

    let handle = sync.spawn(FilterForm::new());
    tokio::time::sleep(Duration::from_millis(3_000)).await;
    assert_eq!(sync.phase(), SyncPhase::Polling);
    sync.cancel();

    assert_eq!(handle.await.expect("join"), SyncOutcome::Cancelled);
    assert_eq!(sync.phase(), SyncPhase::Idle);
    assert_eq!(api.status_requests(), 2);

    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(api.status_requests(), 2);

    let mut page = page();
    page.apply_all(&drain(&mut rx));
    let button = page.sync_button.expect("button");
    assert!(button.enabled);
    assert_eq!(button.label, "동기화");
    assert!(page.alerts.is_empty());
}

#[tokio::test(start_paused = true)]
async fn error_text_on_running_snapshot_keeps_polling() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(SyncJobStatus {
        error: Some("page 2 retry".into()),
        ..running(Some(2), Some(4), 20)
    })));
    api.push_status(Ok(ApiOutcome::Ok(finished(40))));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, true);

    let outcome = sync.run(FilterForm::new()).await;
    assert_eq!(outcome, SyncOutcome::Completed { fetched: 40 });
    assert_eq!(api.status_requests(), 2);

    let mut page = page();
    page.apply_all(&drain(&mut rx));
    assert!(page.alerts.is_empty());
    assert!(page.reload_requested);
    assert_eq!(page.sync_count.as_deref(), Some("20"));
}

#[tokio::test(start_paused = true)]
async fn click_after_shutdown_sends_nothing() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(finished(1))));
    let (sink, mut rx) = sink();
    let sync = controller(api.clone(), sink, true);

    sync.shutdown();
    assert!(sync.is_shut_down());
    assert_eq!(sync.run(FilterForm::new()).await, SyncOutcome::Cancelled);
    assert_eq!(sync.phase(), SyncPhase::Idle);
    assert!(api.calls().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_reload_delay_suppresses_reload() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(finished(1))));
    let (sink, mut rx) = sink();
    let sync = Arc::new(controller(api.clone(), sink, true));

    let handle = sync.spawn(FilterForm::new());
    tokio::time::sleep(Duration::from_millis(10)).await;
    sync.shutdown();

    assert_eq!(handle.await.expect("join"), SyncOutcome::Completed { fetched: 1 });
    assert!(!drain(&mut rx).contains(&PageEvent::ReloadRequested));
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_does_not_block_the_next_click() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(1), Some(2), 1))));
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(finished(2))));
    let (sink, _rx) = sink();
    let sync = Arc::new(controller(api.clone(), sink, false));

    let first = sync.spawn(FilterForm::new());
    tokio::time::sleep(Duration::from_millis(500)).await;
    sync.cancel();
    assert_eq!(first.await.expect("join"), SyncOutcome::Cancelled);

    assert_eq!(
        sync.run(FilterForm::new()).await,
        SyncOutcome::Completed { fetched: 2 }
    );
    assert_eq!(api.count(|c| matches!(c, Call::StartSync(_))), 2);
}

#[tokio::test(start_paused = true)]
async fn second_click_while_running_is_ignored() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(running(Some(1), Some(2), 1))));
    api.push_status(Ok(ApiOutcome::Ok(finished(2))));
    let (sink, _rx) = sink();
    let sync = Arc::new(controller(api.clone(), sink, false));

    let first = sync.spawn(FilterForm::new());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sync.run(FilterForm::new()).await, SyncOutcome::Ignored);

    assert_eq!(first.await.expect("join"), SyncOutcome::Completed { fetched: 2 });
    assert_eq!(api.count(|c| matches!(c, Call::StartSync(_))), 1);
    // the page reloads after completion; further clicks stay ignored
    assert_eq!(sync.run(FilterForm::new()).await, SyncOutcome::Ignored);
}

#[tokio::test(start_paused = true)]
async fn idle_again_after_failure_accepts_new_click() {
    let api = ScriptedApi::new().into_arc();
    api.push_start(Ok(ApiOutcome::Failed("locked".into())));
    api.push_start(Ok(ApiOutcome::Ok(SyncStarted)));
    api.push_status(Ok(ApiOutcome::Ok(finished(3))));
    let (sink, _rx) = sink();
    let sync = controller(api.clone(), sink, false);

    assert!(matches!(
        sync.run(FilterForm::new()).await,
        SyncOutcome::Rejected { .. }
    ));
    assert_eq!(
        sync.run(FilterForm::new()).await,
        SyncOutcome::Completed { fetched: 3 }
    );
}

#[test]
fn timing_follows_settings() {
    let settings = Settings {
        poll_interval_ms: 250,
        reload_delay_ms: 10,
        ..Settings::default()
    };
    let timing = SyncTiming::from_settings(&settings);
    assert_eq!(timing.poll_interval, Duration::from_millis(250));
    assert_eq!(timing.reload_delay, Duration::from_millis(10));
    assert_eq!(
        SyncTiming::default().poll_interval,
        Duration::from_millis(2_000)
    );
}
