//! Scripted in-memory backend for controller tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{DistrictCode, DistrictMap, FilterForm, ItemId, RegionCode, SaveState, SyncJobStatus},
    error::PortalError,
    protocol::{ApiOutcome, SyncStarted, DISTRICTS_PATH, SAVE_PATH, SYNC_START_PATH, SYNC_STATUS_PATH},
};
use tokio::{sync::mpsc, time::Instant};

use crate::{
    controller::events::{PageEvent, PageEventSink},
    labels::{Labels, Locale},
    PortalApi,
};

type Script<T> = Mutex<VecDeque<Result<ApiOutcome<T>, PortalError>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Districts(RegionCode),
    StartSync(FilterForm),
    StatusRequested,
    StatusResolved,
    Save(ItemId),
}

#[derive(Default)]
pub(crate) struct ScriptedApi {
    districts: Script<DistrictMap>,
    starts: Script<SyncStarted>,
    statuses: Script<SyncJobStatus>,
    saves: Script<SaveState>,
    status_latency: Duration,
    calls: Mutex<Vec<(Instant, Call)>>,
    status_in_flight: AtomicUsize,
    max_status_in_flight: AtomicUsize,
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_status_latency(mut self, latency: Duration) -> Self {
        self.status_latency = latency;
        self
    }

    pub(crate) fn push_districts(&self, reply: Result<ApiOutcome<DistrictMap>, PortalError>) {
        self.districts.lock().expect("script").push_back(reply);
    }

    pub(crate) fn push_start(&self, reply: Result<ApiOutcome<SyncStarted>, PortalError>) {
        self.starts.lock().expect("script").push_back(reply);
    }

    pub(crate) fn push_status(&self, reply: Result<ApiOutcome<SyncJobStatus>, PortalError>) {
        self.statuses.lock().expect("script").push_back(reply);
    }

    pub(crate) fn push_save(&self, reply: Result<ApiOutcome<SaveState>, PortalError>) {
        self.saves.lock().expect("script").push_back(reply);
    }

    pub(crate) fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .expect("calls")
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub(crate) fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().expect("calls").clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls
            .lock()
            .expect("calls")
            .iter()
            .filter(|(_, call)| pred(call))
            .count()
    }

    pub(crate) fn status_requests(&self) -> usize {
        self.count(|call| *call == Call::StatusRequested)
    }

    pub(crate) fn max_status_in_flight(&self) -> usize {
        self.max_status_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .expect("calls")
            .push((Instant::now(), call));
    }
}

fn next<T>(script: &Script<T>, endpoint: &str) -> Result<ApiOutcome<T>, PortalError> {
    script
        .lock()
        .expect("script")
        .pop_front()
        .unwrap_or_else(|| Err(PortalError::transport(endpoint, "script exhausted")))
}

#[async_trait]
impl PortalApi for ScriptedApi {
    async fn fetch_districts(
        &self,
        region: &RegionCode,
    ) -> Result<ApiOutcome<DistrictMap>, PortalError> {
        self.record(Call::Districts(region.clone()));
        next(&self.districts, DISTRICTS_PATH)
    }

    async fn start_sync(&self, form: &FilterForm) -> Result<ApiOutcome<SyncStarted>, PortalError> {
        self.record(Call::StartSync(form.clone()));
        next(&self.starts, SYNC_START_PATH)
    }

    async fn sync_status(&self) -> Result<ApiOutcome<SyncJobStatus>, PortalError> {
        self.record(Call::StatusRequested);
        let in_flight = self.status_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_status_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.status_latency.is_zero() {
            tokio::time::sleep(self.status_latency).await;
        }
        let reply = next(&self.statuses, SYNC_STATUS_PATH);
        self.status_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(Call::StatusResolved);
        reply
    }

    async fn toggle_save(&self, item: &ItemId) -> Result<ApiOutcome<SaveState>, PortalError> {
        self.record(Call::Save(item.clone()));
        next(&self.saves, SAVE_PATH)
    }
}

pub(crate) fn korean() -> Labels {
    Labels::new(Locale::Korean)
}

pub(crate) fn running(page: Option<u64>, total_pages: Option<u64>, fetched: u64) -> SyncJobStatus {
    SyncJobStatus {
        running: true,
        page,
        total_pages,
        fetched,
        error: None,
    }
}

pub(crate) fn finished(fetched: u64) -> SyncJobStatus {
    SyncJobStatus {
        running: false,
        fetched,
        ..SyncJobStatus::default()
    }
}

pub(crate) fn failed(fetched: u64, error: &str) -> SyncJobStatus {
    SyncJobStatus {
        running: false,
        fetched,
        error: Some(error.to_string()),
        ..SyncJobStatus::default()
    }
}

pub(crate) fn districts(entries: &[(&str, &str)]) -> DistrictMap {
    entries
        .iter()
        .map(|(code, label)| (DistrictCode::new(*code), label.to_string()))
        .collect()
}

pub(crate) fn sink() -> (PageEventSink, mpsc::UnboundedReceiver<PageEvent>) {
    PageEventSink::channel()
}

pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<PageEvent>) -> Vec<PageEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
