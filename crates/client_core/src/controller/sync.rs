//! Start/poll/finish lifecycle of the server-side bulk sync job.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use shared::{
    domain::{FilterForm, SyncJobPhase},
    protocol::ApiOutcome,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Settings,
    controller::events::{PageEvent, PageEventSink},
    labels::Labels,
    PortalApi,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTiming {
    /// Delay between a status response and the next status request.
    pub poll_interval: Duration,
    /// Delay between the completion label and the reload request.
    pub reload_delay: Duration,
}

impl Default for SyncTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2_000),
            reload_delay: Duration::from_millis(1_000),
        }
    }
}

impl SyncTiming {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            reload_delay: settings.reload_delay(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Starting,
    Polling,
    /// Terminal; the page is about to reload.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed { fetched: u64 },
    /// The start request came back with an `error` field.
    Rejected { message: String },
    Failed { message: String },
    Cancelled,
    /// Clicked while a sync was already under way.
    Ignored,
}

pub struct SyncController {
    api: Arc<dyn PortalApi>,
    sink: PageEventSink,
    labels: Labels,
    timing: SyncTiming,
    count_display: bool,
    phase: Mutex<SyncPhase>,
    /// Page lifetime. Once cancelled no run starts or continues.
    shutdown: CancellationToken,
    /// Child of `shutdown` for the run in flight.
    current: Mutex<CancellationToken>,
}

impl SyncController {
    pub fn new(
        api: Arc<dyn PortalApi>,
        sink: PageEventSink,
        labels: Labels,
        timing: SyncTiming,
        count_display: bool,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let current = Mutex::new(shutdown.child_token());
        Self {
            api,
            sink,
            labels,
            timing,
            count_display,
            phase: Mutex::new(SyncPhase::Idle),
            shutdown,
            current,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stops the run in flight at its next await point. An in-flight request is
    /// not aborted. A later click starts a new run.
    pub fn cancel(&self) {
        if self.phase() != SyncPhase::Idle {
            info!("sync cancel requested");
        }
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Page teardown: stops any run and keeps every later click from starting one,
    /// including clicks already queued ahead of the teardown.
    pub fn shutdown(&self) {
        info!(phase = ?self.phase(), "sync controller shut down");
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn spawn(self: &Arc<Self>, form: FilterForm) -> JoinHandle<SyncOutcome> {
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.run(form).await })
    }

    pub async fn run(&self, form: FilterForm) -> SyncOutcome {
        if !self.try_begin() {
            debug!(phase = ?self.phase(), "sync click ignored; job already under way");
            return SyncOutcome::Ignored;
        }
        if self.shutdown.is_cancelled() {
            debug!("sync click after teardown; nothing sent");
            self.set_phase(SyncPhase::Idle);
            return SyncOutcome::Cancelled;
        }
        let stop = self.shutdown.child_token();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = stop.clone();

        self.sink.emit(PageEvent::SyncButtonChanged {
            enabled: false,
            label: self.labels.sync_starting().to_string(),
        });
        info!(fields = form.fields().count(), "starting sync");

        match self.api.start_sync(&form).await {
            Ok(ApiOutcome::Ok(_)) => {}
            Ok(ApiOutcome::Failed(message)) => {
                warn!(%message, "sync start rejected");
                self.fail(message.clone());
                return SyncOutcome::Rejected { message };
            }
            Err(err) => {
                warn!(error = %err, "sync start failed");
                let message = err.user_message();
                self.fail(message.clone());
                return SyncOutcome::Failed { message };
            }
        }

        if stop.is_cancelled() {
            return self.cancelled();
        }
        self.set_phase(SyncPhase::Polling);
        self.poll(&stop).await
    }

    async fn poll(&self, stop: &CancellationToken) -> SyncOutcome {
        loop {
            let status = match self.api.sync_status().await {
                Ok(ApiOutcome::Ok(status)) => status,
                Ok(ApiOutcome::Failed(message)) => return self.poll_failed(message),
                Err(err) => {
                    warn!(error = %err, "sync status request failed");
                    return self.poll_failed(err.user_message());
                }
            };

            match status.phase() {
                SyncJobPhase::Running => {
                    let percent = status.progress_percent();
                    debug!(percent, fetched = status.fetched, "sync progress");
                    self.sink.emit(PageEvent::SyncButtonChanged {
                        enabled: false,
                        label: self.labels.sync_progress(percent),
                    });
                    if self.count_display {
                        self.sink.emit(PageEvent::SyncCountChanged {
                            fetched: status.fetched,
                        });
                    }
                    if !sleep_unless_cancelled(stop, self.timing.poll_interval).await {
                        return self.cancelled();
                    }
                }
                SyncJobPhase::Failed(message) => return self.poll_failed(message),
                SyncJobPhase::Completed => return self.complete(stop, status.fetched).await,
            }
        }
    }

    async fn complete(&self, stop: &CancellationToken, fetched: u64) -> SyncOutcome {
        self.set_phase(SyncPhase::Completed);
        info!(fetched, "sync completed");
        self.sink.emit(PageEvent::SyncButtonChanged {
            enabled: false,
            label: self.labels.sync_done(fetched),
        });
        if sleep_unless_cancelled(stop, self.timing.reload_delay).await {
            self.sink.emit(PageEvent::ReloadRequested);
        } else {
            debug!("page torn down before reload");
        }
        SyncOutcome::Completed { fetched }
    }

    fn poll_failed(&self, message: String) -> SyncOutcome {
        warn!(%message, "sync job failed");
        self.fail(self.labels.sync_error(&message));
        SyncOutcome::Failed { message }
    }

    fn cancelled(&self) -> SyncOutcome {
        info!("sync polling stopped");
        self.reset_button();
        SyncOutcome::Cancelled
    }

    fn fail(&self, alert: String) {
        self.sink.emit(PageEvent::Alert { message: alert });
        self.reset_button();
    }

    fn reset_button(&self) {
        self.sink.emit(PageEvent::SyncButtonChanged {
            enabled: true,
            label: self.labels.sync_idle().to_string(),
        });
        self.set_phase(SyncPhase::Idle);
    }

    fn try_begin(&self) -> bool {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        if *phase != SyncPhase::Idle {
            return false;
        }
        *phase = SyncPhase::Starting;
        true
    }

    fn set_phase(&self, next: SyncPhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// Returns `false` if `stop` was cancelled before `period` elapsed.
async fn sleep_unless_cancelled(stop: &CancellationToken, period: Duration) -> bool {
    tokio::select! {
        biased;
        () = stop.cancelled() => false,
        () = tokio::time::sleep(period) => true,
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
