//! Attach-time wiring of the page controllers and command dispatch from the shell.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    bridge::commands::PageCommand,
    controller::{
        district_loader::DistrictLoader,
        events::PageEventSink,
        save_toggle::SaveToggle,
        sync::{SyncController, SyncTiming},
    },
    labels::Labels,
    page::PageAnchors,
    PortalApi,
};

/// The controllers whose anchors exist on the page. Each is independent.
pub struct PageControllers {
    pub district: Option<Arc<DistrictLoader>>,
    pub sync: Option<Arc<SyncController>>,
    pub save: Option<Arc<SaveToggle>>,
    on_load: Option<PageCommand>,
}

impl PageControllers {
    pub fn attach(
        api: Arc<dyn PortalApi>,
        anchors: &PageAnchors,
        sink: PageEventSink,
        labels: Labels,
        timing: SyncTiming,
    ) -> Self {
        let (district, on_load) = match (&anchors.region, &anchors.district) {
            (Some(region), Some(marker)) => {
                let loader =
                    DistrictLoader::new(Arc::clone(&api), sink.clone(), labels, marker.clone());
                let on_load = DistrictLoader::initial_region(Some(region))
                    .map(|region| PageCommand::RegionChanged { region });
                (Some(Arc::new(loader)), on_load)
            }
            _ => (None, None),
        };

        let sync = anchors.sync_button.then(|| {
            Arc::new(SyncController::new(
                Arc::clone(&api),
                sink.clone(),
                labels,
                timing,
                anchors.sync_count,
            ))
        });

        let save = anchors
            .save_button
            .as_ref()
            .map(|_| Arc::new(SaveToggle::new(Arc::clone(&api), sink.clone(), labels)));

        tracing::debug!(
            district = district.is_some(),
            sync = sync.is_some(),
            save = save.is_some(),
            "page controllers attached"
        );
        Self {
            district,
            sync,
            save,
            on_load,
        }
    }

    /// Synthetic region change for a page rendered with a region already chosen.
    pub fn on_load(&self) -> Option<PageCommand> {
        self.on_load.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.district.is_none() && self.sync.is_none() && self.save.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("page command queue is full; please retry")]
    QueueFull,
    #[error("page controllers are no longer running")]
    Disconnected,
}

pub fn dispatch_page_command(
    cmd_tx: &mpsc::Sender<PageCommand>,
    cmd: PageCommand,
) -> Result<(), DispatchError> {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued page command");
            Ok(())
        }
        Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull),
        Err(TrySendError::Closed(_)) => Err(DispatchError::Disconnected),
    }
}

#[cfg(test)]
#[path = "tests/orchestration_tests.rs"]
mod tests;
