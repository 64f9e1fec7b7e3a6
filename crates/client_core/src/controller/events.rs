//! Page patches emitted by controllers and the sink that carries them to the shell.

use shared::domain::{DistrictCode, ItemId, SaveState};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// Replace the district options with the sentinel alone.
    DistrictOptionsReset {
        sentinel: String,
    },
    DistrictOptionAppended {
        code: DistrictCode,
        label: String,
    },
    DistrictSelected {
        code: DistrictCode,
    },
    SyncButtonChanged {
        enabled: bool,
        label: String,
    },
    SyncCountChanged {
        fetched: u64,
    },
    SaveButtonChanged {
        item_id: ItemId,
        saved: SaveState,
        label: String,
    },
    /// Blocking user notification.
    Alert {
        message: String,
    },
    ReloadRequested,
}

impl PageEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DistrictOptionsReset { .. } => "district_options_reset",
            Self::DistrictOptionAppended { .. } => "district_option_appended",
            Self::DistrictSelected { .. } => "district_selected",
            Self::SyncButtonChanged { .. } => "sync_button_changed",
            Self::SyncCountChanged { .. } => "sync_count_changed",
            Self::SaveButtonChanged { .. } => "save_button_changed",
            Self::Alert { .. } => "alert",
            Self::ReloadRequested => "reload_requested",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageEventSink {
    tx: mpsc::UnboundedSender<PageEvent>,
}

impl PageEventSink {
    pub fn new(tx: mpsc::UnboundedSender<PageEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// A closed page drops the patch; the controller carries on.
    pub fn emit(&self, event: PageEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            tracing::debug!(event = name, "page closed; dropping page event");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
