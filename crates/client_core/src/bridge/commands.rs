//! Page commands queued from the shell to the controller runtime.

use shared::domain::{FilterForm, ItemId, RegionCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCommand {
    RegionChanged { region: RegionCode },
    SyncClicked { form: FilterForm },
    SaveClicked { item_id: ItemId },
    /// Stops the sync poll loop between polls.
    CancelSync,
    /// Page is going away: stop polling, finish outstanding handlers, exit.
    Teardown,
}

impl PageCommand {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegionChanged { .. } => "region_changed",
            Self::SyncClicked { .. } => "sync_clicked",
            Self::SaveClicked { .. } => "save_clicked",
            Self::CancelSync => "cancel_sync",
            Self::Teardown => "teardown",
        }
    }
}
