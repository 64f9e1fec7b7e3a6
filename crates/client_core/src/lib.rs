//! Page controllers for the volunteer portal: cascading district selects,
//! the background sync button and the save toggle.
//!
//! Controllers never touch a document directly. They call the backend through
//! [`PortalApi`] and describe every visible change as a
//! [`controller::events::PageEvent`], which the shell applies to its
//! [`page::PageState`].

use async_trait::async_trait;
use shared::{
    domain::{DistrictMap, FilterForm, ItemId, RegionCode, SaveState, SyncJobStatus},
    error::PortalError,
    protocol::{ApiOutcome, SyncStarted},
};

pub mod bridge;
pub mod config;
pub mod controller;
pub mod labels;
pub mod page;
pub mod transport;

pub use bridge::{commands::PageCommand, launch, PageOptions, PageSession, TeardownHandle};
pub use config::{load_settings, Settings};
pub use controller::{
    district_loader::{DistrictLoad, DistrictLoader},
    events::{PageEvent, PageEventSink},
    orchestration::{dispatch_page_command, DispatchError, PageControllers},
    save_toggle::SaveToggle,
    sync::{SyncController, SyncOutcome, SyncPhase, SyncTiming},
};
pub use labels::{Labels, Locale};
pub use page::{PageAnchors, PageState};
pub use transport::HttpPortalClient;

/// The four backend endpoints the page depends on.
///
/// `Ok(ApiOutcome::Failed(_))` is an application error reported by the server;
/// `Err(_)` means no usable response arrived.
#[async_trait]
pub trait PortalApi: Send + Sync {
    async fn fetch_districts(
        &self,
        region: &RegionCode,
    ) -> Result<ApiOutcome<DistrictMap>, PortalError>;

    async fn start_sync(&self, form: &FilterForm) -> Result<ApiOutcome<SyncStarted>, PortalError>;

    async fn sync_status(&self) -> Result<ApiOutcome<SyncJobStatus>, PortalError>;

    async fn toggle_save(&self, item: &ItemId) -> Result<ApiOutcome<SaveState>, PortalError>;
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
