use std::sync::Arc;

use shared::{
    domain::{ItemId, SaveState},
    error::PortalError,
    protocol::ApiOutcome,
};
use tracing::{debug, warn};

use crate::{
    controller::events::{PageEvent, PageEventSink},
    labels::Labels,
    PortalApi,
};

/// One toggle request per click. Responses are applied in arrival order.
pub struct SaveToggle {
    api: Arc<dyn PortalApi>,
    sink: PageEventSink,
    labels: Labels,
}

impl SaveToggle {
    pub fn new(api: Arc<dyn PortalApi>, sink: PageEventSink, labels: Labels) -> Self {
        Self { api, sink, labels }
    }

    pub async fn click(&self, item: &ItemId) -> Result<SaveState, PortalError> {
        if item.is_empty() {
            warn!("save clicked on a control without an item id");
            return Err(PortalError::InvalidRequest {
                reason: "save control carries no item id".into(),
            });
        }

        let result = self
            .api
            .toggle_save(item)
            .await
            .and_then(ApiOutcome::into_result);
        match result {
            Ok(saved) => {
                debug!(item = %item, saved = saved.is_saved(), "save state confirmed");
                self.sink.emit(PageEvent::SaveButtonChanged {
                    item_id: item.clone(),
                    saved,
                    label: self.labels.save_label(saved).to_string(),
                });
                Ok(saved)
            }
            Err(err) => {
                warn!(item = %item, error = %err, "save toggle failed");
                self.sink.emit(PageEvent::Alert {
                    message: err.user_message(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/save_toggle_tests.rs"]
mod tests;
