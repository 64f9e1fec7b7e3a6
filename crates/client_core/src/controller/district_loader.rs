//! Cascading region -> district select population.

use std::sync::Arc;

use shared::{
    domain::{DistrictCode, RegionCode},
    error::PortalError,
    protocol::ApiOutcome,
};
use tracing::{debug, warn};

use crate::{
    controller::events::{PageEvent, PageEventSink},
    labels::Labels,
    PortalApi,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistrictLoad {
    /// Blank region: list reset to the sentinel, nothing fetched.
    Cleared,
    Loaded {
        count: usize,
        restored: Option<DistrictCode>,
    },
    /// The server answered with an `error` field; the list stays at the sentinel.
    Rejected { message: String },
}

pub struct DistrictLoader {
    api: Arc<dyn PortalApi>,
    sink: PageEventSink,
    labels: Labels,
    previous_selection: Option<DistrictCode>,
}

impl DistrictLoader {
    pub fn new(
        api: Arc<dyn PortalApi>,
        sink: PageEventSink,
        labels: Labels,
        previous_selection: Option<DistrictCode>,
    ) -> Self {
        let previous_selection = previous_selection.filter(|code| !code.is_empty());
        Self {
            api,
            sink,
            labels,
            previous_selection,
        }
    }

    pub fn previous_selection(&self) -> Option<&DistrictCode> {
        self.previous_selection.as_ref()
    }

    /// Region the loader should fetch for on attach, if the page already has one.
    pub fn initial_region(region: Option<&RegionCode>) -> Option<RegionCode> {
        region.filter(|code| !code.is_empty()).cloned()
    }

    pub async fn region_changed(&self, region: &RegionCode) -> Result<DistrictLoad, PortalError> {
        self.sink.emit(PageEvent::DistrictOptionsReset {
            sentinel: self.labels.district_sentinel().to_string(),
        });
        if region.is_empty() {
            debug!("region cleared; district list reset");
            return Ok(DistrictLoad::Cleared);
        }

        let districts = match self.api.fetch_districts(region).await {
            Ok(ApiOutcome::Ok(districts)) => districts,
            Ok(ApiOutcome::Failed(message)) => {
                debug!(region = %region, %message, "district lookup rejected");
                return Ok(DistrictLoad::Rejected { message });
            }
            Err(err) => {
                warn!(region = %region, error = %err, "district lookup failed");
                return Err(err);
            }
        };

        for (code, label) in districts.iter() {
            self.sink.emit(PageEvent::DistrictOptionAppended {
                code: code.clone(),
                label: label.to_string(),
            });
        }

        let restored = self
            .previous_selection
            .as_ref()
            .filter(|code| districts.contains(code))
            .cloned();
        if let Some(code) = &restored {
            self.sink
                .emit(PageEvent::DistrictSelected { code: code.clone() });
        }

        debug!(
            region = %region,
            count = districts.len(),
            restored = restored.is_some(),
            "district list populated"
        );
        Ok(DistrictLoad::Loaded {
            count: districts.len(),
            restored,
        })
    }
}

#[cfg(test)]
#[path = "tests/district_loader_tests.rs"]
mod tests;
