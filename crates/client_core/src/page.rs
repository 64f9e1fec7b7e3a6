//! In-memory model of the portal page the controllers patch.

use shared::domain::{DistrictCode, FilterForm, ItemId, RegionCode, SaveState};

use crate::{controller::events::PageEvent, labels::Labels};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectState {
    pub options: Vec<SelectOption>,
    pub value: String,
    /// Code the server rendered as selected before any reload.
    pub selected_marker: Option<DistrictCode>,
}

impl SelectState {
    pub fn option_values(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.value.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveButtonState {
    pub item_id: ItemId,
    pub saved: SaveState,
    pub label: String,
}

/// What the controllers are allowed to read from the page at attach time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAnchors {
    pub region: Option<RegionCode>,
    pub district: Option<Option<DistrictCode>>,
    pub sync_button: bool,
    pub sync_count: bool,
    pub save_button: Option<(ItemId, SaveState)>,
}

impl PageAnchors {
    pub fn has_district_pair(&self) -> bool {
        self.region.is_some() && self.district.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    pub region: Option<RegionCode>,
    pub district: Option<SelectState>,
    pub filter_form: FilterForm,
    pub sync_button: Option<ButtonState>,
    pub sync_count: Option<String>,
    pub save_button: Option<SaveButtonState>,
    pub alerts: Vec<String>,
    pub reload_requested: bool,
}

impl PageState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region_select(mut self, region: impl Into<String>) -> Self {
        self.region = Some(RegionCode::new(region));
        self
    }

    pub fn with_district_select(mut self, labels: Labels, marker: Option<DistrictCode>) -> Self {
        self.district = Some(SelectState {
            options: vec![sentinel_option(labels.district_sentinel())],
            value: String::new(),
            selected_marker: marker,
        });
        self
    }

    pub fn with_filter_form(mut self, form: FilterForm) -> Self {
        self.filter_form = form;
        self
    }

    pub fn with_sync_button(mut self, labels: Labels) -> Self {
        self.sync_button = Some(ButtonState {
            enabled: true,
            label: labels.sync_idle().to_string(),
        });
        self
    }

    pub fn with_sync_count(mut self) -> Self {
        self.sync_count = Some(String::new());
        self
    }

    pub fn with_save_button(mut self, labels: Labels, item_id: ItemId, saved: SaveState) -> Self {
        self.save_button = Some(SaveButtonState {
            item_id,
            saved,
            label: labels.save_label(saved).to_string(),
        });
        self
    }

    pub fn anchors(&self) -> PageAnchors {
        PageAnchors {
            region: self.region.clone(),
            district: self.district.as_ref().map(|d| d.selected_marker.clone()),
            sync_button: self.sync_button.is_some(),
            sync_count: self.sync_count.is_some(),
            save_button: self
                .save_button
                .as_ref()
                .map(|b| (b.item_id.clone(), b.saved)),
        }
    }

    /// Current filter values, with the region and district controls folded in.
    pub fn form_snapshot(&self) -> FilterForm {
        let mut form = self.filter_form.clone();
        if let Some(region) = &self.region {
            form.set("region", region.as_str());
        }
        if let Some(district) = &self.district {
            form.set("district", district.value.clone());
        }
        form
    }

    /// Patches targeting an element the page does not have are dropped.
    pub fn apply(&mut self, event: &PageEvent) {
        match event {
            PageEvent::DistrictOptionsReset { sentinel } => {
                if let Some(district) = &mut self.district {
                    district.options = vec![sentinel_option(sentinel)];
                    district.value.clear();
                }
            }
            PageEvent::DistrictOptionAppended { code, label } => {
                if let Some(district) = &mut self.district {
                    district.options.push(SelectOption {
                        value: code.as_str().to_string(),
                        label: label.clone(),
                    });
                }
            }
            PageEvent::DistrictSelected { code } => {
                if let Some(district) = &mut self.district {
                    if district.options.iter().any(|o| o.value == code.as_str()) {
                        district.value = code.as_str().to_string();
                    }
                }
            }
            PageEvent::SyncButtonChanged { enabled, label } => {
                if let Some(button) = &mut self.sync_button {
                    button.enabled = *enabled;
                    button.label.clone_from(label);
                }
            }
            PageEvent::SyncCountChanged { fetched } => {
                if let Some(count) = &mut self.sync_count {
                    *count = fetched.to_string();
                }
            }
            PageEvent::SaveButtonChanged {
                item_id,
                saved,
                label,
            } => {
                if let Some(button) = &mut self.save_button {
                    if button.item_id == *item_id {
                        button.saved = *saved;
                        button.label.clone_from(label);
                    }
                }
            }
            PageEvent::Alert { message } => self.alerts.push(message.clone()),
            PageEvent::ReloadRequested => self.reload_requested = true,
        }
    }

    pub fn apply_all<'a>(&mut self, events: impl IntoIterator<Item = &'a PageEvent>) {
        for event in events {
            self.apply(event);
        }
    }
}

fn sentinel_option(label: &str) -> SelectOption {
    SelectOption {
        value: String::new(),
        label: label.to_string(),
    }
}
