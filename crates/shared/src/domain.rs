use std::fmt;

use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer, Serialize,
};

macro_rules! code_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

code_newtype!(RegionCode);
code_newtype!(DistrictCode);
code_newtype!(ItemId);

/// District options for one region, in the order the server listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistrictMap {
    entries: Vec<(DistrictCode, String)>,
}

impl DistrictMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates replace the label but keep the first position,
    /// which is how a JSON object with repeated keys reads in the browser.
    pub fn insert(&mut self, code: DistrictCode, label: impl Into<String>) {
        let label = label.into();
        if let Some(existing) = self.entries.iter_mut().find(|(c, _)| *c == code) {
            existing.1 = label;
        } else {
            self.entries.push((code, label));
        }
    }

    pub fn contains(&self, code: &DistrictCode) -> bool {
        self.entries.iter().any(|(c, _)| c == code)
    }

    pub fn label(&self, code: &DistrictCode) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, label)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DistrictCode, &str)> {
        self.entries.iter().map(|(c, l)| (c, l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(DistrictCode, String)> for DistrictMap {
    fn from_iter<I: IntoIterator<Item = (DistrictCode, String)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (code, label) in iter {
            map.insert(code, label);
        }
        map
    }
}

impl<'de> Deserialize<'de> for DistrictMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DistrictMapVisitor;

        impl<'de> Visitor<'de> for DistrictMapVisitor {
            type Value = DistrictMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping district codes to labels")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = DistrictMap::new();
                while let Some((code, label)) = access.next_entry::<String, String>()? {
                    map.insert(DistrictCode(code), label);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(DistrictMapVisitor)
    }
}

/// Server-reported snapshot of the background sync job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJobStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u64>,
    #[serde(default)]
    pub fetched: u64,
    #[serde(
        default,
        deserialize_with = "deserialize_error",
        skip_serializing_if = "Option::is_none"
    )]
    pub error: Option<String>,
}

impl SyncJobStatus {
    /// `round(page / total_pages * 100)`, or 0 when `total_pages` is 0 or absent.
    pub fn progress_percent(&self) -> u64 {
        progress_percent(self.page.unwrap_or(0), self.total_pages.unwrap_or(0))
    }

    pub fn phase(&self) -> SyncJobPhase {
        if self.running {
            SyncJobPhase::Running
        } else if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            SyncJobPhase::Failed(error.to_string())
        } else {
            SyncJobPhase::Completed
        }
    }
}

/// Accepts any JSON value for `error`; falsy values read as no error.
fn deserialize_error<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(crate::protocol::error_text))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncJobPhase {
    Running,
    Completed,
    Failed(String),
}

pub fn progress_percent(page: u64, total_pages: u64) -> u64 {
    if total_pages == 0 {
        return 0;
    }
    (page as f64 / total_pages as f64 * 100.0).round() as u64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaveState(pub bool);

impl SaveState {
    pub fn is_saved(self) -> bool {
        self.0
    }

    /// Value written to the save control's saved-state attribute.
    pub fn attribute(self) -> &'static str {
        if self.0 {
            "1"
        } else {
            "0"
        }
    }

    pub fn from_attribute(raw: &str) -> Self {
        Self(raw.trim() == "1")
    }
}

pub const FILTER_FIELDS: &[&str] = &[
    "region",
    "district",
    "category",
    "activity_type",
    "target",
    "status",
    "date_start",
    "date_end",
    "keyword",
];

/// Fields of the search filter form, kept in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterForm {
    fields: Vec<(String, String)>,
}

impl FilterForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every portal filter field, empty, as an untouched form submits them.
    pub fn blank() -> Self {
        FILTER_FIELDS.iter().map(|name| (*name, "")).collect()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(field) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            field.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// `application/x-www-form-urlencoded` body, empty values included.
    pub fn to_urlencoded(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.fields {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FilterForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Self::new();
        for (name, value) in iter {
            form.set(name, value);
        }
        form
    }
}
