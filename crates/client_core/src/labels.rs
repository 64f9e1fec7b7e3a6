//! Visible strings of the portal page controls.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use shared::domain::SaveState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "ko")]
    Korean,
    #[serde(rename = "en")]
    English,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ko" | "ko-kr" | "korean" => Ok(Self::Korean),
            "en" | "en-us" | "english" => Ok(Self::English),
            other => Err(format!("unsupported locale '{other}' (expected ko or en)")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Korean => f.write_str("ko"),
            Self::English => f.write_str("en"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Labels {
    locale: Locale,
}

impl Labels {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    /// Label of the empty-valued first option of the district select.
    pub fn district_sentinel(&self) -> &'static str {
        match self.locale {
            Locale::Korean => "전체",
            Locale::English => "All",
        }
    }

    pub fn sync_idle(&self) -> &'static str {
        match self.locale {
            Locale::Korean => "동기화",
            Locale::English => "Sync",
        }
    }

    pub fn sync_starting(&self) -> &'static str {
        match self.locale {
            Locale::Korean => "동기화 중...",
            Locale::English => "Syncing...",
        }
    }

    pub fn sync_progress(&self, percent: u64) -> String {
        format!("{} {percent}%", self.sync_starting())
    }

    pub fn sync_done(&self, fetched: u64) -> String {
        match self.locale {
            Locale::Korean => format!("{fetched}건 완료!"),
            Locale::English => format!("{fetched} done!"),
        }
    }

    pub fn sync_error(&self, message: &str) -> String {
        match self.locale {
            Locale::Korean => format!("동기화 오류: {message}"),
            Locale::English => format!("Sync error: {message}"),
        }
    }

    pub fn save_label(&self, state: SaveState) -> &'static str {
        match (self.locale, state.is_saved()) {
            (Locale::Korean, true) => "저장됨",
            (Locale::Korean, false) => "저장하기",
            (Locale::English, true) => "Saved",
            (Locale::English, false) => "Save",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_labels_match_portal_strings() {
        let labels = Labels::new(Locale::Korean);
        assert_eq!(labels.sync_progress(25), "동기화 중... 25%");
        assert_eq!(labels.sync_done(40), "40건 완료!");
        assert_eq!(labels.sync_error("locked"), "동기화 오류: locked");
        assert_eq!(labels.save_label(SaveState(true)), "저장됨");
        assert_eq!(labels.save_label(SaveState(false)), "저장하기");
    }

    #[test]
    fn english_labels() {
        let labels = Labels::new(Locale::English);
        assert_eq!(labels.district_sentinel(), "All");
        assert_eq!(labels.sync_progress(0), "Syncing... 0%");
        assert_eq!(labels.sync_done(3), "3 done!");
    }

    #[test]
    fn locale_parses_common_spellings() {
        assert_eq!("KO".parse::<Locale>(), Ok(Locale::Korean));
        assert_eq!("en-US".parse::<Locale>(), Ok(Locale::English));
        assert!("fr".parse::<Locale>().is_err());
    }
}
