//! Include/exclude predicate over file names.
//!
//! A [`FilterSpec`] holds three sub-filters, each a list of lowercased
//! strings:
//!
//! | Sub-filter   | Satisfied when the name…          |
//! |--------------|-----------------------------------|
//! | `extensions` | ends with any entry               |
//! | `names`      | starts with any entry             |
//! | `full_names` | equals any entry                  |
//!
//! An empty list is always satisfied. In [`FilterMode::Include`] a name
//! matches when every sub-filter is satisfied; [`FilterMode::Exclude`]
//! negates that. With all three lists empty every name matches in both
//! modes.

use serde::Deserialize;

/// Whether a [`FilterSpec`] keeps or drops the names it describes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub extensions: Vec<String>,
    pub names: Vec<String>,
    pub full_names: Vec<String>,
    pub mode: FilterMode,
}

impl FilterSpec {
    /// Build a spec from raw comma-separated lists, as typed by a user.
    pub fn from_lists(extensions: &str, names: &str, full_names: &str, mode: FilterMode) -> Self {
        Self {
            extensions: parse_list(extensions),
            names: parse_list(names),
            full_names: parse_list(full_names),
            mode,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.names.is_empty() && self.full_names.is_empty()
    }

    /// Evaluate the predicate for a bare file name (not a path).
    pub fn matches(&self, file_name: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        let lower = file_name.to_lowercase();

        let matches_ext =
            self.extensions.is_empty() || self.extensions.iter().any(|e| lower.ends_with(e));
        let matches_name =
            self.names.is_empty() || self.names.iter().any(|n| lower.starts_with(n));
        let matches_full = self.full_names.is_empty() || self.full_names.iter().any(|f| lower == *f);

        let all = matches_ext && matches_name && matches_full;
        match self.mode {
            FilterMode::Include => all,
            FilterMode::Exclude => !all,
        }
    }
}

/// Split a comma-separated list, trimming and lowercasing entries and
/// dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
