//! Navigation tree built from the `navbar` configuration.
//!
//! Entries are validated recursively while converting from the raw TOML
//! shape: every entry needs a non-empty `text` and `link`, and links must be
//! unique within a sibling group. Sibling order is kept exactly as written.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Navigation entry as written in the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawNavEntry {
    text: Option<String>,
    link: Option<String>,
    icon: Option<String>,
    children: Option<Vec<RawNavEntry>>,
}

/// Validated navigation menu entry.
///
/// Serialized with the `text`/`link` keys used by the client-side router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEntry {
    /// Display label.
    #[serde(rename = "text")]
    pub label: String,
    /// Routing path the entry links to.
    #[serde(rename = "link")]
    pub path: String,
    /// Optional icon name passed through to the theme.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Child entries, in configuration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationEntry>,
}

impl NavigationEntry {
    /// Create a leaf entry.
    #[must_use]
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            icon: None,
            children: Vec::new(),
        }
    }

    /// Attach child entries.
    #[must_use]
    pub fn with_children(mut self, children: Vec<NavigationEntry>) -> Self {
        self.children = children;
        self
    }

    /// True if the entry groups other entries (a section index).
    #[must_use]
    pub fn is_section(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth-first, pre-order walk over this entry and all descendants.
    pub fn walk(&self) -> impl Iterator<Item = &NavigationEntry> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let entry = stack.pop()?;
            stack.extend(entry.children.iter().rev());
            Some(entry)
        })
    }
}

/// Walk every entry of a navigation forest in pre-order.
pub fn walk_all(entries: &[NavigationEntry]) -> impl Iterator<Item = &NavigationEntry> {
    entries.iter().flat_map(NavigationEntry::walk)
}

/// Validate raw entries and convert them into a navigation tree.
///
/// `field` is the configuration path of the sequence (e.g. `navbar`), used
/// to build error locations such as `navbar[1].children[0].link`.
pub(crate) fn build_navigation(
    raw: Vec<RawNavEntry>,
    field: &str,
) -> Result<Vec<NavigationEntry>, ConfigError> {
    let mut seen: HashMap<String, String> = HashMap::with_capacity(raw.len());
    let mut entries = Vec::with_capacity(raw.len());

    for (idx, item) in raw.into_iter().enumerate() {
        let location = format!("{field}[{idx}]");
        let label = require_text(item.text, &format!("{location}.text"))?;
        let path = require_text(item.link, &format!("{location}.link"))?;

        if let Some(first) = seen.get(&path) {
            return Err(ConfigError::DuplicateNavPath {
                path,
                first: first.clone(),
                second: location,
            });
        }
        seen.insert(path.clone(), location.clone());

        let children = match item.children {
            Some(children) => build_navigation(children, &format!("{location}.children"))?,
            None => Vec::new(),
        };

        entries.push(NavigationEntry {
            label,
            path,
            icon: item.icon.filter(|icon| !icon.is_empty()),
            children,
        });
    }

    Ok(entries)
}

fn require_text(value: Option<String>, field: &str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(ConfigError::invalid(field, "cannot be empty")),
        None => Err(ConfigError::invalid(field, "is required")),
    }
}
