//! Registry of article render units.
//!
//! Population and lookup are split into two types: [`RegistryBuilder`]
//! accepts registrations during the build pass, and [`RegistryBuilder::freeze`]
//! turns it into an immutable [`Registry`] that only supports reads. A frozen
//! registry is `Send + Sync` and can be shared across request handlers
//! without locking.

use std::collections::HashMap;

use crate::unit::ArticleRenderUnit;

/// Two units claimed the same routing path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Duplicate routing path {path}: {duplicate} conflicts with {existing}")]
pub struct DuplicatePathError {
    /// The contested routing path.
    pub path: String,
    /// Source of the unit registered first.
    pub existing: String,
    /// Source of the rejected unit.
    pub duplicate: String,
}

/// No unit is registered at the requested path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Page not found: {path}")]
pub struct NotFound {
    pub path: String,
}

/// Mutable registry used during the build pass.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    units: Vec<ArticleRenderUnit>,
    index: HashMap<String, usize>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit by its routing path.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicatePathError`] if the path is already registered.
    /// The builder is left unchanged in that case.
    pub fn register(&mut self, unit: ArticleRenderUnit) -> Result<(), DuplicatePathError> {
        if let Some(&idx) = self.index.get(unit.path()) {
            return Err(DuplicatePathError {
                path: unit.path().to_owned(),
                existing: self.units[idx].metadata().file_path_relative.clone(),
                duplicate: unit.metadata().file_path_relative.clone(),
            });
        }

        self.index.insert(unit.path().to_owned(), self.units.len());
        self.units.push(unit);
        Ok(())
    }

    /// Number of units registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Finish the build pass.
    #[must_use]
    pub fn freeze(self) -> Registry {
        Registry {
            units: self.units.into_boxed_slice(),
            index: self.index,
        }
    }
}

/// Frozen, read-only registry.
#[derive(Debug, Default)]
pub struct Registry {
    units: Box<[ArticleRenderUnit]>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Look up a unit by exact routing path.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no unit has this path.
    pub fn resolve(&self, path: &str) -> Result<&ArticleRenderUnit, NotFound> {
        self.index
            .get(path)
            .map(|&idx| &self.units[idx])
            .ok_or_else(|| NotFound {
                path: path.to_owned(),
            })
    }

    /// True if a unit is registered at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// All units in registration order.
    ///
    /// Every call starts a fresh enumeration.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &ArticleRenderUnit> + '_ {
        self.units.iter()
    }

    /// Routing paths in registration order.
    pub fn paths(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.units.iter().map(ArticleRenderUnit::path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
