//! Article render units.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::metadata::ArticleMetadata;

/// Produces the markup of one article.
///
/// All content is baked at build time, so rendering takes no input.
pub trait Render: Send + Sync {
    /// Render the article body as HTML.
    fn render(&self) -> Cow<'_, str>;
}

/// Pre-rendered HTML.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticMarkup(pub String);

impl Render for StaticMarkup {
    fn render(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.0)
    }
}

/// Pairing of an article's metadata and its renderer.
///
/// Cloning is cheap; both halves are shared.
#[derive(Clone)]
pub struct ArticleRenderUnit {
    metadata: Arc<ArticleMetadata>,
    renderer: Arc<dyn Render>,
}

impl ArticleRenderUnit {
    /// Create a unit from metadata and a renderer.
    pub fn new(metadata: ArticleMetadata, renderer: impl Render + 'static) -> Self {
        Self {
            metadata: Arc::new(metadata),
            renderer: Arc::new(renderer),
        }
    }

    /// Create a unit with pre-rendered HTML.
    #[must_use]
    pub fn with_markup(metadata: ArticleMetadata, html: String) -> Self {
        Self::new(metadata, StaticMarkup(html))
    }

    /// Routing path of the unit.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.metadata.path
    }

    #[must_use]
    pub fn metadata(&self) -> &ArticleMetadata {
        &self.metadata
    }

    /// Render the article markup.
    #[must_use]
    pub fn render(&self) -> Cow<'_, str> {
        self.renderer.render()
    }
}

impl fmt::Debug for ArticleRenderUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleRenderUnit")
            .field("path", &self.metadata.path)
            .field("title", &self.metadata.title)
            .finish_non_exhaustive()
    }
}
