//! Article render units, the render unit registry and the static build
//! pipeline.
//!
//! This crate provides:
//! - [`ArticleRenderUnit`]: rendered markup plus [`ArticleMetadata`] for one document
//! - [`RegistryBuilder`] / [`Registry`]: two-phase path → unit mapping
//! - [`SiteBuilder`]: scans sources, transforms them in parallel and freezes a [`Site`]
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use kb_config::Config;
//! use kb_site::SiteBuilder;
//!
//! let config = Config::load(None, None)?;
//! let out_dir = config.build.out_dir.clone();
//! let site = SiteBuilder::new(config).build()?;
//!
//! let unit = site.resolve("/article/lyeq7xvt/")?;
//! println!("{}", unit.metadata().title);
//!
//! site.write(&out_dir)?;
//! # Ok(())
//! # }
//! ```

mod article;
mod frontmatter;
mod git;
mod markdown;
mod metadata;
mod plugins;
mod reading_time;
mod registry;
mod routing;
mod scanner;
mod site;
mod unit;

pub use article::{ArticleError, ArticleTransformer, localized_date};
pub use frontmatter::{Frontmatter, FrontmatterValue};
pub use git::{GitHistory, HistoryProvider, NoHistory};
pub use markdown::{RenderedMarkdown, render as render_markdown, slugify};
pub use metadata::{ArticleMetadata, Contributor, GitInfo, Header, ReadingTime};
pub use plugins::{
    ContentPlugin, DocumentContext, IncludePlugin, PlantUmlPlugin, PluginPipeline,
    encode_plantuml,
};
pub use reading_time::{WORDS_PER_MINUTE, count_words, estimate as estimate_reading_time};
pub use registry::{DuplicatePathError, NotFound, Registry, RegistryBuilder};
pub use routing::{normalize_permalink, output_file, route_for_file};
pub use site::{BuildError, MANIFEST_FILENAME, PageBundle, Site, SiteBuilder, SiteManifest};
pub use unit::{ArticleRenderUnit, Render, StaticMarkup};
