//! Content plugins applied to Markdown before rendering.
//!
//! Plugins are plain source-to-source transforms. The pipeline is assembled
//! once per build from [`PluginConfig`] and shared read-only by all worker
//! threads.

mod include;
mod plantuml;

use std::ops::Range;
use std::path::Path;

use kb_config::PluginConfig;
use pulldown_cmark::{Event, Parser, Tag};

use crate::article::ArticleError;
use crate::markdown::parser_options;

pub use include::IncludePlugin;
pub use plantuml::{PlantUmlPlugin, encode_plantuml};

/// Document being processed.
#[derive(Clone, Copy, Debug)]
pub struct DocumentContext<'a> {
    /// Root of the Markdown sources.
    pub source_dir: &'a Path,
    /// Absolute path of the file being processed.
    pub file: &'a Path,
}

/// Source-to-source Markdown transform.
pub trait ContentPlugin: Send + Sync {
    /// Plugin name used in logs.
    fn name(&self) -> &'static str;

    /// Transform `content`.
    ///
    /// Recoverable problems (a missing include, say) are pushed to
    /// `warnings`; the affected directive is left as written.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be processed at all.
    fn process(
        &self,
        doc: &DocumentContext<'_>,
        content: &str,
        warnings: &mut Vec<String>,
    ) -> Result<String, ArticleError>;
}

/// Ordered list of enabled plugins.
#[derive(Default)]
pub struct PluginPipeline {
    plugins: Vec<Box<dyn ContentPlugin>>,
}

impl PluginPipeline {
    /// Build the pipeline for a plugin configuration.
    ///
    /// Includes run first so that included files can contain diagrams.
    #[must_use]
    pub fn from_config(config: &PluginConfig) -> Self {
        let mut pipeline = Self::default();
        if config.include_enabled() {
            pipeline = pipeline.with_plugin(IncludePlugin);
        }
        if config.plantuml_enabled() {
            pipeline = pipeline.with_plugin(PlantUmlPlugin::new(config.plantuml_server()));
        }
        pipeline
    }

    /// Append a plugin.
    #[must_use]
    pub fn with_plugin<P: ContentPlugin + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Names of the enabled plugins, in run order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.plugins.iter().map(|p| p.name())
    }

    /// Run every plugin over `content`.
    ///
    /// # Errors
    ///
    /// Returns the first plugin error.
    pub fn run(
        &self,
        doc: &DocumentContext<'_>,
        content: &str,
        warnings: &mut Vec<String>,
    ) -> Result<String, ArticleError> {
        let mut current = content.to_owned();
        for plugin in &self.plugins {
            current = plugin.process(doc, &current, warnings)?;
        }
        Ok(current)
    }
}

/// Byte ranges of the code blocks in `content`, fences included.
pub(crate) fn code_block_ranges(content: &str) -> Vec<Range<usize>> {
    Parser::new_ext(content, parser_options())
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Start(Tag::CodeBlock(_)) => Some(range),
            _ => None,
        })
        .collect()
}

/// The code block `pos` lies in, past its start.
///
/// A match starting exactly at a block start is the block itself.
pub(crate) fn enclosing_code_block(blocks: &[Range<usize>], pos: usize) -> Option<&Range<usize>> {
    blocks.iter().find(|block| block.start < pos && pos < block.end)
}
