//! Transformation of one source document into an [`ArticleRenderUnit`].

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::frontmatter::{self, Frontmatter};
use crate::git::{HistoryProvider, NoHistory};
use crate::markdown;
use crate::metadata::ArticleMetadata;
use crate::plugins::{DocumentContext, PluginPipeline};
use crate::reading_time;
use crate::routing;
use crate::unit::ArticleRenderUnit;

/// Error transforming a single document.
#[derive(Debug, thiserror::Error)]
pub enum ArticleError {
    /// A file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Frontmatter is not valid YAML.
    #[error("Invalid frontmatter: {0}")]
    Frontmatter(String),
    /// Frontmatter holds a value outside the supported kinds.
    #[error("Unsupported frontmatter value for '{key}': {reason}")]
    UnsupportedFrontmatter { key: String, reason: &'static str },
    /// Permalink cannot be used as a routing path.
    #[error("Invalid permalink '{permalink}'")]
    InvalidPermalink { permalink: String },
    /// A content plugin failed.
    #[error("Plugin {plugin} failed: {message}")]
    Plugin {
        plugin: &'static str,
        message: String,
    },
    /// Computed metadata violates an invariant.
    #[error("Invalid metadata: {0}")]
    Metadata(String),
}

/// Date formats accepted for frontmatter `date` and `createTime`.
const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];

/// Turns source documents into render units.
///
/// Holds only read-only state and is shared by all build workers.
pub struct ArticleTransformer {
    source_dir: PathBuf,
    lang: String,
    plugins: PluginPipeline,
    history: Arc<dyn HistoryProvider>,
}

impl ArticleTransformer {
    /// Create a transformer without plugins or history.
    pub fn new(source_dir: impl Into<PathBuf>, lang: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            lang: lang.into(),
            plugins: PluginPipeline::default(),
            history: Arc::new(NoHistory),
        }
    }

    /// Set the content plugins.
    #[must_use]
    pub fn with_plugins(mut self, plugins: PluginPipeline) -> Self {
        self.plugins = plugins;
        self
    }

    /// Set the revision history source.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn HistoryProvider>) -> Self {
        self.history = history;
        self
    }

    /// Read and transform a file under the source directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArticleError`] if the file cannot be read or transformed.
    pub fn transform_file(&self, relative: &Path) -> Result<ArticleRenderUnit, ArticleError> {
        let path = self.source_dir.join(relative);
        let source = std::fs::read_to_string(&path).map_err(|source| ArticleError::Io {
            path: path.clone(),
            source,
        })?;
        self.transform(relative, &source)
    }

    /// Transform document source.
    ///
    /// `relative` is the document path relative to the source directory.
    ///
    /// # Errors
    ///
    /// Returns [`ArticleError`] on invalid frontmatter, an invalid permalink
    /// or a plugin failure.
    pub fn transform(
        &self,
        relative: &Path,
        source: &str,
    ) -> Result<ArticleRenderUnit, ArticleError> {
        let file_path_relative = relative.to_string_lossy().replace('\\', "/");

        let (yaml, body) = frontmatter::split(source);
        let frontmatter = match yaml {
            Some(yaml) => frontmatter::parse(yaml)?,
            None => Frontmatter::new(),
        };

        let file = self.source_dir.join(relative);
        let doc = DocumentContext {
            source_dir: &self.source_dir,
            file: &file,
        };
        let mut warnings = Vec::new();
        let body = self.plugins.run(&doc, body, &mut warnings)?;
        for warning in &warnings {
            tracing::warn!(path = %file_path_relative, "{warning}");
        }

        let rendered = markdown::render(&body);

        let title = string_field(&frontmatter, "title")
            .map(str::to_owned)
            .or(rendered.title)
            .unwrap_or_else(|| fallback_title(relative));

        let path = match string_field(&frontmatter, "permalink") {
            Some(permalink) => routing::normalize_permalink(permalink)?,
            None => routing::route_for_file(relative),
        };

        let lang = string_field(&frontmatter, "lang").unwrap_or(self.lang.as_str()).to_owned();
        let git = self.history.history(relative);

        let date = ["date", "createTime"]
            .into_iter()
            .filter_map(|key| string_field(&frontmatter, key))
            .find_map(parse_date)
            .or_else(|| {
                git.created_time
                    .and_then(DateTime::from_timestamp_millis)
                    .map(|dt| dt.date_naive())
            });
        let localized_date = date.map(|d| localized_date(d, &lang));

        let metadata = ArticleMetadata {
            path,
            title,
            lang,
            frontmatter,
            headers: rendered.headers,
            git,
            reading_time: reading_time::estimate(&rendered.text),
            file_path_relative,
            localized_date,
        };
        metadata.validate().map_err(ArticleError::Metadata)?;

        tracing::debug!(
            path = %metadata.path,
            file = %metadata.file_path_relative,
            words = metadata.reading_time.words,
            "Transformed article"
        );

        Ok(ArticleRenderUnit::with_markup(metadata, rendered.html))
    }
}

fn string_field<'a>(frontmatter: &'a Frontmatter, key: &str) -> Option<&'a str> {
    frontmatter
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Title for documents without a frontmatter title or H1.
///
/// Index files are named after their directory.
fn fallback_title(relative: &Path) -> String {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem == "index" || stem.eq_ignore_ascii_case("readme") {
        relative
            .parent()
            .and_then(Path::file_name)
            .map_or_else(|| "Home".to_owned(), |s| s.to_string_lossy().into_owned())
    } else {
        stem
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })
}

/// Format a date for display in the given language.
#[must_use]
pub fn localized_date(date: NaiveDate, lang: &str) -> String {
    let lang = lang.to_ascii_lowercase();
    if lang.starts_with("zh") || lang.starts_with("ja") {
        date.format("%Y年%-m月%-d日").to_string()
    } else if lang.starts_with("en") {
        date.format("%B %-d, %Y").to_string()
    } else {
        date.format("%Y-%m-%d").to_string()
    }
}
