//! Site build pipeline.
//!
//! [`SiteBuilder::build`] runs a single pass over the source directory:
//!
//! 1. Scan for Markdown files (sorted, hidden entries skipped)
//! 2. Transform every document on a rayon pool
//! 3. Register the units one by one in source order
//! 4. Freeze the registry into a [`Site`]
//!
//! Any error aborts the pass and the partially filled registry is dropped.
//! A built [`Site`] is immutable and can be written to disk or served.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use kb_config::{Config, NavigationEntry, walk_all};
use rayon::prelude::*;
use serde::Serialize;

use crate::article::{ArticleError, ArticleTransformer};
use crate::git::{GitHistory, HistoryProvider, NoHistory};
use crate::metadata::ArticleMetadata;
use crate::plugins::PluginPipeline;
use crate::registry::{DuplicatePathError, NotFound, Registry, RegistryBuilder};
use crate::routing;
use crate::scanner::Scanner;
use crate::unit::ArticleRenderUnit;

/// Name of the site manifest written to the output directory.
pub const MANIFEST_FILENAME: &str = "site.json";

/// Error during a site build or write.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Source directory does not exist.
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// Filesystem error.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A document failed to transform.
    #[error("Failed to build {}: {source}", path.display())]
    Article {
        path: PathBuf,
        #[source]
        source: ArticleError,
    },
    /// Two documents claim the same routing path.
    #[error(transparent)]
    Duplicate(#[from] DuplicatePathError),
    /// Two routing paths map to the same output file.
    #[error("Routes {first} and {second} both write {}", file.display())]
    OutputCollision {
        file: PathBuf,
        first: String,
        second: String,
    },
    /// Output directory holds files that were not produced by a build.
    #[error("Output directory {} is not empty and has no {MANIFEST_FILENAME}", .0.display())]
    OutputNotEmpty(PathBuf),
    /// Worker pool could not be created.
    #[error("Failed to create thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BuildError {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Builds a [`Site`] from configuration.
pub struct SiteBuilder {
    config: Config,
    history: Option<Arc<dyn HistoryProvider>>,
}

impl SiteBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            history: None,
        }
    }

    /// Override the revision history source.
    ///
    /// By default history comes from git when `build.git` is enabled.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn HistoryProvider>) -> Self {
        self.history = Some(history);
        self
    }

    /// Run the build pass.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the sources cannot be read, a document fails
    /// to transform, or two documents share a routing path.
    pub fn build(self) -> Result<Site, BuildError> {
        let started = Instant::now();
        let source_dir = self.config.build.source_dir.clone();
        if !source_dir.is_dir() {
            return Err(BuildError::SourceNotFound(source_dir));
        }

        let files = Scanner::new(&source_dir)
            .scan()
            .map_err(BuildError::io(&source_dir))?;

        let history: Arc<dyn HistoryProvider> = match self.history {
            Some(history) => history,
            None if self.config.build.git => Arc::new(GitHistory::new(&source_dir)),
            None => Arc::new(NoHistory),
        };
        let plugins = PluginPipeline::from_config(&self.config.site.plugins);
        let plugin_names: Vec<_> = plugins.names().collect();
        let transformer = ArticleTransformer::new(&source_dir, &self.config.site.lang)
            .with_plugins(plugins)
            .with_history(history);

        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = self.config.build.workers {
            pool = pool.num_threads(workers);
        }
        let pool = pool.build()?;

        tracing::debug!(
            files = files.len(),
            threads = pool.current_num_threads(),
            plugins = ?plugin_names,
            "Transforming documents"
        );

        let units: Vec<ArticleRenderUnit> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    transformer
                        .transform_file(&file.relative)
                        .map_err(|source| BuildError::Article {
                            path: file.relative.clone(),
                            source,
                        })
                })
                .collect::<Result<Vec<_>, BuildError>>()
        })?;

        let mut registry = RegistryBuilder::new();
        for unit in units {
            registry.register(unit)?;
        }
        let site = Site::new(self.config, registry.freeze());

        tracing::info!(
            articles = site.registry.len(),
            elapsed = ?started.elapsed(),
            "Site built"
        );
        Ok(site)
    }
}

/// JSON bundle served and written for one article.
#[derive(Debug, Serialize)]
pub struct PageBundle<'a> {
    pub data: &'a ArticleMetadata,
    pub content: Cow<'a, str>,
}

impl<'a> From<&'a ArticleRenderUnit> for PageBundle<'a> {
    fn from(unit: &'a ArticleRenderUnit) -> Self {
        Self {
            data: unit.metadata(),
            content: unit.render(),
        }
    }
}

/// Site-wide summary written as `site.json`.
#[derive(Debug, Serialize)]
pub struct SiteManifest<'a> {
    pub lang: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub base: &'a str,
    pub navbar: &'a [NavigationEntry],
    pub routes: Vec<&'a str>,
}

/// A built site: configuration plus the frozen registry.
#[derive(Debug)]
pub struct Site {
    config: Config,
    registry: Registry,
}

impl Site {
    #[must_use]
    pub fn new(config: Config, registry: Registry) -> Self {
        Self { config, registry }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Look up an article by routing path.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`] if no article has this path.
    pub fn resolve(&self, path: &str) -> Result<&ArticleRenderUnit, NotFound> {
        self.registry.resolve(path)
    }

    /// Site summary with every registered route.
    #[must_use]
    pub fn manifest(&self) -> SiteManifest<'_> {
        let site = &self.config.site;
        SiteManifest {
            lang: &site.lang,
            title: &site.title,
            description: &site.description,
            base: &site.base,
            navbar: &site.navbar,
            routes: self.registry.paths().collect(),
        }
    }

    /// Internal navigation leaves that do not point at an article.
    ///
    /// A link matches an article at the same path or at the same path with
    /// `.html` appended. Section entries and external links are not checked.
    #[must_use]
    pub fn unresolved_nav_links(&self) -> Vec<&NavigationEntry> {
        walk_all(&self.config.site.navbar)
            .filter(|entry| !entry.is_section() && entry.path.starts_with('/'))
            .filter(|entry| {
                !self.registry.contains(&entry.path)
                    && !self.registry.contains(&format!("{}.html", entry.path))
            })
            .collect()
    }

    /// Write page bundles and the site manifest to `out_dir`.
    ///
    /// Output files are planned before the filesystem is touched. The site
    /// is written into a staging directory next to `out_dir` which then
    /// replaces it, so a failed write leaves the previous build in place.
    /// Returns the number of page files written.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OutputCollision`] if two routes map to the same
    /// file, [`BuildError::OutputNotEmpty`] if `out_dir` contains files but
    /// no manifest from an earlier build, or an I/O error.
    pub fn write(&self, out_dir: &Path) -> Result<usize, BuildError> {
        let plan = self.output_plan()?;
        check_output_dir(out_dir)?;

        let staging = staging_dir(out_dir);
        if staging.exists() {
            std::fs::remove_dir_all(&staging).map_err(BuildError::io(&staging))?;
        }
        if let Err(err) = self.write_into(&staging, &plan) {
            if let Err(cleanup) = std::fs::remove_dir_all(&staging) {
                tracing::warn!(dir = %staging.display(), error = %cleanup, "Failed to remove staging directory");
            }
            return Err(err);
        }

        if out_dir.exists() {
            std::fs::remove_dir_all(out_dir).map_err(BuildError::io(out_dir))?;
        }
        std::fs::rename(&staging, out_dir).map_err(BuildError::io(out_dir))?;

        tracing::info!(
            pages = plan.len(),
            out_dir = %out_dir.display(),
            "Site written"
        );
        Ok(plan.len())
    }

    /// Output file of every unit in registration order.
    fn output_plan(&self) -> Result<Vec<(PathBuf, &ArticleRenderUnit)>, BuildError> {
        let mut owners: HashMap<PathBuf, &str> = HashMap::with_capacity(self.registry.len());
        let mut plan = Vec::with_capacity(self.registry.len());
        for unit in self.registry.all() {
            let relative = routing::output_file(unit.path());
            if let Some(first) = owners.insert(relative.clone(), unit.path()) {
                return Err(BuildError::OutputCollision {
                    file: relative,
                    first: first.to_owned(),
                    second: unit.path().to_owned(),
                });
            }
            plan.push((relative, unit));
        }
        Ok(plan)
    }

    fn write_into(&self, dir: &Path, plan: &[(PathBuf, &ArticleRenderUnit)]) -> Result<(), BuildError> {
        std::fs::create_dir_all(dir).map_err(BuildError::io(dir))?;
        for (relative, unit) in plan {
            let target = dir.join(relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(BuildError::io(parent))?;
            }
            let json = serde_json::to_vec(&PageBundle::from(*unit))?;
            std::fs::write(&target, json).map_err(BuildError::io(&target))?;
        }

        let manifest_path = dir.join(MANIFEST_FILENAME);
        let manifest = serde_json::to_vec_pretty(&self.manifest())?;
        std::fs::write(&manifest_path, manifest).map_err(BuildError::io(&manifest_path))
    }
}

/// Refuse to replace a directory that was not produced by a build.
fn check_output_dir(out_dir: &Path) -> Result<(), BuildError> {
    if !out_dir.exists() {
        return Ok(());
    }
    let mut entries = std::fs::read_dir(out_dir).map_err(BuildError::io(out_dir))?;
    if entries.next().is_some() && !out_dir.join(MANIFEST_FILENAME).is_file() {
        return Err(BuildError::OutputNotEmpty(out_dir.to_path_buf()));
    }
    Ok(())
}

/// Sibling of `out_dir` used while writing: `dist` -> `.dist.staging`.
fn staging_dir(out_dir: &Path) -> PathBuf {
    let name = out_dir
        .file_name()
        .map_or_else(|| "site".into(), |name| name.to_string_lossy());
    out_dir.with_file_name(format!(".{name}.staging"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use kb_config::{MdEnhanceConfig, PluginConfig};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn config_for(root: &Path) -> Config {
        let mut config = Config::default();
        config.site.lang = "zh-CN".to_owned();
        config.site.title = "Notes".to_owned();
        config.build.source_dir = root.join("docs");
        config.build.out_dir = root.join("dist");
        config.build.git = false;
        config.build.workers = Some(2);
        config
    }

    fn write_docs(root: &Path, files: &[(&str, &str)]) {
        for (path, content) in files {
            let target = root.join("docs").join(path);
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::write(target, content).unwrap();
        }
    }

    #[test]
    fn test_build_registers_sorted_units() {
        let temp = TempDir::new().unwrap();
        write_docs(
            temp.path(),
            &[
                ("README.md", "# Home\n"),
                ("gof/factory.md", "---\npermalink: /article/lyeq7xvt/\n---\n# Factory\n"),
                ("gof/README.md", "# Patterns\n"),
                (".vuepress/config.md", "# ignored\n"),
            ],
        );

        let site = SiteBuilder::new(config_for(temp.path())).build().unwrap();
        let paths: Vec<_> = site.registry().paths().collect();
        assert_eq!(paths, vec!["/", "/gof/", "/article/lyeq7xvt/"]);

        let unit = site.resolve("/article/lyeq7xvt/").unwrap();
        assert_eq!(unit.metadata().title, "Factory");
        assert_eq!(unit.metadata().file_path_relative, "gof/factory.md");
        assert!(site.resolve("/article/y/").is_err());
    }

    #[test]
    fn test_build_fails_on_duplicate_route() {
        let temp = TempDir::new().unwrap();
        write_docs(
            temp.path(),
            &[
                ("a.md", "---\npermalink: /same/\n---\n"),
                ("b.md", "---\npermalink: /same/\n---\n"),
            ],
        );

        let err = SiteBuilder::new(config_for(temp.path())).build().unwrap_err();
        match err {
            BuildError::Duplicate(dup) => {
                assert_eq!(dup.path, "/same/");
                assert_eq!(dup.existing, "a.md");
                assert_eq!(dup.duplicate, "b.md");
            }
            other => panic!("expected Duplicate, got {other:?}"),
        }
    }

    #[test]
    fn test_build_fails_on_bad_document() {
        let temp = TempDir::new().unwrap();
        write_docs(temp.path(), &[("ok.md", "# Ok\n"), ("bad.md", "---\nx: [\n---\n")]);

        let err = SiteBuilder::new(config_for(temp.path())).build().unwrap_err();
        assert!(
            matches!(err, BuildError::Article { ref path, .. } if path == Path::new("bad.md"))
        );
    }

    #[test]
    fn test_build_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = SiteBuilder::new(config_for(temp.path())).build().unwrap_err();
        assert!(matches!(err, BuildError::SourceNotFound(_)));
    }

    #[test]
    fn test_build_applies_plugins() {
        let temp = TempDir::new().unwrap();
        write_docs(
            temp.path(),
            &[("uml.md", "# Uml\n\n@startuml\nA -> B\n@enduml\n")],
        );
        let mut config = config_for(temp.path());
        config.site.plugins = PluginConfig {
            md_enhance: Some(MdEnhanceConfig {
                plantuml: true,
                ..MdEnhanceConfig::default()
            }),
        };

        let site = SiteBuilder::new(config).build().unwrap();
        let html = site.resolve("/uml.html").unwrap().render().into_owned();
        assert!(html.contains("https://www.plantuml.com/plantuml/svg/"), "{html}");
    }

    #[test]
    fn test_unresolved_nav_links() {
        let temp = TempDir::new().unwrap();
        write_docs(temp.path(), &[("gof/factory.md", "# Factory\n")]);
        let mut config = config_for(temp.path());
        config.site.navbar = vec![
            NavigationEntry::new("Patterns", "/gof/").with_children(vec![
                NavigationEntry::new("Factory", "/gof/factory"),
                NavigationEntry::new("Builder", "/gof/builder"),
            ]),
            NavigationEntry::new("GitHub", "https://github.com"),
        ];

        let site = SiteBuilder::new(config).build().unwrap();
        let missing: Vec<_> = site
            .unresolved_nav_links()
            .into_iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(missing, vec!["/gof/builder"]);
    }

    #[test]
    fn test_write_output_layout() {
        let temp = TempDir::new().unwrap();
        write_docs(
            temp.path(),
            &[
                ("README.md", "# Home\n"),
                ("gof/factory.md", "# Factory\n\nBody\n"),
                ("cache/README.md", "# Cache\n"),
            ],
        );
        let config = config_for(temp.path());
        let out_dir = config.build.out_dir.clone();
        let site = SiteBuilder::new(config).build().unwrap();

        assert_eq!(site.write(&out_dir).unwrap(), 3);
        assert!(out_dir.join("index.json").is_file());
        assert!(out_dir.join("cache/index.json").is_file());

        let bundle: serde_json::Value =
            serde_json::from_slice(&fs::read(out_dir.join("gof/factory.json")).unwrap()).unwrap();
        assert_eq!(bundle["data"]["path"], "/gof/factory.html");
        assert_eq!(bundle["data"]["title"], "Factory");
        assert!(bundle["content"].as_str().unwrap().contains("<p>Body</p>"));

        let manifest: serde_json::Value =
            serde_json::from_slice(&fs::read(out_dir.join(MANIFEST_FILENAME)).unwrap()).unwrap();
        assert_eq!(manifest["title"], "Notes");
        assert_eq!(
            manifest["routes"],
            serde_json::json!(["/", "/cache/", "/gof/factory.html"])
        );

        // Rewriting over a previous build is allowed
        assert_eq!(site.write(&out_dir).unwrap(), 3);
    }

    #[test]
    fn test_write_refuses_foreign_directory() {
        let temp = TempDir::new().unwrap();
        write_docs(temp.path(), &[("a.md", "# A\n")]);
        let config = config_for(temp.path());
        let out_dir = config.build.out_dir.clone();
        fs::create_dir_all(&out_dir).unwrap();
        fs::write(out_dir.join("precious.txt"), "keep").unwrap();

        let site = SiteBuilder::new(config).build().unwrap();
        let err = site.write(&out_dir).unwrap_err();
        assert!(matches!(err, BuildError::OutputNotEmpty(_)));
        assert!(out_dir.join("precious.txt").is_file());
    }

    #[test]
    fn test_write_detects_output_collision() {
        let temp = TempDir::new().unwrap();
        write_docs(
            temp.path(),
            &[
                ("a.md", "# A\n"),
                ("b.md", "---\npermalink: /a\n---\n# B\n"),
            ],
        );
        let config = config_for(temp.path());
        let out_dir = config.build.out_dir.clone();
        let site = SiteBuilder::new(config).build().unwrap();

        let err = site.write(&out_dir).unwrap_err();
        assert!(matches!(err, BuildError::OutputCollision { .. }));
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_write_collision_keeps_previous_build() {
        let temp = TempDir::new().unwrap();
        write_docs(temp.path(), &[("a.md", "# A\n"), ("c.md", "# C\n")]);
        let config = config_for(temp.path());
        let out_dir = config.build.out_dir.clone();
        let site = SiteBuilder::new(config.clone()).build().unwrap();
        assert_eq!(site.write(&out_dir).unwrap(), 2);

        write_docs(temp.path(), &[("b.md", "---\npermalink: /a\n---\n# B\n")]);
        let broken = SiteBuilder::new(config.clone()).build().unwrap();
        let err = broken.write(&out_dir).unwrap_err();
        assert!(matches!(err, BuildError::OutputCollision { .. }));
        assert!(out_dir.join(MANIFEST_FILENAME).is_file());
        assert!(out_dir.join("a.json").is_file());
        assert!(out_dir.join("c.json").is_file());

        // Fixing the sources makes the next write succeed
        fs::remove_file(temp.path().join("docs/b.md")).unwrap();
        fs::write(temp.path().join("docs/c.md"), "# C2\n").unwrap();
        let fixed = SiteBuilder::new(config).build().unwrap();
        assert_eq!(fixed.write(&out_dir).unwrap(), 2);
        let bundle: serde_json::Value =
            serde_json::from_slice(&fs::read(out_dir.join("c.json")).unwrap()).unwrap();
        assert_eq!(bundle["data"]["title"], "C2");
        assert!(!staging_dir(&out_dir).exists());
    }

    #[test]
    fn test_staging_dir_is_hidden_sibling() {
        assert_eq!(
            staging_dir(Path::new("/srv/kb/dist")),
            PathBuf::from("/srv/kb/.dist.staging")
        );
    }

    #[test]
    fn test_custom_history_provider_is_used() {
        struct OneCommit;
        impl HistoryProvider for OneCommit {
            fn history(&self, _relative: &Path) -> crate::GitInfo {
                crate::GitInfo {
                    created_time: Some(1_724_552_490_000),
                    updated_time: Some(1_724_552_490_000),
                    contributors: Vec::new(),
                }
            }
        }

        let temp = TempDir::new().unwrap();
        write_docs(temp.path(), &[("a.md", "# A\n")]);
        let site = SiteBuilder::new(config_for(temp.path()))
            .with_history(Arc::new(OneCommit))
            .build()
            .unwrap();
        let meta = site.resolve("/a.html").unwrap().metadata();
        assert_eq!(meta.localized_date.as_deref(), Some("2024年8月25日"));
    }
}
