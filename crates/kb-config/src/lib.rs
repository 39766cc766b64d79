//! Configuration management for kb.
//!
//! Parses `kb.toml` site configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! A configuration document describes the static part of a site: language,
//! title, base URL prefix, theme selection, the navigation tree, and the
//! content plugins that run over every article. Loading is a pure
//! parse-and-validate step; structural errors fail fast with the offending
//! field path.
//!
//! ```
//! use std::path::Path;
//! use kb_config::Config;
//!
//! let config = Config::parse(
//!     r#"
//! lang = "zh-CN"
//! title = "Knowledge base"
//!
//! [theme]
//! name = "hope"
//!
//! [[navbar]]
//! text = "Cache"
//! link = "/cache/"
//! children = [{ text = "redis", link = "/cache/redis" }]
//!
//! [plugins.mdEnhance]
//! plantuml = true
//! include = true
//! "#,
//!     Path::new("/site"),
//! )?;
//!
//! assert_eq!(config.site.navbar[0].children[0].path, "/cache/redis");
//! assert!(config.site.plugins.plantuml_enabled());
//! # Ok::<(), kb_config::ConfigError>(())
//! ```
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `title`
//! - `description`
//! - `base`
//! - `theme.logo`
//! - `plugins.mdEnhance.plantumlServer`
//! - `server.host`

mod expand;
mod navigation;
mod plugins;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use navigation::RawNavEntry;

pub use navigation::{NavigationEntry, walk_all};
pub use plugins::{DEFAULT_PLANTUML_SERVER, MdEnhanceConfig, PluginConfig, UnknownPluginPolicy};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override article source directory.
    pub source_dir: Option<PathBuf>,
    /// Override build output directory.
    pub out_dir: Option<PathBuf>,
    /// Override base URL prefix.
    pub base: Option<String>,
    /// Override git history collection.
    pub git: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "kb.toml";

/// Supported theme selectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// The stock documentation theme.
    #[default]
    Default,
    /// The "hope" blog/knowledge-base theme.
    Hope,
}

impl FromStr for Theme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "hope" => Ok(Self::Hope),
            other => Err(ConfigError::UnknownTheme(other.to_owned())),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Hope => "hope",
        })
    }
}

/// Theme selection and presentation settings handed to the theme.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ThemeConfig {
    /// Selected theme.
    pub name: Theme,
    /// Logo path or URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Whether the sidebar menu is shown.
    pub sidebar: bool,
}

/// Static site description: everything except build and server settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    /// Site language tag (e.g., "zh-CN").
    pub lang: String,
    /// Site title.
    pub title: String,
    /// Site description.
    pub description: String,
    /// URL path prefix the site is served under. Starts and ends with `/`.
    pub base: String,
    /// Theme settings.
    pub theme: ThemeConfig,
    /// Navigation tree, in configuration order.
    pub navbar: Vec<NavigationEntry>,
    /// Content plugin settings.
    pub plugins: PluginConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            lang: "en-US".to_owned(),
            title: String::new(),
            description: String::new(),
            base: "/".to_owned(),
            theme: ThemeConfig::default(),
            navbar: Vec::new(),
            plugins: PluginConfig::default(),
        }
    }
}

/// Server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7878,
        }
    }
}

/// Resolved build configuration with absolute paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory containing the Markdown articles.
    pub source_dir: PathBuf,
    /// Directory the build output is written to.
    pub out_dir: PathBuf,
    /// Worker threads for document processing (`None` uses rayon's default).
    pub workers: Option<usize>,
    /// Collect created/updated times and contributors from git.
    pub git: bool,
}

impl BuildConfig {
    fn with_base(base: &Path) -> Self {
        Self {
            source_dir: base.join("docs"),
            out_dir: base.join("dist"),
            workers: None,
            git: true,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Site description.
    pub site: SiteConfig,
    /// Server settings.
    pub server: ServerConfig,
    /// Build settings.
    pub build: BuildConfig,
    /// Path to the config file (set after loading from a file).
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw configuration document as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawConfig {
    lang: Option<String>,
    title: Option<String>,
    description: Option<String>,
    base: Option<String>,
    theme: RawTheme,
    navbar: Option<Vec<RawNavEntry>>,
    plugins: Option<toml::Table>,
    plugin_policy: UnknownPluginPolicy,
    server: ServerConfig,
    build: RawBuild,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawTheme {
    name: Option<String>,
    logo: Option<String>,
    sidebar: Option<bool>,
    navbar: Option<Vec<RawNavEntry>>,
    plugins: Option<toml::Table>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawBuild {
    source_dir: Option<String>,
    out_dir: Option<String>,
    workers: Option<usize>,
    git: Option<bool>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// A field holds an invalid value.
    #[error("Configuration error in {field}: {message}")]
    Invalid {
        /// Config field path (e.g., "`navbar[2].link`").
        field: String,
        /// What is wrong with the value.
        message: String,
    },
    /// Two sibling navigation entries link to the same path.
    #[error("Duplicate navigation link '{path}' at {second} (already used by {first})")]
    DuplicateNavPath {
        /// The repeated routing path.
        path: String,
        /// Field path of the first entry.
        first: String,
        /// Field path of the repeating entry.
        second: String,
    },
    /// Theme selector is not supported.
    #[error("Unknown theme '{0}' (expected one of: default, hope)")]
    UnknownTheme(String),
    /// Plugin name or option is not recognized and the policy rejects it.
    #[error("Unknown plugin setting: {field}")]
    UnknownPlugin {
        /// Config field path (e.g., "`plugins.search`").
        field: String,
    },
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`KB_HOST`} not set").
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, "cannot be empty"));
    }
    Ok(())
}

/// Require the base prefix to be an absolute directory path.
fn validate_base(base: &str) -> Result<(), ConfigError> {
    if !base.starts_with('/') || !base.ends_with('/') {
        return Err(ConfigError::invalid("base", "must start and end with '/'"));
    }
    Ok(())
}

/// Pick a section given either top-level or inside `[theme]`, but not both.
fn one_of<T>(
    top: Option<T>,
    themed: Option<T>,
    name: &str,
) -> Result<Option<(T, String)>, ConfigError> {
    match (top, themed) {
        (Some(_), Some(_)) => Err(ConfigError::invalid(
            name,
            format!("defined both at top level and in theme.{name}"),
        )),
        (Some(v), None) => Ok(Some((v, name.to_owned()))),
        (None, Some(v)) => Ok(Some((v, format!("theme.{name}")))),
        (None, None) => Ok(None),
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `kb.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings)?;
        }

        Ok(config)
    }

    /// Parse, expand, resolve and validate a configuration document.
    ///
    /// Relative build paths are resolved against `config_dir`. Parsing the
    /// same document twice yields equal configurations.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the offending field.
    pub fn parse(content: &str, config_dir: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let config = Self::from_raw(raw, config_dir)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) -> Result<(), ConfigError> {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(source_dir) = &settings.source_dir {
            self.build.source_dir.clone_from(source_dir);
        }
        if let Some(out_dir) = &settings.out_dir {
            self.build.out_dir.clone_from(out_dir);
        }
        if let Some(base) = &settings.base {
            self.site.base.clone_from(base);
        }
        if let Some(git) = settings.git {
            self.build.git = git;
        }
        self.validate()
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            site: SiteConfig::default(),
            server: ServerConfig::default(),
            build: BuildConfig::with_base(base),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::parse(&content, config_dir)?;
        config.config_path = Some(path.to_path_buf());
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Convert the raw document: expand variables, build the navigation tree,
    /// parse plugins and resolve paths.
    fn from_raw(mut raw: RawConfig, config_dir: &Path) -> Result<Self, ConfigError> {
        expand::expand_opt(&mut raw.title, "title")?;
        expand::expand_opt(&mut raw.description, "description")?;
        expand::expand_opt(&mut raw.base, "base")?;
        expand::expand_opt(&mut raw.theme.logo, "theme.logo")?;
        raw.server.host = expand::expand_env(&raw.server.host, "server.host")?;

        let defaults = SiteConfig::default();

        let theme = ThemeConfig {
            name: match raw.theme.name.as_deref() {
                Some(name) => name.parse()?,
                None => Theme::default(),
            },
            logo: raw.theme.logo,
            sidebar: raw.theme.sidebar.unwrap_or(true),
        };

        let navbar = match one_of(raw.navbar, raw.theme.navbar, "navbar")? {
            Some((entries, field)) => navigation::build_navigation(entries, &field)?,
            None => Vec::new(),
        };

        let mut plugins = match one_of(raw.plugins, raw.theme.plugins, "plugins")? {
            Some((table, field)) => plugins::parse_plugins(table, &field, raw.plugin_policy)?,
            None => PluginConfig::default(),
        };
        if let Some(server) = plugins.plantuml_server_mut() {
            *server = expand::expand_env(server, "plugins.mdEnhance.plantumlServer")?;
            let trimmed = server.trim_end_matches('/').len();
            server.truncate(trimmed);
        }

        let build = BuildConfig {
            source_dir: config_dir.join(raw.build.source_dir.as_deref().unwrap_or("docs")),
            out_dir: config_dir.join(raw.build.out_dir.as_deref().unwrap_or("dist")),
            workers: raw.build.workers,
            git: raw.build.git.unwrap_or(true),
        };

        Ok(Self {
            site: SiteConfig {
                lang: raw.lang.unwrap_or(defaults.lang),
                title: raw.title.unwrap_or_default(),
                description: raw.description.unwrap_or_default(),
                base: raw.base.unwrap_or(defaults.base),
                theme,
                navbar,
                plugins,
            },
            server: raw.server,
            build,
            config_path: None,
        })
    }

    /// Validate configuration values.
    ///
    /// Checks that all required fields are properly set and contain valid values.
    /// Called automatically after loading and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.site.lang, "lang")?;
        validate_base(&self.site.base)?;
        self.validate_server()?;

        if self.build.workers == Some(0) {
            return Err(ConfigError::invalid(
                "build.workers",
                "must be greater than 0",
            ));
        }

        if self.site.plugins.plantuml_enabled() {
            let server = self.site.plugins.plantuml_server();
            if !server.starts_with("http://") && !server.starts_with("https://") {
                return Err(ConfigError::invalid(
                    "plugins.mdEnhance.plantumlServer",
                    "must start with http:// or https://",
                ));
            }
        }

        Ok(())
    }

    /// Validate server configuration.
    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 lets the OS pick a port, which is never what a config file means
        if self.server.port == 0 {
            return Err(ConfigError::invalid("server.port", "cannot be 0"));
        }

        Ok(())
    }
}
