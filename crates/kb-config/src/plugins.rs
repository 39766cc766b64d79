//! Content-processing plugin settings.
//!
//! Plugins are configured as a TOML table keyed by plugin name. The only
//! recognized plugin is `mdEnhance` (also accepted as `md_enhance`), which
//! toggles `PlantUML` diagram rendering and Markdown file inclusion.
//!
//! What happens with names the loader does not recognize is decided by
//! [`UnknownPluginPolicy`].

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Default `PlantUML` server used to render diagrams.
pub const DEFAULT_PLANTUML_SERVER: &str = "https://www.plantuml.com/plantuml";

/// How to treat plugin names and options the loader does not recognize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPluginPolicy {
    /// Log a warning and ignore the entry.
    #[default]
    Warn,
    /// Fail the load with [`ConfigError::UnknownPlugin`].
    Reject,
}

/// Settings for the Markdown enhancement plugin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MdEnhanceConfig {
    /// Render `@startuml` blocks and `plantuml` fences as diagram images.
    pub plantuml: bool,
    /// Expand `<!-- @include: path -->` directives.
    pub include: bool,
    /// `PlantUML` server base URL (without trailing slash).
    pub plantuml_server: String,
}

impl Default for MdEnhanceConfig {
    fn default() -> Self {
        Self {
            plantuml: false,
            include: false,
            plantuml_server: DEFAULT_PLANTUML_SERVER.to_owned(),
        }
    }
}

/// Validated plugin configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    /// Markdown enhancement settings, if the plugin is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md_enhance: Option<MdEnhanceConfig>,
}

impl PluginConfig {
    /// True if `PlantUML` rendering is enabled.
    #[must_use]
    pub fn plantuml_enabled(&self) -> bool {
        self.md_enhance.as_ref().is_some_and(|m| m.plantuml)
    }

    /// True if Markdown file inclusion is enabled.
    #[must_use]
    pub fn include_enabled(&self) -> bool {
        self.md_enhance.as_ref().is_some_and(|m| m.include)
    }

    /// `PlantUML` server URL (default server if the plugin is not configured).
    #[must_use]
    pub fn plantuml_server(&self) -> &str {
        self.md_enhance
            .as_ref()
            .map_or(DEFAULT_PLANTUML_SERVER, |m| m.plantuml_server.as_str())
    }

    /// Mutable access to the server URL for environment expansion.
    pub(crate) fn plantuml_server_mut(&mut self) -> Option<&mut String> {
        self.md_enhance.as_mut().map(|m| &mut m.plantuml_server)
    }
}

/// Parse the `plugins` table.
///
/// `field` is the configuration path of the table (`plugins` or
/// `theme.plugins`).
pub(crate) fn parse_plugins(
    table: toml::Table,
    field: &str,
    policy: UnknownPluginPolicy,
) -> Result<PluginConfig, ConfigError> {
    let mut config = PluginConfig::default();

    for (name, value) in table {
        let location = format!("{field}.{name}");
        match name.as_str() {
            "mdEnhance" | "md_enhance" => {
                if config.md_enhance.is_some() {
                    return Err(ConfigError::invalid(
                        location,
                        "mdEnhance is configured more than once",
                    ));
                }
                let toml::Value::Table(options) = value else {
                    return Err(ConfigError::invalid(location, "expected a table"));
                };
                config.md_enhance = Some(parse_md_enhance(options, &location, policy)?);
            }
            _ => unknown(location, policy)?,
        }
    }

    Ok(config)
}

fn parse_md_enhance(
    options: toml::Table,
    field: &str,
    policy: UnknownPluginPolicy,
) -> Result<MdEnhanceConfig, ConfigError> {
    let mut config = MdEnhanceConfig::default();

    for (key, value) in options {
        let location = format!("{field}.{key}");
        match key.as_str() {
            "plantuml" => config.plantuml = expect_bool(&value, &location)?,
            "include" => config.include = expect_bool(&value, &location)?,
            "plantumlServer" | "plantuml_server" => {
                let toml::Value::String(server) = value else {
                    return Err(ConfigError::invalid(location, "expected a string"));
                };
                config.plantuml_server = server;
            }
            _ => unknown(location, policy)?,
        }
    }

    Ok(config)
}

fn expect_bool(value: &toml::Value, field: &str) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::invalid(field, "expected a boolean"))
}

fn unknown(field: String, policy: UnknownPluginPolicy) -> Result<(), ConfigError> {
    match policy {
        UnknownPluginPolicy::Warn => {
            tracing::warn!(field = %field, "Ignoring unknown plugin setting");
            Ok(())
        }
        UnknownPluginPolicy::Reject => Err(ConfigError::UnknownPlugin { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table(src: &str) -> toml::Table {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_md_enhance_flags() {
        let config = parse_plugins(
            table("[mdEnhance]\nplantuml = true\ninclude = true\n"),
            "plugins",
            UnknownPluginPolicy::Warn,
        )
        .unwrap();

        assert!(config.plantuml_enabled());
        assert!(config.include_enabled());
        assert_eq!(config.plantuml_server(), DEFAULT_PLANTUML_SERVER);
    }

    #[test]
    fn test_snake_case_alias_and_server() {
        let config = parse_plugins(
            table("[md_enhance]\nplantuml = true\nplantuml_server = \"http://localhost:8080\"\n"),
            "plugins",
            UnknownPluginPolicy::Reject,
        )
        .unwrap();

        assert!(config.plantuml_enabled());
        assert!(!config.include_enabled());
        assert_eq!(config.plantuml_server(), "http://localhost:8080");
    }

    #[test]
    fn test_no_plugins_disables_everything() {
        let config = parse_plugins(toml::Table::new(), "plugins", UnknownPluginPolicy::Warn).unwrap();
        assert_eq!(config, PluginConfig::default());
        assert!(!config.plantuml_enabled());
        assert!(!config.include_enabled());
    }

    #[test]
    fn test_unknown_plugin_warn_policy_ignores() {
        let config = parse_plugins(
            table("[search]\nenabled = true\n[mdEnhance]\ninclude = true\n"),
            "plugins",
            UnknownPluginPolicy::Warn,
        )
        .unwrap();
        assert!(config.include_enabled());
    }

    #[test]
    fn test_unknown_plugin_reject_policy_fails() {
        let err = parse_plugins(
            table("[search]\nenabled = true\n"),
            "theme.plugins",
            UnknownPluginPolicy::Reject,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin { ref field } if field == "theme.plugins.search"));
    }

    #[test]
    fn test_unknown_option_follows_policy() {
        let src = "[mdEnhance]\nmermaid = true\n";
        assert!(parse_plugins(table(src), "plugins", UnknownPluginPolicy::Warn).is_ok());
        let err = parse_plugins(table(src), "plugins", UnknownPluginPolicy::Reject).unwrap_err();
        assert!(err.to_string().contains("plugins.mdEnhance.mermaid"));
    }

    #[test]
    fn test_wrong_option_type_reports_field() {
        let err = parse_plugins(
            table("[mdEnhance]\nplantuml = \"yes\"\n"),
            "plugins",
            UnknownPluginPolicy::Warn,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "plugins.mdEnhance.plantuml"));
    }

    #[test]
    fn test_both_spellings_rejected() {
        let err = parse_plugins(
            table("[mdEnhance]\ninclude = true\n[md_enhance]\ninclude = false\n"),
            "plugins",
            UnknownPluginPolicy::Warn,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
