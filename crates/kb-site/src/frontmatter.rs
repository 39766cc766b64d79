//! YAML frontmatter parsing.
//!
//! Frontmatter is an optional YAML block fenced by `---` lines at the very
//! start of a document. Values are restricted to a closed set of kinds
//! ([`FrontmatterValue`]); anything else (nested maps, nulls, lists of
//! non-strings) is rejected with the offending key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::article::ArticleError;

/// Author-supplied key/value metadata of one document.
pub type Frontmatter = BTreeMap<String, FrontmatterValue>;

/// A single frontmatter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FrontmatterValue {
    /// `sticky: true`
    Bool(bool),
    /// `order: 2`
    Number(serde_json::Number),
    /// `title: Factory pattern`
    String(String),
    /// `tags: [design, java]`
    List(Vec<String>),
}

impl FrontmatterValue {
    /// String content, if this is a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl TryFrom<serde_yaml::Value> for FrontmatterValue {
    type Error = &'static str;

    fn try_from(value: serde_yaml::Value) -> Result<Self, Self::Error> {
        use serde_yaml::Value;

        match value {
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => yaml_number(&n).ok_or("number is not finite"),
            Value::String(s) => Ok(Self::String(s)),
            Value::Sequence(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    Value::Number(n) => Ok(n.to_string()),
                    Value::Bool(b) => Ok(b.to_string()),
                    _ => Err("lists may only contain scalar values"),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Null => Err("value is empty"),
            Value::Mapping(_) => Err("nested mappings are not supported"),
            Value::Tagged(_) => Err("tagged values are not supported"),
        }
    }
}

fn yaml_number(n: &serde_yaml::Number) -> Option<FrontmatterValue> {
    let number = if let Some(u) = n.as_u64() {
        serde_json::Number::from(u)
    } else if let Some(i) = n.as_i64() {
        serde_json::Number::from(i)
    } else {
        serde_json::Number::from_f64(n.as_f64()?)?
    };
    Some(FrontmatterValue::Number(number))
}

/// Split a document into its raw frontmatter block and the Markdown body.
///
/// Returns `(None, source)` when the document has no frontmatter fence.
pub(crate) fn split(source: &str) -> (Option<&str>, &str) {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let Some(rest) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return (None, source);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    // Unterminated fence: treat the whole file as Markdown
    (None, source)
}

/// Parse a raw frontmatter block.
pub(crate) fn parse(yaml: &str) -> Result<Frontmatter, ArticleError> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::new());
    }

    let raw: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(yaml).map_err(|e| ArticleError::Frontmatter(e.to_string()))?;

    raw.into_iter()
        .map(|(key, value)| match FrontmatterValue::try_from(value) {
            Ok(value) => Ok((key, value)),
            Err(reason) => Err(ArticleError::UnsupportedFrontmatter { key, reason }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_with_frontmatter() {
        let (yaml, body) = split("---\ntitle: Factory\n---\n# Heading\n");
        assert_eq!(yaml, Some("title: Factory\n"));
        assert_eq!(body, "# Heading\n");
    }

    #[test]
    fn test_split_without_frontmatter() {
        let (yaml, body) = split("# Heading\n---\n");
        assert!(yaml.is_none());
        assert_eq!(body, "# Heading\n---\n");
    }

    #[test]
    fn test_split_unterminated_fence() {
        let source = "---\ntitle: x\n# Heading\n";
        let (yaml, body) = split(source);
        assert!(yaml.is_none());
        assert_eq!(body, source);
    }

    #[test]
    fn test_split_crlf_and_bom() {
        let (yaml, body) = split("\u{feff}---\r\ntitle: x\r\n---\r\nbody");
        assert_eq!(yaml, Some("title: x\r\n"));
        assert_eq!(body, "body");
    }

    #[test]
    fn test_parse_value_kinds() {
        let fm = parse(
            "title: 工厂模式\ncreateTime: 2024/08/25 10:21:30\npermalink: /article/lyeq7xvt/\nsticky: true\norder: 2\ntags:\n  - design\n  - java\n",
        )
        .unwrap();

        assert_eq!(fm["title"].as_str(), Some("工厂模式"));
        assert_eq!(fm["createTime"].as_str(), Some("2024/08/25 10:21:30"));
        assert_eq!(fm["sticky"], FrontmatterValue::Bool(true));
        assert_eq!(fm["order"], FrontmatterValue::Number(2.into()));
        assert_eq!(
            fm["tags"],
            FrontmatterValue::List(vec!["design".to_owned(), "java".to_owned()])
        );
    }

    #[test]
    fn test_parse_rejects_nested_mapping() {
        let err = parse("author:\n  name: someone\n").unwrap_err();
        assert!(
            matches!(err, ArticleError::UnsupportedFrontmatter { ref key, .. } if key == "author")
        );
    }

    #[test]
    fn test_parse_rejects_null() {
        let err = parse("tags:\n").unwrap_err();
        assert!(err.to_string().contains("tags"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(matches!(
            parse("title: [unterminated"),
            Err(ArticleError::Frontmatter(_))
        ));
    }

    #[test]
    fn test_json_shape() {
        let fm = parse("title: x\norder: 1\nratio: 0.5\n").unwrap();
        let json = serde_json::to_value(&fm).unwrap();
        assert_eq!(json, serde_json::json!({"order": 1, "ratio": 0.5, "title": "x"}));

        let back: Frontmatter = serde_json::from_value(json).unwrap();
        assert_eq!(back, fm);
    }
}
