//! `PlantUML` diagrams rendered by a `PlantUML` server.
//!
//! Both `@startuml ... @enduml` blocks and fenced `plantuml` code blocks are
//! replaced with an `<img>` pointing at `{server}/svg/{encoded}`, where the
//! diagram source is raw-deflated and encoded with `PlantUML`'s base64
//! alphabet. Diagram sources shown inside other code blocks are left as is.

use std::io::{self, Write};
use std::sync::LazyLock;

use base64::Engine;
use base64::alphabet::Alphabet;
use base64::engine::{GeneralPurpose, general_purpose};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use regex::{Captures, Regex};

use super::{ContentPlugin, DocumentContext, code_block_ranges, enclosing_code_block};
use crate::article::ArticleError;

static FENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^```[ \t]*plantuml[^\n]*\n(.*?)^```[ \t]*$").unwrap()
});

static BLOCK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^@startuml\b.*?^@enduml[ \t]*$").unwrap());

static PLANTUML_ENGINE: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    let alphabet =
        Alphabet::new("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_").unwrap();
    GeneralPurpose::new(&alphabet, general_purpose::NO_PAD)
});

/// Encode diagram source for a `PlantUML` server URL.
///
/// # Errors
///
/// Returns an error if compression fails.
pub fn encode_plantuml(source: &str) -> io::Result<String> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(source.as_bytes())?;
    let mut compressed = encoder.finish()?;

    // The server decodes in whole 3-byte groups
    let padded = compressed.len().div_ceil(3) * 3;
    compressed.resize(padded, 0);

    Ok(PLANTUML_ENGINE.encode(compressed))
}

/// Replaces diagram sources with server-rendered images.
#[derive(Clone, Debug)]
pub struct PlantUmlPlugin {
    server: String,
}

impl PlantUmlPlugin {
    #[must_use]
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into().trim_end_matches('/').to_owned(),
        }
    }

    fn image(&self, source: &str) -> Result<String, ArticleError> {
        let encoded = encode_plantuml(source).map_err(|e| ArticleError::Plugin {
            plugin: "plantuml",
            message: e.to_string(),
        })?;
        Ok(format!(r#"<img src="{}/svg/{encoded}" alt="">"#, self.server))
    }

    fn replace(
        &self,
        pattern: &Regex,
        content: &str,
        source_of: impl Fn(&Captures<'_>) -> String,
    ) -> Result<String, ArticleError> {
        let blocks = code_block_ranges(content);
        let mut result = String::with_capacity(content.len());
        let mut last = 0;
        let mut pos = 0;
        while let Some(caps) = pattern.captures_at(content, pos) {
            let full = caps.get(0).unwrap();
            if let Some(block) = enclosing_code_block(&blocks, full.start()) {
                pos = block.end;
                continue;
            }
            result.push_str(&content[last..full.start()]);
            result.push_str(&self.image(&source_of(&caps))?);
            last = full.end();
            pos = full.end();
        }
        result.push_str(&content[last..]);
        Ok(result)
    }
}

impl ContentPlugin for PlantUmlPlugin {
    fn name(&self) -> &'static str {
        "plantuml"
    }

    fn process(
        &self,
        _doc: &DocumentContext<'_>,
        content: &str,
        _warnings: &mut Vec<String>,
    ) -> Result<String, ArticleError> {
        if !content.contains("plantuml") && !content.contains("@startuml") {
            return Ok(content.to_owned());
        }

        let fenced = self.replace(&FENCE_PATTERN, content, |caps| {
            let body = caps[1].trim_end();
            if body.trim_start().starts_with("@start") {
                body.to_owned()
            } else {
                format!("@startuml\n{body}\n@enduml")
            }
        })?;
        self.replace(&BLOCK_PATTERN, &fenced, |caps| caps[0].to_owned())
    }
}
