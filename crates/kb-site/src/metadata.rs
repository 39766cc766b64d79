//! Published per-article metadata.
//!
//! [`ArticleMetadata`] is the JSON record shipped next to every rendered
//! article. Field names are camelCase to match the client-side router.

use serde::{Deserialize, Serialize};

use crate::frontmatter::Frontmatter;

/// Metadata of one article, computed once at build time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    /// Routing path, unique across the site (e.g. `/article/lyeq7xvt/`).
    pub path: String,
    /// Display title.
    pub title: String,
    /// Language tag (e.g. `zh-CN`).
    pub lang: String,
    /// Author-supplied frontmatter.
    #[serde(default)]
    pub frontmatter: Frontmatter,
    /// Level 2 and 3 headings, nested.
    #[serde(default)]
    pub headers: Vec<Header>,
    /// Revision history.
    #[serde(default)]
    pub git: GitInfo,
    /// Reading-time estimate.
    pub reading_time: ReadingTime,
    /// Source file path relative to the source directory.
    pub file_path_relative: String,
    /// Human-readable creation date in the article language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localized_date: Option<String>,
}

impl ArticleMetadata {
    /// Check the timestamp invariant (`updated >= created`).
    ///
    /// # Errors
    ///
    /// Returns a description of the violation.
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(created), Some(updated)) = (self.git.created_time, self.git.updated_time)
            && updated < created
        {
            return Err(format!(
                "updated time {updated} is before created time {created}"
            ));
        }
        Ok(())
    }
}

/// Heading entry of the article outline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Heading level (2 or 3).
    pub level: u8,
    /// Plain-text heading.
    pub title: String,
    /// Anchor id.
    pub slug: String,
    /// In-page link (`#slug`).
    pub link: String,
    /// Nested lower-level headings.
    #[serde(default)]
    pub children: Vec<Header>,
}

/// Revision history of the source file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitInfo {
    /// First commit time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<i64>,
    /// Last commit time in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<i64>,
    /// Authors ordered by commit count.
    #[serde(default)]
    pub contributors: Vec<Contributor>,
}

/// Commit author.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    pub email: String,
    pub commits: u32,
}

/// Reading-time estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingTime {
    /// Minutes, rounded to two decimals.
    pub minutes: f64,
    /// Counted words.
    pub words: u64,
}
