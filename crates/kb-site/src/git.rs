//! Revision history from git.
//!
//! History is read with `git log --follow` per file. A missing `git`
//! binary or a file outside a repository simply yields empty history.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::metadata::{Contributor, GitInfo};

/// Source of per-file revision history.
pub trait HistoryProvider: Send + Sync {
    /// History of `relative` (a path under the source directory).
    fn history(&self, relative: &Path) -> GitInfo;
}

/// Provider used when history collection is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHistory;

impl HistoryProvider for NoHistory {
    fn history(&self, _relative: &Path) -> GitInfo {
        GitInfo::default()
    }
}

/// Reads history by running `git log` in the source directory.
#[derive(Clone, Debug)]
pub struct GitHistory {
    work_dir: PathBuf,
}

impl GitHistory {
    #[must_use]
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl HistoryProvider for GitHistory {
    fn history(&self, relative: &Path) -> GitInfo {
        let output = Command::new("git")
            .args(["log", "--follow", "--format=%at%x09%an%x09%ae", "--"])
            .arg(relative)
            .current_dir(&self.work_dir)
            .output();

        match output {
            Ok(output) if output.status.success() => {
                parse_log(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::debug!(
                    path = %relative.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "git log failed"
                );
                GitInfo::default()
            }
            Err(e) => {
                tracing::debug!(path = %relative.display(), error = %e, "Failed to run git");
                GitInfo::default()
            }
        }
    }
}

/// Parse `git log --format=%at%x09%an%x09%ae` output (newest first).
///
/// Unparseable lines are skipped.
pub(crate) fn parse_log(log: &str) -> GitInfo {
    let mut created: Option<i64> = None;
    let mut updated: Option<i64> = None;
    let mut contributors: Vec<Contributor> = Vec::new();
    let mut by_email: HashMap<String, usize> = HashMap::new();

    for line in log.lines() {
        let mut fields = line.splitn(3, '\t');
        let (Some(ts), Some(name), Some(email)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        let Ok(seconds) = ts.trim().parse::<i64>() else {
            continue;
        };
        let millis = seconds * 1000;

        created = Some(created.map_or(millis, |c| c.min(millis)));
        updated = Some(updated.map_or(millis, |u| u.max(millis)));

        let key = email.trim().to_lowercase();
        if let Some(&idx) = by_email.get(&key) {
            contributors[idx].commits += 1;
        } else {
            by_email.insert(key, contributors.len());
            contributors.push(Contributor {
                name: name.trim().to_owned(),
                email: email.trim().to_owned(),
                commits: 1,
            });
        }
    }

    contributors.sort_by(|a, b| b.commits.cmp(&a.commits).then_with(|| a.name.cmp(&b.name)));

    GitInfo {
        created_time: created,
        updated_time: updated,
        contributors,
    }
}
