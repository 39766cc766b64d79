//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod serve;

pub(crate) use build::BuildArgs;
pub(crate) use serve::ServeArgs;

use kb_site::Site;

use crate::output::Output;

/// Report navigation entries that point at no article.
pub(crate) fn report_unresolved_links(site: &Site, output: &Output) {
    for entry in site.unresolved_nav_links() {
        output.warning(&format!(
            "Navigation entry '{}' links to {} which has no article",
            entry.label, entry.path
        ));
    }
}
