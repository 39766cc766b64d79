//! Markdown to HTML rendering with heading anchors.
//!
//! Everything except headings is delegated to `pulldown_cmark::html`.
//! Headings are intercepted so that each gets a unique `id` slug and a
//! `header-anchor` link, and so the outline and title can be collected in
//! the same pass.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};

use crate::metadata::Header;

/// Result of rendering one document.
#[derive(Clone, Debug, Default)]
pub struct RenderedMarkdown {
    /// Rendered HTML.
    pub html: String,
    /// Text of the first H1 heading.
    pub title: Option<String>,
    /// Level 2 and 3 headings, nested.
    pub headers: Vec<Header>,
    /// Plain text content, used for word counting.
    pub text: String,
}

/// GFM parser options.
#[must_use]
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_GFM
}

/// Render Markdown to HTML.
#[must_use]
pub fn render(markdown: &str) -> RenderedMarkdown {
    let mut out = RenderedMarkdown {
        html: String::with_capacity(markdown.len() * 3 / 2),
        ..RenderedMarkdown::default()
    };
    let mut slugger = Slugger::default();
    let mut pending: Vec<Event<'_>> = Vec::new();
    let mut heading: Option<HeadingBuffer<'_>> = None;

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                html::push_html(&mut out.html, pending.drain(..));
                heading = Some(HeadingBuffer {
                    level,
                    events: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(buffer) = heading.take() {
                    finish_heading(buffer, &mut slugger, &mut out);
                }
            }
            event => {
                if let Event::Text(text) | Event::Code(text) = &event {
                    if let Some(buffer) = heading.as_mut() {
                        buffer.text.push_str(text);
                    }
                    out.text.push_str(text);
                    out.text.push(' ');
                }
                match heading.as_mut() {
                    Some(buffer) => buffer.events.push(event),
                    None => pending.push(event),
                }
            }
        }
    }
    html::push_html(&mut out.html, pending.into_iter());

    out
}

struct HeadingBuffer<'a> {
    level: HeadingLevel,
    events: Vec<Event<'a>>,
    text: String,
}

fn finish_heading(buffer: HeadingBuffer<'_>, slugger: &mut Slugger, out: &mut RenderedMarkdown) {
    let level = heading_level_to_num(buffer.level);
    let title = buffer.text.trim().to_owned();
    let slug = slugger.slug(&title);

    let mut inner = String::new();
    html::push_html(&mut inner, buffer.events.into_iter());

    let _ = writeln!(
        out.html,
        r##"<h{level} id="{slug}" tabindex="-1"><a class="header-anchor" href="#{slug}"><span>{inner}</span></a></h{level}>"##
    );

    match level {
        1 if out.title.is_none() => out.title = Some(title),
        2 | 3 => push_header(
            &mut out.headers,
            Header {
                level,
                title,
                link: format!("#{slug}"),
                slug,
                children: Vec::new(),
            },
        ),
        _ => {}
    }
}

/// Nest an H3 under the preceding H2, if any.
fn push_header(headers: &mut Vec<Header>, header: Header) {
    if header.level == 3
        && let Some(parent) = headers.last_mut()
        && parent.level == 2
    {
        parent.children.push(header);
        return;
    }
    headers.push(header);
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Generates document-unique heading ids.
#[derive(Debug, Default)]
struct Slugger {
    counts: HashMap<String, usize>,
    used: HashSet<String>,
}

impl Slugger {
    fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.counts.entry(base.clone()).or_default();
        let mut candidate = match *count {
            0 => base.clone(),
            n => format!("{base}-{n}"),
        };
        // "x", "x-1", "x" must not produce "x-1" twice
        while self.used.contains(&candidate) {
            *count += 1;
            candidate = format!("{base}-{count}");
        }
        *count += 1;
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Convert heading text to an id.
///
/// Letters and digits of any script are kept (lowercased); whitespace,
/// dashes and underscores collapse to a single dash; everything else is
/// dropped.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }
    if result.is_empty() {
        result.push_str("heading");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("  Multiple   Spaces  "), "multiple-spaces");
        assert_eq!(slugify("工厂 模式"), "工厂-模式");
        assert_eq!(slugify("???"), "heading");
    }

    #[test]
    fn test_heading_gets_anchor() {
        let result = render("## Section Title\n");
        assert_eq!(
            result.html,
            "<h2 id=\"section-title\" tabindex=\"-1\"><a class=\"header-anchor\" href=\"#section-title\"><span>Section Title</span></a></h2>\n"
        );
    }

    #[test]
    fn test_duplicate_slugs_across_levels() {
        let result = render("## FAQ\n\n### FAQ\n\n## FAQ\n");
        let slugs: Vec<_> = result
            .headers
            .iter()
            .flat_map(|h| std::iter::once(h).chain(h.children.iter()))
            .map(|h| h.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["faq", "faq-1", "faq-2"]);
    }

    #[test]
    fn test_slug_collision_with_suffixed_text() {
        let result = render("## x\n\n## x-1\n\n## x\n");
        let slugs: Vec<_> = result.headers.iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, vec!["x", "x-1", "x-2"]);
    }

    #[test]
    fn test_header_tree_nests_level_three() {
        let result = render("# Title\n\n### Orphan\n\n## A\n\n### A1\n\n### A2\n\n#### Deep\n\n## B\n");
        assert_eq!(result.title.as_deref(), Some("Title"));
        assert_eq!(result.headers.len(), 3);
        assert_eq!(result.headers[0].title, "Orphan");
        assert_eq!(result.headers[1].title, "A");
        let children: Vec<_> = result.headers[1]
            .children
            .iter()
            .map(|h| h.title.as_str())
            .collect();
        assert_eq!(children, vec!["A1", "A2"]);
        assert_eq!(result.headers[2].link, "#b");
    }

    #[test]
    fn test_first_h1_is_title() {
        let result = render("# First\n\n# Second\n");
        assert_eq!(result.title.as_deref(), Some("First"));
        assert!(result.html.contains(r#"id="second""#));
    }

    #[test]
    fn test_inline_markup_in_heading() {
        let result = render("## Use `Builder` *now*\n");
        assert_eq!(result.headers[0].title, "Use Builder now");
        assert!(result.html.contains("<code>Builder</code>"));
        assert!(result.html.contains("<em>now</em>"));
    }

    #[test]
    fn test_body_rendered_between_headings() {
        let result = render("intro\n\n## A\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done\n");
        let intro = result.html.find("<p>intro</p>").unwrap();
        let heading = result.html.find("<h2").unwrap();
        let table = result.html.find("<table>").unwrap();
        assert!(intro < heading && heading < table);
        assert!(result.html.contains("checkbox"));
    }

    #[test]
    fn test_plain_text_collected() {
        let result = render("# Hi\n\nsome **bold** `code`\n");
        let words: Vec<_> = result.text.split_whitespace().collect();
        assert_eq!(words, vec!["Hi", "some", "bold", "code"]);
    }
}
