//! Jekyll rendering of a post.
//!
//! Everything here is a pure function of the [`PostContent`] passed in: no
//! clock, no I/O. Rendering the same content twice yields the same output.

use crate::types::PostContent;

const TITLE_SEPARATORS: [char; 4] = ['-', '–', '—', '|'];
const TITLE_EMOJI: &str = "🔗";
const EXCERPT_SEPARATOR: &str = "<!--more-->";
const SLUG_MAX_LEN: usize = 50;

/// Strip the site name that pages usually append to their title,
/// e.g. `"Article Title - Site Name"` becomes `"Article Title"`.
pub fn display_title(page_title: &str) -> String {
    let title = page_title.trim();

    match title.find(|c: char| TITLE_SEPARATORS.contains(&c)) {
        Some(index) => {
            let head = title[..index].trim();
            // a title starting with a separator keeps its full text
            if head.is_empty() {
                title.to_owned()
            } else {
                head.to_owned()
            }
        }
        None => title.to_owned(),
    }
}

pub fn render_markdown(content: &PostContent) -> String {
    let title = display_title(&content.page_title).replace('"', "\\\"");

    let mut markdown = format!(
        "---\ntitle: \"{} {}\"\nexcerpt_separator: \"{}\"\ntags:\n  - quotes\n---\n{}\n\n{}",
        TITLE_EMOJI,
        title,
        EXCERPT_SEPARATOR,
        content.thoughts,
        block_quote(&content.quotation),
    );

    if let Some(url) = content.source_url.as_deref().filter(|url| !url.is_empty()) {
        markdown.push_str(&format!("\n\n[Full article]({})", url));
    }

    markdown
}

pub fn render_filename(content: &PostContent) -> String {
    format!(
        "{}-{}.md",
        content.timestamp.format("%Y-%m-%d"),
        slug(&content.page_title)
    )
}

pub fn commit_message(content: &PostContent) -> String {
    format!("Add new post: {}", display_title(&content.page_title))
}

fn slug(title: &str) -> String {
    title
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .take(SLUG_MAX_LEN)
        .collect()
}

fn block_quote(quotation: &str) -> String {
    quotation
        .split('\n')
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
