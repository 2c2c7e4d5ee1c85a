//! Markdown to HTML for analysis results, plus the result panel markup.
//!
//! Rendering is the first of two phases. It is pure: Markdown text in,
//! structural HTML out. Highlighting runs later against the committed
//! [`MountedRoot`] (see `highlight`).
//!
//! Trust boundary: the Markdown comes from the model, which echoes user
//! query text. Raw HTML in the source is escaped by the converter, nothing
//! else sanitizes the output.

use pulldown_cmark::{Event, Options, Parser, html};
use std::fmt;

use crate::config::RenderConfig;

/// HTML produced by the renderer.
///
/// Raw HTML from the Markdown source has been escaped. Link and image URLs
/// are passed through unchanged, so a `javascript:` href survives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn build_options(config: &RenderConfig) -> Options {
    let mut options = Options::empty();
    if config.gfm {
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
    }
    options
}

/// Convert Markdown into structural HTML.
pub fn render_markdown(markdown: &str, config: &RenderConfig) -> SafeHtml {
    let parser = Parser::new_ext(markdown, build_options(config)).map(|event| match event {
        // Raw HTML is shown as text, never interpreted.
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, parser);
    SafeHtml(out)
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// What the results region shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultsView {
    Empty,
    Loading,
    Error(String),
    Analysis(SafeHtml),
}

pub const LOADING_TEXT: &str = "SQLean.fyi is analyzing your code...";
pub const LOADING_HINT: &str = "This may take a few moments for complex queries.";
pub const ERROR_TITLE: &str = "An Error Occurred";
pub const EMPTY_TITLE: &str = "Analysis Will Appear Here";
pub const EMPTY_HINT: &str = "Enter your code on the left, select the database system, and click \
\"Optimize Query\" to get an expert analysis from SQLean.fyi.";

impl ResultsView {
    /// Panel markup for this view.
    pub fn to_html(&self) -> String {
        match self {
            ResultsView::Empty => format!(
                "<div class=\"placeholder\"><h3>{EMPTY_TITLE}</h3><p>{}</p></div>",
                escape_html(EMPTY_HINT)
            ),
            ResultsView::Loading => format!(
                "<div class=\"loading\"><p>{LOADING_TEXT}</p><p class=\"hint\">{LOADING_HINT}</p></div>"
            ),
            ResultsView::Error(message) => format!(
                "<div class=\"error\"><h3>{ERROR_TITLE}</h3><p>{}</p></div>",
                escape_html(message)
            ),
            ResultsView::Analysis(body) => format!("<div class=\"prose\">\n{body}</div>"),
        }
    }
}

/// The committed, visible structure of the results region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountedRoot {
    html: String,
    commits: u64,
}

impl MountedRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the visible contents with `view`.
    pub fn mount(&mut self, view: &ResultsView) {
        self.html = view.to_html();
        self.commits += 1;
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub(crate) fn set_html(&mut self, html: String) {
        self.html = html;
    }

    /// Number of commits so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }
}
