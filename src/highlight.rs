//! Syntax highlighting for code blocks in committed results and for the
//! editor contents.
//!
//! This is the second rendering phase and it only ever runs against a
//! [`MountedRoot`] that has already been committed. Each `<pre><code>` block
//! is decoded, parsed with the tree-sitter grammar for its language and
//! rewritten with `hljs-*` spans. A block that fails to highlight is left
//! exactly as it was; the failure is logged and the remaining blocks are
//! still processed.

use regex::Regex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::OnceLock;
use tree_sitter::{Node, Parser};

use crate::error::{Result, SqleanError};
use crate::render::{MountedRoot, escape_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Sql,
    JavaScript,
    Json,
}

impl Language {
    /// Resolve a fence tag or editor language name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sql" | "postgres" | "postgresql" | "pgsql" | "mysql" | "bigquery" | "snowflake"
            | "redshift" | "tsql" | "azure" | "plsql" => Some(Language::Sql),
            "javascript" | "js" | "mongodb" | "mongo" | "mongosh" => Some(Language::JavaScript),
            "json" | "dynamodb" => Some(Language::Json),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Sql => "sql",
            Language::JavaScript => "javascript",
            Language::Json => "json",
        }
    }

    /// Guess from the code itself, preferring `hint` when nothing stands out.
    pub fn sniff(code: &str, hint: Option<Language>) -> Language {
        let trimmed = code.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            return Language::Json;
        }
        if trimmed.starts_with("db.")
            || trimmed.starts_with("//")
            || code.contains(".aggregate(")
            || code.contains("'$match'")
            || code.contains("\"$match\"")
        {
            return Language::JavaScript;
        }
        hint.unwrap_or(Language::Sql)
    }

    fn grammar(self) -> tree_sitter::Language {
        match self {
            Language::Sql => tree_sitter::Language::new(tree_sitter_sequel::LANGUAGE),
            Language::JavaScript => tree_sitter::Language::new(tree_sitter_javascript::LANGUAGE),
            Language::Json => tree_sitter::Language::new(tree_sitter_json::LANGUAGE),
        }
    }
}

/// Token classes, named after the hljs theme classes they render to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Comment,
    String,
    Number,
    Keyword,
    BuiltIn,
    Literal,
    Attr,
}

impl TokenKind {
    fn class(self) -> &'static str {
        match self {
            TokenKind::Comment => "hljs-comment",
            TokenKind::String => "hljs-string",
            TokenKind::Number => "hljs-number",
            TokenKind::Keyword => "hljs-keyword",
            TokenKind::BuiltIn => "hljs-built_in",
            TokenKind::Literal => "hljs-literal",
            TokenKind::Attr => "hljs-attr",
        }
    }
}

/// Anonymous keyword tokens in the JavaScript grammar.
const JS_KEYWORDS: &[&str] = &[
    "const", "let", "var", "function", "return", "if", "else", "for", "of", "in", "while", "new",
    "await", "async", "typeof", "instanceof",
];
/// mongosh globals and BSON constructors.
const JS_BUILTINS: &[&str] = &["db", "ISODate", "ObjectId", "NumberLong", "NumberDecimal", "Date", "print"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
    kind: TokenKind,
}

/// The `key` side of an object pair, in JSON or a JavaScript object literal.
fn is_pair_key(node: Node<'_>) -> bool {
    node.parent()
        .filter(|parent| parent.kind() == "pair")
        .and_then(|parent| parent.child_by_field_name("key"))
        .is_some_and(|key| key == node)
}

fn classify_sql(node: Node<'_>, code: &str) -> Option<TokenKind> {
    let kind = node.kind();
    match kind {
        "comment" | "marginalia" => Some(TokenKind::Comment),
        "keyword_true" | "keyword_false" | "keyword_null" => Some(TokenKind::Literal),
        // Covers strings, numbers and TRUE/FALSE/NULL; the latter carry keyword children.
        "literal" => {
            let text = code.get(node.start_byte()..node.end_byte()).unwrap_or("");
            let first = text.chars().next();
            if matches!(first, Some('\'' | '"')) {
                Some(TokenKind::String)
            } else if first.is_some_and(|c| c.is_ascii_digit() || c == '-' || c == '.') {
                Some(TokenKind::Number)
            } else {
                None
            }
        }
        _ if kind.starts_with("keyword_") => Some(TokenKind::Keyword),
        _ => {
            // The function name of a call, not its arguments.
            let is_callee = node
                .parent()
                .filter(|parent| parent.kind() == "invocation")
                .and_then(|parent| parent.named_child(0))
                .is_some_and(|callee| callee == node);
            is_callee.then_some(TokenKind::BuiltIn)
        }
    }
}

fn classify_js(node: Node<'_>, code: &str) -> Option<TokenKind> {
    if is_pair_key(node) {
        return Some(TokenKind::Attr);
    }
    match node.kind() {
        "comment" => Some(TokenKind::Comment),
        "string" | "template_string" | "regex" => Some(TokenKind::String),
        "number" => Some(TokenKind::Number),
        "true" | "false" | "null" | "undefined" => Some(TokenKind::Literal),
        "this" | "super" => Some(TokenKind::Keyword),
        "identifier" => {
            let text = code.get(node.start_byte()..node.end_byte()).unwrap_or("");
            JS_BUILTINS.iter().any(|b| *b == text).then_some(TokenKind::BuiltIn)
        }
        kind if !node.is_named() && JS_KEYWORDS.iter().any(|k| *k == kind) => Some(TokenKind::Keyword),
        _ => None,
    }
}

fn classify_json(node: Node<'_>) -> Option<TokenKind> {
    if is_pair_key(node) {
        return Some(TokenKind::Attr);
    }
    match node.kind() {
        "comment" => Some(TokenKind::Comment),
        "string" => Some(TokenKind::String),
        "number" => Some(TokenKind::Number),
        "true" | "false" | "null" => Some(TokenKind::Literal),
        _ => None,
    }
}

/// Parses source text with one tree-sitter grammar and turns it into
/// escaped markup with token spans. Reuse one per language.
pub struct SyntaxHighlighter {
    language: Language,
    parser: Parser,
}

impl SyntaxHighlighter {
    pub fn new(language: Language) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&language.grammar()).map_err(|e| {
            SqleanError::Rendering(format!("Failed to load {} grammar: {e}", language.name()))
        })?;
        Ok(Self { language, parser })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn spans(&mut self, code: &str) -> Result<Vec<Span>> {
        let tree = self.parser.parse(code, None).ok_or_else(|| {
            SqleanError::Rendering(format!("{} parser returned no tree", self.language.name()))
        })?;

        let mut spans = Vec::new();
        self.collect_spans(tree.root_node(), code, &mut spans);
        spans.sort_by_key(|span| span.start);

        // Earlier spans win over anything they overlap.
        let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
        for span in spans {
            if merged.last().is_none_or(|prev| span.start >= prev.end) {
                merged.push(span);
            }
        }
        Ok(merged)
    }

    /// Once a node is classified its children are not visited.
    fn collect_spans(&self, node: Node<'_>, code: &str, spans: &mut Vec<Span>) {
        let kind = match self.language {
            Language::Sql => classify_sql(node, code),
            Language::JavaScript => classify_js(node, code),
            Language::Json => classify_json(node),
        };
        if let Some(kind) = kind {
            if node.end_byte() > node.start_byte() {
                spans.push(Span {
                    start: node.start_byte(),
                    end: node.end_byte(),
                    kind,
                });
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_spans(child, code, spans);
        }
    }

    /// Escaped markup for `code`. Text outside tokens is copied through, so
    /// the visible text is unchanged.
    pub fn highlight(&mut self, code: &str) -> Result<String> {
        let spans = self.spans(code)?;
        let slice = |start: usize, end: usize| {
            code.get(start..end).ok_or_else(|| {
                SqleanError::Rendering(format!("token range {start}..{end} is not on a char boundary"))
            })
        };

        let mut out = String::with_capacity(code.len() * 2);
        let mut last = 0;
        for span in spans {
            out.push_str(&escape_html(slice(last, span.start)?));
            push_token(&mut out, span.kind, slice(span.start, span.end)?);
            last = span.end;
        }
        out.push_str(&escape_html(slice(last, code.len())?));
        Ok(out)
    }
}

fn push_token(out: &mut String, kind: TokenKind, text: &str) {
    out.push_str("<span class=\"");
    out.push_str(kind.class());
    out.push_str("\">");
    out.push_str(&escape_html(text));
    out.push_str("</span>");
}

/// Highlight plain source text, returning escaped markup with token spans.
pub fn highlight_code(code: &str, language: Language) -> Result<String> {
    SyntaxHighlighter::new(language)?.highlight(code)
}

/// Editor-side highlighting. Falls back to escaped plain text.
pub fn highlight_source(code: &str, language_name: &str) -> String {
    let Some(language) = Language::from_name(language_name) else {
        return escape_html(code);
    };
    match highlight_code(code, language) {
        Ok(html) => html,
        Err(e) => {
            tracing::warn!("Editor highlighting failed: {}", e);
            escape_html(code)
        }
    }
}

/// Reverse the escaping done by the Markdown converter.
pub fn decode_entities(escaped: &str) -> Result<String> {
    let mut out = String::with_capacity(escaped.len());
    let mut rest = escaped;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let semi = tail
            .find(';')
            .filter(|&i| i <= 10)
            .ok_or_else(|| SqleanError::Rendering(format!("unterminated entity near {:?}", truncate(tail))))?;
        let decoded = match &tail[..=semi] {
            "&amp;" => '&',
            "&lt;" => '<',
            "&gt;" => '>',
            "&quot;" => '"',
            "&#39;" | "&#x27;" | "&apos;" => '\'',
            other => {
                return Err(SqleanError::Rendering(format!("unsupported entity {other}")));
            }
        };
        out.push(decoded);
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(12) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Outcome of one highlighting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightReport {
    pub highlighted: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn code_block_regex() -> Result<&'static Regex> {
    static BLOCK: OnceLock<std::result::Result<Regex, String>> = OnceLock::new();
    BLOCK
        .get_or_init(|| {
            Regex::new(r#"(?s)<pre><code(?: class="([^"]*)")?>(.*?)</code></pre>"#)
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| SqleanError::Rendering(format!("code block pattern failed to compile: {e}")))
}

enum BlockOutcome {
    Highlighted(String),
    Skipped,
}

/// One parser per language for the duration of a highlighting pass.
#[derive(Default)]
struct Highlighters {
    by_language: HashMap<Language, SyntaxHighlighter>,
}

impl Highlighters {
    fn get(&mut self, language: Language) -> Result<&mut SyntaxHighlighter> {
        match self.by_language.entry(language) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(SyntaxHighlighter::new(language)?)),
        }
    }
}

fn highlight_block(
    highlighters: &mut Highlighters,
    class: Option<&str>,
    escaped: &str,
    hint: Option<Language>,
) -> Result<BlockOutcome> {
    let classes: Vec<&str> = class.map(|c| c.split_whitespace().collect()).unwrap_or_default();
    if classes.contains(&"hljs") {
        return Ok(BlockOutcome::Skipped);
    }

    let code = decode_entities(escaped)?;
    let tagged = classes.iter().find_map(|c| c.strip_prefix("language-"));
    let language = match tagged {
        Some(tag) => match Language::from_name(tag) {
            Some(language) => language,
            None => {
                tracing::debug!("No grammar for code block language '{}'", tag);
                return Ok(BlockOutcome::Skipped);
            }
        },
        None => Language::sniff(&code, hint),
    };

    let body = highlighters.get(language)?.highlight(&code)?;
    Ok(BlockOutcome::Highlighted(format!(
        "<pre><code class=\"hljs language-{}\">{}</code></pre>",
        language.name(),
        body
    )))
}

/// Highlight every code block in the committed root.
///
/// `hint` is used for untagged blocks whose language cannot be sniffed.
pub fn apply_code_highlighting(root: &mut MountedRoot, hint: Option<Language>) -> HighlightReport {
    let mut report = HighlightReport::default();
    let block_re = match code_block_regex() {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!("Skipping highlighting: {}", e);
            return report;
        }
    };

    let mut highlighters = Highlighters::default();
    let html = root.html();
    let mut out = String::with_capacity(html.len() * 2);
    let mut last = 0;
    for caps in block_re.captures_iter(html) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&html[last..m.start()]);
        let class = caps.get(1).map(|c| c.as_str());
        let escaped = caps.get(2).map(|c| c.as_str()).unwrap_or("");
        match highlight_block(&mut highlighters, class, escaped, hint) {
            Ok(BlockOutcome::Highlighted(block)) => {
                out.push_str(&block);
                report.highlighted += 1;
            }
            Ok(BlockOutcome::Skipped) => {
                out.push_str(m.as_str());
                report.skipped += 1;
            }
            Err(e) => {
                tracing::warn!("Error applying syntax highlighting: {}", e);
                out.push_str(m.as_str());
                report.failed += 1;
            }
        }
        last = m.end();
    }
    out.push_str(&html[last..]);

    if report.highlighted > 0 {
        root.set_html(out);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::render::{ResultsView, render_markdown};

    /// Visible text of a fragment: tags dropped, entities decoded.
    fn visible_text(html: &str) -> String {
        let tags = Regex::new(r"<[^>]*>").expect("tag pattern");
        decode_entities(&tags.replace_all(html, "")).expect("decodable text")
    }

    fn mounted(markdown: &str) -> MountedRoot {
        let mut root = MountedRoot::new();
        let html = render_markdown(markdown, &RenderConfig::default());
        root.mount(&ResultsView::Analysis(html));
        root
    }

    fn spans_of(language: Language, code: &str) -> Vec<(TokenKind, String)> {
        let mut highlighter = SyntaxHighlighter::new(language).expect("grammar should load");
        highlighter
            .spans(code)
            .expect("parse")
            .into_iter()
            .map(|span| (span.kind, code[span.start..span.end].to_string()))
            .collect()
    }

    #[test]
    fn test_grammars_load() {
        for language in [Language::Sql, Language::JavaScript, Language::Json] {
            let highlighter = SyntaxHighlighter::new(language).expect("grammar should load");
            assert_eq!(highlighter.language(), language);
        }
    }

    #[test]
    fn test_sql_tokens() {
        let html = highlight_code("SELECT name FROM users WHERE name = 'John' -- note", Language::Sql)
            .expect("highlight sql");
        assert!(html.contains("<span class=\"hljs-keyword\">SELECT</span>"));
        assert!(html.contains("<span class=\"hljs-keyword\">FROM</span>"));
        assert!(html.contains("<span class=\"hljs-string\">&#39;John&#39;</span>"));
        assert!(html.contains("<span class=\"hljs-comment\">-- note</span>"));
    }

    #[test]
    fn test_sql_numbers() {
        let spans = spans_of(Language::Sql, "SELECT * FROM users WHERE age > 18");
        assert!(spans.contains(&(TokenKind::Number, "18".to_string())));
        assert!(!spans.iter().any(|(_, text)| text == "users"));
    }

    #[test]
    fn test_javascript_tokens() {
        let spans = spans_of(Language::JavaScript, "const n = db.orders.find({ status: 'A', total: 5 });");
        assert!(spans.contains(&(TokenKind::Keyword, "const".to_string())));
        assert!(spans.contains(&(TokenKind::BuiltIn, "db".to_string())));
        assert!(spans.contains(&(TokenKind::Attr, "status".to_string())));
        assert!(spans.contains(&(TokenKind::String, "'A'".to_string())));
        assert!(spans.contains(&(TokenKind::Number, "5".to_string())));
    }

    #[test]
    fn test_empty_source() {
        assert!(spans_of(Language::Sql, "").is_empty());
        assert_eq!(highlight_code("", Language::Json).expect("highlight"), "");
    }

    #[test]
    fn test_json_keys_and_literals() {
        let html = highlight_code(r#"{"TableName": "ProductCatalog", "n": 10, "ok": true}"#, Language::Json)
            .expect("highlight json");
        assert!(html.contains("<span class=\"hljs-attr\">&quot;TableName&quot;</span>:"));
        assert!(html.contains("<span class=\"hljs-string\">&quot;ProductCatalog&quot;</span>"));
        assert!(html.contains("<span class=\"hljs-number\">10</span>"));
        assert!(html.contains("<span class=\"hljs-literal\">true</span>"));
    }

    #[test]
    fn test_highlighting_preserves_text() {
        for (code, lang) in [
            (crate::dialect::Dialect::Postgres.example(), Language::Sql),
            (crate::dialect::Dialect::MongoDb.example(), Language::JavaScript),
            (crate::dialect::Dialect::DynamoDb.example(), Language::Json),
            (crate::dialect::Dialect::BigQuery.example(), Language::Sql),
        ] {
            let html = highlight_code(code, lang).expect("highlight");
            assert_eq!(visible_text(&html), code);
        }
    }

    #[test]
    fn test_sniffing() {
        assert_eq!(Language::sniff("  {\"a\": 1}", None), Language::Json);
        assert_eq!(Language::sniff("db.users.find({})", None), Language::JavaScript);
        assert_eq!(Language::sniff("SELECT 1", None), Language::Sql);
        assert_eq!(Language::sniff("x = 1", Some(Language::JavaScript)), Language::JavaScript);
    }

    #[test]
    fn test_apply_rewrites_blocks_and_keeps_text() {
        let mut root = mounted("### Optimized Code/Query\n```sql\nSELECT a FROM t WHERE b < 3;\n```\n\nUse `b`.\n");
        let before = visible_text(root.html());
        let report = apply_code_highlighting(&mut root, None);
        assert_eq!(report.highlighted, 1);
        assert!(root.html().contains("<pre><code class=\"hljs language-sql\">"));
        assert!(root.html().contains("<span class=\"hljs-keyword\">WHERE</span>"));
        assert!(root.html().contains("<code>b</code>"));
        assert_eq!(visible_text(root.html()), before);
    }

    #[test]
    fn test_untagged_block_uses_sniffing_and_hint() {
        let mut root = mounted("```\n{\"Key\": 1}\n```\n\n```\nfoo bar\n```\n");
        let report = apply_code_highlighting(&mut root, Some(Language::JavaScript));
        assert_eq!(report.highlighted, 2);
        assert!(root.html().contains("language-json"));
        assert!(root.html().contains("language-javascript"));
    }

    #[test]
    fn test_unknown_language_and_already_highlighted_are_skipped() {
        let mut root = mounted("```python\nprint(1)\n```\n");
        let report = apply_code_highlighting(&mut root, None);
        assert_eq!(report.skipped, 1);
        assert!(root.html().contains("class=\"language-python\""));

        let mut root = mounted("```sql\nSELECT 1\n```\n");
        apply_code_highlighting(&mut root, None);
        let once = root.html().to_string();
        let report = apply_code_highlighting(&mut root, None);
        assert_eq!(report.skipped, 1);
        assert_eq!(root.html(), once);
    }

    #[test]
    fn test_failed_block_is_left_untouched() {
        let mut root = MountedRoot::new();
        root.mount(&ResultsView::Analysis(render_markdown("x", &RenderConfig::default())));
        let broken = "<pre><code class=\"language-sql\">SELECT &bogus; FROM t</code></pre>\
<pre><code class=\"language-sql\">SELECT 1</code></pre>";
        root.set_html(broken.to_string());

        let report = apply_code_highlighting(&mut root, None);
        assert_eq!(report.failed, 1);
        assert_eq!(report.highlighted, 1);
        assert!(root.html().contains("SELECT &bogus; FROM t"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &lt; b &amp;&amp; c &gt; d").expect("decode"), "a < b && c > d");
        assert_eq!(decode_entities("&quot;x&#39;").expect("decode"), "\"x'");
        assert!(decode_entities("&nbsp;").is_err());
        assert!(decode_entities("a & b").is_err());
    }

    #[test]
    fn test_highlight_source_falls_back_to_plain() {
        assert_eq!(highlight_source("<x>", "cobol"), "&lt;x&gt;");
        assert!(highlight_source("SELECT 1", "sql").contains("hljs-keyword"));
    }
}
