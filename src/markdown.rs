//! Renderer for the small markdown dialect used in proof documents.
//!
//! Proof files (`AC.md`, `DEMO.md`, `DELTA.md`) are short and written by hand,
//! so the renderer supports exactly what they use and nothing else:
//!
//! | Block | Syntax |
//! |-------|--------|
//! | Heading | `#` to `######` followed by a space |
//! | Bullet list | `-`, `*` or `+` followed by a space (one level, no nesting) |
//! | Code fence | three backticks, optional language label |
//! | Paragraph | any other run of non-blank lines, joined with a space |
//!
//! Inline markup is applied to headings, paragraphs and list items, never to
//! code blocks. Every literal fragment is HTML-escaped *before* any markup is
//! added, so the output is always safe to embed in a page.
//!
//! ## Inline passes
//!
//! Inline formatting is a fixed pipeline of rewrites over the escaped text:
//!
//! ```text
//! link  →  bold  →  italic  →  inline code  →  autolink
//! ```
//!
//! Passes after the first never rewrite an attribute produced by an earlier
//! pass. Bold, italic and autolinking work on the text *between* tags; inline
//! code pairs backticks across the whole line, so a code span can wrap text
//! the emphasis passes already marked up. Autolinking runs last and skips
//! anything already inside an anchor, so `[label](https://x.test)` yields
//! exactly one link. Bold text cannot contain `*`, so `***x***` renders as
//! `*<strong>x</strong>*`.

use regex::Regex;
use std::sync::LazyLock;

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\((https?://[^\s)]+)\)").expect("markdown link pattern")
});
static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").expect("bold pattern"));
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s(])(https?://[^\s<)]+)").expect("bare url pattern"));
static FIRST_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").expect("first url pattern"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("heading pattern"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+]\s+(.*)$").expect("bullet pattern"));

const FENCE: &str = "```";

/// Escape `& < > " '` for use in HTML text or attribute values.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// First absolute `http(s)://` URL in raw markdown, if any.
///
/// Used to pull the demo link out of `DEMO.md`. The match stops at whitespace
/// or a closing parenthesis, so `[demo](https://x.test/v)` yields
/// `https://x.test/v`.
pub fn extract_first_url(markdown: &str) -> Option<String> {
    FIRST_URL.find(markdown).map(|m| m.as_str().to_string())
}

/// The block currently being accumulated by [`markdown_to_html`].
enum Block {
    None,
    Paragraph(Vec<String>),
    List(Vec<String>),
    CodeFence { lang: String, lines: Vec<String> },
}

/// Render the proof-document markdown dialect to an HTML fragment.
///
/// Blocks are separated by `\n`. Empty or whitespace-only input renders to an
/// empty string rather than an empty paragraph.
pub fn markdown_to_html(markdown: &str) -> String {
    if markdown.trim().is_empty() {
        return String::new();
    }

    let normalized = markdown.replace("\r\n", "\n").replace('\r', "\n");
    let mut chunks: Vec<String> = Vec::new();
    let mut block = Block::None;

    for line in normalized.split('\n') {
        if let Block::CodeFence { lines, .. } = &mut block {
            if line.starts_with(FENCE) {
                flush(std::mem::replace(&mut block, Block::None), &mut chunks);
            } else {
                lines.push(line.to_string());
            }
            continue;
        }

        if let Some(label) = line.strip_prefix(FENCE) {
            flush(std::mem::replace(&mut block, Block::None), &mut chunks);
            block = Block::CodeFence {
                lang: label.trim().to_string(),
                lines: Vec::new(),
            };
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(std::mem::replace(&mut block, Block::None), &mut chunks);
            continue;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            flush(std::mem::replace(&mut block, Block::None), &mut chunks);
            let level = caps[1].len();
            chunks.push(format!(
                "<h{level}>{}</h{level}>",
                format_inline(caps[2].trim())
            ));
            continue;
        }

        if let Some(caps) = BULLET.captures(trimmed) {
            let item = caps[1].to_string();
            match &mut block {
                Block::List(items) => items.push(item),
                _ => {
                    flush(std::mem::replace(&mut block, Block::None), &mut chunks);
                    block = Block::List(vec![item]);
                }
            }
            continue;
        }

        match &mut block {
            Block::Paragraph(lines) => lines.push(trimmed.to_string()),
            _ => {
                flush(std::mem::replace(&mut block, Block::None), &mut chunks);
                block = Block::Paragraph(vec![trimmed.to_string()]);
            }
        }
    }

    // An unterminated fence is closed by end of input.
    flush(block, &mut chunks);

    chunks.join("\n")
}

/// Emit the HTML for a finished block, if it produced any.
fn flush(block: Block, chunks: &mut Vec<String>) {
    match block {
        Block::None => {}
        Block::Paragraph(lines) => {
            let text = lines.join(" ");
            let text = text.trim();
            if !text.is_empty() {
                chunks.push(format!("<p>{}</p>", format_inline(text)));
            }
        }
        Block::List(items) => {
            let items: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", format_inline(item)))
                .collect();
            chunks.push(format!("<ul>{items}</ul>"));
        }
        Block::CodeFence { lang, lines } => {
            let body = escape_html(&lines.join("\n"));
            if lang.is_empty() {
                chunks.push(format!("<pre><code>{body}</code></pre>"));
            } else {
                chunks.push(format!(
                    "<pre><code data-lang=\"{}\">{body}</code></pre>",
                    escape_html(&lang)
                ));
            }
        }
    }
}

// ============================================================================
// Inline passes
// ============================================================================

/// Escape a line of text and apply the inline passes in order.
pub(crate) fn format_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let linked = links(&escaped);
    let bolded = map_text_runs(&linked, |run, _| bold(run));
    let emphasized = map_text_runs(&bolded, |run, _| italic(run));
    let coded = inline_code(&emphasized);
    map_text_runs(&coded, |run, inside| {
        if inside.anchor {
            run.to_string()
        } else {
            autolink(run)
        }
    })
}

/// `[label](http(s)://url)` → anchor. Runs on escaped text with no tags yet.
fn links(escaped: &str) -> String {
    MARKDOWN_LINK
        .replace_all(escaped, r#"<a href="${2}" rel="noopener noreferrer">${1}</a>"#)
        .into_owned()
}

/// `**text**` → `<strong>`.
fn bold(run: &str) -> String {
    BOLD.replace_all(run, "<strong>${1}</strong>").into_owned()
}

/// `*text*` → `<em>`, where neither delimiter touches another `*`.
///
/// Leftover `**` pairs that the bold pass could not close are left alone.
fn italic(run: &str) -> String {
    let bytes = run.as_bytes();
    let mut out = String::with_capacity(run.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let opens = bytes[i] == b'*' && (i == 0 || bytes[i - 1] != b'*');
        if opens {
            if let Some(offset) = run[i + 1..].find('*') {
                let close = i + 1 + offset;
                let isolated = bytes.get(close + 1) != Some(&b'*');
                if close > i + 1 && isolated {
                    out.push_str(&run[copied..i]);
                    out.push_str("<em>");
                    out.push_str(&run[i + 1..close]);
                    out.push_str("</em>");
                    i = close + 1;
                    copied = i;
                    continue;
                }
            }
        }
        i += 1;
    }

    out.push_str(&run[copied..]);
    out
}

/// `` `code` `` → `<code>`.
///
/// Backticks pair left to right across the whole line, skipping any inside a
/// tag, and an empty pair is not a span.
fn inline_code(html: &str) -> String {
    let mut in_tag = false;
    let mut ticks = Vec::new();
    for (i, c) in html.char_indices() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            '`' if !in_tag => ticks.push(i),
            _ => {}
        }
    }

    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut k = 0;
    while k + 1 < ticks.len() {
        let (open, close) = (ticks[k], ticks[k + 1]);
        if close == open + 1 {
            k += 1;
            continue;
        }
        out.push_str(&html[copied..open]);
        out.push_str("<code>");
        out.push_str(&html[open + 1..close]);
        out.push_str("</code>");
        copied = close + 1;
        k += 2;
    }
    out.push_str(&html[copied..]);
    out
}

/// Bare `http(s)://` URL → anchor.
fn autolink(run: &str) -> String {
    BARE_URL
        .replace_all(
            run,
            r#"${1}<a href="${2}" rel="noopener noreferrer">${2}</a>"#,
        )
        .into_owned()
}

/// Elements enclosing a text run seen by [`map_text_runs`].
#[derive(Debug, Clone, Copy, Default)]
struct Inside {
    anchor: bool,
}

/// Apply `rewrite` to every text run between tags, leaving tags untouched.
///
/// Input is already escaped, so every `<` starts a tag produced by an
/// earlier pass.
fn map_text_runs(html: &str, mut rewrite: impl FnMut(&str, Inside) -> String) -> String {
    let mut out = String::with_capacity(html.len());
    let mut anchor_depth = 0usize;
    let mut rest = html;

    while !rest.is_empty() {
        let inside = Inside {
            anchor: anchor_depth > 0,
        };
        match rest.find('<') {
            Some(0) => {
                let end = rest.find('>').map_or(rest.len(), |i| i + 1);
                let tag = &rest[..end];
                match tag {
                    "</a>" => anchor_depth = anchor_depth.saturating_sub(1),
                    _ if tag.starts_with("<a ") => anchor_depth += 1,
                    _ => {}
                }
                out.push_str(tag);
                rest = &rest[end..];
            }
            Some(start) => {
                out.push_str(&rewrite(&rest[..start], inside));
                rest = &rest[start..];
            }
            None => {
                out.push_str(&rewrite(rest, inside));
                rest = "";
            }
        }
    }

    out
}
