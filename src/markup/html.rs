//! Markdown → HTML rendering as ordered substitution passes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::is_markup_html;

/// Presentation class per emitted element. The plain variant leaves every
/// class empty; the display variant carries the public site's fixed utility
/// classes. Inline code is emitted bare in both variants.
struct ElementClasses {
    h1: &'static str,
    h2: &'static str,
    h3: &'static str,
    h4: &'static str,
    strong: &'static str,
    em: &'static str,
    link: &'static str,
    blockquote: &'static str,
    ul: &'static str,
    ol: &'static str,
    p: &'static str,
}

const PLAIN: ElementClasses = ElementClasses {
    h1: "",
    h2: "",
    h3: "",
    h4: "",
    strong: "",
    em: "",
    link: "",
    blockquote: "",
    ul: "",
    ol: "",
    p: "",
};

const DISPLAY: ElementClasses = ElementClasses {
    h1: "text-4xl font-bold text-gray-900 mb-6",
    h2: "text-3xl font-bold text-gray-900 mb-5",
    h3: "text-2xl font-semibold text-gray-900 mb-4",
    h4: "text-xl font-semibold text-gray-900 mb-3",
    strong: "font-bold text-gray-900",
    em: "italic",
    link: "text-blue-600 hover:underline",
    blockquote: "border-l-4 border-blue-200 pl-4 italic text-gray-600 my-4",
    ul: "list-disc list-inside space-y-1 mb-4",
    ol: "list-decimal list-inside space-y-1 mb-4",
    p: "text-gray-700 leading-relaxed mb-4",
};

/// ` class="…"` when a class is set, empty otherwise.
fn class_attr(class: &str) -> String {
    if class.is_empty() {
        String::new()
    } else {
        format!(" class=\"{class}\"")
    }
}

/// Convert the constrained markdown dialect to an HTML fragment.
///
/// Input that the detector already classifies as HTML passes through
/// unchanged, which makes the conversion idempotent.
pub fn markdown_to_html(content: &str) -> String {
    convert(content, &PLAIN)
}

/// Same pipeline as [`markdown_to_html`] but with the public site's
/// presentation classes on each emitted element. Display only, never stored.
pub fn render_for_display(content: &str) -> String {
    convert(content, &DISPLAY)
}

static H4_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#### (.*)$").unwrap());
static H3_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### (.*)$").unwrap());
static H2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.*)$").unwrap());
static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.*)$").unwrap());

static BOLD_ITALIC_STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*\*(.+?)\*\*\*").unwrap());
static BOLD_STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").unwrap());
static ITALIC_STAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").unwrap());
static BOLD_ITALIC_UNDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"___(.+?)___").unwrap());
static BOLD_UNDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").unwrap());
static ITALIC_UNDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_(.+?)_").unwrap());

static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap());
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").unwrap());

// Escaping runs before this pass, so a quoted line starts with `&gt; `.
static QUOTE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^&gt; (.*)$").unwrap());

static BLOCK_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());
static BLOCK_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<(h[1-4]|ul|ol|li|blockquote|p|div)").unwrap());
static ORDERED_ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\. ").unwrap());

fn convert(content: &str, classes: &ElementClasses) -> String {
    if is_markup_html(content) {
        return content.to_string();
    }

    // Escape the HTML-significant characters before any tag is emitted.
    let escaped = content
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    // Headings, longest prefix first so `####` never parses as `#` + `###`.
    let text = H4_RE.replace_all(&escaped, format!("<h4{}>$1</h4>", class_attr(classes.h4)));
    let text = H3_RE.replace_all(&text, format!("<h3{}>$1</h3>", class_attr(classes.h3)));
    let text = H2_RE.replace_all(&text, format!("<h2{}>$1</h2>", class_attr(classes.h2)));
    let text = H1_RE.replace_all(&text, format!("<h1{}>$1</h1>", class_attr(classes.h1)));

    // Emphasis, triple before double before single, `*` family then `_`.
    let strong_attr = class_attr(classes.strong);
    let em_attr = class_attr(classes.em);
    let bold_italic = format!("<strong{strong_attr}><em{em_attr}>$1</em></strong>");
    let bold = format!("<strong{strong_attr}>$1</strong>");
    let italic = format!("<em{em_attr}>$1</em>");
    let text = BOLD_ITALIC_STAR_RE.replace_all(&text, bold_italic.as_str());
    let text = BOLD_STAR_RE.replace_all(&text, bold.as_str());
    let text = ITALIC_STAR_RE.replace_all(&text, italic.as_str());
    let text = BOLD_ITALIC_UNDER_RE.replace_all(&text, bold_italic.as_str());
    let text = BOLD_UNDER_RE.replace_all(&text, bold.as_str());
    let text = ITALIC_UNDER_RE.replace_all(&text, italic.as_str());

    let text = LINK_RE.replace_all(
        &text,
        format!("<a href=\"$2\"{}>$1</a>", class_attr(classes.link)),
    );
    let text = CODE_RE.replace_all(&text, "<code>$1</code>");

    // Line-level blockquotes: each matching line becomes its own element.
    let text = QUOTE_RE.replace_all(
        &text,
        format!(
            "<blockquote{}>$1</blockquote>",
            class_attr(classes.blockquote)
        ),
    );

    // Block assembly: split on blank lines, classify each block, join with no
    // separator, dropping blocks that end up empty.
    BLOCK_SPLIT_RE
        .split(&text)
        .filter_map(|block| convert_block(block, classes))
        .collect()
}

fn convert_block(block: &str, classes: &ElementClasses) -> Option<String> {
    let trimmed = block.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Already block-level markup (a converted heading or quote line, or any
    // tag an earlier pass emitted at block start): pass through unchanged.
    if BLOCK_TAG_RE.is_match(trimmed) {
        return Some(trimmed.to_string());
    }

    let lines: Vec<&str> = trimmed.lines().collect();

    if lines
        .iter()
        .all(|l| l.is_empty() || l.starts_with("- "))
    {
        let items: String = lines
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| format!("<li>{}</li>", &l[2..]))
            .collect();
        return Some(format!("<ul{}>{items}</ul>", class_attr(classes.ul)));
    }

    if lines
        .iter()
        .all(|l| l.is_empty() || ORDERED_ITEM_RE.is_match(l))
    {
        let items: String = lines
            .iter()
            .filter(|l| !l.is_empty())
            .map(|l| format!("<li>{}</li>", ORDERED_ITEM_RE.replace(l, "")))
            .collect();
        return Some(format!("<ol{}>{items}</ol>", class_attr(classes.ol)));
    }

    let body = trimmed.replace('\n', "<br />");
    Some(format!("<p{}>{body}</p>", class_attr(classes.p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_passthrough_is_identity() {
        let html = "<p>already <strong>rendered</strong></p>";
        assert_eq!(markdown_to_html(html), html);
        assert_eq!(render_for_display(html), html);
    }

    #[test]
    fn heading_levels() {
        assert_eq!(markdown_to_html("# Title"), "<h1>Title</h1>");
        assert_eq!(markdown_to_html("## Title"), "<h2>Title</h2>");
        assert_eq!(markdown_to_html("### Title"), "<h3>Title</h3>");
        assert_eq!(markdown_to_html("#### Title"), "<h4>Title</h4>");
        // Level 5+ never exists; the extra hash stays literal inside an h4.
        assert_eq!(markdown_to_html("##### Title"), "<h4># Title</h4>");
    }

    #[test]
    fn emphasis_precedence() {
        assert_eq!(
            markdown_to_html("***both***"),
            "<p><strong><em>both</em></strong></p>"
        );
        assert_eq!(markdown_to_html("**bold**"), "<p><strong>bold</strong></p>");
        assert_eq!(markdown_to_html("*italic*"), "<p><em>italic</em></p>");
        assert_eq!(
            markdown_to_html("___both___"),
            "<p><strong><em>both</em></strong></p>"
        );
        assert_eq!(markdown_to_html("__bold__"), "<p><strong>bold</strong></p>");
        assert_eq!(markdown_to_html("_italic_"), "<p><em>italic</em></p>");
    }

    #[test]
    fn emphasis_inside_heading() {
        assert_eq!(
            markdown_to_html("## New **frames** in stock"),
            "<h2>New <strong>frames</strong> in stock</h2>"
        );
    }

    #[test]
    fn links_and_code() {
        assert_eq!(
            markdown_to_html("[Go](https://example.com)"),
            "<p><a href=\"https://example.com\">Go</a></p>"
        );
        assert_eq!(markdown_to_html("`lens()`"), "<p><code>lens()</code></p>");
    }

    #[test]
    fn line_level_blockquotes() {
        // Each matching line becomes its own element; adjacent quote lines
        // are not grouped, and the block passes through as block-level markup.
        assert_eq!(
            markdown_to_html("> first\n> second"),
            "<blockquote>first</blockquote>\n<blockquote>second</blockquote>"
        );
    }

    #[test]
    fn unordered_list_block() {
        assert_eq!(
            markdown_to_html("- a\n- b\n- c"),
            "<ul><li>a</li><li>b</li><li>c</li></ul>"
        );
    }

    #[test]
    fn ordered_list_block() {
        assert_eq!(
            markdown_to_html("1. x\n2. y"),
            "<ol><li>x</li><li>y</li></ol>"
        );
        // Mixed lines fall back to a paragraph.
        assert_eq!(
            markdown_to_html("1. x\nplain"),
            "<p>1. x<br />plain</p>"
        );
    }

    #[test]
    fn paragraphs_and_escaping() {
        assert_eq!(markdown_to_html("a < b"), "<p>a &lt; b</p>");
        assert_eq!(markdown_to_html("x & y > z"), "<p>x &amp; y &gt; z</p>");
        assert_eq!(
            markdown_to_html("line one\nline two"),
            "<p>line one<br />line two</p>"
        );
        assert_eq!(
            markdown_to_html("first block\n\nsecond block"),
            "<p>first block</p><p>second block</p>"
        );
    }

    #[test]
    fn empty_blocks_are_dropped() {
        assert_eq!(markdown_to_html(""), "");
        assert_eq!(markdown_to_html("\n\n\n"), "");
        assert_eq!(markdown_to_html("a\n\n\n\nb"), "<p>a</p><p>b</p>");
    }

    #[test]
    fn never_panics_on_noise() {
        for s in [
            "**bold without close",
            "*a**b***c",
            "[text](no-close",
            "`tick",
            "####",
            "<><>",
            "> ",
            "1.x\n2. y",
        ] {
            let _ = markdown_to_html(s);
            let _ = render_for_display(s);
        }
    }

    #[test]
    fn display_variant_injects_classes() {
        let html = render_for_display("# Welcome");
        assert_eq!(
            html,
            "<h1 class=\"text-4xl font-bold text-gray-900 mb-6\">Welcome</h1>"
        );
        let para = render_for_display("hello");
        assert!(para.starts_with("<p class=\""));
        let list = render_for_display("- a");
        assert!(list.starts_with("<ul class=\""));
        assert!(list.contains("<li>a</li>"));
    }
}
