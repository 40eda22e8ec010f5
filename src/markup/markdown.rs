//! HTML → markdown write-back, used as the edit-time display fallback when a
//! stored document needs to be shown in the plain editor.

use once_cell::sync::Lazy;
use regex::Regex;

static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static H2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h2[^>]*>(.*?)</h2>").unwrap());
static H3_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h3[^>]*>(.*?)</h3>").unwrap());
static H4_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h4[^>]*>(.*?)</h4>").unwrap());

static STRONG_EM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<strong[^>]*><em[^>]*>(.*?)</em></strong>").unwrap());
static EM_STRONG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<em[^>]*><strong[^>]*>(.*?)</strong></em>").unwrap());
static STRONG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<strong[^>]*>(.*?)</strong>").unwrap());
static B_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<b[^>]*>(.*?)</b>").unwrap());
static EM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<em[^>]*>(.*?)</em>").unwrap());
static I_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<i[^>]*>(.*?)</i>").unwrap());

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#).unwrap());
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<code[^>]*>(.*?)</code>").unwrap());
static QUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<blockquote[^>]*>(.*?)</blockquote>").unwrap());

static UL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<ul[^>]*>(.*?)</ul>").unwrap());
static OL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<ol[^>]*>(.*?)</ol>").unwrap());
static LI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap());

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static P_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[^>]+>").unwrap());
static EXCESS_NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Convert an HTML fragment back to the constrained markdown dialect.
///
/// Lossy on nested or overlapping structure (the passes are ordered
/// substitutions, same as the forward direction); ordered lists are
/// renumbered sequentially from 1 regardless of source numbering. Whatever
/// tags remain after the known passes are stripped, and the four entities
/// the forward direction can emit are decoded.
pub fn html_to_markdown(content: &str) -> String {
    let text = H1_RE.replace_all(content, "# $1\n\n");
    let text = H2_RE.replace_all(&text, "## $1\n\n");
    let text = H3_RE.replace_all(&text, "### $1\n\n");
    let text = H4_RE.replace_all(&text, "#### $1\n\n");

    let text = STRONG_EM_RE.replace_all(&text, "***$1***");
    let text = EM_STRONG_RE.replace_all(&text, "***$1***");
    let text = STRONG_RE.replace_all(&text, "**$1**");
    let text = B_RE.replace_all(&text, "**$1**");
    let text = EM_RE.replace_all(&text, "*$1*");
    let text = I_RE.replace_all(&text, "*$1*");

    let text = LINK_RE.replace_all(&text, "[$2]($1)");
    let text = CODE_RE.replace_all(&text, "`$1`");
    let text = QUOTE_RE.replace_all(&text, "> $1\n\n");

    let text = UL_RE.replace_all(&text, |caps: &regex::Captures| {
        let mut out = String::new();
        for item in LI_RE.captures_iter(&caps[1]) {
            out.push_str("- ");
            out.push_str(item[1].trim());
            out.push('\n');
        }
        out.push('\n');
        out
    });
    let text = OL_RE.replace_all(&text, |caps: &regex::Captures| {
        let mut out = String::new();
        for (idx, item) in LI_RE.captures_iter(&caps[1]).enumerate() {
            out.push_str(&format!("{}. {}\n", idx + 1, item[1].trim()));
        }
        out.push('\n');
        out
    });

    let text = BR_RE.replace_all(&text, "\n");
    let text = P_RE.replace_all(&text, "$1\n\n");
    let text = ANY_TAG_RE.replace_all(&text, "");

    let text = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&");

    EXCESS_NEWLINES_RE
        .replace_all(&text, "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::markdown_to_html;

    #[test]
    fn headings_round_back() {
        assert_eq!(html_to_markdown("<h1>Title</h1>"), "# Title");
        assert_eq!(
            html_to_markdown("<h2 class=\"x\">A</h2><h4>B</h4>"),
            "## A\n\n#### B"
        );
    }

    #[test]
    fn emphasis_variants() {
        assert_eq!(html_to_markdown("<strong><em>x</em></strong>"), "***x***");
        assert_eq!(html_to_markdown("<em><strong>x</strong></em>"), "***x***");
        assert_eq!(html_to_markdown("<strong>x</strong>"), "**x**");
        assert_eq!(html_to_markdown("<b>x</b>"), "**x**");
        assert_eq!(html_to_markdown("<em>x</em>"), "*x*");
        assert_eq!(html_to_markdown("<i>x</i>"), "*x*");
    }

    #[test]
    fn links_code_quotes() {
        assert_eq!(
            html_to_markdown("<a href=\"https://example.com\">Go</a>"),
            "[Go](https://example.com)"
        );
        assert_eq!(html_to_markdown("<code>x()</code>"), "`x()`");
        assert_eq!(html_to_markdown("<blockquote>wise</blockquote>"), "> wise");
    }

    #[test]
    fn ordered_lists_are_renumbered_from_one() {
        assert_eq!(
            html_to_markdown("<ol><li>x</li><li>y</li></ol>"),
            "1. x\n2. y"
        );
        // Source numbering is irrelevant; items come back 1..N.
        assert_eq!(
            html_to_markdown("<ul><li>a</li><li>b</li><li>c</li></ul>"),
            "- a\n- b\n- c"
        );
    }

    #[test]
    fn paragraphs_and_breaks() {
        assert_eq!(html_to_markdown("<p>a</p><p>b</p>"), "a\n\nb");
        assert_eq!(html_to_markdown("<p>a<br />b</p>"), "a\nb");
        assert_eq!(html_to_markdown("<p>a<br>b</p>"), "a\nb");
    }

    #[test]
    fn unknown_tags_stripped_and_entities_decoded() {
        assert_eq!(
            html_to_markdown("<section><p>a &amp; b &lt; c&nbsp;&gt; d</p></section>"),
            "a & b < c > d"
        );
    }

    #[test]
    fn excess_newlines_collapse() {
        assert_eq!(
            html_to_markdown("<h1>A</h1>\n\n\n\n<p>b</p>"),
            "# A\n\nb"
        );
    }

    #[test]
    fn never_panics_on_noise() {
        for s in ["", "<><>", "<p>unclosed", "</em>**", "<a href=\">broken</a>"] {
            let _ = html_to_markdown(s);
        }
    }

    #[test]
    fn flat_round_trip() {
        for s in [
            "plain prose with no syntax",
            "first paragraph\n\nsecond paragraph",
            "line one\nline two",
            "# Title",
            "- a\n- b\n- c",
            "1. x\n2. y",
            "**bold** and *italic* and ***both***",
            "[Go](https://example.com)",
        ] {
            assert_eq!(html_to_markdown(&markdown_to_html(s)), s, "input: {s:?}");
        }
    }
}
