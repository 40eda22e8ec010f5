//! Bidirectional conversion between the constrained markdown dialect used for
//! seeded blog content and the HTML persisted by the rich-text editor.
//!
//! This module is split into two submodules:
//! - `html`: markdown → HTML (plain and display-styled variants).
//! - `markdown`: HTML → markdown write-back for edit-time display.
//!
//! All functions are total over strings: malformed or adversarial input
//! degrades to literal text, never an error. The conversion is a sequence of
//! ordered substitution passes, not an AST; nested constructs beyond the flat
//! cases covered by the tests are not guaranteed to compose.

mod html;
mod markdown;

pub use html::{markdown_to_html, render_for_display};
pub use markdown::html_to_markdown;

use once_cell::sync::Lazy;
use regex::Regex;

/// Heuristic: does `content` contain at least one HTML element opening tag?
///
/// A regex match for `<letter …>`, not a parser. Text that merely contains a
/// `<` followed by a letter and a later `>` is misclassified; the data model
/// carries no explicit format tag, so this soft classifier is what render
/// paths key off. Empty input is not HTML.
pub fn is_markup_html(content: &str) -> bool {
    static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<[a-z].*>").unwrap());
    HTML_TAG_RE.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_opening_tags() {
        assert!(is_markup_html("<p>hello</p>"));
        assert!(is_markup_html("text with <br /> break"));
        assert!(is_markup_html("<DIV>upper</DIV>"));
        assert!(is_markup_html("<a\nhref=\"x\">split</a>"));
    }

    #[test]
    fn plain_text_is_not_html() {
        assert!(!is_markup_html(""));
        assert!(!is_markup_html("just prose"));
        assert!(!is_markup_html("a < b and c > d"));
        assert!(!is_markup_html("<><>"));
        assert!(!is_markup_html("<3 you"));
    }

    #[test]
    fn conversion_output_reclassifies_as_html() {
        // Once converted, the detector must classify the result as HTML so a
        // second render pass is a no-op.
        for input in ["plain prose", "# Heading", "- a\n- b", "a < b"] {
            let html = markdown_to_html(input);
            assert!(is_markup_html(&html), "not detected as HTML: {html}");
            assert_eq!(markdown_to_html(&html), html);
        }
    }
}
