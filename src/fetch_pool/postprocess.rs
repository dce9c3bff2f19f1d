//! Post-processing of fetched Markdown-style text: strip image syntax and
//! hyperlinks, strip URLs from heading lines, and truncate at navigational
//! boundary headings.

use std::sync::LazyLock;

use regex::Regex;

use crate::utils::constants::NOT_FOUND_PHRASE;

static IMAGE_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[.*?\]\([^)]+\)").expect("valid regex"));

static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]+\)").expect("valid regex"));

static HEADING_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,6}\s.*?)\s*\(https?://[^)]+\)\s*$").expect("valid regex"));

const TRUNCATE_HEADINGS: [&str; 2] = ["## Topics", "## See Also"];

/// Apply the post-processing pipeline to raw extracted Markdown text.
#[must_use]
pub fn post_process(text: &str) -> String {
    let mut out = IMAGE_SYNTAX.replace_all(text, "").into_owned();
    out = HEADING_URL.replace_all(&out, "$1").into_owned();
    out = INLINE_LINK.replace_all(&out, "$1").into_owned();

    if let Some(cut) = TRUNCATE_HEADINGS
        .iter()
        .filter_map(|h| out.find(h))
        .min()
    {
        out.truncate(cut);
    }

    out.trim().to_string()
}

/// Does the fetched body contain the hard-coded "page not found" phrase?
#[must_use]
pub fn contains_not_found_phrase(text: &str) -> bool {
    text.contains(NOT_FOUND_PHRASE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_image_syntax() {
        let input = "Before ![alt text](http://x/img.png) after";
        assert_eq!(post_process(input), "Before  after");
    }

    #[test]
    fn strips_hyperlinks_keeping_anchor_text() {
        let input = "See [the guide](https://example.com/guide) for details.";
        assert_eq!(post_process(input), "See the guide for details.");
    }

    #[test]
    fn strips_urls_from_heading_lines() {
        let input = "## Overview (https://example.com/overview)\nBody text.";
        assert_eq!(post_process(input), "## Overview\nBody text.");
    }

    #[test]
    fn truncates_at_topics_heading() {
        let input = "Primary content here.\n\n## Topics\n- link one\n- link two";
        assert_eq!(post_process(input), "Primary content here.");
    }

    #[test]
    fn truncates_at_see_also_heading() {
        let input = "Primary content here.\n\n## See Also\n- related";
        assert_eq!(post_process(input), "Primary content here.");
    }

    #[test]
    fn detects_not_found_phrase() {
        assert!(contains_not_found_phrase(
            "Error: The page you're looking for can't be found."
        ));
        assert!(!contains_not_found_phrase("All good here."));
    }
}
