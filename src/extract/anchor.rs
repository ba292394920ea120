//! Anchor matching on a route's detail page.
//!
//! A route page carries a self-referential label span linking to its parent
//! crag. The label's spelling drifts from the path slug (curly apostrophes,
//! casing), so matching is by a tolerant prefix pattern rather than equality.

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::ResolveError;

/// The matched label element, reduced to what the resolver needs.
#[derive(Debug, Clone)]
pub struct RouteAnchor {
    /// Full label text, stripped.
    pub text: String,
    /// `href` of the hyperlink inside the label, when present.
    pub crag_href: Option<String>,
}

// Selector literals are compile-time constants; parse cannot fail on them.
fn span_selector() -> Selector {
    Selector::parse("span").unwrap()
}

fn link_selector() -> Selector {
    Selector::parse("a").unwrap()
}

fn secondary_selector() -> Selector {
    Selector::parse("a.text-break.text-muted.small").unwrap()
}

/// Build the prefix pattern for a route's leading name word: every letter may
/// be followed by a straight or curly apostrophe, and matching is
/// case-insensitive. `Devils` therefore also matches `Devil's Tower`.
fn anchor_pattern(stem: &str) -> Regex {
    let mut pattern = String::from("(?i)^");
    for c in stem.chars() {
        if c.is_ascii_alphabetic() {
            pattern.push(c);
            pattern.push_str("['’]?");
        } else {
            pattern.push_str(&regex::escape(&c.to_string()));
        }
    }
    Regex::new(&pattern).expect("anchor pattern built from escaped input")
}

fn stripped_text(element: scraper::ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the first span whose text begins with the route's leading name word.
///
/// `stem` is the first word of the normalized display name. A miss is a
/// `PatternMiss` and never fatal to the batch.
pub fn find_route_anchor(page: &Html, stem: &str) -> Result<RouteAnchor, ResolveError> {
    let pattern = anchor_pattern(stem);

    for span in page.select(&span_selector()) {
        let text = stripped_text(span);
        if !pattern.is_match(&text) {
            continue;
        }

        let crag_href = span
            .select(&link_selector())
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string);

        return Ok(RouteAnchor { text, crag_href });
    }

    Err(ResolveError::PatternMiss(format!(
        "no anchor span starting with '{}'",
        stem
    )))
}

/// The styled external reference anchor some pages carry when the crag label
/// has no hyperlink of its own.
pub fn find_secondary_anchor(page: &Html) -> Option<String> {
    page.select(&secondary_selector())
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_with_crag_link() {
        let page = Html::parse_document(
            r#"<html><body>
                <span>Unrelated</span>
                <span>El Capitan Nose <a href="/crags/el-capitan">El Capitan</a></span>
            </body></html>"#,
        );
        let anchor = find_route_anchor(&page, "El").unwrap();
        assert!(anchor.text.starts_with("El Capitan"));
        assert_eq!(anchor.crag_href.as_deref(), Some("/crags/el-capitan"));
    }

    #[test]
    fn test_anchor_tolerates_curly_apostrophe_and_case() {
        let page = Html::parse_document(
            "<html><body><span>DEVIL’S TOWER CLASSIC</span></body></html>",
        );
        let anchor = find_route_anchor(&page, "Devils").unwrap();
        assert_eq!(anchor.crag_href, None);
        assert!(anchor.text.starts_with("DEVIL’S"));
    }

    #[test]
    fn test_anchor_miss_is_pattern_error() {
        let page = Html::parse_document("<html><body><span>Something else</span></body></html>");
        let err = find_route_anchor(&page, "Biographie").unwrap_err();
        assert!(matches!(err, ResolveError::PatternMiss(_)));
    }

    #[test]
    fn test_secondary_anchor() {
        let page = Html::parse_document(
            r#"<html><body>
                <a class="text-break text-muted small" href="https://www.8a.nu/crags/x">8a.nu</a>
            </body></html>"#,
        );
        assert_eq!(
            find_secondary_anchor(&page).as_deref(),
            Some("https://www.8a.nu/crags/x")
        );
        let empty = Html::parse_document("<html><body><a href='/x'>plain</a></body></html>");
        assert_eq!(find_secondary_anchor(&empty), None);
    }
}
