//! Description strategies, strictest first.

use super::{FieldStrategy, ItemContext, select_containing};
use crate::page::PageQuery;

/// Lines of `main` starting with these are reward or deadline banners.
const BANNER_PREFIXES: [&str; 3] = ["$", "USDC", "Deadline"];

/// Text in a block that marks it as site chrome rather than content.
const CHROME_MARKERS: [&str; 3] = ["Sign in", "Menu", "Navigation"];

/// One selector probe, optionally narrowed by text or by a descendant.
#[derive(Debug, Clone, Copy)]
pub struct Probe {
    pub css: &'static str,
    /// Keep only elements whose text contains this (case-insensitive).
    pub containing: Option<&'static str>,
    /// Keep only elements with a descendant matching this selector.
    pub having: Option<&'static str>,
}

impl Probe {
    pub const fn css(css: &'static str) -> Self {
        Self {
            css,
            containing: None,
            having: None,
        }
    }

    pub const fn containing(css: &'static str, text: &'static str) -> Self {
        Self {
            css,
            containing: Some(text),
            having: None,
        }
    }

    pub const fn having(css: &'static str, descendant: &'static str) -> Self {
        Self {
            css,
            containing: None,
            having: Some(descendant),
        }
    }
}

/// Known description containers, most specific first.
pub const DESCRIPTION_PROBES: [Probe; 16] = [
    Probe::css(r#"[data-testid*="description"]"#),
    Probe::css(r#"[class*="description"]"#),
    Probe::css(r#"[class*="content"]"#),
    Probe::css(r#"[class*="detail"]"#),
    Probe::css(r#"[class*="body"]"#),
    Probe::css("main p"),
    Probe::css("article p"),
    Probe::css("section p"),
    Probe::containing("div", "Description"),
    Probe::containing("div", "About"),
    Probe::containing("div", "Details"),
    Probe::css("main div div div div div p"),
    Probe::css("main div div div div p"),
    Probe::css(r#"[role="main"] p"#),
    Probe::having("main div", "p"),
    Probe::css(r#"div[class*="container"] p"#),
];

/// Walk [`DESCRIPTION_PROBES`]; first element with more than `min_chars`.
#[derive(Debug, Clone)]
pub struct SelectorList {
    pub probes: Vec<Probe>,
    pub min_chars: usize,
}

impl Default for SelectorList {
    fn default() -> Self {
        Self {
            probes: DESCRIPTION_PROBES.to_vec(),
            min_chars: 30,
        }
    }
}

impl FieldStrategy<String> for SelectorList {
    fn name(&self) -> &'static str {
        "selector_list"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        for probe in &self.probes {
            let mut candidates = match probe.containing {
                Some(text) => select_containing(page, probe.css, text),
                None => page.select(probe.css),
            };
            if let Some(descendant) = probe.having {
                candidates.retain(|&id| !page.select_within(id, descendant).is_empty());
            }

            let hit = candidates
                .into_iter()
                .map(|id| page.text(id))
                .find(|text| text.trim().chars().count() > self.min_chars);
            if let Some(text) = hit {
                return Some(text.trim().to_string());
            }
        }
        None
    }
}

/// First paragraph longer than 50 characters.
pub struct ParagraphScan;

impl FieldStrategy<String> for ParagraphScan {
    fn name(&self) -> &'static str {
        "paragraph_scan"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        page.select("p")
            .into_iter()
            .map(|id| page.text(id).trim().to_string())
            .find(|text| text.chars().count() > 50)
    }
}

/// First long line of `main` that is not a reward/deadline banner.
pub struct MainLines;

impl FieldStrategy<String> for MainLines {
    fn name(&self) -> &'static str {
        "main_lines"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        let main = page.select("main").into_iter().next()?;
        page.text(main)
            .lines()
            .map(str::trim)
            .find(|line| {
                line.chars().count() > 100
                    && !BANNER_PREFIXES.iter().any(|p| line.starts_with(p))
            })
            .map(String::from)
    }
}

/// Shortest `div` text [`BlockScan`] accepts, in characters.
pub const BLOCK_MIN_CHARS: usize = 100;
/// `div` text of this many characters or more is a layout wrapper.
pub const BLOCK_MAX_CHARS: usize = 2000;

/// Any sentence-bearing `div` of plausible length that is not chrome.
pub struct BlockScan;

impl FieldStrategy<String> for BlockScan {
    fn name(&self) -> &'static str {
        "block_scan"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        page.select("div").into_iter().find_map(|id| {
            let text = page.text(id);
            let len = text.chars().count();
            let plausible = (BLOCK_MIN_CHARS..BLOCK_MAX_CHARS).contains(&len)
                && text.contains(' ')
                && !CHROME_MARKERS.iter().any(|m| text.contains(m));
            plausible.then(|| text.trim().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlSnapshot;
    use bountyscout_shared::{KnownMetadata, Slug};

    fn run(strategy: &dyn FieldStrategy<String>, html: &str) -> Option<String> {
        let page = HtmlSnapshot::parse(html);
        let slug = Slug::from("x");
        let known = KnownMetadata::default();
        strategy.attempt(&page, &ItemContext { slug: &slug, known: &known })
    }

    const LONG: &str = "Write a detailed thread explaining how the aggregator routes swaps across venues.";

    #[test]
    fn selector_list_prefers_testid_container() {
        let html = format!(
            r#"<main><p>{LONG} (main)</p><div data-testid="listing-description">{LONG}</div></main>"#
        );
        assert_eq!(run(&SelectorList::default(), &html).as_deref(), Some(LONG));
    }

    #[test]
    fn selector_list_skips_short_matches() {
        let html = format!(
            r#"<div class="description">Too short</div><section><p>{LONG}</p></section>"#
        );
        assert_eq!(run(&SelectorList::default(), &html).as_deref(), Some(LONG));
    }

    #[test]
    fn paragraph_scan_needs_fifty_chars() {
        assert_eq!(run(&ParagraphScan, "<p>short</p><p>tiny</p>"), None);
        let html = format!("<p>short</p><p>{LONG}</p>");
        assert_eq!(run(&ParagraphScan, &html).as_deref(), Some(LONG));
    }

    #[test]
    fn main_lines_skips_banners() {
        let banner = format!("$ {LONG} {LONG}");
        let body = format!("{LONG} Then post it and share the link in the submission form below.");
        let html = format!("<main><span>{banner}</span><br><span>{body}</span></main>");
        assert_eq!(run(&MainLines, &html).as_deref(), Some(body.as_str()));
    }

    #[test]
    fn block_scan_rejects_chrome() {
        let chrome = format!("<div>Menu {LONG} {LONG}</div>");
        assert_eq!(run(&BlockScan, &chrome), None);

        let content = format!("<div>{LONG} Submissions are judged on clarity.</div>");
        assert!(run(&BlockScan, &content).unwrap().starts_with("Write a detailed thread"));
    }

    /// A single `div` whose rendered text is exactly `len` characters.
    fn block_of(len: usize) -> String {
        let prefix = "Describe the feature ";
        format!("<div>{prefix}{}</div>", "x".repeat(len - prefix.len()))
    }

    #[test]
    fn block_scan_length_bounds_are_half_open() {
        assert_eq!(run(&BlockScan, &block_of(99)), None);
        assert_eq!(run(&BlockScan, &block_of(100)).map(|t| t.chars().count()), Some(100));
        assert_eq!(run(&BlockScan, &block_of(1999)).map(|t| t.chars().count()), Some(1999));
        assert_eq!(run(&BlockScan, &block_of(2000)), None);
    }
}
