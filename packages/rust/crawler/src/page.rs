//! The rendered-page capability consumed by the extractor.
//!
//! Two layers:
//! - [`PageRenderer`] / [`RenderedPage`] : async navigation, expansion of
//!   collapsed content, and HTML retrieval
//! - [`PageQuery`] : synchronous element queries over a parsed snapshot
//!
//! `scraper::Html` is not `Send`, so snapshots are parsed and queried inside
//! synchronous code and never held across an await point.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;
use url::Url;

use bountyscout_shared::{Result, ScoutError};

/// Largest listing page body accepted, in bytes.
pub const MAX_PAGE_SIZE: usize = 50 * 1024 * 1024;

/// Affordances that reveal collapsed content on listing pages.
pub const EXPAND_LABELS: [&str; 3] = ["View More", "Show More", "Read More"];

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Handle to an element of a snapshot: its index in document order.
///
/// Only meaningful for the snapshot that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

/// Read-only queries over a rendered page.
///
/// Invalid selectors match nothing.
pub trait PageQuery {
    /// All elements matching `css`, in document order.
    fn select(&self, css: &str) -> Vec<ElementId>;

    /// Descendants of `scope` (excluding `scope`) matching `css`.
    fn select_within(&self, scope: ElementId, css: &str) -> Vec<ElementId>;

    /// `node` itself or its nearest ancestor matching `css`.
    fn closest(&self, node: ElementId, css: &str) -> Option<ElementId>;

    /// Rendered text of `node`: block elements break lines, whitespace is
    /// collapsed, scripts and styles are skipped.
    fn text(&self, node: ElementId) -> String;

    /// Rendered text of the whole body.
    fn body_text(&self) -> String;

    /// Document `<title>`, if present and non-empty.
    fn title(&self) -> Option<String>;
}

/// Elements whose content never renders as text.
const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Elements that start and end a line in rendered text.
const BLOCK_ELEMENTS: [&str; 24] = [
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "li", "main", "nav", "p", "section", "table", "tr",
];

/// A parsed HTML document implementing [`PageQuery`].
pub struct HtmlSnapshot {
    doc: Html,
}

impl HtmlSnapshot {
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    /// Every element in document order; position is the [`ElementId`].
    fn elements(&self) -> impl Iterator<Item = ElementRef<'_>> {
        self.doc
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
    }

    fn element(&self, id: ElementId) -> Option<ElementRef<'_>> {
        self.elements().nth(id.0)
    }
}

impl PageQuery for HtmlSnapshot {
    fn select(&self, css: &str) -> Vec<ElementId> {
        let Ok(selector) = Selector::parse(css) else {
            debug!(css, "invalid selector");
            return Vec::new();
        };
        self.elements()
            .enumerate()
            .filter(|(_, el)| selector.matches(el))
            .map(|(idx, _)| ElementId(idx))
            .collect()
    }

    fn select_within(&self, scope: ElementId, css: &str) -> Vec<ElementId> {
        let Ok(selector) = Selector::parse(css) else {
            debug!(css, "invalid selector");
            return Vec::new();
        };
        let Some(root) = self.element(scope) else {
            return Vec::new();
        };
        // Pre-order numbering keeps a subtree contiguous, so a descendant's
        // id is the scope id plus its offset within the subtree.
        root.descendants()
            .filter_map(ElementRef::wrap)
            .enumerate()
            .skip(1)
            .filter(|(_, el)| selector.matches(el))
            .map(|(offset, _)| ElementId(scope.0 + offset))
            .collect()
    }

    fn closest(&self, node: ElementId, css: &str) -> Option<ElementId> {
        let selector = Selector::parse(css).ok()?;
        let start = self.element(node)?;
        if selector.matches(&start) {
            return Some(node);
        }
        let ancestor = start
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| selector.matches(el))?;
        self.elements()
            .take(node.0)
            .position(|el| el.id() == ancestor.id())
            .map(ElementId)
    }

    fn text(&self, node: ElementId) -> String {
        self.element(node).map(rendered_text).unwrap_or_default()
    }

    fn body_text(&self) -> String {
        let body = Selector::parse("body").unwrap();
        match self.doc.select(&body).next() {
            Some(el) => rendered_text(el),
            None => rendered_text(self.doc.root_element()),
        }
    }

    fn title(&self) -> Option<String> {
        let title = Selector::parse("title").unwrap();
        self.doc
            .select(&title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Approximate the browser's `innerText` for an element.
fn rendered_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // Source line breaks are whitespace; only blocks break lines.
            Node::Text(text) => out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c })),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// An opened page. Owned by a single task; never shared.
#[async_trait]
pub trait RenderedPage: Send {
    /// URL the page was opened at.
    fn url(&self) -> &str;

    /// Trigger every visible collapsed-content affordance, then wait
    /// `settle` for the page to settle. Returns how many were triggered.
    async fn expand_collapsed(&mut self, settle: Duration) -> Result<usize>;

    /// Current HTML of the page.
    async fn content(&self) -> Result<String>;
}

/// Opens pages. One renderer may serve many pages concurrently.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>>;
}

/// Renderer backed by plain HTTP fetches.
///
/// Pages are served as delivered: there is no script engine, so collapsed
/// content that needs a click to load stays collapsed.
pub struct HttpRenderer {
    client: Client,
    max_body_size: usize,
}

impl HttpRenderer {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| ScoutError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_body_size: MAX_PAGE_SIZE,
        })
    }

    /// Override the body size limit (default [`MAX_PAGE_SIZE`]).
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>> {
        debug!(url, "opening page");

        let parsed = Url::parse(url)
            .map_err(|e| ScoutError::navigation(url, format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScoutError::navigation(
                url,
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| ScoutError::navigation(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::navigation(url, format!("HTTP {status}")));
        }

        let limit = self.max_body_size;
        let too_large =
            || ScoutError::navigation(url, format!("response too large (max {limit} bytes)"));
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ScoutError::navigation(url, format!("body read failed: {e}")))?
        {
            if body.len() + chunk.len() > limit {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        let html = String::from_utf8_lossy(&body).into_owned();

        Ok(Box::new(StaticPage::new(url, html)))
    }
}

/// A page whose HTML is fixed once fetched.
#[derive(Debug, Clone)]
pub struct StaticPage {
    url: String,
    html: String,
}

impl StaticPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

#[async_trait]
impl RenderedPage for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn expand_collapsed(&mut self, _settle: Duration) -> Result<usize> {
        let found = count_expanders(&self.html);
        if found > 0 {
            debug!(url = %self.url, found, "collapsed sections present but not expandable");
        }
        Ok(0)
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }
}

/// Number of buttons labelled with one of [`EXPAND_LABELS`].
pub fn count_expanders(html: &str) -> usize {
    let snapshot = HtmlSnapshot::parse(html);
    snapshot
        .select("button")
        .into_iter()
        .filter(|&id| {
            let label = snapshot.text(id);
            EXPAND_LABELS.iter().any(|l| label.contains(l))
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title> Alpha Bounty | Earn </title>
        <style>.x { color: red }</style></head>
        <body>
          <main>
            <div class="row" id="r1"><p class="amount">1,000</p><span>USDC</span></div>
            <div class="row" id="r2"><p class="amount">500</p><p>2nd</p></div>
          </main>
          <script>var hidden = "never rendered";</script>
          <button>View More</button>
        </body></html>"#;

    #[test]
    fn select_returns_document_order() {
        let page = HtmlSnapshot::parse(PAGE);
        let rows = page.select("div.row");
        assert_eq!(rows.len(), 2);
        assert!(rows[0] < rows[1]);
        assert_eq!(page.text(rows[0]), "1,000\nUSDC");
    }

    #[test]
    fn select_within_scopes_to_descendants() {
        let page = HtmlSnapshot::parse(PAGE);
        let rows = page.select("div.row");
        let inner = page.select_within(rows[1], "p");
        let texts: Vec<String> = inner.iter().map(|&id| page.text(id)).collect();
        assert_eq!(texts, vec!["500", "2nd"]);
        assert!(page.select_within(rows[1], "div.row").is_empty());
    }

    #[test]
    fn closest_walks_ancestors_and_includes_self() {
        let page = HtmlSnapshot::parse(PAGE);
        let amounts = page.select("p.amount");
        let rows = page.select("div.row");
        assert_eq!(page.closest(amounts[1], "div.row"), Some(rows[1]));
        assert_eq!(page.closest(rows[0], "div"), Some(rows[0]));
        assert_eq!(page.closest(amounts[0], "table"), None);
    }

    #[test]
    fn text_skips_scripts_and_title_is_trimmed() {
        let page = HtmlSnapshot::parse(PAGE);
        let body = page.body_text();
        assert!(body.contains("1,000"));
        assert!(!body.contains("never rendered"));
        assert_eq!(page.title().as_deref(), Some("Alpha Bounty | Earn"));
    }

    #[test]
    fn invalid_selector_matches_nothing() {
        let page = HtmlSnapshot::parse(PAGE);
        assert!(page.select("p:has-text(").is_empty());
    }

    #[test]
    fn counts_expand_affordances() {
        assert_eq!(count_expanders(PAGE), 1);
        assert_eq!(count_expanders("<button>Submit</button>"), 0);
    }

    #[tokio::test]
    async fn http_renderer_fetches_page() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/listing/alpha"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new("test-agent", Duration::from_secs(5)).unwrap();
        let url = format!("{}/listing/alpha", server.uri());
        let mut page = renderer.open(&url).await.unwrap();

        assert_eq!(page.url(), url);
        assert_eq!(page.expand_collapsed(Duration::ZERO).await.unwrap(), 0);
        assert!(page.content().await.unwrap().contains("Alpha Bounty"));
    }

    #[tokio::test]
    async fn http_renderer_reports_status_as_navigation_error() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/listing/gone"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let renderer = HttpRenderer::new("test-agent", Duration::from_secs(5)).unwrap();
        let url = format!("{}/listing/gone", server.uri());
        let err = renderer.open(&url).await.err().expect("404 must fail");
        assert!(matches!(err, ScoutError::Navigation { .. }));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn http_renderer_caps_body_size() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/listing/huge"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(PAGE))
            .mount(&server)
            .await;

        let url = format!("{}/listing/huge", server.uri());
        let small = HttpRenderer::new("test-agent", Duration::from_secs(5))
            .unwrap()
            .with_max_body_size(64);
        let err = small.open(&url).await.err().expect("oversized body must fail");
        assert!(matches!(err, ScoutError::Navigation { .. }));
        assert!(err.to_string().contains("too large"));

        let exact = HttpRenderer::new("test-agent", Duration::from_secs(5))
            .unwrap()
            .with_max_body_size(PAGE.len());
        assert!(exact.open(&url).await.is_ok());
    }

    #[tokio::test]
    async fn http_renderer_rejects_non_http_urls() {
        let renderer = HttpRenderer::new("test-agent", Duration::from_secs(5)).unwrap();
        for url in ["not a url", "file:///etc/passwd"] {
            let err = renderer.open(url).await.err().expect("must fail");
            assert!(matches!(err, ScoutError::Navigation { .. }), "{url}: {err}");
        }
    }
}
