//! Reward-token strategies.

use bountyscout_shared::DEFAULT_TOKEN;

use super::{FieldStrategy, ItemContext, TOKEN_VOCABULARY};
use crate::page::PageQuery;

/// First `span` naming a known token.
pub struct SpanVocabulary;

impl FieldStrategy<String> for SpanVocabulary {
    fn name(&self) -> &'static str {
        "span_vocabulary"
    }

    fn attempt(&self, page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        page.select("span").into_iter().find_map(|id| {
            let text = page.text(id).to_uppercase();
            TOKEN_VOCABULARY
                .iter()
                .find(|token| text.contains(*token))
                .map(|token| token.to_string())
        })
    }
}

/// Token declared by the catalog.
pub struct CatalogToken;

impl FieldStrategy<String> for CatalogToken {
    fn name(&self) -> &'static str {
        "catalog_metadata"
    }

    fn attempt(&self, _page: &dyn PageQuery, ctx: &ItemContext<'_>) -> Option<String> {
        ctx.known
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_uppercase)
    }
}

/// Always [`DEFAULT_TOKEN`].
pub struct DefaultToken;

impl FieldStrategy<String> for DefaultToken {
    fn name(&self) -> &'static str {
        "default"
    }

    fn attempt(&self, _page: &dyn PageQuery, _ctx: &ItemContext<'_>) -> Option<String> {
        Some(DEFAULT_TOKEN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlSnapshot;
    use crate::strategies::FieldExtractor;
    use bountyscout_shared::{KnownMetadata, Slug};

    fn token_of(html: &str, known: &KnownMetadata) -> (String, &'static str) {
        let page = HtmlSnapshot::parse(html);
        let slug = Slug::from("x");
        let got = FieldExtractor::new()
            .token(&page, &ItemContext { slug: &slug, known })
            .expect("token cascade always yields");
        (got.value, got.strategy)
    }

    #[test]
    fn span_token_wins() {
        let html = "<span>Reward</span><span>2,500 jup</span>";
        assert_eq!(token_of(html, &KnownMetadata::default()), ("JUP".into(), "span_vocabulary"));
    }

    #[test]
    fn catalog_then_default() {
        let known = KnownMetadata {
            token: Some("sol".into()),
            ..Default::default()
        };
        assert_eq!(token_of("<p>1,000 USDC</p>", &known), ("SOL".into(), "catalog_metadata"));
        assert_eq!(
            token_of("<p>nothing</p>", &KnownMetadata::default()),
            ("USDC".into(), "default")
        );
    }
}
