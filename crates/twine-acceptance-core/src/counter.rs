//! Paginated entity counting.
//!
//! A traversal fetches `offset = 0, limit, 2*limit, ...` strictly in order and
//! stops after the first page that carries no next-page statement. Each page
//! contributes the number of `(?, rdf:type, T)` statements for the relevant
//! types `T`. A failure on any page abandons the traversal; no partial total
//! is ever returned.
//!
//! There is no page ceiling: a catalog that always advertises a next page is
//! walked forever. The catalog is trusted to terminate its result set.

use serde::Serialize;

use crate::catalog::{PageSource, PageWindow};
use crate::error::{HarnessError, Result};
use crate::graph::{type_tally, CatalogPage};
use crate::vocab::Vocabulary;

pub const DEFAULT_OFFSET: u64 = 0;
pub const DEFAULT_LIMIT: u64 = 100;

/// Lazy sequence of the pages of one catalog resource.
///
/// Yields at most one error, after which it is exhausted.
pub struct CatalogPages<'a, S: ?Sized> {
    source: &'a S,
    vocab: &'a Vocabulary,
    base: String,
    next: Option<PageWindow>,
    overflowed_at: Option<u64>,
}

impl<'a, S: PageSource + ?Sized> CatalogPages<'a, S> {
    pub fn new(source: &'a S, vocab: &'a Vocabulary, base: &str, first: PageWindow) -> Self {
        Self {
            source,
            vocab,
            base: base.to_string(),
            next: Some(first),
            overflowed_at: None,
        }
    }
}

impl<S: PageSource + ?Sized> Iterator for CatalogPages<'_, S> {
    type Item = Result<CatalogPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(offset) = self.overflowed_at.take() {
            return Some(Err(HarnessError::page(
                &self.base,
                offset,
                HarnessError::InvalidInput("next page offset exceeds u64".to_string()),
            )));
        }

        let window = self.next.take()?;
        let page = match self.source.fetch_page(&self.base, window) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(uri = %self.base, offset = window.offset, error = %e, "catalog page failed");
                return Some(Err(HarnessError::page(&self.base, window.offset, e)));
            }
        };

        // Several next statements on one page still mean exactly one more page.
        if page.has_next(self.vocab) {
            match window.advance() {
                Some(following) => self.next = Some(following),
                None => self.overflowed_at = Some(window.offset),
            }
        }
        Some(Ok(page))
    }
}

/// Totals of one traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountReport {
    pub uri: String,
    pub total: u64,
    pub pages: u64,
    /// Matches per relevant type, in vocabulary order.
    pub per_type: Vec<(String, u64)>,
}

pub struct EntityCounter<S> {
    source: S,
    vocab: Vocabulary,
}

impl<S: PageSource> EntityCounter<S> {
    pub fn new(source: S, vocab: Vocabulary) -> Self {
        Self { source, vocab }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn pages(&self, catalog_uri: &str, first: PageWindow) -> CatalogPages<'_, S> {
        CatalogPages::new(&self.source, &self.vocab, catalog_uri, first)
    }

    /// Count with the default window (`offset = 0`, `limit = 100`).
    pub fn count_entities(&self, catalog_uri: &str) -> Result<u64> {
        self.count_entities_from(catalog_uri, DEFAULT_OFFSET, DEFAULT_LIMIT)
    }

    pub fn count_entities_from(&self, catalog_uri: &str, offset: u64, limit: u64) -> Result<u64> {
        Ok(self.tally(catalog_uri, PageWindow::new(offset, limit)?)?.total)
    }

    pub fn tally(&self, catalog_uri: &str, first: PageWindow) -> Result<CountReport> {
        let mut per_type = vec![0u64; self.vocab.relevant_types().len()];
        let mut pages = 0u64;

        for page in self.pages(catalog_uri, first) {
            let page = page?;
            let local = type_tally(&page.statements, &self.vocab);
            tracing::debug!(
                uri = %catalog_uri,
                offset = page.offset,
                local = local.iter().sum::<u64>(),
                next_links = page.next_links(&self.vocab),
                "counted catalog page"
            );
            for (acc, n) in per_type.iter_mut().zip(local) {
                *acc += n;
            }
            pages += 1;
        }

        let total: u64 = per_type.iter().sum();
        tracing::info!(uri = %catalog_uri, total, pages, "catalog traversal complete");

        Ok(CountReport {
            uri: catalog_uri.to_string(),
            total,
            pages,
            per_type: self
                .vocab
                .relevant_types()
                .iter()
                .cloned()
                .zip(per_type)
                .collect(),
        })
    }
}
