//! Catalog page retrieval.
//!
//! A catalog resource is served in pages selected by `offset`/`limit` query
//! parameters. [`PageSource`] is the seam between traversal and transport:
//! the HTTP client implements it for Quilt, tests implement it in memory.

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Operation, Result};
use crate::graph::{parse_ntriples, CatalogPage};
use crate::http::{body_text, build_client, parse_url, transport_error, Redirects};

/// Pagination window of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn new(offset: u64, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(HarnessError::InvalidInput(
                "page limit must be > 0".to_string(),
            ));
        }
        Ok(Self { offset, limit })
    }

    /// The window of the following page (same limit), if it is addressable.
    pub fn advance(self) -> Option<Self> {
        self.offset.checked_add(self.limit).map(|offset| Self {
            offset,
            limit: self.limit,
        })
    }
}

/// `<base>?offset=<n>&limit=<m>`; `base` must not carry these parameters already.
pub fn page_uri(base: &str, window: PageWindow) -> Result<String> {
    let mut url = parse_url("catalog uri", base)?;
    url.query_pairs_mut()
        .append_pair("offset", &window.offset.to_string())
        .append_pair("limit", &window.limit.to_string());
    Ok(url.into())
}

pub trait PageSource {
    /// Fetch and parse one page of the catalog resource at `base`.
    fn fetch_page(&self, base: &str, window: PageWindow) -> Result<CatalogPage>;
}

impl<S: PageSource + ?Sized> PageSource for &S {
    fn fetch_page(&self, base: &str, window: PageWindow) -> Result<CatalogPage> {
        (**self).fetch_page(base, window)
    }
}

/// Quilt catalog over HTTP; pages are N-Triples.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
}

impl CatalogClient {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config, Redirects::Follow)?,
        })
    }
}

impl PageSource for CatalogClient {
    fn fetch_page(&self, base: &str, window: PageWindow) -> Result<CatalogPage> {
        let uri = page_uri(base, window)?;
        tracing::debug!(uri = %uri, offset = window.offset, limit = window.limit, "fetching catalog page");

        let response = self
            .client
            .get(&uri)
            .header(reqwest::header::ACCEPT, "application/n-triples, text/plain;q=0.5")
            .send()
            .map_err(|e| transport_error(Operation::FetchPage, &uri, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(HarnessError::Protocol {
                operation: Operation::FetchPage,
                uri,
                status: status.as_u16(),
                body: body_text(response),
            });
        }

        let bytes = response
            .bytes()
            .map_err(|e| transport_error(Operation::FetchPage, &uri, e))?;
        let statements = parse_ntriples(&bytes).map_err(|detail| HarnessError::Malformed {
            operation: Operation::FetchPage,
            uri: uri.clone(),
            detail: format!("not N-Triples: {detail}"),
        })?;

        Ok(CatalogPage {
            offset: window.offset,
            limit: window.limit,
            statements,
        })
    }
}
