//! The four operations behind one value, wired from a [`HarnessConfig`].

use crate::catalog::{CatalogClient, PageWindow};
use crate::config::HarnessConfig;
use crate::counter::{CountReport, EntityCounter};
use crate::error::Result;
use crate::resolver::{CanonicalLocation, CollectionResolver, Resolution};
use crate::twine::{ServiceReply, TwineClient};
use crate::vocab::Vocabulary;

pub struct Harness {
    config: HarnessConfig,
    twine: TwineClient,
    resolver: CollectionResolver,
    counter: EntityCounter<CatalogClient>,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        Self::with_vocabulary(config, Vocabulary::default())
    }

    pub fn with_vocabulary(config: HarnessConfig, vocab: Vocabulary) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            twine: TwineClient::new(&config)?,
            resolver: CollectionResolver::new(&config)?,
            counter: EntityCounter::new(CatalogClient::new(&config)?, vocab),
            config,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        self.counter.vocabulary()
    }

    pub fn ingest(&self, document: &[u8]) -> Result<ServiceReply> {
        self.twine.ingest(document)
    }

    pub fn reprocess_all(&self) -> Result<ServiceReply> {
        self.twine.reprocess_all()
    }

    pub fn lookup_collection(&self, collection: &str) -> Result<Resolution> {
        self.resolver.lookup(collection)
    }

    pub fn resolve_collection(&self, collection: &str) -> Result<CanonicalLocation> {
        self.resolver.resolve_collection(collection)
    }

    /// Counts with `offset = 0` and the configured page limit.
    pub fn count_entities(&self, catalog_uri: &str) -> Result<u64> {
        self.counter
            .count_entities_from(catalog_uri, 0, self.config.page_limit)
    }

    pub fn tally(&self, catalog_uri: &str, offset: u64, limit: u64) -> Result<CountReport> {
        self.counter.tally(catalog_uri, PageWindow::new(offset, limit)?)
    }

    pub fn everything_uri(&self) -> String {
        self.config.everything_uri()
    }

    pub fn collection_uri(&self, location: &CanonicalLocation) -> String {
        location.catalog_uri(&self.config.catalog_url)
    }
}
