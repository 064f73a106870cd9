//! Acceptance checks for Twine ingestion against the Quilt catalog.
//!
//! The harness talks to three HTTP surfaces:
//!
//! ```text
//!   fixture.nq ──POST /ingest──► Twine (remote control, :8000)
//!                GET  /update ─►
//!
//!   collection ──GET /?uri=──► Quilt resolver ──303 Location: /path#id
//!
//!   /path.nt?offset&limit ──► Quilt catalog ──N-Triples page (+ xhv:next)
//! ```
//!
//! The interesting parts are the collection resolver ([`resolver`]) and the
//! paginated entity counter ([`counter`]). Everything is blocking and
//! single-attempt; any failure aborts the whole operation.

pub mod catalog;
pub mod config;
pub mod counter;
pub mod error;
pub mod graph;
pub mod harness;
mod http;
pub mod resolver;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod twine;
pub mod vocab;

pub use catalog::{CatalogClient, PageSource, PageWindow};
pub use config::HarnessConfig;
pub use counter::{CatalogPages, CountReport, EntityCounter};
pub use error::{HarnessError, Operation, Result};
pub use graph::{inspect_fixture, CatalogPage, FixtureSummary, Node, Statement};
pub use harness::Harness;
pub use resolver::{CanonicalLocation, CollectionResolver, Resolution};
pub use twine::{ServiceReply, TwineClient};
pub use vocab::Vocabulary;
