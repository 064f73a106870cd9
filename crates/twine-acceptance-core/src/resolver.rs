//! Collection resolution through Quilt's lookup endpoint.
//!
//! `GET <resolver>?uri=<collection>` answers `303 See Other` with
//! `Location: <path>#id`. The canonical location is that path without the
//! `#id` fragment. Any other status is a protocol violation; redirects are
//! never followed, the 303 itself is the answer.

use std::fmt;

use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::StatusCode;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Operation, Result};
use crate::http::{body_text, build_client, parse_url, transport_error, Redirects};

const ID_FRAGMENT: &str = "#id";

/// Resolved collection path, e.g. `/collections/A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalLocation(String);

impl CanonicalLocation {
    /// Strip a trailing `#id`; values without it are kept as they are.
    pub fn from_redirect(location: &str) -> Self {
        Self(location.strip_suffix(ID_FRAGMENT).unwrap_or(location).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without its leading `/`.
    pub fn relative_path(&self) -> &str {
        self.0.strip_prefix('/').unwrap_or(&self.0)
    }

    /// `<catalog_base><path>.nt`, the N-Triples catalog of this collection.
    pub fn catalog_uri(&self, catalog_base: &str) -> String {
        if self.0.starts_with("http://") || self.0.starts_with("https://") {
            return format!("{}.nt", self.0);
        }
        format!(
            "{}/{}.nt",
            catalog_base.trim_end_matches('/'),
            self.relative_path()
        )
    }
}

impl fmt::Display for CanonicalLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one lookup. "Not a 303" is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(CanonicalLocation),
    Failed { status: u16, body: String },
}

#[derive(Debug, Clone)]
pub struct CollectionResolver {
    client: Client,
    endpoint: url::Url,
}

impl CollectionResolver {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config, Redirects::Manual)?,
            endpoint: parse_url("resolver url", &config.resolver_url)?,
        })
    }

    pub fn lookup_uri(&self, collection: &str) -> String {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().clear().append_pair("uri", collection);
        url.into()
    }

    /// One lookup, reported as a tagged outcome.
    ///
    /// Transport failures and a 303 without a usable `Location` are errors;
    /// any other status comes back as [`Resolution::Failed`].
    pub fn lookup(&self, collection: &str) -> Result<Resolution> {
        if collection.trim().is_empty() {
            return Err(HarnessError::InvalidInput(
                "collection identifier must not be empty".to_string(),
            ));
        }

        let uri = self.lookup_uri(collection);
        tracing::debug!(uri = %uri, collection, "resolving collection");

        let response = self
            .client
            .get(&uri)
            .send()
            .map_err(|e| transport_error(Operation::Resolve, &uri, e))?;

        let status = response.status();
        if status != StatusCode::SEE_OTHER {
            return Ok(Resolution::Failed {
                status: status.as_u16(),
                body: body_text(response),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or_else(|| malformed(&uri, "303 without a Location header"))?
            .to_str()
            .map_err(|_| malformed(&uri, "Location header is not valid text"))?
            .trim();
        if location.is_empty() {
            return Err(malformed(&uri, "303 with an empty Location header"));
        }

        let resolved = CanonicalLocation::from_redirect(location);
        tracing::info!(collection, location = %resolved, "collection resolved");
        Ok(Resolution::Resolved(resolved))
    }

    /// Resolve or fail; a non-303 status becomes a protocol violation.
    pub fn resolve_collection(&self, collection: &str) -> Result<CanonicalLocation> {
        match self.lookup(collection)? {
            Resolution::Resolved(location) => Ok(location),
            Resolution::Failed { status, body } => {
                tracing::warn!(collection, status, "collection lookup did not redirect");
                Err(HarnessError::Protocol {
                    operation: Operation::Resolve,
                    uri: self.lookup_uri(collection),
                    status,
                    body,
                })
            }
        }
    }
}

fn malformed(uri: &str, detail: &str) -> HarnessError {
    HarnessError::Malformed {
        operation: Operation::Resolve,
        uri: uri.to_string(),
        detail: detail.to_string(),
    }
}
