//! Twine remote-control client: ingestion and re-processing triggers.
//!
//! Both calls are a single blocking round trip with the configured (long)
//! timeout. Success is exactly `200 OK`; the body is log output and is only
//! handed back for display.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Operation, Result};
use crate::http::{body_text, build_client, parse_url, transport_error, Redirects};

pub const NQUADS_CONTENT_TYPE: &str = "text/x-nquads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: String,
}

impl ServiceReply {
    /// Only `200` counts; other 2xx codes do not.
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }
}

#[derive(Debug, Clone)]
pub struct TwineClient {
    client: Client,
    base: url::Url,
}

impl TwineClient {
    pub fn new(config: &HarnessConfig) -> Result<Self> {
        Ok(Self {
            // A 3xx is Twine's own answer and must fail the status gate.
            client: build_client(config, Redirects::Manual)?,
            base: parse_url("twine url", &config.twine_url)?,
        })
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        self.base
            .join(path)
            .map(String::from)
            .map_err(|e| HarnessError::InvalidInput(format!("twine endpoint {path}: {e}")))
    }

    /// `POST /ingest` with the document as `text/x-nquads`.
    pub fn ingest(&self, document: &[u8]) -> Result<ServiceReply> {
        let uri = self.endpoint("/ingest")?;
        tracing::info!(uri = %uri, bytes = document.len(), "submitting document for ingestion");

        let response = self
            .client
            .post(&uri)
            .header(CONTENT_TYPE, NQUADS_CONTENT_TYPE)
            .body(document.to_vec())
            .send()
            .map_err(|e| transport_error(Operation::Ingest, &uri, e))?;

        finish(Operation::Ingest, uri, response)
    }

    /// `GET /update`: re-process everything ingested so far.
    pub fn reprocess_all(&self) -> Result<ServiceReply> {
        let uri = self.endpoint("/update")?;
        tracing::info!(uri = %uri, "requesting re-processing of ingested data");

        let response = self
            .client
            .get(&uri)
            .send()
            .map_err(|e| transport_error(Operation::Reprocess, &uri, e))?;

        finish(Operation::Reprocess, uri, response)
    }
}

fn finish(
    operation: Operation,
    uri: String,
    response: reqwest::blocking::Response,
) -> Result<ServiceReply> {
    let reply = ServiceReply {
        status: response.status().as_u16(),
        body: body_text(response),
    };
    tracing::debug!(%operation, status = reply.status, logs = %reply.body, "twine replied");

    if !reply.is_success() {
        tracing::warn!(%operation, uri = %uri, status = reply.status, "twine rejected request");
        return Err(HarnessError::Protocol {
            operation,
            uri,
            status: reply.status,
            body: reply.body,
        });
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_means_exactly_200() {
        let reply = |status| ServiceReply {
            status,
            body: String::new(),
        };
        assert!(reply(200).is_success());
        assert!(!reply(201).is_success());
        assert!(!reply(204).is_success());
        assert!(!reply(500).is_success());
    }

    #[test]
    fn endpoints_replace_the_base_path() {
        let client = TwineClient::new(&HarnessConfig::default()).expect("client");
        assert_eq!(client.endpoint("/ingest").unwrap(), "http://twine:8000/ingest");
        assert_eq!(client.endpoint("/update").unwrap(), "http://twine:8000/update");
    }
}
