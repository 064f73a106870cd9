//! Blocking HTTP plumbing shared by the clients.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect::Policy;

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Operation, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Redirects {
    Follow,
    /// Hand 3xx responses back to the caller untouched.
    Manual,
}

pub(crate) fn build_client(config: &HarnessConfig, redirects: Redirects) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&config.user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static("twine-acceptance")),
    );

    let timeout = match config.timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .redirect(match redirects {
            Redirects::Follow => Policy::default(),
            Redirects::Manual => Policy::none(),
        })
        .build()
        .map_err(|e| HarnessError::Config(format!("failed to build http client: {e}")))
}

pub(crate) fn transport_error(operation: Operation, uri: &str, err: reqwest::Error) -> HarnessError {
    let message = if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    HarnessError::Transport {
        operation,
        uri: uri.to_string(),
        message,
    }
}

/// Drain the body for diagnostics; a body that cannot be read is reported empty.
pub(crate) fn body_text(response: Response) -> String {
    response.text().unwrap_or_default()
}

pub(crate) fn parse_url(what: &str, value: &str) -> Result<url::Url> {
    url::Url::parse(value).map_err(|e| HarnessError::InvalidInput(format!("{what} `{value}`: {e}")))
}
