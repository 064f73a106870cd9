//! Error taxonomy for harness operations.
//!
//! Every operation fails fast and whole. The variants keep transport
//! failures, unexpected statuses and unusable responses apart so a caller can
//! tell "the service rejected the request" from "the service said OK but gave
//! garbage".

use std::fmt;

/// Which harness operation produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ingest,
    Reprocess,
    Resolve,
    FetchPage,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Ingest => "ingest",
            Operation::Reprocess => "reprocess",
            Operation::Resolve => "resolve collection",
            Operation::FetchPage => "fetch catalog page",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Connection refused, DNS failure, timeout expiry.
    #[error("{operation} {uri}: transport failure: {message}")]
    Transport {
        operation: Operation,
        uri: String,
        message: String,
    },

    /// The service answered with a status the operation does not accept.
    #[error("{operation} {uri}: unexpected HTTP status {status}")]
    Protocol {
        operation: Operation,
        uri: String,
        status: u16,
        body: String,
    },

    /// The status was right but the response cannot be used.
    #[error("{operation} {uri}: malformed response: {detail}")]
    Malformed {
        operation: Operation,
        uri: String,
        detail: String,
    },

    /// A catalog page failed; the traversal is abandoned.
    #[error("catalog page at offset {offset} of {uri} failed: {source}")]
    Page {
        uri: String,
        offset: u64,
        #[source]
        source: Box<HarnessError>,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    pub(crate) fn page(uri: &str, offset: u64, source: HarnessError) -> Self {
        HarnessError::Page {
            uri: uri.to_string(),
            offset,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through page wrappers.
    pub fn root(&self) -> &HarnessError {
        match self {
            HarnessError::Page { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.root(), HarnessError::Transport { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self.root(), HarnessError::Protocol { .. })
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self.root(), HarnessError::Malformed { .. })
    }

    /// HTTP status behind a protocol violation.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            HarnessError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Offset of the failing catalog page, if this came from a traversal.
    pub fn page_offset(&self) -> Option<u64> {
        match self {
            HarnessError::Page { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
