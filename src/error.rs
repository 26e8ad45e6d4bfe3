use crate::connector::CollectionKind;
use crate::webdav::features::SupportedFeature;
use crate::webdav::response::{MediaType, ProtocolFailure};

/// Errors surfaced by collection and store operations.
///
/// Ordinary negative results (an absent resource, an ETag conflict) are reported
/// through [`Outcome`](crate::Outcome) and [`WriteOutcome`](crate::WriteOutcome)
/// instead; everything here is meant to reach the caller.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DavError {
    /// Connection, TLS, DNS or timeout failure reported by the transport.
    #[error("transport error: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// The server answered with a status the operation does not accept.
    #[error("{0}")]
    Protocol(ProtocolFailure),

    /// The body could not be decoded, or its content type was not the expected one.
    #[error("malformed {media} body: {reason}")]
    MalformedBody { media: MediaType, reason: String },

    /// The server did not advertise a capability the operation needs.
    #[error("server does not advertise `{0}`")]
    UnsupportedFeature(SupportedFeature),

    /// The collection must be discovered before this operation.
    #[error("collection {href} has not been discovered")]
    NotDiscovered { href: String },

    /// The resource exists but is not a collection of the requested kind.
    #[error("{href} is not a {kind} collection")]
    NotACollection { href: String, kind: CollectionKind },

    /// No home set is configured or discovered for this kind of collection.
    #[error("no {0} home set known; configure one or call discover_home_set")]
    HomeSetUnknown(CollectionKind),

    /// A domain object was handed to a collection of the other kind.
    #[error("expected a {expected} object, got a {found} object")]
    KindMismatch {
        expected: CollectionKind,
        found: CollectionKind,
    },

    /// The object carries a component the collection does not accept.
    #[error("{href} does not accept {component} components")]
    UnsupportedComponent { component: String, href: String },

    /// A request could not be built (invalid header value, path, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid connector configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DavError {
    pub(crate) fn malformed(media: MediaType, err: impl std::fmt::Display) -> Self {
        Self::MalformedBody {
            media,
            reason: err.to_string(),
        }
    }

    /// The protocol failure carried by this error, if any.
    pub fn protocol_failure(&self) -> Option<&ProtocolFailure> {
        match self {
            Self::Protocol(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<hyper::header::InvalidHeaderValue> for DavError {
    fn from(err: hyper::header::InvalidHeaderValue) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

pub type Result<T, E = DavError> = std::result::Result<T, E>;
