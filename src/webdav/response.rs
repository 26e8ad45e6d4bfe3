//! Mapping of raw HTTP responses onto typed outcomes.
//!
//! A [`ResponseHandler`] is configured per operation with the status codes it
//! accepts and a decoder. It consumes a [`RawResponse`] and yields exactly one
//! [`Outcome`] or a hard [`DavError`].

use std::fmt;

use anyhow::Result as AnyResult;
use hyper::{HeaderMap, StatusCode, header};

use crate::error::DavError;
use crate::webdav::multistatus::{DavErrorBody, parse_error_body};
use crate::webdav::transport::RawResponse;

/// Media types the connector exchanges with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// `text/calendar`
    Calendar,
    /// `text/vcard` (also accepts `text/x-vcard` and `text/directory`)
    VCard,
    /// `application/xml` or `text/xml`
    Xml,
}

impl MediaType {
    pub fn essence(self) -> &'static str {
        match self {
            MediaType::Calendar => "text/calendar",
            MediaType::VCard => "text/vcard",
            MediaType::Xml => "application/xml",
        }
    }

    /// Value for an outgoing `Content-Type` header.
    pub fn header_value(self) -> &'static str {
        match self {
            MediaType::Calendar => "text/calendar; charset=utf-8",
            MediaType::VCard => "text/vcard; charset=utf-8",
            MediaType::Xml => "application/xml; charset=utf-8",
        }
    }

    /// Whether a `Content-Type` value names this media type. Parameters are ignored.
    pub fn matches(self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            MediaType::Calendar => essence == "text/calendar",
            MediaType::VCard => matches!(
                essence.as_str(),
                "text/vcard" | "text/x-vcard" | "text/directory"
            ),
            MediaType::Xml => matches!(essence.as_str(), "application/xml" | "text/xml"),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.essence())
    }
}

/// How a non-accepted status is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 404 or 410.
    Absent,
    /// 409 or 412.
    Conflict,
    Other,
}

impl FailureKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            404 | 410 => FailureKind::Absent,
            409 | 412 => FailureKind::Conflict,
            _ => FailureKind::Other,
        }
    }
}

/// A response whose status the operation does not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFailure {
    pub status: StatusCode,
    pub reason: String,
    pub kind: FailureKind,
    /// Parsed `DAV:error` body, when the server sent one.
    pub error: Option<DavErrorBody>,
}

impl ProtocolFailure {
    pub fn new(status: StatusCode, reason: Option<String>, error: Option<DavErrorBody>) -> Self {
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
        Self {
            status,
            reason,
            kind: FailureKind::from_status(status),
            error,
        }
    }

    fn from_response(response: RawResponse) -> Self {
        let error = if response.body.is_empty() {
            None
        } else {
            parse_error_body(&response.body)
        };
        Self::new(response.status, response.reason, error)
    }

    pub fn is_absent(&self) -> bool {
        self.kind == FailureKind::Absent
    }

    pub fn is_conflict(&self) -> bool {
        self.kind == FailureKind::Conflict
    }
}

impl fmt::Display for ProtocolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "server answered {} {}", self.status.as_u16(), self.reason)?;
        if let Some(error) = &self.error {
            write!(f, " ({})", error.conditions.join(", "))?;
        }
        Ok(())
    }
}

/// Result of one response.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    /// No body, or an absent resource where the operation treats absence as empty.
    Empty,
    Failure(ProtocolFailure),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&ProtocolFailure> {
        match self {
            Outcome::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Empty => Outcome::Empty,
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    /// Turn a failure into [`DavError::Protocol`], keeping success and empty.
    pub fn into_result(self) -> Result<Option<T>, DavError> {
        match self {
            Outcome::Success(value) => Ok(Some(value)),
            Outcome::Empty => Ok(None),
            Outcome::Failure(failure) => Err(DavError::Protocol(failure)),
        }
    }
}

type BodyDecoder<T> = Box<dyn Fn(&[u8]) -> AnyResult<T> + Send + Sync>;
type HeaderDecoder<T> = Box<dyn Fn(&HeaderMap) -> T + Send + Sync>;

enum Decoder<T> {
    Body(MediaType, BodyDecoder<T>),
    Headers(HeaderDecoder<T>),
}

/// Decodes the response of one operation.
pub struct ResponseHandler<T> {
    operation: &'static str,
    accepted: &'static [StatusCode],
    absent_as_empty: bool,
    decoder: Decoder<T>,
}

impl<T> ResponseHandler<T> {
    /// Handler decoding the body as `media` with `decode`.
    pub fn body(
        operation: &'static str,
        accepted: &'static [StatusCode],
        media: MediaType,
        decode: impl Fn(&[u8]) -> AnyResult<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            operation,
            accepted,
            absent_as_empty: false,
            decoder: Decoder::Body(media, Box::new(decode)),
        }
    }

    /// Handler that only reads response headers; the body is ignored.
    pub fn headers(
        operation: &'static str,
        accepted: &'static [StatusCode],
        decode: impl Fn(&HeaderMap) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            operation,
            accepted,
            absent_as_empty: false,
            decoder: Decoder::Headers(Box::new(decode)),
        }
    }

    /// Report 404 and 410 as [`Outcome::Empty`] instead of a failure.
    pub fn absent_as_empty(mut self) -> Self {
        self.absent_as_empty = true;
        self
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn handle(&self, response: RawResponse) -> Result<Outcome<T>, DavError> {
        let status = response.status;
        tracing::trace!(
            operation = self.operation,
            status = status.as_u16(),
            "handling response"
        );

        if self.absent_as_empty && FailureKind::from_status(status) == FailureKind::Absent {
            return Ok(Outcome::Empty);
        }
        if !self.accepted.contains(&status) {
            return Ok(Outcome::Failure(ProtocolFailure::from_response(response)));
        }

        match &self.decoder {
            Decoder::Headers(decode) => Ok(Outcome::Success(decode(&response.headers))),
            Decoder::Body(media, decode) => {
                if response.body.is_empty() {
                    return Ok(Outcome::Empty);
                }
                if let Some(content_type) = response.headers.get(header::CONTENT_TYPE) {
                    let declared = content_type.to_str().unwrap_or_default();
                    if !media.matches(declared) {
                        return Err(DavError::malformed(
                            *media,
                            format!(
                                "{} returned content type `{declared}`, expected `{media}`",
                                self.operation
                            ),
                        ));
                    }
                }
                decode(&response.body)
                    .map(Outcome::Success)
                    .map_err(|err| DavError::malformed(*media, format!("{err:#}")))
            }
        }
    }
}

/// Tokens of every `name` header line, split on commas and whitespace, mapped
/// through `classify`. Tokens it rejects are dropped.
pub fn header_elements<T>(
    headers: &HeaderMap,
    name: impl header::AsHeaderName,
    classify: impl Fn(&str) -> Option<T>,
) -> Vec<T> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(|c: char| c == ',' || c.is_whitespace()))
        .filter(|token| !token.is_empty())
        .filter_map(classify)
        .collect()
}

/// Value of the `ETag` header, if any.
pub fn etag_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::ETAG)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
