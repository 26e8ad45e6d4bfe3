//! Raw request/response exchange.
//!
//! Collections and stores only talk to the network through [`Transport`]. The
//! shipped [`HyperTransport`] resolves hrefs against the configured base URL,
//! attaches credentials and undoes response compression.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use bytes::Bytes;
use http_body_util::Full;
use hyper::ext::ReasonPhrase;
use hyper::{HeaderMap, Method, Request, StatusCode, Uri, header};
use tokio::time::timeout;

use crate::common::compression::{
    add_accept_encoding, decompress_body, detect_encodings, normalize_decoded_headers,
};
use crate::common::http::{HyperClient, build_hyper_client};
use crate::config::{AuthMethod, ConnectorConfig};
use crate::error::DavError;
use crate::webdav::response::MediaType;
use crate::webdav::types::{Depth, quote_etag};

/// Methods the connector issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DavMethod {
    Get,
    Put,
    Delete,
    Options,
    Propfind,
    Report,
    Mkcalendar,
    Mkcol,
}

impl DavMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DavMethod::Get => "GET",
            DavMethod::Put => "PUT",
            DavMethod::Delete => "DELETE",
            DavMethod::Options => "OPTIONS",
            DavMethod::Propfind => "PROPFIND",
            DavMethod::Report => "REPORT",
            DavMethod::Mkcalendar => "MKCALENDAR",
            DavMethod::Mkcol => "MKCOL",
        }
    }

    fn to_method(self) -> Result<Method> {
        Ok(match self {
            DavMethod::Get => Method::GET,
            DavMethod::Put => Method::PUT,
            DavMethod::Delete => Method::DELETE,
            DavMethod::Options => Method::OPTIONS,
            other => Method::from_bytes(other.as_str().as_bytes())?,
        })
    }
}

/// One request, addressed by href relative to the transport's base URL.
#[derive(Debug, Clone)]
pub struct DavRequest {
    pub method: DavMethod,
    pub href: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl DavRequest {
    pub fn new(method: DavMethod, href: impl Into<String>) -> Self {
        Self {
            method,
            href: href.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(href: impl Into<String>) -> Self {
        Self::new(DavMethod::Get, href)
    }

    pub fn delete(href: impl Into<String>) -> Self {
        Self::new(DavMethod::Delete, href)
    }

    pub fn options(href: impl Into<String>) -> Self {
        Self::new(DavMethod::Options, href)
    }

    pub fn put(href: impl Into<String>, media: MediaType, body: Bytes) -> Self {
        Self::new(DavMethod::Put, href)
            .with_header(header::CONTENT_TYPE, media.header_value())
            .with_body(body)
    }

    pub fn propfind(href: impl Into<String>, depth: Depth, xml: String) -> Self {
        Self::new(DavMethod::Propfind, href)
            .with_depth(depth)
            .with_xml(xml)
    }

    pub fn report(href: impl Into<String>, depth: Depth, xml: String) -> Self {
        Self::new(DavMethod::Report, href)
            .with_depth(depth)
            .with_xml(xml)
    }

    pub fn mkcalendar(href: impl Into<String>, xml: String) -> Self {
        Self::new(DavMethod::Mkcalendar, href).with_xml(xml)
    }

    pub fn mkcol(href: impl Into<String>, xml: String) -> Self {
        Self::new(DavMethod::Mkcol, href).with_xml(xml)
    }

    /// Guard the request with `If-Match` on `etag`.
    pub fn if_match(mut self, etag: &str) -> Result<Self, DavError> {
        let value = header::HeaderValue::from_str(&quote_etag(etag))?;
        self.headers.insert(header::IF_MATCH, value);
        Ok(self)
    }

    /// Only create the resource: `If-None-Match: *`.
    pub fn if_none_match_any(self) -> Self {
        self.with_header(header::IF_NONE_MATCH, "*")
    }

    fn with_header(mut self, name: header::HeaderName, value: &'static str) -> Self {
        self.headers
            .insert(name, header::HeaderValue::from_static(value));
        self
    }

    fn with_depth(mut self, depth: Depth) -> Self {
        self.headers.insert(
            header::HeaderName::from_static("depth"),
            header::HeaderValue::from_static(depth.as_str()),
        );
        self
    }

    fn with_xml(self, xml: String) -> Self {
        self.with_header(header::CONTENT_TYPE, MediaType::Xml.header_value())
            .with_body(Bytes::from(xml))
    }

    fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of a header set on the request, as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Aggregated, identity-encoded response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Reason phrase sent by the server, when it differs from the canonical one.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            reason: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

/// Executes one request and returns the fully drained response.
///
/// Implementations report connection-level failures as errors; any HTTP status
/// is a successful exchange.
pub trait Transport: Send + Sync {
    fn execute(&self, request: DavRequest) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// [`Transport`] over a pooled hyper client with rustls.
#[derive(Clone)]
pub struct HyperTransport {
    base: Uri,
    client: HyperClient,
    auth_header: Option<header::HeaderValue>,
    user_agent: header::HeaderValue,
    default_timeout: Duration,
}

impl HyperTransport {
    pub fn new(config: &ConnectorConfig) -> Result<Self> {
        let client = build_hyper_client()?;
        let base: Uri = config.base_url.parse()?;
        if base.scheme().is_none() || base.authority().is_none() {
            return Err(anyhow!("base URL must be absolute: {}", config.base_url));
        }

        let auth_header = match &config.auth {
            AuthMethod::None => None,
            AuthMethod::Basic { username, password } => {
                let token = format!("{username}:{password}");
                let val = format!("Basic {}", B64.encode(token));
                Some(header::HeaderValue::from_str(&val)?)
            }
            AuthMethod::Bearer { token } => {
                let mut value = header::HeaderValue::from_str(&format!("Bearer {token}"))?;
                value.set_sensitive(true);
                Some(value)
            }
        };

        Ok(Self {
            base,
            client,
            auth_header,
            user_agent: header::HeaderValue::from_str(&config.user_agent)?,
            default_timeout: config.timeout(),
        })
    }

    pub fn base(&self) -> &Uri {
        &self.base
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through; paths
    /// starting with `/` replace the base path; anything else is appended to it.
    pub fn build_uri(&self, path: &str) -> Result<Uri> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(path.parse()?);
        }

        let mut parts = self.base.clone().into_parts();
        let existing_path = parts
            .path_and_query
            .as_ref()
            .map(|pq| pq.path())
            .unwrap_or("/");

        let (path_only, query) = match path.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path, None),
        };

        let mut combined = if path_only.is_empty() {
            existing_path.to_string()
        } else if path_only.starts_with('/') {
            path_only.to_string()
        } else {
            let mut base = existing_path.trim_end_matches('/').to_string();
            base.push('/');
            base.push_str(path_only);
            base
        };
        if combined.is_empty() {
            combined.push('/');
        }

        let path_and_query = match query {
            Some(q) => format!("{combined}?{q}").parse()?,
            None => combined.parse()?,
        };
        parts.path_and_query = Some(path_and_query);
        Ok(Uri::from_parts(parts)?)
    }

    async fn send(&self, request: DavRequest) -> Result<RawResponse> {
        let uri = self.build_uri(&request.href)?;
        let method = request.method.to_method()?;
        let mut headers = request.headers;
        add_accept_encoding(&mut headers);

        let mut req_builder = Request::builder()
            .method(method)
            .uri(uri.clone())
            .header(header::USER_AGENT, self.user_agent.clone());
        if let Some(auth_header) = &self.auth_header {
            req_builder = req_builder.header(header::AUTHORIZATION, auth_header);
        }
        if request.body.is_some() && !headers.contains_key(header::CONTENT_TYPE) {
            req_builder = req_builder.header(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/xml; charset=utf-8"),
            );
        }
        for (k, v) in headers.iter() {
            req_builder = req_builder.header(k, v);
        }
        let req = req_builder.body(Full::new(request.body.unwrap_or_default()))?;

        // The deadline covers the response head and the whole body.
        let exchange = async {
            let resp = self.client.request(req).await?;
            let encodings = detect_encodings(resp.headers());
            let (mut parts, body) = resp.into_parts();
            let body = decompress_body(body, &encodings).await?;
            normalize_decoded_headers(&mut parts.headers, &encodings, body.len());
            Ok::<_, anyhow::Error>((parts, body))
        };
        let (parts, body) = timeout(self.default_timeout, exchange)
            .await
            .map_err(|_| anyhow!("{} {uri} timed out", request.method.as_str()))??;

        let reason = parts
            .extensions
            .get::<ReasonPhrase>()
            .and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
            .map(str::to_string);

        tracing::debug!(
            method = request.method.as_str(),
            %uri,
            status = parts.status.as_u16(),
            bytes = body.len(),
            "dav exchange"
        );

        Ok(RawResponse {
            status: parts.status,
            reason,
            headers: parts.headers,
            body,
        })
    }
}

impl Transport for HyperTransport {
    async fn execute(&self, request: DavRequest) -> Result<RawResponse> {
        self.send(request).await
    }
}
