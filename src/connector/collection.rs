//! One remote calendar or address book and its resource cache.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use hyper::{StatusCode, header};

use crate::caldav::{build_calendar_multiget_body, build_calendar_query_body};
use crate::carddav::{build_addressbook_multiget_body, build_addressbook_query_body};
use crate::connector::kind::{CollectionKind, DavObject};
use crate::error::{DavError, Result};
use crate::webdav::features::SupportedFeature;
use crate::webdav::multistatus::{ParseResult, parse_multistatus_bytes};
use crate::webdav::response::{MediaType, Outcome, ProtocolFailure, ResponseHandler, etag_header};
use crate::webdav::transport::{DavRequest, RawResponse, Transport};
use crate::webdav::types::{DavItem, Depth, etags_match, href_path, join_href, same_href};
use crate::webdav::xml::{
    build_collection_propfind_body, build_members_propfind_body, build_sync_collection_body,
};

const MULTI_STATUS: &[StatusCode] = &[StatusCode::MULTI_STATUS];
const GET_OK: &[StatusCode] = &[StatusCode::OK];
const WRITE_OK: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT];
const DELETE_OK: &[StatusCode] = &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NO_CONTENT];

/// Lifecycle of a [`Collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    /// Constructed from an href; nothing read from the server yet.
    Uninitialized,
    /// Properties read; members not listed.
    Discovered,
    /// Members listed.
    Populated,
    /// Members listed, but a write left the cache out of step with the server.
    Stale,
}

/// Properties read by [`Collection::discover`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionProperties {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub ctag: Option<String>,
    pub sync_token: Option<String>,
    /// Components accepted by a calendar, e.g. `VEVENT`. Empty means unrestricted.
    pub supported_components: Vec<String>,
}

/// A cached member of a collection.
#[derive(Debug, Clone)]
pub struct RemoteResource {
    pub href: String,
    pub etag: Option<String>,
    pub content_type: Option<String>,
    /// Parsed body; `None` when the member was listed but not fetched.
    pub object: Option<Arc<DavObject>>,
    /// Set when the cached ETag can no longer be trusted.
    pub stale: bool,
}

impl RemoteResource {
    fn listed(href: String, etag: Option<String>, content_type: Option<String>) -> Self {
        let stale = etag.is_none();
        Self {
            href,
            etag,
            content_type,
            object: None,
            stale,
        }
    }

    /// Cached object usable without a round trip.
    pub fn fresh_object(&self) -> Option<&Arc<DavObject>> {
        if self.stale || self.etag.is_none() {
            return None;
        }
        self.object.as_ref()
    }
}

/// Result of a conditional write.
#[derive(Debug)]
pub enum WriteOutcome {
    /// The server stored the body. `etag` is `None` when the server did not
    /// return one; the entry is then stale.
    Stored { href: String, etag: Option<String> },
    Removed,
    /// The resource did not exist (404/410); any cached entry was evicted.
    Absent,
    /// The precondition failed (409/412); nothing was overwritten.
    Conflict(ProtocolFailure),
}

impl WriteOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, WriteOutcome::Conflict(_))
    }
}

/// Members reported by one [`Collection::sync`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncChanges {
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub sync_token: Option<String>,
}

/// Client-side representative of one remote calendar or address book.
///
/// All mutating operations take `&mut self`; each issues at most one request.
pub struct Collection<T> {
    transport: Arc<T>,
    href: String,
    kind: CollectionKind,
    state: CollectionState,
    properties: CollectionProperties,
    features: BTreeSet<SupportedFeature>,
    resources: HashMap<String, RemoteResource>,
    eager_bodies: bool,
}

impl<T> std::fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("href", &self.href)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("resources", &self.resources.len())
            .finish()
    }
}

impl<T: Transport> Collection<T> {
    pub fn new(transport: Arc<T>, href: impl Into<String>, kind: CollectionKind) -> Self {
        Self {
            transport,
            href: collection_key(&href.into()),
            kind,
            state: CollectionState::Uninitialized,
            properties: CollectionProperties::default(),
            features: BTreeSet::new(),
            resources: HashMap::new(),
            eager_bodies: false,
        }
    }

    /// Features the server advertised for the whole store.
    pub fn with_features(mut self, features: impl IntoIterator<Item = SupportedFeature>) -> Self {
        self.features.extend(features);
        self
    }

    /// List members with their bodies in one REPORT instead of fetching lazily.
    pub fn with_eager_bodies(mut self, eager: bool) -> Self {
        self.eager_bodies = eager;
        self
    }

    pub(crate) fn from_listing(
        transport: Arc<T>,
        item: &DavItem,
        kind: CollectionKind,
        features: &BTreeSet<SupportedFeature>,
        eager: bool,
    ) -> Self {
        let mut collection = Self::new(transport, href_path(&item.href), kind)
            .with_features(features.iter().copied())
            .with_eager_bodies(eager);
        collection.apply_properties(item);
        collection.set_state(CollectionState::Discovered);
        collection
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn properties(&self) -> &CollectionProperties {
        &self.properties
    }

    pub(crate) fn properties_mut(&mut self) -> &mut CollectionProperties {
        &mut self.properties
    }

    pub fn features(&self) -> &BTreeSet<SupportedFeature> {
        &self.features
    }

    pub fn supports(&self, feature: SupportedFeature) -> bool {
        self.features.contains(&feature)
    }

    pub fn resource(&self, href: &str) -> Option<&RemoteResource> {
        self.resources.get(href_path(href))
    }

    pub fn resources(&self) -> impl Iterator<Item = &RemoteResource> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn etag(&self, href: &str) -> Option<&str> {
        self.resource(href)?.etag.as_deref()
    }

    /// Mark a cached entry stale so the next `fetch` goes to the server.
    pub fn invalidate(&mut self, href: &str) -> bool {
        match self.resources.get_mut(href_path(href)) {
            Some(resource) => {
                resource.stale = true;
                true
            }
            None => false,
        }
    }

    pub fn evict(&mut self, href: &str) -> Option<RemoteResource> {
        self.resources.remove(href_path(href))
    }

    /// Forget the sync token so the next [`sync`](Self::sync) is a full one.
    pub fn reset_sync_token(&mut self) {
        self.properties.sync_token = None;
    }

    /// PROPFIND the collection itself and record its properties.
    pub async fn discover(&mut self) -> Result<&CollectionProperties> {
        let body =
            build_collection_propfind_body(self.kind.namespace(), self.kind.collection_props());
        let request = DavRequest::propfind(self.href.clone(), Depth::Zero, body);
        let result = request_multistatus(self.transport.as_ref(), "discover", request).await?;

        let item = result
            .items
            .iter()
            .find(|item| same_href(&item.href, &self.href))
            .or_else(|| result.items.first())
            .ok_or_else(|| DavError::NotACollection {
                href: self.href.clone(),
                kind: self.kind,
            })?;
        if !is_collection_of(item, self.kind) {
            return Err(DavError::NotACollection {
                href: self.href.clone(),
                kind: self.kind,
            });
        }

        let previous_ctag = self.properties.ctag.clone();
        self.apply_properties(item);
        match self.state {
            CollectionState::Uninitialized => self.set_state(CollectionState::Discovered),
            CollectionState::Populated if previous_ctag != self.properties.ctag => {
                self.set_state(CollectionState::Stale)
            }
            _ => {}
        }
        Ok(&self.properties)
    }

    /// List the members of the collection and reconcile the cache.
    ///
    /// Returns the hrefs of the listed members.
    pub async fn enumerate(&mut self) -> Result<Vec<String>> {
        if self.state == CollectionState::Uninitialized {
            return Err(DavError::NotDiscovered {
                href: self.href.clone(),
            });
        }

        let (operation, request) = if self.eager_bodies {
            let body = match self.kind {
                CollectionKind::Calendar => build_calendar_query_body(true),
                CollectionKind::AddressBook => build_addressbook_query_body(true),
            };
            ("enumerate", DavRequest::report(self.href.clone(), Depth::One, body))
        } else {
            let body = build_members_propfind_body();
            ("enumerate", DavRequest::propfind(self.href.clone(), Depth::One, body))
        };
        let result = request_multistatus(self.transport.as_ref(), operation, request).await?;

        let mut previous = std::mem::take(&mut self.resources);
        for item in result.items {
            if same_href(&item.href, &self.href) || item.is_collection || item.is_removed() {
                continue;
            }
            let key = href_path(&item.href).to_string();
            let old = previous.remove(&key);
            let entry = self.reconcile_entry(key.clone(), item, old);
            self.resources.insert(key, entry);
        }
        if !previous.is_empty() {
            tracing::debug!(
                collection = %self.href,
                evicted = previous.len(),
                "members no longer listed"
            );
        }

        self.set_state(CollectionState::Populated);
        let mut hrefs: Vec<String> = self.resources.keys().cloned().collect();
        hrefs.sort();
        Ok(hrefs)
    }

    /// Return the object at `href`, from the cache when its ETag is trusted.
    ///
    /// `None` when the server reports the resource absent; the entry is evicted.
    pub async fn fetch(&mut self, href: &str) -> Result<Option<Arc<DavObject>>> {
        let key = href_path(href).to_string();
        if let Some(object) = self.resources.get(&key).and_then(RemoteResource::fresh_object) {
            tracing::trace!(href = %key, "cache hit");
            return Ok(Some(Arc::clone(object)));
        }

        let response = self.exchange(DavRequest::get(key.clone())).await?;
        let etag = etag_header(&response.headers);
        let content_type = content_type_of(&response);
        let kind = self.kind;
        let handler = ResponseHandler::body("fetch", GET_OK, kind.media_type(), move |body| {
            kind.decode_raw(body)
        });

        match handler.handle(response)? {
            Outcome::Success(object) => {
                let object = Arc::new(object);
                let stale = etag.is_none();
                self.resources.insert(
                    key.clone(),
                    RemoteResource {
                        href: key,
                        etag,
                        content_type,
                        object: Some(Arc::clone(&object)),
                        stale,
                    },
                );
                Ok(Some(object))
            }
            Outcome::Empty => Err(DavError::malformed(kind.media_type(), "empty body")),
            Outcome::Failure(failure) if failure.is_absent() => {
                self.resources.remove(&key);
                Ok(None)
            }
            Outcome::Failure(failure) => Err(DavError::Protocol(failure)),
        }
    }

    /// Fetch several members with one multiget REPORT and cache them.
    pub async fn fetch_many<I, S>(&mut self, hrefs: I) -> Result<Vec<(String, Arc<DavObject>)>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let hrefs: Vec<String> = hrefs
            .into_iter()
            .map(|href| href_path(href.as_ref()).to_string())
            .collect();
        let body = match self.kind {
            CollectionKind::Calendar => build_calendar_multiget_body(&hrefs),
            CollectionKind::AddressBook => build_addressbook_multiget_body(&hrefs),
        };
        let Some(body) = body else {
            return Ok(Vec::new());
        };

        let request = DavRequest::report(self.href.clone(), Depth::One, body);
        let result = request_multistatus(self.transport.as_ref(), "fetch_many", request).await?;

        let mut fetched = Vec::new();
        for item in result.items {
            let key = href_path(&item.href).to_string();
            if item.is_removed() {
                self.resources.remove(&key);
                continue;
            }
            let Some(object) = item
                .object_data
                .as_deref()
                .and_then(|data| self.decode_listed(&key, data))
            else {
                continue;
            };
            let stale = item.etag.is_none();
            self.resources.insert(
                key.clone(),
                RemoteResource {
                    href: key.clone(),
                    etag: item.etag,
                    content_type: Some(self.kind.media_type().essence().to_string()),
                    object: Some(Arc::clone(&object)),
                    stale,
                },
            );
            fetched.push((key, object));
        }
        Ok(fetched)
    }

    /// Create a new member. The href is derived from the object's UID.
    pub async fn add(&mut self, object: DavObject) -> Result<WriteOutcome> {
        let body = self.prepare_write(&object)?;
        let name = object
            .uid()
            .map(|uid| sanitize_name(&uid))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let href = join_href(&self.href, &format!("{name}.{}", self.kind.extension()));

        let request =
            DavRequest::put(href.clone(), self.kind.media_type(), body).if_none_match_any();
        self.write(href, request, object).await
    }

    /// Replace a member, provided it still carries `expected_etag`.
    pub async fn update(
        &mut self,
        href: &str,
        object: DavObject,
        expected_etag: &str,
    ) -> Result<WriteOutcome> {
        let body = self.prepare_write(&object)?;
        let href = href_path(href).to_string();
        let request =
            DavRequest::put(href.clone(), self.kind.media_type(), body).if_match(expected_etag)?;
        self.write(href, request, object).await
    }

    /// Delete a member, provided it still carries `expected_etag`.
    pub async fn remove(&mut self, href: &str, expected_etag: &str) -> Result<WriteOutcome> {
        let key = href_path(href).to_string();
        let request = DavRequest::delete(key.clone()).if_match(expected_etag)?;
        let response = self.exchange(request).await?;
        let handler = ResponseHandler::headers("remove", DELETE_OK, |_| ());

        match handler.handle(response)? {
            Outcome::Success(()) | Outcome::Empty => {
                self.resources.remove(&key);
                Ok(WriteOutcome::Removed)
            }
            Outcome::Failure(failure) => self.write_failure(&key, failure),
        }
    }

    /// Apply the changes since the stored sync token (RFC 6578).
    pub async fn sync(&mut self) -> Result<SyncChanges> {
        if !self.supports(SupportedFeature::SyncCollection) {
            return Err(DavError::UnsupportedFeature(
                SupportedFeature::SyncCollection,
            ));
        }

        let full = self.properties.sync_token.is_none();
        let body = build_sync_collection_body(
            self.properties.sync_token.as_deref(),
            self.eager_bodies,
            self.kind.namespace(),
            self.kind.data_element(),
        );
        let request = DavRequest::report(self.href.clone(), Depth::Zero, body);
        let result = match request_multistatus(self.transport.as_ref(), "sync", request).await {
            Ok(result) => result,
            Err(DavError::Protocol(failure)) => {
                if failure
                    .error
                    .as_ref()
                    .is_some_and(|error| error.has("valid-sync-token"))
                {
                    tracing::debug!(collection = %self.href, "sync token rejected, resetting");
                    self.reset_sync_token();
                }
                return Err(DavError::Protocol(failure));
            }
            Err(err) => return Err(err),
        };

        // A full sync lists every member; whatever it leaves out is gone.
        let mut unlisted = if full {
            std::mem::take(&mut self.resources)
        } else {
            HashMap::new()
        };
        let mut changes = SyncChanges::default();
        for item in result.items {
            if same_href(&item.href, &self.href) {
                continue;
            }
            let key = href_path(&item.href).to_string();
            if item.is_removed() {
                self.resources.remove(&key);
                unlisted.remove(&key);
                changes.removed.push(key);
                continue;
            }

            let old = if full {
                unlisted.remove(&key)
            } else {
                self.resources.remove(&key)
            };
            let entry = self.reconcile_entry(key.clone(), item, old);
            self.resources.insert(key.clone(), entry);
            changes.changed.push(key);
        }
        if !unlisted.is_empty() {
            let mut gone: Vec<String> = unlisted.into_keys().collect();
            gone.sort();
            tracing::debug!(
                collection = %self.href,
                evicted = gone.len(),
                "members dropped by full sync"
            );
            changes.removed.extend(gone);
        }

        if result.sync_token.is_some() {
            self.properties.sync_token = result.sync_token;
        }
        changes.sync_token = self.properties.sync_token.clone();
        if full || matches!(self.state, CollectionState::Populated | CollectionState::Stale) {
            self.set_state(CollectionState::Populated);
        }
        Ok(changes)
    }

    fn prepare_write(&self, object: &DavObject) -> Result<bytes::Bytes> {
        let body = self.kind.encode(object)?;
        if !self.properties.supported_components.is_empty() {
            for component in object.component_names() {
                let accepted = self
                    .properties
                    .supported_components
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(component));
                if !accepted {
                    return Err(DavError::UnsupportedComponent {
                        component: component.to_string(),
                        href: self.href.clone(),
                    });
                }
            }
        }
        Ok(body)
    }

    async fn write(
        &mut self,
        href: String,
        request: DavRequest,
        object: DavObject,
    ) -> Result<WriteOutcome> {
        let response = self.exchange(request).await?;
        let content_type = Some(self.kind.media_type().essence().to_string());
        let handler = ResponseHandler::headers("write", WRITE_OK, etag_header);

        let etag = match handler.handle(response)? {
            Outcome::Success(etag) => etag,
            Outcome::Empty => None,
            Outcome::Failure(failure) => return self.write_failure(&href, failure),
        };

        if etag.is_none() {
            tracing::warn!(%href, "server stored the resource without returning an ETag");
            if self.state != CollectionState::Uninitialized {
                self.set_state(CollectionState::Stale);
            }
        }
        self.resources.insert(
            href.clone(),
            RemoteResource {
                href: href.clone(),
                etag: etag.clone(),
                content_type,
                object: Some(Arc::new(object)),
                stale: etag.is_none(),
            },
        );
        Ok(WriteOutcome::Stored { href, etag })
    }

    fn write_failure(&mut self, key: &str, failure: ProtocolFailure) -> Result<WriteOutcome> {
        if failure.is_conflict() {
            self.invalidate(key);
            tracing::debug!(
                href = %key,
                status = failure.status.as_u16(),
                "write precondition failed"
            );
            Ok(WriteOutcome::Conflict(failure))
        } else if failure.is_absent() {
            self.resources.remove(key);
            Ok(WriteOutcome::Absent)
        } else {
            Err(DavError::Protocol(failure))
        }
    }

    /// Cache entry for a listed member. The previous object is kept while its
    /// ETag is unchanged; otherwise any inline body is decoded.
    fn reconcile_entry(
        &self,
        key: String,
        item: DavItem,
        previous: Option<RemoteResource>,
    ) -> RemoteResource {
        let mut entry = RemoteResource::listed(key, item.etag, item.content_type);
        let unchanged = previous
            .filter(|old| !old.stale && same_etag(old.etag.as_deref(), entry.etag.as_deref()));
        entry.object = match unchanged {
            Some(old) => old.object,
            None => item
                .object_data
                .as_deref()
                .and_then(|data| self.decode_listed(&entry.href, data)),
        };
        entry
    }

    fn decode_listed(&self, href: &str, data: &str) -> Option<Arc<DavObject>> {
        match self.kind.decode(data.as_bytes()) {
            Ok(object) => Some(Arc::new(object)),
            Err(err) => {
                tracing::warn!(%href, error = %err, "skipping undecodable member body");
                None
            }
        }
    }

    async fn exchange(&self, request: DavRequest) -> Result<RawResponse> {
        self.transport
            .execute(request)
            .await
            .map_err(DavError::Transport)
    }

    pub(crate) fn apply_properties(&mut self, item: &DavItem) {
        self.properties.display_name = item.displayname.clone();
        self.properties.description = item.description.clone();
        self.properties.color = item.color.clone();
        self.properties.ctag = item.ctag.clone();
        if item.sync_token.is_some() {
            self.properties.sync_token = item.sync_token.clone();
        }
        self.properties.supported_components = item.supported_components.clone();
        if item
            .supported_reports
            .iter()
            .any(|report| report.eq_ignore_ascii_case("sync-collection"))
        {
            self.features.insert(SupportedFeature::SyncCollection);
        }
    }

    pub(crate) fn set_state(&mut self, state: CollectionState) {
        if self.state != state {
            tracing::debug!(
                collection = %self.href,
                from = ?self.state,
                to = ?state,
                "collection state"
            );
            self.state = state;
        }
    }
}

/// Send `request` and decode a `207 Multi-Status` answer.
pub(crate) async fn request_multistatus<T: Transport>(
    transport: &T,
    operation: &'static str,
    request: DavRequest,
) -> Result<ParseResult> {
    let response = transport
        .execute(request)
        .await
        .map_err(DavError::Transport)?;
    let handler =
        ResponseHandler::body(operation, MULTI_STATUS, MediaType::Xml, parse_multistatus_bytes);
    match handler.handle(response)? {
        Outcome::Success(result) => Ok(result),
        Outcome::Empty => Ok(ParseResult::default()),
        Outcome::Failure(failure) => Err(DavError::Protocol(failure)),
    }
}

pub(crate) fn is_collection_of(item: &DavItem, kind: CollectionKind) -> bool {
    item.is_collection
        && match kind {
            CollectionKind::Calendar => item.is_calendar,
            CollectionKind::AddressBook => item.is_addressbook,
        }
}

/// Path of a collection href with exactly one trailing slash.
pub(crate) fn collection_key(href: &str) -> String {
    format!("{}/", href_path(href).trim_end_matches('/'))
}

fn same_etag(old: Option<&str>, new: Option<&str>) -> bool {
    matches!((old, new), (Some(a), Some(b)) if etags_match(a, b))
}

fn content_type_of(response: &RawResponse) -> Option<String> {
    response
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Member name derived from a UID: anything outside `[A-Za-z0-9@._-]` becomes `_`.
fn sanitize_name(uid: &str) -> String {
    uid.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
