//! Top-level session against one DAV server.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use hyper::StatusCode;

use crate::caldav::build_mkcalendar_body;
use crate::carddav::build_mkcol_addressbook_body;
use crate::config::ConnectorConfig;
use crate::connector::collection::{
    Collection, CollectionState, WriteOutcome, collection_key, is_collection_of,
    request_multistatus,
};
use crate::connector::kind::CollectionKind;
use crate::error::{DavError, Result};
use crate::webdav::features::{SupportedFeature, negotiate_headers};
use crate::webdav::response::{Outcome, ResponseHandler};
use crate::webdav::transport::{DavRequest, HyperTransport, Transport};
use crate::webdav::types::{Depth, same_href};
use crate::webdav::xml::{
    build_collection_propfind_body, build_home_set_propfind_body, build_principal_propfind_body,
};

const OPTIONS_OK: &[StatusCode] = &[StatusCode::OK, StatusCode::NO_CONTENT];
const CREATE_OK: &[StatusCode] = &[StatusCode::OK, StatusCode::CREATED];
const DELETE_OK: &[StatusCode] = &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NO_CONTENT];

/// A connected session: negotiated capabilities, discovered home sets and the
/// collections found under them.
///
/// ```no_run
/// use dav_connector::{CollectionKind, ConnectorConfig, Store};
///
/// # async fn demo() -> dav_connector::Result<()> {
/// let config = ConnectorConfig::new("https://dav.example.com/dav/")
///     .with_basic_auth("alice", "secret");
/// let mut store = Store::connect(config).await?;
/// store.discover_principal().await?;
/// store.discover_home_set(CollectionKind::Calendar).await?;
/// for calendar in store.collections(CollectionKind::Calendar).await? {
///     println!("{:?}", calendar.properties().display_name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Store<T = HyperTransport> {
    transport: Arc<T>,
    config: ConnectorConfig,
    features: BTreeSet<SupportedFeature>,
    principal: Option<String>,
    home_sets: HashMap<CollectionKind, Vec<String>>,
    collections: BTreeMap<String, Collection<T>>,
}

impl Store<HyperTransport> {
    /// Build a [`HyperTransport`] from `config` and probe the server.
    pub async fn connect(config: ConnectorConfig) -> Result<Self> {
        let transport =
            HyperTransport::new(&config).map_err(|err| DavError::Config(format!("{err:#}")))?;
        Self::connect_with(transport, config).await
    }
}

impl<T: Transport> Store<T> {
    /// Probe the server with `OPTIONS` and record the advertised capabilities.
    pub async fn connect_with(transport: T, config: ConnectorConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(DavError::Config("base_url is empty".into()));
        }

        let transport = Arc::new(transport);
        let response = transport
            .execute(DavRequest::options(""))
            .await
            .map_err(DavError::Transport)?;
        let handler = ResponseHandler::headers("connect", OPTIONS_OK, negotiate_headers);
        let features = match handler.handle(response)? {
            Outcome::Success(features) => features,
            Outcome::Empty => BTreeSet::new(),
            Outcome::Failure(failure) => return Err(DavError::Protocol(failure)),
        };
        tracing::debug!(base = %config.base_url, ?features, "server capabilities");

        let mut home_sets = HashMap::new();
        if let Some(home) = &config.calendar_home {
            home_sets.insert(CollectionKind::Calendar, vec![collection_key(home)]);
        }
        if let Some(home) = &config.addressbook_home {
            home_sets.insert(CollectionKind::AddressBook, vec![collection_key(home)]);
        }

        Ok(Self {
            transport,
            config,
            features,
            principal: None,
            home_sets,
            collections: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn features(&self) -> &BTreeSet<SupportedFeature> {
        &self.features
    }

    pub fn supports(&self, feature: SupportedFeature) -> bool {
        self.features.contains(&feature)
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Known home sets of `kind`; the first one is the primary.
    pub fn home_sets(&self, kind: CollectionKind) -> &[String] {
        self.home_sets
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Look up `DAV:current-user-principal` on the base URL.
    pub async fn discover_principal(&mut self) -> Result<Option<&str>> {
        let request = DavRequest::propfind("", Depth::Zero, build_principal_propfind_body());
        let result =
            request_multistatus(self.transport.as_ref(), "discover_principal", request).await?;

        let principal = result
            .items
            .iter()
            .flat_map(|item| item.current_user_principal.iter())
            .find(|href| !href.trim().is_empty())
            .map(|href| collection_key(href));
        if principal.is_some() {
            tracing::debug!(principal = ?principal, "principal discovered");
            self.principal = principal;
        }
        Ok(self.principal.as_deref())
    }

    /// Look up the home set of `kind` on the principal, or on the base URL when
    /// no principal is known. Replaces any configured home set when found.
    pub async fn discover_home_set(&mut self, kind: CollectionKind) -> Result<&[String]> {
        let target = self.principal.clone().unwrap_or_default();
        let body = build_home_set_propfind_body(kind.namespace(), kind.home_set_element());
        let request = DavRequest::propfind(target, Depth::Zero, body);
        let result =
            request_multistatus(self.transport.as_ref(), "discover_home_set", request).await?;

        let mut found: Vec<String> = Vec::new();
        for item in &result.items {
            let hrefs = match kind {
                CollectionKind::Calendar => &item.calendar_home_set,
                CollectionKind::AddressBook => &item.addressbook_home_set,
            };
            for href in hrefs {
                let key = collection_key(href);
                if !href.trim().is_empty() && !found.contains(&key) {
                    found.push(key);
                }
            }
        }
        if !found.is_empty() {
            tracing::debug!(%kind, home_sets = ?found, "home set discovered");
            self.home_sets.insert(kind, found);
        }
        Ok(self.home_sets(kind))
    }

    /// List the collections of `kind` under the primary home set.
    ///
    /// Collections already known keep their cached members; their properties
    /// are refreshed.
    pub async fn collections(&mut self, kind: CollectionKind) -> Result<Vec<&mut Collection<T>>> {
        self.require(kind.required_feature())?;
        let home = self
            .home_sets(kind)
            .first()
            .cloned()
            .ok_or(DavError::HomeSetUnknown(kind))?;

        let body = build_collection_propfind_body(kind.namespace(), kind.collection_props());
        let request = DavRequest::propfind(home.clone(), Depth::One, body);
        let result = request_multistatus(self.transport.as_ref(), "collections", request).await?;

        let mut listed = BTreeSet::new();
        for item in &result.items {
            if same_href(&item.href, &home) || !is_collection_of(item, kind) {
                continue;
            }
            let key = collection_key(&item.href);
            match self.collections.get_mut(&key) {
                Some(existing) if existing.kind() == kind => {
                    existing.apply_properties(item);
                    if existing.state() == CollectionState::Uninitialized {
                        existing.set_state(CollectionState::Discovered);
                    }
                }
                Some(_) => continue,
                None => {
                    let collection = Collection::from_listing(
                        Arc::clone(&self.transport),
                        item,
                        kind,
                        &self.features,
                        self.config.eager_bodies,
                    );
                    self.collections.insert(key.clone(), collection);
                }
            }
            listed.insert(key);
        }
        tracing::debug!(%kind, %home, count = listed.len(), "collections listed");

        Ok(self
            .collections
            .iter_mut()
            .filter(|(key, _)| listed.contains(*key))
            .map(|(_, collection)| collection)
            .collect())
    }

    /// Register a collection at a known href without any request.
    pub fn open_collection(
        &mut self,
        href: &str,
        kind: CollectionKind,
    ) -> Result<&mut Collection<T>> {
        let key = collection_key(href);
        if let Some(existing) = self.collections.get(&key) {
            if existing.kind() != kind {
                return Err(DavError::KindMismatch {
                    expected: kind,
                    found: existing.kind(),
                });
            }
        }
        let transport = Arc::clone(&self.transport);
        let features = self.features.clone();
        let eager = self.config.eager_bodies;
        Ok(self.collections.entry(key.clone()).or_insert_with(|| {
            Collection::new(transport, key, kind)
                .with_features(features)
                .with_eager_bodies(eager)
        }))
    }

    /// Create a calendar (`MKCALENDAR`) or an address book (extended `MKCOL`).
    pub async fn create_collection(
        &mut self,
        kind: CollectionKind,
        href: &str,
        display_name: Option<&str>,
    ) -> Result<&mut Collection<T>> {
        self.require(kind.required_feature())?;
        let key = collection_key(href);
        let request = match kind {
            CollectionKind::Calendar => {
                DavRequest::mkcalendar(key.clone(), build_mkcalendar_body(display_name, &[]))
            }
            CollectionKind::AddressBook => {
                self.require(SupportedFeature::ExtendedMkcol)?;
                DavRequest::mkcol(key.clone(), build_mkcol_addressbook_body(display_name))
            }
        };

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(DavError::Transport)?;
        let handler = ResponseHandler::headers("create_collection", CREATE_OK, |_| ());
        if let Outcome::Failure(failure) = handler.handle(response)? {
            return Err(DavError::Protocol(failure));
        }
        tracing::debug!(%kind, href = %key, "collection created");

        let mut collection = Collection::new(Arc::clone(&self.transport), key.clone(), kind)
            .with_features(self.features.iter().copied())
            .with_eager_bodies(self.config.eager_bodies);
        collection.properties_mut().display_name = display_name.map(str::to_string);
        collection.set_state(CollectionState::Discovered);
        Ok(match self.collections.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(collection);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(collection),
        })
    }

    /// Delete a collection on the server and forget it locally.
    pub async fn delete_collection(&mut self, href: &str) -> Result<WriteOutcome> {
        let key = collection_key(href);
        let response = self
            .transport
            .execute(DavRequest::delete(key.clone()))
            .await
            .map_err(DavError::Transport)?;
        let handler = ResponseHandler::headers("delete_collection", DELETE_OK, |_| ());

        match handler.handle(response)? {
            Outcome::Success(()) | Outcome::Empty => {
                self.collections.remove(&key);
                Ok(WriteOutcome::Removed)
            }
            Outcome::Failure(failure) if failure.is_absent() => {
                self.collections.remove(&key);
                Ok(WriteOutcome::Absent)
            }
            Outcome::Failure(failure) if failure.is_conflict() => {
                Ok(WriteOutcome::Conflict(failure))
            }
            Outcome::Failure(failure) => Err(DavError::Protocol(failure)),
        }
    }

    pub fn collection(&self, href: &str) -> Option<&Collection<T>> {
        self.collections.get(&collection_key(href))
    }

    pub fn collection_mut(&mut self, href: &str) -> Option<&mut Collection<T>> {
        self.collections.get_mut(&collection_key(href))
    }

    /// Move a collection out of the store, e.g. to drive it from another task.
    pub fn take_collection(&mut self, href: &str) -> Option<Collection<T>> {
        self.collections.remove(&collection_key(href))
    }

    /// Hrefs of every collection the store knows about.
    pub fn collection_hrefs(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    fn require(&self, feature: SupportedFeature) -> Result<()> {
        if self.supports(feature) {
            Ok(())
        } else {
            Err(DavError::UnsupportedFeature(feature))
        }
    }
}

impl<T> std::fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("base_url", &self.config.base_url)
            .field("features", &self.features)
            .field("principal", &self.principal)
            .field("collections", &self.collections.len())
            .finish()
    }
}
