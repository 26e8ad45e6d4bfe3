//! CalDAV / CardDAV connector for Rust.
//!
//! This library talks to CalDAV (RFC 4791) and CardDAV (RFC 6352) servers over
//! hyper 1.x, rustls and tokio. It discovers calendars and address books, keeps
//! an ETag-validated cache of the objects they hold, and pushes local changes
//! back with conditional `PUT`/`DELETE` requests.
//!
//! # Features
//!
//! - Capability negotiation from the `DAV` header
//! - Principal, home-set and collection discovery
//! - Lazy (`PROPFIND`) or eager (`calendar-query` / `addressbook-query`) listing
//! - `calendar-multiget` / `addressbook-multiget` batch fetches
//! - Incremental `sync-collection` (RFC 6578)
//! - `If-Match` / `If-None-Match` guarded writes with typed conflict results
//! - Automatic response decompression (br/zstd/gzip)
//! - Parsed objects through [`icalendar`] and [`vcard4`]
//!
//! # Examples
//!
//! ## Connecting and listing calendars
//!
//! ```no_run
//! use dav_connector::{CollectionKind, ConnectorConfig, Store};
//!
//! #[tokio::main]
//! async fn main() -> dav_connector::Result<()> {
//!     let config = ConnectorConfig::new("https://caldav.example.com/dav/")
//!         .with_basic_auth("username", "password");
//!     let mut store = Store::connect(config).await?;
//!
//!     // Principal first, then its calendar home set
//!     store.discover_principal().await?;
//!     store.discover_home_set(CollectionKind::Calendar).await?;
//!
//!     for calendar in store.collections(CollectionKind::Calendar).await? {
//!         println!(
//!             "{} {:?} {:?}",
//!             calendar.href(),
//!             calendar.properties().display_name,
//!             calendar.properties().supported_components,
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Reading and writing events
//!
//! ```no_run
//! use dav_connector::{CollectionKind, ConnectorConfig, DavObject, Store, WriteOutcome};
//! use icalendar::{Calendar, Component, Event};
//!
//! #[tokio::main]
//! async fn main() -> dav_connector::Result<()> {
//!     let config = ConnectorConfig::new("https://caldav.example.com/dav/")
//!         .with_calendar_home("/dav/calendars/alice/");
//!     let mut store = Store::connect(config).await?;
//!
//!     let calendar = store.open_collection("/dav/calendars/alice/work/", CollectionKind::Calendar)?;
//!     calendar.discover().await?;
//!     for href in calendar.enumerate().await? {
//!         if let Some(object) = calendar.fetch(&href).await? {
//!             println!("{href}: {:?}", object.title());
//!         }
//!     }
//!
//!     let mut event = Event::new();
//!     event.uid("standup-2024@example.com").summary("Standup");
//!     let ics = Calendar::new().push(event.done()).done();
//!
//!     match calendar.add(DavObject::Calendar(ics)).await? {
//!         WriteOutcome::Stored { href, etag } => println!("stored {href} as {etag:?}"),
//!         WriteOutcome::Conflict(failure) => println!("already exists: {failure}"),
//!         other => println!("{other:?}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental sync
//!
//! ```no_run
//! use dav_connector::{Collection, HyperTransport, SupportedFeature};
//!
//! async fn refresh(calendar: &mut Collection<HyperTransport>) -> dav_connector::Result<()> {
//!     if calendar.supports(SupportedFeature::SyncCollection) {
//!         let changes = calendar.sync().await?;
//!         println!("{} changed, {} removed", changes.changed.len(), changes.removed.len());
//!     } else {
//!         calendar.enumerate().await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Logging goes through [`tracing`]; no subscriber is installed by the library.

pub mod caldav;
pub mod carddav;
pub mod common;
pub mod config;
pub mod connector;
pub mod error;
pub mod webdav;

pub use config::{AuthMethod, ConnectorConfig};
pub use connector::{
    Collection, CollectionKind, CollectionProperties, CollectionState, DavObject, RemoteResource,
    Store, SyncChanges, WriteOutcome,
};
pub use error::{DavError, Result};
pub use webdav::{
    DavErrorBody, DavItem, DavMethod, DavRequest, Depth, FailureKind, HyperTransport, MediaType,
    Outcome, ProtocolFailure, RawResponse, ResponseHandler, SupportedFeature, Transport,
    header_elements, negotiate, negotiate_headers, negotiate_with,
};
