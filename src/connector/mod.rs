//! Stateful client side of the protocol: the [`Store`] session and the
//! [`Collection`]s it discovers.

pub mod collection;
pub mod kind;
pub mod store;

pub use collection::{
    Collection, CollectionProperties, CollectionState, RemoteResource, SyncChanges, WriteOutcome,
};
pub use kind::{CollectionKind, DavObject};
pub use store::Store;
