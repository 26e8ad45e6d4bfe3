//! Capability negotiation from the `DAV` response header.

use std::collections::BTreeSet;
use std::fmt;

use hyper::HeaderMap;

use crate::webdav::response::header_elements;

/// Capability tokens the connector understands.
///
/// Compliance classes (`1`, `2`, `3`) and vendor tokens outside this list are
/// not represented; servers routinely advertise tokens nobody has heard of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SupportedFeature {
    AccessControl,
    AddressBook,
    CalendarAccess,
    CalendarAutoSchedule,
    CalendarAvailability,
    CalendarManagedAttachments,
    CalendarNoTimezone,
    CalendarProxy,
    CalendarSchedule,
    CalendarServerHomeSync,
    CalendarServerPrincipalPropertySearch,
    CalendarServerPrincipalSearch,
    CalendarServerPrivateComments,
    CalendarServerPrivateEvents,
    CalendarServerSharing,
    CalendarServerSubscribed,
    ExtendedMkcol,
    InboxAvailability,
    SyncCollection,
}

const TOKENS: &[(&str, SupportedFeature)] = &[
    ("access-control", SupportedFeature::AccessControl),
    ("addressbook", SupportedFeature::AddressBook),
    ("calendar-access", SupportedFeature::CalendarAccess),
    ("calendar-auto-schedule", SupportedFeature::CalendarAutoSchedule),
    ("calendar-availability", SupportedFeature::CalendarAvailability),
    (
        "calendar-managed-attachments",
        SupportedFeature::CalendarManagedAttachments,
    ),
    ("calendar-no-timezone", SupportedFeature::CalendarNoTimezone),
    ("calendar-proxy", SupportedFeature::CalendarProxy),
    ("calendar-schedule", SupportedFeature::CalendarSchedule),
    ("calendarserver-home-sync", SupportedFeature::CalendarServerHomeSync),
    (
        "calendarserver-principal-property-search",
        SupportedFeature::CalendarServerPrincipalPropertySearch,
    ),
    (
        "calendarserver-principal-search",
        SupportedFeature::CalendarServerPrincipalSearch,
    ),
    (
        "calendarserver-private-comments",
        SupportedFeature::CalendarServerPrivateComments,
    ),
    (
        "calendarserver-private-events",
        SupportedFeature::CalendarServerPrivateEvents,
    ),
    ("calendarserver-sharing", SupportedFeature::CalendarServerSharing),
    ("calendarserver-subscribed", SupportedFeature::CalendarServerSubscribed),
    ("extended-mkcol", SupportedFeature::ExtendedMkcol),
    ("inbox-availability", SupportedFeature::InboxAvailability),
    ("sync-collection", SupportedFeature::SyncCollection),
];

impl SupportedFeature {
    /// Classify one token, ignoring ASCII case.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        TOKENS
            .iter()
            .find(|(name, _)| token.eq_ignore_ascii_case(name))
            .map(|(_, feature)| *feature)
    }

    pub fn as_str(self) -> &'static str {
        TOKENS
            .iter()
            .find(|(_, feature)| *feature == self)
            .map_or("", |(name, _)| name)
    }
}

impl fmt::Display for SupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a `DAV` header value with the built-in vocabulary.
pub fn negotiate(header_value: &str) -> BTreeSet<SupportedFeature> {
    negotiate_with(header_value, SupportedFeature::from_token)
}

/// Parse a `DAV` header value with a caller-supplied classifier.
pub fn negotiate_with<F>(header_value: &str, classify: F) -> BTreeSet<SupportedFeature>
where
    F: Fn(&str) -> Option<SupportedFeature>,
{
    header_value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(|token| classify_logged(token, &classify))
        .collect()
}

/// Features advertised across every `DAV` header line of a response.
pub fn negotiate_headers(headers: &HeaderMap) -> BTreeSet<SupportedFeature> {
    header_elements(headers, "dav", |token| {
        classify_logged(token, &SupportedFeature::from_token)
    })
    .into_iter()
    .collect()
}

fn classify_logged<F>(token: &str, classify: &F) -> Option<SupportedFeature>
where
    F: Fn(&str) -> Option<SupportedFeature>,
{
    let feature = classify(token);
    if feature.is_none() {
        tracing::trace!(token, "ignoring unknown DAV capability token");
    }
    feature
}
