//! Request bodies shared by CalDAV and CardDAV.
//!
//! Every builder binds `D` to `DAV:` and, where a protocol namespace is needed,
//! `C` to the caller's namespace (CalDAV or CardDAV).

pub const DAV_NS: &str = "DAV:";
pub const CALENDARSERVER_NS: &str = "http://calendarserver.org/ns/";
pub const APPLE_ICAL_NS: &str = "http://apple.com/ns/ical/";

pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

const XML_DECL: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// `PROPFIND` body asking for `DAV:current-user-principal`.
pub fn build_principal_propfind_body() -> String {
    format!(
        r#"{XML_DECL}<D:propfind xmlns:D="DAV:"><D:prop><D:current-user-principal/></D:prop></D:propfind>"#
    )
}

/// `PROPFIND` body asking for a single home-set property in `namespace`.
pub fn build_home_set_propfind_body(namespace: &str, home_set_element: &str) -> String {
    format!(
        r#"{XML_DECL}<D:propfind xmlns:D="DAV:" xmlns:C="{namespace}"><D:prop><C:{home_set_element}/></D:prop></D:propfind>"#
    )
}

/// `PROPFIND` body describing a collection: everything discovery records.
///
/// `extra_props` are protocol-specific elements in the `C` namespace, e.g.
/// `supported-calendar-component-set`.
pub fn build_collection_propfind_body(namespace: &str, extra_props: &[&str]) -> String {
    let mut body = format!(
        r#"{XML_DECL}<D:propfind xmlns:D="DAV:" xmlns:C="{namespace}" xmlns:CS="{CALENDARSERVER_NS}" xmlns:A="{APPLE_ICAL_NS}"><D:prop>"#
    );
    body.push_str("<D:resourcetype/><D:displayname/><D:sync-token/><D:supported-report-set/>");
    body.push_str("<CS:getctag/><A:calendar-color/>");
    for prop in extra_props {
        body.push_str("<C:");
        body.push_str(prop);
        body.push_str("/>");
    }
    body.push_str("</D:prop></D:propfind>");
    body
}

/// `PROPFIND` body listing collection members with their entity tags.
pub fn build_members_propfind_body() -> String {
    format!(
        r#"{XML_DECL}<D:propfind xmlns:D="DAV:"><D:prop><D:resourcetype/><D:getetag/><D:getcontenttype/></D:prop></D:propfind>"#
    )
}

/// `multiget` REPORT body (`calendar-multiget` / `addressbook-multiget`).
///
/// Returns `None` when no non-empty href is given.
pub fn build_multiget_body<I, S>(
    namespace: &str,
    report_element: &str,
    data_element: &str,
    hrefs: I,
) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut href_xml = String::new();
    for href in hrefs {
        let href = href.as_ref();
        if href.is_empty() {
            continue;
        }
        href_xml.push_str("<D:href>");
        href_xml.push_str(&escape_xml(href));
        href_xml.push_str("</D:href>");
    }
    if href_xml.is_empty() {
        return None;
    }

    Some(format!(
        r#"{XML_DECL}<C:{report_element} xmlns:D="DAV:" xmlns:C="{namespace}"><D:prop><D:getetag/><C:{data_element}/></D:prop>{href_xml}</C:{report_element}>"#
    ))
}

/// RFC 6578 `sync-collection` REPORT body. An absent token requests a full sync.
pub fn build_sync_collection_body(
    sync_token: Option<&str>,
    include_data: bool,
    namespace: &str,
    data_element: &str,
) -> String {
    let mut body = format!(r#"{XML_DECL}<D:sync-collection xmlns:D="DAV:" xmlns:C="{namespace}">"#);
    match sync_token {
        Some(token) => {
            body.push_str("<D:sync-token>");
            body.push_str(&escape_xml(token));
            body.push_str("</D:sync-token>");
        }
        None => body.push_str("<D:sync-token/>"),
    }
    body.push_str("<D:sync-level>1</D:sync-level>");
    body.push_str("<D:prop><D:getetag/>");
    if include_data {
        body.push_str("<C:");
        body.push_str(data_element);
        body.push_str("/>");
    }
    body.push_str("</D:prop>");
    body.push_str("</D:sync-collection>");
    body
}
