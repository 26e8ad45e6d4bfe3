//! CardDAV request bodies (RFC 6352).

use crate::webdav::xml::{build_multiget_body, escape_xml};

pub const CARDDAV_NS: &str = "urn:ietf:params:xml:ns:carddav";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// `addressbook-query` REPORT body with an empty filter, which matches every card.
pub fn build_addressbook_query_body(include_data: bool) -> String {
    let mut prop = String::from("<D:prop><D:getetag/>");
    if include_data {
        prop.push_str("<C:address-data/>");
    }
    prop.push_str("</D:prop>");

    format!(
        r#"{XML_DECL}<C:addressbook-query xmlns:D="DAV:" xmlns:C="{CARDDAV_NS}">{prop}<C:filter/></C:addressbook-query>"#
    )
}

pub fn build_addressbook_multiget_body<I, S>(hrefs: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    build_multiget_body(CARDDAV_NS, "addressbook-multiget", "address-data", hrefs)
}

/// Extended `MKCOL` body (RFC 5689) creating an address book.
pub fn build_mkcol_addressbook_body(display_name: Option<&str>) -> String {
    let mut body = format!(
        r#"{XML_DECL}<D:mkcol xmlns:D="DAV:" xmlns:C="{CARDDAV_NS}"><D:set><D:prop><D:resourcetype><D:collection/><C:addressbook/></D:resourcetype>"#
    );
    if let Some(name) = display_name {
        body.push_str("<D:displayname>");
        body.push_str(&escape_xml(name));
        body.push_str("</D:displayname>");
    }
    body.push_str("</D:prop></D:set></D:mkcol>");
    body
}
