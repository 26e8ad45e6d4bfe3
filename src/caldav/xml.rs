//! CalDAV request bodies (RFC 4791).

use crate::webdav::xml::{build_multiget_body, escape_xml};

pub const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// `calendar-query` REPORT body matching every object in the collection.
pub fn build_calendar_query_body(include_data: bool) -> String {
    let mut prop = String::from("<D:prop><D:getetag/>");
    if include_data {
        prop.push_str("<C:calendar-data/>");
    }
    prop.push_str("</D:prop>");

    format!(
        r#"{XML_DECL}<C:calendar-query xmlns:D="DAV:" xmlns:C="{CALDAV_NS}">{prop}<C:filter><C:comp-filter name="VCALENDAR"/></C:filter></C:calendar-query>"#
    )
}

pub fn build_calendar_multiget_body<I, S>(hrefs: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    build_multiget_body(CALDAV_NS, "calendar-multiget", "calendar-data", hrefs)
}

/// `MKCALENDAR` body setting the display name and the accepted components.
pub fn build_mkcalendar_body(display_name: Option<&str>, components: &[&str]) -> String {
    let mut body = format!(
        r#"{XML_DECL}<C:mkcalendar xmlns:D="DAV:" xmlns:C="{CALDAV_NS}"><D:set><D:prop>"#
    );
    if let Some(name) = display_name {
        body.push_str("<D:displayname>");
        body.push_str(&escape_xml(name));
        body.push_str("</D:displayname>");
    }
    if !components.is_empty() {
        body.push_str("<C:supported-calendar-component-set>");
        for comp in components {
            body.push_str(&format!(r#"<C:comp name="{}"/>"#, escape_xml(comp)));
        }
        body.push_str("</C:supported-calendar-component-set>");
    }
    body.push_str("</D:prop></D:set></C:mkcalendar>");
    body
}
