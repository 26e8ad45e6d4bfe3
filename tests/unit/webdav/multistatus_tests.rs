use dav_connector::webdav::{parse_error_body, parse_multistatus_bytes};

#[test]
fn parse_multistatus_extracts_calendar_properties() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav"
               xmlns:CS="http://calendarserver.org/ns/" xmlns:A="http://apple.com/ns/ical/">
  <D:response>
    <D:href>/dav/user01/</D:href>
    <D:propstat>
      <D:prop>
        <C:calendar-home-set>
          <D:href>/dav/user01/</D:href>
        </C:calendar-home-set>
        <D:resourcetype>
          <D:collection/>
        </D:resourcetype>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/user01/personal/</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>Personal</D:displayname>
        <CS:getctag>ctag-9</CS:getctag>
        <A:calendar-color>#FF0000FF</A:calendar-color>
        <C:calendar-description>Things &amp; stuff</C:calendar-description>
        <D:resourcetype>
          <D:collection/>
          <C:calendar/>
        </D:resourcetype>
        <C:supported-calendar-component-set>
          <C:comp name="VEVENT"/>
          <C:comp name="vtodo"/>
        </C:supported-calendar-component-set>
        <D:supported-report-set>
          <D:supported-report><D:report><C:calendar-multiget/></D:report></D:supported-report>
          <D:supported-report><D:report><D:sync-collection/></D:report></D:supported-report>
        </D:supported-report-set>
        <D:sync-token>token-123</D:sync-token>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>
"#;

    let items = parse_multistatus_bytes(xml.as_bytes())
        .expect("xml parsing succeeds")
        .items;
    assert_eq!(items.len(), 2);

    let home = &items[0];
    assert!(home.is_collection);
    assert!(!home.is_calendar);
    assert_eq!(home.href, "/dav/user01/");
    assert_eq!(home.calendar_home_set, vec!["/dav/user01/"]);

    let calendar = &items[1];
    assert!(calendar.is_collection && calendar.is_calendar);
    assert_eq!(calendar.displayname.as_deref(), Some("Personal"));
    assert_eq!(calendar.ctag.as_deref(), Some("ctag-9"));
    assert_eq!(calendar.color.as_deref(), Some("#FF0000FF"));
    assert_eq!(calendar.description.as_deref(), Some("Things & stuff"));
    assert_eq!(calendar.supported_components, vec!["VEVENT", "VTODO"]);
    assert_eq!(
        calendar.supported_reports,
        vec!["calendar-multiget", "sync-collection"]
    );
    assert_eq!(calendar.sync_token.as_deref(), Some("token-123"));
}

#[test]
fn entity_references_in_etags_are_resolved() {
    let xml = r#"<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/a.ics</D:href>
    <D:propstat>
      <D:prop><D:getetag>&quot;abc&#45;1&quot;</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let items = parse_multistatus_bytes(xml.as_bytes()).unwrap().items;
    assert_eq!(items[0].etag.as_deref(), Some("\"abc-1\""));
}

#[test]
fn calendar_data_in_cdata_and_escaped_text() {
    let xml = r#"<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/cal/a.ics</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"1"</D:getetag>
        <C:calendar-data><![CDATA[BEGIN:VCALENDAR
SUMMARY:Fish & Chips
END:VCALENDAR
]]></C:calendar-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/b.ics</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"2"</D:getetag>
        <C:calendar-data>
BEGIN:VCALENDAR
SUMMARY:Salt &amp; Pepper &lt;3
END:VCALENDAR
</C:calendar-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let items = parse_multistatus_bytes(xml.as_bytes()).unwrap().items;
    assert_eq!(
        items[0].object_data.as_deref(),
        Some("BEGIN:VCALENDAR\nSUMMARY:Fish & Chips\nEND:VCALENDAR\n")
    );
    assert_eq!(
        items[1].object_data.as_deref(),
        Some("BEGIN:VCALENDAR\nSUMMARY:Salt & Pepper <3\nEND:VCALENDAR\n")
    );
}

#[test]
fn sync_report_carries_removed_members_and_token() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/cal/changed.ics</D:href>
    <D:propstat>
      <D:prop><D:getetag>"7"</D:getetag></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/cal/gone.ics</D:href>
    <D:status>HTTP/1.1 404 Not Found</D:status>
  </D:response>
  <D:sync-token>http://example.com/sync/42</D:sync-token>
</D:multistatus>"#;

    let result = parse_multistatus_bytes(xml.as_bytes()).unwrap();
    assert_eq!(result.sync_token.as_deref(), Some("http://example.com/sync/42"));
    assert_eq!(result.items.len(), 2);
    assert!(!result.items[0].is_removed());
    assert_eq!(result.items[1].status_code(), Some(404));
    assert!(result.items[1].is_removed());
    // The top-level token is not attributed to a member.
    assert!(result.items.iter().all(|item| item.sync_token.is_none()));
}

#[test]
fn principal_and_addressbook_home_sets() {
    let xml = r#"<D:multistatus xmlns:D="DAV:" xmlns:CR="urn:ietf:params:xml:ns:carddav">
  <D:response>
    <D:href>/</D:href>
    <D:propstat>
      <D:prop>
        <D:current-user-principal><D:href>/principals/alice/</D:href></D:current-user-principal>
        <CR:addressbook-home-set>
          <D:href>/contacts/alice/</D:href>
          <D:href>/shared/contacts/</D:href>
        </CR:addressbook-home-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let items = parse_multistatus_bytes(xml.as_bytes()).unwrap().items;
    assert_eq!(items[0].current_user_principal, vec!["/principals/alice/"]);
    assert_eq!(
        items[0].addressbook_home_set,
        vec!["/contacts/alice/", "/shared/contacts/"]
    );
}

#[test]
fn malformed_and_truncated_bodies_are_errors() {
    assert!(parse_multistatus_bytes(b"<D:multistatus xmlns:D=\"DAV:\"><D:response>").is_err());
    assert!(parse_multistatus_bytes(b"<D:multistatus><D:href></D:status></D:multistatus>").is_err());
}

#[test]
fn empty_multistatus_has_no_items() {
    let result = parse_multistatus_bytes(br#"<D:multistatus xmlns:D="DAV:"/>"#).unwrap();
    assert!(result.items.is_empty());
    assert!(result.sync_token.is_none());
}

#[test]
fn dav_error_bodies() {
    let body = br#"<?xml version="1.0"?>
<D:error xmlns:D="DAV:"><D:valid-sync-token/></D:error>"#;
    let error = parse_error_body(body).expect("error body");
    assert_eq!(error.conditions, vec!["valid-sync-token"]);
    assert!(error.has("VALID-SYNC-TOKEN"));

    assert!(parse_error_body(b"<html><body>nope</body></html>").is_none());
    assert!(parse_error_body(b"not xml at all <").is_none());
    assert!(parse_error_body(br#"<D:error xmlns:D="DAV:"/>"#).is_none());
}
