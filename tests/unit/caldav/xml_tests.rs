use dav_connector::caldav::{
    build_calendar_multiget_body, build_calendar_query_body, build_mkcalendar_body,
};

#[test]
fn calendar_query_matches_everything() {
    let body = build_calendar_query_body(true);
    assert!(body.contains(r#"<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">"#));
    assert!(body.contains("<D:getetag/><C:calendar-data/>"));
    assert!(body.contains(r#"<C:filter><C:comp-filter name="VCALENDAR"/></C:filter>"#));

    let etags_only = build_calendar_query_body(false);
    assert!(!etags_only.contains("calendar-data"));
    assert!(etags_only.ends_with("</C:calendar-query>"));
}

#[test]
fn multiget_uses_calendar_namespace() {
    let body = build_calendar_multiget_body(["/cal/a.ics"]).unwrap();
    assert!(body.contains("<C:calendar-multiget"));
    assert!(body.contains("<C:calendar-data/>"));
    assert!(build_calendar_multiget_body(Vec::<String>::new()).is_none());
}

#[test]
fn mkcalendar_body_sets_name_and_components() {
    let body = build_mkcalendar_body(Some("Team <Ops>"), &["VEVENT", "VTODO"]);
    assert!(body.contains("<D:displayname>Team &lt;Ops&gt;</D:displayname>"));
    assert!(body.contains(r#"<C:comp name="VEVENT"/><C:comp name="VTODO"/>"#));

    let bare = build_mkcalendar_body(None, &[]);
    assert!(!bare.contains("displayname"));
    assert!(!bare.contains("supported-calendar-component-set"));
    assert!(bare.ends_with("</D:prop></D:set></C:mkcalendar>"));
}
