use dav_connector::webdav::xml::{
    build_collection_propfind_body, build_home_set_propfind_body, build_members_propfind_body,
    build_multiget_body, build_principal_propfind_body, build_sync_collection_body, escape_xml,
};

#[test]
fn test_escape_xml_comprehensive() {
    assert_eq!(escape_xml("&<>'\""), "&amp;&lt;&gt;&apos;&quot;");
    assert_eq!(escape_xml(""), "");
    assert_eq!(escape_xml("normal text"), "normal text");
    assert_eq!(
        escape_xml("&&<<>>\"\"''"),
        "&amp;&amp;&lt;&lt;&gt;&gt;&quot;&quot;&apos;&apos;"
    );
    assert_eq!(escape_xml("café & résumé"), "café &amp; résumé");
    assert_eq!(escape_xml("\t\ttabs\n"), "\t\ttabs\n");
}

#[test]
fn propfind_bodies_request_the_expected_properties() {
    let principal = build_principal_propfind_body();
    assert!(principal.contains("<D:current-user-principal/>"));

    let home = build_home_set_propfind_body("urn:ietf:params:xml:ns:caldav", "calendar-home-set");
    assert!(home.contains(r#"xmlns:C="urn:ietf:params:xml:ns:caldav""#));
    assert!(home.contains("<C:calendar-home-set/>"));

    let collection = build_collection_propfind_body(
        "urn:ietf:params:xml:ns:caldav",
        &["supported-calendar-component-set"],
    );
    for prop in [
        "<D:resourcetype/>",
        "<D:displayname/>",
        "<D:sync-token/>",
        "<D:supported-report-set/>",
        "<CS:getctag/>",
        "<A:calendar-color/>",
        "<C:supported-calendar-component-set/>",
    ] {
        assert!(collection.contains(prop), "missing {prop}");
    }

    let members = build_members_propfind_body();
    assert!(members.contains("<D:getetag/>"));
    assert!(members.contains("<D:getcontenttype/>"));
}

#[test]
fn multiget_skips_empty_hrefs_and_escapes() {
    assert!(build_multiget_body("urn:x", "calendar-multiget", "calendar-data", ["", ""]).is_none());
    let none: [&str; 0] = [];
    assert!(build_multiget_body("urn:x", "calendar-multiget", "calendar-data", none).is_none());

    let body = build_multiget_body(
        "urn:ietf:params:xml:ns:caldav",
        "calendar-multiget",
        "calendar-data",
        ["/cal/a&b.ics", "", "/cal/c.ics"],
    )
    .unwrap();
    assert!(body.contains("<D:href>/cal/a&amp;b.ics</D:href>"));
    assert!(body.contains("<D:href>/cal/c.ics</D:href>"));
    assert_eq!(body.matches("<D:href>").count(), 2);
    assert!(body.contains("<C:calendar-data/>"));
    assert!(body.ends_with("</C:calendar-multiget>"));
}

#[test]
fn sync_collection_body_variants() {
    let initial = build_sync_collection_body(
        None,
        false,
        "urn:ietf:params:xml:ns:caldav",
        "calendar-data",
    );
    assert!(initial.contains("<D:sync-token/>"));
    assert!(initial.contains("<D:sync-level>1</D:sync-level>"));
    assert!(!initial.contains("calendar-data"));

    let incremental = build_sync_collection_body(
        Some("http://example.com/sync?a=1&b=2"),
        true,
        "urn:ietf:params:xml:ns:carddav",
        "address-data",
    );
    assert!(incremental.contains("<D:sync-token>http://example.com/sync?a=1&amp;b=2</D:sync-token>"));
    assert!(incremental.contains("<C:address-data/>"));
}
