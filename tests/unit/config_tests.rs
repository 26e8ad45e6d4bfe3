use std::time::Duration;

use dav_connector::{AuthMethod, ConnectorConfig};

#[test]
fn builder_defaults() {
    let config = ConnectorConfig::new("https://dav.example.com/");
    assert_eq!(config.base_url, "https://dav.example.com/");
    assert!(matches!(config.auth, AuthMethod::None));
    assert_eq!(config.timeout(), Duration::from_secs(20));
    assert!(config.user_agent.starts_with("dav-connector/"));
    assert!(config.calendar_home.is_none());
    assert!(!config.eager_bodies);
}

#[test]
fn builder_setters() {
    let config = ConnectorConfig::new("https://dav.example.com/")
        .with_basic_auth("alice", "secret")
        .with_timeout(Duration::from_millis(200))
        .with_calendar_home("/cal/alice/")
        .with_addressbook_home("/card/alice/")
        .with_eager_bodies(true);
    assert!(matches!(
        &config.auth,
        AuthMethod::Basic { username, password } if username == "alice" && password == "secret"
    ));
    // sub-second timeouts round up to one second
    assert_eq!(config.timeout_secs, 1);
    assert_eq!(config.calendar_home.as_deref(), Some("/cal/alice/"));
    assert_eq!(config.addressbook_home.as_deref(), Some("/card/alice/"));
    assert!(config.eager_bodies);

    let bearer = config.with_bearer_token("tok");
    assert!(matches!(bearer.auth, AuthMethod::Bearer { ref token } if token == "tok"));
}

#[test]
fn deserializes_with_defaults() {
    let config: ConnectorConfig = serde_json::from_value(serde_json::json!({
        "base_url": "https://dav.example.com/dav/",
        "auth": { "type": "bearer", "token": "abc" },
        "eager_bodies": true
    }))
    .unwrap();
    assert!(matches!(config.auth, AuthMethod::Bearer { ref token } if token == "abc"));
    assert_eq!(config.timeout_secs, 20);
    assert!(config.eager_bodies);
    assert!(config.addressbook_home.is_none());

    let minimal: ConnectorConfig =
        serde_json::from_str(r#"{"base_url":"http://localhost:5232/"}"#).unwrap();
    assert!(matches!(minimal.auth, AuthMethod::None));
}

#[test]
fn unknown_auth_type_is_rejected() {
    let result: Result<ConnectorConfig, _> = serde_json::from_str(
        r#"{"base_url":"http://localhost/","auth":{"type":"digest","username":"a"}}"#,
    );
    assert!(result.is_err());
}
