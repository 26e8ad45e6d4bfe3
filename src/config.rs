use std::time::Duration;

use serde::Deserialize;

/// How the connector authenticates against the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    None,
    /// HTTP Basic authentication.
    Basic { username: String, password: String },
    /// OAuth-style bearer token.
    Bearer { token: String },
}

/// Connection settings for a [`Store`](crate::Store).
///
/// Can be deserialized from any serde format, e.g.:
///
/// ```toml
/// base_url = "https://dav.example.com/dav/"
/// calendar_home = "/dav/calendars/alice/"
/// eager_bodies = true
///
/// [auth]
/// type = "basic"
/// username = "alice"
/// password = "secret"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Server root; relative hrefs are resolved against it.
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthMethod,
    /// Per-request timeout applied by the HTTP transport.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Calendar home set, when known in advance.
    #[serde(default)]
    pub calendar_home: Option<String>,
    /// Address book home set, when known in advance.
    #[serde(default)]
    pub addressbook_home: Option<String>,
    /// Fetch object bodies while enumerating a collection instead of on first `fetch`.
    #[serde(default)]
    pub eager_bodies: bool,
}

const fn default_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    concat!("dav-connector/", env!("CARGO_PKG_VERSION")).to_string()
}

impl ConnectorConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthMethod::None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            calendar_home: None,
            addressbook_home: None,
            eager_bodies: false,
        }
    }

    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer {
            token: token.into(),
        };
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_calendar_home(mut self, href: impl Into<String>) -> Self {
        self.calendar_home = Some(href.into());
        self
    }

    pub fn with_addressbook_home(mut self, href: impl Into<String>) -> Self {
        self.addressbook_home = Some(href.into());
        self
    }

    pub fn with_eager_bodies(mut self, eager: bool) -> Self {
        self.eager_bodies = eager;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
