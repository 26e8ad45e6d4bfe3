/// WebDAV `Depth` header value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// One `DAV:response` element of a multistatus body.
///
/// Calendar and address book properties share the same slots: `object_data`
/// holds either `calendar-data` or `address-data`, `description` either
/// `calendar-description` or `addressbook-description`.
#[derive(Debug, Clone, Default)]
pub struct DavItem {
    pub href: String,
    /// Response-level status line (`DAV:response/DAV:status`), set for removed
    /// members in sync reports and for failed multiget hrefs.
    pub status: Option<String>,
    pub displayname: Option<String>,
    pub etag: Option<String>,
    pub ctag: Option<String>,
    pub is_collection: bool,
    pub is_calendar: bool,
    pub is_addressbook: bool,
    pub supported_components: Vec<String>,
    pub supported_reports: Vec<String>,
    pub object_data: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub sync_token: Option<String>,
    pub calendar_home_set: Vec<String>,
    pub addressbook_home_set: Vec<String>,
    pub current_user_principal: Vec<String>,
    pub content_type: Option<String>,
}

impl DavItem {
    /// Numeric code of the response-level status line, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.status.as_deref().and_then(status_code_from_line)
    }

    /// Whether the response-level status reports the member as gone.
    pub fn is_removed(&self) -> bool {
        matches!(self.status_code(), Some(404 | 410))
    }
}

/// Extract the code from a status line such as `HTTP/1.1 404 Not Found`.
pub fn status_code_from_line(line: &str) -> Option<u16> {
    line.split_whitespace().nth(1)?.parse().ok()
}

/// Quote an entity tag for use in `If-Match`.
///
/// Some servers report `getetag` values without the surrounding quotes; the
/// header grammar requires them.
pub fn quote_etag(etag: &str) -> String {
    let etag = etag.trim();
    if etag == "*" || etag.starts_with('"') || etag.starts_with("W/\"") {
        etag.to_string()
    } else {
        format!("\"{etag}\"")
    }
}

/// Compare two entity tags, ignoring missing quotes on either side.
pub fn etags_match(left: &str, right: &str) -> bool {
    quote_etag(left) == quote_etag(right)
}

/// Normalize an href for use as a cache key: percent-decoding is left to the
/// server, only the absolute-URL prefix is stripped.
pub fn href_path(href: &str) -> &str {
    let href = href.trim();
    match href.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |idx| &rest[idx..]),
        None => href,
    }
}

/// Join a collection href and a member name with exactly one slash.
pub fn join_href(collection: &str, member: &str) -> String {
    format!(
        "{}/{}",
        collection.trim_end_matches('/'),
        member.trim_start_matches('/')
    )
}

/// Whether two hrefs name the same resource, ignoring a trailing slash.
pub fn same_href(left: &str, right: &str) -> bool {
    href_path(left).trim_end_matches('/') == href_path(right).trim_end_matches('/')
}
