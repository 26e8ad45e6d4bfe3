//! Scripted transport and fixtures shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::anyhow;
use bytes::Bytes;
use dav_connector::{DavRequest, RawResponse, Transport};
use hyper::{StatusCode, header};

/// Replays queued responses in order and records every request it sees.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<anyhow::Result<RawResponse>>>,
    requests: Mutex<Vec<DavRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(responses: impl IntoIterator<Item = RawResponse>) -> Self {
        let transport = Self::new();
        for response in responses {
            transport.push(response);
        }
        transport
    }

    pub fn push(&self, response: RawResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(anyhow!(message.to_string())));
    }

    pub fn requests(&self) -> Vec<DavRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> DavRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("at least one request")
    }
}

impl Transport for MockTransport {
    async fn execute(&self, request: DavRequest) -> anyhow::Result<RawResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted response left")))
    }
}

pub fn status(code: u16) -> RawResponse {
    RawResponse::new(StatusCode::from_u16(code).expect("valid status"))
}

pub fn with_header(mut response: RawResponse, name: &'static str, value: &str) -> RawResponse {
    response.headers.append(
        header::HeaderName::from_static(name),
        header::HeaderValue::from_str(value).expect("valid header value"),
    );
    response
}

pub fn with_body(mut response: RawResponse, body: impl Into<Bytes>) -> RawResponse {
    response.body = body.into();
    response
}

pub fn multistatus(xml: &str) -> RawResponse {
    with_body(
        with_header(status(207), "content-type", "application/xml; charset=utf-8"),
        xml.to_string(),
    )
}

pub fn calendar_response(ics: &str, etag: Option<&str>) -> RawResponse {
    let response = with_body(
        with_header(status(200), "content-type", "text/calendar; charset=utf-8"),
        ics.to_string(),
    );
    match etag {
        Some(etag) => with_header(response, "etag", etag),
        None => response,
    }
}

pub fn body_text(request: &DavRequest) -> String {
    request
        .body
        .as_ref()
        .map(|body| String::from_utf8_lossy(body).into_owned())
        .unwrap_or_default()
}

pub fn event_ics(uid: &str, summary: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Example Corp//Test//EN\r\n\
         BEGIN:VEVENT\r\nUID:{uid}\r\nDTSTAMP:20240101T000000Z\r\n\
         DTSTART:20240102T100000Z\r\nDTEND:20240102T110000Z\r\nSUMMARY:{summary}\r\n\
         END:VEVENT\r\nEND:VCALENDAR\r\n"
    )
}

pub fn todo_ics(uid: &str, summary: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Example Corp//Test//EN\r\n\
         BEGIN:VTODO\r\nUID:{uid}\r\nDTSTAMP:20240101T000000Z\r\nSUMMARY:{summary}\r\n\
         END:VTODO\r\nEND:VCALENDAR\r\n"
    )
}

pub fn vcard(uid: &str, name: &str) -> String {
    format!("BEGIN:VCARD\r\nVERSION:4.0\r\nUID:{uid}\r\nFN:{name}\r\nEND:VCARD\r\n")
}

/// `207` body describing a calendar collection at `href`.
pub fn calendar_props_xml(href: &str, components: &[&str], with_sync: bool) -> String {
    let comps: String = components
        .iter()
        .map(|c| format!(r#"<C:comp name="{c}"/>"#))
        .collect();
    let reports = if with_sync {
        "<D:supported-report-set><D:supported-report><D:report><D:sync-collection/></D:report></D:supported-report></D:supported-report-set>"
    } else {
        ""
    };
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>{href}</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/><C:calendar/></D:resourcetype>
        <D:displayname>Work</D:displayname>
        <CS:getctag>ctag-1</CS:getctag>
        <D:sync-token>http://example.com/sync/1</D:sync-token>
        <C:supported-calendar-component-set>{comps}</C:supported-calendar-component-set>
        {reports}
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#
    )
}

/// `207` body listing members as `(href, etag)` pairs, after the collection itself.
pub fn members_xml(collection: &str, members: &[(&str, &str)]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>{collection}</D:href>
    <D:propstat>
      <D:prop><D:resourcetype><D:collection/></D:resourcetype></D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
    );
    for (href, etag) in members {
        xml.push_str(&format!(
            r#"
  <D:response>
    <D:href>{href}</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype/>
        <D:getetag>{etag}</D:getetag>
        <D:getcontenttype>text/calendar; charset=utf-8</D:getcontenttype>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>"#
        ));
    }
    xml.push_str("\n</D:multistatus>");
    xml
}
