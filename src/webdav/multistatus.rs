//! Event-driven parsing of `207 Multi-Status` and `DAV:error` bodies.
//!
//! Elements are matched on their local name only; CalDAV, CardDAV, Apple and
//! CalendarServer properties do not collide on local names in practice, so the
//! namespace prefix is ignored the same way for every server.

use anyhow::{Result, anyhow};
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesRef, BytesStart, Event};
use std::io::{BufRead, Cursor};

use crate::webdav::types::DavItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementName {
    Multistatus,
    Response,
    Propstat,
    Prop,
    Href,
    Status,
    Displayname,
    Getetag,
    Getctag,
    Resourcetype,
    Collection,
    Calendar,
    Addressbook,
    SupportedCalendarComponentSet,
    Comp,
    SupportedReportSet,
    SupportedReport,
    Report,
    CalendarData,
    AddressData,
    CalendarDescription,
    AddressbookDescription,
    CalendarColor,
    SyncToken,
    CalendarHomeSet,
    AddressbookHomeSet,
    CurrentUserPrincipal,
    Getcontenttype,
    Other,
}

fn local_name(raw: &[u8]) -> &[u8] {
    match raw.iter().position(|b| *b == b':') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    }
}

pub fn element_from_bytes(raw: &[u8]) -> ElementName {
    let local = local_name(raw);
    const TABLE: &[(&[u8], ElementName)] = &[
        (b"multistatus", ElementName::Multistatus),
        (b"response", ElementName::Response),
        (b"propstat", ElementName::Propstat),
        (b"prop", ElementName::Prop),
        (b"href", ElementName::Href),
        (b"status", ElementName::Status),
        (b"displayname", ElementName::Displayname),
        (b"getetag", ElementName::Getetag),
        (b"getctag", ElementName::Getctag),
        (b"resourcetype", ElementName::Resourcetype),
        (b"collection", ElementName::Collection),
        (b"calendar", ElementName::Calendar),
        (b"addressbook", ElementName::Addressbook),
        (
            b"supported-calendar-component-set",
            ElementName::SupportedCalendarComponentSet,
        ),
        (b"comp", ElementName::Comp),
        (b"supported-report-set", ElementName::SupportedReportSet),
        (b"supported-report", ElementName::SupportedReport),
        (b"report", ElementName::Report),
        (b"calendar-data", ElementName::CalendarData),
        (b"address-data", ElementName::AddressData),
        (b"calendar-description", ElementName::CalendarDescription),
        (b"addressbook-description", ElementName::AddressbookDescription),
        (b"calendar-color", ElementName::CalendarColor),
        (b"sync-token", ElementName::SyncToken),
        (b"calendar-home-set", ElementName::CalendarHomeSet),
        (b"addressbook-home-set", ElementName::AddressbookHomeSet),
        (b"current-user-principal", ElementName::CurrentUserPrincipal),
        (b"getcontenttype", ElementName::Getcontenttype),
    ];

    TABLE
        .iter()
        .find(|(name, _)| local.eq_ignore_ascii_case(name))
        .map_or(ElementName::Other, |(_, element)| *element)
}

/// Items of a multistatus body plus the top-level sync token of a sync report.
#[derive(Debug, Default)]
pub struct ParseResult {
    pub items: Vec<DavItem>,
    pub sync_token: Option<String>,
}

const PROP: [ElementName; 3] = [
    ElementName::Response,
    ElementName::Propstat,
    ElementName::Prop,
];

struct MultistatusParser {
    stack: Vec<ElementName>,
    current: DavItem,
    text: String,
    result: ParseResult,
}

impl MultistatusParser {
    fn new() -> Self {
        Self {
            stack: Vec::with_capacity(16),
            current: DavItem::default(),
            text: String::new(),
            result: ParseResult::default(),
        }
    }

    fn path_ends_with(&self, needle: &[ElementName]) -> bool {
        self.stack.len() >= needle.len() && self.stack[self.stack.len() - needle.len()..] == *needle
    }

    /// Whether the stack is `response/propstat/prop` followed by `tail`.
    fn in_prop(&self, tail: &[ElementName]) -> bool {
        let depth = PROP.len() + tail.len();
        self.stack.len() >= depth && {
            let window = &self.stack[self.stack.len() - depth..];
            window[..PROP.len()] == PROP && window[PROP.len()..] == *tail
        }
    }

    fn on_start(&mut self, event: &BytesStart<'_>) -> Result<()> {
        let raw = event.name();
        let element = element_from_bytes(raw.as_ref());

        if self.in_prop(&[
            ElementName::SupportedReportSet,
            ElementName::SupportedReport,
            ElementName::Report,
        ]) {
            let report = String::from_utf8_lossy(local_name(raw.as_ref())).to_ascii_lowercase();
            if !self.current.supported_reports.contains(&report) {
                self.current.supported_reports.push(report);
            }
        }

        self.stack.push(element);
        self.text.clear();

        match element {
            ElementName::Response => self.current = DavItem::default(),
            ElementName::Collection if self.in_prop(&[ElementName::Resourcetype, element]) => {
                self.current.is_collection = true;
            }
            ElementName::Calendar if self.in_prop(&[ElementName::Resourcetype, element]) => {
                self.current.is_calendar = true;
            }
            ElementName::Addressbook if self.in_prop(&[ElementName::Resourcetype, element]) => {
                self.current.is_addressbook = true;
            }
            ElementName::Comp
                if self.in_prop(&[ElementName::SupportedCalendarComponentSet, element]) =>
            {
                for attr in event.attributes().with_checks(false) {
                    let attr = attr?;
                    if !local_name(attr.key.as_ref()).eq_ignore_ascii_case(b"name") {
                        continue;
                    }
                    let value = attr
                        .unescape_value()
                        .map_err(|e| anyhow!("invalid XML attribute: {e}"))?
                        .to_ascii_uppercase();
                    if !value.is_empty() && !self.current.supported_components.contains(&value) {
                        self.current.supported_components.push(value);
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn on_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn on_end(&mut self) {
        let text = std::mem::take(&mut self.text);
        self.apply_text(text);

        if self.stack.pop() == Some(ElementName::Response) {
            let finished = std::mem::take(&mut self.current);
            self.result.items.push(finished);
        }
    }

    fn apply_text(&mut self, text: String) {
        use ElementName as E;

        // Object bodies keep their line endings; only leading indentation goes.
        if self.in_prop(&[E::CalendarData]) || self.in_prop(&[E::AddressData]) {
            let body = text.trim_start();
            if !body.trim_end().is_empty() {
                self.current.object_data = Some(body.to_string());
            }
            return;
        }

        let value = text.trim();
        if value.is_empty() {
            return;
        }
        let value = value.to_string();

        if self.path_ends_with(&[E::Response, E::Href]) {
            self.current.href = value;
        } else if self.path_ends_with(&[E::Response, E::Status]) {
            self.current.status = Some(value);
        } else if self.path_ends_with(&[E::Multistatus, E::SyncToken]) {
            self.result.sync_token = Some(value);
        } else if self.in_prop(&[E::Displayname]) {
            self.current.displayname = Some(value);
        } else if self.in_prop(&[E::Getetag]) {
            self.current.etag = Some(value);
        } else if self.in_prop(&[E::Getctag]) {
            self.current.ctag = Some(value);
        } else if self.in_prop(&[E::CalendarDescription])
            || self.in_prop(&[E::AddressbookDescription])
        {
            self.current.description = Some(value);
        } else if self.in_prop(&[E::CalendarColor]) {
            self.current.color = Some(value);
        } else if self.in_prop(&[E::SyncToken]) {
            self.current.sync_token = Some(value);
        } else if self.in_prop(&[E::CalendarHomeSet, E::Href]) {
            self.current.calendar_home_set.push(value);
        } else if self.in_prop(&[E::AddressbookHomeSet, E::Href]) {
            self.current.addressbook_home_set.push(value);
        } else if self.in_prop(&[E::CurrentUserPrincipal, E::Href]) {
            self.current.current_user_principal.push(value);
        } else if self.in_prop(&[E::Getcontenttype]) {
            self.current.content_type = Some(value);
        }
    }
}

fn parse_with<R: BufRead>(reader: R) -> Result<ParseResult> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(8 * 1024);
    let mut parser = MultistatusParser::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.on_start(&e)?,
            Ok(Event::Empty(e)) => {
                parser.on_start(&e)?;
                parser.on_end();
            }
            Ok(Event::Text(e)) => parser.on_text(&decode_text(e.as_ref())?),
            Ok(Event::CData(e)) => parser.on_text(&String::from_utf8_lossy(e.as_ref())),
            Ok(Event::GeneralRef(e)) => parser.on_text(&resolve_reference(&e)),
            Ok(Event::End(_)) => parser.on_end(),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "XML error at position {}: {e}",
                    xml.buffer_position()
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if parser.stack.is_empty() {
        Ok(parser.result)
    } else {
        Err(anyhow!("truncated multistatus body"))
    }
}

/// Parse an aggregated `207 Multi-Status` body.
pub fn parse_multistatus_bytes(body: &[u8]) -> Result<ParseResult> {
    parse_with(Cursor::new(body))
}

/// Preconditions and postconditions reported in a `DAV:error` body (RFC 4918 §16).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DavErrorBody {
    /// Local names of the condition elements, e.g. `no-uid-conflict`.
    pub conditions: Vec<String>,
}

impl DavErrorBody {
    pub fn has(&self, condition: &str) -> bool {
        self.conditions
            .iter()
            .any(|c| c.eq_ignore_ascii_case(condition))
    }
}

enum Step {
    Open(Vec<u8>, bool),
    Close,
    Skip,
}

/// Parse a `DAV:error` body. Returns `None` when the body is not one.
pub fn parse_error_body(body: &[u8]) -> Option<DavErrorBody> {
    let mut xml = Reader::from_reader(Cursor::new(body));
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut conditions = Vec::new();

    loop {
        let step = match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => Step::Open(local_name(e.name().as_ref()).to_ascii_lowercase(), false),
            Ok(Event::Empty(e)) => Step::Open(local_name(e.name().as_ref()).to_ascii_lowercase(), true),
            Ok(Event::End(_)) => Step::Close,
            Ok(Event::Eof) => break,
            Ok(_) => Step::Skip,
            Err(_) => return None,
        };
        buf.clear();

        match step {
            Step::Open(name, is_empty) => {
                if depth == 0 && name != b"error" {
                    return None;
                }
                if depth == 1 {
                    conditions.push(String::from_utf8_lossy(&name).into_owned());
                }
                if !is_empty {
                    depth += 1;
                }
            }
            Step::Close => depth = depth.saturating_sub(1),
            Step::Skip => {}
        }
    }

    (!conditions.is_empty()).then_some(DavErrorBody { conditions })
}

fn resolve_reference(reference: &BytesRef<'_>) -> String {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        return ch.to_string();
    }
    let name = String::from_utf8_lossy(reference.as_ref());
    match resolve_predefined_entity(&name) {
        Some(value) => value.to_string(),
        None => format!("&{name};"),
    }
}

pub fn decode_text(raw: &[u8]) -> Result<String> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(unescape(s)
            .map_err(|err| anyhow!("XML decode error: {err}"))?
            .into_owned()),
        Err(_) => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}
