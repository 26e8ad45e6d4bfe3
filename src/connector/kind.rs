use std::fmt;

use bytes::Bytes;
use icalendar::{Calendar, CalendarComponent, Component};
use vcard4::Vcard;
use vcard4::property::TextOrUriProperty;

use crate::caldav::{self, CALDAV_NS};
use crate::carddav::{self, CARDDAV_NS};
use crate::error::DavError;
use crate::webdav::features::SupportedFeature;
use crate::webdav::response::MediaType;

/// The two kinds of collection the connector manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Calendar,
    AddressBook,
}

impl CollectionKind {
    pub fn media_type(self) -> MediaType {
        match self {
            CollectionKind::Calendar => MediaType::Calendar,
            CollectionKind::AddressBook => MediaType::VCard,
        }
    }

    pub fn namespace(self) -> &'static str {
        match self {
            CollectionKind::Calendar => CALDAV_NS,
            CollectionKind::AddressBook => CARDDAV_NS,
        }
    }

    /// Element carrying object bodies in REPORT responses.
    pub fn data_element(self) -> &'static str {
        match self {
            CollectionKind::Calendar => "calendar-data",
            CollectionKind::AddressBook => "address-data",
        }
    }

    pub fn home_set_element(self) -> &'static str {
        match self {
            CollectionKind::Calendar => "calendar-home-set",
            CollectionKind::AddressBook => "addressbook-home-set",
        }
    }

    /// Protocol-specific properties read when describing a collection.
    pub fn collection_props(self) -> &'static [&'static str] {
        match self {
            CollectionKind::Calendar => {
                &["supported-calendar-component-set", "calendar-description"]
            }
            CollectionKind::AddressBook => &["addressbook-description"],
        }
    }

    /// File extension of member resources created by the connector.
    pub fn extension(self) -> &'static str {
        match self {
            CollectionKind::Calendar => "ics",
            CollectionKind::AddressBook => "vcf",
        }
    }

    /// Capability the server must advertise for this kind to be usable.
    pub fn required_feature(self) -> SupportedFeature {
        match self {
            CollectionKind::Calendar => SupportedFeature::CalendarAccess,
            CollectionKind::AddressBook => SupportedFeature::AddressBook,
        }
    }

    pub fn decode(self, body: &[u8]) -> Result<DavObject, DavError> {
        self.decode_raw(body)
            .map_err(|err| DavError::malformed(self.media_type(), format!("{err:#}")))
    }

    pub(crate) fn decode_raw(self, body: &[u8]) -> anyhow::Result<DavObject> {
        match self {
            CollectionKind::Calendar => caldav::decode_calendar(body).map(DavObject::Calendar),
            CollectionKind::AddressBook => carddav::decode_contact(body).map(DavObject::Contact),
        }
    }

    pub fn encode(self, object: &DavObject) -> Result<Bytes, DavError> {
        match (self, object) {
            (CollectionKind::Calendar, DavObject::Calendar(calendar)) => {
                Ok(caldav::encode_calendar(calendar))
            }
            (CollectionKind::AddressBook, DavObject::Contact(card)) => {
                Ok(carddav::encode_contact(card))
            }
            (expected, object) => Err(DavError::KindMismatch {
                expected,
                found: object.kind(),
            }),
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectionKind::Calendar => "calendar",
            CollectionKind::AddressBook => "address book",
        })
    }
}

/// A parsed calendar object or contact.
#[derive(Debug)]
pub enum DavObject {
    Calendar(Calendar),
    Contact(Vcard),
}

impl DavObject {
    pub fn kind(&self) -> CollectionKind {
        match self {
            DavObject::Calendar(_) => CollectionKind::Calendar,
            DavObject::Contact(_) => CollectionKind::AddressBook,
        }
    }

    /// UID of the first event or to-do, or of the card.
    pub fn uid(&self) -> Option<String> {
        match self {
            DavObject::Calendar(calendar) => calendar
                .components
                .iter()
                .find_map(|component| match component {
                    CalendarComponent::Event(event) => event.get_uid(),
                    CalendarComponent::Todo(todo) => todo.get_uid(),
                    _ => None,
                })
                .map(str::to_string),
            DavObject::Contact(card) => match &card.uid {
                Some(TextOrUriProperty::Text(text)) => Some(text.value.clone()),
                Some(TextOrUriProperty::Uri(uri)) => Some(uri.value.to_string()),
                None => None,
            },
        }
    }

    /// Summary of the first event or to-do, or the card's formatted name.
    pub fn title(&self) -> Option<String> {
        match self {
            DavObject::Calendar(calendar) => calendar
                .components
                .iter()
                .find_map(|component| match component {
                    CalendarComponent::Event(event) => event.get_summary(),
                    CalendarComponent::Todo(todo) => todo.get_summary(),
                    _ => None,
                })
                .map(str::to_string),
            DavObject::Contact(card) => card.formatted_name.first().map(|fn_| fn_.value.clone()),
        }
    }

    /// Names of the components the object carries, e.g. `["VEVENT"]`.
    pub fn component_names(&self) -> Vec<&'static str> {
        match self {
            DavObject::Calendar(calendar) => {
                let mut names = Vec::new();
                for component in &calendar.components {
                    let name = match component {
                        CalendarComponent::Event(_) => "VEVENT",
                        CalendarComponent::Todo(_) => "VTODO",
                        _ => continue,
                    };
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                names
            }
            DavObject::Contact(_) => vec!["VCARD"],
        }
    }

    pub fn as_calendar(&self) -> Option<&Calendar> {
        match self {
            DavObject::Calendar(calendar) => Some(calendar),
            DavObject::Contact(_) => None,
        }
    }

    pub fn as_contact(&self) -> Option<&Vcard> {
        match self {
            DavObject::Contact(card) => Some(card),
            DavObject::Calendar(_) => None,
        }
    }
}

impl From<Calendar> for DavObject {
    fn from(calendar: Calendar) -> Self {
        DavObject::Calendar(calendar)
    }
}

impl From<Vcard> for DavObject {
    fn from(card: Vcard) -> Self {
        DavObject::Contact(card)
    }
}
