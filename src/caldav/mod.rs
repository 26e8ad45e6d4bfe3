pub mod codec;
pub mod xml;

pub use codec::{decode_calendar, encode_calendar};
pub use xml::{
    CALDAV_NS, build_calendar_multiget_body, build_calendar_query_body, build_mkcalendar_body,
};
