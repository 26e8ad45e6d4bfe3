pub mod codec;
pub mod xml;

pub use codec::{decode_contact, encode_contact};
pub use xml::{
    CARDDAV_NS, build_addressbook_multiget_body, build_addressbook_query_body,
    build_mkcol_addressbook_body,
};
