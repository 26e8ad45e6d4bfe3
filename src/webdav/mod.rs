pub mod features;
pub mod multistatus;
pub mod response;
pub mod transport;
pub mod types;
pub mod xml;

pub use features::{SupportedFeature, negotiate, negotiate_headers, negotiate_with};
pub use multistatus::{DavErrorBody, ParseResult, parse_error_body, parse_multistatus_bytes};
pub use response::{
    FailureKind, MediaType, Outcome, ProtocolFailure, ResponseHandler, header_elements,
};
pub use transport::{DavMethod, DavRequest, HyperTransport, RawResponse, Transport};
pub use types::{DavItem, Depth};
pub use xml::escape_xml;
