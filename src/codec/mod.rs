//! Minimalist TLV codec for the wire format spoken with the forwarder.
//!
//! This is just sufficient for generating and parsing the Interests and
//! ContentObjects this library deals in; it is deliberately not a general
//! purpose TLV toolkit. Numbers use the NDN varint scheme (one byte up to
//! 252, then 253/254/255 prefixes for wider big-endian integers, minimal
//! encoding enforced).

mod decode;
pub mod encode;
mod error;
mod packet;

pub use decode::SkeletonDecoder;
pub use encode::{interest, interest_template, name, name_from_uri, KeyLocator};
pub use error::DecodeError;
pub use packet::{
    check_namebuf, content_matches_interest, parse_content, parse_interest, LocatorKind,
    NamePrefix, ParsedContent, ParsedInterest,
};

/// Element types of the wire format.
pub mod tag {
    pub const INTEREST: u64 = 0x05;
    pub const CONTENT_OBJECT: u64 = 0x06;
    pub const NAME: u64 = 0x07;
    pub const COMPONENT: u64 = 0x08;
    pub const COMPONENT_COUNT: u64 = 0x0a;
    pub const SCOPE: u64 = 0x0b;
    pub const NONCE: u64 = 0x0c;
    pub const LIFETIME: u64 = 0x0d;
    pub const SIGNED_INFO: u64 = 0x14;
    pub const TYPE: u64 = 0x15;
    pub const KEY_LOCATOR: u64 = 0x16;
    pub const KEY: u64 = 0x17;
    pub const KEY_NAME: u64 = 0x18;
    pub const CERTIFICATE: u64 = 0x19;
    pub const CONTENT: u64 = 0x1a;
    pub const SIGNATURE: u64 = 0x1b;
    pub const PUBLISHER_DIGEST: u64 = 0x1c;
}
