use core::fmt;
use std::time::Duration;

use crate::codec::{ParsedContent, ParsedInterest};
use crate::handle::Client;

/// A SHA-256 digest, used to identify public keys and content
pub type Digest = [u8; 32];

/// How long an expressed Interest is considered outstanding before the
/// timeout machinery kicks in.
pub const INTEREST_LIFETIME: Duration = Duration::from_micros(INTEREST_LIFETIME_US);

pub(crate) const INTEREST_LIFETIME_US: u64 = 4_000_000;

/// The type of payload a ContentObject carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Data,
    Key,
    Link,
    Gone,
    Nack,
    Encr,
}

impl ContentType {
    pub fn code(self) -> u64 {
        match self {
            ContentType::Data => 0,
            ContentType::Key => 1,
            ContentType::Link => 2,
            ContentType::Gone => 3,
            ContentType::Nack => 4,
            ContentType::Encr => 5,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => ContentType::Data,
            1 => ContentType::Key,
            2 => ContentType::Link,
            3 => ContentType::Gone,
            4 => ContentType::Nack,
            5 => ContentType::Encr,
            _ => return None,
        })
    }
}

/// Why a handler is being called
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpcallKind {
    /// The handler is being released; it will never be called again
    Final,
    /// An incoming Interest matched one of the registered filters
    Interest,
    /// An incoming Interest that an earlier handler already consumed
    ConsumedInterest,
    /// Matching content arrived and its signature verified
    Content,
    /// Matching content arrived but the verification key is not available
    ContentUnverified,
    /// Matching content arrived and its signature did NOT verify
    ContentBad,
    /// The Interest went unanswered for its whole lifetime
    InterestTimedOut,
}

/// What the handler wants the library to do next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpcallResult {
    Ok,
    Err,
    /// Send the stored Interest again (timeout and content deliveries)
    Reexpress,
    /// This Interest has been answered; later filters see ConsumedInterest
    InterestConsumed,
    /// Fetch the verification key and keep the Interest suspended until it
    /// arrives (only meaningful on a ContentUnverified delivery)
    Verify,
}

/// Everything a handler gets to look at during an upcall.
///
/// Which fields are populated depends on the [UpcallKind]; all of them
/// borrow from the dispatcher and are gone once the upcall returns.
pub struct UpcallInfo<'a> {
    pub handle: &'a Client,
    /// The raw Interest bytes (the stored message for content deliveries)
    pub interest: Option<&'a [u8]>,
    pub parsed_interest: Option<&'a ParsedInterest>,
    /// The raw ContentObject bytes
    pub content: Option<&'a [u8]>,
    pub parsed_content: Option<&'a ParsedContent>,
    /// Number of name components that matched during dispatch
    pub matched_comps: usize,
}

impl<'a> UpcallInfo<'a> {
    pub(crate) fn bare(handle: &'a Client) -> Self {
        UpcallInfo {
            handle,
            interest: None,
            parsed_interest: None,
            content: None,
            parsed_content: None,
            matched_comps: 0,
        }
    }

    /// Component boundaries of the Interest name, when an Interest is present
    pub fn interest_comps(&self) -> Option<&[usize]> {
        self.parsed_interest.map(|pi| pi.comps.as_slice())
    }

    /// Component boundaries of the content name, when content is present
    pub fn content_comps(&self) -> Option<&[usize]> {
        self.parsed_content.map(|pco| pco.comps.as_slice())
    }
}

impl fmt::Debug for UpcallInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpcallInfo")
            .field("interest", &self.interest.map(<[u8]>::len))
            .field("content", &self.content.map(<[u8]>::len))
            .field("matched_comps", &self.matched_comps)
            .finish()
    }
}

/// An upcall handler.
///
/// Handlers are shared by reference count ([`std::rc::Rc`]); when the
/// library drops the last reference it delivers exactly one
/// [UpcallKind::Final] first. Any `Fn(UpcallKind, &mut UpcallInfo) ->
/// UpcallResult` closure is a handler.
pub trait Handler {
    fn upcall(&self, kind: UpcallKind, info: &mut UpcallInfo<'_>) -> UpcallResult;
}

impl<F> Handler for F
where
    F: Fn(UpcallKind, &mut UpcallInfo<'_>) -> UpcallResult,
{
    fn upcall(&self, kind: UpcallKind, info: &mut UpcallInfo<'_>) -> UpcallResult {
        self(kind, info)
    }
}
