use std::ops::Range;

use super::decode::{read_number, Reader};
use super::error::DecodeError;
use super::tag;
use crate::definitions::ContentType;

/// Encoded size of a name component carrying a 32-byte digest. Used to spot
/// a trailing implicit-digest component.
const DIGEST_COMPONENT_LEN: usize = 34;

/// A parsed Interest. All ranges are absolute offsets into the message.
#[derive(Clone, Debug)]
pub struct ParsedInterest {
    /// Value region of the Name element
    pub name: Range<usize>,
    /// Start offset of every name component, plus the end boundary
    pub comps: Vec<usize>,
    /// Value of the ComponentCount element, when present
    pub prefix_comps: Option<u32>,
    /// End of the ComponentCount element (end of the Name when absent)
    pub cc_end: usize,
    /// Where the Nonce is, or would be inserted
    pub nonce_start: usize,
    pub nonce_end: usize,
    pub publisher_digest: Option<Range<usize>>,
    pub scope: Option<u32>,
    pub lifetime_ms: Option<u64>,
    /// Everything after the Nonce, through the end of the element value
    pub other: Range<usize>,
    /// End of the whole element
    pub end: usize,
}

impl ParsedInterest {
    /// Number of name components
    pub fn ncomps(&self) -> usize {
        self.comps.len() - 1
    }
}

/// Which kind of key locator a ContentObject carries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocatorKind {
    Key,
    KeyName,
    Certificate,
}

/// A parsed ContentObject. All ranges are absolute offsets into the message.
#[derive(Clone, Debug)]
pub struct ParsedContent {
    pub name: Range<usize>,
    pub comps: Vec<usize>,
    /// Value of the publisher public key digest (32 bytes)
    pub publisher_digest: Range<usize>,
    pub content_type: ContentType,
    pub locator_kind: Option<LocatorKind>,
    /// Inline public key value, for a Key locator
    pub key: Option<Range<usize>>,
    /// The whole Name element inside a KeyName locator
    pub keyname_name: Option<Range<usize>>,
    /// Publisher hint inside a KeyName locator
    pub keyname_pub: Option<Range<usize>>,
    /// Value of the Content element
    pub content: Range<usize>,
    /// The span covered by the signature
    pub signed: Range<usize>,
    /// Value of the Signature element (64 bytes)
    pub signature: Range<usize>,
    /// End of the whole element
    pub end: usize,
}

impl ParsedContent {
    pub fn ncomps(&self) -> usize {
        self.comps.len() - 1
    }
}

/// The validated prefix of a standalone Name element: `start..end` is the
/// raw component region the registries key on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamePrefix {
    pub start: usize,
    pub end: usize,
    pub ncomps: usize,
}

fn index_components(value: &[u8], base: usize) -> Result<Vec<usize>, DecodeError> {
    let mut comps = Vec::with_capacity(8);
    let mut reader = Reader::new(value, base);
    while !reader.at_end() {
        let elem = reader.next()?;
        if elem.typ != tag::COMPONENT {
            return Err(DecodeError::UnexpectedElement);
        }
        comps.push(elem.full_abs.start);
    }
    comps.push(base + value.len());
    Ok(comps)
}

/// Parse a complete Interest message.
pub fn parse_interest(msg: &[u8]) -> Result<ParsedInterest, DecodeError> {
    let mut outer = Reader::new(msg, 0);
    let elem = outer.next()?;
    if elem.typ != tag::INTEREST {
        return Err(DecodeError::UnexpectedElement);
    }
    if !outer.at_end() {
        return Err(DecodeError::TrailingGarbage);
    }
    let end = elem.full_abs.end;

    let mut r = Reader::new(elem.value, elem.value_abs.start);
    let name_el = r.next()?;
    if name_el.typ != tag::NAME {
        return Err(DecodeError::UnexpectedElement);
    }
    let comps = index_components(name_el.value, name_el.value_abs.start)?;
    let name = name_el.value_abs.clone();

    let mut cc_end = name_el.full_abs.end;
    let mut prefix_comps = None;
    if r.peek_type() == Some(tag::COMPONENT_COUNT) {
        let el = r.next()?;
        let count = read_number(el.value).ok_or(DecodeError::BadFieldLength)?;
        prefix_comps = Some(u32::try_from(count).map_err(|_| DecodeError::BadFieldLength)?);
        cc_end = el.full_abs.end;
    }

    let mut publisher_digest = None;
    if r.peek_type() == Some(tag::PUBLISHER_DIGEST) {
        let el = r.next()?;
        if el.value.len() != 32 {
            return Err(DecodeError::BadFieldLength);
        }
        publisher_digest = Some(el.value_abs.clone());
    }

    let mut scope = None;
    if r.peek_type() == Some(tag::SCOPE) {
        let el = r.next()?;
        scope = Some(
            u32::try_from(read_number(el.value).ok_or(DecodeError::BadFieldLength)?)
                .map_err(|_| DecodeError::BadFieldLength)?,
        );
    }

    let nonce_start = r.abs_pos();
    if r.peek_type() == Some(tag::NONCE) {
        r.next()?;
    }
    let nonce_end = r.abs_pos();

    let mut lifetime_ms = None;
    if r.peek_type() == Some(tag::LIFETIME) {
        let el = r.next()?;
        lifetime_ms = Some(read_number(el.value).ok_or(DecodeError::BadFieldLength)?);
    }
    // unrecognized trailing elements are tolerated, but must be well formed
    while !r.at_end() {
        r.next()?;
    }

    Ok(ParsedInterest {
        name,
        comps,
        prefix_comps,
        cc_end,
        nonce_start,
        nonce_end,
        publisher_digest,
        scope,
        lifetime_ms,
        other: nonce_end..elem.value_abs.end,
        end,
    })
}

/// Parse a complete ContentObject message.
pub fn parse_content(msg: &[u8]) -> Result<ParsedContent, DecodeError> {
    let mut outer = Reader::new(msg, 0);
    let elem = outer.next()?;
    if elem.typ != tag::CONTENT_OBJECT {
        return Err(DecodeError::UnexpectedElement);
    }
    if !outer.at_end() {
        return Err(DecodeError::TrailingGarbage);
    }
    let end = elem.full_abs.end;

    let mut r = Reader::new(elem.value, elem.value_abs.start);
    let name_el = r.next()?;
    if name_el.typ != tag::NAME {
        return Err(DecodeError::UnexpectedElement);
    }
    let comps = index_components(name_el.value, name_el.value_abs.start)?;
    let signed_start = name_el.full_abs.start;

    let info_el = r.next()?;
    if info_el.typ != tag::SIGNED_INFO {
        return Err(DecodeError::UnexpectedElement);
    }
    let mut info = Reader::new(info_el.value, info_el.value_abs.start);
    let digest_el = info.next()?;
    if digest_el.typ != tag::PUBLISHER_DIGEST || digest_el.value.len() != 32 {
        return Err(DecodeError::UnexpectedElement);
    }
    let mut content_type = ContentType::Data;
    if info.peek_type() == Some(tag::TYPE) {
        let el = info.next()?;
        let code = read_number(el.value).ok_or(DecodeError::BadFieldLength)?;
        content_type = ContentType::from_code(code).ok_or(DecodeError::BadFieldLength)?;
    }
    let mut locator_kind = None;
    let mut key = None;
    let mut keyname_name = None;
    let mut keyname_pub = None;
    if info.peek_type() == Some(tag::KEY_LOCATOR) {
        let el = info.next()?;
        let mut loc = Reader::new(el.value, el.value_abs.start);
        let inner = loc.next()?;
        match inner.typ {
            tag::KEY => {
                locator_kind = Some(LocatorKind::Key);
                key = Some(inner.value_abs.clone());
            }
            tag::KEY_NAME => {
                locator_kind = Some(LocatorKind::KeyName);
                let mut kn = Reader::new(inner.value, inner.value_abs.start);
                let kn_name = kn.next()?;
                if kn_name.typ != tag::NAME {
                    return Err(DecodeError::UnexpectedElement);
                }
                keyname_name = Some(kn_name.full_abs.clone());
                if kn.peek_type() == Some(tag::PUBLISHER_DIGEST) {
                    let hint = kn.next()?;
                    if hint.value.len() != 32 {
                        return Err(DecodeError::BadFieldLength);
                    }
                    keyname_pub = Some(hint.value_abs.clone());
                }
            }
            tag::CERTIFICATE => locator_kind = Some(LocatorKind::Certificate),
            _ => return Err(DecodeError::UnexpectedElement),
        }
    }

    let content_el = r.next()?;
    if content_el.typ != tag::CONTENT {
        return Err(DecodeError::UnexpectedElement);
    }
    let signed_end = content_el.full_abs.end;

    let sig_el = r.next()?;
    if sig_el.typ != tag::SIGNATURE || sig_el.value.len() != 64 {
        return Err(DecodeError::UnexpectedElement);
    }
    if !r.at_end() {
        return Err(DecodeError::TrailingGarbage);
    }

    Ok(ParsedContent {
        name: name_el.value_abs.clone(),
        comps,
        publisher_digest: digest_el.value_abs.clone(),
        content_type,
        locator_kind,
        key,
        keyname_name,
        keyname_pub,
        content: content_el.value_abs.clone(),
        signed: signed_start..signed_end,
        signature: sig_el.value_abs.clone(),
        end,
    })
}

/// Validate a standalone Name element and locate the end of the prefix
/// covering `prefix_comps` components (the whole name when `None`).
///
/// With `omit_possible_digest`, a final component that looks like an
/// implicit content digest (32-byte value, closing the name) is excluded
/// from the prefix.
pub fn check_namebuf(
    name: &[u8],
    prefix_comps: Option<u32>,
    omit_possible_digest: bool,
) -> Result<NamePrefix, DecodeError> {
    let mut outer = Reader::new(name, 0);
    let elem = outer.next()?;
    if elem.typ != tag::NAME {
        return Err(DecodeError::UnexpectedElement);
    }
    if !outer.at_end() {
        return Err(DecodeError::TrailingGarbage);
    }
    let start = elem.value_abs.start;

    let mut r = Reader::new(elem.value, start);
    let mut total = 0usize;
    let mut included = 0usize;
    let mut end = start;
    let mut prev_end = start;
    let mut last_len = 0usize;
    while !r.at_end() {
        let comp = r.next()?;
        if comp.typ != tag::COMPONENT {
            return Err(DecodeError::UnexpectedElement);
        }
        total += 1;
        if prefix_comps.map_or(true, |pc| total as u64 <= pc as u64) {
            prev_end = end;
            end = comp.full_abs.end;
            last_len = comp.full_abs.len();
            included = total;
        }
    }
    if let Some(pc) = prefix_comps {
        if pc as u64 > total as u64 {
            return Err(DecodeError::NotEnoughComponents);
        }
    }
    let mut ncomps = included;
    if omit_possible_digest
        && included > 0
        && end == elem.value_abs.end
        && last_len == DIGEST_COMPONENT_LEN
    {
        end = prev_end;
        ncomps -= 1;
    }
    Ok(NamePrefix { start, end, ncomps })
}

/// Does this ContentObject satisfy this Interest?
///
/// The Interest's prefix (per its ComponentCount, else its whole name) must
/// be a component-wise prefix of the content name, and a publisher digest
/// selector, when present, must match the content's publisher.
pub fn content_matches_interest(
    content: &[u8],
    pco: &ParsedContent,
    interest: &[u8],
    pi: &ParsedInterest,
) -> bool {
    let ncomps = pi.ncomps();
    let k = match pi.prefix_comps {
        Some(pc) => (pc as usize).min(ncomps),
        None => ncomps,
    };
    if pco.ncomps() < k {
        return false;
    }
    if interest[pi.comps[0]..pi.comps[k]] != content[pco.comps[0]..pco.comps[k]] {
        return false;
    }
    if let Some(selector) = &pi.publisher_digest {
        if interest[selector.clone()] != content[pco.publisher_digest.clone()] {
            return false;
        }
    }
    true
}
