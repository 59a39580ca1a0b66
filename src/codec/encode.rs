use super::error::DecodeError;
use super::{packet, tag};
use crate::definitions::Digest;

/// Append one varint.
pub fn write_varint(out: &mut Vec<u8>, v: u64) {
    if v <= 252 {
        out.push(v as u8);
    } else if v <= 65535 {
        out.push(253);
        out.extend_from_slice(&(v as u16).to_be_bytes());
    } else if v <= u32::MAX as u64 {
        out.push(254);
        out.extend_from_slice(&(v as u32).to_be_bytes());
    } else {
        out.push(255);
        out.extend_from_slice(&v.to_be_bytes());
    }
}

/// Append a TYPE/LENGTH header.
pub fn write_header(out: &mut Vec<u8>, typ: u64, len: usize) {
    write_varint(out, typ);
    write_varint(out, len as u64);
}

/// Append a whole element.
pub fn write_tlv(out: &mut Vec<u8>, typ: u64, value: &[u8]) {
    write_header(out, typ, value.len());
    out.extend_from_slice(value);
}

/// Append a numeric element (1, 2, 4 or 8 big-endian value bytes).
pub fn write_number(out: &mut Vec<u8>, typ: u64, v: u64) {
    if v <= u8::MAX as u64 {
        write_tlv(out, typ, &[v as u8]);
    } else if v <= u16::MAX as u64 {
        write_tlv(out, typ, &(v as u16).to_be_bytes());
    } else if v <= u32::MAX as u64 {
        write_tlv(out, typ, &(v as u32).to_be_bytes());
    } else {
        write_tlv(out, typ, &v.to_be_bytes());
    }
}

/// Encode a Name element from its components.
pub fn name<'a, I>(components: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut value = Vec::new();
    for comp in components {
        write_tlv(&mut value, tag::COMPONENT, comp);
    }
    let mut out = Vec::with_capacity(value.len() + 4);
    write_header(&mut out, tag::NAME, value.len());
    out.extend_from_slice(&value);
    out
}

/// Encode a Name element from a `/`-separated URI path. Empty segments are
/// ignored, so `"/"` yields the empty name.
pub fn name_from_uri(uri: &str) -> Vec<u8> {
    name(uri.split('/').filter(|s| !s.is_empty()).map(str::as_bytes))
}

/// Where the key that verifies a ContentObject can be found.
#[derive(Clone, Copy, Debug)]
pub enum KeyLocator<'a> {
    /// The public key itself, carried inline
    Key(&'a [u8; 32]),
    /// The name under which the key can be requested, with an optional
    /// publisher hint
    KeyName {
        name: &'a [u8],
        publisher: Option<&'a Digest>,
    },
}

pub(crate) fn write_key_locator(out: &mut Vec<u8>, locator: &KeyLocator<'_>) {
    let mut inner = Vec::new();
    match locator {
        KeyLocator::Key(key) => write_tlv(&mut inner, tag::KEY, &key[..]),
        KeyLocator::KeyName { name, publisher } => {
            let mut key_name = Vec::with_capacity(name.len() + 40);
            key_name.extend_from_slice(name);
            if let Some(digest) = publisher {
                write_tlv(&mut key_name, tag::PUBLISHER_DIGEST, &digest[..]);
            }
            write_tlv(&mut inner, tag::KEY_NAME, &key_name);
        }
    }
    write_tlv(out, tag::KEY_LOCATOR, &inner);
}

/// Construct an encoded Interest.
///
/// `name` must be an encoded Name element and is copied verbatim. When a
/// template is given, its selector region (everything between the end of
/// its ComponentCount and the start of its Nonce) and its trailing region
/// are spliced in; the template's Nonce itself is never copied.
pub fn interest(
    name: &[u8],
    prefix_comps: Option<u32>,
    template: Option<&[u8]>,
) -> Result<Vec<u8>, DecodeError> {
    let mut value = Vec::with_capacity(name.len() + 16);
    value.extend_from_slice(name);
    if let Some(count) = prefix_comps {
        write_number(&mut value, tag::COMPONENT_COUNT, count as u64);
    }
    if let Some(templ) = template {
        let pi = packet::parse_interest(templ)?;
        value.extend_from_slice(&templ[pi.cc_end..pi.nonce_start]);
        value.extend_from_slice(&templ[pi.other.clone()]);
    }
    let mut out = Vec::with_capacity(value.len() + 4);
    write_header(&mut out, tag::INTEREST, value.len());
    out.extend_from_slice(&value);
    Ok(out)
}

/// Build an Interest carrying only selectors, for use as a template.
pub fn interest_template(
    publisher: Option<&Digest>,
    scope: Option<u32>,
    lifetime_ms: Option<u64>,
) -> Vec<u8> {
    let mut value = Vec::new();
    write_header(&mut value, tag::NAME, 0);
    if let Some(digest) = publisher {
        write_tlv(&mut value, tag::PUBLISHER_DIGEST, &digest[..]);
    }
    if let Some(scope) = scope {
        write_number(&mut value, tag::SCOPE, scope as u64);
    }
    if let Some(lifetime) = lifetime_ms {
        write_number(&mut value, tag::LIFETIME, lifetime);
    }
    let mut out = Vec::with_capacity(value.len() + 4);
    write_header(&mut out, tag::INTEREST, value.len());
    out.extend_from_slice(&value);
    out
}
