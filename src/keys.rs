//! The public key cache and the key location algorithm that gates content
//! verification.

use std::collections::HashMap;

use ed25519_dalek::VerifyingKey;
use tracing::{debug, trace};

use crate::codec::{LocatorKind, ParsedContent};
use crate::crypto::{self, CryptoError};
use crate::definitions::{Digest, Handler, UpcallInfo, UpcallKind, UpcallResult};

/// Publisher keys, indexed by the SHA2-256 of the key bytes. Entries live
/// until the owning handle goes away.
#[derive(Default)]
pub(crate) struct KeyCache {
    keys: HashMap<Digest, VerifyingKey>,
}

impl KeyCache {
    pub(crate) fn get(&self, digest: &Digest) -> Option<VerifyingKey> {
        self.keys.get(digest).cloned()
    }

    pub(crate) fn contains(&self, digest: &Digest) -> bool {
        self.keys.contains_key(digest)
    }

    pub(crate) fn insert_if_absent(&mut self, digest: Digest, key: VerifyingKey) -> bool {
        match self.keys.entry(digest) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(key);
                true
            }
            std::collections::hash_map::Entry::Occupied(_) => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Outcome of trying to find the key that verifies a ContentObject.
pub(crate) enum KeyLocation {
    Found(VerifyingKey),
    FetchNeeded,
    Unusable,
}

/// Find the public key needed to verify `msg`.
///
/// The key might already be cached, or carried inline by the key locator
/// (in which case it is cached on the spot). A KeyName locator means it has
/// to be requested. Certificate locators are recognized but not handled.
pub(crate) fn locate_key(msg: &[u8], pco: &ParsedContent, cache: &mut KeyCache) -> KeyLocation {
    let Ok(digest) = Digest::try_from(&msg[pco.publisher_digest.clone()]) else {
        return KeyLocation::Unusable;
    };
    if let Some(key) = cache.get(&digest) {
        return KeyLocation::Found(key);
    }
    match pco.locator_kind {
        None => KeyLocation::Unusable,
        Some(LocatorKind::KeyName) => KeyLocation::FetchNeeded,
        Some(LocatorKind::Key) => {
            let Some(range) = pco.key.clone() else {
                return KeyLocation::Unusable;
            };
            let Ok(raw) = <&[u8; 32]>::try_from(&msg[range]) else {
                return KeyLocation::Unusable;
            };
            let Ok(key) = VerifyingKey::from_bytes(raw) else {
                debug!("inline key does not decode");
                return KeyLocation::Unusable;
            };
            let key_digest = crypto::sha256(raw);
            cache.insert_if_absent(key_digest, key);
            trace!(digest = %hex::encode(key_digest), "cached inline key");
            KeyLocation::Found(key)
        }
        Some(LocatorKind::Certificate) => {
            debug!("certificate key locators are not supported");
            KeyLocation::Unusable
        }
    }
}

/// Cache the key carried by a KEY-type ContentObject under its own digest.
pub(crate) fn cache_key(
    msg: &[u8],
    pco: &ParsedContent,
    cache: &mut KeyCache,
) -> Result<(), CryptoError> {
    let raw: &[u8; 32] = msg[pco.content.clone()]
        .try_into()
        .map_err(|_| CryptoError::BadKeyMaterial)?;
    let key = VerifyingKey::from_bytes(raw).map_err(|_| CryptoError::BadKeyMaterial)?;
    let digest = crypto::sha256(raw);
    if cache.insert_if_absent(digest, key) {
        debug!(digest = %hex::encode(digest), "cached key content");
    }
    Ok(())
}

/// Handler behind the internal key-fetch Interests. It has nothing to do on
/// arrival, the dispatcher caches keys as they go by; it just never retries
/// a timed-out fetch.
pub(crate) struct KeyFetchHandler;

impl Handler for KeyFetchHandler {
    fn upcall(&self, kind: UpcallKind, _info: &mut UpcallInfo<'_>) -> UpcallResult {
        match kind {
            UpcallKind::Final
            | UpcallKind::InterestTimedOut
            | UpcallKind::Content
            | UpcallKind::ContentUnverified => UpcallResult::Ok,
            _ => UpcallResult::Err,
        }
    }
}
