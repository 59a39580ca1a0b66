//! Tables of outstanding Interests and served filter prefixes.
//!
//! Both are keyed by the raw bytes of a name-component region. Expressed
//! interests live in an id arena; prefix buckets hold ordered id lists, so
//! a stale id taken across an upcall simply fails to resolve instead of
//! dangling.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use bytes::Bytes;

use crate::definitions::{Digest, Handler};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct InterestId(u64);

/// One outstanding request.
pub(crate) struct ExpressedInterest {
    /// Bucket key this interest is filed under
    pub(crate) prefix: Vec<u8>,
    /// When the interest was last sent; None until the first send
    pub(crate) last_send: Option<Instant>,
    pub(crate) handler: Option<Rc<dyn Handler>>,
    /// The exact encoded Interest bytes as sent
    pub(crate) msg: Option<Bytes>,
    /// How many we want outstanding (0 or 1)
    pub(crate) target: u8,
    /// How many are outstanding right now (0 or 1)
    pub(crate) outstanding: u8,
    /// Suspended until this publisher key shows up in the cache
    pub(crate) wanted_pub: Option<Digest>,
}

impl ExpressedInterest {
    pub(crate) fn new(prefix: Vec<u8>, handler: Rc<dyn Handler>, msg: Bytes) -> Self {
        ExpressedInterest {
            prefix,
            last_send: None,
            handler: Some(handler),
            msg: Some(msg),
            target: 1,
            outstanding: 0,
            wanted_pub: None,
        }
    }

    fn is_dead(&self) -> bool {
        self.handler.is_none() && self.wanted_pub.is_none()
    }
}

#[derive(Default)]
pub(crate) struct InterestRegistry {
    buckets: HashMap<Vec<u8>, Vec<InterestId>>,
    arena: HashMap<InterestId, ExpressedInterest>,
    next_id: u64,
}

impl InterestRegistry {
    /// File a new interest at the front of its prefix bucket.
    pub(crate) fn insert(&mut self, interest: ExpressedInterest) -> InterestId {
        let id = InterestId(self.next_id);
        self.next_id += 1;
        self.buckets
            .entry(interest.prefix.clone())
            .or_default()
            .insert(0, id);
        self.arena.insert(id, interest);
        id
    }

    pub(crate) fn get(&self, id: InterestId) -> Option<&ExpressedInterest> {
        self.arena.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: InterestId) -> Option<&mut ExpressedInterest> {
        self.arena.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: InterestId) -> Option<ExpressedInterest> {
        let interest = self.arena.remove(&id)?;
        if let Some(bucket) = self.buckets.get_mut(&interest.prefix) {
            bucket.retain(|&other| other != id);
            if bucket.is_empty() {
                self.buckets.remove(&interest.prefix);
            }
        }
        Some(interest)
    }

    /// Ids filed under exactly this prefix key, in dispatch order.
    pub(crate) fn bucket_ids(&self, key: &[u8]) -> Option<Vec<InterestId>> {
        self.buckets.get(key).cloned()
    }

    pub(crate) fn all_ids(&self) -> Vec<InterestId> {
        self.arena.keys().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.arena.len()
    }

    /// Drop every interest whose handler is gone and that is not waiting
    /// for a key; prune emptied buckets. Returns how many went away.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.arena.len();
        let arena = &mut self.arena;
        self.buckets.retain(|_, bucket| {
            bucket.retain(|id| {
                let dead = arena.get(id).map_or(true, |interest| interest.is_dead());
                if dead {
                    arena.remove(id);
                }
                !dead
            });
            !bucket.is_empty()
        });
        before - self.arena.len()
    }
}

#[derive(Default)]
pub(crate) struct FilterRegistry {
    filters: HashMap<Vec<u8>, Rc<dyn Handler>>,
}

impl FilterRegistry {
    /// Install or delete the handler for a name key; whatever handler was
    /// displaced is handed back so the caller can release it.
    pub(crate) fn set(
        &mut self,
        key: Vec<u8>,
        handler: Option<Rc<dyn Handler>>,
    ) -> Option<Rc<dyn Handler>> {
        match handler {
            Some(handler) => self.filters.insert(key, handler),
            None => self.filters.remove(&key),
        }
    }

    pub(crate) fn get(&self, key: &[u8]) -> Option<Rc<dyn Handler>> {
        self.filters.get(key).cloned()
    }

    pub(crate) fn drain(&mut self) -> Vec<Rc<dyn Handler>> {
        self.filters.drain().map(|(_, handler)| handler).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.filters.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::definitions::{UpcallInfo, UpcallKind, UpcallResult};

    fn noop() -> Rc<dyn Handler> {
        Rc::new(|_: UpcallKind, _: &mut UpcallInfo<'_>| UpcallResult::Ok)
    }

    fn interest(prefix: &[u8]) -> ExpressedInterest {
        ExpressedInterest::new(prefix.to_vec(), noop(), Bytes::from_static(b"msg"))
    }

    #[test]
    fn bucket_order_is_newest_first() {
        let mut reg = InterestRegistry::default();
        let a = reg.insert(interest(b"p"));
        let b = reg.insert(interest(b"p"));
        assert_eq!(reg.bucket_ids(b"p").unwrap(), vec![b, a]);
    }

    #[test]
    fn sweep_drops_dead_interests_and_buckets() {
        let mut reg = InterestRegistry::default();
        let a = reg.insert(interest(b"p"));
        let b = reg.insert(interest(b"q"));
        reg.get_mut(a).unwrap().handler = None;
        assert_eq!(reg.sweep(), 1);
        assert_eq!(reg.len(), 1);
        assert!(reg.bucket_ids(b"p").is_none());
        assert!(reg.get(b).is_some());

        // still waiting for a key: survives without a handler
        reg.get_mut(b).unwrap().handler = None;
        reg.get_mut(b).unwrap().wanted_pub = Some([0; 32]);
        assert_eq!(reg.sweep(), 0);
        assert!(reg.get(b).is_some());
    }

    #[test]
    fn removal_prunes_the_bucket() {
        let mut reg = InterestRegistry::default();
        let a = reg.insert(interest(b"p"));
        assert!(reg.remove(a).is_some());
        assert!(reg.bucket_ids(b"p").is_none());
        assert!(reg.remove(a).is_none());
    }
}
