//! The client handle: one connection to the forwarder, the registries
//! hanging off it, and the event loop that drives them.
//!
//! Everything runs on the thread that owns the [Client]. Upcalls may call
//! straight back into the handle (express a new Interest, install a filter,
//! change the run timeout), so no interior borrow is ever held across an
//! upcall and dispatch works over id snapshots that are re-checked after
//! every handler return.

use std::cell::{Cell, RefCell};
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::codec::{self, ParsedContent};
use crate::crypto;
use crate::definitions::{
    ContentType, Digest, Handler, UpcallInfo, UpcallKind, UpcallResult, INTEREST_LIFETIME_US,
};
use crate::error::{Error, ErrorKind};
use crate::keys::{self, KeyCache, KeyFetchHandler, KeyLocation};
use crate::registry::{ExpressedInterest, FilterRegistry, InterestId, InterestRegistry};
use crate::transport::{Config, Connection};

/// An interest older than this gets its age clamped, so the microsecond
/// arithmetic below stays far away from overflow.
const AGE_CLAMP: Duration = Duration::from_secs(30);

/// A client handle for talking to a local forwarding daemon.
///
/// A handle is created disconnected, connects at most once, and is owned by
/// exactly one thread. Dropping it cancels everything that is outstanding,
/// delivering one Final upcall to every installed handler.
pub struct Client {
    config: Config,
    conn: RefCell<Connection>,
    interests: RefCell<InterestRegistry>,
    filters: RefCell<FilterRegistry>,
    keys: RefCell<Rc<RefCell<KeyCache>>>,
    /// Wall-clock snapshot, refreshed at every scheduler pass
    now: Cell<Instant>,
    clock_offset: Cell<Duration>,
    /// Microseconds until the scheduler next wants attention
    refresh_us: Cell<u64>,
    run_timeout: Cell<i32>,
    /// Nonzero while inside an upcall or a scheduler pass
    running: Cell<u32>,
    last_error: Cell<Option<(ErrorKind, u32)>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a disconnected handle, reading `CCN_DEBUG`, `CCN_TAP` and
    /// `CCN_LOCAL_PORT` from the environment.
    pub fn new() -> Self {
        Self::with_config(Config::from_env())
    }

    /// Create a disconnected handle with explicit settings; the
    /// environment is not consulted.
    pub fn with_config(config: Config) -> Self {
        let conn = Connection::new(&config);
        Client {
            config,
            conn: RefCell::new(conn),
            interests: RefCell::new(InterestRegistry::default()),
            filters: RefCell::new(FilterRegistry::default()),
            keys: RefCell::new(Rc::new(RefCell::new(KeyCache::default()))),
            now: Cell::new(Instant::now()),
            clock_offset: Cell::new(Duration::ZERO),
            refresh_us: Cell::new(5 * INTEREST_LIFETIME_US),
            run_timeout: Cell::new(-1),
            running: Cell::new(0),
            last_error: Cell::new(None),
        }
    }

    /// Connect to the forwarder. `None` means the configured socket path
    /// (or the default one).
    pub fn connect(&self, path: Option<&Path>) -> Result<(), Error> {
        self.last_error.set(None);
        let path: PathBuf = match path {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => self.config.resolve_socket_path(),
        };
        self.conn
            .borrow_mut()
            .connect(&path)
            .map_err(|e| self.note(e))?;
        debug!(path = %path.display(), "connected to forwarder");
        Ok(())
    }

    /// Close the socket and drop both I/O buffers.
    pub fn disconnect(&self) {
        self.conn.borrow_mut().disconnect();
    }

    /// The raw socket descriptor, for callers that keep their own poll set.
    pub fn connection_fd(&self) -> Option<RawFd> {
        self.conn.borrow().fd()
    }

    /// Kind and source line of the most recently noted error.
    pub fn last_error(&self) -> Option<(ErrorKind, u32)> {
        self.last_error.get()
    }

    pub fn clear_last_error(&self) {
        self.last_error.set(None);
    }

    #[track_caller]
    fn note(&self, err: Error) -> Error {
        let line = std::panic::Location::caller().line();
        self.last_error.set(Some((err.kind(), line)));
        if self.config.debug {
            eprintln!("ccn: error at handle.rs:{line} - {err}");
        }
        trace!(line, error = %err, "noted error");
        err
    }

    fn release_handler(&self, handler: Option<Rc<dyn Handler>>) {
        let Some(handler) = handler else { return };
        if Rc::strong_count(&handler) == 1 {
            let mut info = UpcallInfo::bare(self);
            let _ = handler.upcall(UpcallKind::Final, &mut info);
        }
    }

    /// Preload a trusted publisher key, returning the digest it is filed
    /// under.
    pub fn cache_public_key(&self, key: &crypto::VerifyingKey) -> Digest {
        let digest = crypto::key_digest(key);
        let cache = self.keys.borrow().clone();
        cache.borrow_mut().insert_if_absent(digest, *key);
        digest
    }

    /// Send one encoded message (Interest or ContentObject) to the
    /// forwarder, queueing what the socket will not take. Returns whether
    /// output is pending.
    pub fn put(&self, msg: &[u8]) -> Result<bool, Error> {
        self.conn.borrow_mut().put(msg).map_err(|e| self.note(e))
    }

    /// Is there queued output waiting for the socket to drain?
    pub fn output_is_pending(&self) -> bool {
        self.conn.borrow().output_is_pending()
    }

    /// Steal the entire outbound queue, provided none of it has been
    /// partially written. Daemon-internal clients use this to route the
    /// queue around the socket.
    pub fn grab_buffered_output(&self) -> Option<Vec<u8>> {
        self.conn.borrow_mut().grab_buffered_output()
    }

    // ---- interests and filters ----

    /// Express an Interest: register the handler under the name prefix and
    /// send the encoded Interest right away.
    ///
    /// `prefix_comps` limits how many leading components form the matched
    /// prefix (`None` means the whole name, with a trailing digest
    /// component ignored). A template Interest can contribute selectors;
    /// its nonce is never copied.
    pub fn express_interest(
        &self,
        name: &[u8],
        prefix_comps: Option<u32>,
        handler: Rc<dyn Handler>,
        template: Option<&[u8]>,
    ) -> Result<(), Error> {
        let prefix = match codec::check_namebuf(name, prefix_comps, true) {
            Ok(prefix) => prefix,
            Err(e) => {
                self.release_handler(Some(handler));
                return Err(self.note(e.into()));
            }
        };
        let msg = match codec::interest(name, prefix_comps, template) {
            Ok(msg) if !msg.is_empty() => Bytes::from(msg),
            Ok(_) => {
                self.release_handler(Some(handler));
                return Err(self.note(Error::Internal));
            }
            Err(e) => {
                self.release_handler(Some(handler));
                return Err(self.note(e.into()));
            }
        };
        let key = name[prefix.start..prefix.end].to_vec();
        trace!(prefix = %hex::encode(&key), "expressing interest");
        let id = self
            .interests
            .borrow_mut()
            .insert(ExpressedInterest::new(key, handler, msg));
        self.refresh_interest(id);
        Ok(())
    }

    /// Install (or with `None`, remove) the handler serving a name prefix.
    /// A removed or displaced handler is released, with a Final upcall on
    /// its last reference.
    pub fn set_interest_filter(
        &self,
        name: &[u8],
        handler: Option<Rc<dyn Handler>>,
    ) -> Result<(), Error> {
        let span = match codec::check_namebuf(name, None, false) {
            Ok(span) => span,
            Err(e) => {
                self.release_handler(handler);
                return Err(self.note(e.into()));
            }
        };
        let key = name[span.start..span.end].to_vec();
        let displaced = self.filters.borrow_mut().set(key, handler);
        self.release_handler(displaced);
        Ok(())
    }

    /// Send the stored Interest again if fewer are outstanding than wanted.
    fn refresh_interest(&self, id: InterestId) {
        let msg = {
            let registry = self.interests.borrow();
            match registry.get(id) {
                Some(interest) if interest.outstanding < interest.target => interest.msg.clone(),
                _ => return,
            }
        };
        let Some(msg) = msg else { return };
        if self.put(&msg).is_ok() {
            let now = self.now.get();
            let mut registry = self.interests.borrow_mut();
            if let Some(interest) = registry.get_mut(id) {
                interest.outstanding += 1;
                interest.last_send = Some(now);
            }
        }
    }

    /// If this interest was waiting for a key that has since been cached,
    /// wake it up.
    fn check_pub_arrival(&self, id: InterestId) {
        let wanted = match self.interests.borrow().get(id) {
            Some(interest) => interest.wanted_pub,
            None => return,
        };
        let Some(digest) = wanted else { return };
        let cache = self.keys.borrow().clone();
        if !cache.borrow().contains(&digest) {
            return;
        }
        {
            let mut registry = self.interests.borrow_mut();
            let Some(interest) = registry.get_mut(id) else { return };
            interest.wanted_pub = None;
            interest.target = 1;
        }
        debug!(digest = %hex::encode(digest), "awaited key arrived, resuming interest");
        self.refresh_interest(id);
    }

    /// Walk one interest through the timeout lifecycle.
    fn age_interest(&self, id: InterestId) {
        let now = self.now.get();
        let staging = {
            let mut registry = self.interests.borrow_mut();
            let Some(interest) = registry.get_mut(id) else { return };
            let first_call = interest.last_send.is_none();
            let mut last = interest.last_send.unwrap_or(now);
            if now.saturating_duration_since(last) > AGE_CLAMP {
                interest.outstanding = 0;
                if let Some(clamped) = now.checked_sub(AGE_CLAMP) {
                    last = clamped;
                }
            }
            let mut delta = now.saturating_duration_since(last).as_micros() as u64;
            if delta >= INTEREST_LIFETIME_US {
                interest.outstanding = 0;
                delta = 0;
            }
            if INTEREST_LIFETIME_US - delta < self.refresh_us.get() {
                self.refresh_us.set(INTEREST_LIFETIME_US - delta);
            }
            interest.last_send = Some(
                now.checked_sub(Duration::from_micros(delta))
                    .unwrap_or(now),
            );
            if !(interest.target > 0 && interest.outstanding == 0) {
                return;
            }
            (first_call, interest.msg.clone().zip(interest.handler.clone()))
        };

        let (first_call, timed_out) = staging;
        let mut result = UpcallResult::Reexpress;
        if !first_call {
            result = UpcallResult::Err;
            if let Some((msg, handler)) = timed_out {
                match codec::parse_interest(&msg) {
                    Ok(pi) => {
                        let mut info = UpcallInfo {
                            handle: self,
                            interest: Some(&msg),
                            parsed_interest: Some(&pi),
                            content: None,
                            parsed_content: None,
                            matched_comps: 0,
                        };
                        result = handler.upcall(UpcallKind::InterestTimedOut, &mut info);
                    }
                    Err(e) => {
                        warn!(error = %e, "stored interest no longer parses");
                    }
                }
            }
        }
        match result {
            UpcallResult::Reexpress => self.refresh_interest(id),
            _ => {
                let mut registry = self.interests.borrow_mut();
                if let Some(interest) = registry.get_mut(id) {
                    interest.target = 0;
                }
            }
        }
    }

    /// Run the scheduler: refresh the clock, wake suspended interests, age
    /// the rest, and garbage-collect. Returns microseconds until the next
    /// thing needs to happen.
    ///
    /// The event loop calls this every iteration; daemon-internal clients
    /// drive it directly.
    pub fn process_scheduled_operations(&self) -> u64 {
        self.refresh_us.set(5 * INTEREST_LIFETIME_US);
        self.now.set(Instant::now() + self.clock_offset.get());
        if self.output_is_pending() {
            return self.refresh_us.get();
        }
        self.running.set(self.running.get() + 1);
        // TODO: refresh filter registrations once the forwarder expires them
        let mut need_clean = false;
        let ids = self.interests.borrow().all_ids();
        for id in ids {
            self.check_pub_arrival(id);
            let target = match self.interests.borrow().get(id) {
                Some(interest) => interest.target,
                None => continue,
            };
            if target != 0 {
                self.age_interest(id);
            }
            let retired = {
                let mut registry = self.interests.borrow_mut();
                match registry.get_mut(id) {
                    Some(interest) if interest.target == 0 && interest.wanted_pub.is_none() => {
                        interest.msg = None;
                        need_clean = true;
                        interest.handler.take()
                    }
                    _ => None,
                }
            };
            self.release_handler(retired);
        }
        if need_clean {
            let swept = self.interests.borrow_mut().sweep();
            if swept > 0 {
                trace!(swept, "swept retired interests");
            }
        }
        self.running.set(self.running.get() - 1);
        self.refresh_us.get()
    }

    // ---- dispatch ----

    /// Route one complete inbound message through the registered upcalls.
    ///
    /// The event loop feeds every received frame through here; it is public
    /// so a daemon-internal client can inject messages without a socket.
    pub fn dispatch_message(&self, msg: &[u8]) {
        self.running.set(self.running.get() + 1);
        if let Ok(pi) = codec::parse_interest(msg) {
            self.dispatch_interest(msg, &pi);
        } else if let Ok(pco) = codec::parse_content(msg) {
            self.dispatch_content(msg, &pco);
        } else {
            trace!(len = msg.len(), "inbound frame is neither interest nor content");
        }
        self.running.set(self.running.get() - 1);
    }

    fn dispatch_interest(&self, msg: &[u8], pi: &codec::ParsedInterest) {
        let mut kind = UpcallKind::Interest;
        let keystart = pi.comps[0];
        for i in (0..pi.comps.len()).rev() {
            let handler = self.filters.borrow().get(&msg[keystart..pi.comps[i]]);
            let Some(handler) = handler else { continue };
            let mut info = UpcallInfo {
                handle: self,
                interest: Some(msg),
                parsed_interest: Some(pi),
                content: None,
                parsed_content: None,
                matched_comps: i,
            };
            let result = handler.upcall(kind, &mut info);
            if result == UpcallResult::InterestConsumed {
                kind = UpcallKind::ConsumedInterest;
            }
        }
    }

    fn dispatch_content(&self, msg: &[u8], pco: &ParsedContent) {
        let keystart = pco.comps[0];
        for i in (0..pco.comps.len()).rev() {
            let bucket = self
                .interests
                .borrow()
                .bucket_ids(&msg[keystart..pco.comps[i]]);
            let Some(bucket) = bucket else { continue };
            for id in bucket {
                // the previous upcall may have retired or resized things,
                // so everything is re-fetched by id
                let staged = {
                    let registry = self.interests.borrow();
                    match registry.get(id) {
                        Some(interest) if interest.target > 0 && interest.outstanding > 0 => {
                            interest.msg.clone().zip(interest.handler.clone())
                        }
                        _ => continue,
                    }
                };
                let Some((interest_msg, handler)) = staged else {
                    continue;
                };
                let Ok(pi) = codec::parse_interest(&interest_msg) else {
                    continue;
                };
                if !codec::content_matches_interest(msg, pco, &interest_msg, &pi) {
                    continue;
                }

                if pco.content_type == ContentType::Key {
                    let cache = self.keys.borrow().clone();
                    let cached = keys::cache_key(msg, pco, &mut cache.borrow_mut());
                    if let Err(e) = cached {
                        debug!(error = %e, "key content did not cache");
                    }
                }
                let location = {
                    let cache = self.keys.borrow().clone();
                    let mut cache = cache.borrow_mut();
                    keys::locate_key(msg, pco, &mut cache)
                };
                let kind = match location {
                    KeyLocation::Found(key) => match crypto::verify_content(msg, pco, &key) {
                        Ok(()) => UpcallKind::Content,
                        Err(_) => UpcallKind::ContentBad,
                    },
                    _ => UpcallKind::ContentUnverified,
                };

                {
                    let mut registry = self.interests.borrow_mut();
                    if let Some(interest) = registry.get_mut(id) {
                        interest.outstanding = interest.outstanding.saturating_sub(1);
                    }
                }
                let result = {
                    let mut info = UpcallInfo {
                        handle: self,
                        interest: Some(&interest_msg),
                        parsed_interest: Some(&pi),
                        content: Some(msg),
                        parsed_content: Some(pco),
                        matched_comps: i,
                    };
                    handler.upcall(kind, &mut info)
                };
                drop(handler);
                match result {
                    UpcallResult::Reexpress => self.refresh_interest(id),
                    UpcallResult::Verify if kind == UpcallKind::ContentUnverified => {
                        self.initiate_key_fetch(msg, pco, id);
                    }
                    _ => {
                        let retired = {
                            let mut registry = self.interests.borrow_mut();
                            match registry.get_mut(id) {
                                Some(interest) => {
                                    interest.target = 0;
                                    interest.msg = None;
                                    interest.handler.take()
                                }
                                None => None,
                            }
                        };
                        self.release_handler(retired);
                    }
                }
            }
        }
    }

    /// Suspend the triggering interest until the publisher key shows up,
    /// and ask for that key by the name its locator gives.
    fn initiate_key_fetch(&self, msg: &[u8], pco: &ParsedContent, trigger: InterestId) {
        let digest = Digest::try_from(&msg[pco.publisher_digest.clone()]).ok();
        {
            let mut registry = self.interests.borrow_mut();
            if let Some(interest) = registry.get_mut(trigger) {
                interest.wanted_pub = digest;
                interest.target = 0;
            }
        }
        let Some(name_range) = pco.keyname_name.clone() else {
            // no name to ask by; the key may still arrive with other traffic
            trace!("key locator names no fetchable key");
            return;
        };
        let key_name = msg[name_range].to_vec();
        let template = pco.keyname_pub.clone().and_then(|range| {
            Digest::try_from(&msg[range])
                .ok()
                .map(|hint| codec::interest_template(Some(&hint), None, None))
        });
        debug!("fetching verification key");
        let _ = self.express_interest(
            &key_name,
            None,
            Rc::new(KeyFetchHandler),
            template.as_deref(),
        );
    }

    // ---- event loop ----

    /// Change the run timeout from inside an upcall; `0` makes [run](Self::run)
    /// return after the current iteration. Returns the previous value.
    pub fn set_run_timeout(&self, timeout_ms: i32) -> i32 {
        self.run_timeout.replace(timeout_ms)
    }

    /// Run the event loop: poll the socket, flush and ingest, age
    /// interests. A negative timeout runs forever, zero makes one pass.
    /// Refuses to run re-entrantly.
    pub fn run(&self, timeout_ms: i32) -> Result<(), Error> {
        if self.running.get() != 0 {
            return Err(self.note(Error::Busy));
        }
        self.run_timeout.set(timeout_ms);
        let mut started: Option<Instant> = None;
        loop {
            if !self.conn.borrow().is_connected() {
                return Err(self.note(Error::NotConnected));
            }
            let scheduler_us = self.process_scheduled_operations();
            let timeout = self.run_timeout.get();
            let now = self.now.get();
            match started {
                None => started = Some(now),
                Some(start) if timeout >= 0 => {
                    let elapsed_ms = now.saturating_duration_since(start).as_millis();
                    if elapsed_ms > timeout as u128 {
                        return Ok(());
                    }
                }
                Some(_) => {}
            }

            let mut wait_ms = scheduler_us / 1000;
            if timeout >= 0 && (timeout as u64) < wait_ms {
                wait_ms = timeout as u64;
            }
            let woke = {
                let poll_result = self.conn.borrow().poll(wait_ms);
                match poll_result {
                    Ok(woke) => woke,
                    Err(e) => return Err(self.note(e.into())),
                }
            };
            if woke {
                if let Err(e) = self.conn.borrow_mut().pushout() {
                    let _ = self.note(e);
                }
                let input = self.conn.borrow_mut().process_input();
                match input {
                    Ok(frames) => {
                        for frame in frames {
                            self.dispatch_message(&frame);
                        }
                    }
                    Err(e) => {
                        let _ = self.note(e);
                    }
                }
            }
            if matches!(self.last_error.get(), Some((ErrorKind::NotConnected, _))) {
                self.disconnect();
            }
            if self.run_timeout.get() == 0 {
                return Ok(());
            }
        }
    }

    // ---- synchronous get ----

    /// Get a single matching ContentObject, blocking until one arrives or
    /// `timeout_ms` runs out (`None`).
    ///
    /// When called from inside an upcall, the request transparently runs on
    /// a fresh shadow handle over its own connection, borrowing this
    /// handle's key cache for the duration; the outer loop's state machine
    /// is left alone.
    pub fn get(
        &self,
        name: &[u8],
        prefix_comps: Option<u32>,
        template: Option<&[u8]>,
        timeout_ms: i32,
    ) -> Result<Option<ContentReply>, Error> {
        if self.running.get() == 0 {
            return self.get_inner(name, prefix_comps, template, timeout_ms);
        }
        let shadow = Client::with_config(self.config.clone());
        let own_cache = shadow.keys.replace(self.keys.borrow().clone());
        let reply = shadow
            .connect(None)
            .and_then(|()| shadow.get_inner(name, prefix_comps, template, timeout_ms));
        // hand the borrowed keys back before the shadow goes away
        shadow.keys.replace(own_cache);
        reply
    }

    /// One-shot get on a throwaway handle, for callers that do not hold one.
    pub fn get_fresh(
        config: Config,
        name: &[u8],
        prefix_comps: Option<u32>,
        template: Option<&[u8]>,
        timeout_ms: i32,
    ) -> Result<Option<ContentReply>, Error> {
        let handle = Client::with_config(config);
        handle.connect(None)?;
        handle.get_inner(name, prefix_comps, template, timeout_ms)
    }

    fn get_inner(
        &self,
        name: &[u8],
        prefix_comps: Option<u32>,
        template: Option<&[u8]>,
        timeout_ms: i32,
    ) -> Result<Option<ContentReply>, Error> {
        let state = Rc::new(GetState {
            reply: RefCell::new(None),
            reexpress: Cell::new(true),
        });
        self.express_interest(
            name,
            prefix_comps,
            Rc::new(GetClosure {
                state: Rc::clone(&state),
            }),
            template,
        )?;
        let outcome = self.run(timeout_ms);
        state.reexpress.set(false);
        outcome?;
        let reply = state.reply.borrow_mut().take();
        Ok(reply)
    }

    // ---- test support ----

    #[cfg(test)]
    pub(crate) fn advance_clock(&self, delta: Duration) {
        self.clock_offset.set(self.clock_offset.get() + delta);
    }

    #[cfg(test)]
    pub(crate) fn key_cache(&self) -> Rc<RefCell<KeyCache>> {
        self.keys.borrow().clone()
    }

    #[cfg(test)]
    pub(crate) fn live_interests(&self) -> usize {
        self.interests.borrow().len()
    }

    #[cfg(test)]
    pub(crate) fn live_filters(&self) -> usize {
        self.filters.borrow().len()
    }

    #[cfg(test)]
    pub(crate) fn interest_states(&self) -> Vec<(u8, u8)> {
        let registry = self.interests.borrow();
        registry
            .all_ids()
            .into_iter()
            .filter_map(|id| registry.get(id))
            .map(|interest| (interest.target, interest.outstanding))
            .collect()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.disconnect();
        let filters = self.filters.borrow_mut().drain();
        for handler in filters {
            self.release_handler(Some(handler));
        }
        let ids = self.interests.borrow().all_ids();
        for id in ids {
            let removed = self.interests.borrow_mut().remove(id);
            if let Some(mut interest) = removed {
                self.release_handler(interest.handler.take());
            }
        }
    }
}

/// What [Client::get] hands back: the raw ContentObject and its parse.
#[derive(Clone, Debug)]
pub struct ContentReply {
    pub message: Vec<u8>,
    pub parsed: ParsedContent,
}

struct GetState {
    reply: RefCell<Option<ContentReply>>,
    reexpress: Cell<bool>,
}

struct GetClosure {
    state: Rc<GetState>,
}

impl Handler for GetClosure {
    fn upcall(&self, kind: UpcallKind, info: &mut UpcallInfo<'_>) -> UpcallResult {
        match kind {
            UpcallKind::Final => UpcallResult::Ok,
            UpcallKind::InterestTimedOut => {
                if self.state.reexpress.get() {
                    UpcallResult::Reexpress
                } else {
                    UpcallResult::Ok
                }
            }
            UpcallKind::Content | UpcallKind::ContentUnverified => {
                if let (Some(msg), Some(pco)) = (info.content, info.parsed_content) {
                    *self.state.reply.borrow_mut() = Some(ContentReply {
                        message: msg[..pco.end].to_vec(),
                        parsed: pco.clone(),
                    });
                }
                info.handle.set_run_timeout(0);
                UpcallResult::Ok
            }
            _ => UpcallResult::Err,
        }
    }
}
