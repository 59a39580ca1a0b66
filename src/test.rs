//! End-to-end scenarios, driven either straight through the dispatcher or
//! against a small fake forwarder on a Unix socket.

use std::cell::{Cell, RefCell};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use crate::codec::{self, KeyLocator, SkeletonDecoder};
use crate::crypto::{self, SigningKey};
use crate::definitions::INTEREST_LIFETIME_US;
use crate::{
    Client, Config, ContentType, ErrorKind, Handler, UpcallInfo, UpcallKind, UpcallResult,
    INTEREST_LIFETIME,
};

/// Shared counters wired into test handlers.
#[derive(Clone, Default)]
struct Probe {
    log: Rc<RefCell<Vec<(UpcallKind, usize)>>>,
    finals: Rc<Cell<usize>>,
}

impl Probe {
    fn new() -> Self {
        Self::default()
    }

    fn handler<F>(&self, respond: F) -> Rc<dyn Handler>
    where
        F: Fn(UpcallKind, &mut UpcallInfo<'_>) -> UpcallResult + 'static,
    {
        let log = self.log.clone();
        let finals = self.finals.clone();
        Rc::new(move |kind: UpcallKind, info: &mut UpcallInfo<'_>| {
            if kind == UpcallKind::Final {
                finals.set(finals.get() + 1);
                return UpcallResult::Ok;
            }
            log.borrow_mut().push((kind, info.matched_comps));
            respond(kind, info)
        })
    }

    fn kinds(&self) -> Vec<UpcallKind> {
        self.log.borrow().iter().map(|&(kind, _)| kind).collect()
    }
}

fn ok(_: UpcallKind, _: &mut UpcallInfo<'_>) -> UpcallResult {
    UpcallResult::Ok
}

fn offline_client() -> Client {
    Client::with_config(Config::default())
}

fn signed(signer: &SigningKey, uri: &str, payload: &[u8]) -> Vec<u8> {
    crypto::sign_content(
        signer,
        &codec::name_from_uri(uri),
        ContentType::Data,
        None,
        payload,
    )
}

// ---- dispatcher-driven scenarios ----

#[test]
fn content_delivery_with_cached_key() {
    let client = offline_client();
    let signer = crypto::generate_signing_key();
    client.cache_public_key(&signer.verifying_key());

    let probe = Probe::new();
    client
        .express_interest(&codec::name_from_uri("/a"), None, probe.handler(ok), None)
        .unwrap();

    client.dispatch_message(&signed(&signer, "/a/x", b"payload"));

    assert_eq!(&*probe.log.borrow(), &[(UpcallKind::Content, 1)]);
    assert_eq!(probe.finals.get(), 1);

    // the retired interest is gone after the next scheduler pass
    let _ = client.grab_buffered_output();
    client.process_scheduled_operations();
    assert_eq!(client.live_interests(), 0);
}

#[test]
fn timed_out_interest_reexpresses_the_same_bytes() {
    let client = offline_client();
    let probe = Probe::new();
    client
        .express_interest(
            &codec::name_from_uri("/a"),
            None,
            probe.handler(|kind, _| match kind {
                UpcallKind::InterestTimedOut => UpcallResult::Reexpress,
                _ => UpcallResult::Ok,
            }),
            None,
        )
        .unwrap();

    let first = client.grab_buffered_output().unwrap();
    client.advance_clock(INTEREST_LIFETIME);
    client.process_scheduled_operations();

    assert_eq!(probe.kinds(), vec![UpcallKind::InterestTimedOut]);
    let second = client.grab_buffered_output().unwrap();
    assert_eq!(first, second);
    assert_eq!(client.live_interests(), 1);
}

#[test]
fn timed_out_interest_retires_when_handler_declines() {
    let client = offline_client();
    let probe = Probe::new();
    client
        .express_interest(&codec::name_from_uri("/a"), None, probe.handler(ok), None)
        .unwrap();

    let _ = client.grab_buffered_output();
    client.advance_clock(INTEREST_LIFETIME);
    client.process_scheduled_operations();
    assert_eq!(probe.kinds(), vec![UpcallKind::InterestTimedOut]);
    assert_eq!(probe.finals.get(), 1);

    client.process_scheduled_operations();
    assert_eq!(client.live_interests(), 0);
}

#[test]
fn inline_key_is_used_immediately() {
    let client = offline_client();
    let signer = crypto::generate_signing_key();
    let public = signer.verifying_key();

    let probe = Probe::new();
    client
        .express_interest(&codec::name_from_uri("/a"), None, probe.handler(ok), None)
        .unwrap();

    let content = crypto::sign_content(
        &signer,
        &codec::name_from_uri("/a/x"),
        ContentType::Data,
        Some(&KeyLocator::Key(public.as_bytes())),
        b"payload",
    );
    client.dispatch_message(&content);

    assert_eq!(probe.kinds(), vec![UpcallKind::Content]);
    assert!(client
        .key_cache()
        .borrow()
        .contains(&crypto::key_digest(&public)));
}

#[test]
fn keyname_locator_suspends_then_resumes() {
    let client = offline_client();
    let signer = crypto::generate_signing_key();
    let publisher = crypto::key_digest(&signer.verifying_key());

    let probe = Probe::new();
    client
        .express_interest(
            &codec::name_from_uri("/a"),
            None,
            probe.handler(|kind, _| match kind {
                UpcallKind::ContentUnverified => UpcallResult::Verify,
                _ => UpcallResult::Ok,
            }),
            None,
        )
        .unwrap();
    client.grab_buffered_output().unwrap();

    let key_name = codec::name_from_uri("/keys/k");
    let content = crypto::sign_content(
        &signer,
        &codec::name_from_uri("/a/x"),
        ContentType::Data,
        Some(&KeyLocator::KeyName {
            name: &key_name,
            publisher: Some(&publisher),
        }),
        b"payload",
    );
    client.dispatch_message(&content);

    assert_eq!(probe.kinds(), vec![UpcallKind::ContentUnverified]);
    // the trigger is suspended, not destroyed, and a key fetch went out
    assert_eq!(client.live_interests(), 2);
    let fetch = client.grab_buffered_output().unwrap();
    let fetch_pi = codec::parse_interest(&fetch).unwrap();
    assert_eq!(fetch_pi.ncomps(), 2);
    let hint = fetch_pi.publisher_digest.clone().unwrap();
    assert_eq!(&fetch[hint], &publisher[..]);

    // the key arrives, self-signed, as KEY content under the key name
    let key_content = crypto::sign_content(
        &signer,
        &key_name,
        ContentType::Key,
        None,
        signer.verifying_key().as_bytes(),
    );
    client.dispatch_message(&key_content);
    assert!(client.key_cache().borrow().contains(&publisher));

    // next tick notices the arrival and refreshes the trigger
    let _ = client.grab_buffered_output();
    client.process_scheduled_operations();
    assert!(client.interest_states().contains(&(1, 1)));

    client.dispatch_message(&content);
    assert_eq!(
        probe.kinds(),
        vec![UpcallKind::ContentUnverified, UpcallKind::Content]
    );
}

#[test]
fn filter_receives_matching_interest() {
    let client = offline_client();
    let probe = Probe::new();
    client
        .set_interest_filter(&codec::name_from_uri("/a"), Some(probe.handler(ok)))
        .unwrap();

    let interest = codec::interest(&codec::name_from_uri("/a/b"), None, None).unwrap();
    client.dispatch_message(&interest);

    assert_eq!(&*probe.log.borrow(), &[(UpcallKind::Interest, 1)]);
}

#[test]
fn filters_fire_longest_match_first() {
    let client = offline_client();
    let probe = Probe::new();
    client
        .set_interest_filter(&codec::name_from_uri("/a"), Some(probe.handler(ok)))
        .unwrap();
    client
        .set_interest_filter(
            &codec::name_from_uri("/a/b"),
            Some(probe.handler(|_, _| UpcallResult::InterestConsumed)),
        )
        .unwrap();

    let interest = codec::interest(&codec::name_from_uri("/a/b/c"), None, None).unwrap();
    client.dispatch_message(&interest);

    assert_eq!(
        &*probe.log.borrow(),
        &[
            (UpcallKind::Interest, 2),
            (UpcallKind::ConsumedInterest, 1)
        ]
    );
}

#[test]
fn dispatched_key_content_avoids_a_later_fetch() {
    let client = offline_client();
    let signer = crypto::generate_signing_key();
    let publisher = crypto::key_digest(&signer.verifying_key());

    // pick the key up from passing traffic
    let probe = Probe::new();
    client
        .express_interest(&codec::name_from_uri("/keys"), None, probe.handler(ok), None)
        .unwrap();
    let key_content = crypto::sign_content(
        &signer,
        &codec::name_from_uri("/keys/k"),
        ContentType::Key,
        None,
        signer.verifying_key().as_bytes(),
    );
    client.dispatch_message(&key_content);
    assert!(client.key_cache().borrow().contains(&publisher));

    // content from that publisher now verifies without any locator
    client
        .express_interest(&codec::name_from_uri("/a"), None, probe.handler(ok), None)
        .unwrap();
    client.dispatch_message(&signed(&signer, "/a/x", b"payload"));
    assert!(probe.kinds().contains(&UpcallKind::Content));
}

#[test]
fn bad_signature_is_delivered_as_bad() {
    let client = offline_client();
    let signer = crypto::generate_signing_key();
    client.cache_public_key(&signer.verifying_key());

    let probe = Probe::new();
    client
        .express_interest(&codec::name_from_uri("/a"), None, probe.handler(ok), None)
        .unwrap();

    let mut content = signed(&signer, "/a/x", b"payload");
    let pco = codec::parse_content(&content).unwrap();
    content[pco.content.start] ^= 1;
    client.dispatch_message(&content);

    assert_eq!(probe.kinds(), vec![UpcallKind::ContentBad]);
}

#[test]
fn destroy_delivers_a_final_per_handler() {
    let probe = Probe::new();
    {
        let client = offline_client();
        client
            .express_interest(&codec::name_from_uri("/x"), None, probe.handler(ok), None)
            .unwrap();
        client
            .express_interest(&codec::name_from_uri("/y"), None, probe.handler(ok), None)
            .unwrap();
        client
            .set_interest_filter(&codec::name_from_uri("/f"), Some(probe.handler(ok)))
            .unwrap();
        assert_eq!(client.live_interests(), 2);
        assert_eq!(client.live_filters(), 1);
        assert_eq!(probe.finals.get(), 0);
    }
    assert_eq!(probe.finals.get(), 3);
}

#[test]
fn replaced_and_failed_handlers_still_get_final() {
    let client = offline_client();
    let probe = Probe::new();

    client
        .set_interest_filter(&codec::name_from_uri("/f"), Some(probe.handler(ok)))
        .unwrap();
    client
        .set_interest_filter(&codec::name_from_uri("/f"), None)
        .unwrap();
    assert_eq!(probe.finals.get(), 1);

    // a name that does not parse: the handler is released on the way out
    assert!(client
        .express_interest(b"garbage", None, probe.handler(ok), None)
        .is_err());
    assert_eq!(probe.finals.get(), 2);
}

#[test]
fn outstanding_never_exceeds_target() {
    let client = offline_client();
    let signer = crypto::generate_signing_key();
    client.cache_public_key(&signer.verifying_key());
    let probe = Probe::new();
    client
        .express_interest(&codec::name_from_uri("/a"), None, probe.handler(ok), None)
        .unwrap();

    let check = |client: &Client| {
        for (target, outstanding) in client.interest_states() {
            assert!(outstanding <= target && target <= 1);
        }
    };
    check(&client);
    let _ = client.grab_buffered_output();
    client.process_scheduled_operations();
    check(&client);
    client.dispatch_message(&signed(&signer, "/a/x", b"payload"));
    check(&client);
    client.advance_clock(INTEREST_LIFETIME);
    client.process_scheduled_operations();
    check(&client);
}

#[test]
fn scheduler_wakeup_tracks_interest_age() {
    let client = offline_client();
    let probe = Probe::new();
    client
        .express_interest(
            &codec::name_from_uri("/a"),
            None,
            probe.handler(|_, _| UpcallResult::Reexpress),
            None,
        )
        .unwrap();
    let _ = client.grab_buffered_output();

    let fresh = client.process_scheduled_operations();
    assert!(fresh <= INTEREST_LIFETIME_US);

    client.advance_clock(Duration::from_secs(1));
    let aged = client.process_scheduled_operations();
    assert!(aged <= INTEREST_LIFETIME_US - 900_000);
    assert!(aged > 2_000_000);
}

#[test]
fn run_refuses_reentry() {
    let client = offline_client();
    let signer = crypto::generate_signing_key();
    client.cache_public_key(&signer.verifying_key());

    let probe = Probe::new();
    client
        .express_interest(
            &codec::name_from_uri("/a"),
            None,
            probe.handler(|_, info| {
                let err = info.handle.run(0).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Busy);
                UpcallResult::Ok
            }),
            None,
        )
        .unwrap();
    client.dispatch_message(&signed(&signer, "/a/x", b"payload"));
    assert_eq!(probe.kinds(), vec![UpcallKind::Content]);
}

// ---- against a fake forwarder ----

/// Bind a listener and serve canned ContentObjects to whatever Interests
/// arrive, one thread per connection.
fn spawn_daemon(path: &Path, replies: Vec<Vec<u8>>) {
    let listener = UnixListener::bind(path).unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let replies = replies.clone();
            std::thread::spawn(move || serve_connection(stream, replies));
        }
    });
}

fn serve_connection(mut stream: UnixStream, replies: Vec<Vec<u8>>) {
    let mut buf: Vec<u8> = Vec::new();
    let mut decoder = SkeletonDecoder::default();
    let mut chunk = [0u8; 4096];
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..read]);
        loop {
            let resume = decoder.consumed();
            decoder.feed(&buf[resume..]);
            if decoder.failed() {
                return;
            }
            if decoder.at_boundary() && decoder.consumed() > 0 {
                let frame: Vec<u8> = buf.drain(..decoder.consumed()).collect();
                decoder.restart();
                answer(&mut stream, &frame, &replies);
                if buf.is_empty() {
                    break;
                }
            } else {
                break;
            }
        }
    }
}

fn answer(stream: &mut UnixStream, frame: &[u8], replies: &[Vec<u8>]) {
    let Ok(pi) = codec::parse_interest(frame) else {
        return;
    };
    for reply in replies {
        let Ok(pco) = codec::parse_content(reply) else {
            continue;
        };
        if codec::content_matches_interest(reply, &pco, frame, &pi) {
            let _ = stream.write_all(reply);
            return;
        }
    }
}

fn daemon_client(dir: &tempfile::TempDir, replies: Vec<Vec<u8>>) -> (Client, PathBuf) {
    let path = dir.path().join("ccnd.sock");
    spawn_daemon(&path, replies);
    let client = Client::with_config(Config {
        socket_path: Some(path.clone()),
        ..Config::default()
    });
    client.connect(None).unwrap();
    (client, path)
}

#[test]
fn run_delivers_content_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let signer = crypto::generate_signing_key();
    let (client, _path) = daemon_client(&dir, vec![signed(&signer, "/a/x", b"payload")]);
    client.cache_public_key(&signer.verifying_key());

    let probe = Probe::new();
    client
        .express_interest(
            &codec::name_from_uri("/a"),
            None,
            probe.handler(|kind, info| {
                if kind == UpcallKind::Content {
                    info.handle.set_run_timeout(0);
                }
                UpcallResult::Ok
            }),
            None,
        )
        .unwrap();

    client.run(2000).unwrap();
    assert_eq!(&*probe.log.borrow(), &[(UpcallKind::Content, 1)]);
}

#[test]
fn run_returns_when_the_wall_clock_expires() {
    let dir = tempfile::tempdir().unwrap();
    let (client, _path) = daemon_client(&dir, Vec::new());
    let started = std::time::Instant::now();
    client.run(50).unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn run_errors_when_disconnected() {
    let client = offline_client();
    let err = client.run(10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);
}

#[test]
fn get_fetches_one_content() {
    let dir = tempfile::tempdir().unwrap();
    let signer = crypto::generate_signing_key();
    let (client, _path) = daemon_client(&dir, vec![signed(&signer, "/a/x", b"payload")]);
    client.cache_public_key(&signer.verifying_key());

    let reply = client
        .get(&codec::name_from_uri("/a"), None, None, 2000)
        .unwrap()
        .expect("content should arrive");
    assert_eq!(&reply.message[reply.parsed.content.clone()], b"payload");
}

#[test]
fn get_from_inside_an_upcall_uses_a_shadow_handle() {
    let dir = tempfile::tempdir().unwrap();
    let signer = crypto::generate_signing_key();
    let (client, _path) = daemon_client(
        &dir,
        vec![
            signed(&signer, "/outer/x", b"outer"),
            signed(&signer, "/inner/y", b"inner"),
        ],
    );
    client.cache_public_key(&signer.verifying_key());
    let keys_before = client.key_cache().borrow().len();

    let probe = Probe::new();
    let inner_payload = Rc::new(RefCell::new(None));
    let inner = inner_payload.clone();
    client
        .express_interest(
            &codec::name_from_uri("/outer"),
            None,
            probe.handler(move |kind, info| {
                if kind == UpcallKind::Content {
                    let reply = info
                        .handle
                        .get(&codec::name_from_uri("/inner"), None, None, 2000)
                        .unwrap()
                        .expect("inner content should arrive");
                    *inner.borrow_mut() =
                        Some(reply.message[reply.parsed.content.clone()].to_vec());
                    info.handle.set_run_timeout(0);
                }
                UpcallResult::Ok
            }),
            None,
        )
        .unwrap();

    client.run(4000).unwrap();

    assert_eq!(probe.kinds(), vec![UpcallKind::Content]);
    assert_eq!(inner_payload.borrow().as_deref(), Some(b"inner".as_slice()));
    // the borrowed key cache came back unchanged
    assert_eq!(client.key_cache().borrow().len(), keys_before);
}
