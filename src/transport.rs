//! The stream connection to the forwarding daemon: a non-blocking
//! Unix-domain socket with an outbound queue, inbound framing driven by the
//! skeleton decoder, and an optional tap file capturing raw outbound bytes.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use polling::{Event, Events, PollMode, Poller};
use tracing::{debug, warn};

use crate::codec::SkeletonDecoder;
use crate::error::Error;

/// Where the forwarding daemon listens by default.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/.ccnd.sock";

/// Headroom reserved per read; comfortably above the usual element size.
const READ_CHUNK: usize = 8800;

/// Queued output past this size draws a warning (once).
const OUTBUF_HIGH_WATER: usize = 1 << 20;

/// Handle settings, captured from the environment exactly once at creation.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Print noted errors to stderr (`CCN_DEBUG`)
    pub debug: bool,
    /// Tap file path prefix (`CCN_TAP`)
    pub tap: Option<PathBuf>,
    /// Socket path to use when `connect` is not given one
    pub socket_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        let debug = std::env::var("CCN_DEBUG").map(|v| !v.is_empty()).unwrap_or(false);
        let tap = std::env::var("CCN_TAP")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let socket_path = std::env::var("CCN_LOCAL_PORT")
            .ok()
            .filter(|v| !v.is_empty() && v.len() <= 10)
            .map(|v| PathBuf::from(format!("{DEFAULT_SOCKET_PATH}.{v}")));
        Config {
            debug,
            tap,
            socket_path,
        }
    }

    pub(crate) fn resolve_socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
    }
}

pub(crate) struct Connection {
    stream: Option<UnixStream>,
    inbuf: BytesMut,
    outbuf: Vec<u8>,
    outbuf_index: usize,
    decoder: SkeletonDecoder,
    tap: Option<File>,
    outbuf_warned: bool,
}

impl Connection {
    pub(crate) fn new(config: &Config) -> Self {
        Connection {
            stream: None,
            inbuf: BytesMut::new(),
            outbuf: Vec::new(),
            outbuf_index: 0,
            decoder: SkeletonDecoder::default(),
            tap: config.tap.as_deref().and_then(open_tap),
            outbuf_warned: false,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub(crate) fn fd(&self) -> Option<RawFd> {
        self.stream.as_ref().map(|s| s.as_raw_fd())
    }

    pub(crate) fn connect(&mut self, path: &Path) -> Result<(), Error> {
        if self.stream.is_some() {
            return Err(Error::Invalid);
        }
        let stream = UnixStream::connect(path)?;
        stream.set_nonblocking(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    pub(crate) fn disconnect(&mut self) {
        self.inbuf = BytesMut::new();
        self.outbuf = Vec::new();
        self.outbuf_index = 0;
        self.decoder.restart();
        self.stream = None;
    }

    /// Send one complete element, queueing whatever the socket will not
    /// take right now. Returns whether output is still pending.
    pub(crate) fn put(&mut self, msg: &[u8]) -> Result<bool, Error> {
        if msg.is_empty() || !is_single_frame(msg) {
            return Err(Error::Invalid);
        }
        if let Some(tap) = &mut self.tap {
            if let Err(e) = tap.write_all(msg) {
                warn!(error = %e, "tap write failed, disabling the tap");
                self.tap = None;
            }
        }
        if self.output_is_pending() {
            self.queue(msg);
            return self.pushout();
        }
        let written = match &self.stream {
            Some(stream) => {
                let mut stream: &UnixStream = stream;
                match stream.write(msg) {
                    Ok(n) => n,
                    Err(e) if e.kind() == ErrorKind::WouldBlock => 0,
                    Err(e) => return Err(classify_io(e)),
                }
            }
            None => 0,
        };
        if written < msg.len() {
            self.queue(&msg[written..]);
            return Ok(true);
        }
        Ok(false)
    }

    fn queue(&mut self, bytes: &[u8]) {
        self.outbuf.extend_from_slice(bytes);
        let queued = self.outbuf.len() - self.outbuf_index;
        if !self.outbuf_warned && queued > OUTBUF_HIGH_WATER {
            self.outbuf_warned = true;
            warn!(queued, "outbound queue keeps growing, the forwarder is not draining");
        }
    }

    /// Drain the outbound queue as far as the socket allows. Returns whether
    /// output is still pending.
    pub(crate) fn pushout(&mut self) -> Result<bool, Error> {
        if !self.output_is_pending() {
            return Ok(false);
        }
        let Some(stream) = &self.stream else {
            return Ok(true);
        };
        let mut stream: &UnixStream = stream;
        match stream.write(&self.outbuf[self.outbuf_index..]) {
            Ok(n) if self.outbuf_index + n == self.outbuf.len() => {
                self.outbuf.clear();
                self.outbuf_index = 0;
                Ok(false)
            }
            Ok(n) => {
                self.outbuf_index += n;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(true),
            Err(e) => Err(classify_io(e)),
        }
    }

    pub(crate) fn output_is_pending(&self) -> bool {
        self.outbuf_index < self.outbuf.len()
    }

    /// Steal the whole outbound queue, provided none of it has been
    /// partially written yet.
    pub(crate) fn grab_buffered_output(&mut self) -> Option<Vec<u8>> {
        if self.output_is_pending() && self.outbuf_index == 0 {
            Some(std::mem::take(&mut self.outbuf))
        } else {
            None
        }
    }

    /// Read once and split off every complete frame.
    ///
    /// A read of zero bytes is a peer close: the connection is torn down
    /// and NotConnected reported. Malformed framing also poisons the
    /// stream, so it is treated the same way.
    pub(crate) fn process_input(&mut self) -> Result<Vec<Bytes>, Error> {
        let Some(stream) = &self.stream else {
            return Ok(Vec::new());
        };
        if self.inbuf.is_empty() {
            self.decoder.restart();
        }
        let start = self.inbuf.len();
        self.inbuf.resize(start + READ_CHUNK, 0);
        let mut reader: &UnixStream = stream;
        let read = match reader.read(&mut self.inbuf[start..]) {
            Ok(0) => {
                self.inbuf.truncate(start);
                self.disconnect();
                return Err(Error::NotConnected);
            }
            Ok(n) => n,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => 0,
            Err(e) => {
                self.inbuf.truncate(start);
                return Err(classify_io(e));
            }
        };
        self.inbuf.truncate(start + read);

        let mut frames = Vec::new();
        loop {
            let resume = self.decoder.consumed();
            if resume >= self.inbuf.len() && !self.decoder.at_boundary() {
                break;
            }
            self.decoder.feed(&self.inbuf[resume..]);
            if self.decoder.failed() {
                warn!("unframeable bytes from the forwarder, dropping the connection");
                self.disconnect();
                return Err(Error::Invalid);
            }
            if self.decoder.at_boundary() && self.decoder.consumed() > 0 {
                let frame_len = self.decoder.consumed();
                frames.push(self.inbuf.split_to(frame_len).freeze());
                self.decoder.restart();
                if self.inbuf.is_empty() {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(frames)
    }

    /// Block until the socket is readable (or writable, when output is
    /// pending), or the timeout passes. Returns whether the socket woke us.
    pub(crate) fn poll(&self, wait_ms: u64) -> std::io::Result<bool> {
        let Some(stream) = &self.stream else {
            return Ok(false);
        };
        let poller = Poller::new()?;
        let interest = if self.output_is_pending() {
            Event::all(0)
        } else {
            Event::readable(0)
        };
        // The registration lives only for this one wait and is removed
        // below, which is what the poller contract asks of a raw source.
        unsafe {
            poller.add_with_mode(stream.as_raw_fd(), interest, PollMode::Oneshot)?;
        }
        let mut events = Events::new();
        let woke = match poller.wait(&mut events, Some(Duration::from_millis(wait_ms))) {
            Ok(n) => n > 0,
            Err(e) if e.kind() == ErrorKind::Interrupted => false,
            Err(e) => {
                let _ = poller.delete(stream.as_fd());
                return Err(e);
            }
        };
        poller.delete(stream.as_fd())?;
        Ok(woke)
    }
}

/// Exactly one well-formed top-level element, nothing more?
pub(crate) fn is_single_frame(bytes: &[u8]) -> bool {
    let mut decoder = SkeletonDecoder::default();
    let consumed = decoder.feed(bytes);
    consumed == bytes.len() && decoder.at_boundary() && !decoder.failed()
}

fn classify_io(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::NotConnected
        | ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted => Error::NotConnected,
        _ => Error::Io(e),
    }
}

fn open_tap(prefix: &Path) -> Option<File> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let name = format!(
        "{}-{}-{}-{}",
        prefix.display(),
        std::process::id(),
        now.as_secs(),
        now.subsec_micros()
    );
    match OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o700)
        .open(&name)
    {
        Ok(file) => {
            debug!(path = %name, "tap capture enabled");
            Some(file)
        }
        Err(e) => {
            warn!(error = %e, path = %name, "unable to open tap file");
            None
        }
    }
}
