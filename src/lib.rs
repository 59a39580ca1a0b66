//! # CCN client library
//!
//! A client library for a CCN/NDN-style communication substrate. It
//! connects an application to a local forwarding daemon over a Unix-domain
//! stream socket, expresses *Interests* (named requests), serves *Interest
//! filters* (prefix handlers answering incoming Interests), and delivers
//! incoming *ContentObjects* to the requester after verifying the
//! publisher's signature, fetching the verification key on demand.
//!
//! The primary API is the [Client] handle: one connection, one
//! single-threaded event loop, callback-style upcalls.
//!
//! ## Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use ccn::{Client, UpcallInfo, UpcallKind, UpcallResult};
//!
//! fn main() -> Result<(), ccn::Error> {
//!     let client = Client::new();
//!     client.connect(None)?;
//!
//!     let name = ccn::codec::name_from_uri("/example/data");
//!     client.express_interest(
//!         &name,
//!         None,
//!         Rc::new(|kind: UpcallKind, info: &mut UpcallInfo<'_>| match kind {
//!             UpcallKind::Content => {
//!                 println!("got {} bytes", info.content.map_or(0, <[u8]>::len));
//!                 info.handle.set_run_timeout(0);
//!                 UpcallResult::Ok
//!             }
//!             UpcallKind::InterestTimedOut => UpcallResult::Reexpress,
//!             _ => UpcallResult::Ok,
//!         }),
//!         None,
//!     )?;
//!
//!     client.run(4000)?;
//!     Ok(())
//! }
//! ```

/// Minimalist TLV wire codec: framing, Interest and ContentObject parsing,
/// name handling.
pub mod codec;

/// Digests, content signatures and key material.
pub mod crypto;

mod definitions;
mod error;
mod handle;
mod keys;
mod registry;
mod transport;

#[cfg(test)]
mod test;

pub use definitions::{
    ContentType, Digest, Handler, UpcallInfo, UpcallKind, UpcallResult, INTEREST_LIFETIME,
};
pub use error::{Error, ErrorKind};
pub use handle::{Client, ContentReply};
pub use transport::{Config, DEFAULT_SOCKET_PATH};
