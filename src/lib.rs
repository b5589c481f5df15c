//! # Mailsweep.
//!
//! Extracts image attachments from a remote mailbox for operator review and
//! reconciles the operator's deletions back into the mailbox.
//!
//! The flow, end to end: hand a [`Session`](session::Session) a connected
//! [`Mailbox`](mailbox::Mailbox) implementation, run
//! [`extract`](session::Session::extract) to stream thumbnail events to the
//! presentation layer while the full attachment bodies land in the
//! destination directory, let the operator delete the files they want gone,
//! then run [`reconcile`](session::Session::reconcile) to remove the matching
//! attachments from the remote messages.
//!
//! The remote store reassigns a message's id whenever the message is altered.
//! Everything here is built around that: attachments are identified by
//! content [fingerprint](fingerprint::Fingerprint) rather than position,
//! deletions are grouped per message so each message is fetched and mutated
//! exactly once per pass, and snapshots are never reused across a save.

#![warn(unused, missing_debug_implementations, missing_docs)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
pub mod log;

pub mod archive;
pub mod batch;
pub mod config;
pub mod events;
pub mod extract;
pub mod fingerprint;
pub mod mailbox;
pub mod reconcile;
pub mod session;
pub mod thumbnail;
pub mod workset;

#[cfg(test)]
mod test_utils;

pub use crate::config::{PersistPolicy, SessionConfig};
pub use crate::events::{EventEmitter, EventType};
pub use crate::session::Session;
