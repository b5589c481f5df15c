//! # The mailbox capability.
//!
//! The wire protocol is somebody else's problem; the engine only sees this
//! trait.  The one invariant everything downstream leans on: the remote store
//! assigns a new [`MessageId`] whenever a message is altered, so a
//! [`MessageSnapshot`] must never be reused across a mutation boundary.
//! Re-resolve by id, mutate, discard.

use std::fmt;

use anyhow::Result;

use crate::fingerprint::Fingerprint;

/// Opaque remote identifier of a message.
///
/// This is an address, not content: it may go stale at any time, and is
/// guaranteed to after the message is saved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    /// Wraps a raw remote identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a folder on the remote store, e.g. the trash folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef(String);

impl FolderRef {
    /// Wraps a remote folder name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the folder name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// One attachment of a fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Full MIME type, e.g. `image/png`.
    pub mime_type: String,
    /// Display name of the attachment.
    pub name: String,
    body: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from its parts.
    pub fn new(mime_type: impl Into<String>, name: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            name: name.into(),
            body,
        }
    }

    /// The attachment bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Content identity of this attachment within its message.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.body)
    }
}

/// A message as fetched at one point in time.
///
/// Snapshots are short-lived working copies.  Attachment removal happens here,
/// in memory; only [`Mailbox::save`] / [`Mailbox::save_copy`] make it real.
#[derive(Debug, Clone)]
pub struct MessageSnapshot {
    /// Id the message had when this snapshot was taken.
    pub id: MessageId,
    /// Subject line.
    pub subject: String,
    attachments: Vec<Attachment>,
}

impl MessageSnapshot {
    /// Creates a snapshot from its parts.
    pub fn new(id: MessageId, subject: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id,
            subject: subject.into(),
            attachments,
        }
    }

    /// The attachments, in message order.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Removes the first attachment matching `fingerprint` from this
    /// in-memory copy.  Returns whether anything was removed.
    pub fn remove_attachment(&mut self, fingerprint: &Fingerprint) -> bool {
        if let Some(pos) = self
            .attachments
            .iter()
            .position(|a| &a.fingerprint() == fingerprint)
        {
            self.attachments.remove(pos);
            true
        } else {
            false
        }
    }
}

/// Asynchronous access to one remote mailbox connection.
///
/// All methods take `&mut self`: the engine requires strict sequential
/// ordering of operations against one connection, and exclusive access is how
/// the compiler enforces it.  Every method may fail with a connectivity or
/// authorization error, surfaced as a hard failure.
#[allow(async_fn_in_trait)]
pub trait Mailbox: Send {
    /// Returns up to `limit` messages matching `query`, starting at `offset`.
    /// `limit` of 0 means unlimited.
    ///
    /// With `full` set the snapshots carry attachment bodies; without it
    /// implementations may return bare snapshots (id and subject only), which
    /// is all that counting needs.
    async fn search(
        &mut self,
        query: &str,
        full: bool,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MessageSnapshot>>;

    /// Fetches a single message, with attachment bodies, by its current id.
    async fn fetch_by_id(&mut self, id: &MessageId) -> Result<MessageSnapshot>;

    /// Resolves the trash folder of this mailbox.
    async fn trash_folder(&mut self) -> Result<FolderRef>;

    /// Persists `message` into `folder` under `label`, superseding the
    /// original.  The stored message gets a fresh id.
    async fn save(
        &mut self,
        message: &MessageSnapshot,
        folder: &FolderRef,
        label: &str,
    ) -> Result<bool>;

    /// Stores `message` as a new labeled copy, leaving the original alone.
    async fn save_copy(&mut self, message: &MessageSnapshot, label: &str) -> Result<bool>;
}
