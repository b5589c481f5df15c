//! # The session.
//!
//! One `Session` per mailbox connection.  It owns the configuration, the
//! event queue, the working set and, once connected, the mailbox and its
//! trash folder.  Single-writer by construction: every operation that touches
//! the connection takes `&mut self`, and concurrent sessions for different
//! credentials are simply distinct values sharing nothing.

use anyhow::{Context as _, Result};

use crate::config::{ConfigError, SessionConfig};
use crate::events::{EventEmitter, EventType, Events};
use crate::log::LogExt;
use crate::mailbox::{FolderRef, Mailbox};
use crate::workset::LocalWorkingSet;

/// Search expression selecting the messages worth paging through.
pub(crate) const ATTACHMENT_QUERY: &str = "has:attachment";

/// Label altered messages are stored under, in both persistence policies.
pub(crate) const REDACTED_LABEL: &str = "Images redacted";

/// A review session over one mailbox connection.
#[derive(Debug)]
pub struct Session<M: Mailbox> {
    pub(crate) config: SessionConfig,
    pub(crate) events: Events,
    pub(crate) mailbox: Option<M>,
    pub(crate) trash_folder: Option<FolderRef>,
    pub(crate) working_set: LocalWorkingSet,
}

impl<M: Mailbox> Session<M> {
    /// Creates a session after validating the configuration.
    ///
    /// Fails before any network activity when the destination directory is
    /// not writable, the signing key is empty or the batch size is zero.
    pub async fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate().await?;
        Ok(Self {
            config,
            events: Events::new(),
            mailbox: None,
            trash_folder: None,
            working_set: LocalWorkingSet::default(),
        })
    }

    /// Binds the session to a mailbox connection.
    ///
    /// Resolving the trash folder doubles as the connectivity check, the same
    /// way the remote store treats any first command.  Returns whether the
    /// connection is usable; a failure is reported as a warning event, not an
    /// error, and the caller may retry with fresh credentials.
    pub async fn connect(&mut self, mut mailbox: M) -> bool {
        match mailbox
            .trash_folder()
            .await
            .context("unable to resolve the trash folder")
            .log_err(&self.events)
        {
            Some(folder) => {
                self.trash_folder = Some(folder);
                self.mailbox = Some(mailbox);
                self.working_set.clear();
                self.emit_event(EventType::Connected);
                true
            }
            None => false,
        }
    }

    /// Drops the connection and all per-connection state.
    pub fn disconnect(&mut self) {
        self.mailbox = None;
        self.trash_folder = None;
        self.working_set.clear();
    }

    /// Counts the messages advertising attachments, honoring the configured
    /// limit (0 = unlimited).
    pub async fn count(&mut self) -> Result<usize> {
        let mailbox = self
            .mailbox
            .as_mut()
            .context("count() called before connect()")?;
        let messages = mailbox
            .search(ATTACHMENT_QUERY, false, self.config.limit, 0)
            .await?;
        let count = messages.len();
        self.events.emit(EventType::MessageCount(count));
        Ok(count)
    }

    /// Pushes an event to the session's queue.
    pub fn emit_event(&self, event: EventType) {
        self.events.emit(event);
    }

    /// Retrieves the event emitter for the presentation layer.
    pub fn get_event_emitter(&self) -> EventEmitter {
        self.events.get_emitter()
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The working set built by the most recent extraction.
    pub fn working_set(&self) -> &LocalWorkingSet {
        &self.working_set
    }

    /// The connected mailbox, if any.
    pub fn mailbox(&self) -> Option<&M> {
        self.mailbox.as_ref()
    }

    /// Mutable access to the connected mailbox, if any.
    pub fn mailbox_mut(&mut self) -> Option<&mut M> {
        self.mailbox.as_mut()
    }
}
