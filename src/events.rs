//! # Progress events.
//!
//! Everything the engine wants the presentation layer to know travels through
//! a bounded queue of typed [`EventType`] values.  The session owns the
//! sending side; the consumer pulls from an [`EventEmitter`].

use async_channel::{Receiver, Sender, TrySendError};

use crate::fingerprint::Fingerprint;
use crate::mailbox::MessageId;

/// Event queue held by a session.
#[derive(Debug)]
pub struct Events {
    receiver: Receiver<EventType>,
    sender: Sender<EventType>,
}

impl Default for Events {
    fn default() -> Self {
        let (sender, receiver) = async_channel::bounded(1_000);

        Self { receiver, sender }
    }
}

impl Events {
    /// Creates a new event queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an event to the queue.
    pub fn emit(&self, event: EventType) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                // when we are full, we pop the oldest event and push on the new one
                let _ = self.receiver.try_recv();

                // try again
                self.emit(event);
            }
            Err(TrySendError::Closed(_)) => {
                unreachable!("unable to emit event, channel disconnected");
            }
        }
    }

    /// Alias for [`Events::emit`] so the logging macros can treat a queue
    /// and a session interchangeably.
    pub fn emit_event(&self, event: EventType) {
        self.emit(event);
    }

    /// Retrieves the event emitter.
    pub fn get_emitter(&self) -> EventEmitter {
        EventEmitter(self.receiver.clone())
    }
}

/// Receiving side of the event queue, handed to the presentation layer.
#[derive(Debug, Clone)]
pub struct EventEmitter(Receiver<EventType>);

impl EventEmitter {
    /// Async recv of an event. Return `None` if the `Sender` has been dropped.
    pub async fn recv(&self) -> Option<EventType> {
        self.0.recv().await.ok()
    }

    /// Non-blocking recv; returns `None` when the queue is currently empty.
    pub fn try_recv(&self) -> Option<EventType> {
        self.0.try_recv().ok()
    }
}

/// The closed set of events a session emits, in the order described by the
/// operations that produce them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    /// An informational string for the log.
    /// Should not be reported to the end-user using a popup or something like that.
    Info(String),

    /// A warning string for the log.
    /// Should not be reported to the end-user using a popup or something like that.
    Warning(String),

    /// An error that the presentation layer should surface to the end-user.
    Error(String),

    /// The mailbox connection was established and the trash folder resolved.
    Connected,

    /// Result of counting messages that carry attachments.
    MessageCount(usize),

    /// Emitted before each page fetch during extraction.  `start_index` is the
    /// 1-based index of the first message of the page.
    Fetching { start_index: usize },

    /// One extracted image, ready for display.  The thumbnail is base64
    /// encoded; the auth tag lets the consumer verify the pair of ids.
    Image {
        message_id: MessageId,
        fingerprint: Fingerprint,
        thumbnail: String,
        auth_tag: String,
    },

    /// Extraction finished; `count` images were emitted and retained on disk.
    ExtractDone { count: usize },

    /// The disk diff against the working set has started.
    FileChecking,

    /// The disk diff found `count` locally deleted artifacts.
    FileChecked { count: usize },

    /// Emitted before re-fetching a message that is about to lose
    /// `count` attachments.
    Removing { subject: String, count: usize },

    /// Emitted before writing the altered version of a message back.
    Removed { subject: String },

    /// Reconciliation finished with the final totals.
    Finished {
        attachments_removed: usize,
        messages_changed: usize,
    },
}
