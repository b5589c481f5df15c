//! Utilities to help writing tests.
//!
//! This module is only compiled for test runs.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::ops::{Deref, DerefMut};

use anyhow::{bail, Result};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use tempfile::{tempdir, TempDir};

use crate::config::SessionConfig;
use crate::events::{EventEmitter, EventType};
use crate::mailbox::{Attachment, FolderRef, Mailbox, MessageId, MessageSnapshot};
use crate::session::Session;

/// A [`Session`] over a [`MockMailbox`], plus the temporary directory that
/// backs its destination path.  The directory is cleaned up when the
/// `TestSession` is dropped.
pub(crate) struct TestSession {
    session: Session<MockMailbox>,
    emitter: EventEmitter,
    /// Destination directory for extracted artifacts.
    pub dir: TempDir,
}

impl TestSession {
    /// Creates a new [`TestSession`] with a default configuration.
    pub async fn new() -> Self {
        let dir = tempdir().unwrap();
        let mut config = SessionConfig::new(dir.path(), "test key");
        // small thumbnails keep the image work cheap
        config.thumbnail_width = 10;
        let session = Session::new(config).await.unwrap();
        let emitter = session.get_event_emitter();
        Self {
            session,
            emitter,
            dir,
        }
    }

    /// Creates a [`TestSession`] already connected to the given mailbox.
    pub async fn connected(mailbox: MockMailbox) -> Self {
        let mut t = Self::new().await;
        assert!(t.connect(mailbox).await, "mock connect failed");
        assert_eq!(t.next_event().await, EventType::Connected);
        t
    }

    /// Pops the next queued event; panics if none is pending.
    pub async fn next_event(&self) -> EventType {
        self.emitter
            .try_recv()
            .expect("no event pending on the session queue")
    }

    /// Drains all currently queued events.
    pub fn drain_events(&self) -> Vec<EventType> {
        let mut events = Vec::new();
        while let Some(event) = self.emitter.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Deref for TestSession {
    type Target = Session<MockMailbox>;

    fn deref(&self) -> &Self::Target {
        &self.session
    }
}

impl DerefMut for TestSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.session
    }
}

/// Record of one `save` / `save_copy` call against the [`MockMailbox`].
#[derive(Debug, Clone)]
pub(crate) struct SaveRecord {
    pub original_id: MessageId,
    pub new_id: MessageId,
    pub folder: Option<FolderRef>,
    pub label: String,
    pub copy: bool,
    pub attachment_count: usize,
}

/// In-memory mailbox with the remote store's defining quirk: every save
/// assigns the stored message a fresh id.
#[derive(Debug, Default)]
pub(crate) struct MockMailbox {
    messages: Vec<MessageSnapshot>,
    saves: Vec<SaveRecord>,
    fetch_counts: HashMap<MessageId, usize>,
    fail_fetch: HashSet<MessageId>,
    next_id: u32,
    broken_connection: bool,
    failing_search: bool,
}

impl MockMailbox {
    /// Makes `trash_folder` fail, so `connect` reports `false`.
    pub fn with_broken_connection(mut self) -> Self {
        self.broken_connection = true;
        self
    }

    /// Makes every `search` fail with a transport error.
    pub fn with_failing_search(mut self) -> Self {
        self.failing_search = true;
        self
    }

    /// Adds a message to the store.
    pub fn add_message(&mut self, message: MessageSnapshot) {
        self.messages.push(message);
    }

    /// Makes `fetch_by_id` fail for the given id.
    pub fn fail_fetch(&mut self, id: &MessageId) {
        self.fail_fetch.insert(id.clone());
    }

    /// Looks up the current version of a message by id.
    pub fn message(&self, id: &MessageId) -> Option<&MessageSnapshot> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// How often `fetch_by_id` was called for `id`.
    pub fn fetch_count(&self, id: &MessageId) -> usize {
        self.fetch_counts.get(id).copied().unwrap_or_default()
    }

    /// The recorded save calls, in order.
    pub fn saves(&self) -> &[SaveRecord] {
        &self.saves
    }

    fn fresh_id(&mut self) -> MessageId {
        self.next_id += 1;
        MessageId::new(format!("saved-{}", self.next_id))
    }
}

impl Mailbox for MockMailbox {
    async fn search(
        &mut self,
        _query: &str,
        full: bool,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MessageSnapshot>> {
        if self.failing_search {
            bail!("search: connection reset");
        }
        let matching: Vec<&MessageSnapshot> = self
            .messages
            .iter()
            .filter(|m| !m.attachments().is_empty())
            .collect();
        let end = if limit == 0 {
            matching.len()
        } else {
            (offset + limit).min(matching.len())
        };
        let page = matching
            .get(offset.min(matching.len())..end)
            .unwrap_or_default();
        Ok(page
            .iter()
            .map(|m| {
                if full {
                    (*m).clone()
                } else {
                    MessageSnapshot::new(m.id.clone(), m.subject.clone(), Vec::new())
                }
            })
            .collect())
    }

    async fn fetch_by_id(&mut self, id: &MessageId) -> Result<MessageSnapshot> {
        *self.fetch_counts.entry(id.clone()).or_default() += 1;
        if self.fail_fetch.contains(id) {
            bail!("fetch {id}: connection reset");
        }
        match self.message(id) {
            Some(message) => Ok(message.clone()),
            None => bail!("fetch {id}: no such message"),
        }
    }

    async fn trash_folder(&mut self) -> Result<FolderRef> {
        if self.broken_connection {
            bail!("login failed");
        }
        Ok(FolderRef::new("[Gmail]/Trash"))
    }

    async fn save(
        &mut self,
        message: &MessageSnapshot,
        folder: &FolderRef,
        label: &str,
    ) -> Result<bool> {
        let new_id = self.fresh_id();
        self.saves.push(SaveRecord {
            original_id: message.id.clone(),
            new_id: new_id.clone(),
            folder: Some(folder.clone()),
            label: label.to_string(),
            copy: false,
            attachment_count: message.attachments().len(),
        });
        // in-place: the original version is superseded
        self.messages.retain(|m| m.id != message.id);
        self.messages.push(MessageSnapshot::new(
            new_id,
            message.subject.clone(),
            message.attachments().to_vec(),
        ));
        Ok(true)
    }

    async fn save_copy(&mut self, message: &MessageSnapshot, label: &str) -> Result<bool> {
        let new_id = self.fresh_id();
        self.saves.push(SaveRecord {
            original_id: message.id.clone(),
            new_id: new_id.clone(),
            folder: None,
            label: label.to_string(),
            copy: true,
            attachment_count: message.attachments().len(),
        });
        self.messages.push(MessageSnapshot::new(
            new_id,
            message.subject.clone(),
            message.attachments().to_vec(),
        ));
        Ok(true)
    }
}

/// Builds a message snapshot from its parts.
pub(crate) fn msg(id: &str, subject: &str, attachments: Vec<Attachment>) -> MessageSnapshot {
    MessageSnapshot::new(MessageId::new(id), subject, attachments)
}

/// An encoded solid-gray PNG.
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    test_png_colored(width, height, [120, 120, 120])
}

/// An encoded solid-color PNG; vary the color to vary the fingerprint.
pub(crate) fn test_png_colored(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let [r, g, b] = rgb;
    let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
        width,
        height,
        Rgba([r, g, b, 255]),
    ));
    encode(&img, ImageFormat::Png)
}

/// An encoded solid-color JPEG.
pub(crate) fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb([200, 60, 20])));
    encode(&img, ImageFormat::Jpeg)
}

/// An encoded solid-color GIF.
pub(crate) fn test_gif(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
        width,
        height,
        Rgba([10, 200, 10, 255]),
    ));
    encode(&img, ImageFormat::Gif)
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A PNG attachment.
pub(crate) fn png_attachment(name: &str, width: u32, height: u32) -> Attachment {
    Attachment::new("image/png", name, test_png(width, height))
}

/// A PNG attachment with a chosen fill color, for distinct fingerprints.
pub(crate) fn png_attachment_colored(name: &str, rgb: [u8; 3]) -> Attachment {
    Attachment::new("image/png", name, test_png_colored(8, 8, rgb))
}

/// A PDF attachment, which the pipeline must never touch.
pub(crate) fn pdf_attachment(name: &str) -> Attachment {
    Attachment::new("application/pdf", name, b"%PDF-1.4 not an image".to_vec())
}
