//! # The local working set.
//!
//! Extraction writes every retained attachment body to the destination
//! directory and records, per artifact file name, where it came from.  That
//! mapping is what later turns "this file disappeared from disk" into "remove
//! this attachment from that remote message".

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use tokio::fs;

use crate::fingerprint::Fingerprint;
use crate::mailbox::MessageId;

/// Remote identity of one locally retained artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSetEntry {
    /// Id of the owning message at extraction time.
    pub message_id: MessageId,
    /// Identity of the attachment within that message.
    pub fingerprint: Fingerprint,
    /// Subject of the owning message, kept for progress reporting.
    pub subject: String,
}

/// Map from artifact file name to remote identity.
///
/// Keys are unique per extraction session because the file names they mirror
/// are de-duplicated against the destination directory.
#[derive(Debug, Default)]
pub struct LocalWorkingSet {
    entries: BTreeMap<String, WorkSetEntry>,
}

impl LocalWorkingSet {
    /// Records an artifact.
    pub fn insert(&mut self, name: String, entry: WorkSetEntry) {
        self.entries.insert(name, entry);
    }

    /// Number of recorded artifacts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops all entries, e.g. when a new extraction starts.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates over `(file name, entry)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &WorkSetEntry)> {
        self.entries.iter()
    }

    /// Returns the entries whose artifact file no longer exists under `dest`.
    ///
    /// Absence of the file is the operator's deletion signal.  The scan does
    /// not modify anything, so two scans without filesystem changes in
    /// between return the same answer.
    pub async fn missing_files(&self, dest: &Path) -> Vec<(&str, &WorkSetEntry)> {
        let mut missing = Vec::new();
        for (name, entry) in &self.entries {
            if fs::metadata(dest.join(name)).await.is_err() {
                missing.push((name.as_str(), entry));
            }
        }
        missing
    }
}

/// Returns a disk-safe version of `name`.
///
/// Only used for the base name of an artifact, never for directory parts.
fn sanitize_name(name: &str) -> String {
    let opts = sanitize_filename::Options {
        truncate: true,
        windows: true,
        replacement: "",
    };
    sanitize_filename::sanitize_with_options(name, opts)
}

fn split_name(name: &str) -> (&str, String) {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, format!(".{ext}")),
        _ => (name, String::new()),
    }
}

/// Creates the artifact file for one extracted attachment.
///
/// The name is derived from `"<subject> - <attachment name>"`, sanitized, and
/// made unique in `dest` by inserting a `" - N"` suffix before the extension
/// on collision.  Returns the final name together with the open file handle;
/// `create_new` keeps concurrent name picks race-free.
pub(crate) async fn create_artifact(
    dest: &Path,
    subject: &str,
    attachment_name: &str,
) -> Result<(String, fs::File)> {
    let sanitized = sanitize_name(&format!("{subject} - {attachment_name}"));
    let (stem, ext) = split_name(&sanitized);
    let stem = if stem.is_empty() { "attachment" } else { stem };

    let mut index = 1;
    let mut name = format!("{stem}{ext}");
    loop {
        let path = dest.join(&name);
        match fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((name, file)),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                index += 1;
                name = format!("{stem} - {index}{ext}");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to create artifact {name:?}"))
            }
        }
    }
}
