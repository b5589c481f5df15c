//! # Reconciling operator deletions back into the mailbox.
//!
//! The operator's signal arrives in one of two shapes: an explicit list of
//! `(message id, fingerprint)` pairs, or implicitly as artifact files that
//! have disappeared from the destination directory.  Either way the
//! selections are grouped by owning message first, because every save gives
//! the stored message a new id; touching a message twice in one pass would
//! mutate an id the second touch still believes in.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};

use crate::batch::{run_batch, BatchDriver, Fetch, Step};
use crate::config::PersistPolicy;
use crate::events::{EventType, Events};
use crate::fingerprint::Fingerprint;
use crate::mailbox::{FolderRef, Mailbox, MessageId, MessageSnapshot};
use crate::session::{Session, REDACTED_LABEL};

/// The attachments to remove from one message, gathered so the message is
/// fetched and mutated exactly once per pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionGroup {
    /// Current id of the owning message.
    pub message_id: MessageId,
    /// Subject, for progress reporting.
    pub subject: String,
    /// Fingerprints to remove; never empty.
    pub fingerprints: Vec<Fingerprint>,
}

fn group_pairs<'a>(
    pairs: impl Iterator<Item = (&'a MessageId, &'a Fingerprint, &'a str)>,
) -> Vec<DeletionGroup> {
    let mut groups: BTreeMap<MessageId, DeletionGroup> = BTreeMap::new();
    for (message_id, fingerprint, subject) in pairs {
        groups
            .entry(message_id.clone())
            .or_insert_with(|| DeletionGroup {
                message_id: message_id.clone(),
                subject: subject.to_string(),
                fingerprints: Vec::new(),
            })
            .fingerprints
            .push(fingerprint.clone());
    }
    groups.into_values().collect()
}

impl<M: Mailbox> Session<M> {
    /// Computes the current deletion groups from the disk diff.
    async fn pending_deletions(&self) -> Vec<DeletionGroup> {
        let missing = self.working_set.missing_files(&self.config.dest).await;
        group_pairs(
            missing
                .iter()
                .map(|(_, e)| (&e.message_id, &e.fingerprint, e.subject.as_str())),
        )
    }

    /// Reports how many extracted attachments the operator has deleted from
    /// the destination directory since extraction.
    ///
    /// Pure inspection: running it twice without filesystem changes in
    /// between yields the same answer, and nothing is mutated remotely.
    pub async fn check_deletions(&mut self) -> Result<usize> {
        self.events.emit(EventType::FileChecking);
        let count = self
            .pending_deletions()
            .await
            .iter()
            .map(|g| g.fingerprints.len())
            .sum();
        self.events.emit(EventType::FileChecked { count });
        Ok(count)
    }

    /// Replays the disk diff against the mailbox: every artifact deleted
    /// locally is removed from its owning remote message.
    ///
    /// Returns `(messages_changed, attachments_removed)`.
    pub async fn reconcile(&mut self) -> Result<(usize, usize)> {
        let groups = self.pending_deletions().await;
        self.reconcile_groups(groups).await
    }

    /// Replays an explicit operator selection of `(message id, fingerprint)`
    /// pairs against the mailbox.
    ///
    /// Returns `(messages_changed, attachments_removed)`.
    pub async fn reconcile_selection(
        &mut self,
        pairs: &[(MessageId, Fingerprint)],
    ) -> Result<(usize, usize)> {
        let subject_of = |id: &MessageId| {
            self.working_set
                .iter()
                .find(|(_, e)| &e.message_id == id)
                .map(|(_, e)| e.subject.as_str())
                .unwrap_or_default()
        };
        let groups = group_pairs(pairs.iter().map(|(id, fp)| (id, fp, subject_of(id))));
        self.reconcile_groups(groups).await
    }

    async fn reconcile_groups(&mut self, groups: Vec<DeletionGroup>) -> Result<(usize, usize)> {
        let Session {
            config,
            events,
            mailbox,
            trash_folder,
            ..
        } = self;
        let mailbox = mailbox
            .as_mut()
            .context("reconcile() called before connect()")?;
        let trash_folder = trash_folder
            .as_ref()
            .context("reconcile() called before connect()")?;

        let mut driver = ReconcileDriver {
            mailbox,
            events,
            trash_folder,
            replace: config.policy == PersistPolicy::Replace,
            snapshot: None,
            removed_in_unit: 0,
            messages_changed: 0,
            attachments_removed: 0,
        };
        run_batch(&mut driver, &groups, false).await?;

        let totals = (driver.messages_changed, driver.attachments_removed);
        events.emit(EventType::Finished {
            attachments_removed: totals.1,
            messages_changed: totals.0,
        });
        Ok(totals)
    }
}

/// One reconciliation pass as an instance of the two-level iteration: work
/// units are deletion groups, results are the fingerprints to remove from
/// the group's freshly fetched snapshot.
struct ReconcileDriver<'a, M: Mailbox> {
    mailbox: &'a mut M,
    events: &'a Events,
    trash_folder: &'a FolderRef,
    replace: bool,
    /// Snapshot of the current unit's message; discarded after the save.
    snapshot: Option<MessageSnapshot>,
    removed_in_unit: usize,
    messages_changed: usize,
    attachments_removed: usize,
}

impl<M: Mailbox> BatchDriver for ReconcileDriver<'_, M> {
    type Unit = DeletionGroup;
    type Item = Fingerprint;
    type Value = bool;

    async fn fetch(&mut self, group: &DeletionGroup) -> Result<Fetch<Fingerprint>> {
        self.events.emit(EventType::Removing {
            subject: group.subject.clone(),
            count: group.fingerprints.len(),
        });
        // Fresh fetch by the current id; a snapshot from before any earlier
        // save in this pass would carry a dead id.
        match self.mailbox.fetch_by_id(&group.message_id).await {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.removed_in_unit = 0;
                Ok(Fetch::Many(group.fingerprints.clone()))
            }
            Err(err) => {
                warn!(
                    self.events,
                    "could not fetch message {}, skipping its {} deletions: {:#}",
                    group.message_id,
                    group.fingerprints.len(),
                    err
                );
                Ok(Fetch::Skip)
            }
        }
    }

    async fn process(
        &mut self,
        group: &DeletionGroup,
        fingerprint: &Fingerprint,
    ) -> Result<Step<bool>> {
        let snapshot = self
            .snapshot
            .as_mut()
            .context("no snapshot for current group")?;
        let removed = snapshot.remove_attachment(fingerprint);
        if !removed {
            warn!(
                self.events,
                "attachment {} no longer present on message '{}'", fingerprint, group.subject
            );
        }
        Ok(Step::Continue(removed))
    }

    async fn on_result(
        &mut self,
        _group: &DeletionGroup,
        _fingerprint: &Fingerprint,
        removed: bool,
    ) -> Result<()> {
        if removed {
            self.removed_in_unit += 1;
            self.attachments_removed += 1;
        }
        Ok(())
    }

    async fn unit_done(&mut self, group: &DeletionGroup) -> Result<()> {
        let snapshot = self
            .snapshot
            .take()
            .context("no snapshot for current group")?;
        if self.removed_in_unit == 0 {
            return Ok(());
        }

        self.events.emit(EventType::Removed {
            subject: group.subject.clone(),
        });
        let saved = if self.replace {
            self.mailbox
                .save(&snapshot, self.trash_folder, REDACTED_LABEL)
                .await?
        } else {
            self.mailbox.save_copy(&snapshot, REDACTED_LABEL).await?
        };
        if saved {
            self.messages_changed += 1;
        } else {
            warn!(
                self.events,
                "mailbox refused the altered version of '{}'", group.subject
            );
        }
        Ok(())
    }

    async fn on_complete(&mut self) -> Result<()> {
        Ok(())
    }
}
