//! # The extraction pipeline.
//!
//! Pages through the mailbox search results, turns every qualifying image
//! attachment into an `Image` event plus a retained artifact on disk, and
//! leaves the session's working set describing what was retained.

use anyhow::{Context as _, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::io::AsyncWriteExt;
use tokio::task;

use crate::events::EventType;
use crate::fingerprint;
use crate::mailbox::Mailbox;
use crate::session::Session;
use crate::thumbnail;
use crate::workset::{self, WorkSetEntry};

/// MIME types extraction considers at all.
pub const ATTACHMENT_MIMES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

impl<M: Mailbox> Session<M> {
    /// Extracts image attachments from the connected mailbox.
    ///
    /// Emits a `Fetching` event per page and an `Image` event per extracted
    /// attachment, writes each retained body into the destination directory
    /// and records it in the working set.  Stops at the configured limit
    /// (0 = unlimited) or when a page comes back empty.  Returns the number
    /// of images emitted.
    ///
    /// A page-fetch failure aborts the whole call; a single attachment that
    /// fails to decode is warned about and skipped.
    pub async fn extract(&mut self) -> Result<usize> {
        let Session {
            config,
            events,
            mailbox,
            working_set,
            ..
        } = self;
        let mailbox = mailbox
            .as_mut()
            .context("extract() called before connect()")?;
        working_set.clear();

        let per_page = if config.limit > 0 {
            config.batch_size.min(config.limit)
        } else {
            config.batch_size
        };
        let mut count = 0;
        let mut offset = 0;

        'pages: loop {
            events.emit(EventType::Fetching {
                start_index: offset + 1,
            });
            let messages = mailbox
                .search(crate::session::ATTACHMENT_QUERY, true, per_page, offset)
                .await?;
            if messages.is_empty() {
                break;
            }

            for message in &messages {
                for attachment in message.attachments() {
                    if !ATTACHMENT_MIMES.contains(&attachment.mime_type.as_str()) {
                        continue;
                    }

                    let thumbnail = task::block_in_place(|| {
                        thumbnail::resize(
                            attachment.body(),
                            &attachment.mime_type,
                            config.thumbnail_width,
                            thumbnail::SUPPORTED_FORMATS,
                        )
                    });
                    let thumbnail = match thumbnail {
                        Ok(Some(bytes)) => bytes,
                        Ok(None) => continue,
                        Err(err) => {
                            warn!(
                                events,
                                "skipping attachment {:?} on message '{}': {:#}",
                                attachment.name,
                                message.subject,
                                err
                            );
                            continue;
                        }
                    };

                    let fingerprint = attachment.fingerprint();
                    let auth_tag = fingerprint::auth_tag(
                        &config.hmac_key,
                        message.id.as_str(),
                        &fingerprint,
                    );
                    events.emit(EventType::Image {
                        message_id: message.id.clone(),
                        fingerprint: fingerprint.clone(),
                        thumbnail: BASE64.encode(&thumbnail),
                        auth_tag,
                    });

                    let (name, mut file) =
                        workset::create_artifact(&config.dest, &message.subject, &attachment.name)
                            .await?;
                    file.write_all(attachment.body()).await?;
                    working_set.insert(
                        name,
                        WorkSetEntry {
                            message_id: message.id.clone(),
                            fingerprint,
                            subject: message.subject.clone(),
                        },
                    );

                    count += 1;
                    if config.limit > 0 && count >= config.limit {
                        break 'pages;
                    }
                }
            }

            offset += per_page;
        }

        events.emit(EventType::ExtractDone { count });
        Ok(count)
    }
}
