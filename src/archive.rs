//! # Packaging retained artifacts.
//!
//! Lets the presentation layer offer "download everything you kept" as a
//! single zip file.

use std::path::Path;

use anyhow::{Context as _, Result};
use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use tokio::fs;

use crate::mailbox::Mailbox;
use crate::session::Session;

impl<M: Mailbox> Session<M> {
    /// Writes every currently retained artifact into a zip archive at
    /// `zip_path`.  Working-set entries whose file has been deleted since
    /// extraction are pending deletions, not retained artifacts, and are
    /// left out.  Returns the number of files packaged.
    pub async fn package_archive(&self, zip_path: &Path) -> Result<usize> {
        let file = fs::File::create(zip_path)
            .await
            .with_context(|| format!("failed to create archive at {}", zip_path.display()))?;
        let mut writer = ZipFileWriter::with_tokio(file);

        let mut count = 0;
        for (name, _) in self.working_set.iter() {
            let data = match fs::read(self.config.dest.join(name)).await {
                Ok(data) => data,
                Err(_) => continue,
            };
            let entry = ZipEntryBuilder::new(name.clone().into(), Compression::Deflate);
            writer
                .write_entry_whole(entry, &data)
                .await
                .with_context(|| format!("failed to package {name:?}"))?;
            count += 1;
        }

        writer.close().await.context("failed to finish archive")?;
        Ok(count)
    }
}
