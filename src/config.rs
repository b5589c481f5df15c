//! # Session configuration.
//!
//! Everything the engine needs to know before any network activity happens.
//! Connection credentials are not part of this: the caller constructs the
//! [`Mailbox`](crate::mailbox::Mailbox) implementation and hands it to
//! [`Session::connect`](crate::session::Session::connect).

use std::path::PathBuf;

use tokio::fs;

/// Width extracted thumbnails are scaled to, in pixels.
pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 100;

/// Messages fetched per page when nothing else is configured.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// How an altered message is written back to the mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistPolicy {
    /// Overwrite the message in place, retagging it into the trash folder
    /// under the fixed label.
    Replace,
    /// Leave the original untouched and save a labeled copy next to it.
    Copy,
}

/// Errors that are fatal before a connection is even attempted.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The destination path is missing, not a directory, or not writable.
    #[error("{} is not a writable directory", .0.display())]
    DestNotWritable(PathBuf),

    /// The HMAC signing key is empty.
    #[error("signing key must not be empty")]
    EmptyKey,

    /// A batch size of zero would make paging loop forever.
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

/// Per-session settings, validated once at session creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory extracted attachment bodies are written to.
    pub dest: PathBuf,

    /// Maximum number of messages fetched from the mailbox per page.
    pub batch_size: usize,

    /// Upper bound on the number of extracted images; 0 means unlimited.
    pub limit: usize,

    /// Replace-in-place vs. copy-aside persistence of altered messages.
    pub policy: PersistPolicy,

    /// Secret key for authenticating image-delivery events.
    pub hmac_key: String,

    /// Target width of emitted thumbnails.
    pub thumbnail_width: u32,
}

impl SessionConfig {
    /// Creates a configuration with defaults for everything but the
    /// destination directory and the signing key.
    pub fn new(dest: impl Into<PathBuf>, hmac_key: impl Into<String>) -> Self {
        Self {
            dest: dest.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            limit: 0,
            policy: PersistPolicy::Copy,
            hmac_key: hmac_key.into(),
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
        }
    }

    /// Checks the configuration before any network activity.
    ///
    /// The destination must be a directory we can actually create files in;
    /// probing with a real file is the only reliable answer to that.
    pub async fn validate(&self) -> Result<(), ConfigError> {
        if self.hmac_key.is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }

        let not_writable = || ConfigError::DestNotWritable(self.dest.clone());
        let metadata = fs::metadata(&self.dest).await.map_err(|_| not_writable())?;
        if !metadata.is_dir() {
            return Err(not_writable());
        }

        let probe = self.dest.join(".mailsweep-probe");
        fs::write(&probe, b"").await.map_err(|_| not_writable())?;
        fs::remove_file(&probe).await.map_err(|_| not_writable())?;

        Ok(())
    }
}
