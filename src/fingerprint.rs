//! # Attachment identity.
//!
//! An attachment is identified inside one message version by the SHA-256 hash
//! of its bytes.  Two attachments with identical bytes inside the same message
//! are indistinguishable by design.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Content hash of an attachment body, rendered as lowercase hex.
///
/// Stable across fetches of the same logical message as long as the bytes are
/// unchanged, which is what makes it usable as a key when the remote store
/// keeps reassigning message ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint of the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Returns the hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computes the tag authenticating one image-delivery event.
///
/// The tag is an HMAC-SHA256 over `"<message_id> <fingerprint>"`, base64
/// encoded.  The consumer verifies by recomputing with the same key and
/// comparing.
pub fn auth_tag(key: &str, message_id: &str, fingerprint: &Fingerprint) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC key length");
    mac.update(message_id.as_bytes());
    mac.update(b" ");
    mac.update(fingerprint.as_str().as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}
