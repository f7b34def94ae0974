//! Upload items.

use crate::hash::ContentHash;
use crate::tx::Tag;
use bytes::Bytes;

/// A single blob queued for upload.
///
/// Created per upload call and consumed by it.
#[derive(Clone, Debug)]
pub struct UploadItem {
    /// Original path or logical name, used for logging and MIME guessing.
    pub name: String,
    /// The bytes to upload.
    pub payload: Bytes,
    /// MIME type recorded in the `Content-Type` tag.
    pub content_type: String,
    /// Content hash recorded in the `File-Hash` tag, when known.
    pub hash: Option<ContentHash>,
}

impl UploadItem {
    /// Create an item, guessing the MIME type from the name's extension.
    pub fn new(name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = guess_content_type(&name);
        Self {
            name,
            payload: payload.into(),
            content_type,
            hash: None,
        }
    }

    /// Override the guessed MIME type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Attach the content hash tag.
    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Tags attached to the upload, in the order they are signed.
    pub fn tags(&self) -> Vec<Tag> {
        let mut tags = vec![Tag::new(crate::CONTENT_TYPE_TAG, &self.content_type)];
        if let Some(hash) = &self.hash {
            tags.push(Tag::new(crate::FILE_HASH_TAG, hash.to_hex()));
        }
        tags
    }
}

/// Guess a MIME type from a file name, falling back to `application/octet-stream`.
pub fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(crate::DEFAULT_CONTENT_TYPE)
        .to_string()
}
