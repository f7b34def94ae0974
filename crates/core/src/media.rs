//! Storage paths derived from media URLs.
//!
//! The path of a downloaded asset is a pure function of its source URL, so
//! re-crawling the same URL lands on the same local copy and the same
//! content hash lookup.

use sha1::{Digest, Sha1};

/// Stable identifier for a media URL: SHA-1 hex of the URL bytes.
pub fn media_guid(url: &str) -> String {
    hex::encode(Sha1::digest(url.as_bytes()))
}

/// Path for a generic downloaded file: `full/<guid><ext>`.
///
/// The extension is kept only when it maps to a known MIME type.
pub fn file_path(url: &str) -> String {
    format!("full/{}{}", media_guid(url), media_extension(url))
}

/// Path for a primary image: `full/<guid>.jpg`.
pub fn image_path(url: &str) -> String {
    format!("full/{}.jpg", media_guid(url))
}

/// Path for a named thumbnail variant: `thumbs/<thumb_id>/<guid>.jpg`.
pub fn thumb_path(url: &str, thumb_id: &str) -> String {
    format!("thumbs/{thumb_id}/{}.jpg", media_guid(url))
}

fn media_extension(url: &str) -> String {
    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty() && mime_guess::from_ext(ext).first_raw().is_some() =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}
