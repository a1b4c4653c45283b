//! Image payloads flowing through the composition engine.
//!
//! - [`ImageRef`]: a user-supplied reference image occupying a slot
//! - [`Artifact`]: an immutable image produced by the generation backend
//!
//! Both share their bytes through `Arc<[u8]>`, so snapshots and history
//! entries are cheap to clone.

use crate::error::{MakeoverError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Maps an image MIME type to the file extension used on export.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "png",
    }
}

/// A reference image supplied by the user (file contents plus metadata).
#[derive(Clone, PartialEq, Eq)]
pub struct ImageRef {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Base64 body used for inline backend payloads.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.bytes)
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageRef")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An image produced by the backend. Immutable once created.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    id: Uuid,
    mime_type: String,
    bytes: Arc<[u8]>,
    created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
            created_at: Utc::now(),
        }
    }

    /// Decodes an artifact from base64 data, as returned inline by the backend.
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self> {
        let bytes = BASE64_STANDARD.decode(data.trim())?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Parses a `data:<mime>;base64,<payload>` URL.
    ///
    /// Together with [`Artifact::to_data_url`] this is the bridge for
    /// frontends and backends that exchange images as data URLs. The bundled
    /// Gemini client receives raw base64 and uses [`Artifact::from_base64`].
    pub fn from_data_url(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| MakeoverError::validation("data URL must start with 'data:'"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| MakeoverError::validation("data URL is missing its payload"))?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(|| {
            MakeoverError::validation("only base64-encoded data URLs are supported")
        })?;
        let mime_type = if mime_type.is_empty() {
            DEFAULT_IMAGE_MIME
        } else {
            mime_type
        };
        Self::from_base64(mime_type, payload)
    }

    /// Encodes the artifact as a `data:` URL, e.g. for an `<img src>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            BASE64_STANDARD.encode(&self.bytes)
        )
    }

    /// Bridges the artifact back into a slot-compatible image reference.
    ///
    /// The bytes are shared, not copied.
    pub fn to_image_ref(&self, name: impl Into<String>) -> ImageRef {
        ImageRef {
            name: name.into(),
            mime_type: self.mime_type.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url_parsing() {
        let artifact = Artifact::from_data_url("data:image/jpeg;base64,AQID").unwrap();
        assert_eq!(artifact.mime_type(), "image/jpeg");
        assert_eq!(artifact.bytes(), &[1, 2, 3]);
        assert_eq!(artifact.extension(), "jpg");
        assert_eq!(artifact.to_data_url(), "data:image/jpeg;base64,AQID");
    }

    #[test]
    fn test_data_url_rejects_plain_text() {
        let err = Artifact::from_data_url("data:text/plain,hello").unwrap_err();
        assert!(err.is_validation());
        assert!(Artifact::from_data_url("https://example.com/a.png").is_err());
    }

    #[test]
    fn test_invalid_base64_is_serialization_error() {
        let err = Artifact::from_base64("image/png", "@@not-base64@@").unwrap_err();
        assert!(matches!(err, MakeoverError::Serialization { .. }));
    }

    #[test]
    fn test_to_image_ref_shares_bytes() {
        let artifact = Artifact::new("image/png", vec![9u8, 8, 7]);
        let image = artifact.to_image_ref("vibe-from-generated.png");
        assert_eq!(image.name(), "vibe-from-generated.png");
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.bytes(), artifact.bytes());
    }

    #[test]
    fn test_artifacts_have_distinct_ids() {
        let a = Artifact::new("image/png", vec![1u8]);
        let b = Artifact::new("image/png", vec![1u8]);
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }
}
