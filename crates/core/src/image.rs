//! Image records and the inputs that create or modify them.

use crate::patch::Patch;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for an image.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(Uuid);

impl ImageId {
    /// Generate a new random image ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from a string.
    pub fn parse(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| crate::Error::InvalidId(s.to_string()))
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ImageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Debug for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImageId({})", self.0)
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An individual image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Unique identifier.
    pub id: ImageId,
    /// Location of the image file.
    pub image_url: String,
    /// User who owns the image.
    pub user_id: String,
    /// When the image was last written.
    #[serde(with = "time::serde::rfc3339")]
    pub date_uploaded: OffsetDateTime,
}

/// What clients must supply to add an image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewImage {
    pub image_url: String,
    pub user_id: String,
}

/// Fields a client may change on an existing image.
///
/// Every field is a [`Patch`], so "not sent" and "sent as null" stay distinct.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateImage {
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub image_url: Patch<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub user_id: Patch<String>,
}

impl UpdateImage {
    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.image_url.is_absent() && self.user_id.is_absent()
    }
}

impl Image {
    /// Merge the present fields of `update` into this image and stamp it with `now`.
    pub fn apply(&mut self, update: UpdateImage, now: OffsetDateTime) {
        update.image_url.apply_to(&mut self.image_url);
        update.user_id.apply_to(&mut self.user_id);
        self.date_uploaded = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> Image {
        Image {
            id: ImageId::new(),
            image_url: "images/a.jpg".to_string(),
            user_id: "u1".to_string(),
            date_uploaded: datetime!(2019-01-01 0:00 UTC),
        }
    }

    #[test]
    fn test_image_id_parse() {
        let id = ImageId::new();
        assert_eq!(ImageId::parse(&id.to_string()).unwrap(), id);
        assert!(matches!(
            ImageId::parse("not-a-uuid"),
            Err(crate::Error::InvalidId(_))
        ));
    }

    #[test]
    fn test_apply_merges_present_fields_only() {
        let mut img = sample();
        let later = datetime!(2019-01-01 1:01:01 UTC);
        img.apply(
            UpdateImage {
                image_url: Patch::Value("images/b.jpg".to_string()),
                user_id: Patch::Absent,
            },
            later,
        );

        assert_eq!(img.image_url, "images/b.jpg");
        assert_eq!(img.user_id, "u1");
        assert_eq!(img.date_uploaded, later);
    }

    #[test]
    fn test_update_image_wire_shape() {
        let up: UpdateImage = serde_json::from_str(r#"{"image_url":"images/c.jpg"}"#).unwrap();
        assert_eq!(up.image_url, Patch::Value("images/c.jpg".to_string()));
        assert!(up.user_id.is_absent());
        assert!(!up.is_empty());
        assert!(UpdateImage::default().is_empty());
    }

    #[test]
    fn test_image_serializes_rfc3339() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["date_uploaded"], "2019-01-01T00:00:00Z");
        assert_eq!(json["user_id"], "u1");
    }
}
