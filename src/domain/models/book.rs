#[cfg(test)]
#[path = "book_test.rs"]
mod tests;

use std::path::Path;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs;

use super::CreateError;
use super::FailureKind;
use super::Rating;

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide all the blank fields";

/// An image ready to upload, inlined as a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub base64: String,
}

impl ImageAttachment {
    pub fn new(mime_type: &str, bytes: &[u8]) -> ImageAttachment {
        return ImageAttachment {
            mime_type: mime_type.to_string(),
            base64: STANDARD.encode(bytes),
        };
    }

    /// Reads and encodes an image file. The mime type comes from the file
    /// extension and falls back to `image/jpeg`.
    pub async fn from_path(path: &Path) -> Result<ImageAttachment> {
        let bytes = fs::read(path).await?;
        return Ok(ImageAttachment::new(&ImageAttachment::mime_type_for(path), &bytes));
    }

    pub fn mime_type_for(path: &Path) -> String {
        return match path.extension().and_then(|ext| return ext.to_str()) {
            Some(ext) if !ext.is_empty() => format!("image/{}", ext.to_lowercase()),
            _ => "image/jpeg".to_string(),
        };
    }

    pub fn data_url(&self) -> String {
        return format!("data:{};base64,{}", self.mime_type, self.base64);
    }
}

/// Body of `book/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub caption: String,
    pub rating: Rating,
    pub image: String,
}

/// The create form before validation. Ratings are kept raw so out of range
/// input can be reported instead of rejected at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub caption: String,
    pub rating: u8,
    pub image: Option<ImageAttachment>,
}

impl Default for BookDraft {
    fn default() -> BookDraft {
        return BookDraft {
            title: "".to_string(),
            caption: "".to_string(),
            rating: Rating::default().value(),
            image: None,
        };
    }
}

impl BookDraft {
    pub fn validate(&self) -> Result<NewBook, CreateError> {
        let title = self.title.trim();
        let caption = self.caption.trim();
        if title.is_empty() || caption.is_empty() {
            return Err(CreateError::new(FailureKind::Invalid, MISSING_FIELDS_MESSAGE));
        }

        let image = match &self.image {
            Some(image) if !image.base64.is_empty() => image.data_url(),
            _ => return Err(CreateError::new(FailureKind::Invalid, MISSING_FIELDS_MESSAGE)),
        };

        let rating = Rating::try_from(self.rating)
            .map_err(|err| return CreateError::new(FailureKind::Invalid, &err.to_string()))?;

        return Ok(NewBook {
            title: title.to_string(),
            caption: caption.to_string(),
            rating,
            image,
        });
    }
}
